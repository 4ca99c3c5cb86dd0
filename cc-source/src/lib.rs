//! Upstream data sources for curves.
//!
//! - [`SourceAdapter`]: one upstream dataset and how to reshape it
//! - [`SourceCatalog`]: logical series, their adapters and geography lookup
//! - [`Poller`]: fetch, deduplicate and publish every source into the cache
//!
//! The adapter list is embedded from `fixtures/sources.csv`.

pub mod adapter;
pub mod catalog;
pub mod error;
pub mod fetch;
pub mod poller;
pub mod table;

pub use adapter::{Provider, SourceAdapter, SourceKind, Spray};
pub use catalog::{Series, SourceCatalog};
pub use error::{Result, SourceError};
pub use fetch::{Fetch, HttpFetcher};
pub use poller::{PollOutcome, PollReport, Poller};
pub use table::Table;
