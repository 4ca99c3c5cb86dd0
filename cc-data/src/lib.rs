//! Time series processing and trend extrapolation.
//!
//! This crate turns the per-geography tables read from the cache into
//! [`TimeSeries`] values and derives new series from them: differences,
//! exponentially weighted smoothing, ratios, slices and fitted projections.
//! Every derivation returns a new value; inputs are never modified.

pub mod error;
pub mod extrapolate;
pub mod time_series;

pub use error::{FitError, Result};
pub use extrapolate::{fit_and_project, Extrapolation, Fit};
pub use time_series::{DataPoint, TimeSeries};
