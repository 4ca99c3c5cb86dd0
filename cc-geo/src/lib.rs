//! Geography keys, coverage trees and request encodings.
//!
//! A geography is addressed by a [`GeoTriple`] of nation, state and county,
//! where an empty component means "roll up to this level". Sources describe
//! which triples they can serve with a [`GeoTree`].

pub mod batch;
pub mod error;
pub mod geo_tree;
pub mod places;
pub mod states;
pub mod triple;

pub use error::{GeoError, Result};
pub use geo_tree::GeoTree;
pub use triple::{GeoTriple, EMPTY, USA};
