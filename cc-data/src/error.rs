/// Error types for trend fitting
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitError {
    /// Too few non-null points in the trailing window
    #[error("Insufficient data to fit a trend (needed: {needed}, found: {found})")]
    InsufficientData { needed: usize, found: usize },

    /// The exponential fit was flat, diverged or hit the iteration limit
    #[error("Trend fit did not converge: {0}")]
    FitDidNotConverge(String),
}

pub type Result<T> = std::result::Result<T, FitError>;
