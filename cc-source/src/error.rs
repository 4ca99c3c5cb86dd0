/// Error types for source adapters, the catalog and the poller
use cc_cache::CacheError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    /// Network error, timeout or non-success status
    #[error("Fetch failed for {url}: {reason}")]
    FetchFailure { url: String, reason: String },

    /// Payload or spray file could not be interpreted
    #[error("Malformed source {source_name}: {reason}")]
    MalformedSource { source_name: String, reason: String },

    /// No adapter serves this geography, or its spray file is missing
    #[error("No data for {series} at {place}")]
    NoDataForGeography { series: String, place: String },

    /// More than one adapter claims this geography
    #[error("{count} sources claim {series} at {place}")]
    DataConflict {
        series: String,
        place: String,
        count: usize,
    },

    #[error("Unknown series: {0}")]
    UnknownSeries(String),

    #[error("Invalid source list: {0}")]
    SourceList(String),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl SourceError {
    pub(crate) fn malformed(source_name: &str, reason: impl Into<String>) -> Self {
        SourceError::MalformedSource {
            source_name: source_name.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SourceError>;
