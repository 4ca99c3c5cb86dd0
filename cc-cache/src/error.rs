/// Error types for the snapshot store
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No published snapshot for {0}")]
    NoSnapshot(String),

    #[error("Invalid spray key: {0:?}")]
    InvalidKey(String),

    #[error("Geography error: {0}")]
    Geo(#[from] cc_geo::GeoError),
}

pub type Result<T> = std::result::Result<T, CacheError>;

/// Attach the offending path to an I/O error.
pub(crate) trait IoContext<T> {
    fn at(self, path: &std::path::Path) -> Result<T>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn at(self, path: &std::path::Path) -> Result<T> {
        self.map_err(|source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
