/// Error types for geography encodings
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeoError {
    /// An encoded place request did not have the `path@series@places` shape
    #[error("Malformed place request: {0}")]
    PlaceDecode(String),

    /// A place had other than three `~`-separated components
    #[error("Place must have three components, found {found}: {place}")]
    PlaceArity { place: String, found: usize },

    /// A batch document contained something other than strings, maps or lists
    #[error("Unanticipated item in batch document: {0}")]
    BatchItem(String),

    /// The batch document was not valid YAML
    #[error("Failed to parse batch document: {0}")]
    BatchParse(#[from] serde_yaml::Error),

    /// A GeoTree document could not be read
    #[error("Failed to parse geo tree: {0}")]
    TreeParse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GeoError>;
