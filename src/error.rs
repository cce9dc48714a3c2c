use thiserror::Error;

/// Errors that can occur while turning a source into a canonical recipe
#[derive(Error, Debug)]
pub enum ImportError {
    /// Block has no extractable ingredients or instructions; the draft is dropped
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// An optional field could not be resolved; the record keeps a null
    #[error("Partial data: {0}")]
    PartialData(String),

    /// A collaborator (nutrition API, image lookup) returned nothing
    #[error("External source unavailable: {0}")]
    ExternalUnavailable(String),

    /// Merging into an existing record found a differing non-null value
    #[error("Identity conflict on {key}: field '{field}' kept existing value")]
    IdentityConflict { key: String, field: String },

    /// Failed to fetch a page or call an API
    #[error("Failed to fetch URL: {0}")]
    FetchError(#[from] reqwest::Error),

    /// Fetch returned a non-success status
    #[error("Unexpected HTTP status {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    /// Failed to read or write the JSON record artifact
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Failed to access the store file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Builder configuration error
    #[error("Builder error: {0}")]
    BuilderError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(#[from] config::ConfigError),
}

impl ImportError {
    /// Only malformed input drops a draft; every other domain error degrades
    pub fn is_fatal_for_draft(&self) -> bool {
        matches!(self, ImportError::MalformedInput(_))
    }
}
