use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("Empty URL input")]
    EmptyInput,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Could not determine Reddit JSON endpoint from URL")]
    UnresolvableEndpoint,

    #[error("Network failure: {0}")]
    Network(String),

    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Invalid response body: {0}")]
    Decode(String),

    #[error("Unexpected response shape: {0}")]
    SchemaMismatch(String),

    #[error("History store error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDeError(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerError(#[from] toml::ser::Error),
}

impl BrowserError {
    /// The most specific HTTP status this error carries. Errors that never
    /// reached the network (or died in transport) report 0.
    pub fn status_hint(&self) -> u16 {
        match self {
            Self::Http { status, .. } => *status,
            _ => 0,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::EmptyInput | Self::InvalidUrl(_) => 2,
            Self::UnresolvableEndpoint => 3,
            Self::Network(_) => 4,
            Self::Http { .. } => 5,
            Self::Decode(_) | Self::SchemaMismatch(_) => 6,
            Self::Storage(_) | Self::IoError(_) => 7,
            Self::Config(_) | Self::TomlDeError(_) | Self::TomlSerError(_) => 8,
            _ => 1,
        }
    }
}
