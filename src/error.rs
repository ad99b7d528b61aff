use thiserror::Error;

/// Errors surfaced by the channel service.
///
/// Empty catalogs and windows that cannot hold a schedule are not errors;
/// they produce empty results instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("time out of range: {0}")]
    Time(#[from] jiff::Error),

    #[error("channel not found: {id}")]
    ChannelNotFound { id: String },

    #[error("channel already exists: {id}")]
    ChannelExists { id: String },

    #[error("invalid channel: {0}")]
    InvalidChannel(String),

    #[error("library not found: {0}")]
    LibraryNotFound(String),

    #[error("metadata lookup failed: {0}")]
    Metadata(String),
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
