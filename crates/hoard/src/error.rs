use thiserror::Error;

/// Errors raised while running the request pipeline.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("no file extension known for content type '{0}'")]
    UnmappedContentType(String),

    #[error("rejected request path '{0}'")]
    RejectedPath(String),

    #[error("invalid origin URL: {0}")]
    InvalidOrigin(String),
}

/// Errors raised by the cache administrator.
#[derive(Debug, Error)]
pub enum ClearError {
    #[error("no cache to clear")]
    NoCache,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
