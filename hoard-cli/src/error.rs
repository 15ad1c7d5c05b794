use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Proxy error: {0}")]
    Proxy(#[from] hoard_engine::ProxyError),

    #[error("{0}")]
    Clear(#[from] hoard_engine::ClearError),

    #[error("Initialization failed: {0}")]
    Initialization(String),
}
