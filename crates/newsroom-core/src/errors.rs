/// Core error type for the mini app.
///
/// Adapter crates should map their specific errors into this type so views can
/// handle failures consistently (fallback screen vs error banner).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("auth error: {0}")]
    Auth(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("repository error: {0}")]
    Repository(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
