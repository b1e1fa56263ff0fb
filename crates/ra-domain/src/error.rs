/// Shared error taxonomy, grouped by cause rather than by source name so the
/// Retry Envelope and the Agent can classify failures uniformly.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("network: {0}")]
    Network(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("rate limited: {0}")]
    RateLimit(String),

    #[error("server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("validation: {0}")]
    Validation(String),

    #[error("provider {provider}: {message}")]
    Provider { provider: String, message: String },

    #[error("conversation not found: {0}")]
    NotFound(String),

    #[error("ambiguous conversation prefix {prefix:?}: matches {matches:?}")]
    AmbiguousPrefix { prefix: String, matches: Vec<String> },

    #[error("memory store unavailable: {0}")]
    MemoryUnavailable(String),

    #[error("sub-conversation failed: {0}")]
    SubConversation(String),

    #[error("config: {0}")]
    Config(String),

    #[error("mcp: {0}")]
    Mcp(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the Retry Envelope should treat this as transient.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Network(_) | Error::Timeout(_) | Error::RateLimit(_) | Error::ServerError { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
