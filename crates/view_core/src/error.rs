use thiserror::Error;

/// Failure taxonomy at the per-invocation boundary. Handlers convert every
/// variant into a failure event; nothing propagates past a handler task.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Network or HTTP-level failure reported by the transport.
    #[error("transport failure: {0}")]
    Transport(String),
    /// The envelope itself was malformed (no payload, undecodable shape).
    /// Treated the same as a transport failure by callers.
    #[error("malformed envelope: {0}")]
    Normalization(String),
    /// Invalid service configuration (bad base URL).
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Normalization(err.to_string())
    }
}
