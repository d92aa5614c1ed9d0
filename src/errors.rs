use thiserror::Error;

/// Every failure a collaborator of the hub can observe.
///
/// Transport failures are handled inside the connection (reconnect) and only
/// reach callers as the `disconnect` notification; `Transport` is returned by
/// the transport seam itself and by pending acks torn down mid-flight.
#[derive(Error, Debug)]
pub enum HubError {
    #[error("Connection not ready: identify handshake has not completed")] NotReady,

    #[error("Server rejected action: {payload}")] AckError {
        payload: serde_json::Value,
    },

    #[error("Pending action cancelled by disconnect")] Cancelled,

    #[error("Transport error: {0}")] Transport(String),

    #[error("Timeout error: no acknowledgement after {ms}ms")] Timeout {
        ms: u64,
    },

    #[error("Too many pending acknowledgements (limit {limit})")] PendingLimit {
        limit: usize,
    },

    #[error("Connection already started; call disconnect() first")] AlreadyConnected,

    #[error("Topic closed: {topic}")] TopicClosed {
        topic: String,
    },

    #[error("Codec error: {0}")] Codec(#[from] serde_json::Error),

    #[error("Configuration error: {0}")] Config(String),
}

impl HubError {
    /// Errors that go away on their own once the connection is identified again.
    pub fn is_recoverable(&self) -> bool {
        match self {
            HubError::NotReady => true,
            HubError::Transport(_) => true,
            HubError::Timeout { .. } => true,
            HubError::PendingLimit { .. } => true,
            _ => false,
        }
    }

    /// The `message` field of an `ack-err` payload, or the payload itself when
    /// it is a bare string.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            HubError::AckError { payload } =>
                payload
                    .get("message")
                    .and_then(|m| m.as_str())
                    .or_else(|| payload.as_str()),
            _ => None,
        }
    }
}

pub type HubResult<T> = Result<T, HubError>;
