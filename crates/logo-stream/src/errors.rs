/// Errors returned by a `LogoService` before they are normalized for the
/// public API or the event stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// Connection, request or body I/O failed.
    #[error("transport error: {message}")]
    Transport { message: String },
    /// The service answered with a non-success HTTP status.
    #[error("service returned status {code}: {body}")]
    Status { code: u16, body: String },
    /// The service answered successfully but reported an application failure.
    #[error("service error: {message}")]
    Service { message: String },
    /// Response body could not be decoded.
    #[error("decode error: {message}")]
    Decode { message: String },
}

impl RemoteError {
    /// Creates a transport-level error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates an application-level service error.
    pub fn service(message: impl Into<String>) -> Self {
        Self::Service {
            message: message.into(),
        }
    }

    /// Creates a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Returns the HTTP status code when the error carries one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Terminal stream failure sent through `StreamEvent::Error`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, serde::Serialize, serde::Deserialize)]
pub enum StreamFailure {
    /// The service reported a generation error on the stream.
    #[error("{message}")]
    Remote { message: String },
    /// The connection dropped or ended without a completion signal.
    #[error("stream connection failed: {message}")]
    Transport { message: String },
    /// A frame could not be decoded.
    #[error("invalid stream message: {message}")]
    Protocol { message: String },
    /// No frame arrived within the configured idle timeout.
    #[error("no stream activity for {after_secs}s")]
    IdleTimeout { after_secs: u64 },
}

/// Top-level error type for the public client API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LogoStreamError {
    /// Invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Invalid caller input; never reaches the network.
    #[error("validation error: {0}")]
    Validation(String),
    /// The saved-logo service rejected the bearer token.
    #[error("unauthorized")]
    Unauthorized,
    /// Remote call failed before a stream was established.
    #[error(transparent)]
    Remote(RemoteError),
    /// Internal protocol misuse or invariant violation.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl LogoStreamError {
    pub(crate) fn protocol_msg(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }
}

impl From<RemoteError> for LogoStreamError {
    fn from(value: RemoteError) -> Self {
        match value {
            RemoteError::Status { code: 401, .. } => LogoStreamError::Unauthorized,
            other => LogoStreamError::Remote(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_status_maps_to_dedicated_variant() {
        let err: LogoStreamError = RemoteError::Status {
            code: 401,
            body: "nope".into(),
        }
        .into();
        assert_eq!(err, LogoStreamError::Unauthorized);

        let err: LogoStreamError = RemoteError::Status {
            code: 500,
            body: "boom".into(),
        }
        .into();
        assert!(matches!(err, LogoStreamError::Remote(RemoteError::Status { code: 500, .. })));
    }

    #[test]
    fn remote_failure_displays_server_message_verbatim() {
        let failure = StreamFailure::Remote {
            message: "GPU out of memory".into(),
        };
        assert_eq!(failure.to_string(), "GPU out of memory");
    }
}
