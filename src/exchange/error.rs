//! Venue error taxonomy and transient-failure classification.

use thiserror::Error;

/// Message fragments that identify transient network faults when the
/// transport does not expose a structured cause.
const TRANSIENT_SIGNATURES: &[&str] = &[
    "temporary failure",
    "name resolution",
    "connection",
    "timeout",
    "timed out",
    "reset by peer",
    "broken pipe",
    "network",
    "ssl",
    "eof",
];

/// Binance error codes that are safe to retry.
/// -1001 disconnected, -1003 too many requests, -1007 backend timeout,
/// -1008 server overloaded.
const TRANSIENT_API_CODES: &[i64] = &[-1001, -1003, -1007, -1008];

/// Structured cause of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Timeout,
    Connect,
    Other,
}

/// Errors surfaced by a venue adapter.
#[derive(Debug, Error)]
pub enum VenueError {
    #[error("transport error ({kind:?}): {message}")]
    Transport { kind: TransportKind, message: String },

    #[error("venue API error (HTTP {status}, code {code}): {message}")]
    Api {
        status: u16,
        code: i64,
        message: String,
    },

    #[error("order rejected: {0}")]
    Rejected(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("failed to decode venue response: {0}")]
    Decode(String),

    #[error("unknown contract: {0}")]
    UnknownContract(String),
}

impl VenueError {
    /// Default classifier used by [`RetryPolicy`](crate::hedge::RetryPolicy).
    ///
    /// Structured fields are consulted first. Only `Transport::Other` falls
    /// back to message matching, since some stacks surface DNS and TLS faults
    /// as opaque I/O errors.
    pub fn is_transient(&self) -> bool {
        match self {
            VenueError::Transport { kind, message } => match kind {
                TransportKind::Timeout | TransportKind::Connect => true,
                TransportKind::Other => matches_transient_signature(message),
            },
            VenueError::Api { status, code, .. } => {
                *status == 429 || *status >= 500 || TRANSIENT_API_CODES.contains(code)
            }
            VenueError::Rejected(_)
            | VenueError::Auth(_)
            | VenueError::Decode(_)
            | VenueError::UnknownContract(_) => false,
        }
    }
}

/// Case-insensitive match against the known transient signatures.
pub fn matches_transient_signature(message: &str) -> bool {
    let lower = message.to_lowercase();
    TRANSIENT_SIGNATURES.iter().any(|sig| lower.contains(sig))
}

impl From<reqwest::Error> for VenueError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return VenueError::Decode(err.to_string());
        }
        let kind = if err.is_timeout() {
            TransportKind::Timeout
        } else if err.is_connect() {
            TransportKind::Connect
        } else {
            TransportKind::Other
        };
        VenueError::Transport {
            kind,
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for VenueError {
    fn from(err: serde_json::Error) -> Self {
        VenueError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn other(message: &str) -> VenueError {
        VenueError::Transport {
            kind: TransportKind::Other,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_structured_transport_is_transient() {
        let err = VenueError::Transport {
            kind: TransportKind::Timeout,
            message: "deadline".to_string(),
        };
        assert!(err.is_transient());
    }

    #[test]
    fn test_message_fallback() {
        assert!(other("Temporary failure in name resolution").is_transient());
        assert!(other("Connection reset by peer (os error 104)").is_transient());
        assert!(other("unexpected EOF during handshake").is_transient());
        assert!(!other("invalid header value").is_transient());
    }

    #[test]
    fn test_api_classification() {
        let overloaded = VenueError::Api {
            status: 503,
            code: 0,
            message: "Service Unavailable".to_string(),
        };
        let rate_limited = VenueError::Api {
            status: 418,
            code: -1003,
            message: "Too many requests".to_string(),
        };
        let insufficient = VenueError::Api {
            status: 400,
            code: -2019,
            message: "Margin is insufficient.".to_string(),
        };
        assert!(overloaded.is_transient());
        assert!(rate_limited.is_transient());
        assert!(!insufficient.is_transient());
        assert!(!VenueError::Rejected("post only would cross".to_string()).is_transient());
        assert!(!VenueError::Auth("bad signature".to_string()).is_transient());
    }
}
