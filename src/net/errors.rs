//! Error taxonomy for the table client.
//!
//! Nothing here is fatal to the process: transport errors drive the
//! reconnect loop, malformed frames are dropped whole, and rejected
//! commands surface to the user. Everything else degrades to "wait for
//! the next authoritative snapshot".

use std::fmt;
use thiserror::Error;

/// Errors raised by the client's own machinery.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The connection dropped or the socket failed. Triggers reconnect;
    /// not user-facing on its own.
    #[error("transport: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    /// A payload failed to decode. The whole frame is dropped and
    /// logged; no partial state is ever applied from it.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The gateway refused to emit because the session is not open.
    /// The user must re-initiate once connected.
    #[error("not connected to the table server")]
    NotConnected,

    /// The connection manager has shut down.
    #[error("connection closed")]
    ChannelClosed,
}

/// Which command the server turned down.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RejectionKind {
    SitDown,
    AddChips,
}

/// An explicit failure notice from the server (`sit-down-failed`,
/// `add-chips-failed`). Surfaced to the user; never corrupts table
/// state; there is no automatic retry.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Rejection {
    pub kind: RejectionKind,
    pub message: String,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let what = match self.kind {
            RejectionKind::SitDown => "could not join table",
            RejectionKind::AddChips => "could not add chips",
        };
        write!(f, "{what}: {}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_display() {
        let rejection = Rejection {
            kind: RejectionKind::SitDown,
            message: "seat taken".to_string(),
        };
        assert_eq!(rejection.to_string(), "could not join table: seat taken");
    }

    #[test]
    fn test_malformed_from_serde() {
        let err = serde_json::from_str::<u32>("[]").unwrap_err();
        let client_err = ClientError::from(err);
        assert!(matches!(client_err, ClientError::Malformed(_)));
    }
}
