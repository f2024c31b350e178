//! Outbound command gate.
//!
//! Every user intent leaves through a [`CommandSink`]. The production
//! sink, [`CommandGateway`], refuses to emit while the session is not
//! open, so nothing is silently queued against a dead socket and the
//! user is told to act again once connected. The trait seam lets the
//! session loop be tested against a recording sink.

use crate::net::connection::{ConnectionHandle, SessionStatus};
use crate::net::errors::ClientError;
use crate::net::messages::ClientCommand;

/// Where outbound commands go. Sending is fire-and-forget: success means
/// the command left the client, not that the server accepted it.
pub trait CommandSink {
    fn try_send(&mut self, command: ClientCommand) -> Result<(), ClientError>;
}

/// Production sink: forwards to the connection manager, but only while
/// the session is open.
#[derive(Clone, Debug)]
pub struct CommandGateway {
    handle: ConnectionHandle,
}

impl CommandGateway {
    pub fn new(handle: ConnectionHandle) -> Self {
        Self { handle }
    }

    pub fn status(&self) -> SessionStatus {
        self.handle.status()
    }
}

impl CommandSink for CommandGateway {
    fn try_send(&mut self, command: ClientCommand) -> Result<(), ClientError> {
        let status = self.handle.status();
        if status != SessionStatus::Open {
            log::warn!("dropping '{command}': session is {status}");
            return Err(ClientError::NotConnected);
        }
        self.handle.send(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::connection::handle_with_status;

    #[test]
    fn test_open_session_forwards_commands() {
        let (handle, mut outbound_rx, _status_tx) = handle_with_status(SessionStatus::Open);
        let mut gateway = CommandGateway::new(handle);
        gateway.try_send(ClientCommand::StandUp).unwrap();
        assert_eq!(outbound_rx.try_recv().unwrap(), ClientCommand::StandUp);
    }

    #[test]
    fn test_closed_session_refuses_to_emit() {
        for status in [
            SessionStatus::Connecting,
            SessionStatus::Reconnecting,
            SessionStatus::Closed,
        ] {
            let (handle, mut outbound_rx, _status_tx) = handle_with_status(status);
            let mut gateway = CommandGateway::new(handle);
            let err = gateway.try_send(ClientCommand::StandUp).unwrap_err();
            assert!(matches!(err, ClientError::NotConnected));
            assert!(outbound_rx.try_recv().is_err());
        }
    }

    #[test]
    fn test_gate_reopens_with_the_session() {
        let (handle, mut outbound_rx, status_tx) = handle_with_status(SessionStatus::Reconnecting);
        let mut gateway = CommandGateway::new(handle);
        assert!(gateway.try_send(ClientCommand::StandUp).is_err());

        status_tx.send(SessionStatus::Open).unwrap();
        gateway.try_send(ClientCommand::StandUp).unwrap();
        assert_eq!(outbound_rx.try_recv().unwrap(), ClientCommand::StandUp);
    }
}
