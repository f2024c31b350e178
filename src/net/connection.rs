//! Connection lifecycle for the persistent table channel.
//!
//! One [`ConnectionManager`] owns one WebSocket to the table server for
//! its whole session: it connects, pumps frames both ways, detects loss,
//! reconnects with capped exponential backoff, and re-subscribes to the
//! table it was watching. It is constructed explicitly and handed to the
//! session that needs it; there is no process-wide socket.
//!
//! The manager never interprets game semantics. Decoded events and
//! status changes flow out over a single channel, in arrival order, for
//! the session loop to apply one at a time.

use crate::net::errors::ClientError;
use crate::net::messages::{self, ClientCommand, ServerEvent, TableId};
use futures_util::{SinkExt, StreamExt};
use std::fmt;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

/// Default first retry delay after a transport loss.
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(500);

/// Ceiling for the retry delay. Retries continue indefinitely at this
/// interval; the loop never busy-spins and never gives up on its own.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(15);

/// Where the session currently stands with the server.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SessionStatus {
    Connecting,
    Open,
    Reconnecting,
    Closed,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Reconnecting => "reconnecting",
            Self::Closed => "closed",
        };
        write!(f, "{repr}")
    }
}

/// Connection settings for one table session.
#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    /// WebSocket URL of the table server.
    pub url: String,
    /// Table to subscribe to on every (re)connect.
    pub table_id: TableId,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl ConnectionConfig {
    pub fn new(url: impl Into<String>, table_id: TableId) -> Self {
        Self {
            url: url.into(),
            table_id,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
        }
    }

    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }
}

/// Doubling backoff, capped. Pure so the schedule is testable.
pub(crate) fn next_backoff(current: Duration, max: Duration) -> Duration {
    current.saturating_mul(2).min(max)
}

/// What the manager delivers to the session loop.
#[derive(Clone, Debug)]
pub enum Inbound {
    /// A decoded frame from the server, in arrival order.
    Event(ServerEvent),
    /// The channel changed state. `Reconnecting` tells the session to
    /// discard optimistic expectations; the next snapshot is full truth.
    Status(SessionStatus),
}

/// Cloneable handle for talking to a running [`ConnectionManager`].
#[derive(Clone, Debug)]
pub struct ConnectionHandle {
    outbound: mpsc::UnboundedSender<ClientCommand>,
    status: watch::Receiver<SessionStatus>,
}

impl ConnectionHandle {
    /// The session status as of right now.
    pub fn status(&self) -> SessionStatus {
        *self.status.borrow()
    }

    /// Watch for status changes.
    pub fn status_stream(&self) -> watch::Receiver<SessionStatus> {
        self.status.clone()
    }

    /// Queue a command for the socket. Gating on session status is the
    /// gateway's job; this only fails once the manager has shut down.
    pub(crate) fn send(&self, command: ClientCommand) -> Result<(), ClientError> {
        self.outbound
            .send(command)
            .map_err(|_| ClientError::ChannelClosed)
    }
}

enum Pump {
    /// Transport lost; reconnect.
    Lost,
    /// All handles dropped or the session went away; stop for good.
    Shutdown,
}

/// Owns the socket and the reconnect loop. Spawn [`run`](Self::run) on
/// the runtime; drop every [`ConnectionHandle`] to shut it down.
pub struct ConnectionManager {
    config: ConnectionConfig,
    outbound_rx: mpsc::UnboundedReceiver<ClientCommand>,
    inbound_tx: mpsc::UnboundedSender<Inbound>,
    status_tx: watch::Sender<SessionStatus>,
}

impl ConnectionManager {
    pub fn new(
        config: ConnectionConfig,
    ) -> (Self, ConnectionHandle, mpsc::UnboundedReceiver<Inbound>) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(SessionStatus::Connecting);

        let manager = Self {
            config,
            outbound_rx,
            inbound_tx,
            status_tx,
        };
        let handle = ConnectionHandle {
            outbound: outbound_tx,
            status: status_rx,
        };
        (manager, handle, inbound_rx)
    }

    /// Publish a status change. Returns false once the session loop has
    /// gone away and there is no one left to tell.
    fn set_status(&self, status: SessionStatus) -> bool {
        let _ = self.status_tx.send(status);
        self.inbound_tx.send(Inbound::Status(status)).is_ok()
    }

    /// Run until shutdown. Connects, re-subscribes, pumps, and backs off
    /// on loss; reconnects indefinitely with a capped interval.
    pub async fn run(mut self) {
        let mut backoff = self.config.initial_backoff;
        let mut attempted = false;

        loop {
            let status = if attempted {
                SessionStatus::Reconnecting
            } else {
                SessionStatus::Connecting
            };
            if !self.set_status(status) {
                return;
            }
            attempted = true;

            match connect_async(self.config.url.as_str()).await {
                Ok((stream, _)) => {
                    backoff = self.config.initial_backoff;
                    log::info!("connected to {}", self.config.url);
                    if !self.set_status(SessionStatus::Open) {
                        return;
                    }
                    match self.pump(stream).await {
                        Pump::Lost => {}
                        Pump::Shutdown => {
                            self.set_status(SessionStatus::Closed);
                            return;
                        }
                    }
                }
                Err(e) => {
                    log::warn!("connect to {} failed: {e}", self.config.url);
                }
            }

            log::info!("retrying in {backoff:?}");
            tokio::time::sleep(backoff).await;
            backoff = next_backoff(backoff, self.config.max_backoff);
        }
    }

    /// Pump one live socket until it dies or the session shuts down.
    async fn pump(&mut self, stream: WebSocketStream<MaybeTlsStream<TcpStream>>) -> Pump {
        let (mut write, mut read) = stream.split();

        // Re-subscribe first: the server keys its pushes off this.
        let join = ClientCommand::JoinTable {
            table_id: self.config.table_id.clone(),
        };
        match messages::encode_command(&join) {
            Ok(text) => {
                if write.send(Message::Text(text.into())).await.is_err() {
                    return Pump::Lost;
                }
                log::info!("subscribed to table {}", self.config.table_id);
            }
            Err(e) => {
                log::error!("could not encode join-table: {e}");
                return Pump::Shutdown;
            }
        }

        loop {
            tokio::select! {
                command = self.outbound_rx.recv() => match command {
                    Some(command) => match messages::encode_command(&command) {
                        Ok(text) => {
                            if write.send(Message::Text(text.into())).await.is_err() {
                                return Pump::Lost;
                            }
                        }
                        Err(e) => log::error!("could not encode '{command}': {e}"),
                    },
                    None => {
                        let _ = write.close().await;
                        return Pump::Shutdown;
                    }
                },
                frame = read.next() => match frame {
                    Some(Ok(Message::Text(text))) => match messages::decode_event(&text) {
                        Ok(event) => {
                            if self.inbound_tx.send(Inbound::Event(event)).is_err() {
                                return Pump::Shutdown;
                            }
                        }
                        // Apply-or-discard: a frame that does not decode
                        // whole is never partially applied.
                        Err(e) => log::warn!("dropping malformed frame: {e}"),
                    },
                    Some(Ok(Message::Close(_))) | None => {
                        log::warn!("server closed the connection");
                        return Pump::Lost;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        log::warn!("transport error: {e}");
                        return Pump::Lost;
                    }
                },
            }
        }
    }
}

#[cfg(test)]
pub(crate) fn handle_with_status(
    status: SessionStatus,
) -> (
    ConnectionHandle,
    mpsc::UnboundedReceiver<ClientCommand>,
    watch::Sender<SessionStatus>,
) {
    let (outbound, outbound_rx) = mpsc::unbounded_channel();
    let (status_tx, status_rx) = watch::channel(status);
    (
        ConnectionHandle {
            outbound,
            status: status_rx,
        },
        outbound_rx,
        status_tx,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_until_capped() {
        let max = Duration::from_secs(15);
        let mut backoff = Duration::from_millis(500);
        let mut schedule = Vec::new();
        for _ in 0..8 {
            schedule.push(backoff);
            backoff = next_backoff(backoff, max);
        }
        assert_eq!(schedule[0], Duration::from_millis(500));
        assert_eq!(schedule[1], Duration::from_secs(1));
        assert_eq!(schedule[4], Duration::from_secs(8));
        // Capped, and it stays there.
        assert_eq!(schedule[5], Duration::from_secs(15));
        assert_eq!(schedule[7], Duration::from_secs(15));
    }

    #[test]
    fn test_backoff_never_zero() {
        // A zero interval would busy-loop; the schedule must not decay.
        let next = next_backoff(Duration::from_millis(500), DEFAULT_MAX_BACKOFF);
        assert!(next >= Duration::from_millis(500));
    }

    #[test]
    fn test_status_display() {
        assert_eq!(SessionStatus::Open.to_string(), "open");
        assert_eq!(SessionStatus::Reconnecting.to_string(), "reconnecting");
    }

    #[test]
    fn test_handle_reports_current_status() {
        let (handle, _outbound_rx, status_tx) = handle_with_status(SessionStatus::Connecting);
        assert_eq!(handle.status(), SessionStatus::Connecting);
        status_tx.send(SessionStatus::Open).unwrap();
        assert_eq!(handle.status(), SessionStatus::Open);
    }

    #[test]
    fn test_send_after_shutdown_errors() {
        let (handle, outbound_rx, _status_tx) = handle_with_status(SessionStatus::Open);
        drop(outbound_rx);
        let err = handle.send(ClientCommand::StandUp).unwrap_err();
        assert!(matches!(err, ClientError::ChannelClosed));
    }
}
