//! Networking: the wire protocol, the connection lifecycle, and the
//! outbound command gate.

pub mod connection;
pub mod errors;
pub mod gateway;
pub mod messages;

pub use connection::{ConnectionConfig, ConnectionHandle, ConnectionManager, Inbound, SessionStatus};
pub use errors::{ClientError, Rejection, RejectionKind};
pub use gateway::{CommandGateway, CommandSink};
pub use messages::{ClientCommand, ServerEvent, TableId};
