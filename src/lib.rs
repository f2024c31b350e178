//! # Poker Table Client
//!
//! Client-side state synchronization for a live poker table driven by an
//! external, authoritative server over a persistent WebSocket connection.
//!
//! The server owns the game: dealing, hand evaluation, betting legality,
//! and pot math all happen remotely. This crate consumes the resulting
//! stream of full snapshots and narrow events, merges them into a single
//! canonical [`TableState`](game::entities::TableState), and sends user
//! intents back — never assuming success until the server confirms it.
//!
//! ## Core modules
//!
//! - [`game`]: table entities, the event/snapshot reconciler, the
//!   pre-action queue, and the transient animation overlay
//! - [`net`]: wire protocol, connection manager, and the outbound
//!   command gateway
//! - [`table`]: the single-threaded session loop tying it all together
//!
//! ## Example
//!
//! ```
//! use pp_table_client::game::{Reconciler, entities::PlayerId};
//!
//! // One reconciler per active table, owned by the session loop.
//! let reconciler = Reconciler::new(PlayerId::new("u1"));
//! assert!(reconciler.state().occupied_seats().next().is_none());
//! ```

/// Table entities, reconciliation, pre-actions, and presentation overlay.
pub mod game;
pub use game::{
    entities::{self, ACTION_LOG_RETENTION, MAX_BOARD_CARDS, PlayerAction, SEAT_COUNT, TableState},
    overlay::AnimationOverlay,
    preaction::{PreAction, PreActionQueue},
    reconciler::{ApplyOutcome, Reconciler},
};

/// Networking components: wire messages, connection lifecycle, gateway.
pub mod net;
pub use net::{
    connection::{ConnectionConfig, ConnectionHandle, ConnectionManager, SessionStatus},
    errors::ClientError,
    gateway::{CommandGateway, CommandSink},
    messages::{ClientCommand, ServerEvent, TableId},
};

/// The table session actor.
pub mod table;
pub use table::session::{TableSession, TableUpdate, UserIntent};
