//! The table session actor: one task owning all mutable table state.

pub mod session;

pub use session::{TableSession, TableUpdate, UserIntent};
