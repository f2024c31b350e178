//! Table entities and the client-side state logic built on them.

pub mod entities;
pub mod overlay;
pub mod preaction;
pub mod reconciler;

pub use entities::TableState;
pub use overlay::AnimationOverlay;
pub use preaction::{PreAction, PreActionQueue};
pub use reconciler::{ApplyOutcome, Reconciler};
