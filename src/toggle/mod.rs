/// Completion toggling
///
/// `ToggleCoordinator` is the only writer of per-(habit, day) toggle state.
/// It coalesces repeated toggles, reconciles with changes made by other
/// sessions, and discards results that arrive for views that are gone.

pub mod coordinator;
pub mod state;

pub use coordinator::*;
pub use state::*;
