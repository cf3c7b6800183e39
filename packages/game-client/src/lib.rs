//! Client side of move submission: optimistic local moves that are
//! confirmed or rolled back once the game server answers.

pub mod errors;
pub mod local_game;
pub mod reconciler;
pub mod retry;
pub mod transport;

pub use errors::{ReconcileError, TransportError};
pub use local_game::LocalGame;
pub use reconciler::{MoveReconciler, MoveResolution, Phase};
pub use retry::RetryPolicy;
pub use transport::{GameTransport, HttpGameClient};
