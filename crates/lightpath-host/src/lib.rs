pub mod clock;
pub mod collision;
pub mod protocol;
pub mod session;
pub mod sink;

pub use session::{SessionClosed, SessionCommand, SessionHandle, SessionStats, spawn_session};
