pub mod protocol;
pub mod session;
pub mod state;
pub mod transport;

// Re-export the session entry points to make them easily accessible
// to the binary that wires the client together.
pub use session::{ChatHandle, ChatNotice, ChatSession};
pub use state::{ChatState, SessionPhase};
pub use transport::{ChatConnection, ChatTransport};
