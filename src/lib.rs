// Agora messaging client core
// The engine behind the community client's chat surface: optimistic message
// delivery, the media body codec, roster synchronization, and the session
// lease every remote call depends on.

pub mod chat;
pub mod codec;
pub mod error;
pub mod models;
pub mod services;
pub mod session;
pub mod storage;

// Re-export the main types for convenience
pub use chat::{ChatClient, ClientEvent, Conversation, Roster};
pub use error::SendErrorKind;
pub use models::*;
pub use session::{Lease, LeaseManager, SessionEvent};
pub use storage::{CachedIdentity, SessionStore};
