//! Session state owned by the chat client
//!
//! - **context**: questions remembered for the "remember context" toggle
//! - **state**: the explicit session record and its shared handle

pub mod context;
pub mod state;

pub use context::{ConversationContext, SavedQuestion, CONTEXT_SEPARATOR};
pub use state::{Generation, PreparedQuestion, RequestState, Session, SessionSnapshot, SharedSession};
