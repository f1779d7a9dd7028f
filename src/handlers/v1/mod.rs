//! V1 API handlers.

mod chat;

pub use chat::{chat_turn, clear_session, get_history};
