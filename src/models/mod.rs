pub mod identity;
pub mod message;
pub mod super_chat;

pub use identity::Identity;
pub use message::{ChatMessage, MessageKind};
pub use super_chat::SuperChat;
