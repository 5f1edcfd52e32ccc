//! # Chat Core - Domain Module
//! 
//! Domain entities for conversations and their messages.

pub mod conversation;
pub mod message;

pub use conversation::Conversation;
pub use message::{Message, MessageMetadata, MessagePage, SenderRole};
