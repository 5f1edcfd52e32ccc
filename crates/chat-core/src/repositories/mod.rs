//! Repository and cache traits (ports)

pub mod conversation_repository;
pub mod conversation_cache;

pub use conversation_repository::ConversationRepository;
pub use conversation_cache::{conversation_key, messages_key, ConversationCache};

#[cfg(test)]
pub use conversation_repository::MockConversationRepository;
#[cfg(test)]
pub use conversation_cache::MockConversationCache;
