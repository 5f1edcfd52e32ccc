//! Shared handler state

use std::sync::Arc;

use prometheus::Registry;

use chat_core::repositories::{ConversationCache, ConversationRepository};
use chat_core::services::ConversationService;

pub type ChatService = ConversationService<dyn ConversationRepository, dyn ConversationCache>;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ChatService>,
    pub registry: Registry,
}
