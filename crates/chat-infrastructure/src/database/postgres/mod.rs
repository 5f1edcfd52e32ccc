//! PostgreSQL repository implementations

mod conversation_repo_impl;

pub use conversation_repo_impl::PgConversationRepository;
