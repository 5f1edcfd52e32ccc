//! Domain services (business logic)

pub mod conversation_service;
pub mod locks;
pub mod metrics;
pub mod trimmer;

pub use conversation_service::{CachePolicy, ConversationService, HealthStatus};
pub use locks::{ConversationGuard, ConversationLocks};
pub use metrics::ServiceMetrics;
pub use trimmer::Trimmer;
