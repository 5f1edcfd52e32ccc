//! Application-wide constants

/// Seconds a cache entry lives after its last write (7 days).
pub const CACHE_TTL_SECS: u64 = 604_800;
/// Upper bound of the cached message window per conversation.
pub const MAX_CACHED_MESSAGES: usize = 100;
/// Per-operation cache deadline before the caller falls back.
pub const DEFAULT_CACHE_OP_TIMEOUT_MS: u64 = 250;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

pub const DEFAULT_CONVERSATION_TITLE: &str = "New Chat";
