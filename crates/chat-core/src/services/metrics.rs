//! Cache effectiveness counters

use prometheus::{IntCounter, IntCounterVec, Opts, Registry};

pub const ENTRY_CONVERSATION: &str = "conversation";
pub const ENTRY_MESSAGES: &str = "messages";

/// Counters describing how the cache behaves. Registered once in the
/// registry the server exposes on `/metrics`.
#[derive(Clone)]
pub struct ServiceMetrics {
    cache_hits: IntCounterVec,
    cache_misses: IntCounterVec,
    cache_errors: IntCounterVec,
    stale_writes: IntCounter,
}

impl ServiceMetrics {
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let cache_hits = IntCounterVec::new(
            Opts::new("chat_cache_hits_total", "Reads answered from the cache"),
            &["entry"],
        )?;
        let cache_misses = IntCounterVec::new(
            Opts::new("chat_cache_misses_total", "Reads that fell back to the durable store"),
            &["entry"],
        )?;
        let cache_errors = IntCounterVec::new(
            Opts::new("chat_cache_errors_total", "Cache operations that failed or timed out"),
            &["operation"],
        )?;
        let stale_writes = IntCounter::new(
            "chat_cache_stale_writes_total",
            "Durable writes whose cache update was skipped",
        )?;

        registry.register(Box::new(cache_hits.clone()))?;
        registry.register(Box::new(cache_misses.clone()))?;
        registry.register(Box::new(cache_errors.clone()))?;
        registry.register(Box::new(stale_writes.clone()))?;

        Ok(Self { cache_hits, cache_misses, cache_errors, stale_writes })
    }

    pub fn hit(&self, entry: &str) {
        self.cache_hits.with_label_values(&[entry]).inc();
    }

    pub fn miss(&self, entry: &str) {
        self.cache_misses.with_label_values(&[entry]).inc();
    }

    pub fn cache_error(&self, operation: &str) {
        self.cache_errors.with_label_values(&[operation]).inc();
    }

    pub fn stale_write(&self) {
        self.stale_writes.inc();
    }

    pub fn hits(&self, entry: &str) -> u64 {
        self.cache_hits.with_label_values(&[entry]).get()
    }

    pub fn misses(&self, entry: &str) -> u64 {
        self.cache_misses.with_label_values(&[entry]).get()
    }

    pub fn errors(&self, operation: &str) -> u64 {
        self.cache_errors.with_label_values(&[operation]).get()
    }

    pub fn stale_writes(&self) -> u64 {
        self.stale_writes.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_are_exported() {
        let registry = Registry::new();
        let metrics = ServiceMetrics::new(&registry).unwrap();

        metrics.hit(ENTRY_MESSAGES);
        metrics.miss(ENTRY_CONVERSATION);
        metrics.stale_write();

        assert_eq!(metrics.hits(ENTRY_MESSAGES), 1);
        assert_eq!(metrics.misses(ENTRY_CONVERSATION), 1);
        assert_eq!(metrics.stale_writes(), 1);

        let exported = prometheus::TextEncoder::new()
            .encode_to_string(&registry.gather())
            .unwrap();
        assert!(exported.contains("chat_cache_hits_total{entry=\"messages\"} 1"));
        assert!(exported.contains("chat_cache_stale_writes_total 1"));
    }

    #[test]
    fn test_double_registration_fails() {
        let registry = Registry::new();
        ServiceMetrics::new(&registry).unwrap();
        assert!(ServiceMetrics::new(&registry).is_err());
    }
}
