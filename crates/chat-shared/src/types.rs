//! Common types

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

pub type EntityId = Uuid;

pub fn new_id() -> EntityId {
    Uuid::new_v4()
}

/// Current time at the precision the durable store keeps (microseconds).
///
/// Timestamps that pass through the cache must compare equal to the ones read
/// back from PostgreSQL, so nothing finer than a microsecond is ever produced.
pub fn now_utc() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Pagination {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page.clamp(1, MAX_PAGE_SIZE))
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page.max(1) - 1) * self.limit()
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: 1, per_page: DEFAULT_PAGE_SIZE }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pagination() {
        let page = Pagination::default();
        assert_eq!(page.limit(), 20);
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn test_pagination_clamps() {
        let page = Pagination::new(0, 500);
        assert_eq!(page.page, 1);
        assert_eq!(page.limit(), 100);

        let page = Pagination::new(3, 10);
        assert_eq!(page.offset(), 20);
    }

    #[test]
    fn test_now_utc_has_microsecond_precision() {
        let now = now_utc();
        assert_eq!(now.timestamp_subsec_nanos() % 1_000, 0);
    }
}
