//! A remote peer's liveness bookkeeping, owned exclusively by
//! [`crate::host::HostManager`]. Freshness is a query-time filter, not a
//! field: a record is "fresh" iff `now - last_ping_time < HOST_MIN_FRESHNESS_SEC`.

use serde::{Deserialize, Serialize};

use crate::constants::HOST_MIN_FRESHNESS_SEC;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerRecord {
    pub address: String,
    pub last_ping_time: u64,
    pub clock_delta: i64,
    pub reported_version: u32,
}

impl PeerRecord {
    pub fn new(address: String, now: u64, peer_timestamp: u64, reported_version: u32) -> PeerRecord {
        PeerRecord {
            address,
            last_ping_time: now,
            clock_delta: now as i64 - peer_timestamp as i64,
            reported_version,
        }
    }

    pub fn is_fresh(&self, now: u64) -> bool {
        now.saturating_sub(self.last_ping_time) < HOST_MIN_FRESHNESS_SEC
    }

    pub fn refresh(&mut self, now: u64, peer_timestamp: u64) {
        self.last_ping_time = now;
        self.clock_delta = now as i64 - peer_timestamp as i64;
    }

    /// Non-HTTP peer addresses (used historically for browser/JS peers)
    /// are never probed directly and never counted among fresh hosts used
    /// for sync or gossip sampling.
    pub fn is_http_reachable(&self) -> bool {
        self.address.starts_with("http://") || self.address.starts_with("https://")
    }
}

#[cfg(test)]
mod peer_record_tests {
    use super::*;

    #[test]
    fn fresh_immediately_after_creation() {
        let r = PeerRecord::new("http://peer".into(), 1000, 1000, 1);
        assert!(r.is_fresh(1000));
        assert!(r.is_fresh(1000 + HOST_MIN_FRESHNESS_SEC - 1));
    }

    #[test]
    fn stale_after_freshness_window() {
        let r = PeerRecord::new("http://peer".into(), 1000, 1000, 1);
        assert!(!r.is_fresh(1000 + HOST_MIN_FRESHNESS_SEC));
    }

    #[test]
    fn refresh_updates_ping_time_and_delta() {
        let mut r = PeerRecord::new("http://peer".into(), 1000, 990, 1);
        assert_eq!(r.clock_delta, 10);
        r.refresh(2000, 1995);
        assert_eq!(r.last_ping_time, 2000);
        assert_eq!(r.clock_delta, 5);
    }

    #[test]
    fn non_http_scheme_is_not_reachable() {
        let r = PeerRecord::new("peer://abc".into(), 1000, 1000, 1);
        assert!(!r.is_http_reachable());
    }
}
