//! The waiting pool: every currently-unpaired join request, keyed by
//! requester identity.
//!
//! The pool is a plain data structure. The engine owns it behind a single
//! mutex, and that mutex is the pairing critical section, so the methods
//! here take `&mut self` and stay oblivious to locking.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::matchmaker::policy::CompatibilityPolicy;
use crate::models::JoinRequest;

#[derive(Debug, Default)]
pub struct WaitingPool {
    entries: HashMap<String, JoinRequest>,
    next_seq: u64,
}

impl WaitingPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.entries.contains_key(identity)
    }

    /// Stamp a fresh request with the next insertion sequence number.
    /// The request is not pooled until `insert` is called with it.
    pub fn make_request(
        &mut self,
        identity: &str,
        wants_video: bool,
        region: Option<String>,
    ) -> JoinRequest {
        let seq = self.next_seq;
        self.next_seq += 1;

        JoinRequest {
            identity: identity.to_string(),
            wants_video,
            region,
            enqueued_at: Utc::now(),
            seq,
        }
    }

    /// Add a request to the pool. Rejects an identity that is already
    /// waiting rather than silently overwriting its slot.
    pub fn insert(&mut self, request: JoinRequest) -> Result<(), AlreadyWaiting> {
        if self.entries.contains_key(&request.identity) {
            return Err(AlreadyWaiting);
        }

        self.entries.insert(request.identity.clone(), request);
        Ok(())
    }

    pub fn remove(&mut self, identity: &str) -> Option<JoinRequest> {
        self.entries.remove(identity)
    }

    /// All requests compatible with `probe`, oldest first.
    /// Ordered by `(enqueued_at, seq)` so ties are deterministic.
    pub fn snapshot_compatible(
        &self,
        probe: &JoinRequest,
        policy: &dyn CompatibilityPolicy,
    ) -> Vec<&JoinRequest> {
        let mut compatible: Vec<&JoinRequest> = self
            .entries
            .values()
            .filter(|candidate| candidate.identity != probe.identity)
            .filter(|candidate| policy.compatible(probe, candidate))
            .collect();

        compatible.sort_by_key(|request| (request.enqueued_at, request.seq));
        compatible
    }

    /// The single oldest compatible counterpart for `probe`, if any
    pub fn oldest_compatible(
        &self,
        probe: &JoinRequest,
        policy: &dyn CompatibilityPolicy,
    ) -> Option<&JoinRequest> {
        self.entries
            .values()
            .filter(|candidate| candidate.identity != probe.identity)
            .filter(|candidate| policy.compatible(probe, candidate))
            .min_by_key(|request| (request.enqueued_at, request.seq))
    }

    /// Remove every request enqueued at or before `cutoff` and return
    /// them so the engine can park cancellation notices.
    pub fn sweep_expired(&mut self, cutoff: DateTime<Utc>) -> Vec<JoinRequest> {
        let stale: Vec<String> = self
            .entries
            .values()
            .filter(|request| request.enqueued_at <= cutoff)
            .map(|request| request.identity.clone())
            .collect();

        stale
            .into_iter()
            .filter_map(|identity| self.entries.remove(&identity))
            .collect()
    }
}

/// The identity already occupies a pool slot
#[derive(Debug, PartialEq, Eq)]
pub struct AlreadyWaiting;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matchmaker::policy::VideoRegionPolicy;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn pooled(pool: &mut WaitingPool, identity: &str, wants_video: bool, region: Option<&str>) {
        let request = pool.make_request(identity, wants_video, region.map(str::to_string));
        pool.insert(request).expect("insert should succeed");
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut pool = WaitingPool::new();
        pooled(&mut pool, "alice", true, None);

        let duplicate = pool.make_request("alice", true, None);
        assert_eq!(pool.insert(duplicate), Err(AlreadyWaiting));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_remove() {
        let mut pool = WaitingPool::new();
        pooled(&mut pool, "alice", true, None);

        assert!(pool.remove("alice").is_some());
        assert!(pool.remove("alice").is_none());
        assert!(pool.is_empty());
    }

    #[test]
    fn test_oldest_compatible_is_fifo() {
        let mut pool = WaitingPool::new();
        pooled(&mut pool, "first", true, None);
        pooled(&mut pool, "second", true, None);
        pooled(&mut pool, "audio-only", false, None);

        let probe = pool.make_request("newcomer", true, None);
        let partner = pool
            .oldest_compatible(&probe, &VideoRegionPolicy)
            .expect("should find a partner");

        assert_eq!(partner.identity, "first");
    }

    #[test]
    fn test_equal_timestamps_break_ties_by_seq() {
        let mut pool = WaitingPool::new();
        let stamp = Utc::now();

        for identity in ["a", "b"] {
            let mut request = pool.make_request(identity, true, None);
            request.enqueued_at = stamp;
            pool.insert(request).unwrap();
        }

        let probe = pool.make_request("c", true, None);
        let partner = pool.oldest_compatible(&probe, &VideoRegionPolicy).unwrap();
        assert_eq!(partner.identity, "a");
    }

    #[test]
    fn test_snapshot_compatible_ordering_and_filtering() {
        let mut pool = WaitingPool::new();
        pooled(&mut pool, "eu-1", true, Some("eu"));
        pooled(&mut pool, "us-1", true, Some("us"));
        pooled(&mut pool, "global", true, None);

        let probe = pool.make_request("newcomer", true, Some("eu".to_string()));
        let snapshot = pool.snapshot_compatible(&probe, &VideoRegionPolicy);

        let identities: Vec<&str> = snapshot.iter().map(|r| r.identity.as_str()).collect();
        assert_eq!(identities, vec!["eu-1", "global"]);
    }

    #[test]
    fn test_probe_never_matches_itself() {
        let mut pool = WaitingPool::new();
        pooled(&mut pool, "alice", true, None);

        let probe = pool.entries.get("alice").unwrap().clone();
        assert!(pool.oldest_compatible(&probe, &VideoRegionPolicy).is_none());
    }

    #[test]
    fn test_sweep_expired_removes_only_stale_entries() {
        let mut pool = WaitingPool::new();
        pooled(&mut pool, "old", true, None);
        pooled(&mut pool, "fresh", true, None);

        let cutoff = Utc::now() - Duration::seconds(30);
        pool.entries.get_mut("old").unwrap().enqueued_at = cutoff - Duration::seconds(1);

        let evicted = pool.sweep_expired(cutoff);
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].identity, "old");
        assert!(pool.contains("fresh"));
    }
}
