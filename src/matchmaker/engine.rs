//! The matching engine: owns the waiting pool and the match-record table,
//! pairs compatible requesters atomically, and answers status polls.
//!
//! One mutex guards the pairing decision (pool scan + removals + record
//! creation). Everything downstream of a settled pairing (status reads,
//! grant bookkeeping, sweeping) runs against concurrent tables without
//! taking that lock.

use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::matchmaker::policy::{CompatibilityPolicy, VideoRegionPolicy};
use crate::matchmaker::pool::WaitingPool;
use crate::models::{EnqueueOutcome, MatchRecord, MatchState, MatchStatus};

/// Lifetime counters, reported through the health endpoint
#[derive(Debug, Clone, Default)]
pub struct MatchmakerStats {
    pub requests_enqueued: u64,
    pub pairs_matched: u64,
    pub requests_evicted: u64,
    pub matches_consumed: u64,
    pub matches_expired: u64,
}

/// Point-in-time view of the engine for health reporting
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub waiting: usize,
    pub open_matches: usize,
    pub requests_enqueued: u64,
    pub pairs_matched: u64,
    pub requests_evicted: u64,
    pub matches_consumed: u64,
    pub matches_expired: u64,
}

/// What one sweep pass did
#[derive(Debug, Clone, Copy, Default)]
pub struct SweepSummary {
    pub evicted: usize,
    pub expired: usize,
    pub purged: usize,
}

impl SweepSummary {
    pub fn any(&self) -> bool {
        self.evicted > 0 || self.expired > 0 || self.purged > 0
    }
}

/// The matchmaking service object. Created once at process start; API
/// handlers and the sweeper task share it behind an `Arc`.
pub struct Matchmaker {
    pool: Mutex<WaitingPool>,
    /// room_id -> record, for every pairing not yet purged
    records: DashMap<String, MatchRecord>,
    /// identity -> room_id while the identity's match is unconsumed
    participants: DashMap<String, String>,
    /// One-shot eviction notices, cleared on first status read
    cancelled: DashMap<String, DateTime<Utc>>,
    policy: Arc<dyn CompatibilityPolicy>,
    stats: RwLock<MatchmakerStats>,
    max_queue_wait: Duration,
    match_claim: Duration,
    record_retention: Duration,
}

impl Matchmaker {
    pub fn new(config: &Config) -> Self {
        Self::with_policy(config, Arc::new(VideoRegionPolicy))
    }

    /// Create with a custom compatibility predicate
    pub fn with_policy(config: &Config, policy: Arc<dyn CompatibilityPolicy>) -> Self {
        Self {
            pool: Mutex::new(WaitingPool::new()),
            records: DashMap::new(),
            participants: DashMap::new(),
            cancelled: DashMap::new(),
            policy,
            stats: RwLock::new(MatchmakerStats::default()),
            max_queue_wait: Duration::seconds(config.max_queue_wait_seconds as i64),
            match_claim: Duration::seconds(config.match_claim_seconds as i64),
            record_retention: Duration::seconds(config.record_retention_seconds as i64),
        }
    }

    /// Register a join request and attempt pairing inline.
    ///
    /// Either pairs with the oldest compatible waiter and reports the new
    /// room, or parks the request in the pool. A duplicate enqueue while
    /// pooled fails with `AlreadyWaiting`; an enqueue while a prior match
    /// is still unconsumed reports that match again instead of letting
    /// the identity occupy two slots.
    pub fn enqueue(
        &self,
        identity: &str,
        wants_video: bool,
        region: Option<String>,
    ) -> Result<EnqueueOutcome> {
        if let Some(room_id) = self.participants.get(identity) {
            return Ok(EnqueueOutcome::Matched {
                room_id: room_id.value().clone(),
            });
        }

        let mut pool = self
            .pool
            .lock()
            .map_err(|_| AppError::InternalError("Failed to acquire pool lock".to_string()))?;

        if pool.contains(identity) {
            return Err(AppError::AlreadyWaiting);
        }

        // A fresh attempt supersedes any unread eviction notice
        self.cancelled.remove(identity);

        let request = pool.make_request(identity, wants_video, region);

        let partner = pool
            .oldest_compatible(&request, self.policy.as_ref())
            .cloned();

        let outcome = match partner {
            Some(partner) => {
                let record = MatchRecord::new(partner.identity.clone(), request.identity.clone());
                let room_id = record.room_id.clone();

                // The record becomes visible before the partner's pool
                // slot is cleared, so a concurrent status poll never
                // observes a gap between "waiting" and "matched".
                self.participants
                    .insert(partner.identity.clone(), room_id.clone());
                self.participants
                    .insert(request.identity.clone(), room_id.clone());
                self.records.insert(room_id.clone(), record);
                pool.remove(&partner.identity);

                info!(
                    room_id = %room_id,
                    participant_a = %partner.identity,
                    participant_b = %identity,
                    "Matched pair"
                );

                EnqueueOutcome::Matched { room_id }
            }
            None => {
                pool.insert(request)
                    .map_err(|_| AppError::AlreadyWaiting)?;
                debug!(identity = %identity, "Enqueued, no compatible counterpart yet");
                EnqueueOutcome::Waiting
            }
        };
        drop(pool);

        let mut stats = self
            .stats
            .write()
            .map_err(|_| AppError::InternalError("Failed to acquire stats lock".to_string()))?;
        stats.requests_enqueued += 1;
        if matches!(outcome, EnqueueOutcome::Matched { .. }) {
            stats.pairs_matched += 1;
        }

        Ok(outcome)
    }

    /// Answer "has this identity been matched yet?". Pure read, except
    /// that an eviction notice is consumed by the first poll that sees it.
    pub fn check_status(&self, identity: &str) -> Result<MatchStatus> {
        // Pool first: pairing publishes the record before it clears the
        // pool slots, so this order never reports a gap.
        {
            let pool = self
                .pool
                .lock()
                .map_err(|_| AppError::InternalError("Failed to acquire pool lock".to_string()))?;
            if pool.contains(identity) {
                return Ok(MatchStatus::Waiting);
            }
        }

        if let Some(room_id) = self.participants.get(identity) {
            return Ok(MatchStatus::Matched {
                room_id: room_id.value().clone(),
            });
        }

        if self.cancelled.remove(identity).is_some() {
            return Ok(MatchStatus::Cancelled);
        }

        Ok(MatchStatus::NotFound)
    }

    /// Withdraw the identity's own pending request. Has no effect once a
    /// match is struck; the pairing is final.
    pub fn cancel(&self, identity: &str) -> Result<bool> {
        let mut pool = self
            .pool
            .lock()
            .map_err(|_| AppError::InternalError("Failed to acquire pool lock".to_string()))?;

        let removed = pool.remove(identity).is_some();
        if removed {
            info!(identity = %identity, "Join request withdrawn");
        }
        Ok(removed)
    }

    /// Check that `identity` may receive a grant for `room_id`, and track
    /// consumption: once both participants have retrieved one, the record
    /// transitions Matched -> Consumed. Refusals are logged; they are the
    /// security-relevant path.
    pub fn authorize_grant(&self, identity: &str, room_id: &str) -> Result<()> {
        let mut record = match self.records.get_mut(room_id) {
            Some(record) => record,
            None => {
                warn!(room_id = %room_id, identity = %identity, "Grant refused: unknown room");
                return Err(AppError::Denied("No match for this room".to_string()));
            }
        };

        if !record.contains(identity) {
            warn!(room_id = %room_id, identity = %identity, "Grant refused: not a participant");
            return Err(AppError::Denied("Not a participant of this room".to_string()));
        }

        if record.state == MatchState::Expired {
            warn!(room_id = %room_id, identity = %identity, "Grant refused: match expired");
            return Err(AppError::Denied("Match has expired".to_string()));
        }

        let both_granted = record.mark_granted(identity);
        if both_granted && record.state == MatchState::Matched {
            record.state = MatchState::Consumed;
            self.participants.remove(&record.participant_a);
            self.participants.remove(&record.participant_b);
            info!(room_id = %room_id, "Match consumed, both grants retrieved");

            let mut stats = self.stats.write().map_err(|_| {
                AppError::InternalError("Failed to acquire stats lock".to_string())
            })?;
            stats.matches_consumed += 1;
        }

        Ok(())
    }

    /// Look up a match record by room id
    pub fn record(&self, room_id: &str) -> Option<MatchRecord> {
        self.records.get(room_id).map(|record| record.value().clone())
    }

    /// One expiry pass: evict stale waiters, expire unclaimed matches,
    /// drop settled records and unread notices past retention.
    pub fn sweep(&self) -> Result<SweepSummary> {
        let now = Utc::now();
        let mut summary = SweepSummary::default();

        {
            let mut pool = self
                .pool
                .lock()
                .map_err(|_| AppError::InternalError("Failed to acquire pool lock".to_string()))?;

            // Notices are parked under the pool lock so a concurrent
            // re-enqueue (which clears them under the same lock) cannot
            // interleave and leave a stale notice behind.
            for request in pool.sweep_expired(now - self.max_queue_wait) {
                info!(identity = %request.identity, "Join request timed out");
                self.cancelled.insert(request.identity, now);
                summary.evicted += 1;
            }
        }

        let claim_cutoff = now - self.match_claim;
        let unclaimed: Vec<String> = self
            .records
            .iter()
            .filter(|entry| entry.state == MatchState::Matched && entry.matched_at <= claim_cutoff)
            .map(|entry| entry.key().clone())
            .collect();

        for room_id in unclaimed {
            let Some(mut record) = self.records.get_mut(&room_id) else {
                continue;
            };
            if record.state != MatchState::Matched || record.matched_at > claim_cutoff {
                continue;
            }

            record.state = MatchState::Expired;
            summary.expired += 1;

            let sides = [
                (record.participant_a.clone(), record.granted_a),
                (record.participant_b.clone(), record.granted_b),
            ];
            for (participant, granted) in sides {
                self.participants.remove(&participant);
                if !granted {
                    // only a side still waiting on its grant needs to
                    // re-enqueue
                    self.cancelled.insert(participant, now);
                }
            }

            info!(room_id = %room_id, "Match expired unconsumed");
        }

        let retention_cutoff = now - self.record_retention;
        let purgeable: Vec<String> = self
            .records
            .iter()
            .filter(|entry| {
                entry.state != MatchState::Matched && entry.matched_at <= retention_cutoff
            })
            .map(|entry| entry.key().clone())
            .collect();

        for room_id in purgeable {
            let removed = self.records.remove_if(&room_id, |_, record| {
                record.state != MatchState::Matched && record.matched_at <= retention_cutoff
            });
            if removed.is_some() {
                summary.purged += 1;
            }
        }

        self.cancelled
            .retain(|_, parked_at| *parked_at > retention_cutoff);

        if summary.evicted > 0 || summary.expired > 0 {
            let mut stats = self
                .stats
                .write()
                .map_err(|_| AppError::InternalError("Failed to acquire stats lock".to_string()))?;
            stats.requests_evicted += summary.evicted as u64;
            stats.matches_expired += summary.expired as u64;
        }

        Ok(summary)
    }

    /// Run the expiry sweep on a fixed cadence until the process exits
    pub fn spawn_sweeper(
        self: Arc<Self>,
        period: std::time::Duration,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(period);
            loop {
                tick.tick().await;
                match self.sweep() {
                    Ok(summary) if summary.any() => {
                        debug!(
                            evicted = summary.evicted,
                            expired = summary.expired,
                            purged = summary.purged,
                            "Sweep pass"
                        );
                    }
                    Ok(_) => {}
                    Err(e) => error!(error = %e, "Sweep pass failed"),
                }
            }
        })
    }

    pub fn stats_snapshot(&self) -> Result<StatsSnapshot> {
        let waiting = self
            .pool
            .lock()
            .map_err(|_| AppError::InternalError("Failed to acquire pool lock".to_string()))?
            .len();

        let stats = self
            .stats
            .read()
            .map_err(|_| AppError::InternalError("Failed to acquire stats lock".to_string()))?;

        Ok(StatsSnapshot {
            waiting,
            open_matches: self.participants.len() / 2,
            requests_enqueued: stats.requests_enqueued,
            pairs_matched: stats.pairs_matched,
            requests_evicted: stats.requests_evicted,
            matches_consumed: stats.matches_consumed,
            matches_expired: stats.matches_expired,
        })
    }
}
