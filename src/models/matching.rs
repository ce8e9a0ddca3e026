use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A pending request to be paired, held in the waiting pool
#[derive(Debug, Clone)]
pub struct JoinRequest {
    pub identity: String,
    pub wants_video: bool,
    /// Region tag the requester restricts pairing to; `None` means global
    pub region: Option<String>,
    pub enqueued_at: DateTime<Utc>,
    /// Pool insertion sequence number, the deterministic tie-break key
    pub seq: u64,
}

/// The settled result of a pairing: one room, two participants
#[derive(Debug, Clone, Serialize)]
pub struct MatchRecord {
    pub room_id: String,
    pub participant_a: String,
    pub participant_b: String,
    pub matched_at: DateTime<Utc>,
    pub state: MatchState,
    /// Whether each side has retrieved its room grant
    pub granted_a: bool,
    pub granted_b: bool,
}

/// Match record lifecycle
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MatchState {
    /// Paired, at least one side has not fetched a grant yet
    Matched,
    /// Both sides retrieved a grant
    Consumed,
    /// Unconsumed past the claim deadline, reclaimed by the sweep
    Expired,
}

impl MatchRecord {
    pub fn new(participant_a: String, participant_b: String) -> Self {
        Self {
            room_id: uuid::Uuid::new_v4().to_string(),
            participant_a,
            participant_b,
            matched_at: Utc::now(),
            state: MatchState::Matched,
            granted_a: false,
            granted_b: false,
        }
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.participant_a == identity || self.participant_b == identity
    }

    /// Mark the given participant's grant as retrieved.
    /// Returns true once both sides have one.
    pub fn mark_granted(&mut self, identity: &str) -> bool {
        if self.participant_a == identity {
            self.granted_a = true;
        } else if self.participant_b == identity {
            self.granted_b = true;
        }
        self.granted_a && self.granted_b
    }
}

/// Request to enter the waiting pool
#[derive(Debug, Deserialize)]
pub struct EnqueueRequest {
    pub wants_video: bool,
    #[serde(default)]
    pub region: Option<String>,
}

/// Outcome of an enqueue call, returned to the client
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum EnqueueOutcome {
    /// Paired immediately (or a prior pairing is still open)
    Matched { room_id: String },
    /// No compatible counterpart yet; poll the status endpoint
    Waiting,
}

/// Answer of the status poll
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum MatchStatus {
    Waiting,
    Matched { room_id: String },
    /// Evicted by timeout; reported exactly once, then the record is gone
    Cancelled,
    NotFound,
}
