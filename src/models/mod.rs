pub mod grant;
pub mod matching;

pub use grant::{GrantClaims, GrantPermissions, RoomGrant};
pub use matching::{
    EnqueueOutcome, EnqueueRequest, JoinRequest, MatchRecord, MatchState, MatchStatus,
};
