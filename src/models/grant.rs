use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Rights carried by a room grant
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct GrantPermissions {
    pub join: bool,
    pub publish: bool,
    pub subscribe: bool,
}

impl GrantPermissions {
    /// Full one-on-one session rights
    pub fn session() -> Self {
        Self {
            join: true,
            publish: true,
            subscribe: true,
        }
    }
}

/// JWT claims embedded in a room grant, verified by the media transport
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantClaims {
    pub sub: String, // identity
    pub room_id: String,
    pub permissions: GrantPermissions,
    pub iat: i64,
    pub exp: i64,
}

/// Short-lived, identity- and room-scoped credential returned to clients
#[derive(Debug, Clone, Serialize)]
pub struct RoomGrant {
    pub room_id: String,
    pub identity: String,
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub expires_in: u64,
    pub permissions: GrantPermissions,
}
