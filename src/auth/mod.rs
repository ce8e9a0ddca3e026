use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{GrantClaims, GrantPermissions, RoomGrant};

/// Header installed by the upstream identity provider. The engine trusts
/// it and performs no authentication itself.
pub const IDENTITY_HEADER: &str = "x-identity";

/// Verified caller identity, extracted from every inbound request
#[derive(Debug, Clone)]
pub struct Identity(pub String);

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        let identity = parts
            .headers
            .get(IDENTITY_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                AppError::Unauthorized(format!("Missing {} header", IDENTITY_HEADER))
            })?;

        Ok(Identity(identity.to_string()))
    }
}

/// Room grant signing service
#[derive(Clone)]
pub struct GrantSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_seconds: u64,
}

impl GrantSigner {
    pub fn new(config: &Config) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.grant_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.grant_secret.as_bytes()),
            ttl_seconds: config.grant_ttl_seconds,
        }
    }

    /// Mint a signed, time-bound grant for one identity in one room.
    /// Authorization against the match record happens before this is
    /// called; the token itself is stateless.
    pub fn issue(&self, identity: &str, room_id: &str) -> Result<RoomGrant> {
        let issued_at = Utc::now();
        let expires_at = issued_at + Duration::seconds(self.ttl_seconds as i64);
        let permissions = GrantPermissions::session();

        let claims = GrantClaims {
            sub: identity.to_string(),
            room_id: room_id.to_string(),
            permissions,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)?;

        Ok(RoomGrant {
            room_id: room_id.to_string(),
            identity: identity.to_string(),
            token,
            issued_at,
            expires_at,
            expires_in: self.ttl_seconds,
            permissions,
        })
    }

    /// Validate a grant token and return its claims. The media transport
    /// performs the same check against the shared secret.
    pub fn verify(&self, token: &str) -> Result<GrantClaims> {
        let validation = Validation::default();
        let token_data = decode::<GrantClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| AppError::Unauthorized(format!("Invalid grant: {}", e)))?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            server_host: "localhost".to_string(),
            server_port: 8080,
            grant_secret: "test-secret-key".to_string(),
            grant_ttl_seconds: 300,
            max_queue_wait_seconds: 120,
            match_claim_seconds: 90,
            record_retention_seconds: 600,
            sweep_interval_seconds: 5,
        }
    }

    #[test]
    fn test_issue_and_verify_grant() {
        let signer = GrantSigner::new(&test_config());

        let grant = signer
            .issue("user-123", "room-456")
            .expect("Should issue grant");

        assert_eq!(grant.identity, "user-123");
        assert_eq!(grant.room_id, "room-456");
        assert!(grant.permissions.join && grant.permissions.publish && grant.permissions.subscribe);

        let claims = signer.verify(&grant.token).expect("Should verify grant");
        assert_eq!(claims.sub, "user-123");
        assert_eq!(claims.room_id, "room-456");
    }

    #[test]
    fn test_invalid_token_rejected() {
        let signer = GrantSigner::new(&test_config());
        assert!(signer.verify("not-a-token").is_err());
    }

    #[test]
    fn test_token_signed_with_other_secret_rejected() {
        let signer = GrantSigner::new(&test_config());

        let mut other_config = test_config();
        other_config.grant_secret = "some-other-secret".to_string();
        let other = GrantSigner::new(&other_config);

        let grant = other.issue("user-123", "room-456").unwrap();
        assert!(signer.verify(&grant.token).is_err());
    }

    #[tokio::test]
    async fn test_identity_extracted_from_header() {
        let request = axum::http::Request::builder()
            .uri("/")
            .header(IDENTITY_HEADER, "alice")
            .body(())
            .unwrap();
        let (mut parts, _) = request.into_parts();

        let identity = Identity::from_request_parts(&mut parts, &())
            .await
            .expect("Should extract identity");
        assert_eq!(identity.0, "alice");
    }

    #[tokio::test]
    async fn test_missing_or_blank_identity_rejected() {
        let request = axum::http::Request::builder().uri("/").body(()).unwrap();
        let (mut parts, _) = request.into_parts();
        assert!(Identity::from_request_parts(&mut parts, &()).await.is_err());

        let request = axum::http::Request::builder()
            .uri("/")
            .header(IDENTITY_HEADER, "   ")
            .body(())
            .unwrap();
        let (mut parts, _) = request.into_parts();
        assert!(Identity::from_request_parts(&mut parts, &()).await.is_err());
    }
}
