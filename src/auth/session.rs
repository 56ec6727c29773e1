//! Refresh-token session management.
//!
//! Each login opens a session backed by a rotating refresh token. Presenting
//! the token yields a successor and retires the original; presenting a retired
//! token again is treated as theft and tears down every session the user has.
//!
//! Raw tokens are 32 bytes of OS randomness, base64url-encoded. Storage only
//! ever sees a keyed HMAC-SHA256 digest of the raw value: deterministic, so a
//! presented token can be matched by unique index, and useless to an attacker
//! who reads the table without the server-held pepper.

use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;
use tracing::{field, info, instrument, warn};

use crate::auth::models::{NewRefreshToken, RefreshTokenRecord, RefreshTokenState};
use crate::config::AuthConfig;
use crate::domain::{RefreshTokenId, UserId};
use crate::errors::{Result, TaskplaneError};
use crate::storage::repositories::RefreshTokenRepository;

/// Refresh token byte length (32 bytes = 256 bits of entropy)
const REFRESH_TOKEN_BYTES: usize = 32;

/// Refresh cookie name
pub const REFRESH_COOKIE_NAME: &str = "tp_refresh";

type HmacSha256 = Hmac<Sha256>;

/// Service owning the refresh-token lifecycle.
#[derive(Clone)]
pub struct SessionService {
    repository: Arc<dyn RefreshTokenRepository>,
    pepper: Vec<u8>,
    ttl_minutes: i64,
}

impl SessionService {
    pub fn new(repository: Arc<dyn RefreshTokenRepository>, config: &AuthConfig) -> Self {
        Self {
            repository,
            pepper: config.refresh_token_pepper.as_bytes().to_vec(),
            ttl_minutes: config.refresh_token_ttl_minutes as i64,
        }
    }

    /// Generate a fresh raw token value.
    fn generate_raw_token(&self) -> String {
        let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Keyed digest of a raw token, hex-encoded for storage and lookup.
    fn digest(&self, raw_token: &str) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(&self.pepper)
            .map_err(|err| TaskplaneError::internal(format!("Invalid digest key: {}", err)))?;
        mac.update(raw_token.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    fn new_token_payload(&self, user_id: &UserId) -> (String, NewRefreshToken) {
        let raw = self.generate_raw_token();
        let now = Utc::now();
        (
            raw.clone(),
            NewRefreshToken {
                id: RefreshTokenId::new(),
                user_id: user_id.clone(),
                // Digest is filled in by the caller, which owns error handling
                token_hash: String::new(),
                created_at: now,
                expires_at: now + Duration::minutes(self.ttl_minutes),
            },
        )
    }

    /// Open a new session for the user. Returns the raw token for the client
    /// and the stored record.
    #[instrument(skip(self), fields(user_id = %user_id, correlation_id = field::Empty))]
    pub async fn create_session(&self, user_id: &UserId) -> Result<(String, RefreshTokenRecord)> {
        tracing::Span::current().record("correlation_id", field::display(&uuid::Uuid::new_v4()));

        let (raw, mut payload) = self.new_token_payload(user_id);
        payload.token_hash = self.digest(&raw)?;

        let record = self.repository.insert(payload).await?;

        info!(user_id = %user_id, token_id = %record.id, "Refresh session created");
        Ok((raw, record))
    }

    /// Validate a presented refresh token without rotating it.
    ///
    /// Unknown, expired, and revoked-but-never-replaced tokens all surface the
    /// same `Unauthorized` error. A replayed (already replaced) token triggers
    /// family revocation and the distinct `SessionInvalidated` error.
    pub async fn validate(&self, raw_token: &str) -> Result<RefreshTokenRecord> {
        let hash = self.digest(raw_token)?;
        let record = self
            .repository
            .find_by_hash(&hash)
            .await?
            .ok_or_else(|| TaskplaneError::unauthorized("invalid refresh token"))?;

        match record.state_at(Utc::now()) {
            RefreshTokenState::Active => Ok(record),
            RefreshTokenState::Replaced => Err(self.handle_reuse(&record).await),
            RefreshTokenState::Revoked | RefreshTokenState::Expired => {
                Err(TaskplaneError::unauthorized("invalid refresh token"))
            }
        }
    }

    /// Rotate a presented refresh token: retire it and hand back a successor.
    ///
    /// The owner of the new token is taken from the matched record, never from
    /// the caller. Losing the conditional update is resolved by re-reading the
    /// row: if a successor exists the loser raced another rotation and is
    /// handled like replay; if the token merely became revoked or expired in
    /// flight (a refresh racing a logout) it fails like any other dead token.
    #[instrument(skip(self, raw_token), fields(correlation_id = field::Empty))]
    pub async fn rotate(&self, raw_token: &str) -> Result<(String, RefreshTokenRecord)> {
        tracing::Span::current().record("correlation_id", field::display(&uuid::Uuid::new_v4()));

        let hash = self.digest(raw_token)?;
        let record = self
            .repository
            .find_by_hash(&hash)
            .await?
            .ok_or_else(|| TaskplaneError::unauthorized("invalid refresh token"))?;

        match record.state_at(Utc::now()) {
            RefreshTokenState::Active => {}
            RefreshTokenState::Replaced => return Err(self.handle_reuse(&record).await),
            RefreshTokenState::Revoked | RefreshTokenState::Expired => {
                return Err(TaskplaneError::unauthorized("invalid refresh token"))
            }
        }

        let (raw, mut payload) = self.new_token_payload(&record.user_id);
        payload.token_hash = self.digest(&raw)?;

        match self.repository.rotate(&hash, payload).await? {
            Some(successor) => {
                info!(
                    user_id = %record.user_id,
                    old_token_id = %record.id,
                    new_token_id = %successor.id,
                    "Refresh token rotated"
                );
                Ok((raw, successor))
            }
            None => {
                // Lost the conditional update. Only a row with a successor is
                // a theft signal; a token revoked or expired mid-flight gets
                // the same answer as any other dead token.
                let current = self
                    .repository
                    .find_by_hash(&hash)
                    .await?
                    .ok_or_else(|| TaskplaneError::unauthorized("invalid refresh token"))?;

                if current.replaced_by_hash.is_some() {
                    Err(self.handle_reuse(&current).await)
                } else {
                    Err(TaskplaneError::unauthorized("invalid refresh token"))
                }
            }
        }
    }

    /// Revoke the session identified by a raw token. Idempotent: revoking an
    /// unknown or already-terminal token succeeds silently, so logout never
    /// leaks whether a token was valid.
    pub async fn revoke(&self, raw_token: &str) -> Result<()> {
        let hash = self.digest(raw_token)?;
        self.repository.revoke_by_hash(&hash).await
    }

    /// Revoke every session the user has. Used on password change and on
    /// reuse detection.
    pub async fn revoke_all_for_user(&self, user_id: &UserId) -> Result<u64> {
        let revoked = self.repository.revoke_all_for_user(user_id).await?;
        if revoked > 0 {
            info!(user_id = %user_id, revoked, "Revoked all refresh sessions for user");
        }
        Ok(revoked)
    }

    /// Replay of a replaced token: assume theft, tear down the whole family.
    async fn handle_reuse(&self, record: &RefreshTokenRecord) -> TaskplaneError {
        warn!(
            user_id = %record.user_id,
            token_id = %record.id,
            "Replaced refresh token presented again; revoking all sessions for user"
        );

        if let Err(err) = self.repository.revoke_all_for_user(&record.user_id).await {
            // The reuse signal matters more than the cleanup failure; report
            // the invalidation and log the storage error.
            warn!(error = %err, user_id = %record.user_id, "Failed to revoke user sessions after reuse detection");
        }

        TaskplaneError::session_invalidated(
            "refresh token reuse detected; all sessions have been revoked",
        )
    }
}
