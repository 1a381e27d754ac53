//! Revoked Token Model
//!
//! Auth itself is an external collaborator; this store only exists so the
//! retention sweep can purge entries whose tokens have expired anyway.

use serde::{Deserialize, Serialize};

/// Revocation-list entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct RevokedToken {
    pub id: i64,
    /// SHA-256 of the token, hex — raw tokens are never stored
    pub token_hash: String,
    /// Token expiry (Unix millis); purgeable once in the past
    pub expires_at: i64,
    pub revoked_at: i64,
}
