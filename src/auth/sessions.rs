//! Session authority: issues, validates and revokes session tokens
//!
//! A token is an HS256 JWT whose `sid` claim names a row in the sessions
//! table. Validation checks both the signature and the row, so a revoked or
//! absent session never authorizes an operation even if the JWT itself is
//! still within its expiry.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sqlx::SqlitePool;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::models::{Claims, Session};
use crate::common::ApiError;

/// Token lifetime; revocation is handled by the sessions table, not expiry.
const TOKEN_TTL_HOURS: i64 = 24;

pub struct SessionService {
    db: SqlitePool,
}

impl SessionService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Issue a fresh session for a user and return it with its bearer token
    ///
    /// Concurrent sessions per user are unlimited (multiple device logins).
    pub async fn issue(&self, user_id: &str, jwt_secret: &str) -> Result<(Session, String), ApiError> {
        let session_id = Uuid::new_v4().to_string();

        sqlx::query("INSERT INTO sessions (id, user_id) VALUES (?, ?)")
            .bind(&session_id)
            .bind(user_id)
            .execute(&self.db)
            .await
            .map_err(|e| {
                error!(error = %e, user_id = %user_id, "Database error creating session");
                ApiError::DatabaseError(e)
            })?;

        let session = sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE id = ?")
            .bind(&session_id)
            .fetch_one(&self.db)
            .await
            .map_err(ApiError::DatabaseError)?;

        let exp = (Utc::now() + Duration::hours(TOKEN_TTL_HOURS)).timestamp() as usize;
        let claims = Claims {
            sub: user_id.to_string(),
            sid: session_id.clone(),
            exp,
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(jwt_secret.as_bytes()),
        )
        .map_err(|e| {
            error!(error = %e, user_id = %user_id, "JWT encoding error");
            ApiError::InternalServer("jwt error".to_string())
        })?;

        info!(user_id = %user_id, session_id = %session_id, "Session issued");

        Ok((session, token))
    }

    /// Validate a bearer token and return its live session
    pub async fn validate(&self, token: &str, jwt_secret: &str) -> Result<Session, ApiError> {
        let claims = decode_claims(token, jwt_secret)?;

        let session: Option<Session> =
            sqlx::query_as("SELECT * FROM sessions WHERE id = ? AND revoked = 0")
                .bind(&claims.sid)
                .fetch_optional(&self.db)
                .await
                .map_err(ApiError::DatabaseError)?;

        let session = match session {
            Some(s) => s,
            None => {
                warn!(session_id = %claims.sid, "Token rejected: session revoked or unknown");
                return Err(ApiError::Unauthorized("invalid session".to_string()));
            }
        };

        // The sid row is authoritative; a forged sub must not slip through.
        if session.user_id != claims.sub {
            warn!(session_id = %session.id, "Token rejected: subject mismatch");
            return Err(ApiError::Unauthorized("invalid session".to_string()));
        }

        Ok(session)
    }

    /// Revoke a session; revoking an already-revoked or unknown session is
    /// not an error.
    pub async fn revoke(&self, session_id: &str) -> Result<(), ApiError> {
        sqlx::query("UPDATE sessions SET revoked = 1 WHERE id = ?")
            .bind(session_id)
            .execute(&self.db)
            .await
            .map_err(ApiError::DatabaseError)?;

        info!(session_id = %session_id, "Session revoked");

        Ok(())
    }

    /// Revoke every session belonging to a user
    pub async fn revoke_all(&self, user_id: &str) -> Result<(), ApiError> {
        let result = sqlx::query("UPDATE sessions SET revoked = 1 WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.db)
            .await
            .map_err(ApiError::DatabaseError)?;

        info!(
            user_id = %user_id,
            revoked = result.rows_affected(),
            "All user sessions revoked"
        );

        Ok(())
    }

    /// Record a fresh password verification against a live session
    pub async fn mark_verified(&self, session_id: &str) -> Result<(), ApiError> {
        sqlx::query(
            "UPDATE sessions SET last_verified_at = datetime('now') WHERE id = ? AND revoked = 0",
        )
        .bind(session_id)
        .execute(&self.db)
        .await
        .map_err(ApiError::DatabaseError)?;

        Ok(())
    }
}

/// Decode and signature-check a bearer token
pub fn decode_claims(token: &str, jwt_secret: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        warn!(error = %e, "JWT validation failed");
        ApiError::Unauthorized("invalid token".to_string())
    })
}
