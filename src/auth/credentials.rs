//! Credential store: identity records and password verification
//!
//! Passwords are hashed with argon2id and stored as PHC strings; plaintext
//! never touches the database. Verification failures are reported uniformly
//! so callers cannot distinguish an unknown email from a wrong password.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use sqlx::SqlitePool;
use tracing::{error, info, warn};

use super::models::User;
use crate::common::{generate_user_id, safe_email_log, ApiError};

const INVALID_CREDENTIALS: &str = "invalid email or password";

pub struct CredentialService {
    db: SqlitePool,
}

impl CredentialService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create a new identity record
    ///
    /// Emails are normalized to lowercase; uniqueness is case-insensitive
    /// (enforced both here and by the unique index on the users table).
    pub async fn register(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let email = email.trim().to_lowercase();

        let existing: Option<(String,)> =
            sqlx::query_as("SELECT id FROM users WHERE email = ? COLLATE NOCASE")
                .bind(&email)
                .fetch_optional(&self.db)
                .await
                .map_err(ApiError::DatabaseError)?;

        if existing.is_some() {
            warn!(
                email = %safe_email_log(&email),
                "Registration rejected: email already registered"
            );
            return Err(ApiError::EmailTaken("email already registered".to_string()));
        }

        let password_hash = hash_password(password)?;
        let id = generate_user_id();

        sqlx::query("INSERT INTO users (id, email, password_hash) VALUES (?, ?, ?)")
            .bind(&id)
            .bind(&email)
            .bind(&password_hash)
            .execute(&self.db)
            .await
            .map_err(|e| {
                // A concurrent register can win between the check above and
                // this insert; the unique index reports it as a conflict,
                // not a server fault
                if e.as_database_error().is_some_and(|d| d.is_unique_violation()) {
                    warn!(
                        email = %safe_email_log(&email),
                        "Registration rejected: email already registered"
                    );
                    return ApiError::EmailTaken("email already registered".to_string());
                }
                error!(
                    error = %e,
                    email = %safe_email_log(&email),
                    "Database error inserting new user"
                );
                ApiError::DatabaseError(e)
            })?;

        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(&id)
            .fetch_one(&self.db)
            .await
            .map_err(ApiError::DatabaseError)?;

        info!(
            user_id = %user.id,
            email = %safe_email_log(&user.email),
            "User account created"
        );

        Ok(user)
    }

    /// Verify an email/password pair and return the matching user
    ///
    /// Unknown email and wrong password return the same error. The
    /// unknown-email path still burns one argon2 hashing round so the two
    /// cases take comparable time.
    pub async fn verify(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let email = email.trim().to_lowercase();

        let user: Option<User> =
            sqlx::query_as("SELECT * FROM users WHERE email = ? COLLATE NOCASE")
                .bind(&email)
                .fetch_optional(&self.db)
                .await
                .map_err(ApiError::DatabaseError)?;

        let user = match user {
            Some(u) => u,
            None => {
                let _ = hash_password(password);
                warn!(
                    email = %safe_email_log(&email),
                    "Login failed: unknown email"
                );
                return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
            }
        };

        if !verify_password(password, &user.password_hash) {
            warn!(
                user_id = %user.id,
                email = %safe_email_log(&email),
                "Login failed: wrong password"
            );
            return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        Ok(user)
    }

    /// Verify a password for an already-identified user (reauthentication)
    pub async fn verify_by_id(&self, user_id: &str, password: &str) -> Result<User, ApiError> {
        let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.db)
            .await
            .map_err(ApiError::DatabaseError)?;

        let user = match user {
            Some(u) => u,
            None => {
                let _ = hash_password(password);
                return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
            }
        };

        if !verify_password(password, &user.password_hash) {
            warn!(user_id = %user.id, "Reauthentication failed: wrong password");
            return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        Ok(user)
    }

    /// Replace a user's password after re-verifying the current one
    ///
    /// The reauthenticate-then-update two-step collapsed into one call.
    pub async fn rotate_password(
        &self,
        user_id: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), ApiError> {
        self.verify_by_id(user_id, old_password).await?;

        let password_hash = hash_password(new_password)?;

        sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(&password_hash)
            .bind(user_id)
            .execute(&self.db)
            .await
            .map_err(ApiError::DatabaseError)?;

        info!(user_id = %user_id, "Password rotated");

        Ok(())
    }

}

/// Hash a password into an argon2id PHC string
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| {
            error!(error = %e, "Password hashing failed");
            ApiError::InternalServer("password hashing failed".to_string())
        })
}

/// Check a password against a stored PHC hash
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            error!(error = %e, "Stored password hash is malformed");
            false
        }
    }
}
