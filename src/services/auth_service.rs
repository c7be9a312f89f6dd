use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::database::entities::{user_sessions, users};

/// Lifetime of a login session.
pub const SESSION_HOURS: i64 = 24;

/// Authentication-related errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account is deactivated")]
    AccountDeactivated,

    #[error("Session expired")]
    SessionExpired,

    #[error("Session not found")]
    SessionNotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        AuthError::DatabaseError(err.to_string())
    }
}

/// Password hashing and session bookkeeping.
#[derive(Clone)]
pub struct AuthService {
    db: DatabaseConnection,
}

impl AuthService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Hash a password using bcrypt
    pub fn hash_password(password: &str) -> Result<String, AuthError> {
        Self::hash_password_with_cost(password, DEFAULT_COST)
    }

    pub fn hash_password_with_cost(password: &str, cost: u32) -> Result<String, AuthError> {
        if password.is_empty() {
            return Err(AuthError::ValidationError(
                "Password cannot be empty".to_string(),
            ));
        }

        hash(password, cost)
            .map_err(|e| AuthError::ValidationError(format!("Failed to hash password: {}", e)))
    }

    /// Verify a password against a hash
    pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
        verify(password, hash)
            .map_err(|e| AuthError::ValidationError(format!("Failed to verify password: {}", e)))
    }

    pub fn generate_session_token() -> String {
        Uuid::new_v4().simple().to_string()
    }

    /// Checks the credentials and opens a new session for the user.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(users::Model, user_sessions::Model), AuthError> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.db)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if user.is_anonymous() || !Self::verify_password(password, &user.password_hash)? {
            debug!("Rejected login for {}", username);
            return Err(AuthError::InvalidCredentials);
        }

        if !user.is_active {
            return Err(AuthError::AccountDeactivated);
        }

        let session = user_sessions::ActiveModel::new(
            user.id,
            Self::generate_session_token(),
            SESSION_HOURS,
        )
        .insert(&self.db)
        .await?;

        let user = user
            .into_active_model()
            .set_last_login()
            .update(&self.db)
            .await?;

        info!("User {} logged in", user.username);
        Ok((user, session))
    }

    /// Resolves a session token to its (active) user.
    pub async fn session_user(&self, token: &str) -> Result<users::Model, AuthError> {
        let session = user_sessions::Entity::find()
            .filter(user_sessions::Column::Token.eq(token))
            .one(&self.db)
            .await?
            .ok_or(AuthError::SessionNotFound)?;

        if session.is_expired() {
            user_sessions::Entity::delete_by_id(session.id)
                .exec(&self.db)
                .await?;
            return Err(AuthError::SessionExpired);
        }

        let user = users::Entity::find_by_id(session.user_id)
            .one(&self.db)
            .await?
            .ok_or(AuthError::SessionNotFound)?;

        if !user.is_active {
            return Err(AuthError::AccountDeactivated);
        }

        Ok(user)
    }

    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        let result = user_sessions::Entity::delete_many()
            .filter(user_sessions::Column::Token.eq(token))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(AuthError::SessionNotFound);
        }
        Ok(())
    }

    /// Drops every session past its expiry, returning how many were removed.
    pub async fn purge_expired_sessions(&self) -> Result<u64, AuthError> {
        let result = user_sessions::Entity::delete_many()
            .filter(user_sessions::Column::ExpiresAt.lt(Utc::now()))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }
}
