//! Account creation, credential checks and token issuance.

use sea_orm::*;
use thiserror::Error;
use tracing::debug;

use crate::config::AuthConfig;
use crate::entity::user;
use crate::utils::{hash, jwt};

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("username '{0}' is already taken")]
    UsernameTaken(String),

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error("token signing failed: {0}")]
    Token(String),

    #[error(transparent)]
    Database(#[from] DbErr),
}

/// Argon2 hash computed on the blocking pool.
pub async fn hash_password(password: &str) -> Result<String, AccountError> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || hash::hash_password(&password))
        .await
        .map_err(|e| AccountError::Hash(e.to_string()))?
        .map_err(|e| AccountError::Hash(e.to_string()))
}

async fn verify_password(password: &str, stored: &str) -> Result<bool, AccountError> {
    let (password, stored) = (password.to_owned(), stored.to_owned());
    tokio::task::spawn_blocking(move || hash::verify_password(&password, &stored))
        .await
        .map_err(|e| AccountError::Hash(e.to_string()))?
        .map_err(|e| AccountError::Hash(e.to_string()))
}

/// Insert a new account. A duplicate username is reported from the unique
/// constraint, so concurrent registrations cannot both succeed.
pub async fn create_user(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
    is_staff: bool,
) -> Result<user::Model, AccountError> {
    let password = hash_password(password).await?;

    user::ActiveModel {
        username: Set(username.to_owned()),
        password: Set(password),
        is_staff: Set(is_staff),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AccountError::UsernameTaken(username.to_owned())
        }
        _ => AccountError::Database(e),
    })
}

/// Look up `username` and check `password`. Unknown users and wrong
/// passwords are indistinguishable to the caller.
pub async fn authenticate(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
) -> Result<user::Model, AccountError> {
    let account = user::Entity::find()
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await?
        .ok_or(AccountError::InvalidCredentials)?;

    if !verify_password(password, &account.password).await? {
        debug!(username, "Password mismatch");
        return Err(AccountError::InvalidCredentials);
    }
    Ok(account)
}

pub fn issue_token(auth: &AuthConfig, account: &user::Model) -> Result<String, AccountError> {
    jwt::sign(
        account.id,
        &account.username,
        account.is_staff,
        auth.token_ttl_days,
        &auth.jwt_secret,
    )
    .map_err(|e| AccountError::Token(e.to_string()))
}
