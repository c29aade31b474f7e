use std::fmt;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;

use super::auth::OptionalAuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Who is voting or commenting.
///
/// Signed-in users are `user:<id>`; anonymous clients are `ip:<addr>`, taken
/// from the first `X-Forwarded-For` entry or else the peer address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    key: String,
    is_staff: bool,
}

impl ClientIdentity {
    pub fn user(user_id: i32, is_staff: bool) -> Self {
        Self {
            key: format!("user:{user_id}"),
            is_staff,
        }
    }

    pub fn ip(addr: &str) -> Self {
        Self {
            key: format!("ip:{addr}"),
            is_staff: false,
        }
    }

    /// Stable key stored alongside votes and comments.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_staff(&self) -> bool {
        self.is_staff
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

fn forwarded_for(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl FromRequestParts<AppState> for ClientIdentity {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let OptionalAuthUser(Some(user)) =
            OptionalAuthUser::from_request_parts(parts, state).await?
        {
            return Ok(Self::user(user.user_id, user.is_staff));
        }

        if let Some(addr) = forwarded_for(parts) {
            return Ok(Self::ip(&addr));
        }

        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        Ok(Self::ip(&peer))
    }
}
