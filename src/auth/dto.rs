use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::jwt::IssuedPair;
use crate::users::dto::UserSummary;

/// Request body for user registration.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct RegisterRequest {
    /// Must be unique
    pub email: Option<String>,
    /// Minimum 8 characters
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Request body for login and token obtain.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct RefreshRequest {
    pub refresh: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct VerifyRequest {
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

impl From<IssuedPair> for TokenPair {
    fn from(p: IssuedPair) -> Self {
        Self {
            access: p.access,
            refresh: p.refresh,
        }
    }
}

/// Response returned after register and login.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub user: UserSummary,
    pub tokens: TokenPair,
}

/// Response of the token obtain endpoint: flat pair plus the user.
#[derive(Debug, Serialize, ToSchema)]
pub struct TokenObtainResponse {
    pub access: String,
    pub refresh: String,
    pub user: UserSummary,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AccessTokenResponse {
    pub access: String,
}
