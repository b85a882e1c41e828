use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// User fragment embedded in authentication responses.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Full name of the user
    pub name: String,
}

/// Profile representation returned by the users endpoints.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub name: String,
    pub url: String,
    pub avatar_url: Option<String>,
    /// Ads that are active and not sold
    pub active_ads_count: i64,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Multipart body of the avatar upload, for the API schema only.
#[allow(dead_code)]
#[derive(ToSchema)]
pub struct AvatarUploadForm {
    #[schema(value_type = String, format = Binary)]
    pub image: Vec<u8>,
}
