use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

/// Request body for creating an ad.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct CreateAdRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Decimal with at most 2 places, as string or number
    #[schema(value_type = Option<String>, example = "15.50")]
    pub price: Option<serde_json::Value>,
    pub is_active: Option<bool>,
}

/// Request body for PUT/PATCH on an ad. Owner is never changeable.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct UpdateAdRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    #[schema(value_type = Option<String>, example = "15.50")]
    pub price: Option<serde_json::Value>,
    pub is_active: Option<bool>,
    pub is_sold: Option<bool>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AdImageResponse {
    pub id: Uuid,
    /// Object key in the bucket
    pub image: String,
    pub image_url: Option<String>,
    pub alt_text: String,
    pub order: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OwnerInfo {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AdResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    #[schema(value_type = String, example = "10.00")]
    pub price: Decimal,
    pub is_active: bool,
    pub is_sold: bool,
    pub owner: Uuid,
    pub owner_info: OwnerInfo,
    pub images: Vec<AdImageResponse>,
    pub main_image_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Multipart body of the image upload, for the API schema only.
#[allow(dead_code)]
#[derive(ToSchema)]
pub struct UploadImageForm {
    #[schema(value_type = String, format = Binary)]
    pub image: Vec<u8>,
    pub alt_text: Option<String>,
    pub order: Option<i32>,
}
