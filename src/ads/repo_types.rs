use rust_decimal::Decimal;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct Ad {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub is_active: bool,
    pub is_sold: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub struct AdImage {
    pub id: Uuid,
    pub ad_id: Uuid,
    pub image_key: String,
    pub alt_text: String,
    #[sqlx(rename = "display_order")]
    pub order: i32,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewAd {
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct NewAdImage {
    pub id: Uuid,
    pub ad_id: Uuid,
    pub image_key: String,
    pub alt_text: String,
    pub order: i32,
}

/// Row filter for ad listings. `viewer` is the authenticated caller, if any:
/// rows are visible when active or owned by the viewer.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdQuery {
    pub viewer: Option<Uuid>,
    pub owner: Option<Uuid>,
}
