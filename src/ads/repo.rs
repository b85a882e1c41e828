use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{Ad, AdImage, AdQuery, NewAd, NewAdImage};

const AD_COLUMNS: &str =
    "id, owner_id, title, description, price, is_active, is_sold, created_at, updated_at";
const IMAGE_COLUMNS: &str = "id, ad_id, image_key, alt_text, display_order, created_at";

#[async_trait]
pub trait AdRepo: Send + Sync {
    async fn create(&self, ad: NewAd) -> anyhow::Result<Ad>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Ad>>;
    /// Newest first.
    async fn list(&self, query: AdQuery) -> anyhow::Result<Vec<Ad>>;
    /// Persist every mutable column of `ad` and bump `updated_at`.
    async fn save(&self, ad: &Ad) -> anyhow::Result<Ad>;
    /// Delete the ad and its image rows; returns the image keys that were attached.
    async fn delete(&self, id: Uuid) -> anyhow::Result<Vec<String>>;
    /// Images of the given ads ordered by `(order, created_at)`.
    async fn images_for(&self, ad_ids: &[Uuid]) -> anyhow::Result<Vec<AdImage>>;
    async fn add_image(&self, image: NewAdImage) -> anyhow::Result<AdImage>;
    async fn count_active_by_owner(&self, owner_id: Uuid) -> anyhow::Result<i64>;
}

#[derive(Clone)]
pub struct PgAdRepo {
    db: PgPool,
}

impl PgAdRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AdRepo for PgAdRepo {
    async fn create(&self, ad: NewAd) -> anyhow::Result<Ad> {
        let ad = sqlx::query_as::<_, Ad>(&format!(
            r#"
            INSERT INTO ads (owner_id, title, description, price, is_active)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {AD_COLUMNS}
            "#
        ))
        .bind(ad.owner_id)
        .bind(&ad.title)
        .bind(&ad.description)
        .bind(ad.price)
        .bind(ad.is_active)
        .fetch_one(&self.db)
        .await
        .context("insert ad")?;
        Ok(ad)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Ad>> {
        let ad = sqlx::query_as::<_, Ad>(&format!("SELECT {AD_COLUMNS} FROM ads WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("select ad by id")?;
        Ok(ad)
    }

    async fn list(&self, query: AdQuery) -> anyhow::Result<Vec<Ad>> {
        // owner_id = NULL is never true, so an anonymous viewer only sees active rows
        let rows = sqlx::query_as::<_, Ad>(&format!(
            r#"
            SELECT {AD_COLUMNS}
              FROM ads
             WHERE (is_active OR owner_id = $1::uuid)
               AND ($2::uuid IS NULL OR owner_id = $2::uuid)
             ORDER BY created_at DESC
            "#
        ))
        .bind(query.viewer)
        .bind(query.owner)
        .fetch_all(&self.db)
        .await
        .context("list ads")?;
        Ok(rows)
    }

    async fn save(&self, ad: &Ad) -> anyhow::Result<Ad> {
        let ad = sqlx::query_as::<_, Ad>(&format!(
            r#"
            UPDATE ads
               SET title = $2, description = $3, price = $4, is_active = $5,
                   is_sold = $6, updated_at = now()
             WHERE id = $1
            RETURNING {AD_COLUMNS}
            "#
        ))
        .bind(ad.id)
        .bind(&ad.title)
        .bind(&ad.description)
        .bind(ad.price)
        .bind(ad.is_active)
        .bind(ad.is_sold)
        .fetch_one(&self.db)
        .await
        .context("update ad")?;
        Ok(ad)
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<Vec<String>> {
        let mut tx = self.db.begin().await.context("begin tx")?;
        let keys: Vec<String> =
            sqlx::query_scalar("SELECT image_key FROM ad_images WHERE ad_id = $1")
                .bind(id)
                .fetch_all(&mut *tx)
                .await
                .context("select image keys")?;
        sqlx::query("DELETE FROM ads WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("delete ad")?;
        tx.commit().await.context("commit tx")?;
        Ok(keys)
    }

    async fn images_for(&self, ad_ids: &[Uuid]) -> anyhow::Result<Vec<AdImage>> {
        if ad_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, AdImage>(&format!(
            r#"
            SELECT {IMAGE_COLUMNS}
              FROM ad_images
             WHERE ad_id = ANY($1)
             ORDER BY display_order ASC, created_at ASC
            "#
        ))
        .bind(ad_ids)
        .fetch_all(&self.db)
        .await
        .context("list ad images")?;
        Ok(rows)
    }

    async fn add_image(&self, image: NewAdImage) -> anyhow::Result<AdImage> {
        let row = sqlx::query_as::<_, AdImage>(&format!(
            r#"
            INSERT INTO ad_images (id, ad_id, image_key, alt_text, display_order)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {IMAGE_COLUMNS}
            "#
        ))
        .bind(image.id)
        .bind(image.ad_id)
        .bind(&image.image_key)
        .bind(&image.alt_text)
        .bind(image.order)
        .fetch_one(&self.db)
        .await
        .context("insert ad image")?;
        Ok(row)
    }

    async fn count_active_by_owner(&self, owner_id: Uuid) -> anyhow::Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM ads WHERE owner_id = $1 AND is_active AND NOT is_sold",
        )
        .bind(owner_id)
        .fetch_one(&self.db)
        .await
        .context("count active ads")?;
        Ok(count)
    }
}
