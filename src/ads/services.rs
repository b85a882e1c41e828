use std::collections::HashMap;
use std::str::FromStr;

use anyhow::anyhow;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use super::dto::{AdImageResponse, AdResponse, CreateAdRequest, OwnerInfo, UpdateAdRequest};
use super::policy::{ensure_owner, Viewer, NOT_OWNER, NOT_OWNER_SOLD, NOT_OWNER_UPLOAD};
use super::repo_types::{Ad, AdImage, AdQuery, NewAd, NewAdImage};
use crate::error::{AppError, AppResult, FieldErrors};
use crate::images::services::{
    ad_image_key, delete_objects_best_effort, object_filename, store_image, url_for,
    validate_image, ImageForm,
};
use crate::state::AppState;
use crate::users::repo_types::User;
use crate::validation::{max_chars, required_text, REQUIRED};

pub const TITLE_MAX: usize = 200;
pub const ALT_TEXT_MAX: usize = 255;
const PRICE_DECIMAL_PLACES: u32 = 2;
const PRICE_WHOLE_DIGITS: usize = 8;

/// Decimal price with at most 2 places and 10 digits in total, not negative.
pub fn parse_price(errors: &mut FieldErrors, value: &Value) -> Option<Decimal> {
    let parsed = match value {
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        Value::Number(n) => {
            let raw = n.to_string();
            Decimal::from_str(&raw)
                .or_else(|_| Decimal::from_scientific(&raw))
                .ok()
        }
        _ => None,
    };
    let Some(price) = parsed.map(|p| p.normalize()) else {
        errors.add("price", "A valid number is required.");
        return None;
    };
    if price.is_sign_negative() && !price.is_zero() {
        errors.add("price", "Ensure this value is greater than or equal to 0.");
        return None;
    }
    if price.scale() > PRICE_DECIMAL_PLACES {
        errors.add(
            "price",
            format!(
                "Ensure that there are no more than {} decimal places.",
                PRICE_DECIMAL_PLACES
            ),
        );
        return None;
    }
    let whole = price.trunc();
    let whole_digits = if whole.is_zero() { 0 } else { whole.to_string().len() };
    if whole_digits > PRICE_WHOLE_DIGITS {
        errors.add(
            "price",
            format!(
                "Ensure that there are no more than {} digits before the decimal point.",
                PRICE_WHOLE_DIGITS
            ),
        );
        return None;
    }
    let mut price = price.abs();
    price.rescale(PRICE_DECIMAL_PLACES);
    Some(price)
}

/// Lowest `(order, created_at)`.
pub fn main_image(images: &[AdImage]) -> Option<&AdImage> {
    images.iter().min_by_key(|img| (img.order, img.created_at))
}

fn parse_order(errors: &mut FieldErrors, raw: Option<&str>) -> i32 {
    let raw = raw.map(str::trim).unwrap_or("");
    if raw.is_empty() {
        return 0;
    }
    match raw.parse::<i64>() {
        Ok(v) if v < 0 => {
            errors.add("order", "Ensure this value is greater than or equal to 0.");
            0
        }
        Ok(v) if v > i32::MAX as i64 => {
            errors.add(
                "order",
                format!("Ensure this value is less than or equal to {}.", i32::MAX),
            );
            0
        }
        Ok(v) => v as i32,
        Err(_) => {
            errors.add("order", "A valid integer is required.");
            0
        }
    }
}

async fn image_response(st: &AppState, img: &AdImage) -> AppResult<AdImageResponse> {
    Ok(AdImageResponse {
        id: img.id,
        image: img.image_key.clone(),
        image_url: Some(url_for(st, &img.image_key).await?),
        alt_text: img.alt_text.clone(),
        order: img.order,
        created_at: img.created_at,
    })
}

async fn present_many(st: &AppState, ads: Vec<Ad>) -> AppResult<Vec<AdResponse>> {
    let ad_ids: Vec<Uuid> = ads.iter().map(|a| a.id).collect();
    let mut owner_ids: Vec<Uuid> = ads.iter().map(|a| a.owner_id).collect();
    owner_ids.sort();
    owner_ids.dedup();

    let owners: HashMap<Uuid, User> = st
        .users
        .find_many(&owner_ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();
    let mut images: HashMap<Uuid, Vec<AdImage>> = HashMap::new();
    for img in st.ads.images_for(&ad_ids).await? {
        images.entry(img.ad_id).or_default().push(img);
    }

    let mut out = Vec::with_capacity(ads.len());
    for ad in ads {
        let owner = owners
            .get(&ad.owner_id)
            .ok_or_else(|| anyhow!("owner {} of ad {} is missing", ad.owner_id, ad.id))?;
        let ad_images = images.remove(&ad.id).unwrap_or_default();
        let mut image_items = Vec::with_capacity(ad_images.len());
        for img in &ad_images {
            image_items.push(image_response(st, img).await?);
        }
        let main_image_url = main_image(&ad_images).and_then(|main| {
            image_items
                .iter()
                .find(|i| i.id == main.id)
                .and_then(|i| i.image_url.clone())
        });
        out.push(AdResponse {
            id: ad.id,
            title: ad.title,
            description: ad.description,
            price: ad.price,
            is_active: ad.is_active,
            is_sold: ad.is_sold,
            owner: ad.owner_id,
            owner_info: OwnerInfo {
                id: owner.id,
                email: owner.email.clone(),
                name: owner.name.clone(),
            },
            images: image_items,
            main_image_url,
            created_at: ad.created_at,
            updated_at: ad.updated_at,
        });
    }
    Ok(out)
}

async fn present(st: &AppState, ad: Ad) -> AppResult<AdResponse> {
    present_many(st, vec![ad])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal(anyhow!("ad presentation came back empty")))
}

/// Unfiltered lookup followed by the owner check. Anonymous callers are
/// rejected before the lookup.
async fn load_for_mutation(st: &AppState, viewer: Viewer, id: Uuid, denied: &str) -> AppResult<Ad> {
    if viewer == Viewer::Anonymous {
        return Err(AppError::not_authenticated());
    }
    let ad = st.ads.find_by_id(id).await?.ok_or(AppError::NotFound)?;
    ensure_owner(viewer, &ad, denied)?;
    Ok(ad)
}

pub async fn list_ads(st: &AppState, viewer: Viewer) -> AppResult<Vec<AdResponse>> {
    let ads = st.ads.list(viewer.visible()).await?;
    present_many(st, ads).await
}

pub async fn my_ads(st: &AppState, actor: &User) -> AppResult<Vec<AdResponse>> {
    let ads = st
        .ads
        .list(AdQuery {
            viewer: Some(actor.id),
            owner: Some(actor.id),
        })
        .await?;
    present_many(st, ads).await
}

pub async fn get_ad(st: &AppState, viewer: Viewer, id: Uuid) -> AppResult<AdResponse> {
    match st.ads.find_by_id(id).await? {
        Some(ad) if viewer.can_view(&ad) => present(st, ad).await,
        _ => Err(AppError::NotFound),
    }
}

pub async fn create_ad(st: &AppState, actor: &User, req: CreateAdRequest) -> AppResult<AdResponse> {
    let mut errors = FieldErrors::new();
    let title = required_text(&mut errors, "title", req.title.as_deref());
    if let Some(title) = &title {
        max_chars(&mut errors, "title", title, TITLE_MAX);
    }
    let price = match &req.price {
        Some(v) if !v.is_null() => parse_price(&mut errors, v),
        _ => {
            errors.add("price", REQUIRED);
            None
        }
    };
    errors.into_result()?;
    let (Some(title), Some(price)) = (title, price) else {
        return Err(AppError::validation("price", REQUIRED));
    };

    let ad = st
        .ads
        .create(NewAd {
            owner_id: actor.id,
            title,
            description: req.description.unwrap_or_default().trim().to_string(),
            price,
            is_active: req.is_active.unwrap_or(true),
        })
        .await?;
    info!(ad_id = %ad.id, owner_id = %actor.id, "ad created");
    present(st, ad).await
}

pub async fn update_ad(
    st: &AppState,
    viewer: Viewer,
    id: Uuid,
    req: UpdateAdRequest,
    partial: bool,
) -> AppResult<AdResponse> {
    let mut ad = load_for_mutation(st, viewer, id, NOT_OWNER).await?;

    let mut errors = FieldErrors::new();
    let title = match req.title.as_deref() {
        Some(raw) => required_text(&mut errors, "title", Some(raw)),
        None if !partial => {
            errors.add("title", REQUIRED);
            None
        }
        None => None,
    };
    if let Some(title) = &title {
        max_chars(&mut errors, "title", title, TITLE_MAX);
    }
    let price = match &req.price {
        Some(v) if !v.is_null() => parse_price(&mut errors, v),
        _ if !partial => {
            errors.add("price", REQUIRED);
            None
        }
        _ => None,
    };
    errors.into_result()?;

    if let Some(title) = title {
        ad.title = title;
    }
    if let Some(description) = req.description {
        ad.description = description.trim().to_string();
    }
    if let Some(price) = price {
        ad.price = price;
    }
    if let Some(is_active) = req.is_active {
        ad.is_active = is_active;
    }
    if let Some(is_sold) = req.is_sold {
        ad.is_sold = is_sold;
    }
    let ad = st.ads.save(&ad).await?;
    info!(ad_id = %ad.id, "ad updated");
    present(st, ad).await
}

pub async fn delete_ad(st: &AppState, viewer: Viewer, id: Uuid) -> AppResult<()> {
    let ad = load_for_mutation(st, viewer, id, NOT_OWNER).await?;
    let keys = st.ads.delete(ad.id).await?;
    delete_objects_best_effort(st, &keys).await;
    info!(ad_id = %ad.id, images = keys.len(), "ad deleted");
    Ok(())
}

/// Owner-only and idempotent: an ad that is already sold is returned as is.
pub async fn mark_sold(st: &AppState, viewer: Viewer, id: Uuid) -> AppResult<AdResponse> {
    let mut ad = load_for_mutation(st, viewer, id, NOT_OWNER_SOLD).await?;
    if ad.is_sold {
        return present(st, ad).await;
    }
    ad.is_sold = true;
    let ad = st.ads.save(&ad).await?;
    info!(ad_id = %ad.id, "ad marked sold");
    present(st, ad).await
}

pub async fn upload_image(
    st: &AppState,
    viewer: Viewer,
    id: Uuid,
    form: ImageForm,
) -> AppResult<AdImageResponse> {
    let ad = load_for_mutation(st, viewer, id, NOT_OWNER_UPLOAD).await?;

    let mut errors = FieldErrors::new();
    let upload = validate_image(&mut errors, "image", form.image);
    let alt_text = form.alt_text.unwrap_or_default().trim().to_string();
    max_chars(&mut errors, "alt_text", &alt_text, ALT_TEXT_MAX);
    let order = parse_order(&mut errors, form.order.as_deref());
    errors.into_result()?;
    let Some((item, detected)) = upload else {
        return Err(AppError::validation("image", "No file was submitted."));
    };

    let image_id = Uuid::new_v4();
    let key = ad_image_key(ad.id, &object_filename(image_id, detected.ext));
    store_image(st, &key, item, detected).await?;

    let row = st
        .ads
        .add_image(NewAdImage {
            id: image_id,
            ad_id: ad.id,
            image_key: key.clone(),
            alt_text,
            order,
        })
        .await;
    let image = match row {
        Ok(image) => image,
        Err(e) => {
            warn!(error = %e, key = %key, "image row insert failed, removing object");
            delete_objects_best_effort(st, &[key]).await;
            return Err(e.into());
        }
    };
    info!(ad_id = %ad.id, image_id = %image.id, order = image.order, "ad image uploaded");
    image_response(st, &image).await
}
