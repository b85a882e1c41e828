use anyhow::Context;
use axum::extract::Multipart;
use bytes::Bytes;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult, FieldErrors};
use crate::state::AppState;

pub struct UploadItem {
    pub body: Bytes,
    pub filename: Option<String>,
}

/// Fields of an image upload form. Unknown fields are ignored.
#[derive(Default)]
pub struct ImageForm {
    pub image: Option<UploadItem>,
    pub alt_text: Option<String>,
    pub order: Option<String>,
}

/// Image type detected from the file content, not from the client's claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectedImage {
    pub mime: &'static str,
    pub ext: &'static str,
}

pub async fn read_image_form(mut mp: Multipart) -> AppResult<ImageForm> {
    let mut form = ImageForm::default();
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let name = field.name().map(|s| s.to_string());
        match name.as_deref() {
            Some("image") => {
                let filename = field.file_name().map(|s| s.to_string());
                let body = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                form.image = Some(UploadItem { body, filename });
            }
            Some("alt_text") => {
                form.alt_text = Some(field.text().await.map_err(|e| AppError::BadRequest(e.body_text()))?);
            }
            Some("order") => {
                form.order = Some(field.text().await.map_err(|e| AppError::BadRequest(e.body_text()))?);
            }
            _ => {}
        }
    }
    Ok(form)
}

pub fn detect_image(body: &[u8]) -> Option<DetectedImage> {
    let kind = infer::get(body)?;
    if kind.matcher_type() != infer::MatcherType::Image {
        return None;
    }
    Some(DetectedImage {
        mime: kind.mime_type(),
        ext: kind.extension(),
    })
}

/// Checks the `image` field of an upload; errors are recorded under `field`.
pub fn validate_image(
    errors: &mut FieldErrors,
    field: &str,
    item: Option<UploadItem>,
) -> Option<(UploadItem, DetectedImage)> {
    let Some(item) = item else {
        errors.add(field, "No file was submitted.");
        return None;
    };
    if item.body.is_empty() {
        errors.add(field, "The submitted file is empty.");
        return None;
    }
    match detect_image(&item.body) {
        Some(detected) => Some((item, detected)),
        None => {
            errors.add(
                field,
                "Upload a valid image. The file you uploaded was either not an image or a corrupted image.",
            );
            None
        }
    }
}

pub fn object_filename(id: Uuid, ext: &str) -> String {
    format!("{}.{}", id.simple(), ext)
}

pub fn ad_image_key(ad_id: Uuid, filename: &str) -> String {
    format!("ads/ad_{}/{}", ad_id, filename)
}

pub fn avatar_key(user_id: Uuid, filename: &str) -> String {
    format!("avatars/user_{}/{}", user_id, filename)
}

pub async fn store_image(
    st: &AppState,
    key: &str,
    item: UploadItem,
    detected: DetectedImage,
) -> anyhow::Result<()> {
    st.storage
        .put_object(key, item.body, detected.mime)
        .await
        .with_context(|| format!("put_object {}", key))?;
    debug!(key, original = ?item.filename, mime = detected.mime, "image stored");
    Ok(())
}

pub async fn url_for(st: &AppState, key: &str) -> anyhow::Result<String> {
    st.storage
        .url_for(key)
        .await
        .with_context(|| format!("url for key {}", key))
}

/// Removes stored objects; failures are logged and otherwise ignored.
pub async fn delete_objects_best_effort(st: &AppState, keys: &[String]) {
    for key in keys {
        if let Err(e) = st.storage.delete_object(key).await {
            warn!(error = %e, key = %key, "failed to delete stored object");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];
    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

    fn item(body: &'static [u8]) -> Option<UploadItem> {
        Some(UploadItem {
            body: Bytes::from_static(body),
            filename: Some("photo.bin".into()),
        })
    }

    #[test]
    fn detects_images_by_content() {
        assert_eq!(detect_image(PNG).map(|d| d.mime), Some("image/png"));
        let jpeg = detect_image(JPEG).unwrap();
        assert_eq!(jpeg.mime, "image/jpeg");
        assert_eq!(jpeg.ext, "jpg");
        assert_eq!(detect_image(b"just some text"), None);
    }

    #[test]
    fn validate_image_reports_missing_empty_and_invalid() {
        let mut errors = FieldErrors::new();
        assert!(validate_image(&mut errors, "image", None).is_none());
        assert_eq!(errors.get("image").unwrap()[0], "No file was submitted.");

        let mut errors = FieldErrors::new();
        assert!(validate_image(&mut errors, "image", item(b"")).is_none());
        assert_eq!(errors.get("image").unwrap()[0], "The submitted file is empty.");

        let mut errors = FieldErrors::new();
        assert!(validate_image(&mut errors, "image", item(b"%PDF-1.4 not an image")).is_none());
        assert!(errors.get("image").unwrap()[0].starts_with("Upload a valid image"));

        let mut errors = FieldErrors::new();
        let (_, detected) = validate_image(&mut errors, "image", item(PNG)).unwrap();
        assert_eq!(detected.ext, "png");
        assert!(errors.is_empty());
    }

    #[test]
    fn object_keys_follow_bucket_layout() {
        let id = Uuid::parse_str("6f1c1f5e-2b2a-4d7e-9d55-0c1a2b3c4d5e").unwrap();
        let name = object_filename(id, "png");
        assert_eq!(name, "6f1c1f5e2b2a4d7e9d550c1a2b3c4d5e.png");
        assert_eq!(
            ad_image_key(id, &name),
            format!("ads/ad_{}/{}", id, name)
        );
        assert_eq!(
            avatar_key(id, "a.jpg"),
            "avatars/user_6f1c1f5e-2b2a-4d7e-9d55-0c1a2b3c4d5e/a.jpg"
        );
    }

    #[tokio::test]
    async fn url_for_uses_storage_client() {
        let state = AppState::fake();
        let url = url_for(&state, "ads/ad_1/x.png").await.unwrap();
        assert!(url.ends_with("ads/ad_1/x.png"));
    }
}
