use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Multipart, Path, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::AppError;

/// `Json<T>` whose rejection is a JSON `400` instead of axum's plain text.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(AppError::BadRequest(format!(
                "JSON parse error - {}",
                rejection.body_text()
            ))),
        }
    }
}

/// Resource path parameters. An id that does not parse names no resource,
/// so it is a `404` like any unknown id.
pub struct ApiPath<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(ApiPath(value)),
            Err(rejection) => {
                debug!(error = %rejection.body_text(), "unmatched path parameter");
                Err(AppError::NotFound)
            }
        }
    }
}

/// `Multipart` whose rejection (wrong content type, missing boundary) is a
/// JSON `400`.
pub struct ApiMultipart(pub Multipart);

#[async_trait]
impl<S> FromRequest<S> for ApiMultipart
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Multipart::from_request(req, state)
            .await
            .map(ApiMultipart)
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
    }
}
