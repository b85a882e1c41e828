use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{AdImageResponse, AdResponse, CreateAdRequest, UpdateAdRequest};
use super::policy::Viewer;
use super::services;
use crate::auth::extractors::{CurrentUser, MaybeUser};
use crate::error::AppResult;
use crate::extractors::{ApiJson, ApiMultipart, ApiPath};
use crate::images::services::read_image_form;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/ads/", get(list_ads).post(create_ad))
        .route("/api/ads/my_ads/", get(my_ads))
        .route(
            "/api/ads/:id/",
            get(get_ad).put(update_ad).patch(patch_ad).delete(delete_ad),
        )
        .route(
            "/api/ads/:id/upload_image/",
            post(upload_image).layer(DefaultBodyLimit::max(20 * 1024 * 1024)), // 20MB
        )
        .route("/api/ads/:id/mark_sold/", post(mark_sold))
}

#[utoipa::path(
    get, path = "/api/ads/", tag = "ads",
    responses((status = 200, body = [AdResponse])),
    security((), ("bearer" = []))
)]
#[instrument(skip(state, user))]
pub async fn list_ads(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
) -> AppResult<Json<Vec<AdResponse>>> {
    let viewer = Viewer::from(user.as_ref());
    Ok(Json(services::list_ads(&state, viewer).await?))
}

#[utoipa::path(
    get, path = "/api/ads/my_ads/", tag = "ads",
    responses((status = 200, body = [AdResponse]), (status = 401)),
    security(("bearer" = []))
)]
#[instrument(skip(state, user))]
pub async fn my_ads(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<AdResponse>>> {
    Ok(Json(services::my_ads(&state, &user).await?))
}

#[utoipa::path(
    post, path = "/api/ads/", tag = "ads",
    request_body = CreateAdRequest,
    responses((status = 201, body = AdResponse), (status = 400), (status = 401)),
    security(("bearer" = []))
)]
#[instrument(skip(state, user, payload))]
pub async fn create_ad(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(payload): ApiJson<CreateAdRequest>,
) -> AppResult<(StatusCode, Json<AdResponse>)> {
    let ad = services::create_ad(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(ad)))
}

#[utoipa::path(
    get, path = "/api/ads/{id}/", tag = "ads",
    params(("id" = Uuid, Path, description = "Ad id")),
    responses((status = 200, body = AdResponse), (status = 404)),
    security((), ("bearer" = []))
)]
#[instrument(skip(state, user))]
pub async fn get_ad(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<AdResponse>> {
    let viewer = Viewer::from(user.as_ref());
    Ok(Json(services::get_ad(&state, viewer, id).await?))
}

#[utoipa::path(
    put, path = "/api/ads/{id}/", tag = "ads",
    params(("id" = Uuid, Path, description = "Ad id")),
    request_body = UpdateAdRequest,
    responses((status = 200, body = AdResponse), (status = 400), (status = 401), (status = 403), (status = 404)),
    security(("bearer" = []))
)]
#[instrument(skip(state, user, payload))]
pub async fn update_ad(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateAdRequest>,
) -> AppResult<Json<AdResponse>> {
    let viewer = Viewer::User(user.id);
    Ok(Json(services::update_ad(&state, viewer, id, payload, false).await?))
}

#[utoipa::path(
    patch, path = "/api/ads/{id}/", tag = "ads",
    params(("id" = Uuid, Path, description = "Ad id")),
    request_body = UpdateAdRequest,
    responses((status = 200, body = AdResponse), (status = 400), (status = 401), (status = 403), (status = 404)),
    security(("bearer" = []))
)]
#[instrument(skip(state, user, payload))]
pub async fn patch_ad(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateAdRequest>,
) -> AppResult<Json<AdResponse>> {
    let viewer = Viewer::User(user.id);
    Ok(Json(services::update_ad(&state, viewer, id, payload, true).await?))
}

#[utoipa::path(
    delete, path = "/api/ads/{id}/", tag = "ads",
    params(("id" = Uuid, Path, description = "Ad id")),
    responses((status = 204), (status = 401), (status = 403), (status = 404)),
    security(("bearer" = []))
)]
#[instrument(skip(state, user))]
pub async fn delete_ad(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<StatusCode> {
    services::delete_ad(&state, Viewer::User(user.id), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/ads/{id}/upload_image/ (multipart: image, alt_text?, order?)
#[utoipa::path(
    post, path = "/api/ads/{id}/upload_image/", tag = "ads",
    params(("id" = Uuid, Path, description = "Ad id")),
    request_body(content = super::dto::UploadImageForm, content_type = "multipart/form-data"),
    responses((status = 201, body = AdImageResponse), (status = 400), (status = 401), (status = 403), (status = 404)),
    security(("bearer" = []))
)]
#[instrument(skip(state, user, mp))]
pub async fn upload_image(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiMultipart(mp): ApiMultipart,
) -> AppResult<(StatusCode, Json<AdImageResponse>)> {
    let form = read_image_form(mp).await?;
    let image = services::upload_image(&state, Viewer::User(user.id), id, form).await?;
    Ok((StatusCode::CREATED, Json(image)))
}

#[utoipa::path(
    post, path = "/api/ads/{id}/mark_sold/", tag = "ads",
    params(("id" = Uuid, Path, description = "Ad id")),
    responses((status = 200, body = AdResponse), (status = 401), (status = 403), (status = 404)),
    security(("bearer" = []))
)]
#[instrument(skip(state, user))]
pub async fn mark_sold(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<AdResponse>> {
    Ok(Json(services::mark_sold(&state, Viewer::User(user.id), id).await?))
}
