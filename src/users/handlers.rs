use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{UpdateUserRequest, UserResponse};
use super::services;
use crate::auth::extractors::CurrentUser;
use crate::error::AppResult;
use crate::extractors::{ApiJson, ApiMultipart, ApiPath};
use crate::images::services::read_image_form;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/users/", get(list_users))
        .route("/api/users/me/", get(me))
        .route(
            "/api/users/me/avatar/",
            post(upload_avatar).layer(DefaultBodyLimit::max(20 * 1024 * 1024)), // 20MB
        )
        .route(
            "/api/users/:id/",
            get(get_user).put(update_user).patch(patch_user),
        )
}

/// The listing only ever contains the caller.
#[utoipa::path(
    get, path = "/api/users/", tag = "users",
    responses((status = 200, body = [UserResponse]), (status = 401)),
    security(("bearer" = []))
)]
#[instrument(skip(state, user))]
pub async fn list_users(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<UserResponse>>> {
    Ok(Json(vec![services::profile(&state, &user).await?]))
}

#[utoipa::path(
    get, path = "/api/users/me/", tag = "users",
    responses((status = 200, body = UserResponse), (status = 401)),
    security(("bearer" = []))
)]
#[instrument(skip(state, user))]
pub async fn me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<UserResponse>> {
    Ok(Json(services::profile(&state, &user).await?))
}

#[utoipa::path(
    get, path = "/api/users/{id}/", tag = "users",
    params(("id" = Uuid, Path, description = "User id")),
    responses((status = 200, body = UserResponse), (status = 401), (status = 404)),
    security(("bearer" = []))
)]
#[instrument(skip(state, user))]
pub async fn get_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<UserResponse>> {
    Ok(Json(services::get_user(&state, &user, id).await?))
}

#[utoipa::path(
    put, path = "/api/users/{id}/", tag = "users",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses((status = 200, body = UserResponse), (status = 400), (status = 401), (status = 404)),
    security(("bearer" = []))
)]
#[instrument(skip(state, user, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateUserRequest>,
) -> AppResult<Json<UserResponse>> {
    Ok(Json(services::update_user(&state, user, id, payload, false).await?))
}

#[utoipa::path(
    patch, path = "/api/users/{id}/", tag = "users",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses((status = 200, body = UserResponse), (status = 400), (status = 401), (status = 404)),
    security(("bearer" = []))
)]
#[instrument(skip(state, user, payload))]
pub async fn patch_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateUserRequest>,
) -> AppResult<Json<UserResponse>> {
    Ok(Json(services::update_user(&state, user, id, payload, true).await?))
}

/// POST /api/users/me/avatar/ (multipart: image)
#[utoipa::path(
    post, path = "/api/users/me/avatar/", tag = "users",
    request_body(content = super::dto::AvatarUploadForm, content_type = "multipart/form-data"),
    responses((status = 200, body = UserResponse), (status = 400), (status = 401)),
    security(("bearer" = []))
)]
#[instrument(skip(state, user, mp))]
pub async fn upload_avatar(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiMultipart(mp): ApiMultipart,
) -> AppResult<Json<UserResponse>> {
    let form = read_image_form(mp).await?;
    Ok(Json(services::set_avatar(&state, user, form).await?))
}
