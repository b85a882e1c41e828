use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{instrument, warn};

use super::dto::{
    AccessTokenResponse, AuthResponse, LoginRequest, RefreshRequest, RegisterRequest,
    TokenObtainResponse, VerifyRequest,
};
use super::extractors::CurrentUser;
use super::services::{self, TOKEN_INVALID};
use crate::error::{AppError, AppResult, FieldErrors};
use crate::extractors::ApiJson;
use crate::state::AppState;
use crate::users::dto::UserResponse;
use crate::users::services::profile;
use crate::validation::required_text;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register/", post(register))
        .route("/api/auth/login/", post(login))
        .route("/api/auth/token/", post(obtain_token))
        .route("/api/auth/token/refresh/", post(refresh))
        .route("/api/auth/token/verify/", post(verify))
}

pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/api/auth/profile/", get(get_profile))
}

#[utoipa::path(
    post, path = "/api/auth/register/", tag = "auth",
    request_body = RegisterRequest,
    responses((status = 201, body = AuthResponse), (status = 400))
)]
#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let res = services::register(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(res)))
}

#[utoipa::path(
    post, path = "/api/auth/login/", tag = "auth",
    request_body = LoginRequest,
    responses((status = 200, body = AuthResponse), (status = 400))
)]
#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    Ok(Json(services::login(&state, payload).await?))
}

#[utoipa::path(
    post, path = "/api/auth/token/", tag = "auth",
    request_body = LoginRequest,
    responses((status = 200, body = TokenObtainResponse), (status = 400), (status = 401))
)]
#[instrument(skip(state, payload))]
pub async fn obtain_token(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> AppResult<Json<TokenObtainResponse>> {
    Ok(Json(services::obtain_pair(&state, payload).await?))
}

#[utoipa::path(
    post, path = "/api/auth/token/refresh/", tag = "auth",
    request_body = RefreshRequest,
    responses((status = 200, body = AccessTokenResponse), (status = 400), (status = 401))
)]
#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RefreshRequest>,
) -> AppResult<Json<AccessTokenResponse>> {
    Ok(Json(services::refresh(&state, payload).await?))
}

/// Answers `{}` when the token is valid.
#[utoipa::path(
    post, path = "/api/auth/token/verify/", tag = "auth",
    request_body = VerifyRequest,
    responses((status = 200, description = "Token is valid"), (status = 400), (status = 401))
)]
#[instrument(skip(state, payload))]
pub async fn verify(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<VerifyRequest>,
) -> AppResult<Json<Value>> {
    let mut errors = FieldErrors::new();
    let token = required_text(&mut errors, "token", payload.token.as_deref());
    errors.into_result()?;
    match token {
        Some(token) if services::verify(&state, &token) => Ok(Json(json!({}))),
        _ => {
            warn!("token verification failed");
            Err(AppError::Unauthorized(TOKEN_INVALID.into()))
        }
    }
}

#[utoipa::path(
    get, path = "/api/auth/profile/", tag = "auth",
    responses((status = 200, body = UserResponse), (status = 401)),
    security(("bearer" = []))
)]
#[instrument(skip(state, user))]
pub async fn get_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<UserResponse>> {
    Ok(Json(profile(&state, &user).await?))
}
