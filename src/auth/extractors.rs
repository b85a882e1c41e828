use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use tracing::warn;

use super::jwt::JwtKeys;
use crate::error::AppError;
use crate::state::AppState;
use crate::users::repo_types::User;

/// Authenticated caller; rejects anonymous requests with 401.
pub struct CurrentUser(pub User);

/// Caller if a Bearer token was sent. A token that is sent but invalid
/// still rejects the request.
pub struct MaybeUser(pub Option<User>);

fn bearer_token(parts: &Parts) -> Result<Option<&str>, AppError> {
    let Some(value) = parts.headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid Authorization header".into()))?;
    let mut split = value.splitn(2, ' ');
    let scheme = split.next().unwrap_or_default();
    if !scheme.eq_ignore_ascii_case("bearer") {
        // other schemes are not ours to judge
        return Ok(None);
    }
    match split.next().map(str::trim) {
        Some(token) if !token.is_empty() && !token.contains(' ') => Ok(Some(token)),
        _ => Err(AppError::Unauthorized(
            "Invalid Authorization header. No credentials provided.".into(),
        )),
    }
}

async fn authenticate(parts: &Parts, state: &AppState) -> Result<Option<User>, AppError> {
    let Some(token) = bearer_token(parts)? else {
        return Ok(None);
    };

    let keys = JwtKeys::from_ref(state);
    let claims = keys.verify_access(token).map_err(|e| {
        warn!(error = %e, "invalid or expired token");
        AppError::Unauthorized("Given token not valid for any token type".into())
    })?;

    let user = state
        .users
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;
    if !user.is_active {
        warn!(user_id = %user.id, "token for inactive user");
        return Err(AppError::Unauthorized("User is inactive".into()));
    }
    Ok(Some(user))
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authenticate(parts, state)
            .await?
            .map(CurrentUser)
            .ok_or_else(AppError::not_authenticated)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(authenticate(parts, state).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::seed_user;
    use axum::http::Request;

    fn parts_with(auth: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(v) = auth {
            builder = builder.header(header::AUTHORIZATION, v);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn missing_or_foreign_scheme_is_anonymous() {
        let st = AppState::fake();
        let mut parts = parts_with(None);
        let MaybeUser(user) = MaybeUser::from_request_parts(&mut parts, &st).await.unwrap();
        assert!(user.is_none());

        let mut parts = parts_with(Some("Basic dXNlcjpwYXNz"));
        let MaybeUser(user) = MaybeUser::from_request_parts(&mut parts, &st).await.unwrap();
        assert!(user.is_none());

        let mut parts = parts_with(None);
        let err = CurrentUser::from_request_parts(&mut parts, &st).await.err().unwrap();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn access_token_resolves_user() {
        let st = AppState::fake();
        let user = seed_user(&st, "me@x.com", "Me").await;
        let token = JwtKeys::from_ref(&st).sign_access(user.id).unwrap();
        let mut parts = parts_with(Some(&format!("Bearer {token}")));
        let CurrentUser(found) = CurrentUser::from_request_parts(&mut parts, &st).await.unwrap();
        assert_eq!(found.id, user.id);
    }

    #[tokio::test]
    async fn bad_tokens_reject_even_optional_auth() {
        let st = AppState::fake();
        let user = seed_user(&st, "me@x.com", "Me").await;
        let refresh = JwtKeys::from_ref(&st).sign_refresh(user.id).unwrap();

        for header_value in [
            "Bearer garbage".to_string(),
            format!("Bearer {refresh}"),
            "Bearer".to_string(),
        ] {
            let mut parts = parts_with(Some(&header_value));
            let err = MaybeUser::from_request_parts(&mut parts, &st).await.err().unwrap();
            assert!(matches!(err, AppError::Unauthorized(_)), "{header_value}");
        }
    }

    #[tokio::test]
    async fn inactive_user_is_rejected() {
        let st = AppState::fake();
        let mut user = seed_user(&st, "me@x.com", "Me").await;
        user.is_active = false;
        st.users.save(&user).await.unwrap();
        let token = JwtKeys::from_ref(&st).sign_access(user.id).unwrap();
        let mut parts = parts_with(Some(&format!("Bearer {token}")));
        assert!(CurrentUser::from_request_parts(&mut parts, &st).await.is_err());
    }
}
