use axum::extract::FromRef;
use lazy_static::lazy_static;
use tracing::{info, warn};

use super::dto::{
    AccessTokenResponse, AuthResponse, LoginRequest, RefreshRequest, RegisterRequest,
    TokenObtainResponse,
};
use super::jwt::JwtKeys;
use super::password::{hash_password, verify_password, MIN_PASSWORD_LEN};
use crate::error::{AppError, AppResult, FieldErrors, NON_FIELD_ERRORS};
use crate::state::AppState;
use crate::users::repo::is_unique_violation;
use crate::users::repo_types::{NewUser, User};
use crate::users::services::{compose_name, summary, EMAIL_TAKEN, NAME_PART_MAX};
use crate::validation::{max_chars, required_text, valid_email, BLANK, REQUIRED};

pub const INVALID_CREDENTIALS: &str = "Unable to log in with provided credentials.";
pub const ACCOUNT_DISABLED: &str = "User account is disabled.";
pub const NO_ACTIVE_ACCOUNT: &str = "No active account found with the given credentials";
pub const TOKEN_INVALID: &str = "Token is invalid or expired";

lazy_static! {
    // unknown emails are checked against this so login timing does not tell them apart
    static ref DUMMY_HASH: Option<String> = hash_password("no-such-account").ok();
}

fn password_field(errors: &mut FieldErrors, value: Option<&str>) -> Option<String> {
    match value {
        None => errors.add("password", REQUIRED),
        Some("") => errors.add("password", BLANK),
        Some(p) if p.chars().count() < MIN_PASSWORD_LEN => errors.add(
            "password",
            format!("Ensure this field has at least {} characters.", MIN_PASSWORD_LEN),
        ),
        Some(p) => return Some(p.to_string()),
    }
    None
}

fn credentials(req: &LoginRequest) -> AppResult<(String, String)> {
    let mut errors = FieldErrors::new();
    let email = valid_email(&mut errors, "email", req.email.as_deref());
    let password = match req.password.as_deref() {
        None => {
            errors.add("password", REQUIRED);
            None
        }
        Some("") => {
            errors.add("password", BLANK);
            None
        }
        Some(p) => Some(p.to_string()),
    };
    errors.into_result()?;
    match (email, password) {
        (Some(e), Some(p)) => Ok((e, p)),
        _ => Err(AppError::validation(
            NON_FIELD_ERRORS,
            "Must include \"email\" and \"password\".",
        )),
    }
}

/// The user whose password matches, active or not.
async fn check_password(st: &AppState, email: &str, password: &str) -> AppResult<Option<User>> {
    let Some(user) = st.users.find_by_email(email).await? else {
        warn!(email = %email, "login unknown email");
        if let Some(hash) = DUMMY_HASH.as_deref() {
            let _ = verify_password(password, hash);
        }
        return Ok(None);
    };
    if !verify_password(password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Ok(None);
    }
    Ok(Some(user))
}

pub async fn register(st: &AppState, req: RegisterRequest) -> AppResult<AuthResponse> {
    let mut errors = FieldErrors::new();
    let email = valid_email(&mut errors, "email", req.email.as_deref());
    let password = password_field(&mut errors, req.password.as_deref());
    let first = required_text(&mut errors, "first_name", req.first_name.as_deref());
    let last = required_text(&mut errors, "last_name", req.last_name.as_deref());
    if let Some(first) = &first {
        max_chars(&mut errors, "first_name", first, NAME_PART_MAX);
    }
    if let Some(last) = &last {
        max_chars(&mut errors, "last_name", last, NAME_PART_MAX);
    }
    if let Some(email) = &email {
        if st.users.find_by_email(email).await?.is_some() {
            warn!(email = %email, "email already registered");
            errors.add("email", EMAIL_TAKEN);
        }
    }
    errors.into_result()?;
    let (Some(email), Some(password), Some(first), Some(last)) = (email, password, first, last)
    else {
        return Err(AppError::validation(NON_FIELD_ERRORS, "Invalid registration data."));
    };

    let new_user = NewUser {
        email,
        password_hash: hash_password(&password)?,
        name: compose_name(&first, &last),
        first_name: Some(first),
        last_name: Some(last),
    };
    let user = st.users.create(new_user).await.map_err(|e| {
        if is_unique_violation(&e) {
            AppError::validation("email", EMAIL_TAKEN)
        } else {
            AppError::Internal(e)
        }
    })?;

    let tokens = JwtKeys::from_ref(st).issue_pair(user.id)?;
    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(AuthResponse {
        user: summary(&user),
        tokens: tokens.into(),
    })
}

pub async fn login(st: &AppState, req: LoginRequest) -> AppResult<AuthResponse> {
    let (email, password) = credentials(&req)?;
    let Some(user) = check_password(st, &email, &password).await? else {
        return Err(AppError::validation(NON_FIELD_ERRORS, INVALID_CREDENTIALS));
    };
    if !user.is_active {
        warn!(user_id = %user.id, "login to disabled account");
        return Err(AppError::validation(NON_FIELD_ERRORS, ACCOUNT_DISABLED));
    }

    let tokens = JwtKeys::from_ref(st).issue_pair(user.id)?;
    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(AuthResponse {
        user: summary(&user),
        tokens: tokens.into(),
    })
}

/// Token obtain flow: same credential check as login, reported as 401.
pub async fn obtain_pair(st: &AppState, req: LoginRequest) -> AppResult<TokenObtainResponse> {
    let (email, password) = credentials(&req)?;
    let user = match check_password(st, &email, &password).await? {
        Some(user) if user.is_active => user,
        _ => return Err(AppError::Unauthorized(NO_ACTIVE_ACCOUNT.into())),
    };
    let pair = JwtKeys::from_ref(st).issue_pair(user.id)?;
    info!(user_id = %user.id, "token pair obtained");
    Ok(TokenObtainResponse {
        access: pair.access,
        refresh: pair.refresh,
        user: summary(&user),
    })
}

pub async fn refresh(st: &AppState, req: RefreshRequest) -> AppResult<AccessTokenResponse> {
    let mut errors = FieldErrors::new();
    let token = required_text(&mut errors, "refresh", req.refresh.as_deref());
    errors.into_result()?;
    let token = token.unwrap_or_default();

    let keys = JwtKeys::from_ref(st);
    let claims = keys.verify_refresh(&token).map_err(|e| {
        warn!(error = %e, "refresh rejected");
        AppError::Unauthorized(TOKEN_INVALID.into())
    })?;
    match st.users.find_by_id(claims.sub).await? {
        Some(user) if user.is_active => {}
        _ => {
            warn!(user_id = %claims.sub, "refresh for missing or inactive user");
            return Err(AppError::Unauthorized(TOKEN_INVALID.into()));
        }
    }
    let access = keys.sign_access(claims.sub)?;
    Ok(AccessTokenResponse { access })
}

/// Stateless signature and expiry check.
pub fn verify(st: &AppState, token: &str) -> bool {
    JwtKeys::from_ref(st).verify(token).is_ok()
}
