use tracing::{info, warn};
use uuid::Uuid;

use super::dto::{UpdateUserRequest, UserResponse, UserSummary};
use super::repo::is_unique_violation;
use super::repo_types::User;
use crate::error::{AppError, AppResult, FieldErrors};
use crate::images::services::{
    avatar_key, delete_objects_best_effort, object_filename, store_image, url_for,
    validate_image, ImageForm,
};
use crate::state::AppState;
use crate::validation::{max_chars, valid_email, REQUIRED};

pub const NAME_MAX: usize = 255;
pub const NAME_PART_MAX: usize = 150;
pub const EMAIL_TAKEN: &str = "user with this email address already exists.";

/// First word and remainder of `name`. Lossy for multi-word first names.
pub fn split_name(name: &str) -> (String, String) {
    match name.split_once(' ') {
        Some((first, rest)) => (first.to_string(), rest.to_string()),
        None => (name.to_string(), String::new()),
    }
}

pub fn compose_name(first: &str, last: &str) -> String {
    format!("{} {}", first, last).trim().to_string()
}

/// Stored first/last names win; the split of `name` is only a fallback.
pub fn display_names(user: &User) -> (String, String) {
    match (&user.first_name, &user.last_name) {
        (None, None) => split_name(&user.name),
        (first, last) => (
            first.clone().unwrap_or_default(),
            last.clone().unwrap_or_default(),
        ),
    }
}

pub fn summary(user: &User) -> UserSummary {
    let (first_name, last_name) = display_names(user);
    UserSummary {
        id: user.id,
        email: user.email.clone(),
        first_name,
        last_name,
        name: user.name.clone(),
    }
}

pub fn detail_url(id: Uuid) -> String {
    format!("/api/users/{}/", id)
}

pub async fn profile(st: &AppState, user: &User) -> AppResult<UserResponse> {
    let avatar_url = match &user.avatar_key {
        Some(key) => Some(url_for(st, key).await?),
        None => None,
    };
    let active_ads_count = st.ads.count_active_by_owner(user.id).await?;
    let UserSummary {
        id,
        email,
        first_name,
        last_name,
        name,
    } = summary(user);
    Ok(UserResponse {
        id,
        email,
        first_name,
        last_name,
        name,
        url: detail_url(id),
        avatar_url,
        active_ads_count,
    })
}

/// Users can only see themselves through the users endpoints.
pub async fn get_user(st: &AppState, actor: &User, id: Uuid) -> AppResult<UserResponse> {
    if actor.id != id {
        return Err(AppError::NotFound);
    }
    profile(st, actor).await
}

pub async fn update_user(
    st: &AppState,
    actor: User,
    id: Uuid,
    req: UpdateUserRequest,
    partial: bool,
) -> AppResult<UserResponse> {
    if actor.id != id {
        return Err(AppError::NotFound);
    }

    let mut errors = FieldErrors::new();
    let email = match req.email.as_deref() {
        Some(raw) => valid_email(&mut errors, "email", Some(raw)),
        None => {
            if !partial {
                errors.add("email", REQUIRED);
            }
            None
        }
    };
    if let Some(email) = &email {
        if *email != actor.email && st.users.find_by_email(email).await?.is_some() {
            errors.add("email", EMAIL_TAKEN);
        }
    }
    let name = req.name.as_deref().map(str::trim);
    if let Some(name) = name {
        max_chars(&mut errors, "name", name, NAME_MAX);
    }
    let first = req.first_name.as_deref().map(str::trim);
    let last = req.last_name.as_deref().map(str::trim);
    if let Some(first) = first {
        max_chars(&mut errors, "first_name", first, NAME_PART_MAX);
    }
    if let Some(last) = last {
        max_chars(&mut errors, "last_name", last, NAME_PART_MAX);
    }
    errors.into_result()?;

    let mut user = actor;
    if let Some(email) = email {
        user.email = email;
    }
    if first.is_some() || last.is_some() {
        let (cur_first, cur_last) = display_names(&user);
        let first = first.map(str::to_string).unwrap_or(cur_first);
        let last = last.map(str::to_string).unwrap_or(cur_last);
        user.name = match name {
            Some(name) => name.to_string(),
            None => compose_name(&first, &last),
        };
        user.first_name = Some(first);
        user.last_name = Some(last);
    } else if let Some(name) = name {
        user.name = name.to_string();
        user.first_name = None;
        user.last_name = None;
    }

    let user = st.users.save(&user).await.map_err(|e| {
        if is_unique_violation(&e) {
            AppError::validation("email", EMAIL_TAKEN)
        } else {
            AppError::Internal(e)
        }
    })?;
    info!(user_id = %user.id, "profile updated");
    profile(st, &user).await
}

pub async fn set_avatar(st: &AppState, actor: User, form: ImageForm) -> AppResult<UserResponse> {
    let mut errors = FieldErrors::new();
    let upload = validate_image(&mut errors, "image", form.image);
    errors.into_result()?;
    let Some((item, detected)) = upload else {
        return Err(AppError::validation("image", "No file was submitted."));
    };

    let key = avatar_key(actor.id, &object_filename(Uuid::new_v4(), detected.ext));
    store_image(st, &key, item, detected).await?;

    let mut user = actor;
    let previous = user.avatar_key.replace(key.clone());
    let user = match st.users.save(&user).await {
        Ok(user) => user,
        Err(e) => {
            warn!(error = %e, key = %key, "avatar save failed, removing object");
            delete_objects_best_effort(st, &[key]).await;
            return Err(e.into());
        }
    };
    if let Some(previous) = previous {
        delete_objects_best_effort(st, &[previous]).await;
    }
    info!(user_id = %user.id, "avatar updated");
    profile(st, &user).await
}
