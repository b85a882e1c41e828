use std::collections::BTreeMap;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Validation messages keyed by request field.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[cfg(test)]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when nothing was collected, otherwise a validation error.
    pub fn into_result(self) -> Result<(), AppError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("validation failed: {0:?}")]
    Validation(FieldErrors),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Not found.")]
    NotFound,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation(FieldErrors::single(field, message))
    }

    pub fn not_authenticated() -> Self {
        AppError::Unauthorized("Authentication credentials were not provided.".into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            AppError::Validation(errors) => (status, Json(errors)).into_response(),
            AppError::Unauthorized(detail) => {
                let mut res = (status, Json(json!({ "detail": detail }))).into_response();
                res.headers_mut().insert(
                    header::WWW_AUTHENTICATE,
                    HeaderValue::from_static("Bearer realm=\"api\""),
                );
                res
            }
            AppError::BadRequest(detail) | AppError::Forbidden(detail) => {
                (status, Json(json!({ "detail": detail }))).into_response()
            }
            AppError::NotFound => (status, Json(json!({ "detail": "Not found." }))).into_response(),
            AppError::Internal(e) => {
                tracing::error!(error = ?e, "internal error");
                (status, Json(json!({ "detail": "Internal server error" }))).into_response()
            }
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn response_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn taxonomy_maps_to_http_statuses() {
        assert_eq!(
            response_status(AppError::validation("email", "taken")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            response_status(AppError::BadRequest("oops".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            response_status(AppError::not_authenticated()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            response_status(AppError::Forbidden("no".into())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(response_status(AppError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            response_status(AppError::Internal(anyhow::anyhow!("boom"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn unauthorized_carries_bearer_challenge() {
        let res = AppError::not_authenticated().into_response();
        assert_eq!(
            res.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer realm=\"api\""
        );
    }

    #[test]
    fn field_errors_serialize_as_plain_map() {
        let mut errors = FieldErrors::new();
        errors.add("password", "Ensure this field has at least 8 characters.");
        errors.add("email", "This field is required.");
        let value = serde_json::to_value(&errors).unwrap();
        assert_eq!(
            value,
            json!({
                "email": ["This field is required."],
                "password": ["Ensure this field has at least 8 characters."],
            })
        );
    }

    #[test]
    fn empty_field_errors_are_ok() {
        assert!(FieldErrors::new().into_result().is_ok());
        assert!(FieldErrors::single("title", "required").into_result().is_err());
    }
}
