use axum::{routing::get, Json, Router};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::state::AppState;
use crate::{ads, auth, users};

#[derive(OpenApi)]
#[openapi(
    info(title = "Shum API", description = "Classified ads marketplace"),
    paths(
        auth::handlers::register,
        auth::handlers::login,
        auth::handlers::obtain_token,
        auth::handlers::refresh,
        auth::handlers::verify,
        auth::handlers::get_profile,
        users::handlers::list_users,
        users::handlers::me,
        users::handlers::get_user,
        users::handlers::update_user,
        users::handlers::patch_user,
        users::handlers::upload_avatar,
        ads::handlers::list_ads,
        ads::handlers::my_ads,
        ads::handlers::create_ad,
        ads::handlers::get_ad,
        ads::handlers::update_ad,
        ads::handlers::patch_ad,
        ads::handlers::delete_ad,
        ads::handlers::upload_image,
        ads::handlers::mark_sold,
    ),
    components(schemas(
        auth::dto::RegisterRequest,
        auth::dto::LoginRequest,
        auth::dto::RefreshRequest,
        auth::dto::VerifyRequest,
        auth::dto::TokenPair,
        auth::dto::AuthResponse,
        auth::dto::TokenObtainResponse,
        auth::dto::AccessTokenResponse,
        users::dto::UserSummary,
        users::dto::UserResponse,
        users::dto::UpdateUserRequest,
        users::dto::AvatarUploadForm,
        ads::dto::CreateAdRequest,
        ads::dto::UpdateAdRequest,
        ads::dto::AdImageResponse,
        ads::dto::OwnerInfo,
        ads::dto::AdResponse,
        ads::dto::UploadImageForm,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration and JWT tokens"),
        (name = "users", description = "The caller's own profile"),
        (name = "ads", description = "Ads and their images"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/schema/", get(|| async { Json(ApiDoc::openapi()) }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route_and_bearer_scheme() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/auth/register/",
            "/api/auth/token/verify/",
            "/api/users/{id}/",
            "/api/users/me/avatar/",
            "/api/ads/",
            "/api/ads/{id}/upload_image/",
            "/api/ads/{id}/mark_sold/",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path}");
        }
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer"));
        for schema in ["UploadImageForm", "AvatarUploadForm", "AdResponse", "UserResponse"] {
            assert!(components.schemas.contains_key(schema), "{schema}");
        }
    }
}
