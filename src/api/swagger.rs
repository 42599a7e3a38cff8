use utoipa::OpenApi;
use utoipa::openapi::security::{SecurityScheme, HttpAuthScheme, HttpBuilder};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "TerraNest API",
        version = "1.0.0",
        description = "Sustainability tracking API. Users log eco-actions, join organizations, communities and challenges, and compare their saved emissions.\n\n**Authentication:** write endpoints require a JWT Bearer token. Most reads are public.",
        contact(
            name = "TerraNest Team",
            email = "support@terranest.app"
        )
    ),
    paths(
        // Auth endpoints
        crate::api::auth::register,
        crate::api::auth::login,
        crate::api::auth::refresh_token,
        crate::api::auth::get_me,

        // Health
        crate::api::health::health_check,

        // Users
        crate::api::users::leaderboard,

        // Actions
        crate::api::actions::list_actions,
        crate::api::actions::create_action,
        crate::api::actions::log_action,
    ),
    components(
        schemas(
            // Auth
            crate::services::auth_service::LoginRequest,
            crate::services::auth_service::RegisterRequest,
            crate::services::auth_service::RefreshTokenRequest,
            crate::services::auth_service::AuthResponse,
            crate::models::UserResponse,
            crate::models::UpdateProfileRequest,
            crate::models::Role,

            // Health
            crate::api::health::HealthResponse,

            // Actions
            crate::models::ActionCategory,
            crate::models::Frequency,
            crate::models::CreateActionRequest,
            crate::models::UpdateActionRequest,
            crate::models::LogActionRequest,

            // Organizations & communities
            crate::models::OrganizationType,
            crate::models::CreateOrganizationRequest,
            crate::models::UpdateOrganizationRequest,
            crate::models::CreateCommunityRequest,
            crate::models::UpdateCommunityRequest,

            // Posts
            crate::models::CreatePostRequest,
            crate::models::UpdatePostRequest,
            crate::models::CreateCommentRequest,

            // Challenges
            crate::models::ChallengeScope,
            crate::models::ChallengeActionInput,
        )
    ),
    tags(
        (name = "Auth", description = "Registration, login, token refresh and the current user."),
        (name = "Health", description = "Service and database health."),
        (name = "Users", description = "Profiles, leaderboard, dashboard and personal statistics."),
        (name = "Actions", description = "Eco-action catalog and daily action logging."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Enter your JWT token"))
                        .build()
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_routes_and_bearer_scheme() {
        let doc = ApiDoc::openapi();

        assert!(doc.paths.paths.contains_key("/api/auth/login"));
        assert!(doc.paths.paths.contains_key("/api/users/leaderboard"));
        assert!(doc.paths.paths.contains_key("/health"));

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
