use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Registers the `bearer_auth` scheme referenced by the protected endpoints.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .description(Some("Access token issued by POST /api/auth/login"))
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    components(
        schemas(axum_helpers::ErrorResponse)
    ),
    info(
        title = "Rating API",
        version = "0.1.0",
        description = "User accounts, token auth and peer rating"
    ),
    servers(
        (url = "/api", description = "API base path")
    ),
    nest(
        (path = "/auth", api = domain_users::AuthApiDoc),
        (path = "/users", api = domain_users::ApiDoc),
        (path = "/users", api = domain_votes::ApiDoc)
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_merges_domains() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();

        for expected in [
            "/auth/login",
            "/users",
            "/users/count",
            "/users/{id}",
            "/users/{id}/like",
            "/users/{id}/dislike",
            "/users/{id}/vote",
            "/users/{id}/rating",
        ] {
            assert!(
                paths.iter().any(|p| p.as_str() == expected),
                "missing {expected} in {paths:?}"
            );
        }

        let schemes = doc.components.unwrap().security_schemes;
        assert!(schemes.contains_key("bearer_auth"));
    }
}
