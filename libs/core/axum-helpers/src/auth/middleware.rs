use super::jwt::JwtAuth;
use crate::errors::AppError;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};

/// Token from `Authorization: Bearer <token>`, falling back to the
/// `access_token` cookie.
fn extract_token_from_request(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        .or_else(|| {
            headers
                .get(header::COOKIE)
                .and_then(|v| v.to_str().ok())
                .and_then(|cookies| {
                    cookies.split(';').find_map(|cookie| {
                        cookie
                            .trim()
                            .split_once('=')
                            .filter(|(name, _)| *name == "access_token")
                            .map(|(_, value)| value.to_string())
                    })
                })
        })
        .filter(|token| !token.is_empty())
}

/// Require a valid JWT and insert its [`JwtClaims`](super::JwtClaims) into
/// request extensions.
pub async fn jwt_auth_middleware(
    State(auth): State<JwtAuth>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token_from_request(&headers).ok_or_else(|| {
        tracing::debug!("No JWT found in Authorization header or cookie");
        AppError::Unauthorized("No token provided".to_string())
    })?;

    let claims = auth.verify_token(&token).map_err(|e| {
        tracing::debug!(error = %e, "JWT verification failed");
        AppError::from(e)
    })?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Like [`jwt_auth_middleware`] but lets anonymous requests through.
pub async fn optional_jwt_auth_middleware(
    State(auth): State<JwtAuth>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(claims) =
        extract_token_from_request(&headers).and_then(|t| auth.verify_token(&t).ok())
    {
        request.extensions_mut().insert(claims);
    }

    next.run(request).await
}
