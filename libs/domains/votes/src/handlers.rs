use axum::{
    Extension, Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
};
use axum_helpers::{
    AppError, JwtAuth, JwtClaims, UuidPath,
    errors::responses::{
        BadRequestResponse, InternalServerErrorResponse, NotFoundResponse,
        ServiceUnavailableResponse, TooManyRequestsResponse, UnauthorizedResponse,
    },
    jwt_auth_middleware,
};
use std::sync::Arc;
use utoipa::OpenApi;
use uuid::Uuid;

use crate::models::{RatingResponse, RevokeReceipt, VoteReceipt, VoteValue};
use crate::repository::VoteStore;
use crate::service::VoteService;

pub const TAG: &str = "votes";

/// OpenAPI documentation for the rating endpoints
#[derive(OpenApi)]
#[openapi(
    paths(like_user, dislike_user, revoke_vote, get_rating),
    components(
        schemas(VoteReceipt, RevokeReceipt, RatingResponse),
        responses(
            BadRequestResponse,
            UnauthorizedResponse,
            NotFoundResponse,
            TooManyRequestsResponse,
            ServiceUnavailableResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = TAG, description = "Like, dislike and rating endpoints")
    )
)]
pub struct ApiDoc;

/// Routes relative to the users collection (`/{id}/like`, ...).
///
/// Voting requires a JWT; reading a rating does not.
pub fn router<S>(service: VoteService<S>, auth: JwtAuth) -> Router
where
    S: VoteStore,
{
    let shared_service = Arc::new(service);

    let protected = Router::new()
        .route("/{id}/like", post(like_user::<S>))
        .route("/{id}/dislike", post(dislike_user::<S>))
        .route("/{id}/vote", delete(revoke_vote::<S>))
        .route_layer(middleware::from_fn_with_state(auth, jwt_auth_middleware));

    Router::new()
        .route("/{id}/rating", get(get_rating::<S>))
        .merge(protected)
        .with_state(shared_service)
}

async fn cast<S>(
    service: &VoteService<S>,
    claims: &JwtClaims,
    target_id: Uuid,
    value: VoteValue,
) -> Result<(StatusCode, Json<VoteReceipt>), AppError>
where
    S: VoteStore,
{
    let voter_id = claims.user_id()?;
    let receipt = service.cast(voter_id, target_id, value.weight()).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Like a user
#[utoipa::path(
    post,
    path = "/{id}/like",
    tag = TAG,
    params(("id" = Uuid, Path, description = "User to like")),
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Vote recorded", body = VoteReceipt),
        (status = 400, response = BadRequestResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse),
        (status = 429, response = TooManyRequestsResponse),
        (status = 503, response = ServiceUnavailableResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn like_user<S>(
    State(service): State<Arc<VoteService<S>>>,
    Extension(claims): Extension<JwtClaims>,
    UuidPath(target_id): UuidPath,
) -> Result<impl IntoResponse, AppError>
where
    S: VoteStore,
{
    cast(&service, &claims, target_id, VoteValue::Like).await
}

/// Dislike a user
#[utoipa::path(
    post,
    path = "/{id}/dislike",
    tag = TAG,
    params(("id" = Uuid, Path, description = "User to dislike")),
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Vote recorded", body = VoteReceipt),
        (status = 400, response = BadRequestResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse),
        (status = 429, response = TooManyRequestsResponse),
        (status = 503, response = ServiceUnavailableResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn dislike_user<S>(
    State(service): State<Arc<VoteService<S>>>,
    Extension(claims): Extension<JwtClaims>,
    UuidPath(target_id): UuidPath,
) -> Result<impl IntoResponse, AppError>
where
    S: VoteStore,
{
    cast(&service, &claims, target_id, VoteValue::Dislike).await
}

/// Withdraw your vote for a user, also after that user was deleted
#[utoipa::path(
    delete,
    path = "/{id}/vote",
    tag = TAG,
    params(("id" = Uuid, Path, description = "User the vote was for")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Vote removed", body = RevokeReceipt),
        (status = 400, response = BadRequestResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse),
        (status = 503, response = ServiceUnavailableResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn revoke_vote<S>(
    State(service): State<Arc<VoteService<S>>>,
    Extension(claims): Extension<JwtClaims>,
    UuidPath(target_id): UuidPath,
) -> Result<Json<RevokeReceipt>, AppError>
where
    S: VoteStore,
{
    let voter_id = claims.user_id()?;
    let receipt = service.revoke(voter_id, target_id).await?;
    Ok(Json(receipt))
}

/// Get a user's rating
#[utoipa::path(
    get,
    path = "/{id}/rating",
    tag = TAG,
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Current rating", body = RatingResponse),
        (status = 400, response = BadRequestResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_rating<S>(
    State(service): State<Arc<VoteService<S>>>,
    UuidPath(user_id): UuidPath,
) -> Result<Json<RatingResponse>, AppError>
where
    S: VoteStore,
{
    let rating = service.rating(user_id).await?;
    Ok(Json(RatingResponse { user_id, rating }))
}
