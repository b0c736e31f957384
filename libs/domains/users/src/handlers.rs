use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use axum_helpers::{
    AppError, JwtAuth, JwtClaims, UuidPath, ValidatedJson,
    errors::responses::{
        BadRequestResponse, ConflictResponse, ForbiddenResponse, InternalServerErrorResponse,
        NotFoundResponse, UnauthorizedResponse, ValidationErrorResponse,
    },
    jwt_auth_middleware, optional_jwt_auth_middleware,
};
use std::str::FromStr;
use std::sync::Arc;
use utoipa::OpenApi;
use uuid::Uuid;

use crate::models::{
    Actor, CountResponse, CreateUser, CreatedResponse, DeleteResponse, ListQuery, LoginRequest,
    LoginResponse, Role, UpdateUser, User, UserListResponse,
};
use crate::repository::UserRepository;
use crate::service::UserService;

pub const TAG: &str = "users";
pub const AUTH_TAG: &str = "auth";

/// OpenAPI documentation for the users endpoints
#[derive(OpenApi)]
#[openapi(
    paths(create_user, list_users, count_users, get_user, update_user, delete_user),
    components(
        schemas(
            User,
            Role,
            CreateUser,
            UpdateUser,
            UserListResponse,
            CountResponse,
            CreatedResponse,
            DeleteResponse
        ),
        responses(
            BadRequestResponse,
            UnauthorizedResponse,
            ForbiddenResponse,
            NotFoundResponse,
            ConflictResponse,
            ValidationErrorResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = TAG, description = "User account management")
    )
)]
pub struct ApiDoc;

/// OpenAPI documentation for the login endpoint
#[derive(OpenApi)]
#[openapi(
    paths(login),
    components(schemas(LoginRequest, LoginResponse)),
    tags(
        (name = AUTH_TAG, description = "Token issuance")
    )
)]
pub struct AuthApiDoc;

/// Resolve the token claims into the caller the service reasons about.
///
/// Unknown role strings degrade to `user`.
pub fn actor_from_claims(claims: &JwtClaims) -> Result<Actor, AppError> {
    Ok(Actor {
        user_id: claims.user_id()?,
        role: Role::from_str(&claims.role).unwrap_or_default(),
    })
}

/// Users collection routes (`/`, `/count`, `/{id}`)
pub fn router<R: UserRepository + 'static>(service: UserService<R>, auth: JwtAuth) -> Router {
    let shared_service = Arc::new(service);

    let public = Router::new()
        .route("/", get(list_users::<R>))
        .route("/count", get(count_users::<R>))
        .route("/{id}", get(get_user::<R>));

    let registration = Router::new()
        .route("/", post(create_user::<R>))
        .route_layer(middleware::from_fn_with_state(
            auth.clone(),
            optional_jwt_auth_middleware,
        ));

    let protected = Router::new()
        .route("/{id}", put(update_user::<R>).delete(delete_user::<R>))
        .route_layer(middleware::from_fn_with_state(auth, jwt_auth_middleware));

    public
        .merge(registration)
        .merge(protected)
        .with_state(shared_service)
}

/// Token routes (`/login`)
pub fn auth_router<R: UserRepository + 'static>(service: UserService<R>) -> Router {
    Router::new()
        .route("/login", post(login::<R>))
        .with_state(Arc::new(service))
}

/// Register a user
#[utoipa::path(
    post,
    path = "",
    tag = TAG,
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = CreatedResponse),
        (status = 400, response = BadRequestResponse),
        (status = 409, response = ConflictResponse),
        (status = 422, response = ValidationErrorResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn create_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    claims: Option<Extension<JwtClaims>>,
    ValidatedJson(input): ValidatedJson<CreateUser>,
) -> Result<impl IntoResponse, AppError> {
    let actor = match claims {
        Some(Extension(claims)) => Some(actor_from_claims(&claims)?),
        None => None,
    };

    let user = service.create_user(input, actor.as_ref()).await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { user_id: user.id })))
}

/// List active users
#[utoipa::path(
    get,
    path = "",
    tag = TAG,
    params(ListQuery),
    responses(
        (status = 200, description = "One page of users", body = UserListResponse),
        (status = 400, response = BadRequestResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_users<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<UserListResponse>, AppError> {
    let list = service.list_users(query).await?;
    Ok(Json(list))
}

/// Count active users
#[utoipa::path(
    get,
    path = "/count",
    tag = TAG,
    responses(
        (status = 200, description = "Number of active users", body = CountResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn count_users<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
) -> Result<Json<CountResponse>, AppError> {
    let count = service.count_users().await?;
    Ok(Json(CountResponse { count }))
}

/// Get a user by ID
#[utoipa::path(
    get,
    path = "/{id}",
    tag = TAG,
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User found", body = User),
        (status = 400, response = BadRequestResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    UuidPath(id): UuidPath,
) -> Result<Json<User>, AppError> {
    let user = service.get_user(id).await?;
    Ok(Json(user))
}

/// Update a user (self or admin)
#[utoipa::path(
    put,
    path = "/{id}",
    tag = TAG,
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUser,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 400, response = BadRequestResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 409, response = ConflictResponse),
        (status = 422, response = ValidationErrorResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn update_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    Extension(claims): Extension<JwtClaims>,
    UuidPath(id): UuidPath,
    ValidatedJson(input): ValidatedJson<UpdateUser>,
) -> Result<Json<User>, AppError> {
    let actor = actor_from_claims(&claims)?;
    let user = service.update_user(&actor, id, input).await?;
    Ok(Json(user))
}

/// Soft delete a user (admin only)
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = TAG,
    params(("id" = Uuid, Path, description = "User ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "User deleted", body = DeleteResponse),
        (status = 400, response = BadRequestResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 403, response = ForbiddenResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn delete_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    Extension(claims): Extension<JwtClaims>,
    UuidPath(id): UuidPath,
) -> Result<Json<DeleteResponse>, AppError> {
    let actor = actor_from_claims(&claims)?;
    let deleted = service.delete_user(&actor, id).await?;
    Ok(Json(deleted))
}

/// Exchange email and password for an access token
#[utoipa::path(
    post,
    path = "/login",
    tag = AUTH_TAG,
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 422, response = ValidationErrorResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn login<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    ValidatedJson(input): ValidatedJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let response = service.login(input).await?;
    Ok(Json(response))
}
