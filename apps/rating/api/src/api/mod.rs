use axum::Router;
use axum::routing::get;

use crate::state::AppState;

pub mod auth;
pub mod health;
pub mod users;
pub mod votes;

/// API routes without the `/api` prefix, which `create_router` adds.
///
/// Every sub-router already has its state applied.
pub fn routes(state: &AppState) -> Router {
    Router::new()
        .nest("/auth", auth::router(state))
        .nest("/users", users::router(state).merge(votes::router(state)))
}

/// `/ready` with live database and cache checks, mergeable into the stateless app router.
pub fn ready_router(state: AppState) -> Router {
    Router::new()
        .route("/ready", get(health::ready_handler))
        .with_state(state)
}
