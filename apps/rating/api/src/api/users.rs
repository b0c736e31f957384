use axum::Router;
use domain_users::{PgUserRepository, RedisUserCache, UserService, handlers};

use crate::state::AppState;

/// Postgres-backed user service, cached through Redis when it is configured.
pub fn service(state: &AppState) -> UserService<PgUserRepository> {
    let repository = PgUserRepository::new(state.db.clone());
    let service = UserService::new(repository, state.jwt_auth.clone());

    match &state.redis {
        Some(redis) => service.with_cache(RedisUserCache::new(redis.clone())),
        None => service,
    }
}

pub fn router(state: &AppState) -> Router {
    handlers::router(service(state), state.jwt_auth.clone())
}
