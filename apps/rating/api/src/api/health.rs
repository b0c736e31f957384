//! Readiness check against the real database and cache.

use axum::{extract::State, response::Response};
use axum_helpers::{HealthCheckFuture, run_health_checks};

use crate::state::AppState;

/// 200 when PostgreSQL (and Redis, if configured) answer, 503 otherwise.
pub async fn ready_handler(State(state): State<AppState>) -> Response {
    let mut checks: Vec<(&str, HealthCheckFuture<'_>)> = vec![(
        "database",
        Box::pin(async {
            database::postgres::check_health(&state.db)
                .await
                .map_err(|e| e.to_string())
        }),
    )];

    if let Some(redis) = &state.redis {
        let mut conn = redis.clone();
        checks.push((
            "redis",
            Box::pin(async move {
                database::redis::check_health(&mut conn)
                    .await
                    .map_err(|e| e.to_string())
            }),
        ));
    }

    run_health_checks(checks).await
}
