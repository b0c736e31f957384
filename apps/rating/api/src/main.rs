use axum_helpers::server::{create_production_app, create_router, health_router};
use core_config::tracing::{init_tracing, install_color_eyre};
use database::postgres::run_migrations;
use tracing::{info, warn};

mod api;
mod config;
mod openapi;
mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Before anything fallible, so startup errors are rendered with span traces
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    let db = database::postgres::connect_from_config_with_retry(config.database.clone(), None)
        .await
        .map_err(|e| eyre::eyre!("PostgreSQL connection failed: {}", e))?;

    run_migrations::<migration::Migrator>(&db, config.app.name)
        .await
        .map_err(|e| eyre::eyre!("Migrations failed: {}", e))?;

    let redis = match config.redis.clone() {
        Some(redis_config) => Some(
            database::redis::connect_from_config_with_retry(redis_config, None)
                .await
                .map_err(|e| eyre::eyre!("Redis connection failed: {}", e))?,
        ),
        None => {
            warn!("REDIS_URL not set, user cache disabled");
            None
        }
    };

    let jwt_auth = axum_helpers::JwtAuth::new(&config.jwt);

    let state = AppState {
        config,
        db,
        redis,
        jwt_auth,
    };

    let api_routes = api::routes(&state);
    let router = create_router::<openapi::ApiDoc>(
        api_routes,
        &state.config.cors,
        state.config.server.request_timeout(),
    );

    // /health is liveness only; /ready checks the backing stores
    let app = router
        .merge(health_router(state.config.app.clone()))
        .merge(api::ready_router(state.clone()));

    info!(
        address = %state.config.server.address(),
        cooldown_secs = state.config.votes.cooldown.as_secs(),
        "Starting rating API"
    );

    let server = state.config.server.clone();
    create_production_app(app, &server, async move {
        info!("Shutting down: closing database connections");
        match state.db.close().await {
            Ok(_) => info!("PostgreSQL connection closed successfully"),
            Err(e) => tracing::error!("Error closing PostgreSQL: {}", e),
        }
        // ConnectionManager closes on drop
        drop(state.redis);
    })
    .await
    .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("Rating API shutdown complete");
    Ok(())
}
