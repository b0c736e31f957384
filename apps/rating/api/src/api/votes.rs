use axum::Router;
use domain_votes::{PgVoteStore, VoteService, handlers};

use crate::state::AppState;

pub fn router(state: &AppState) -> Router {
    let config = state.config.votes.clone();
    let store = PgVoteStore::new(state.db.clone()).with_lock_timeout(config.lock_timeout);
    handlers::router(VoteService::new(store, config), state.jwt_auth.clone())
}
