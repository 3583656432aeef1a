pub mod users;

use axum::routing::{get, post};
use axum::Router;

use crate::state::SharedState;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        .route("/api/v1/users", get(users::list))
        .route("/api/v1/users/upload", post(users::upload))
        .route("/api/v1/users/{id}", get(users::get))
        .route(
            "/api/v1/users/{id}/chain-of-command",
            get(users::chain_of_command),
        )
}
