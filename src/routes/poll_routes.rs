use axum::{
    routing::{get, post},
    Router,
};

use crate::controllers::poll_controllers::{create_poll, get_results, polls};
use crate::state::AppState;

pub fn poll_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_poll::create_poll).get(polls::get_all_polls))
        .route("/:pollId/results", get(get_results::get_results))
        .route("/results/stream", get(get_results::results_stream))
}
