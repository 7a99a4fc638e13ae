use axum::{routing::post, Router};

use crate::controllers::vote_controllers::cast_vote;
use crate::state::AppState;

pub fn vote_routes() -> Router<AppState> {
    Router::new().route("/", post(cast_vote::cast_vote))
}
