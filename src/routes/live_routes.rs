use axum::{routing::get, Router};

use crate::controllers::live_controllers::ws;
use crate::state::AppState;

pub fn live_routes() -> Router<AppState> {
    Router::new().route("/", get(ws::ws_handler))
}
