use axum::{routing::post, Router};

use crate::controllers::user_controllers::{create_user, list_users};
use crate::state::AppState;

pub fn user_routes() -> Router<AppState> {
    Router::new().route("/", post(create_user::create_user).get(list_users::list_users))
}
