pub mod live_routes;
pub mod poll_routes;
pub mod user_routes;
pub mod vote_routes;
