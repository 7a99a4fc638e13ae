pub mod cast_vote;
pub mod models;
