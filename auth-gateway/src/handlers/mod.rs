pub mod auth;
pub mod operations;
