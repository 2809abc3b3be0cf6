pub mod auth;
pub mod handlers;
pub mod routes;
pub mod state;
