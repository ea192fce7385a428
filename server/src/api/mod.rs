//! API server and routes

pub mod auth;
pub mod middleware;
pub mod rate_limit;
pub mod routes;
mod server;

pub use auth::AuthManager;
pub use server::ApiServer;
