//! HTTP surface: router, auth

pub mod middleware;
pub mod routes;

pub use routes::build_router;
