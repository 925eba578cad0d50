//! HTTP control surface: request/response DTOs, the axum router, and the
//! metrics middleware that instruments every route.

pub mod dto;
pub mod middleware;
pub mod server;

pub use server::{build_router, serve, AppState};
