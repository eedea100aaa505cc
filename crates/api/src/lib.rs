//! HTTP API: invoice document download endpoints.

pub mod app;
pub mod config;
pub mod context;
pub mod middleware;
