//! docket-axum: Axum adapter for Docket.
//!
//! Resolves the tenant of every request at the edge, runs the rest of the
//! request inside a [`docket_core::TenantScope`], and mounts scoped services
//! as REST routers.

pub mod app;
pub mod middleware;
pub mod rest;
pub mod state;
mod error;

pub use error::DocketAxumError;
pub use middleware::tenant_layer;
pub use state::TenancyState;

pub use app::{axum, AxumApp};
