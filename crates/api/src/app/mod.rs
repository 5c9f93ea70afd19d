//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: backend selection and service assembly
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use crate::config::AppConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: &AppConfig) -> Result<Router, services::StartupError> {
    let services = Arc::new(services::build_services(config).await?);
    Ok(router(services))
}

/// Router over already-assembled services.
pub fn router(services: Arc<AppServices>) -> Router {
    // Session management: the phantom token itself is the subject.
    let session = routes::session_router()
        .layer(Extension(services.clone()))
        .layer(axum::middleware::from_fn_with_state(
            services.clone(),
            middleware::session_middleware,
        ));

    // Tenant-scoped routes: gateway headers or a bearer credential.
    let protected = routes::router()
        .layer(Extension(services.clone()))
        .layer(axum::middleware::from_fn_with_state(
            services.clone(),
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::public_router().layer(Extension(services)))
        .merge(session)
        .merge(protected)
        .layer(ServiceBuilder::new())
}
