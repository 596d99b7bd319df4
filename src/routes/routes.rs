//! Defines routes for the gateway.
//!
//! ## Structure
//! - **Probes** (mounted at root)
//!   - `GET    /healthz`: liveness
//!   - `GET    /readyz`: backend readiness
//!
//! - **File endpoints** under `/api/v1/s3`
//!   - `GET    /fileList?prefix=`: list objects with signed download URLs
//!   - `GET    /file?filename=`: signed download URL for one object
//!   - `POST   /upload`: multipart upload (field `file`)
//!   - `DELETE /del?filename=`: idempotent delete

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        object_handlers::{delete_file, get_file, list_files, upload_file},
    },
    services::storage_service::StorageService,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
};

/// Build the router carrying `StorageService` as shared state.
///
/// `upload_body_limit` caps the raw request body of the upload route; the
/// per-object limit is enforced again by the accessor.
pub fn routes(upload_body_limit: usize) -> Router<StorageService> {
    let files = Router::new()
        .route("/fileList", get(list_files))
        .route("/file", get(get_file))
        .route(
            "/upload",
            post(upload_file).layer(DefaultBodyLimit::max(upload_body_limit)),
        )
        .route("/del", delete(delete_file));

    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .nest("/api/v1/s3", files)
}
