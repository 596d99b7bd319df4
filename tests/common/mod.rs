#![allow(dead_code)]

pub mod backend;

pub use backend::{MemoryBackend, Op};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::Response,
};
use object_gateway::{
    routes::routes::routes,
    services::{
        call_policy::RetryPolicy,
        storage_service::{ServiceSettings, StorageService},
    },
};
use serde_json::Value;
use std::{sync::Arc, time::Duration};

/// Settings with a short backend timeout so timeout tests stay fast.
pub fn settings() -> ServiceSettings {
    ServiceSettings {
        backend_timeout: Duration::from_millis(200),
        ..ServiceSettings::default()
    }
}

pub fn retrying(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
    }
}

pub fn service(backend: Arc<MemoryBackend>) -> StorageService {
    StorageService::new(backend, settings())
}

pub fn service_with(backend: Arc<MemoryBackend>, settings: ServiceSettings) -> StorageService {
    StorageService::new(backend, settings)
}

pub fn app(service: StorageService) -> Router {
    let limit = service.accessor.max_upload_bytes() as usize + 64 * 1024;
    app_with_limit(service, limit)
}

pub fn app_with_limit(service: StorageService, body_limit: usize) -> Router {
    routes(body_limit).with_state(service)
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Build a multipart/form-data body. Each part is
/// `(field name, file name, content type, data)`.
pub fn multipart_body(
    boundary: &str,
    parts: &[(&str, Option<&str>, Option<&str>, &[u8])],
) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, file_name, content_type, data) in parts {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        let disposition = match file_name {
            Some(file_name) => {
                format!("Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n")
            }
            None => format!("Content-Disposition: form-data; name=\"{name}\"\r\n"),
        };
        body.extend_from_slice(disposition.as_bytes());
        if let Some(content_type) = content_type {
            body.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    body
}
