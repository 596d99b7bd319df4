mod common;

use bytes::Bytes;
use chrono::Utc;
use common::{MemoryBackend, Op, retrying, service, service_with, settings};
use object_gateway::{
    models::{ObjectKey, SignedOperation, UploadRequest},
    services::error::{ErrorKind, StorageError},
};
use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

fn key(raw: &str) -> ObjectKey {
    ObjectKey::parse(raw).unwrap()
}

#[tokio::test]
async fn uploaded_object_is_reachable_through_its_signed_url() {
    let backend = Arc::new(MemoryBackend::new());
    let svc = service(backend.clone());

    let stored = svc
        .accessor
        .put(UploadRequest::new(
            key("report.pdf"),
            Bytes::from_static(b"%PDF-1.7"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(stored.as_str(), "report.pdf");

    let signed = svc.accessor.get(&stored, None).await.unwrap();
    let fetched = backend.fetch(&signed.url).unwrap();
    assert_eq!(&fetched.body[..], b"%PDF-1.7");
    assert_eq!(fetched.content_type, "application/pdf");
}

#[tokio::test]
async fn second_upload_to_the_same_key_wins() {
    let backend = Arc::new(MemoryBackend::new());
    let svc = service(backend.clone());

    for body in [&b"first"[..], &b"second"[..]] {
        svc.accessor
            .put(UploadRequest::new(
                key("notes.txt"),
                Bytes::copy_from_slice(body),
                None,
            ))
            .await
            .unwrap();
    }

    let stored = backend.object("notes.txt").unwrap();
    assert_eq!(&stored.body[..], b"second");
    assert_eq!(stored.content_type, "text/plain");
    assert_eq!(backend.len(), 1);
}

#[tokio::test]
async fn oversize_upload_never_reaches_the_backend() {
    let backend = Arc::new(MemoryBackend::new());
    let mut settings = settings();
    settings.max_upload_bytes = 8;
    let svc = service_with(backend.clone(), settings);

    let err = svc
        .accessor
        .put(UploadRequest::new(
            key("big.bin"),
            Bytes::from_static(b"123456789"),
            None,
        ))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::PayloadTooLarge);
    assert_eq!(backend.calls(Op::Put), 0);
}

#[tokio::test]
async fn empty_upload_is_stored() {
    let backend = Arc::new(MemoryBackend::new());
    let svc = service(backend.clone());

    svc.accessor
        .put(UploadRequest::new(key("empty.txt"), Bytes::new(), None))
        .await
        .unwrap();

    assert_eq!(backend.object("empty.txt").unwrap().body.len(), 0);
}

#[tokio::test]
async fn delete_is_idempotent() {
    let backend = Arc::new(MemoryBackend::new());
    backend.insert("tmp/a.txt", b"a");
    let svc = service(backend.clone());

    svc.accessor.delete(&key("tmp/a.txt")).await.unwrap();
    svc.accessor.delete(&key("tmp/a.txt")).await.unwrap();
    assert!(backend.object("tmp/a.txt").is_none());

    backend.fail_next(Op::Delete, StorageError::not_found("tmp/a.txt"));
    svc.accessor.delete(&key("tmp/a.txt")).await.unwrap();
}

#[tokio::test]
async fn delete_surfaces_permission_errors() {
    let backend = Arc::new(MemoryBackend::new());
    backend.fail_next(
        Op::Delete,
        StorageError::PermissionDenied {
            operation: "delete",
            detail: "AccessDenied".into(),
        },
    );
    let svc = service(backend);

    let err = svc.accessor.delete(&key("locked.txt")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);
}

#[tokio::test]
async fn delete_surfaces_a_missing_bucket() {
    let backend = Arc::new(MemoryBackend::new());
    backend.insert("a.txt", b"a");
    backend.fail_next(
        Op::Delete,
        StorageError::unknown("delete", "NoSuchBucket: The specified bucket does not exist"),
    );
    let svc = service(backend.clone());

    let err = svc.accessor.delete(&key("a.txt")).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Unknown);
    assert!(backend.object("a.txt").is_some());
}

#[tokio::test]
async fn signing_a_missing_key_succeeds() {
    let backend = Arc::new(MemoryBackend::new());
    let svc = service(backend.clone());

    let signed = svc.accessor.get(&key("ghost.png"), None).await.unwrap();

    assert!(signed.url.contains("ghost.png"));
    assert!(backend.fetch(&signed.url).is_none());
}

#[tokio::test]
async fn signature_window_is_backdated_by_the_clock_skew() {
    let backend = Arc::new(MemoryBackend::new());
    let svc = service(backend.clone());
    let before = Utc::now();

    let signed = svc.accessor.get(&key("a.txt"), Some(600)).await.unwrap();

    let record = backend.presigns().pop().unwrap();
    assert_eq!(record.operation, SignedOperation::Get);
    assert_eq!(record.expires_in, Duration::from_secs(630));
    let backdated = SystemTime::now()
        .duration_since(record.start)
        .unwrap_or_default();
    assert!(backdated >= Duration::from_secs(29), "{backdated:?}");
    assert!(backdated <= Duration::from_secs(35), "{backdated:?}");

    let lifetime = signed.expires_at - before;
    assert!(lifetime >= chrono::Duration::seconds(599));
    assert!(lifetime <= chrono::Duration::seconds(605));
}

#[tokio::test]
async fn invalid_ttls_are_rejected() {
    let backend = Arc::new(MemoryBackend::new());
    let svc = service(backend.clone());

    for ttl in [0, -5, 604_800] {
        let err = svc.accessor.get(&key("a.txt"), Some(ttl)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput, "ttl {ttl}");
    }
    assert_eq!(backend.calls(Op::Presign), 0);
}

#[tokio::test]
async fn slow_backend_times_out_as_transient() {
    let backend = Arc::new(MemoryBackend::new());
    backend.set_latency(Op::Put, Duration::from_secs(2));
    let svc = service(backend.clone());

    let err = svc
        .accessor
        .put(UploadRequest::new(key("slow.txt"), Bytes::from_static(b"x"), None))
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::Timeout { operation: "put" }), "{err:?}");
    assert_eq!(err.kind(), ErrorKind::TransientError);
    assert!(backend.object("slow.txt").is_none());
}

#[tokio::test]
async fn transient_failures_are_retried_when_enabled() {
    let backend = Arc::new(MemoryBackend::new());
    backend.fail_next(Op::Put, StorageError::transient("put", "connection reset"));
    backend.fail_next(
        Op::Put,
        StorageError::Throttled {
            operation: "put",
            detail: "SlowDown".into(),
        },
    );
    let mut settings = settings();
    settings.retry = retrying(3);
    let svc = service_with(backend.clone(), settings);

    svc.accessor
        .put(UploadRequest::new(key("retry.txt"), Bytes::from_static(b"x"), None))
        .await
        .unwrap();

    assert_eq!(backend.calls(Op::Put), 3);
    assert!(backend.object("retry.txt").is_some());
}

#[tokio::test]
async fn permanent_failures_are_not_retried() {
    let backend = Arc::new(MemoryBackend::new());
    backend.fail_next(
        Op::Put,
        StorageError::PermissionDenied {
            operation: "put",
            detail: "AccessDenied".into(),
        },
    );
    let mut settings = settings();
    settings.retry = retrying(3);
    let svc = service_with(backend.clone(), settings);

    let err = svc
        .accessor
        .put(UploadRequest::new(key("denied.txt"), Bytes::from_static(b"x"), None))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    assert_eq!(backend.calls(Op::Put), 1);
}

#[tokio::test]
async fn retry_is_off_by_default() {
    let backend = Arc::new(MemoryBackend::new());
    backend.fail_next(Op::Put, StorageError::transient("put", "connection reset"));
    let svc = service(backend.clone());

    let err = svc
        .accessor
        .put(UploadRequest::new(key("once.txt"), Bytes::from_static(b"x"), None))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::TransientError);
    assert_eq!(backend.calls(Op::Put), 1);
}

#[tokio::test]
async fn health_check_reports_backend_state() {
    let backend = Arc::new(MemoryBackend::new());
    let svc = service(backend.clone());

    svc.health_check().await.unwrap();
    backend.set_unhealthy(true);
    assert_eq!(
        svc.health_check().await.unwrap_err().kind(),
        ErrorKind::TransientError
    );
}
