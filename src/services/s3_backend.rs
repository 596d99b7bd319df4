//! S3-compatible backend using the AWS SDK.

use crate::{
    models::{ObjectKey, ObjectMetadata, SignedOperation},
    services::{
        backend::{BackendPage, ObjectBackend},
        error::{StorageError, StorageResult},
    },
};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    Client,
    config::{Credentials, Region, retry::RetryConfig},
    error::{ProvideErrorMetadata, SdkError},
    presigning::{PresigningConfig, PresigningConfigError},
    primitives::ByteStream,
    types::Object,
};
use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::{
    fmt,
    time::{Duration, SystemTime},
};
use tracing::{instrument, warn};

/// Connection settings for [`S3Backend::new`].
#[derive(Clone)]
pub struct S3Settings {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub force_path_style: bool,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

impl fmt::Debug for S3Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Settings")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("force_path_style", &self.force_path_style)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

pub struct S3Backend {
    client: Client,
    bucket: String,
}

impl fmt::Debug for S3Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Backend")
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

impl S3Backend {
    /// Build a client from settings. Explicit credentials win; otherwise the
    /// AWS default credential chain (env, profile, IMDS) is used.
    ///
    /// The SDK's own retries are disabled; `CallPolicy` decides retries.
    pub async fn new(settings: S3Settings) -> StorageResult<Self> {
        if settings.access_key_id.is_some() ^ settings.secret_access_key.is_some() {
            return Err(StorageError::invalid_input(
                "s3 requires both access key id and secret access key when either is set",
            ));
        }

        let region = Region::new(settings.region.clone());
        let mut builder = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(region.clone())
            .retry_config(RetryConfig::disabled())
            .force_path_style(settings.force_path_style);

        if let (Some(key_id), Some(secret)) = (
            settings.access_key_id.clone(),
            settings.secret_access_key.clone(),
        ) {
            builder = builder.credentials_provider(Credentials::new(
                key_id,
                secret,
                None,
                None,
                "object-gateway-config",
            ));
        } else {
            let shared = aws_config::defaults(BehaviorVersion::latest())
                .region(region)
                .load()
                .await;
            if let Some(provider) = shared.credentials_provider() {
                builder = builder.credentials_provider(provider);
            }
        }

        if let Some(endpoint) = &settings.endpoint {
            let lower = endpoint.to_ascii_lowercase();
            let endpoint = if lower.starts_with("http://") || lower.starts_with("https://") {
                endpoint.clone()
            } else {
                format!("https://{}", endpoint)
            };
            builder = builder.endpoint_url(endpoint);
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
            bucket: settings.bucket,
        })
    }
}

#[async_trait]
impl ObjectBackend for S3Backend {
    #[instrument(skip(self, token), fields(backend = "s3", has_token = token.is_some()))]
    async fn list_page(
        &self,
        prefix: &str,
        max_keys: usize,
        token: Option<&str>,
    ) -> StorageResult<BackendPage> {
        let mut request = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .max_keys(i32::try_from(max_keys).unwrap_or(i32::MAX));
        if !prefix.is_empty() {
            request = request.prefix(prefix);
        }
        if let Some(token) = token {
            request = request.continuation_token(token);
        }

        let output = request
            .send()
            .await
            .map_err(|err| classify_sdk_error("list", prefix, err))?;

        let objects = output
            .contents()
            .iter()
            .filter_map(|object| listed_metadata(prefix, object))
            .collect();

        let next_token = if output.is_truncated() == Some(true) {
            match output.next_continuation_token() {
                Some(token) => Some(token.to_string()),
                None => {
                    return Err(StorageError::unknown(
                        "list",
                        "truncated listing without a continuation token",
                    ));
                }
            }
        } else {
            None
        };

        Ok(BackendPage {
            objects,
            next_token,
        })
    }

    #[instrument(skip(self, body), fields(backend = "s3", size = body.len()))]
    async fn put_object(
        &self,
        key: &ObjectKey,
        body: Bytes,
        content_type: &str,
    ) -> StorageResult<()> {
        let digest = md5::compute(&body);
        let content_md5 = general_purpose::STANDARD.encode(digest.0);
        let content_length = i64::try_from(body.len()).unwrap_or(i64::MAX);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .content_type(content_type)
            .content_length(content_length)
            .content_md5(content_md5)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|err| classify_sdk_error("put", key.as_str(), err))?;
        Ok(())
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn delete_object(&self, key: &ObjectKey) -> StorageResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .send()
            .await
            .map_err(|err| classify_sdk_error("delete", key.as_str(), err))?;
        Ok(())
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn presign(
        &self,
        key: &ObjectKey,
        operation: SignedOperation,
        start: SystemTime,
        expires_in: Duration,
    ) -> StorageResult<String> {
        let config = PresigningConfig::builder()
            .start_time(start)
            .expires_in(expires_in)
            .build()
            .map_err(presigning_config_error)?;

        let request = match operation {
            SignedOperation::Get => self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(key.as_str())
                .presigned(config)
                .await
                .map_err(|err| classify_sdk_error("sign", key.as_str(), err))?,
            SignedOperation::Put => self
                .client
                .put_object()
                .bucket(&self.bucket)
                .key(key.as_str())
                .presigned(config)
                .await
                .map_err(|err| classify_sdk_error("sign", key.as_str(), err))?,
        };

        Ok(request.uri().to_string())
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn health_check(&self) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|err| classify_sdk_error("health check", &self.bucket, err))?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "s3"
    }
}

/// Convert one listed S3 object. Keys the gateway cannot address are
/// skipped so a single odd object does not break listing of its prefix.
fn listed_metadata(prefix: &str, object: &Object) -> Option<ObjectMetadata> {
    let Some(raw_key) = object.key() else {
        warn!(prefix, "listed object without a key, skipping");
        return None;
    };
    let key = match ObjectKey::parse(raw_key) {
        Ok(key) => key,
        Err(err) => {
            warn!(prefix, key = ?raw_key, error = %err, "listed object has an unusable key, skipping");
            return None;
        }
    };
    let size = object
        .size()
        .and_then(|size| u64::try_from(size).ok())
        .unwrap_or(0);
    let last_modified = object
        .last_modified()
        .and_then(|dt| DateTime::<Utc>::from_timestamp(dt.secs(), dt.subsec_nanos()))
        .unwrap_or_else(|| {
            warn!(key = %key, "object listed without a usable last-modified time");
            DateTime::<Utc>::UNIX_EPOCH
        });
    Some(ObjectMetadata {
        key,
        size,
        last_modified,
    })
}

fn presigning_config_error(err: PresigningConfigError) -> StorageError {
    StorageError::invalid_input(format!("invalid presigning window: {err}"))
}

/// Classify an SDK failure into the storage taxonomy.
///
/// `subject` is the key, prefix or bucket the call concerned.
fn classify_sdk_error<E>(operation: &'static str, subject: &str, err: SdkError<E>) -> StorageError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    match &err {
        SdkError::TimeoutError(_) => StorageError::Timeout { operation },
        SdkError::DispatchFailure(failure) if failure.is_timeout() => {
            StorageError::Timeout { operation }
        }
        SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            StorageError::transient(operation, DisplayErrorContext(&err))
        }
        SdkError::ServiceError(service_err) => {
            let status = service_err.raw().status().as_u16();
            let code = service_err.err().code();
            classify_service_error(operation, subject, status, code, &DisplayErrorContext(&err))
        }
        _ => StorageError::unknown(operation, DisplayErrorContext(&err)),
    }
}

/// Map an S3 error code and HTTP status to a [`StorageError`].
///
/// Only object-scoped calls can yield `NotFound`. A missing bucket is a
/// deployment fault and must never read as an absent object, since
/// deletes treat `NotFound` as success.
fn classify_service_error(
    operation: &'static str,
    subject: &str,
    status: u16,
    code: Option<&str>,
    detail: &dyn fmt::Display,
) -> StorageError {
    let detail = detail.to_string();
    let object_scoped = !matches!(operation, "list" | "health check");
    match code {
        Some("NoSuchBucket") => return StorageError::Unknown { operation, detail },
        Some("NoSuchKey" | "NotFound") if object_scoped => {
            return StorageError::not_found(subject);
        }
        Some("NoSuchKey" | "NotFound") => return StorageError::Unknown { operation, detail },
        Some(
            "AccessDenied"
            | "InvalidAccessKeyId"
            | "SignatureDoesNotMatch"
            | "ExpiredToken"
            | "InvalidToken"
            | "AllAccessDisabled"
            | "AccountProblem",
        ) => {
            return StorageError::PermissionDenied { operation, detail };
        }
        Some("SlowDown" | "Throttling" | "ThrottlingException" | "RequestLimitExceeded") => {
            return StorageError::Throttled { operation, detail };
        }
        Some("EntityTooLarge") => {
            return StorageError::PayloadTooLarge { size: 0, max: 0 };
        }
        Some("RequestTimeout") => return StorageError::Timeout { operation },
        Some(
            "InvalidArgument" | "KeyTooLongError" | "InvalidDigest" | "BadDigest"
            | "InvalidRequest",
        ) => {
            return StorageError::invalid_input(format!("backend rejected {operation}"));
        }
        _ => {}
    }

    match status {
        404 if object_scoped => StorageError::not_found(subject),
        401 | 403 => StorageError::PermissionDenied { operation, detail },
        413 => StorageError::PayloadTooLarge { size: 0, max: 0 },
        429 | 503 => StorageError::Throttled { operation, detail },
        408 => StorageError::Timeout { operation },
        500..=599 => StorageError::Transient { operation, detail },
        400 => StorageError::invalid_input(format!("backend rejected {operation}")),
        _ => StorageError::Unknown { operation, detail },
    }
}

/// Renders the full source chain of an SDK error for server-side logs.
struct DisplayErrorContext<'a, E>(&'a E);

impl<E: std::error::Error> fmt::Display for DisplayErrorContext<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)?;
        let mut source = self.0.source();
        while let Some(err) = source {
            write!(f, ": {}", err)?;
            source = err.source();
        }
        Ok(())
    }
}
