//! HTTP handlers for the file endpoints under `/api/v1/s3`.
//! Handlers only validate input shape and translate results; storage
//! concerns live in `StorageService`.

use crate::{
    errors::AppError,
    models::{ListingPage, ObjectKey, SignedUrl, UploadRequest},
    services::{
        content_type::FALLBACK_CONTENT_TYPE, error::StorageError, storage_service::StorageService,
    },
};
use axum::{
    Json,
    extract::{
        Multipart, Query, State,
        multipart::{MultipartError, MultipartRejection},
        rejection::QueryRejection,
    },
    http::StatusCode,
};
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};
use uuid::Uuid;

/// Query params accepted by `GET /fileList`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileListQuery {
    pub prefix: Option<String>,
    pub max_keys: Option<usize>,
    pub continuation_token: Option<String>,
    pub expires_in: Option<i64>,
}

/// Query params accepted by `GET /file` and `DELETE /del`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileQuery {
    pub filename: Option<String>,
    pub expires_in: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileListResponse {
    pub success: bool,
    pub signed_url: Vec<FileEntry>,
    pub truncated: bool,
    pub next_continuation_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub key: String,
    pub size: u64,
    pub last_modified: String,
    /// Signed download URL for this object.
    pub files: String,
    pub expires_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResponse {
    pub success: bool,
    /// Signed download URL.
    pub objects: String,
    pub expires_at: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub filename: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

/// `GET /api/v1/s3/fileList`: one page of objects under `prefix`, each with
/// a signed download URL.
#[instrument(skip_all, fields(request_id = %Uuid::new_v4()))]
pub async fn list_files(
    State(service): State<StorageService>,
    query: Result<Query<FileListQuery>, QueryRejection>,
) -> Result<Json<FileListResponse>, AppError> {
    const FAILURE: &str = "failed to list files";
    let Query(q) = query.map_err(|rejection| query_error(FAILURE, rejection))?;
    let prefix = q.prefix.unwrap_or_default();

    let page = service
        .lister
        .list(
            &prefix,
            q.max_keys,
            q.continuation_token.as_deref(),
            q.expires_in,
        )
        .await
        .map_err(|err| AppError::from_storage("list", &prefix, FAILURE, err))?;

    Ok(Json(file_list_response(page)))
}

/// `GET /api/v1/s3/file?filename=`: signed download URL for one object.
///
/// The key's existence is not checked; a missing object surfaces when the
/// client follows the URL.
#[instrument(skip_all, fields(request_id = %Uuid::new_v4()))]
pub async fn get_file(
    State(service): State<StorageService>,
    query: Result<Query<FileQuery>, QueryRejection>,
) -> Result<Json<FileResponse>, AppError> {
    const FAILURE: &str = "failed to get file";
    let Query(q) = query.map_err(|rejection| query_error(FAILURE, rejection))?;
    let key = required_key(q.filename, "get", FAILURE)?;

    let SignedUrl { url, expires_at } = service
        .accessor
        .get(&key, q.expires_in)
        .await
        .map_err(|err| AppError::from_storage("get", key.as_str(), FAILURE, err))?;

    Ok(Json(FileResponse {
        success: true,
        objects: url,
        expires_at: format_timestamp(&expires_at),
    }))
}

/// `POST /api/v1/s3/upload`: store the multipart field `file` under its
/// file name (or under the optional text field `key`).
#[instrument(skip_all, fields(request_id = %Uuid::new_v4()))]
pub async fn upload_file(
    State(service): State<StorageService>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    const FAILURE: &str = "failed to upload file";
    let mut multipart = multipart.map_err(|rejection| {
        warn!(error = %rejection, "upload without a multipart body");
        AppError::invalid_input(format!("{FAILURE}: expected a multipart/form-data body"))
    })?;

    let mut file: Option<(String, Option<String>, Bytes)> = None;
    let mut key_override: Option<String> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| multipart_error(FAILURE, err))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                if file.is_some() {
                    warn!("upload with more than one `file` field");
                    return Err(AppError::invalid_input(format!(
                        "{FAILURE}: exactly one file per upload"
                    )));
                }
                let file_name = field.file_name().map(str::to_string).unwrap_or_default();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| multipart_error(FAILURE, err))?;
                file = Some((file_name, content_type, bytes));
            }
            Some("key") => {
                let text = field
                    .text()
                    .await
                    .map_err(|err| multipart_error(FAILURE, err))?;
                key_override = Some(text);
            }
            _ => {}
        }
    }

    let Some((file_name, content_type, bytes)) = file else {
        warn!("upload without a `file` field");
        return Err(AppError::invalid_input(format!("{FAILURE}: no file uploaded")));
    };

    let raw_key = key_override
        .filter(|key| !key.is_empty())
        .unwrap_or(file_name);
    let key = ObjectKey::parse(raw_key.clone())
        .map_err(|err| AppError::from_storage("put", &raw_key, FAILURE, err))?;
    // Browsers send octet-stream for anything they cannot name; resolve those.
    let content_type = content_type.filter(|ct| ct != FALLBACK_CONTENT_TYPE);
    let request = UploadRequest::new(key, bytes, content_type);

    let key = service
        .accessor
        .put(request)
        .await
        .map_err(|err| AppError::from_storage("put", &raw_key, FAILURE, err))?;

    Ok(Json(UploadResponse {
        success: true,
        message: "file uploaded".into(),
        filename: key.to_string(),
    }))
}

/// `DELETE /api/v1/s3/del?filename=`: idempotent delete.
#[instrument(skip_all, fields(request_id = %Uuid::new_v4()))]
pub async fn delete_file(
    State(service): State<StorageService>,
    query: Result<Query<FileQuery>, QueryRejection>,
) -> Result<Json<DeleteResponse>, AppError> {
    const FAILURE: &str = "failed to delete file";
    let Query(q) = query.map_err(|rejection| query_error(FAILURE, rejection))?;
    let key = required_key(q.filename, "delete", FAILURE)?;

    service
        .accessor
        .delete(&key)
        .await
        .map_err(|err| AppError::from_storage("delete", key.as_str(), FAILURE, err))?;

    Ok(Json(DeleteResponse {
        success: true,
        message: "file deleted".into(),
    }))
}

fn file_list_response(page: ListingPage) -> FileListResponse {
    let signed_url = page
        .entries
        .into_iter()
        .map(|entry| FileEntry {
            key: entry.metadata.key.to_string(),
            size: entry.metadata.size,
            last_modified: format_timestamp(&entry.metadata.last_modified),
            files: entry.signed_url.url,
            expires_at: format_timestamp(&entry.signed_url.expires_at),
        })
        .collect();

    FileListResponse {
        success: true,
        signed_url,
        truncated: page.truncated,
        next_continuation_token: page.next_continuation_token,
    }
}

fn required_key(
    raw: Option<String>,
    operation: &'static str,
    failure: &str,
) -> Result<ObjectKey, AppError> {
    let raw = match raw {
        Some(raw) if !raw.is_empty() => raw,
        _ => {
            warn!(operation, "request without a filename");
            return Err(AppError::invalid_input(format!(
                "{failure}: filename is required"
            )));
        }
    };
    ObjectKey::parse(raw.clone())
        .map_err(|err| AppError::from_storage(operation, &raw, failure, err))
}

fn query_error(failure: &str, rejection: QueryRejection) -> AppError {
    warn!(error = %rejection, "malformed query string");
    AppError::invalid_input(format!("{failure}: malformed query string"))
}

fn multipart_error(failure: &str, err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        warn!(error = %err, "multipart body over the size limit");
        return AppError::from_storage(
            "put",
            "-",
            failure,
            StorageError::PayloadTooLarge { size: 0, max: 0 },
        );
    }
    warn!(error = %err, "malformed multipart body");
    AppError::invalid_input(format!("{failure}: malformed multipart body"))
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}
