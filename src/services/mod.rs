//! Object-store access layer behind the HTTP gateway.
//!
//! Components, leaf to root: content types, signed URLs, listing and
//! single-object access. All of them talk to the store through the
//! [`backend::ObjectBackend`] trait and through [`call_policy::CallPolicy`].

pub mod backend;
pub mod call_policy;
pub mod content_type;
pub mod continuation;
pub mod error;
pub mod object_accessor;
pub mod object_lister;
pub mod s3_backend;
pub mod storage_service;
pub mod url_signer;

pub use backend::{BackendPage, ObjectBackend};
pub use call_policy::{CallPolicy, RetryPolicy};
pub use error::{ErrorKind, StorageError, StorageResult};
pub use object_accessor::ObjectAccessor;
pub use object_lister::ObjectLister;
pub use s3_backend::{S3Backend, S3Settings};
pub use storage_service::{ServiceSettings, StorageService};
pub use url_signer::SignedUrlIssuer;
