//! Request-scoped value types for the object gateway.
//!
//! Nothing here is persisted or shared between requests; the backing
//! object store owns all object bytes and metadata.

pub mod listing;
pub mod object;

pub use listing::{ListingEntry, ListingPage};
pub use object::{ObjectKey, ObjectMetadata, SignedOperation, SignedUrl, UploadRequest};
