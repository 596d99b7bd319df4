//! One page of a prefix listing, each entry paired with a signed URL.

use super::object::{ObjectMetadata, SignedUrl};

/// An object in a listing together with its freshly issued signed URL.
#[derive(Clone, Debug)]
pub struct ListingEntry {
    pub metadata: ObjectMetadata,
    pub signed_url: SignedUrl,
}

/// A page of objects under `prefix`, in backend order.
#[derive(Clone, Debug)]
pub struct ListingPage {
    pub prefix: String,

    /// Entries exactly as the backend ordered them; never re-sorted.
    pub entries: Vec<ListingEntry>,

    /// True when the backend has more keys past this page.
    pub truncated: bool,

    /// Opaque token for the next page; present iff `truncated`.
    pub next_continuation_token: Option<String>,
}
