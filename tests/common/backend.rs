//! In-memory `ObjectBackend` with fault and latency injection.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use object_gateway::{
    models::{ObjectKey, ObjectMetadata, SignedOperation},
    services::{
        backend::{BackendPage, ObjectBackend},
        error::{StorageError, StorageResult},
    },
};
use std::{
    collections::{BTreeMap, HashMap, HashSet, VecDeque},
    ops::Bound,
    sync::Mutex,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    List,
    Put,
    Delete,
    Presign,
    Health,
}

#[derive(Clone, Debug)]
pub struct StoredObject {
    pub body: Bytes,
    pub content_type: String,
    pub last_modified: DateTime<Utc>,
}

/// A presign request as the backend received it.
#[derive(Clone, Debug)]
pub struct PresignRecord {
    pub key: String,
    pub operation: SignedOperation,
    pub start: SystemTime,
    pub expires_in: Duration,
}

#[derive(Default)]
pub struct MemoryBackend {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    queued_failures: Mutex<HashMap<Op, VecDeque<StorageError>>>,
    unsignable_keys: Mutex<HashSet<String>>,
    latency: Mutex<Option<(Op, Duration)>>,
    calls: Mutex<HashMap<Op, usize>>,
    presigns: Mutex<Vec<PresignRecord>>,
    requested_max_keys: Mutex<Vec<usize>>,
    extra_entries_per_page: Mutex<usize>,
    unhealthy: Mutex<bool>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `key` directly, bypassing the gateway.
    pub fn insert(&self, key: &str, body: &[u8]) {
        let seq = self.objects.lock().unwrap().len() as i64;
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                body: Bytes::copy_from_slice(body),
                content_type: "application/octet-stream".into(),
                last_modified: Utc.timestamp_opt(1_700_000_000 + seq, 0).unwrap(),
            },
        );
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    /// Fail the next call of `op` with `err`. Queued failures are consumed
    /// in order.
    pub fn fail_next(&self, op: Op, err: StorageError) {
        self.queued_failures
            .lock()
            .unwrap()
            .entry(op)
            .or_default()
            .push_back(err);
    }

    /// Make presigning `key` fail on every attempt.
    pub fn refuse_to_sign(&self, key: &str) {
        self.unsignable_keys.lock().unwrap().insert(key.to_string());
    }

    /// Delay every call of `op` by `delay`.
    pub fn set_latency(&self, op: Op, delay: Duration) {
        *self.latency.lock().unwrap() = Some((op, delay));
    }

    /// Return `extra` more entries per list page than were asked for.
    pub fn overfill_pages(&self, extra: usize) {
        *self.extra_entries_per_page.lock().unwrap() = extra;
    }

    pub fn set_unhealthy(&self, unhealthy: bool) {
        *self.unhealthy.lock().unwrap() = unhealthy;
    }

    pub fn calls(&self, op: Op) -> usize {
        self.calls.lock().unwrap().get(&op).copied().unwrap_or(0)
    }

    pub fn presigns(&self) -> Vec<PresignRecord> {
        self.presigns.lock().unwrap().clone()
    }

    pub fn requested_max_keys(&self) -> Vec<usize> {
        self.requested_max_keys.lock().unwrap().clone()
    }

    /// Dereference a URL produced by `presign`, the way a client would.
    pub fn fetch(&self, url: &str) -> Option<StoredObject> {
        let rest = url.strip_prefix("memory://bucket/")?;
        let (key, _query) = rest.rsplit_once('?')?;
        self.object(key)
    }

    async fn enter(&self, op: Op) -> StorageResult<()> {
        *self.calls.lock().unwrap().entry(op).or_default() += 1;

        let delay = match *self.latency.lock().unwrap() {
            Some((slow_op, delay)) if slow_op == op => Some(delay),
            _ => None,
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let queued = self
            .queued_failures
            .lock()
            .unwrap()
            .get_mut(&op)
            .and_then(VecDeque::pop_front);
        match queued {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ObjectBackend for MemoryBackend {
    async fn list_page(
        &self,
        prefix: &str,
        max_keys: usize,
        token: Option<&str>,
    ) -> StorageResult<BackendPage> {
        self.enter(Op::List).await?;
        self.requested_max_keys.lock().unwrap().push(max_keys);

        let take = max_keys + *self.extra_entries_per_page.lock().unwrap();
        let objects = self.objects.lock().unwrap();
        let lower = match token {
            Some(after) => Bound::Excluded(after.to_string()),
            None => Bound::Included(prefix.to_string()),
        };
        let mut matching = objects
            .range((lower, Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, stored)| ObjectMetadata {
                key: ObjectKey::parse(key.clone()).unwrap(),
                size: stored.body.len() as u64,
                last_modified: stored.last_modified,
            });

        let page: Vec<ObjectMetadata> = matching.by_ref().take(take).collect();
        let next_token = match matching.next() {
            Some(_) => page.last().map(|meta| meta.key.to_string()),
            None => None,
        };

        Ok(BackendPage {
            objects: page,
            next_token,
        })
    }

    async fn put_object(
        &self,
        key: &ObjectKey,
        body: Bytes,
        content_type: &str,
    ) -> StorageResult<()> {
        self.enter(Op::Put).await?;
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: content_type.to_string(),
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn delete_object(&self, key: &ObjectKey) -> StorageResult<()> {
        self.enter(Op::Delete).await?;
        self.objects.lock().unwrap().remove(key.as_str());
        Ok(())
    }

    async fn presign(
        &self,
        key: &ObjectKey,
        operation: SignedOperation,
        start: SystemTime,
        expires_in: Duration,
    ) -> StorageResult<String> {
        self.enter(Op::Presign).await?;
        if self.unsignable_keys.lock().unwrap().contains(key.as_str()) {
            return Err(StorageError::transient("presign", "signer unavailable"));
        }

        self.presigns.lock().unwrap().push(PresignRecord {
            key: key.to_string(),
            operation,
            start,
            expires_in,
        });
        let start_secs = start
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Ok(format!(
            "memory://bucket/{}?op={}&start={}&expires={}",
            key,
            operation,
            start_secs,
            expires_in.as_secs()
        ))
    }

    async fn health_check(&self) -> StorageResult<()> {
        self.enter(Op::Health).await?;
        if *self.unhealthy.lock().unwrap() {
            return Err(StorageError::transient("health check", "bucket unreachable"));
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
