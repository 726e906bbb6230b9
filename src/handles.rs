//! Releasable handles for binary image resources
//!
//! A [`BlobHandle`] is an ephemeral reference (`blob:` URL) to bytes held by a
//! [`BlobStore`]. Handles are not reference counted: the owner releases them
//! explicitly, and the store refuses to release a handle twice. The
//! [`InMemoryBlobStore`] keeps creation/release counters so a session can
//! check that nothing leaked.

use crate::error::{Result, WorkflowError};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};
use uuid::Uuid;

/// URL scheme used for handle references
const BLOB_URL_PREFIX: &str = "blob:bgremove/";

/// Revocable reference to a binary resource held by a [`BlobStore`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct BlobHandle {
    id: Uuid,
    url: String,
    media_type: String,
    size_bytes: usize,
}

impl BlobHandle {
    fn new(media_type: &str, size_bytes: usize) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            url: format!("{BLOB_URL_PREFIX}{id}"),
            media_type: media_type.to_string(),
            size_bytes,
        }
    }

    /// Unique identifier of the resource
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Renderable reference, valid until the handle is released
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }
}

impl fmt::Display for BlobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// Counters describing handle usage over a store's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BlobStoreStats {
    /// Handles created
    pub created: u64,
    /// Handles released
    pub released: u64,
    /// Release attempts on unknown or already released handles
    pub rejected_releases: u64,
    /// Handles currently live
    pub live: usize,
    /// Bytes held by live handles
    pub live_bytes: usize,
}

impl BlobStoreStats {
    /// Every created handle has been released exactly once
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.created == self.released && self.live == 0 && self.rejected_releases == 0
    }
}

/// Store that hands out releasable handles for binary data
pub trait BlobStore: Send + Sync {
    /// Store `bytes` and return a new live handle
    fn create(&self, bytes: Vec<u8>, media_type: &str) -> BlobHandle;

    /// Read the bytes behind a live handle
    fn read(&self, handle: &BlobHandle) -> Option<Arc<[u8]>>;

    /// Release a live handle
    ///
    /// # Errors
    /// Returns `WorkflowError::Resource` when the handle is unknown or was
    /// already released.
    fn release(&self, handle: &BlobHandle) -> Result<()>;

    /// Current usage counters
    fn stats(&self) -> BlobStoreStats;
}

#[derive(Default)]
struct StoreState {
    entries: HashMap<Uuid, Arc<[u8]>>,
    stats: BlobStoreStats,
}

/// Process-local blob store
#[derive(Default)]
pub struct InMemoryBlobStore {
    state: Mutex<StoreState>,
}

impl InMemoryBlobStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut StoreState) -> T) -> T {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }
}

impl BlobStore for InMemoryBlobStore {
    fn create(&self, bytes: Vec<u8>, media_type: &str) -> BlobHandle {
        let handle = BlobHandle::new(media_type, bytes.len());
        self.with_state(|state| {
            state.stats.created += 1;
            state.stats.live += 1;
            state.stats.live_bytes += bytes.len();
            state.entries.insert(handle.id, Arc::from(bytes));
        });
        debug!(url = %handle.url, size_bytes = handle.size_bytes, "Created blob handle");
        handle
    }

    fn read(&self, handle: &BlobHandle) -> Option<Arc<[u8]>> {
        self.with_state(|state| state.entries.get(&handle.id).cloned())
    }

    fn release(&self, handle: &BlobHandle) -> Result<()> {
        self.with_state(|state| match state.entries.remove(&handle.id) {
            Some(bytes) => {
                state.stats.released += 1;
                state.stats.live -= 1;
                state.stats.live_bytes -= bytes.len();
                debug!(url = %handle.url, "Released blob handle");
                Ok(())
            },
            None => {
                state.stats.rejected_releases += 1;
                warn!(url = %handle.url, "Release of unknown or already released blob handle");
                Err(WorkflowError::resource(format!(
                    "blob handle {} is not live",
                    handle.url
                )))
            },
        })
    }

    fn stats(&self) -> BlobStoreStats {
        self.with_state(|state| state.stats)
    }
}
