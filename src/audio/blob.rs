//! Playable `blob:` handles for finalized recordings.
//!
//! [`BlobRegistry`] plays the role of an object-URL table: the recorder
//! registers the encoded bytes of a finished recording and receives a
//! [`BlobUrl`] that a [`PlaybackController`](crate::player::PlaybackController)
//! can bind to.  Revoking a URL frees the bytes; revoking twice (or revoking
//! an unknown URL) is a no-op.
//!
//! The registry is cheap to clone; clones share one table.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use uuid::Uuid;

/// URL scheme prefix of every registered blob.
pub const BLOB_SCHEME: &str = "blob:";

/// A dereferenceable handle produced by [`BlobRegistry::register`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobUrl(String);

impl BlobUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A registered blob: immutable bytes plus their media type.
#[derive(Debug, Clone)]
pub struct BlobEntry {
    pub bytes: Arc<[u8]>,
    pub media_type: String,
}

/// Shared table of live blob URLs.
#[derive(Debug, Clone, Default)]
pub struct BlobRegistry {
    entries: Arc<Mutex<HashMap<String, BlobEntry>>>,
}

impl BlobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `bytes` and return a fresh URL for them.
    pub fn register(&self, bytes: Arc<[u8]>, media_type: &str) -> BlobUrl {
        let url = format!("{BLOB_SCHEME}speak-practice/{}", Uuid::new_v4());
        self.lock().insert(
            url.clone(),
            BlobEntry {
                bytes,
                media_type: media_type.to_string(),
            },
        );
        log::debug!("blob: registered {url}");
        BlobUrl(url)
    }

    /// Look up a live URL.  Accepts any string so players can resolve
    /// whatever URL they were bound to.
    pub fn resolve(&self, url: &str) -> Option<BlobEntry> {
        self.lock().get(url).cloned()
    }

    /// Release the bytes behind `url`.  Returns `true` only for the call
    /// that actually removed the entry.
    pub fn revoke(&self, url: &BlobUrl) -> bool {
        let removed = self.lock().remove(url.as_str()).is_some();
        if removed {
            log::debug!("blob: revoked {url}");
        }
        removed
    }

    /// Number of URLs currently alive.
    pub fn live_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, BlobEntry>> {
        // The table holds plain data; a panic elsewhere cannot leave it
        // half-updated, so a poisoned lock is still usable.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Returns `true` when `url` uses the blob scheme.
pub fn is_blob_url(url: &str) -> bool {
    url.starts_with(BLOB_SCHEME)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes(data: &[u8]) -> Arc<[u8]> {
        Arc::from(data)
    }

    #[test]
    fn register_then_resolve() {
        let registry = BlobRegistry::new();
        let url = registry.register(bytes(b"RIFF"), "audio/wav");

        assert!(is_blob_url(url.as_str()));
        let entry = registry.resolve(url.as_str()).expect("live url");
        assert_eq!(&*entry.bytes, b"RIFF");
        assert_eq!(entry.media_type, "audio/wav");
    }

    #[test]
    fn urls_are_unique() {
        let registry = BlobRegistry::new();
        let a = registry.register(bytes(b"a"), "audio/wav");
        let b = registry.register(bytes(b"a"), "audio/wav");
        assert_ne!(a, b);
        assert_eq!(registry.live_count(), 2);
    }

    #[test]
    fn revoke_is_idempotent() {
        let registry = BlobRegistry::new();
        let url = registry.register(bytes(b"x"), "audio/wav");

        assert!(registry.revoke(&url));
        assert!(!registry.revoke(&url));
        assert!(registry.resolve(url.as_str()).is_none());
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn clones_share_the_table() {
        let registry = BlobRegistry::new();
        let clone = registry.clone();
        let url = registry.register(bytes(b"x"), "audio/wav");
        assert!(clone.resolve(url.as_str()).is_some());
    }

    #[test]
    fn non_blob_urls_are_recognised() {
        assert!(!is_blob_url("/audio/lesson-001.mp3"));
    }
}
