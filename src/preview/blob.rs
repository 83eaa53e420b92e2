//! Locally resolvable object URLs for decoded preview payloads.

use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::debug;
use uuid::Uuid;

const URL_PREFIX: &str = "blob:tarpeek/";

type Blobs = Mutex<HashMap<String, Blob>>;

/// Bytes registered under an object URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub bytes: Bytes,
    pub mime: String,
}

/// Registry of live object URLs.
///
/// Cloning shares the registry. An entry lives exactly as long as some
/// [`ObjectUrl`] clone for it does.
#[derive(Clone, Default)]
pub struct BlobRegistry {
    blobs: Arc<Blobs>,
}

impl BlobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, bytes: Bytes, mime: &str) -> ObjectUrl {
        let url = format!("{URL_PREFIX}{}", Uuid::new_v4());
        self.blobs.lock().insert(
            url.clone(),
            Blob {
                bytes,
                mime: mime.to_string(),
            },
        );
        debug!(url = %url, mime, "created object url");

        ObjectUrl(Arc::new(Handle {
            url,
            registry: Arc::downgrade(&self.blobs),
        }))
    }

    pub fn resolve(&self, url: &str) -> Option<Blob> {
        self.blobs.lock().get(url).cloned()
    }

    /// Number of live object URLs.
    pub fn len(&self) -> usize {
        self.blobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct Handle {
    url: String,
    registry: Weak<Blobs>,
}

impl Drop for Handle {
    fn drop(&mut self) {
        if let Some(blobs) = self.registry.upgrade() {
            blobs.lock().remove(&self.url);
            debug!(url = %self.url, "revoked object url");
        }
    }
}

/// Shared handle to a registered blob; revoked when the last clone drops.
#[derive(Clone)]
pub struct ObjectUrl(Arc<Handle>);

impl ObjectUrl {
    pub fn as_str(&self) -> &str {
        &self.0.url
    }
}

impl PartialEq for ObjectUrl {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for ObjectUrl {}

impl fmt::Debug for ObjectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ObjectUrl").field(&self.as_str()).finish()
    }
}

impl fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
