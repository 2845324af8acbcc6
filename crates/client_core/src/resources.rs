//! Memory-backed display handles.
//!
//! [`HandleRegistry`] is the table of live `blob:` references and the bytes
//! behind them. Anyone holding the registry may resolve a handle, but only a
//! [`ResourceManager`] can create or release one. The manager owns two slots,
//! preview and result, and each slot holds at most one live handle.

use std::{
    collections::HashMap,
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use bytes::Bytes;
use tracing::{debug, warn};
use uuid::Uuid;

const OBJECT_URL_SCHEME: &str = "blob:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub bytes: Bytes,
    pub mime_type: Option<String>,
}

impl Blob {
    pub fn new(bytes: impl Into<Bytes>, mime_type: Option<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectUrl(String);

impl ObjectUrl {
    fn generate() -> Self {
        Self(format!("{OBJECT_URL_SCHEME}{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegistryStats {
    pub created: u64,
    pub revoked: u64,
    pub live: usize,
}

#[derive(Default)]
pub struct HandleRegistry {
    entries: Mutex<HashMap<ObjectUrl, Blob>>,
    created: AtomicU64,
    revoked: AtomicU64,
}

impl HandleRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<ObjectUrl, Blob>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn create(&self, blob: Blob) -> ObjectUrl {
        let url = ObjectUrl::generate();
        self.entries().insert(url.clone(), blob);
        self.created.fetch_add(1, Ordering::Relaxed);
        url
    }

    /// Returns `false` when the handle was not live.
    pub(crate) fn revoke(&self, url: &ObjectUrl) -> bool {
        let removed = self.entries().remove(url).is_some();
        if removed {
            self.revoked.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    /// Bytes behind a live handle; `None` once it has been released.
    pub fn resolve(&self, url: &ObjectUrl) -> Option<Blob> {
        self.entries().get(url).cloned()
    }

    pub fn is_live(&self, url: &ObjectUrl) -> bool {
        self.entries().contains_key(url)
    }

    pub fn live_count(&self) -> usize {
        self.entries().len()
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            created: self.created.load(Ordering::Relaxed),
            revoked: self.revoked.load(Ordering::Relaxed),
            live: self.live_count(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Preview,
    Result,
}

impl SlotKind {
    fn as_str(self) -> &'static str {
        match self {
            SlotKind::Preview => "preview",
            SlotKind::Result => "result",
        }
    }
}

struct HandleSlot {
    kind: SlotKind,
    current: Option<ObjectUrl>,
}

impl HandleSlot {
    fn new(kind: SlotKind) -> Self {
        Self {
            kind,
            current: None,
        }
    }

    fn set(&mut self, registry: &HandleRegistry, blob: Blob) -> ObjectUrl {
        self.clear(registry);
        let url = registry.create(blob);
        debug!(slot = self.kind.as_str(), handle = %url, "created object url");
        self.current = Some(url.clone());
        url
    }

    fn clear(&mut self, registry: &HandleRegistry) {
        let Some(url) = self.current.take() else {
            return;
        };
        if registry.revoke(&url) {
            debug!(slot = self.kind.as_str(), handle = %url, "released object url");
        } else {
            warn!(
                slot = self.kind.as_str(),
                handle = %url,
                "object url was already released outside its owning slot"
            );
        }
    }
}

/// Exclusive owner of the preview and result handles.
///
/// Dropping the manager releases both slots.
pub struct ResourceManager {
    registry: Arc<HandleRegistry>,
    preview: HandleSlot,
    result: HandleSlot,
}

impl ResourceManager {
    pub fn new(registry: Arc<HandleRegistry>) -> Self {
        Self {
            registry,
            preview: HandleSlot::new(SlotKind::Preview),
            result: HandleSlot::new(SlotKind::Result),
        }
    }

    pub fn registry(&self) -> &Arc<HandleRegistry> {
        &self.registry
    }

    pub fn set(&mut self, kind: SlotKind, blob: Blob) -> ObjectUrl {
        let registry = Arc::clone(&self.registry);
        self.slot_mut(kind).set(&registry, blob)
    }

    pub fn clear(&mut self, kind: SlotKind) {
        let registry = Arc::clone(&self.registry);
        self.slot_mut(kind).clear(&registry);
    }

    pub fn clear_all(&mut self) {
        self.clear(SlotKind::Preview);
        self.clear(SlotKind::Result);
    }

    pub fn current(&self, kind: SlotKind) -> Option<&ObjectUrl> {
        match kind {
            SlotKind::Preview => self.preview.current.as_ref(),
            SlotKind::Result => self.result.current.as_ref(),
        }
    }

    fn slot_mut(&mut self, kind: SlotKind) -> &mut HandleSlot {
        match kind {
            SlotKind::Preview => &mut self.preview,
            SlotKind::Result => &mut self.result,
        }
    }
}

impl Drop for ResourceManager {
    fn drop(&mut self) {
        self.clear_all();
    }
}

#[cfg(test)]
#[path = "tests/resources_tests.rs"]
mod tests;
