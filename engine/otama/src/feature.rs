//! Engine-owned feature handles that travel through the bridge undecomposed.

use std::fmt::{self, Debug, Formatter};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::debug;

/// Pointer-sized token naming a foreign resource owned by the engine.
///
/// The bridge never looks behind it: it is copied into `Opaque` variants
/// and handed back to the engine verbatim.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OpaqueHandle(NonZeroUsize);

impl OpaqueHandle {
    pub fn new(raw: usize) -> Option<Self> {
        NonZeroUsize::new(raw).map(Self)
    }

    pub fn get(self) -> usize {
        self.0.get()
    }
}

/// Capability to free a feature handle. Implemented by every engine.
pub trait ReleaseFeature: Send + Sync {
    fn release_feature(&self, handle: OpaqueHandle);
}

struct FeatureInner {
    // 0 once disposed.
    handle: AtomicUsize,
    releaser: Arc<dyn ReleaseFeature>,
}

impl FeatureInner {
    fn dispose(&self) -> bool {
        let raw = self.handle.swap(0, Ordering::AcqRel);
        match OpaqueHandle::new(raw) {
            Some(handle) => {
                debug!(handle = raw, "releasing feature handle");
                self.releaser.release_feature(handle);
                true
            }
            None => false,
        }
    }
}

impl Drop for FeatureInner {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// A wrapped feature handle returned by a feature-extraction call.
///
/// Clones share the same handle; the handle is released exactly once, either
/// by the first [`FeatureRaw::dispose`] on any clone or when the last clone
/// is dropped.
#[derive(Clone)]
pub struct FeatureRaw {
    inner: Arc<FeatureInner>,
}

impl FeatureRaw {
    pub fn wrap(handle: OpaqueHandle, releaser: Arc<dyn ReleaseFeature>) -> Self {
        Self {
            inner: Arc::new(FeatureInner {
                handle: AtomicUsize::new(handle.get()),
                releaser,
            }),
        }
    }

    /// The live handle, or `None` after disposal.
    pub fn handle(&self) -> Option<OpaqueHandle> {
        OpaqueHandle::new(self.inner.handle.load(Ordering::Acquire))
    }

    pub fn is_disposed(&self) -> bool {
        self.handle().is_none()
    }

    /// Release the underlying handle. Returns `false` if it was already released.
    pub fn dispose(&self) -> bool {
        self.inner.dispose()
    }
}

impl PartialEq for FeatureRaw {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Debug for FeatureRaw {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.handle() {
            Some(handle) => write!(f, "FeatureRaw({:#x})", handle.get()),
            None => f.write_str("FeatureRaw(disposed)"),
        }
    }
}
