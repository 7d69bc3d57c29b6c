//! GPU upload cache: remembers which decoded images already have a texture.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::{EvictReason, EvictionHandler, RecencyCache};
use crate::config::CacheConfig;

/// Identity key for a shared image.
///
/// Two keys are equal only if they point at the same allocation; images with
/// identical pixels but different allocations are different keys. Holding the
/// key keeps the image alive, so an address can never be recycled while cached.
pub struct ImageKey<T: ?Sized>(Arc<T>);

impl<T: ?Sized> ImageKey<T> {
    pub fn new(image: &Arc<T>) -> Self {
        Self(Arc::clone(image))
    }

    pub fn image(&self) -> &Arc<T> {
        &self.0
    }
}

impl<T: ?Sized> Clone for ImageKey<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T: ?Sized> PartialEq for ImageKey<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T: ?Sized> Eq for ImageKey<T> {}

impl<T: ?Sized> Hash for ImageKey<T> {
    fn hash<S: Hasher>(&self, state: &mut S) {
        Arc::as_ptr(&self.0).cast::<()>().hash(state)
    }
}

impl<T: ?Sized> fmt::Debug for ImageKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageKey({:p})", Arc::as_ptr(&self.0).cast::<()>())
    }
}

/// Destroys GPU resources that the upload cache no longer references.
pub trait TextureReleaser<H> {
    fn release(&mut self, handle: H);
}

impl<H, F> TextureReleaser<H> for F
where
    F: FnMut(H),
{
    fn release(&mut self, handle: H) {
        self(handle)
    }
}

/// Hit/miss/eviction counters of an [`UploadCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Entries dropped because the cache was full.
    pub evictions: u64,
    /// Handles passed to the releaser for any reason.
    pub releases: u64,
}

impl CacheStats {
    /// Fraction of lookups that were hits, 0 when nothing was looked up.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct ReleaseOnEvict<R> {
    releaser: R,
    evictions: u64,
    releases: u64,
}

impl<T: ?Sized, H, R> EvictionHandler<ImageKey<T>, H> for ReleaseOnEvict<R>
where
    R: TextureReleaser<H>,
{
    fn evicted(&mut self, key: ImageKey<T>, handle: H, reason: EvictReason) {
        trace!(?key, ?reason, "releasing texture");
        if reason == EvictReason::Capacity {
            self.evictions += 1;
        }
        self.releases += 1;
        self.releaser.release(handle);
    }
}

/// Recency cache from image identity to uploaded texture handle.
///
/// On a miss the caller uploads and inserts; on a hit the upload is skipped.
/// Every handle that leaves the cache (capacity eviction, replacement,
/// removal, clear) is passed to the releaser exactly once. Handles still
/// cached when the `UploadCache` is dropped are not released; call
/// [`clear`](Self::clear) first if the GPU side needs them back.
pub struct UploadCache<T: ?Sized, H, R> {
    cache: RecencyCache<ImageKey<T>, H, ReleaseOnEvict<R>>,
    hits: u64,
    misses: u64,
}

impl<T: ?Sized, H, R> UploadCache<T, H, R>
where
    R: TextureReleaser<H>,
{
    pub fn new(max_entries: usize, releaser: R) -> Self {
        Self {
            cache: RecencyCache::with_handler(
                max_entries,
                ReleaseOnEvict {
                    releaser,
                    evictions: 0,
                    releases: 0,
                },
            ),
            hits: 0,
            misses: 0,
        }
    }

    /// Cache limited by the entry count derived from `cfg`.
    pub fn from_config(cfg: &CacheConfig, releaser: R) -> Self {
        Self::new(cfg.entry_limit(), releaser)
    }

    /// Cached handle for `image`, promoting it to most recently used.
    pub fn get(&mut self, image: &Arc<T>) -> Option<&H> {
        let key = ImageKey::new(image);
        match self.cache.get(&key) {
            Some(handle) => {
                self.hits += 1;
                Some(handle)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Record the handle uploaded for `image`.
    pub fn insert(&mut self, image: &Arc<T>, handle: H) {
        self.cache.add(ImageKey::new(image), handle);
    }

    /// Return the cached handle, or upload `image` and cache the result.
    ///
    /// An upload error is returned unchanged and leaves the cache as it was.
    pub fn get_or_upload<E>(
        &mut self,
        image: &Arc<T>,
        upload: impl FnOnce(&T) -> Result<H, E>,
    ) -> Result<H, E>
    where
        H: Clone,
    {
        if let Some(handle) = self.get(image).cloned() {
            return Ok(handle);
        }
        let handle = upload(image.as_ref())?;
        self.cache.add(ImageKey::new(image), handle.clone());
        Ok(handle)
    }

    pub fn contains(&self, image: &Arc<T>) -> bool {
        self.cache.contains(&ImageKey::new(image))
    }

    /// Drop the entry for `image` and release its handle.
    pub fn remove(&mut self, image: &Arc<T>) -> bool {
        self.cache.remove(&ImageKey::new(image))
    }

    /// Release every cached handle.
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    pub fn set_max(&mut self, max_entries: usize) {
        self.cache.set_max(max_entries);
    }

    pub fn max(&self) -> usize {
        self.cache.max()
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn percentage(&self) -> f32 {
        self.cache.percentage()
    }

    pub fn stats(&self) -> CacheStats {
        let handler = self.cache.handler();
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            evictions: handler.evictions,
            releases: handler.releases,
        }
    }

    pub fn releaser(&self) -> &R {
        &self.cache.handler().releaser
    }

    pub fn releaser_mut(&mut self) -> &mut R {
        &mut self.cache.handler_mut().releaser
    }
}

impl<T: ?Sized, H, R> fmt::Debug for UploadCache<T, H, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadCache")
            .field("cache", &self.cache)
            .field("hits", &self.hits)
            .field("misses", &self.misses)
            .finish()
    }
}
