//! Atlas addressed by caller keys (glyph ids, icon names) instead of pack ids.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::hash::Hash;

use image::DynamicImage;
use tracing::trace;

use crate::atlas::{AtlasSurface, CpuSurface, TextureAtlas};
use crate::config::AtlasConfig;
use crate::error::{AtlasError, Result};
use crate::model::{AtlasItem, UpdateRegion};

pub struct KeyedAtlas<K, S = CpuSurface> {
    atlas: TextureAtlas<S>,
    items: HashMap<K, AtlasItem>,
}

impl<K: Hash + Eq> KeyedAtlas<K, CpuSurface> {
    pub fn new(config: AtlasConfig) -> Result<Self> {
        Ok(Self::from_atlas(TextureAtlas::new(config)?))
    }
}

impl<K: Hash + Eq, S: AtlasSurface> KeyedAtlas<K, S> {
    /// Wrap an atlas. Items already in it are not addressable by key.
    pub fn from_atlas(atlas: TextureAtlas<S>) -> Self {
        Self {
            atlas,
            items: HashMap::new(),
        }
    }

    pub fn get<Q>(&self, key: &Q) -> Option<AtlasItem>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.items.get(key).copied()
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.items.contains_key(key)
    }

    /// Item stored under `key`, or the result of adding `make_image()` to the atlas.
    ///
    /// `make_image` only runs on a miss. A full atlas yields `Ok(None)` and
    /// nothing is recorded, so the caller can retry the key elsewhere.
    pub fn get_or_insert_with<E, F>(
        &mut self,
        key: K,
        make_image: F,
    ) -> std::result::Result<Option<AtlasItem>, E>
    where
        E: From<AtlasError>,
        F: FnOnce() -> std::result::Result<DynamicImage, E>,
    {
        match self.items.entry(key) {
            Entry::Occupied(e) => Ok(Some(*e.get())),
            Entry::Vacant(slot) => {
                let image = make_image()?;
                let Some(item) = self.atlas.add_item(&image)? else {
                    return Ok(None);
                };
                trace!(id = %item.id, "keyed atlas insert");
                slot.insert(item);
                Ok(Some(item))
            }
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn atlas(&self) -> &TextureAtlas<S> {
        &self.atlas
    }

    pub fn into_atlas(self) -> TextureAtlas<S> {
        self.atlas
    }

    pub fn percentage_used(&self) -> f32 {
        self.atlas.percentage_used()
    }

    pub fn take_updates(&mut self) -> Vec<UpdateRegion> {
        self.atlas.take_updates()
    }
}

impl<K, S> fmt::Debug for KeyedAtlas<K, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedAtlas")
            .field("keys", &self.items.len())
            .finish()
    }
}
