//! Multi-page atlas: opens another page when the current ones are full.

use std::fmt;

use image::{DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::atlas::{AtlasSurface, CpuSurface, TextureAtlas};
use crate::config::AtlasConfig;
use crate::error::{AtlasError, Result};
use crate::model::{AtlasItem, AtlasStats, UpdateRegion};
use crate::packer::PackId;

/// An item together with the page that holds it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageItem {
    pub page: usize,
    pub item: AtlasItem,
}

type SurfaceFactory<S> = Box<dyn FnMut(&AtlasConfig) -> Result<S>>;

/// Growing list of atlas pages sharing one configuration.
pub struct AtlasPages<S = CpuSurface> {
    config: AtlasConfig,
    pages: Vec<TextureAtlas<S>>,
    new_surface: SurfaceFactory<S>,
}

impl AtlasPages<CpuSurface> {
    pub fn new(config: AtlasConfig) -> Result<Self> {
        Self::with_surfaces(config, |cfg: &AtlasConfig| {
            Ok(CpuSurface::new(cfg.size, cfg.format))
        })
    }
}

impl<S: AtlasSurface> AtlasPages<S> {
    /// Pages whose surfaces are created on demand by `new_surface`.
    pub fn with_surfaces<F>(config: AtlasConfig, new_surface: F) -> Result<Self>
    where
        F: FnMut(&AtlasConfig) -> Result<S> + 'static,
    {
        config.validate()?;
        Ok(Self {
            config,
            pages: Vec::new(),
            new_surface: Box::new(new_surface),
        })
    }

    pub fn config(&self) -> &AtlasConfig {
        &self.config
    }

    pub fn pages(&self) -> &[TextureAtlas<S>] {
        &self.pages
    }

    pub fn page(&self, index: usize) -> Option<&TextureAtlas<S>> {
        self.pages.get(index)
    }

    pub fn into_pages(self) -> Vec<TextureAtlas<S>> {
        self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Place `image` on the first page with room, opening a new page if none has any.
    pub fn add_item(&mut self, image: &DynamicImage) -> Result<PageItem> {
        let (w, h) = image.dimensions();
        let max = self.config.max_item_size();
        if w > max || h > max {
            return Err(AtlasError::InvalidInput(format!(
                "image {}x{} does not fit an empty {} atlas with border {}",
                w, h, self.config.size, self.config.border
            )));
        }
        for (page, atlas) in self.pages.iter_mut().enumerate() {
            if let Some(item) = atlas.add_item(image)? {
                return Ok(PageItem { page, item });
            }
        }

        let page = self.pages.len();
        debug!(page, size = self.config.size, "opening atlas page");
        let surface = (self.new_surface)(&self.config)?;
        let mut atlas = TextureAtlas::with_surface(self.config.clone(), surface)?;
        let item = atlas.add_item(image)?.ok_or_else(|| {
            AtlasError::InvalidInput(format!("image {}x{} rejected by an empty page", w, h))
        })?;
        self.pages.push(atlas);
        Ok(PageItem { page, item })
    }

    /// Add many keyed images, largest area first. Results come back in input order.
    #[instrument(skip_all)]
    pub fn add_all<'a, K, I>(&mut self, images: I) -> Result<Vec<(K, PageItem)>>
    where
        I: IntoIterator<Item = (K, &'a DynamicImage)>,
    {
        let mut inputs: Vec<(usize, K, &DynamicImage)> = images
            .into_iter()
            .enumerate()
            .map(|(i, (key, image))| (i, key, image))
            .collect();
        inputs.sort_by_key(|(i, _, image)| {
            let (w, h) = image.dimensions();
            (std::cmp::Reverse((w as u64) * (h as u64)), *i)
        });

        let mut placed = Vec::with_capacity(inputs.len());
        for (i, key, image) in inputs {
            let item = self.add_item(image)?;
            placed.push((i, key, item));
        }
        placed.sort_by_key(|(i, _, _)| *i);
        debug!(items = placed.len(), pages = self.pages.len(), "atlas pages filled");
        Ok(placed.into_iter().map(|(_, key, item)| (key, item)).collect())
    }

    pub fn get_item(&self, page: usize, id: PackId) -> Option<AtlasItem> {
        self.pages.get(page)?.get_item(id)
    }

    /// Combined statistics of every page.
    pub fn stats(&self) -> AtlasStats {
        self.pages
            .iter()
            .fold(AtlasStats::empty(), |acc, p| acc.merge(&p.stats()))
    }

    /// Drain the dirty regions of every page, tagged with the page index.
    pub fn take_updates(&mut self) -> Vec<(usize, UpdateRegion)> {
        self.pages
            .iter_mut()
            .enumerate()
            .flat_map(|(i, p)| p.take_updates().into_iter().map(move |r| (i, r)))
            .collect()
    }
}

impl<S> fmt::Debug for AtlasPages<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtlasPages")
            .field("config", &self.config)
            .field("pages", &self.pages.len())
            .finish()
    }
}
