use std::mem;

use image::{DynamicImage, GenericImageView, ImageBuffer, Pixel, imageops};

use crate::config::{AtlasConfig, FilterMode, PixelFormat};
use crate::error::{AtlasError, Result};
use crate::model::{AtlasItem, AtlasStats, Rect, Size, UpdateRegion, UvRange};
use crate::packer::{BoxPacker, PackId, PackNode};

/// Pixel storage behind a [`TextureAtlas`].
///
/// The atlas only needs to write rectangular regions; creating and sampling
/// the GPU texture stays with the rendering layer.
pub trait AtlasSurface {
    fn dimensions(&self) -> (u32, u32);
    fn format(&self) -> PixelFormat;
    /// Copy `image` so that its top-left pixel lands at `(x, y)`, converting to the surface format.
    fn write(&mut self, x: u32, y: u32, image: &DynamicImage) -> Result<()>;
    /// Set every pixel inside `rect` to zero.
    fn clear(&mut self, rect: Rect) -> Result<()>;
}

/// CPU-side surface backed by an `image` buffer.
#[derive(Debug, Clone)]
pub struct CpuSurface {
    image: DynamicImage,
    format: PixelFormat,
}

impl CpuSurface {
    pub fn new(size: u32, format: PixelFormat) -> Self {
        let image = match format {
            PixelFormat::L8 => DynamicImage::new_luma8(size, size),
            PixelFormat::La8 => DynamicImage::new_luma_a8(size, size),
            PixelFormat::Rgb8 => DynamicImage::new_rgb8(size, size),
            PixelFormat::Rgba8 => DynamicImage::new_rgba8(size, size),
        };
        Self { image, format }
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn into_image(self) -> DynamicImage {
        self.image
    }

    fn check_bounds(&self, rect: Rect) -> Result<()> {
        let (w, h) = self.image.dimensions();
        if Rect::new(0, 0, w, h).contains(&rect) {
            Ok(())
        } else {
            Err(AtlasError::InvalidInput(format!(
                "region {}x{} at {},{} is outside the {}x{} surface",
                rect.w, rect.h, rect.x, rect.y, w, h
            )))
        }
    }
}

fn zero_rect<P: Pixel>(dst: &mut ImageBuffer<P, Vec<P::Subpixel>>, rect: Rect) {
    let blank: ImageBuffer<P, Vec<P::Subpixel>> = ImageBuffer::new(rect.w, rect.h);
    imageops::replace(dst, &blank, rect.x as i64, rect.y as i64);
}

impl AtlasSurface for CpuSurface {
    fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn format(&self) -> PixelFormat {
        self.format
    }

    fn write(&mut self, x: u32, y: u32, image: &DynamicImage) -> Result<()> {
        let (w, h) = image.dimensions();
        self.check_bounds(Rect::new(x, y, w, h))?;
        let (x, y) = (x as i64, y as i64);
        match &mut self.image {
            DynamicImage::ImageLuma8(dst) => imageops::replace(dst, &image.to_luma8(), x, y),
            DynamicImage::ImageLumaA8(dst) => {
                imageops::replace(dst, &image.to_luma_alpha8(), x, y)
            }
            DynamicImage::ImageRgb8(dst) => imageops::replace(dst, &image.to_rgb8(), x, y),
            DynamicImage::ImageRgba8(dst) => imageops::replace(dst, &image.to_rgba8(), x, y),
            other => {
                return Err(AtlasError::InvalidConfig(format!(
                    "unsupported surface color type {:?}",
                    other.color()
                )));
            }
        }
        Ok(())
    }

    fn clear(&mut self, rect: Rect) -> Result<()> {
        self.check_bounds(rect)?;
        match &mut self.image {
            DynamicImage::ImageLuma8(dst) => zero_rect(dst, rect),
            DynamicImage::ImageLumaA8(dst) => zero_rect(dst, rect),
            DynamicImage::ImageRgb8(dst) => zero_rect(dst, rect),
            DynamicImage::ImageRgba8(dst) => zero_rect(dst, rect),
            other => {
                return Err(AtlasError::InvalidConfig(format!(
                    "unsupported surface color type {:?}",
                    other.color()
                )));
            }
        }
        Ok(())
    }
}

/// Square texture atlas: a [`BoxPacker`] plus the surface it packs into.
///
/// Items are never removed. When `add_item` returns `Ok(None)` the atlas is
/// full and the caller should move on to another atlas (see
/// [`AtlasPages`](crate::pages::AtlasPages)).
#[derive(Debug)]
pub struct TextureAtlas<S = CpuSurface> {
    config: AtlasConfig,
    packer: BoxPacker,
    surface: S,
    updates: Vec<UpdateRegion>,
}

impl TextureAtlas<CpuSurface> {
    /// Create an atlas with a CPU surface matching `config`.
    pub fn new(config: AtlasConfig) -> Result<Self> {
        config.validate()?;
        let surface = CpuSurface::new(config.size, config.format);
        Self::with_surface(config, surface)
    }
}

impl<S: AtlasSurface> TextureAtlas<S> {
    /// Create an atlas over an existing surface, which must match `config` in size and format.
    pub fn with_surface(config: AtlasConfig, surface: S) -> Result<Self> {
        config.validate()?;
        let (w, h) = surface.dimensions();
        if (w, h) != (config.size, config.size) {
            return Err(AtlasError::InvalidConfig(format!(
                "surface is {}x{}, atlas size is {}",
                w, h, config.size
            )));
        }
        if surface.format() != config.format {
            return Err(AtlasError::InvalidConfig(format!(
                "surface format {} does not match atlas format {}",
                surface.format().name(),
                config.format.name()
            )));
        }
        let packer = BoxPacker::new((config.size, config.size), config.border)?;
        Ok(Self {
            config,
            packer,
            surface,
            updates: Vec::new(),
        })
    }

    pub fn config(&self) -> &AtlasConfig {
        &self.config
    }

    pub fn size(&self) -> u32 {
        self.config.size
    }

    pub fn format(&self) -> PixelFormat {
        self.config.format
    }

    pub fn filter(&self) -> FilterMode {
        self.config.filter
    }

    pub fn border(&self) -> u32 {
        self.config.border
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    pub fn packer(&self) -> &BoxPacker {
        &self.packer
    }

    /// Number of items placed so far.
    pub fn len(&self) -> usize {
        self.packer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packer.is_empty()
    }

    /// Pack `image` and copy it into the surface.
    ///
    /// The whole padded slot is zeroed first so the border stays transparent.
    /// Returns `Ok(None)` without touching anything when the atlas is full.
    /// The slot is only marked occupied after the surface accepted the pixels,
    /// so a surface error leaves the atlas as it was.
    pub fn add_item(&mut self, image: &DynamicImage) -> Result<Option<AtlasItem>> {
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            return Err(AtlasError::InvalidInput(format!(
                "cannot add an empty {}x{} image",
                w, h
            )));
        }
        let Some(slot) = self.packer.find_slot((w, h))? else {
            return Ok(None);
        };
        let border = self.config.border;
        self.surface.clear(slot)?;
        self.surface.write(slot.x + border, slot.y + border, image)?;

        let Some(node) = self.packer.insert((w, h))? else {
            return Ok(None);
        };
        debug_assert_eq!(node.rect(), slot);
        self.updates.push(UpdateRegion::from(slot));
        Ok(self.to_item(&node))
    }

    /// Whether an image of `size` would currently fit.
    pub fn can_fit(&self, size: impl Into<Size>) -> bool {
        self.packer.can_fit(size)
    }

    pub fn get_item(&self, id: PackId) -> Option<AtlasItem> {
        self.packer.get_node(id).and_then(|n| self.to_item(n))
    }

    /// Pixel rectangle of the stored image (border excluded).
    pub fn item_rect(&self, id: PackId) -> Option<Rect> {
        self.packer
            .get_node(id)
            .map(|n| n.rect().inset(self.config.border))
    }

    /// All items in insertion order.
    pub fn items(&self) -> Vec<AtlasItem> {
        self.packer
            .occupied()
            .into_iter()
            .filter_map(|n| self.to_item(n))
            .collect()
    }

    pub fn percentage_used(&self) -> f32 {
        self.packer.percentage_used()
    }

    pub fn stats(&self) -> AtlasStats {
        self.packer.stats()
    }

    /// Regions written since the last call, for uploading to the GPU texture.
    pub fn take_updates(&mut self) -> Vec<UpdateRegion> {
        mem::take(&mut self.updates)
    }

    fn to_item(&self, node: &PackNode) -> Option<AtlasItem> {
        let id = node.id()?;
        let inner = node.rect().inset(self.config.border);
        let size = self.config.size as f32;
        Some(AtlasItem {
            id,
            size: inner.size(),
            u: UvRange::new(inner.x as f32 / size, inner.x2() as f32 / size),
            v: UvRange::new(inner.y as f32 / size, inner.y2() as f32 / size),
        })
    }
}
