use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{AtlasError, Result};

/// Pixel layout of an atlas surface.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// 8-bit luminance (glyph coverage masks).
    L8,
    /// 8-bit luminance + alpha.
    La8,
    Rgb8,
    /// 8-bit RGBA (icons, color glyphs).
    Rgba8,
}

impl PixelFormat {
    pub fn channels(&self) -> u32 {
        match self {
            PixelFormat::L8 => 1,
            PixelFormat::La8 => 2,
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 => 4,
        }
    }

    pub fn bytes_per_pixel(&self) -> u32 {
        self.channels()
    }

    pub fn name(&self) -> &'static str {
        match self {
            PixelFormat::L8 => "L8",
            PixelFormat::La8 => "LA8",
            PixelFormat::Rgb8 => "RGB8",
            PixelFormat::Rgba8 => "RGBA8",
        }
    }

    /// Maps an `image` color type to the matching 8-bit format, if any.
    pub fn from_color_type(color: image::ColorType) -> Option<Self> {
        match color {
            image::ColorType::L8 => Some(PixelFormat::L8),
            image::ColorType::La8 => Some(PixelFormat::La8),
            image::ColorType::Rgb8 => Some(PixelFormat::Rgb8),
            image::ColorType::Rgba8 => Some(PixelFormat::Rgba8),
            _ => None,
        }
    }
}

impl FromStr for PixelFormat {
    type Err = ();
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "l8" | "luma8" | "l_u8" => Ok(Self::L8),
            "la8" | "lumaa8" | "la_u8" => Ok(Self::La8),
            "rgb8" | "rgb_u8" => Ok(Self::Rgb8),
            "rgba8" | "rgba_u8" => Ok(Self::Rgba8),
            _ => Err(()),
        }
    }
}

/// Texture sampling filter requested for the atlas texture.
///
/// Only recorded and reported; the rendering layer applies it when creating the GPU texture.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    Nearest,
    Linear,
}

impl FromStr for FilterMode {
    type Err = ();
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nearest" | "point" => Ok(Self::Nearest),
            "linear" | "bilinear" => Ok(Self::Linear),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AtlasConfig {
    /// Width and height of the (square) atlas surface in pixels.
    pub size: u32,
    /// Pixel layout of the atlas surface.
    #[serde(default = "default_format")]
    pub format: PixelFormat,
    /// Sampling filter for the GPU texture.
    #[serde(default = "default_filter")]
    pub filter: FilterMode,
    /// Pixels reserved around every item to avoid filter bleed.
    #[serde(default = "default_border")]
    pub border: u32,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            size: 1024,
            format: default_format(),
            filter: default_filter(),
            border: default_border(),
        }
    }
}

impl AtlasConfig {
    /// Validates the configuration parameters.
    ///
    /// Returns an error if the size is zero or the border would leave no usable space.
    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(AtlasError::InvalidDimensions {
                width: self.size,
                height: self.size,
            });
        }
        if self.border.saturating_mul(2) >= self.size {
            return Err(AtlasError::InvalidConfig(format!(
                "border ({}) * 2 leaves no usable space in a {}x{} atlas",
                self.border, self.size, self.size
            )));
        }
        Ok(())
    }

    /// Largest image that fits into an empty atlas with this configuration.
    pub fn max_item_size(&self) -> u32 {
        self.size.saturating_sub(self.border.saturating_mul(2))
    }

    /// Create a fluent builder for `AtlasConfig`.
    pub fn builder() -> AtlasConfigBuilder {
        AtlasConfigBuilder::new()
    }
}

fn default_format() -> PixelFormat {
    PixelFormat::Rgba8
}
fn default_filter() -> FilterMode {
    FilterMode::Linear
}
fn default_border() -> u32 {
    1
}

/// Builder for `AtlasConfig` for ergonomic construction.
#[derive(Debug, Default, Clone)]
pub struct AtlasConfigBuilder {
    cfg: AtlasConfig,
}

impl AtlasConfigBuilder {
    pub fn new() -> Self {
        Self {
            cfg: AtlasConfig::default(),
        }
    }
    pub fn size(mut self, v: u32) -> Self {
        self.cfg.size = v;
        self
    }
    pub fn format(mut self, v: PixelFormat) -> Self {
        self.cfg.format = v;
        self
    }
    pub fn filter(mut self, v: FilterMode) -> Self {
        self.cfg.filter = v;
        self
    }
    pub fn border(mut self, v: u32) -> Self {
        self.cfg.border = v;
        self
    }
    pub fn build(self) -> AtlasConfig {
        self.cfg
    }
}

const GIGABYTE: u64 = 1024 * 1024 * 1024;

/// Capacity policy for an upload cache.
///
/// The cache itself only counts entries; this converts a byte budget into an
/// entry count using the expected size of one uploaded texture.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheConfig {
    /// Explicit entry limit. Takes precedence over the byte budget.
    #[serde(default)]
    pub max_entries: Option<usize>,
    /// Total GPU memory the cache may reference.
    #[serde(default = "default_byte_budget")]
    pub byte_budget: u64,
    /// Expected bytes per cached texture.
    #[serde(default = "default_entry_bytes")]
    pub entry_bytes: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: None,
            byte_budget: default_byte_budget(),
            entry_bytes: default_entry_bytes(),
        }
    }
}

impl CacheConfig {
    /// Budget sized for textures of `width x height` in `format`.
    pub fn for_textures(byte_budget: u64, width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            max_entries: None,
            byte_budget,
            entry_bytes: (width as u64) * (height as u64) * format.bytes_per_pixel() as u64,
        }
    }

    /// Entry count the cache should be limited to.
    pub fn entry_limit(&self) -> usize {
        if let Some(n) = self.max_entries {
            return n;
        }
        let n = self.byte_budget / self.entry_bytes.max(1);
        usize::try_from(n).unwrap_or(usize::MAX)
    }
}

fn default_byte_budget() -> u64 {
    GIGABYTE / 4
}
fn default_entry_bytes() -> u64 {
    // One 1024x1024 RGBA8 texture.
    1024 * 1024 * 4
}
