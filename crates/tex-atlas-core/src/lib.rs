//! Texture atlas allocation and GPU upload caching.
//!
//! - `packer`: append-only guillotine box packer with border padding
//! - `cache`: bounded LRU cache with eviction callbacks, plus an upload cache keyed by
//!   image identity
//! - `atlas`: packer + pixel surface, producing normalized texture coordinates
//! - `pages`: spill-over to additional atlases when one fills up
//! - `keyed`: atlas addressed by caller keys, filled on first lookup
//!
//! Quick example:
//! ```ignore
//! use image::DynamicImage;
//! use tex_atlas_core::prelude::*;
//! # fn main() -> tex_atlas_core::Result<()> {
//! let cfg = AtlasConfig::builder().size(256).border(1).build();
//! let mut atlas = TextureAtlas::new(cfg)?;
//! let glyph = DynamicImage::new_luma8(12, 16);
//! if let Some(item) = atlas.add_item(&glyph)? {
//!     println!("u {:?} v {:?}", item.u, item.v);
//! }
//! # Ok(()) }
//! ```

pub mod atlas;
pub mod cache;
pub mod config;
pub mod error;
pub mod keyed;
pub mod model;
pub mod packer;
pub mod pages;

pub use atlas::*;
pub use cache::{EvictReason, EvictionHandler, RecencyCache};
pub use config::*;
pub use error::*;
pub use keyed::KeyedAtlas;
pub use model::*;
pub use packer::*;
pub use pages::*;

/// Convenience prelude for common types.
/// Importing `tex_atlas_core::prelude::*` brings the primary APIs into scope.
pub mod prelude {
    pub use crate::atlas::{AtlasSurface, CpuSurface, TextureAtlas};
    pub use crate::cache::{
        CacheStats, EvictReason, EvictionHandler, ImageKey, RecencyCache, TextureReleaser,
        UploadCache,
    };
    pub use crate::config::{AtlasConfig, AtlasConfigBuilder, CacheConfig, FilterMode, PixelFormat};
    pub use crate::error::{AtlasError, Result};
    pub use crate::keyed::KeyedAtlas;
    pub use crate::model::{AtlasItem, AtlasStats, Rect, Size, UpdateRegion, UvRange};
    pub use crate::packer::{BoxPacker, PackId, PackNode};
    pub use crate::pages::{AtlasPages, PageItem};
}
