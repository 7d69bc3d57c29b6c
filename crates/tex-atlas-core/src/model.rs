use serde::{Deserialize, Serialize};

use crate::packer::PackId;

/// Width/height pair in pixels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

impl Size {
    pub fn new(w: u32, h: u32) -> Self {
        Self { w, h }
    }

    pub fn area(&self) -> u64 {
        (self.w as u64) * (self.h as u64)
    }

    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    /// Size grown by `border` pixels on every side.
    pub fn padded(&self, border: u32) -> Size {
        let pad = border.saturating_mul(2);
        Size::new(self.w.saturating_add(pad), self.h.saturating_add(pad))
    }
}

impl From<(u32, u32)> for Size {
    fn from((w, h): (u32, u32)) -> Self {
        Self { w, h }
    }
}

/// Axis-aligned rectangle (pixels). `x,y` is top-left; `w,h` are sizes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    pub fn from_size(size: Size) -> Self {
        Self::new(0, 0, size.w, size.h)
    }

    pub fn size(&self) -> Size {
        Size::new(self.w, self.h)
    }

    pub fn area(&self) -> u64 {
        self.size().area()
    }

    /// Exclusive right edge (`x + w`).
    pub fn x2(&self) -> u32 {
        self.x + self.w
    }

    /// Exclusive bottom edge (`y + h`).
    pub fn y2(&self) -> u32 {
        self.y + self.h
    }

    /// Returns true if `r` lies fully inside `self`.
    pub fn contains(&self, r: &Rect) -> bool {
        r.x >= self.x && r.y >= self.y && r.x2() <= self.x2() && r.y2() <= self.y2()
    }

    /// Returns true if the two rectangles share at least one pixel.
    pub fn intersects(&self, r: &Rect) -> bool {
        !(self.x >= r.x2() || r.x >= self.x2() || self.y >= r.y2() || r.y >= self.y2())
    }

    /// Rectangle shrunk by `border` pixels on every side.
    pub fn inset(&self, border: u32) -> Rect {
        let pad = border.saturating_mul(2);
        Rect::new(
            self.x.saturating_add(border),
            self.y.saturating_add(border),
            self.w.saturating_sub(pad),
            self.h.saturating_sub(pad),
        )
    }
}

/// Normalized texture coordinate range along one axis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct UvRange {
    pub min: f32,
    pub max: f32,
}

impl UvRange {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }
}

/// A rectangle placed into a texture atlas, in texture space.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AtlasItem {
    pub id: PackId,
    /// Size of the stored image (border excluded).
    pub size: Size,
    pub u: UvRange,
    pub v: UvRange,
}

/// Region of an atlas surface that changed and needs uploading to the GPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl UpdateRegion {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn area(&self) -> u64 {
        (self.width as u64) * (self.height as u64)
    }
}

impl From<Rect> for UpdateRegion {
    fn from(r: Rect) -> Self {
        Self {
            x: r.x,
            y: r.y,
            width: r.w,
            height: r.h,
        }
    }
}

/// How much of one or more atlases is occupied.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AtlasStats {
    /// Number of occupied slots.
    pub items: usize,
    /// Area of all occupied slots, border included.
    pub used_area: u64,
    /// Total area of the atlas surface(s).
    pub total_area: u64,
    /// `used_area / total_area`, 0 for an empty total.
    pub occupancy: f64,
}

impl AtlasStats {
    pub fn empty() -> Self {
        Self {
            items: 0,
            used_area: 0,
            total_area: 0,
            occupancy: 0.0,
        }
    }

    pub(crate) fn new(items: usize, used_area: u64, total_area: u64) -> Self {
        let occupancy = if total_area > 0 {
            used_area as f64 / total_area as f64
        } else {
            0.0
        };
        Self {
            items,
            used_area,
            total_area,
            occupancy,
        }
    }

    /// Sum of two stats records (e.g. across pages).
    pub fn merge(&self, other: &AtlasStats) -> AtlasStats {
        AtlasStats::new(
            self.items + other.items,
            self.used_area + other.used_area,
            self.total_area + other.total_area,
        )
    }

    pub fn wasted_area(&self) -> u64 {
        self.total_area.saturating_sub(self.used_area)
    }

    /// One-line summary for logs and the CLI.
    pub fn summary(&self) -> String {
        format!(
            "Items: {}, Occupancy: {:.2}%, Total Area: {} px², Used Area: {} px²",
            self.items,
            self.occupancy * 100.0,
            self.total_area,
            self.used_area,
        )
    }
}
