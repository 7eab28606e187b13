use std::fmt;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

use crate::RangeError;

/// Position of a standard-size cell in the tilemap grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct GridCoord {
    pub x: i32,
    pub y: i32,
}

impl GridCoord {
    pub const ZERO: Self = Self { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: u32, dy: u32) -> Option<Self> {
        Some(Self {
            x: self.x.checked_add(i32::try_from(dx).ok()?)?,
            y: self.y.checked_add(i32::try_from(dy).ok()?)?,
        })
    }
}

impl Add for GridCoord {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for GridCoord {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl fmt::Display for GridCoord {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "({}, {})", self.x, self.y)
    }
}

/// Axis-aligned rectangle of grid cells. `size` counts cells, so a rect
/// holding a single cell has size (1, 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GridRect {
    pub origin: GridCoord,
    pub size: ImageSize,
}

impl GridRect {
    /// Smallest rect covering every coordinate, or `None` for an empty input.
    /// Fails when the span between the outermost cells does not fit a `u32`.
    pub fn covering(
        coords: impl IntoIterator<Item = GridCoord>,
    ) -> Result<Option<Self>, RangeError> {
        let mut coords = coords.into_iter();
        let Some(first) = coords.next() else {
            return Ok(None);
        };
        let (mut min, mut max) = (first, first);
        for coord in coords {
            min.x = min.x.min(coord.x);
            min.y = min.y.min(coord.y);
            max.x = max.x.max(coord.x);
            max.y = max.y.max(coord.y);
        }
        let overflow = RangeError::GridExtentOverflow { min, max };
        let width = max.x.abs_diff(min.x).checked_add(1).ok_or(overflow.clone())?;
        let height = max.y.abs_diff(min.y).checked_add(1).ok_or(overflow)?;
        Ok(Some(Self {
            origin: min,
            size: ImageSize::new(width, height),
        }))
    }

    /// Exclusive end corner, or `None` when it lies past `i32::MAX`.
    pub fn end(&self) -> Option<GridCoord> {
        Some(GridCoord::new(
            i32::try_from(i64::from(self.origin.x) + i64::from(self.size.width)).ok()?,
            i32::try_from(i64::from(self.origin.y) + i64::from(self.size.height)).ok()?,
        ))
    }

    pub fn contains(&self, coord: GridCoord) -> bool {
        let dx = i64::from(coord.x) - i64::from(self.origin.x);
        let dy = i64::from(coord.y) - i64::from(self.origin.y);
        (0..i64::from(self.size.width)).contains(&dx) && (0..i64::from(self.size.height)).contains(&dy)
    }
}

/// Position inside an atlas grid, in cells. `(-1, -1)` is the reserved
/// "no tile" marker the tileset hands out for unused grid positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct AtlasCoord {
    pub x: i32,
    pub y: i32,
}

impl AtlasCoord {
    pub const INVALID: Self = Self { x: -1, y: -1 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn is_invalid(self) -> bool {
        self == Self::INVALID
    }
}

impl fmt::Display for AtlasCoord {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "({}, {})", self.x, self.y)
    }
}

/// Footprint of one logical tile, in standard cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileScale {
    pub w: u32,
    pub h: u32,
}

impl TileScale {
    pub const ONE: Self = Self { w: 1, h: 1 };

    pub const fn new(w: u32, h: u32) -> Self {
        Self { w, h }
    }

    pub fn max(self, other: Self) -> Self {
        Self::new(self.w.max(other.w), self.h.max(other.h))
    }

    pub fn fits_within(self, other: Self) -> bool {
        self.w <= other.w && self.h <= other.h
    }

    /// `self - (1, 1)` clamped at zero: the margin an oversized tile needs
    /// beyond the cell it is anchored on.
    pub fn padding(self) -> ImageSize {
        ImageSize::new(self.w.saturating_sub(1), self.h.saturating_sub(1))
    }

    pub fn is_empty(self) -> bool {
        self.w == 0 || self.h == 0
    }
}

impl Default for TileScale {
    fn default() -> Self {
        Self::ONE
    }
}

impl fmt::Display for TileScale {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}x{}", self.w, self.h)
    }
}

/// Pixel size of one standard cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellSize {
    pub w: u32,
    pub h: u32,
}

impl CellSize {
    pub const fn new(w: u32, h: u32) -> Self {
        Self { w, h }
    }

    pub fn is_empty(self) -> bool {
        self.w == 0 || self.h == 0
    }
}

/// Width/height of an image or buffer in texels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub const ZERO: Self = Self {
        width: 0,
        height: 0,
    };

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const fn texel_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}x{}", self.width, self.height)
    }
}
