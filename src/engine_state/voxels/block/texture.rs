//! # Texture Module
//!
//! Fixed-width texture names and the static texture atlas lookup used to
//! remap per-face texture coordinates.
//!
//! Texture names are exactly five bytes wide, the width used by the on-disk
//! block record. Shorter names are padded with spaces. Because the name is a
//! plain `[u8; 5]` it is `Copy`, totally ordered and compared without any
//! allocation, so it doubles as the interned texture id inside tuple keys.

use std::fmt;

use phf::phf_map;

/// Width in bytes of a texture name.
pub const TEXTURE_NAME_LEN: usize = 5;

/// Number of texture rows in the atlas image.
pub const ATLAS_ROWS: u8 = 4;

/// Number of texture columns in the atlas image.
pub const ATLAS_COLUMNS: u8 = 4;

/// A fixed-width, five byte texture identifier.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureName([u8; TEXTURE_NAME_LEN]);

impl TextureName {
    /// Builds a texture name from a string, truncating to five bytes and padding
    /// shorter names with spaces.
    pub fn new(name: &str) -> Self {
        let mut bytes = [b' '; TEXTURE_NAME_LEN];
        for (slot, byte) in bytes.iter_mut().zip(name.bytes()) {
            *slot = byte;
        }
        TextureName(bytes)
    }

    /// Wraps raw bytes read from disk.
    pub fn from_bytes(bytes: [u8; TEXTURE_NAME_LEN]) -> Self {
        TextureName(bytes)
    }

    /// The raw five bytes, as written to disk.
    pub fn as_bytes(&self) -> &[u8; TEXTURE_NAME_LEN] {
        &self.0
    }

    /// The name without trailing padding.
    ///
    /// Names that are not valid UTF-8 (only possible for corrupted cache
    /// files) yield an empty string.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("").trim_end()
    }
}

impl fmt::Debug for TextureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TextureName({:?})", self.as_str())
    }
}

impl fmt::Display for TextureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Location of a texture inside the atlas image.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AtlasCell {
    /// Atlas row, counted from the top
    pub row: u8,
    /// Atlas column, counted from the left
    pub column: u8,
}

/// Maps texture names to their cell in the atlas image.
///
/// Unknown names fall back to the first cell.
static TEXTURE_ATLAS: phf::Map<&'static str, AtlasCell> = phf_map! {
    "stone" => AtlasCell { row: 0, column: 0 },
    "dirt" => AtlasCell { row: 0, column: 1 },
    "grass" => AtlasCell { row: 0, column: 2 },
    "sand" => AtlasCell { row: 0, column: 3 },
    "wood" => AtlasCell { row: 1, column: 0 },
    "leaf" => AtlasCell { row: 1, column: 1 },
    "brick" => AtlasCell { row: 1, column: 2 },
    "snow" => AtlasCell { row: 1, column: 3 },
    "water" => AtlasCell { row: 2, column: 0 },
    "lava" => AtlasCell { row: 2, column: 1 },
    "slime" => AtlasCell { row: 2, column: 2 },
};

/// Looks up the atlas cell of a texture.
pub fn atlas_cell(texture: TextureName) -> AtlasCell {
    TEXTURE_ATLAS
        .get(texture.as_str())
        .copied()
        .unwrap_or(AtlasCell { row: 0, column: 0 })
}

/// Remaps a face-local texture coordinate (`0.0..=1.0` on both axes) into the
/// atlas cell of `texture`.
pub fn remap_uv(texture: TextureName, u: f32, v: f32) -> [f32; 2] {
    let cell = atlas_cell(texture);
    [
        (cell.column as f32 + u) / ATLAS_COLUMNS as f32,
        (cell.row as f32 + v) / ATLAS_ROWS as f32,
    ]
}
