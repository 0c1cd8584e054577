use std::{io::Cursor, path::Path};

use anyhow::Context;

use crate::foundation::error::{SpriteGateError, SpriteGateResult};

/// Straight (non-premultiplied) RGB triple.
pub type Rgb = [u8; 3];

/// Zero-based index of a frame within an animation.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u32);

impl std::fmt::Display for FrameIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inclusive pixel rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PixelRect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32, // inclusive
    pub y1: u32, // inclusive
}

impl PixelRect {
    pub fn width(self) -> u32 {
        self.x1 - self.x0 + 1
    }

    pub fn height(self) -> u32 {
        self.y1 - self.y0 + 1
    }

    pub fn center_x(self) -> f64 {
        (f64::from(self.x0) + f64::from(self.x1)) / 2.0
    }
}

/// Owned straight-alpha RGBA8 pixel buffer in row-major order.
#[derive(Clone, PartialEq, Eq)]
pub struct RgbaFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl std::fmt::Debug for RgbaFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RgbaFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("data_len", &self.data.len())
            .finish()
    }
}

impl RgbaFrame {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> SpriteGateResult<Self> {
        let expected = expected_len(width, height)?;
        if data.len() != expected {
            return Err(SpriteGateError::validation(format!(
                "rgba buffer length {} does not match {width}x{height}x4",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn transparent(width: u32, height: u32) -> Self {
        Self::filled(width, height, [0, 0, 0, 0])
    }

    pub fn filled(width: u32, height: u32, px: [u8; 4]) -> Self {
        let count = (width as usize) * (height as usize);
        Self {
            width,
            height,
            data: px.repeat(count),
        }
    }

    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    pub fn same_size(&self, other: &Self) -> bool {
        self.width == other.width && self.height == other.height
    }

    #[inline]
    pub fn offset(&self, x: u32, y: u32) -> usize {
        ((y as usize) * (self.width as usize) + (x as usize)) * 4
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.offset(x, y);
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, px: [u8; 4]) {
        let i = self.offset(x, y);
        self.data[i..i + 4].copy_from_slice(&px);
    }

    pub fn from_rgba_image(img: image::RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            data: img.into_raw(),
        }
    }

    pub fn to_rgba_image(&self) -> SpriteGateResult<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.data.clone()).ok_or_else(|| {
            SpriteGateError::validation("rgba buffer does not match its declared dimensions")
        })
    }

    /// Encode as PNG bytes (RGBA8).
    pub fn encode_png(&self) -> SpriteGateResult<Vec<u8>> {
        let img = self.to_rgba_image()?;
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .context("encode png")?;
        Ok(buf)
    }

    /// Load any decodable image file, converting it to RGBA8.
    pub fn load(path: &Path) -> SpriteGateResult<Self> {
        let img = image::open(path).with_context(|| format!("open image '{}'", path.display()))?;
        Ok(Self::from_rgba_image(img.to_rgba8()))
    }
}

fn expected_len(width: u32, height: u32) -> SpriteGateResult<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| SpriteGateError::validation("rgba buffer size overflow"))
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
