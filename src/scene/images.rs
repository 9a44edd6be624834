//! Scene images and pixel loading.

use crate::error::{FastpackError, Result};
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// An image referenced by material nodes.
///
/// Dimensions are always known; pixels may live in memory or be decoded
/// from `path` on demand.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneImage {
    /// Unique image name. Nodes reference images by this name.
    pub name: String,
    /// File backing the image, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Native width in pixels.
    #[serde(default)]
    pub width: u32,
    /// Native height in pixels.
    #[serde(default)]
    pub height: u32,
    /// Decoded RGBA8 pixels, rows top to bottom.
    #[serde(skip)]
    pub pixels: Option<RgbaImage>,
}

impl SceneImage {
    /// Create an image from an in-memory RGBA buffer.
    pub fn from_rgba(name: impl Into<String>, pixels: RgbaImage) -> Self {
        let (width, height) = pixels.dimensions();
        Self {
            name: name.into(),
            path: None,
            width,
            height,
            pixels: Some(pixels),
        }
    }

    /// Create a single-color image.
    pub fn solid(name: impl Into<String>, width: u32, height: u32, color: [u8; 4]) -> Self {
        Self::from_rgba(name, RgbaImage::from_pixel(width, height, Rgba(color)))
    }

    /// Reference an image file without decoding it. Only the header is read.
    pub fn from_file(name: impl Into<String>, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let (width, height) = image::image_dimensions(&path)?;
        Ok(Self {
            name: name.into(),
            path: Some(path),
            width,
            height,
            pixels: None,
        })
    }

    /// Pixel area at native resolution.
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Get the pixels, decoding the backing file if they are not resident.
    pub fn load_pixels(&self) -> Result<RgbaImage> {
        if let Some(pixels) = &self.pixels {
            return Ok(pixels.clone());
        }

        match &self.path {
            Some(path) => load_rgba_from_path(path),
            None => Err(FastpackError::UnknownImage(format!(
                "{} has no pixel data",
                self.name
            ))),
        }
    }
}

/// Decode image bytes into RGBA8. Missing channels are filled as (0, 0, 0, 1).
pub fn load_rgba_from_bytes(data: &[u8]) -> Result<RgbaImage> {
    Ok(image::load_from_memory(data)?.to_rgba8())
}

/// Decode an image file into RGBA8.
pub fn load_rgba_from_path(path: &Path) -> Result<RgbaImage> {
    Ok(image::open(path)?.to_rgba8())
}
