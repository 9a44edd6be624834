//! Atlas compositing: scale each image and paste it where its UV set was packed.

use crate::error::{FastpackError, Result};
use crate::packer::{GroupScaling, UvRectangle};
use crate::registry::ImagePackEntry;
use crate::scene::Scene;
use crate::session::CancelToken;
use crate::types::{GroupId, Interpolation};
use image::{imageops, ImageEncoder, RgbaImage};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One composited atlas image.
#[derive(Debug, Clone)]
pub struct Atlas {
    pub group: GroupId,
    /// Name the atlas is registered under in the scene.
    pub name: String,
    /// RGBA pixels, transparent where no image landed.
    pub image: RgbaImage,
}

impl Atlas {
    /// Scene image name for a group's atlas.
    pub fn image_name(group: GroupId) -> String {
        format!("atlas_{}", group)
    }

    /// File name for a group's atlas: the group id plus `.png`.
    pub fn file_name(&self) -> String {
        format!("{}.png", self.group)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Export the atlas as PNG bytes.
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        let cursor = std::io::Cursor::new(&mut bytes);
        let encoder = image::codecs::png::PngEncoder::new(cursor);

        encoder.write_image(
            self.image.as_raw(),
            self.image.width(),
            self.image.height(),
            image::ExtendedColorType::Rgba8,
        )?;

        Ok(bytes)
    }

    /// Write the atlas into `dir` and return the file path.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name());
        std::fs::write(&path, self.to_png()?)?;
        log::info!(
            "Wrote atlas {} ({}x{}) to {}",
            self.name,
            self.width(),
            self.height(),
            path.display()
        );
        Ok(path)
    }
}

/// Resample an image to `size` with the filter matching `interpolation`.
pub fn scale_image(source: &RgbaImage, size: (u32, u32), interpolation: Interpolation) -> RgbaImage {
    if source.dimensions() == size {
        return source.clone();
    }
    imageops::resize(source, size.0, size.1, interpolation.filter())
}

/// Side length in pixels of a group's atlas.
pub fn atlas_size(max_resolution: u32, group_scale: f64) -> u32 {
    ((max_resolution as f64 * group_scale).floor() as u32).max(1)
}

/// Top-left pixel where an image of `image_height` goes for `rect`.
///
/// UV space has its origin at the bottom-left, pixel rows run top to bottom.
pub fn paste_position(rect: &UvRectangle, max_resolution: u32, group_scale: f64, image_height: u32) -> (i64, i64) {
    let [x, y] = rect.position.unwrap_or([0.0, 0.0]);
    let extent = max_resolution as f64 * group_scale;
    let px = (x * extent).floor();
    let py = ((1.0 - y) * extent - image_height as f64).floor();
    (px as i64, py as i64)
}

/// Composite one atlas per group.
///
/// `group_images` maps each group to indices into `entries`. Entries whose
/// set has no packed rectangle are skipped. The token is checked before
/// every image.
pub fn pack_images(
    scene: &Scene,
    entries: &[ImagePackEntry],
    group_images: &BTreeMap<GroupId, Vec<usize>>,
    scaling: &GroupScaling,
    rectangles: &[UvRectangle],
    max_resolution: u32,
    cancel: &CancelToken,
) -> Result<Vec<Atlas>> {
    let mut atlases = Vec::with_capacity(group_images.len());

    for (&group, members) in group_images {
        let group_scale = scaling.group_scales.get(&group).copied().unwrap_or(1.0);
        let size = atlas_size(max_resolution, group_scale);
        let mut canvas = RgbaImage::new(size, size);

        for &i in members {
            cancel.check()?;

            let entry = &entries[i];
            let Some(rect) = rectangles.iter().find(|r| r.sub_uv == entry.sub_uv) else {
                log::warn!("Image {} has no packed rectangle, skipping", entry.image);
                continue;
            };

            let source = scene
                .image(&entry.image)
                .ok_or_else(|| FastpackError::UnknownImage(entry.image.clone()))?
                .load_pixels()?;
            let scaled = scale_image(&source, scaling.scaled_size(i, entry), entry.interpolation);

            let (x, y) = paste_position(rect, max_resolution, group_scale, scaled.height());
            log::debug!(
                "Pasting {} ({}x{}) into group {} at ({}, {})",
                entry.image,
                scaled.width(),
                scaled.height(),
                group,
                x,
                y
            );
            imageops::overlay(&mut canvas, &scaled, x, y);
        }

        atlases.push(Atlas {
            group,
            name: Atlas::image_name(group),
            image: canvas,
        });
    }

    Ok(atlases)
}
