//! Atlas layout: sizing sub-UV sets and packing them into the unit square.
//!
//! Sizes come from the images: each sub-UV set is as large as its largest
//! image relative to the maximum atlas resolution. Images that share an atlas
//! group are then scaled so that every image in the group has the same texel
//! density relative to its set.

mod rect;
mod uv;

pub use rect::{pack_rects, UvRectangle};
pub use uv::{cell_displacement, normalize_uvs, pack_uvs, UvEdit, UvLayout};

use crate::error::{FastpackError, Result};
use crate::registry::ImagePackEntry;
use crate::types::GroupId;
use std::collections::BTreeMap;

/// Per sub-UV set footprint derived from its images.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UvRatios {
    /// Largest image area, in pixels.
    pub areas: Vec<u64>,
    /// Largest image width over the maximum resolution.
    pub widths: Vec<f64>,
    /// Largest image height over the maximum resolution.
    pub heights: Vec<f64>,
}

impl UvRatios {
    /// Sets that carry at least one image.
    pub fn occupied(&self) -> impl Iterator<Item = usize> + '_ {
        self.widths
            .iter()
            .zip(&self.heights)
            .enumerate()
            .filter(|(_, (&w, &h))| w > 0.0 && h > 0.0)
            .map(|(i, _)| i)
    }

    /// Summed normalized rectangle area over all sets.
    pub fn surface(&self) -> f64 {
        self.widths
            .iter()
            .zip(&self.heights)
            .map(|(w, h)| w * h)
            .sum()
    }
}

/// Size every sub-UV set by the largest image mapped to it.
///
/// Width, height and area are maximised independently; sets without images
/// stay at zero.
pub fn calculate_uv_ratios(entries: &[ImagePackEntry], set_count: usize, max_resolution: u32) -> UvRatios {
    let mut areas = vec![0u64; set_count];
    let mut widths = vec![0u32; set_count];
    let mut heights = vec![0u32; set_count];

    for entry in entries {
        let i = entry.sub_uv;
        if i >= set_count {
            continue;
        }
        areas[i] = areas[i].max(entry.area());
        widths[i] = widths[i].max(entry.width);
        heights[i] = heights[i].max(entry.height);
    }

    let max = max_resolution.max(1) as f64;
    UvRatios {
        areas,
        widths: widths.into_iter().map(|w| w as f64 / max).collect(),
        heights: heights.into_iter().map(|h| h as f64 / max).collect(),
    }
}

/// Fail early when the sets cannot fit in the atlas even with perfect packing.
pub fn check_surface(ratios: &UvRatios, max_resolution: u32) -> Result<()> {
    let available = max_resolution as f64 * max_resolution as f64;
    let required = ratios.surface() * available;

    if ratios.surface() > 1.0 + 1e-9 {
        return Err(FastpackError::Oversize { required, available });
    }
    Ok(())
}

/// An image's area relative to its sub-UV set's reference area.
pub fn area_ratio(entry: &ImagePackEntry, areas: &[u64]) -> f64 {
    match areas.get(entry.sub_uv) {
        Some(&reference) if reference > 0 => entry.area() as f64 / reference as f64,
        _ => 0.0,
    }
}

/// Scale factors for one build.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupScaling {
    /// Linear scale of each group's atlas relative to the maximum resolution.
    pub group_scales: BTreeMap<GroupId, f64>,
    /// Per entry: the factor its native size is multiplied by.
    pub factors: Vec<f64>,
}

impl GroupScaling {
    /// Size in pixels of `entry`, the `index`th entry, once scaled.
    ///
    /// Rounded and at least one pixel per side. Entries without a factor keep
    /// their native size.
    pub fn scaled_size(&self, index: usize, entry: &ImagePackEntry) -> (u32, u32) {
        let factor = self.factors.get(index).copied().unwrap_or(1.0);
        (
            ((entry.width as f64 * factor).round() as u32).max(1),
            ((entry.height as f64 * factor).round() as u32).max(1),
        )
    }
}

/// Compute each group's uniform scale and the per-image resize factors.
///
/// A group's scale is the square root of the largest area ratio among its
/// images. Every image in the group is resized by `scale / sqrt(own ratio)`,
/// which brings all of them to the same density relative to their sets.
pub fn size_group_images(
    group_images: &BTreeMap<GroupId, Vec<usize>>,
    entries: &[ImagePackEntry],
    areas: &[u64],
) -> GroupScaling {
    let mut scaling = GroupScaling {
        group_scales: BTreeMap::new(),
        factors: vec![1.0; entries.len()],
    };

    for (&group, members) in group_images {
        let max_ratio = members
            .iter()
            .map(|&i| area_ratio(&entries[i], areas))
            .fold(0.0f64, f64::max);
        let group_scale = max_ratio.sqrt();
        scaling.group_scales.insert(group, group_scale);

        for &i in members {
            let ratio = area_ratio(&entries[i], areas);
            if ratio <= 0.0 {
                continue;
            }

            scaling.factors[i] = group_scale / ratio.sqrt();
        }
    }

    scaling
}
