//! Image and UV discovery across a set of objects.
//!
//! The registry walks every material slot of every target object, finds the
//! images each slot depends on, and groups UV loops into sub-UV sets: runs of
//! loops that must move together because they are textured by the same images.

use crate::error::{FastpackError, Result};
use crate::graph::{collect_root_images, find_roots, ImageRef, MaterialGraph};
use crate::scene::{Mesh, Scene};
use crate::types::{Interpolation, ObjectId, SubUvIndex};
use std::collections::{BTreeSet, HashMap, HashSet};

/// A run of loop indices on one object's UV channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UvReference {
    pub object: ObjectId,
    pub uv_slot: usize,
    pub loops: Vec<usize>,
}

/// UV references that are transformed together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubUvSet {
    pub references: Vec<UvReference>,
}

impl SubUvSet {
    /// Total number of loops across all references.
    pub fn loop_count(&self) -> usize {
        self.references.iter().map(|r| r.loops.len()).sum()
    }
}

/// One distinct image that needs a place in an atlas.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePackEntry {
    /// Image name in the scene.
    pub image: String,
    /// Native width in pixels.
    pub width: u32,
    /// Native height in pixels.
    pub height: u32,
    /// Sub-UV set the image is laid out with.
    pub sub_uv: SubUvIndex,
    pub interpolation: Interpolation,
    /// Shader input the image was discovered under.
    pub socket: String,
}

impl ImagePackEntry {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// A material slot that could not be resolved and was left out.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSlot {
    pub object: ObjectId,
    pub slot: usize,
    pub reason: String,
}

/// Discovery result: deduplicated images and the sub-UV sets they live on.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: Vec<ImagePackEntry>,
    by_image: HashMap<String, usize>,
    sub_uv_sets: Vec<SubUvSet>,
    skipped: Vec<SkippedSlot>,
}

impl Registry {
    /// Entries in discovery order.
    pub fn entries(&self) -> &[ImagePackEntry] {
        &self.entries
    }

    pub fn entry(&self, image: &str) -> Option<&ImagePackEntry> {
        self.by_image.get(image).map(|&i| &self.entries[i])
    }

    pub fn sub_uv_sets(&self) -> &[SubUvSet] {
        &self.sub_uv_sets
    }

    /// Material slots left out because their graph could not be resolved.
    pub fn skipped(&self) -> &[SkippedSlot] {
        &self.skipped
    }

    /// Distinct socket labels in discovery order.
    pub fn sockets(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .filter(|e| seen.insert(e.socket.as_str()))
            .map(|e| e.socket.clone())
            .collect()
    }

    fn allocate_set(&mut self) -> SubUvIndex {
        self.sub_uv_sets.push(SubUvSet::default());
        self.sub_uv_sets.len() - 1
    }

    fn insert(&mut self, entry: ImagePackEntry) {
        match self.by_image.get(&entry.image) {
            Some(&i) => self.entries[i] = entry,
            None => {
                self.by_image.insert(entry.image.clone(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }
}

/// An image found on a material's UV channel, not yet tied to a sub-UV set.
#[derive(Debug, Clone)]
struct PendingImage {
    image: String,
    width: u32,
    height: u32,
    interpolation: Interpolation,
    socket: String,
}

/// Per-UV-channel accumulator for one material slot.
#[derive(Debug, Clone, Default)]
struct UvSymbol {
    sub_uv: Option<SubUvIndex>,
    images: Vec<PendingImage>,
}

/// Partition an object's loops by material slot and UV channel.
///
/// Returns `[slot][uv_channel] -> loop indices`. Every channel of a slot sees
/// the same loops; polygons pointing past the last slot are ignored.
pub fn material_loops(mesh: &Mesh, slot_count: usize) -> Vec<Vec<Vec<usize>>> {
    let mut loops = vec![vec![Vec::new(); mesh.uv_layers.len()]; slot_count];

    for polygon in &mesh.polygons {
        let Some(slot) = loops.get_mut(polygon.material_index) else {
            log::warn!(
                "Polygon at loop {} uses missing material slot {}",
                polygon.loop_start,
                polygon.material_index
            );
            continue;
        };
        for channel in slot.iter_mut() {
            channel.extend(polygon.loop_indices());
        }
    }

    loops
}

/// Discover images and sub-UV sets for `objects`.
///
/// Material slots whose graph cannot be resolved are skipped and recorded;
/// the call only fails when every material slot failed.
pub fn retrieve(
    scene: &Scene,
    objects: &[ObjectId],
    blacklist: &BTreeSet<String>,
) -> Result<Registry> {
    let mut registry = Registry::default();
    let mut first_error = None;
    let mut resolved_slots = 0usize;

    for &object_id in objects {
        let object = scene.object(object_id)?;
        let mesh = &object.mesh;
        let object_loops = material_loops(mesh, object.material_slots.len());

        for (slot, material_name) in object.material_slots.iter().enumerate() {
            let refs = match slot_images(scene, mesh, material_name, blacklist) {
                Ok(refs) => refs,
                Err(e) => {
                    log::warn!("Skipping {} slot {}: {}", object.name, slot, e);
                    registry.skipped.push(SkippedSlot {
                        object: object_id,
                        slot,
                        reason: e.to_string(),
                    });
                    first_error.get_or_insert(e);
                    continue;
                }
            };
            resolved_slots += 1;

            let mut symbols = vec![UvSymbol::default(); mesh.uv_layers.len()];
            let mut parsed = HashSet::new();

            for image_ref in refs {
                if !parsed.insert(image_ref.image.clone()) {
                    continue;
                }
                let symbol = &mut symbols[image_ref.uv_slot];

                // Known images pull this channel into their sub-UV set.
                if let Some(known) = registry.entry(&image_ref.image) {
                    if symbol.sub_uv.is_none() {
                        symbol.sub_uv = Some(known.sub_uv);
                    }
                    continue;
                }

                match pending_image(scene, image_ref) {
                    Some(pending) => symbol.images.push(pending),
                    None => continue,
                }
            }

            for (uv_slot, symbol) in symbols.into_iter().enumerate() {
                let sub_uv = match symbol.sub_uv {
                    Some(index) => index,
                    None => registry.allocate_set(),
                };

                registry.sub_uv_sets[sub_uv].references.push(UvReference {
                    object: object_id,
                    uv_slot,
                    loops: object_loops[slot][uv_slot].clone(),
                });

                for pending in symbol.images {
                    registry.insert(ImagePackEntry {
                        image: pending.image,
                        width: pending.width,
                        height: pending.height,
                        sub_uv,
                        interpolation: pending.interpolation,
                        socket: pending.socket,
                    });
                }
            }
        }
    }

    if resolved_slots == 0 {
        if let Some(e) = first_error {
            return Err(e);
        }
    }

    log::info!(
        "Discovered {} images across {} sub-UV sets ({} slots skipped)",
        registry.entries.len(),
        registry.sub_uv_sets.len(),
        registry.skipped.len()
    );

    Ok(registry)
}

fn slot_images(
    scene: &Scene,
    mesh: &Mesh,
    material_name: &str,
    blacklist: &BTreeSet<String>,
) -> Result<Vec<ImageRef>> {
    let material_id = scene.material_id(material_name)?;
    let material = scene
        .material(material_id)
        .ok_or_else(|| FastpackError::UnknownMaterial(material_name.to_string()))?;

    let graph = MaterialGraph::build(material)?;
    let mut images = Vec::new();
    for root in find_roots(&graph, blacklist)? {
        images.extend(collect_root_images(&graph, mesh, root)?);
    }
    Ok(images)
}

fn pending_image(scene: &Scene, image_ref: ImageRef) -> Option<PendingImage> {
    let Some(image) = scene.image(&image_ref.image) else {
        log::warn!("Image {} is not in the scene", image_ref.image);
        return None;
    };
    if image.area() == 0 {
        log::warn!("Image {} is empty", image_ref.image);
        return None;
    }

    Some(PendingImage {
        image: image_ref.image,
        width: image.width,
        height: image.height,
        interpolation: image_ref.interpolation,
        socket: image_ref.socket,
    })
}
