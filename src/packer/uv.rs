//! UV normalization and remapping into packed rectangles.
//!
//! Nothing here writes to the scene. Both steps produce [`UvEdit`]s that are
//! applied in one go once the whole build has succeeded.

use super::rect::{pack_rects, UvRectangle};
use super::UvRatios;
use crate::error::{FastpackError, Result};
use crate::registry::SubUvSet;
use crate::scene::{Mesh, Scene};
use crate::types::{ObjectId, SubUvIndex};
use glam::Vec2;

/// A new coordinate for one loop on one UV channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvEdit {
    pub object: ObjectId,
    pub uv_slot: usize,
    pub loop_index: usize,
    pub uv: Vec2,
}

/// Packed rectangles plus the loop coordinates that realise them.
#[derive(Debug, Clone, Default)]
pub struct UvLayout {
    pub rectangles: Vec<UvRectangle>,
    pub edits: Vec<UvEdit>,
}

impl UvLayout {
    /// The rectangle assigned to a sub-UV set.
    pub fn rectangle(&self, sub_uv: SubUvIndex) -> Option<&UvRectangle> {
        self.rectangles.iter().find(|r| r.sub_uv == sub_uv)
    }

    /// Write every staged coordinate into the scene.
    pub fn apply(&self, scene: &mut Scene) {
        for edit in &self.edits {
            if let Ok(object) = scene.object_mut(edit.object) {
                object.mesh.set_uv(edit.uv_slot, edit.loop_index, edit.uv);
            }
        }
    }
}

/// Whole UV tiles an island is shifted by, found from its lower-left anchor.
///
/// The anchor is the first loop that is strictly below-left of every earlier
/// anchor candidate on both axes at once. Returns `None` for an empty run.
pub fn cell_displacement(mesh: &Mesh, uv_slot: usize, loops: &[usize]) -> Option<Vec2> {
    let mut anchor: Option<Vec2> = None;

    for &loop_index in loops {
        let Some(uv) = mesh.uv(uv_slot, loop_index) else {
            continue;
        };
        match anchor {
            Some(a) if !(uv.x < a.x && uv.y < a.y) => {}
            _ => anchor = Some(uv),
        }
    }

    anchor.map(|a| a.floor())
}

/// Move every island of a set back into the [0, 1] tile.
fn normalize_set(scene: &Scene, set: &SubUvSet) -> Result<Vec<UvEdit>> {
    let mut edits = Vec::with_capacity(set.loop_count());

    for reference in &set.references {
        let mesh = &scene.object(reference.object)?.mesh;
        let Some(offset) = cell_displacement(mesh, reference.uv_slot, &reference.loops) else {
            continue;
        };

        for &loop_index in &reference.loops {
            if let Some(uv) = mesh.uv(reference.uv_slot, loop_index) {
                edits.push(UvEdit {
                    object: reference.object,
                    uv_slot: reference.uv_slot,
                    loop_index,
                    uv: uv - offset,
                });
            }
        }
    }

    Ok(edits)
}

/// Normalized coordinates for every set, indexed like `sets`.
pub fn normalize_uvs(scene: &Scene, sets: &[SubUvSet]) -> Result<Vec<Vec<UvEdit>>> {
    sets.iter().map(|set| normalize_set(scene, set)).collect()
}

/// Pack every occupied set and compute its remapped UVs.
///
/// Sets whose width or height ratio is zero carry no image and keep their
/// UVs. On failure nothing has been staged.
pub fn pack_uvs(scene: &Scene, sets: &[SubUvSet], ratios: &UvRatios) -> Result<UvLayout> {
    let mut rectangles: Vec<UvRectangle> = ratios
        .occupied()
        .filter(|&i| i < sets.len())
        .map(|i| UvRectangle::new(i, ratios.widths[i], ratios.heights[i]))
        .collect();

    if !pack_rects(&mut rectangles) {
        return Err(FastpackError::Packing {
            islands: rectangles.len(),
        });
    }

    let mut edits = Vec::new();
    for rect in &rectangles {
        for edit in normalize_set(scene, &sets[rect.sub_uv])? {
            edits.push(UvEdit {
                uv: rect.transform_uv(edit.uv),
                ..edit
            });
        }
    }

    log::debug!(
        "Packed {} rectangles, {} loop coordinates staged",
        rectangles.len(),
        edits.len()
    );

    Ok(UvLayout { rectangles, edits })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::UvReference;
    use crate::scene::{Polygon, SceneObject, UvLayer};

    fn scene_with_uvs(coords: Vec<Vec2>) -> Scene {
        let count = coords.len();
        let mesh = Mesh::new()
            .with_uv_layer(UvLayer::new("UVMap", coords))
            .with_polygon(Polygon::new(0, count, 0));
        let mut scene = Scene::new();
        scene.add_object(SceneObject::new("obj", mesh));
        scene
    }

    fn set_of(loops: Vec<usize>) -> SubUvSet {
        SubUvSet {
            references: vec![UvReference {
                object: ObjectId(0),
                uv_slot: 0,
                loops,
            }],
        }
    }

    fn ratios(widths: &[f64], heights: &[f64]) -> UvRatios {
        UvRatios {
            widths: widths.to_vec(),
            heights: heights.to_vec(),
            ..Default::default()
        }
    }

    #[test]
    fn test_cell_displacement_floors_anchor() {
        let scene = scene_with_uvs(vec![
            Vec2::new(2.5, 1.5),
            Vec2::new(2.2, 1.1),
            Vec2::new(2.9, 1.0),
        ]);
        let mesh = &scene.objects[0].mesh;
        assert_eq!(cell_displacement(mesh, 0, &[0, 1, 2]), Some(Vec2::new(2.0, 1.0)));
        assert_eq!(cell_displacement(mesh, 0, &[]), None);
    }

    #[test]
    fn test_cell_displacement_negative_tile() {
        let scene = scene_with_uvs(vec![Vec2::new(-0.75, -0.5), Vec2::new(-0.25, -0.1)]);
        let mesh = &scene.objects[0].mesh;
        assert_eq!(cell_displacement(mesh, 0, &[0, 1]), Some(Vec2::new(-1.0, -1.0)));
    }

    #[test]
    fn test_normalize_moves_island_home() {
        let scene = scene_with_uvs(vec![Vec2::new(3.25, 0.5), Vec2::new(3.75, 0.75)]);
        let edits = normalize_uvs(&scene, &[set_of(vec![0, 1])]).unwrap();
        assert_eq!(edits[0][0].uv, Vec2::new(0.25, 0.5));
        assert_eq!(edits[0][1].uv, Vec2::new(0.75, 0.75));
        // The scene is untouched.
        assert_eq!(scene.objects[0].mesh.uv(0, 0), Some(Vec2::new(3.25, 0.5)));
    }

    #[test]
    fn test_pack_uvs_remaps_into_rectangles() {
        let mut scene = scene_with_uvs(vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 1.0),
        ]);
        let sets = vec![set_of(vec![0, 1]), set_of(vec![2, 3])];

        let layout = pack_uvs(&scene, &sets, &ratios(&[0.5, 0.5], &[0.5, 0.5])).unwrap();
        assert_eq!(layout.rectangles.len(), 2);
        assert_eq!(layout.edits.len(), 4);

        layout.apply(&mut scene);
        let mesh = &scene.objects[0].mesh;
        let first = layout.rectangle(0).unwrap().position.unwrap();
        let second = layout.rectangle(1).unwrap().position.unwrap();
        assert_ne!(first, second);
        assert_eq!(mesh.uv(0, 0), Some(Vec2::new(first[0] as f32, first[1] as f32)));
        assert_eq!(
            mesh.uv(0, 3),
            Some(Vec2::new(second[0] as f32 + 0.5, second[1] as f32 + 0.5))
        );
    }

    #[test]
    fn test_pack_uvs_skips_imageless_sets() {
        let scene = scene_with_uvs(vec![Vec2::ZERO, Vec2::ONE, Vec2::ZERO, Vec2::ONE]);
        let sets = vec![set_of(vec![0, 1]), set_of(vec![2, 3])];

        let layout = pack_uvs(&scene, &sets, &ratios(&[1.0, 0.0], &[1.0, 0.0])).unwrap();
        assert_eq!(layout.rectangles.len(), 1);
        assert!(layout.rectangle(1).is_none());
        assert!(layout.edits.iter().all(|e| e.loop_index < 2));
    }

    #[test]
    fn test_failed_pack_leaves_uvs_untouched() {
        let coords = vec![Vec2::new(0.1, 0.2), Vec2::new(1.3, 0.9), Vec2::new(0.5, 0.5)];
        let scene = scene_with_uvs(coords.clone());
        let sets = vec![set_of(vec![0]), set_of(vec![1]), set_of(vec![2])];

        let result = pack_uvs(&scene, &sets, &ratios(&[0.6; 3], &[0.6; 3]));
        assert!(matches!(result, Err(FastpackError::Packing { islands: 3 })));
        assert_eq!(scene.objects[0].mesh.uv_layers[0].data, coords);
    }
}
