//! Repointing image-texture nodes at their atlas.

use crate::error::Result;
use crate::graph::{collect_root_image_nodes, find_roots, MaterialGraph};
use crate::scene::Scene;
use crate::types::{MaterialId, NodeId, ObjectId};
use std::collections::{BTreeSet, HashMap, HashSet};

/// A pending change of one node's image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSwap {
    pub material: MaterialId,
    pub node: NodeId,
    /// Atlas image the node will reference.
    pub image: String,
}

impl NodeSwap {
    /// Point the node at its atlas. Swaps for vanished nodes are ignored.
    pub fn apply(&self, scene: &mut Scene) {
        if let Some(node) = scene
            .material_mut(self.material)
            .and_then(|m| m.nodes.get_mut(self.node.0))
        {
            node.image = Some(self.image.clone());
        }
    }
}

/// Find every image-texture node that still references a packed image.
///
/// `atlas_for_image` maps original image names to atlas image names. Each
/// material is visited once even when several slots or objects share it.
/// Slots whose graph does not resolve are skipped.
pub fn replace_images(
    scene: &Scene,
    objects: &[ObjectId],
    blacklist: &BTreeSet<String>,
    atlas_for_image: &HashMap<String, String>,
) -> Result<Vec<NodeSwap>> {
    let mut swaps = Vec::new();
    let mut visited: HashSet<MaterialId> = HashSet::new();
    let mut swapped: HashSet<(MaterialId, NodeId)> = HashSet::new();

    for &object_id in objects {
        let object = scene.object(object_id)?;

        for material_name in &object.material_slots {
            let Ok(material_id) = scene.material_id(material_name) else {
                continue;
            };
            if !visited.insert(material_id) {
                continue;
            }
            let Some(material) = scene.material(material_id) else {
                continue;
            };

            let resolved = MaterialGraph::build(material)
                .and_then(|graph| find_roots(&graph, blacklist).map(|roots| (graph, roots)));
            let (graph, roots) = match resolved {
                Ok(found) => found,
                Err(e) => {
                    log::debug!("Not rewriting material {}: {}", material.name, e);
                    continue;
                }
            };

            for root in roots {
                for node_id in collect_root_image_nodes(&graph, root) {
                    let Some(image) = material.nodes[node_id.0].image.as_deref() else {
                        continue;
                    };
                    let Some(atlas) = atlas_for_image.get(image) else {
                        continue;
                    };
                    if swapped.insert((material_id, node_id)) {
                        swaps.push(NodeSwap {
                            material: material_id,
                            node: node_id,
                            image: atlas.clone(),
                        });
                    }
                }
            }
        }
    }

    log::debug!("Staged {} image node swaps", swaps.len());
    Ok(swaps)
}
