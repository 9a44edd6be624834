//! Packing sessions: discovery, regrouping and all-or-nothing builds.
//!
//! A [`PackSession`] is created by [`PackSession::refresh`] from the current
//! scene. Its socket groups can be edited before calling
//! [`PackSession::build`], which computes every change up front and only
//! touches the scene once nothing can fail any more.

use crate::atlas::{pack_images, replace_images, Atlas, NodeSwap};
use crate::config::PackerConfig;
use crate::error::{FastpackError, Result};
use crate::packer::{calculate_uv_ratios, check_surface, pack_uvs, size_group_images, UvLayout};
use crate::registry::{self, ImagePackEntry, Registry, SubUvSet};
use crate::scene::{Scene, SceneImage};
use crate::types::{GroupId, ObjectId};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag for aborting a build between image operations.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once the token has been tripped.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(FastpackError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Which atlas the images found under a socket go to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupAssignment {
    pub socket: String,
    pub group: GroupId,
}

/// Every scene mutation a build will make.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub uv: UvLayout,
    pub atlases: Vec<Atlas>,
    pub swaps: Vec<NodeSwap>,
}

impl ChangeSet {
    /// Write every atlas into `dir`, in group order.
    pub fn write_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        self.atlases.iter().map(|atlas| atlas.save(dir)).collect()
    }

    /// Apply the change set. `paths` are the files the atlases were written to, if any.
    pub fn commit(self, scene: &mut Scene, paths: &[PathBuf]) {
        self.uv.apply(scene);

        for (i, atlas) in self.atlases.into_iter().enumerate() {
            let mut image = SceneImage::from_rgba(atlas.name, atlas.image);
            image.path = paths.get(i).cloned();
            scene.add_image(image);
        }

        for swap in &self.swaps {
            swap.apply(scene);
        }
    }
}

/// Summary of one atlas produced by a build.
#[derive(Debug, Clone, PartialEq)]
pub struct AtlasSummary {
    pub group: GroupId,
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub path: Option<PathBuf>,
}

/// What a successful build changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildReport {
    pub atlases: Vec<AtlasSummary>,
    /// Sub-UV sets that received a rectangle.
    pub packed_sets: usize,
    /// Loop coordinates rewritten.
    pub uv_edits: usize,
    /// Image-texture nodes repointed at an atlas.
    pub swapped_nodes: usize,
}

/// Discovery results for a set of objects plus the editable socket groups.
#[derive(Debug, Clone)]
pub struct PackSession {
    objects: Vec<ObjectId>,
    blacklist: BTreeSet<String>,
    registry: Registry,
    groups: Vec<GroupAssignment>,
}

impl PackSession {
    /// Run discovery over `objects`.
    ///
    /// Every socket label found gets its own group, numbered in discovery order.
    pub fn refresh(scene: &Scene, objects: &[ObjectId], blacklist: &BTreeSet<String>) -> Result<Self> {
        let registry = registry::retrieve(scene, objects, blacklist)?;
        let groups = registry
            .sockets()
            .into_iter()
            .enumerate()
            .map(|(i, socket)| GroupAssignment {
                socket,
                group: i as GroupId,
            })
            .collect();

        Ok(Self {
            objects: objects.to_vec(),
            blacklist: blacklist.clone(),
            registry,
            groups,
        })
    }

    pub fn objects(&self) -> &[ObjectId] {
        &self.objects
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn entries(&self) -> &[ImagePackEntry] {
        self.registry.entries()
    }

    pub fn sub_uv_sets(&self) -> &[SubUvSet] {
        self.registry.sub_uv_sets()
    }

    pub fn groups(&self) -> &[GroupAssignment] {
        &self.groups
    }

    pub fn groups_mut(&mut self) -> &mut [GroupAssignment] {
        &mut self.groups
    }

    /// Move a socket's images to another group.
    pub fn set_group(&mut self, socket: &str, group: GroupId) -> Result<()> {
        let assignment = self
            .groups
            .iter_mut()
            .find(|g| g.socket == socket)
            .ok_or_else(|| FastpackError::UnknownSocket(socket.to_string()))?;
        assignment.group = group;
        Ok(())
    }

    pub fn group_of(&self, socket: &str) -> Option<GroupId> {
        self.groups.iter().find(|g| g.socket == socket).map(|g| g.group)
    }

    /// Entry indices per group.
    pub fn group_images(&self) -> BTreeMap<GroupId, Vec<usize>> {
        let mut groups: BTreeMap<GroupId, Vec<usize>> = BTreeMap::new();
        for (i, entry) in self.entries().iter().enumerate() {
            match self.group_of(&entry.socket) {
                Some(group) => groups.entry(group).or_default().push(i),
                None => log::warn!("Socket {} has no group, skipping {}", entry.socket, entry.image),
            }
        }
        groups
    }

    /// Compute every change a build would make without touching the scene.
    pub fn plan(&self, scene: &Scene, max_resolution: u32, cancel: &CancelToken) -> Result<ChangeSet> {
        let entries = self.entries();
        let sets = self.sub_uv_sets();
        if entries.is_empty() {
            log::warn!("No images discovered, nothing to pack");
            return Ok(ChangeSet::default());
        }

        let ratios = calculate_uv_ratios(entries, sets.len(), max_resolution);
        check_surface(&ratios, max_resolution)?;

        let group_images = self.group_images();
        let scaling = size_group_images(&group_images, entries, &ratios.areas);

        let uv = pack_uvs(scene, sets, &ratios)?;
        let atlases = pack_images(
            scene,
            entries,
            &group_images,
            &scaling,
            &uv.rectangles,
            max_resolution,
            cancel,
        )?;

        let atlas_for_image: HashMap<String, String> = group_images
            .iter()
            .flat_map(|(&group, members)| {
                members
                    .iter()
                    .map(move |&i| (entries[i].image.clone(), Atlas::image_name(group)))
            })
            .collect();
        let swaps = replace_images(scene, &self.objects, &self.blacklist, &atlas_for_image)?;

        Ok(ChangeSet { uv, atlases, swaps })
    }

    /// Build atlases and rewrite the scene.
    ///
    /// On error the scene is unchanged.
    pub fn build(&self, scene: &mut Scene, config: &PackerConfig) -> Result<BuildReport> {
        self.build_with_cancel(scene, config, &CancelToken::new())
    }

    pub fn build_with_cancel(
        &self,
        scene: &mut Scene,
        config: &PackerConfig,
        cancel: &CancelToken,
    ) -> Result<BuildReport> {
        let changes = self.plan(scene, config.max_resolution, cancel)?;
        cancel.check()?;

        let paths = if config.write_files {
            changes.write_files(&config.output_dir)?
        } else {
            Vec::new()
        };

        let report = BuildReport {
            atlases: changes
                .atlases
                .iter()
                .enumerate()
                .map(|(i, atlas)| AtlasSummary {
                    group: atlas.group,
                    name: atlas.name.clone(),
                    width: atlas.width(),
                    height: atlas.height(),
                    path: paths.get(i).cloned(),
                })
                .collect(),
            packed_sets: changes.uv.rectangles.len(),
            uv_edits: changes.uv.edits.len(),
            swapped_nodes: changes.swaps.len(),
        };

        changes.commit(scene, &paths);

        log::info!(
            "Built {} atlases from {} images; {} sets packed, {} nodes repointed",
            report.atlases.len(),
            self.entries().len(),
            report.packed_sets,
            report.swapped_nodes
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Material, MaterialNode, Mesh, Polygon, SceneObject, UvLayer};
    use crate::types::NodeKind;
    use glam::Vec2;

    fn quad_mesh() -> Mesh {
        Mesh::new()
            .with_uv_layer(UvLayer::new(
                "UVMap",
                vec![
                    Vec2::new(0.0, 0.0),
                    Vec2::new(1.0, 0.0),
                    Vec2::new(1.0, 1.0),
                    Vec2::new(0.0, 1.0),
                ],
            ))
            .with_polygon(Polygon::new(0, 4, 0))
    }

    fn pbr_scene() -> Scene {
        let mut scene = Scene::new();
        scene.add_image(SceneImage::solid("albedo", 64, 64, [255, 0, 0, 255]));
        scene.add_image(SceneImage::solid("normal", 32, 32, [128, 128, 255, 255]));
        scene.add_material(
            Material::new("pbr")
                .with_node(MaterialNode::new("Out", NodeKind::Output))
                .with_node(MaterialNode::new("BSDF", NodeKind::other("principled_bsdf")))
                .with_node(MaterialNode::image_texture("Albedo", "albedo"))
                .with_node(MaterialNode::image_texture("Normal", "normal"))
                .with_link("BSDF", "BSDF", "Out", "Surface")
                .with_link("Albedo", "Color", "BSDF", "Base Color")
                .with_link("Normal", "Color", "BSDF", "Normal"),
        );
        scene.add_object(SceneObject::new("box", quad_mesh()).with_material("pbr"));
        scene
    }

    fn memory_config(max_resolution: u32) -> PackerConfig {
        PackerConfig::default()
            .with_max_resolution(max_resolution)
            .with_write_files(false)
    }

    #[test]
    fn test_cancel_token() {
        let token = CancelToken::new();
        let shared = token.clone();
        assert!(token.check().is_ok());
        shared.cancel();
        assert!(token.is_cancelled());
        assert!(matches!(token.check(), Err(FastpackError::Cancelled)));
    }

    #[test]
    fn test_default_groups_per_socket() {
        let scene = pbr_scene();
        let session = PackSession::refresh(&scene, &scene.object_ids(), &BTreeSet::new()).unwrap();

        assert_eq!(
            session.groups(),
            &[
                GroupAssignment {
                    socket: "Base Color".to_string(),
                    group: 0
                },
                GroupAssignment {
                    socket: "Normal".to_string(),
                    group: 1
                },
            ]
        );
        let groups = session.group_images();
        assert_eq!(groups[&0], vec![0]);
        assert_eq!(groups[&1], vec![1]);
    }

    #[test]
    fn test_set_group() {
        let scene = pbr_scene();
        let mut session = PackSession::refresh(&scene, &scene.object_ids(), &BTreeSet::new()).unwrap();

        session.set_group("Normal", 0).unwrap();
        assert_eq!(session.group_images()[&0], vec![0, 1]);
        assert!(matches!(
            session.set_group("Roughness", 2),
            Err(FastpackError::UnknownSocket(_))
        ));

        session.groups_mut()[0].group = 7;
        assert_eq!(session.group_of("Base Color"), Some(7));
    }

    #[test]
    fn test_build_in_memory() {
        let mut scene = pbr_scene();
        let session = PackSession::refresh(&scene, &scene.object_ids(), &BTreeSet::new()).unwrap();

        let report = session.build(&mut scene, &memory_config(64)).unwrap();

        assert_eq!(report.atlases.len(), 2);
        assert_eq!(report.packed_sets, 1);
        assert_eq!(report.uv_edits, 4);
        assert_eq!(report.swapped_nodes, 2);
        // The normal map is a quarter of the albedo's area, so its atlas is half as wide.
        assert_eq!((report.atlases[0].width, report.atlases[1].width), (64, 32));
        assert!(report.atlases.iter().all(|a| a.path.is_none()));

        let material = &scene.materials[0];
        assert_eq!(material.nodes[2].image.as_deref(), Some("atlas_0"));
        assert_eq!(material.nodes[3].image.as_deref(), Some("atlas_1"));
        assert!(scene.image("atlas_0").is_some());
        assert!(scene.image("atlas_1").is_some());
    }

    #[test]
    fn test_oversize_leaves_scene_untouched() {
        let mut scene = pbr_scene();
        let session = PackSession::refresh(&scene, &scene.object_ids(), &BTreeSet::new()).unwrap();
        let before = scene.objects[0].mesh.clone();

        let result = session.build(&mut scene, &memory_config(32));

        assert!(matches!(result, Err(FastpackError::Oversize { .. })));
        assert_eq!(scene.objects[0].mesh, before);
        assert_eq!(scene.materials[0].nodes[2].image.as_deref(), Some("albedo"));
        assert!(scene.image("atlas_0").is_none());
    }

    #[test]
    fn test_cancelled_build_leaves_scene_untouched() {
        let mut scene = pbr_scene();
        let session = PackSession::refresh(&scene, &scene.object_ids(), &BTreeSet::new()).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();

        let result = session.build_with_cancel(&mut scene, &memory_config(64), &cancel);

        assert!(matches!(result, Err(FastpackError::Cancelled)));
        assert_eq!(scene.images.len(), 2);
        assert_eq!(scene.materials[0].nodes[3].image.as_deref(), Some("normal"));
    }

    #[test]
    fn test_plan_does_not_mutate() {
        let scene = pbr_scene();
        let session = PackSession::refresh(&scene, &scene.object_ids(), &BTreeSet::new()).unwrap();

        let changes = session.plan(&scene, 64, &CancelToken::new()).unwrap();
        assert_eq!(changes.uv.edits.len(), 4);
        assert_eq!(changes.atlases.len(), 2);
        assert_eq!(changes.swaps.len(), 2);
        assert_eq!(scene.images.len(), 2);
    }
}
