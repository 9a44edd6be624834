//! Scene snapshot: the objects, materials and images the packer works on.
//!
//! This module is the host collaborator's side of the pipeline. A [`Scene`]
//! can be assembled in code or loaded from a directory / ZIP bundle
//! containing a `scene.json` plus the image files it references.

pub mod images;
pub mod loader;
pub mod material;
pub mod mesh;

pub use images::SceneImage;
pub use material::{Material, MaterialNode, NodeLink};
pub use mesh::{Mesh, Polygon, UvLayer};

use crate::error::{FastpackError, Result};
use crate::types::{MaterialId, ObjectId};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A mesh object with its material slots.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneObject {
    pub name: String,
    /// Material names, one per slot. Polygons index into this list.
    #[serde(default)]
    pub material_slots: Vec<String>,
    pub mesh: Mesh,
}

impl SceneObject {
    pub fn new(name: impl Into<String>, mesh: Mesh) -> Self {
        Self {
            name: name.into(),
            material_slots: Vec::new(),
            mesh,
        }
    }

    pub fn with_material(mut self, material: impl Into<String>) -> Self {
        self.material_slots.push(material.into());
        self
    }
}

/// A snapshot of everything the packer reads and, at commit time, rewrites.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub images: Vec<SceneImage>,
    #[serde(default)]
    pub materials: Vec<Material>,
    #[serde(default)]
    pub objects: Vec<SceneObject>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an image, replacing any existing image with the same name.
    pub fn add_image(&mut self, image: SceneImage) {
        match self.images.iter_mut().find(|i| i.name == image.name) {
            Some(existing) => *existing = image,
            None => self.images.push(image),
        }
    }

    /// Add a material and return its id.
    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.push(material);
        MaterialId(self.materials.len() - 1)
    }

    /// Add an object and return its id.
    pub fn add_object(&mut self, object: SceneObject) -> ObjectId {
        self.objects.push(object);
        ObjectId(self.objects.len() - 1)
    }

    /// Get an image by name.
    pub fn image(&self, name: &str) -> Option<&SceneImage> {
        self.images.iter().find(|i| i.name == name)
    }

    pub fn object(&self, id: ObjectId) -> Result<&SceneObject> {
        self.objects
            .get(id.0)
            .ok_or_else(|| FastpackError::UnknownObject(format!("#{}", id.0)))
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Result<&mut SceneObject> {
        self.objects
            .get_mut(id.0)
            .ok_or_else(|| FastpackError::UnknownObject(format!("#{}", id.0)))
    }

    /// Look an object up by name.
    pub fn find_object(&self, name: &str) -> Option<ObjectId> {
        self.objects.iter().position(|o| o.name == name).map(ObjectId)
    }

    /// All object ids, in scene order.
    pub fn object_ids(&self) -> Vec<ObjectId> {
        (0..self.objects.len()).map(ObjectId).collect()
    }

    /// Look a material up by name.
    pub fn material_id(&self, name: &str) -> Result<MaterialId> {
        self.materials
            .iter()
            .position(|m| m.name == name)
            .map(MaterialId)
            .ok_or_else(|| FastpackError::UnknownMaterial(name.to_string()))
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0)
    }

    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(id.0)
    }

    /// Write the scene description as JSON. Image pixels are not embedded.
    ///
    /// Image paths under the file's directory are stored relative to it, so
    /// the written scene loads back with [`loader::load_from_path`].
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let base = absolute(path.parent().unwrap_or_else(|| Path::new("")))?;

        let images = self
            .images
            .iter()
            .map(|image| {
                Ok(SceneImage {
                    name: image.name.clone(),
                    path: image
                        .path
                        .as_deref()
                        .map(|p| relative_to(p, &base))
                        .transpose()?,
                    width: image.width,
                    height: image.height,
                    pixels: None,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let file = SceneFile {
            images: &images,
            materials: &self.materials,
            objects: &self.objects,
        };
        std::fs::write(path, serde_json::to_string_pretty(&file)?)?;
        Ok(())
    }

    /// Parse a scene description without loading any image files.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Borrowed view of a [`Scene`] with rewritten image paths.
#[derive(Serialize)]
struct SceneFile<'a> {
    images: &'a [SceneImage],
    materials: &'a [Material],
    objects: &'a [SceneObject],
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// `path` relative to `base` when it lies under it, otherwise absolute.
fn relative_to(path: &Path, base: &Path) -> Result<PathBuf> {
    let path = absolute(path)?;
    Ok(match path.strip_prefix(base) {
        Ok(relative) => relative.to_path_buf(),
        Err(_) => path,
    })
}
