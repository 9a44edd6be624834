//! # Fastpack
//!
//! Texture atlasing for node-based materials.
//!
//! ## Overview
//!
//! Given a scene of mesh objects whose materials sample image textures,
//! this library finds which UV islands share images, packs those islands into
//! the unit square, composites one atlas image per group of shader sockets,
//! and rewrites the materials to sample the atlases instead.
//!
//! ## Quick Start
//!
//! ```ignore
//! use fastpack::{load_scene, PackSession, PackerConfig};
//!
//! let mut scene = load_scene("path/to/scene.zip")?;
//! let config = PackerConfig::default().with_output_dir("atlases");
//!
//! // Discover images and sub-UV sets
//! let mut session = PackSession::refresh(&scene, &scene.object_ids(), &config.node_blacklist)?;
//!
//! // Put normal maps into the same atlas as the base color
//! session.set_group("Normal", 0)?;
//!
//! // Pack, composite and rewrite; the scene is untouched on error
//! let report = session.build(&mut scene, &config)?;
//! scene.save_json("scene_baked.json")?;
//! ```

pub mod atlas;
pub mod config;
pub mod error;
pub mod graph;
pub mod packer;
pub mod registry;
pub mod scene;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use atlas::{Atlas, NodeSwap};
pub use config::PackerConfig;
pub use error::{FastpackError, Result};
pub use graph::MaterialGraph;
pub use packer::{pack_rects, UvRectangle};
pub use registry::{ImagePackEntry, Registry, SubUvSet, UvReference};
pub use scene::{Material, MaterialNode, Mesh, Scene, SceneImage, SceneObject};
pub use session::{BuildReport, CancelToken, ChangeSet, GroupAssignment, PackSession};
pub use types::{GroupId, Interpolation, MaterialId, NodeKind, ObjectId};

/// Load a scene from a file path (ZIP bundle, directory or `.json` scene file).
pub fn load_scene<P: AsRef<std::path::Path>>(path: P) -> Result<Scene> {
    scene::loader::load_from_path(path)
}

/// Load a scene from the bytes of a ZIP bundle.
pub fn load_scene_from_bytes(data: &[u8]) -> Result<Scene> {
    scene::loader::load_from_bytes(data)
}
