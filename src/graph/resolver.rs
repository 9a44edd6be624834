//! Texture dependency resolution over a [`MaterialGraph`].
//!
//! Root search starts at the material output and flattens shader-mix nodes,
//! so every shader feeding a blend is treated as its own root. Image search
//! then walks each root's input chains down to image-texture nodes.

use super::MaterialGraph;
use crate::error::{FastpackError, Result};
use crate::scene::Mesh;
use crate::types::{Interpolation, NodeId, NodeKind};
use std::collections::{BTreeSet, HashSet};

/// Input socket of the output node that carries the surface shader.
pub const SURFACE_SOCKET: &str = "Surface";
/// Shader inputs of a shader-mix node.
pub const SHADER_SOCKET: &str = "Shader";
/// Texture-coordinate input of an image-texture node.
pub const VECTOR_SOCKET: &str = "Vector";

/// An image discovered under a root socket.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRef {
    /// Image name.
    pub image: String,
    /// Name of the UV channel the image is sampled with.
    pub uv_map: String,
    /// Index of that channel in the mesh.
    pub uv_slot: usize,
    pub interpolation: Interpolation,
    /// Root socket the image was found under, e.g. "Base Color".
    pub socket: String,
    /// The image-texture node itself.
    pub node: NodeId,
}

/// Find the shading roots of a material.
///
/// Returns nodes in stack-pop order. Blacklisted kinds are dropped, shader-mix
/// nodes are replaced by their shader inputs.
pub fn find_roots(graph: &MaterialGraph, blacklist: &BTreeSet<String>) -> Result<Vec<NodeId>> {
    let output = graph
        .nodes()
        .find(|n| n.node.kind == NodeKind::Output)
        .ok_or_else(|| FastpackError::GraphInconsistency("no linked output node".to_string()))?;

    let mut roots = Vec::new();
    let mut seen = HashSet::new();
    let mut stack: Vec<NodeId> = output.first_input(SURFACE_SOCKET).into_iter().collect();

    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        let Some(current) = graph.node(id) else {
            continue;
        };

        if current.node.kind == NodeKind::ShaderMix {
            stack.extend_from_slice(current.input(SHADER_SOCKET));
        } else if blacklist.contains(current.node.kind.name()) {
            log::debug!("Skipping blacklisted root {}", current.node.name);
        } else {
            roots.push(id);
        }
    }

    Ok(roots)
}

/// Collect every image-texture node feeding `root.socket`.
///
/// Traversal stops at image-texture nodes and passes through every other kind.
/// A node reachable along several branches is visited once.
pub fn collect_image_nodes(graph: &MaterialGraph, root: NodeId, socket: &str) -> Vec<NodeId> {
    let Some(root_node) = graph.node(root) else {
        return Vec::new();
    };

    let mut found = Vec::new();
    let mut seen = HashSet::new();
    let mut stack: Vec<NodeId> = root_node.input(socket).to_vec();

    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        let Some(current) = graph.node(id) else {
            continue;
        };

        if current.node.kind == NodeKind::ImageTexture {
            found.push(id);
        } else {
            for links in &current.inputs {
                stack.extend_from_slice(&links.nodes);
            }
        }
    }

    found
}

/// Collect the images feeding `root.socket`, with the UV channel each one uses.
///
/// The channel is the mesh's active UV map unless the image node's `Vector`
/// input is wired to a UV-map selector naming another map.
pub fn collect_images(
    graph: &MaterialGraph,
    mesh: &Mesh,
    root: NodeId,
    socket: &str,
) -> Result<Vec<ImageRef>> {
    let mut images = Vec::new();
    for id in collect_image_nodes(graph, root, socket) {
        images.extend(image_ref(graph, mesh, id, socket)?);
    }
    Ok(images)
}

/// Collect every image a root depends on, across all of its linked input sockets.
///
/// A root that is itself an image-texture node (wired straight into the
/// output) yields that image under the [`SURFACE_SOCKET`] label.
pub fn collect_root_images(graph: &MaterialGraph, mesh: &Mesh, root: NodeId) -> Result<Vec<ImageRef>> {
    let Some(root_node) = graph.node(root) else {
        return Ok(Vec::new());
    };

    if root_node.node.kind == NodeKind::ImageTexture {
        return Ok(image_ref(graph, mesh, root, SURFACE_SOCKET)?.into_iter().collect());
    }

    let mut images = Vec::new();
    for socket in root_node.input_sockets() {
        images.extend(collect_images(graph, mesh, root, socket)?);
    }
    Ok(images)
}

/// Image-texture nodes a root depends on, across all of its linked input sockets.
pub fn collect_root_image_nodes(graph: &MaterialGraph, root: NodeId) -> Vec<NodeId> {
    let Some(root_node) = graph.node(root) else {
        return Vec::new();
    };

    if root_node.node.kind == NodeKind::ImageTexture {
        return vec![root];
    }

    root_node
        .input_sockets()
        .flat_map(|socket| collect_image_nodes(graph, root, socket))
        .collect()
}

/// Describe one image-texture node. Nodes without an image yield `None`.
fn image_ref(graph: &MaterialGraph, mesh: &Mesh, id: NodeId, socket: &str) -> Result<Option<ImageRef>> {
    let Some(tex) = graph.node(id) else {
        return Ok(None);
    };
    let Some(image) = tex.node.image.clone() else {
        log::debug!("Image node {} has no image", tex.node.name);
        return Ok(None);
    };

    let uv_map = resolve_uv_map(graph, mesh, id)?;
    let uv_slot = mesh.uv_slot(&uv_map).ok_or_else(|| {
        FastpackError::GraphInconsistency(format!(
            "image {} samples unknown UV map {}",
            image, uv_map
        ))
    })?;

    Ok(Some(ImageRef {
        image,
        uv_map,
        uv_slot,
        interpolation: tex.node.interpolation,
        socket: socket.to_string(),
        node: id,
    }))
}

fn resolve_uv_map(graph: &MaterialGraph, mesh: &Mesh, tex: NodeId) -> Result<String> {
    let selected = graph
        .node(tex)
        .and_then(|n| n.first_input(VECTOR_SOCKET))
        .and_then(|id| graph.node(id))
        .filter(|n| n.node.kind == NodeKind::UvMap)
        .and_then(|n| n.node.uv_map.clone())
        .filter(|name| !name.is_empty());

    match selected {
        Some(name) => Ok(name),
        None => mesh
            .active_uv_layer()
            .map(|l| l.name.clone())
            .ok_or_else(|| FastpackError::GraphInconsistency("mesh has no UV layers".to_string())),
    }
}
