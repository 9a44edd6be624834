//! Material node networks.

use crate::types::{Interpolation, NodeKind};
use serde::{Deserialize, Serialize};

/// A node in a material's network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialNode {
    /// Node name, unique within its material.
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Image referenced by an image-texture node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Resampling mode of an image-texture node.
    #[serde(default)]
    pub interpolation: Interpolation,
    /// UV map chosen by a UV-map selector node. Empty means the active map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uv_map: Option<String>,
}

impl MaterialNode {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            image: None,
            interpolation: Interpolation::default(),
            uv_map: None,
        }
    }

    /// An image-texture node sampling `image`.
    pub fn image_texture(name: impl Into<String>, image: impl Into<String>) -> Self {
        let mut node = Self::new(name, NodeKind::ImageTexture);
        node.image = Some(image.into());
        node
    }

    /// A UV-map selector node.
    pub fn uv_map(name: impl Into<String>, uv_map: impl Into<String>) -> Self {
        let mut node = Self::new(name, NodeKind::UvMap);
        node.uv_map = Some(uv_map.into());
        node
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }
}

/// A directed connection from one node's output socket to another's input socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeLink {
    pub from_node: String,
    pub from_socket: String,
    pub to_node: String,
    pub to_socket: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<MaterialNode>,
    #[serde(default)]
    pub links: Vec<NodeLink>,
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            links: Vec::new(),
        }
    }

    pub fn with_node(mut self, node: MaterialNode) -> Self {
        self.nodes.push(node);
        self
    }

    /// Connect `from.from_socket` to `to.to_socket`.
    pub fn with_link(mut self, from: &str, from_socket: &str, to: &str, to_socket: &str) -> Self {
        self.links.push(NodeLink {
            from_node: from.to_string(),
            from_socket: from_socket.to_string(),
            to_node: to.to_string(),
            to_socket: to_socket.to_string(),
        });
        self
    }

    /// Index of the node with the given name.
    pub fn node_index(&self, name: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.name == name)
    }
}
