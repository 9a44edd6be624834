//! Material graph snapshot and dependency resolution.
//!
//! A [`MaterialGraph`] is built once per material per pass from its link list.
//! Every link is recorded on both endpoints so the graph can be walked from
//! consumers to producers and back.

pub mod resolver;

pub use resolver::{
    collect_image_nodes, collect_images, collect_root_image_nodes, collect_root_images, find_roots,
    ImageRef,
};

use crate::error::{FastpackError, Result};
use crate::scene::{Material, MaterialNode};
use crate::types::NodeId;
use std::collections::BTreeMap;

/// Links attached to one named socket, in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct SocketLinks {
    pub socket: String,
    pub nodes: Vec<NodeId>,
}

/// A node together with its neighbours per socket.
#[derive(Debug, Clone)]
pub struct GraphNode {
    pub id: NodeId,
    /// Owned copy of the node's data.
    pub node: MaterialNode,
    /// Producers feeding each input socket.
    pub inputs: Vec<SocketLinks>,
    /// Consumers of each output socket.
    pub outputs: Vec<SocketLinks>,
}

impl GraphNode {
    fn new(id: NodeId, node: MaterialNode) -> Self {
        Self {
            id,
            node,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Producers linked into an input socket.
    pub fn input(&self, socket: &str) -> &[NodeId] {
        find_socket(&self.inputs, socket)
    }

    /// Consumers linked from an output socket.
    pub fn output(&self, socket: &str) -> &[NodeId] {
        find_socket(&self.outputs, socket)
    }

    pub fn first_input(&self, socket: &str) -> Option<NodeId> {
        self.input(socket).first().copied()
    }

    pub fn first_output(&self, socket: &str) -> Option<NodeId> {
        self.output(socket).first().copied()
    }

    /// Names of linked input sockets, in the order they were first linked.
    pub fn input_sockets(&self) -> impl Iterator<Item = &str> {
        self.inputs.iter().map(|s| s.socket.as_str())
    }

    fn add_link(list: &mut Vec<SocketLinks>, socket: &str, node: NodeId) {
        match list.iter_mut().find(|s| s.socket == socket) {
            Some(links) => links.nodes.push(node),
            None => list.push(SocketLinks {
                socket: socket.to_string(),
                nodes: vec![node],
            }),
        }
    }
}

fn find_socket<'a>(list: &'a [SocketLinks], socket: &str) -> &'a [NodeId] {
    list.iter()
        .find(|s| s.socket == socket)
        .map(|s| s.nodes.as_slice())
        .unwrap_or(&[])
}

/// Adjacency snapshot of one material's node network.
///
/// Only nodes that take part in at least one link are present.
#[derive(Debug, Clone, Default)]
pub struct MaterialGraph {
    nodes: BTreeMap<NodeId, GraphNode>,
}

impl MaterialGraph {
    /// Build the graph from a material's links.
    pub fn build(material: &Material) -> Result<Self> {
        let mut nodes: BTreeMap<NodeId, GraphNode> = BTreeMap::new();

        for link in &material.links {
            let from = resolve_node(material, &link.from_node)?;
            let to = resolve_node(material, &link.to_node)?;

            for id in [from, to] {
                nodes
                    .entry(id)
                    .or_insert_with(|| GraphNode::new(id, material.nodes[id.0].clone()));
            }

            if let Some(source) = nodes.get_mut(&from) {
                GraphNode::add_link(&mut source.outputs, &link.from_socket, to);
            }
            if let Some(dest) = nodes.get_mut(&to) {
                GraphNode::add_link(&mut dest.inputs, &link.to_socket, from);
            }
        }

        Ok(Self { nodes })
    }

    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

fn resolve_node(material: &Material, name: &str) -> Result<NodeId> {
    material.node_index(name).map(NodeId).ok_or_else(|| {
        FastpackError::GraphInconsistency(format!(
            "material {} links unknown node {}",
            material.name, name
        ))
    })
}
