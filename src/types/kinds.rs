//! Node kinds and resampling modes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of a material-graph node, as far as atlasing cares.
///
/// Anything that is not one of the four structural kinds is carried as
/// [`NodeKind::Other`] with its original type name, so blacklists can match it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeKind {
    /// The material's final output node.
    Output,
    /// A shader blend; its shader inputs are flattened during root search.
    ShaderMix,
    /// An image lookup. Terminates dependency traversal.
    ImageTexture,
    /// Selects a named UV map for an image's `Vector` input.
    UvMap,
    /// Any other node; traversal passes through it.
    Other(String),
}

impl NodeKind {
    /// The canonical name of this kind.
    pub fn name(&self) -> &str {
        match self {
            NodeKind::Output => "output",
            NodeKind::ShaderMix => "shader_mix",
            NodeKind::ImageTexture => "image_texture",
            NodeKind::UvMap => "uv_map",
            NodeKind::Other(name) => name,
        }
    }

    pub fn other(name: impl Into<String>) -> Self {
        NodeKind::Other(name.into())
    }
}

impl From<&str> for NodeKind {
    fn from(name: &str) -> Self {
        match name {
            "output" | "ShaderNodeOutputMaterial" => NodeKind::Output,
            "shader_mix" | "ShaderNodeMixShader" => NodeKind::ShaderMix,
            "image_texture" | "ShaderNodeTexImage" => NodeKind::ImageTexture,
            "uv_map" | "ShaderNodeUVMap" => NodeKind::UvMap,
            other => NodeKind::Other(other.to_string()),
        }
    }
}

impl From<String> for NodeKind {
    fn from(name: String) -> Self {
        NodeKind::from(name.as_str())
    }
}

impl From<NodeKind> for String {
    fn from(kind: NodeKind) -> Self {
        kind.name().to_string()
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resampling mode used when an image is rescaled for its atlas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Interpolation {
    Nearest,
    #[default]
    Linear,
    Cubic,
}

impl Interpolation {
    pub fn name(self) -> &'static str {
        match self {
            Interpolation::Nearest => "nearest",
            Interpolation::Linear => "linear",
            Interpolation::Cubic => "cubic",
        }
    }

    /// The `image` crate filter implementing this mode.
    pub fn filter(self) -> image::imageops::FilterType {
        match self {
            Interpolation::Nearest => image::imageops::FilterType::Nearest,
            Interpolation::Linear => image::imageops::FilterType::Triangle,
            Interpolation::Cubic => image::imageops::FilterType::CatmullRom,
        }
    }
}

impl From<&str> for Interpolation {
    fn from(name: &str) -> Self {
        match name {
            "nearest" | "closest" | "Closest" => Interpolation::Nearest,
            "cubic" | "Cubic" | "smart" | "Smart" => Interpolation::Cubic,
            // Linear, and anything unrecognised
            _ => Interpolation::Linear,
        }
    }
}

impl From<String> for Interpolation {
    fn from(name: String) -> Self {
        Interpolation::from(name.as_str())
    }
}

impl From<Interpolation> for String {
    fn from(mode: Interpolation) -> Self {
        mode.name().to_string()
    }
}
