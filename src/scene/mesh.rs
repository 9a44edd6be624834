//! Mesh data as the packer sees it: polygons, material slots and UV loops.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// A named UV channel holding one coordinate per loop.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UvLayer {
    pub name: String,
    #[serde(default)]
    pub data: Vec<Vec2>,
}

impl UvLayer {
    pub fn new(name: impl Into<String>, data: Vec<Vec2>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// A polygon: a contiguous run of loops assigned to one material slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Polygon {
    pub loop_start: usize,
    pub loop_total: usize,
    #[serde(default)]
    pub material_index: usize,
}

impl Polygon {
    pub fn new(loop_start: usize, loop_total: usize, material_index: usize) -> Self {
        Self {
            loop_start,
            loop_total,
            material_index,
        }
    }

    /// Loop indices of this polygon.
    pub fn loop_indices(&self) -> std::ops::Range<usize> {
        self.loop_start..self.loop_start + self.loop_total
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    #[serde(default)]
    pub uv_layers: Vec<UvLayer>,
    /// Index of the active UV layer.
    #[serde(default)]
    pub active_uv: usize,
    #[serde(default)]
    pub polygons: Vec<Polygon>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_uv_layer(mut self, layer: UvLayer) -> Self {
        self.uv_layers.push(layer);
        self
    }

    pub fn with_polygon(mut self, polygon: Polygon) -> Self {
        self.polygons.push(polygon);
        self
    }

    /// The active UV layer, if the mesh has any.
    pub fn active_uv_layer(&self) -> Option<&UvLayer> {
        self.uv_layers.get(self.active_uv)
    }

    /// Index of the UV layer with the given name.
    pub fn uv_slot(&self, name: &str) -> Option<usize> {
        self.uv_layers.iter().position(|l| l.name == name)
    }

    /// Get a loop's UV on a channel.
    pub fn uv(&self, uv_slot: usize, loop_index: usize) -> Option<Vec2> {
        self.uv_layers
            .get(uv_slot)
            .and_then(|l| l.data.get(loop_index))
            .copied()
    }

    /// Set a loop's UV on a channel. Out-of-range writes are ignored.
    pub fn set_uv(&mut self, uv_slot: usize, loop_index: usize, uv: Vec2) {
        if let Some(slot) = self
            .uv_layers
            .get_mut(uv_slot)
            .and_then(|l| l.data.get_mut(loop_index))
        {
            *slot = uv;
        }
    }
}
