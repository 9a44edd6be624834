//! Shared types used throughout the library.

mod kinds;

pub use kinds::{Interpolation, NodeKind};

use serde::{Deserialize, Serialize};

/// Index of an object within a [`Scene`](crate::scene::Scene).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub usize);

/// Index of a material within a [`Scene`](crate::scene::Scene).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MaterialId(pub usize);

/// Index of a node within its material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Index of a sub-UV set within a packing session.
pub type SubUvIndex = usize;

/// Identifier of a target atlas. Editable per socket label before a build.
pub type GroupId = u32;
