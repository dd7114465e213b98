//! Meshes and their drawable primitives.

use std::{collections::BTreeMap, fmt};

use crate::data_structures::asset::AssetId;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    pub name: Option<String>,
    pub primitives: Vec<AssetId>,
}

/// Topology of a primitive, in glTF order (`Points` = 0 .. `TriangleFan` = 6).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PrimitiveMode {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    #[default]
    Triangles,
    TriangleStrip,
    TriangleFan,
}

impl PrimitiveMode {
    /// Device topology for this mode. Line loops and triangle fans have no
    /// direct equivalent.
    pub fn topology(self) -> Option<wgpu::PrimitiveTopology> {
        match self {
            PrimitiveMode::Points => Some(wgpu::PrimitiveTopology::PointList),
            PrimitiveMode::Lines => Some(wgpu::PrimitiveTopology::LineList),
            PrimitiveMode::LineStrip => Some(wgpu::PrimitiveTopology::LineStrip),
            PrimitiveMode::Triangles => Some(wgpu::PrimitiveTopology::TriangleList),
            PrimitiveMode::TriangleStrip => Some(wgpu::PrimitiveTopology::TriangleStrip),
            PrimitiveMode::LineLoop | PrimitiveMode::TriangleFan => None,
        }
    }
}

/// Vertex attribute semantics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttributeName {
    Position,
    Normal,
    Tangent,
    TexCoord(u32),
    Color(u32),
    Joints(u32),
    Weights(u32),
}

impl fmt::Display for AttributeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeName::Position => f.write_str("POSITION"),
            AttributeName::Normal => f.write_str("NORMAL"),
            AttributeName::Tangent => f.write_str("TANGENT"),
            AttributeName::TexCoord(set) => write!(f, "TEXCOORD_{}", set),
            AttributeName::Color(set) => write!(f, "COLOR_{}", set),
            AttributeName::Joints(set) => write!(f, "JOINTS_{}", set),
            AttributeName::Weights(set) => write!(f, "WEIGHTS_{}", set),
        }
    }
}

/// One drawable geometry batch.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Primitive {
    pub mode: PrimitiveMode,
    pub indices: Option<AssetId>,
    pub material: Option<AssetId>,
    pub attributes: BTreeMap<AttributeName, AssetId>,
    /// Morph target displacements.
    pub targets: BTreeMap<AttributeName, AssetId>,
}

impl Primitive {
    pub fn with_attribute(mut self, name: AttributeName, accessor: AssetId) -> Self {
        self.attributes.insert(name, accessor);
        self
    }

    pub fn with_indices(mut self, accessor: AssetId) -> Self {
        self.indices = Some(accessor);
        self
    }

    /// Every accessor this primitive reads: indices first, then attributes,
    /// then targets.
    pub fn accessors(&self) -> impl Iterator<Item = AssetId> + '_ {
        self.indices
            .into_iter()
            .chain(self.attributes.values().copied())
            .chain(self.targets.values().copied())
    }
}
