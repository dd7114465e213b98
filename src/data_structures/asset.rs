//! The asset arena.
//!
//! Every entity of the scene model lives in one [`Assets`] arena and is
//! addressed by an [`AssetId`]. Relations between assets (a node's children,
//! a primitive's accessors, ...) are id-to-id edges, so shared and even
//! cyclic graphs never form ownership cycles.
//!
//! Ids are handed out once per insertion and never reused: two structurally
//! equal assets inserted separately stay two distinct assets.

use std::fmt;

use crate::{
    data_structures::{
        accessor::{Accessor, Buffer, BufferView},
        mesh::{Mesh, Primitive},
        scene::{Camera, Node, NodeContent, Scene},
    },
    error::{Error, Result},
};

/// Stable identity of one asset inside an [`Assets`] arena.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetId(u32);

impl AssetId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetId({})", self.0)
    }
}

/// Leaf assets this core only tracks by identity.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Material {
    pub name: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Texture {
    pub name: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Image {
    pub name: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Sampler {
    pub name: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Skin {
    pub name: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Animation {
    pub name: Option<String>,
}

/// Discriminant of [`Asset`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Scene,
    Node,
    Mesh,
    Primitive,
    Accessor,
    BufferView,
    Buffer,
    Camera,
    Material,
    Texture,
    Image,
    Sampler,
    Skin,
    Animation,
}

/// Any entity participating in the scene model.
#[derive(Clone, Debug)]
pub enum Asset {
    Scene(Scene),
    Node(Node),
    Mesh(Mesh),
    Primitive(Primitive),
    Accessor(Accessor),
    BufferView(BufferView),
    Buffer(Buffer),
    Camera(Camera),
    Material(Material),
    Texture(Texture),
    Image(Image),
    Sampler(Sampler),
    Skin(Skin),
    Animation(Animation),
}

impl Asset {
    pub fn kind(&self) -> AssetKind {
        match self {
            Asset::Scene(_) => AssetKind::Scene,
            Asset::Node(_) => AssetKind::Node,
            Asset::Mesh(_) => AssetKind::Mesh,
            Asset::Primitive(_) => AssetKind::Primitive,
            Asset::Accessor(_) => AssetKind::Accessor,
            Asset::BufferView(_) => AssetKind::BufferView,
            Asset::Buffer(_) => AssetKind::Buffer,
            Asset::Camera(_) => AssetKind::Camera,
            Asset::Material(_) => AssetKind::Material,
            Asset::Texture(_) => AssetKind::Texture,
            Asset::Image(_) => AssetKind::Image,
            Asset::Sampler(_) => AssetKind::Sampler,
            Asset::Skin(_) => AssetKind::Skin,
            Asset::Animation(_) => AssetKind::Animation,
        }
    }
}

macro_rules! impl_from_asset {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Asset {
                fn from(asset: $variant) -> Self {
                    Asset::$variant(asset)
                }
            }
        )*
    };
}

impl_from_asset!(
    Scene, Node, Mesh, Primitive, Accessor, BufferView, Buffer, Camera, Material, Texture, Image,
    Sampler, Skin, Animation,
);

/// Generates a typed getter that fails with [`Error::KindMismatch`] when the
/// id points at another kind of asset.
macro_rules! typed_get {
    ($name:ident, $name_mut:ident, $variant:ident) => {
        pub fn $name(&self, id: AssetId) -> Result<&$variant> {
            match self.get(id)? {
                Asset::$variant(asset) => Ok(asset),
                other => Err(Error::KindMismatch {
                    id,
                    expected: AssetKind::$variant,
                    found: other.kind(),
                }),
            }
        }

        pub fn $name_mut(&mut self, id: AssetId) -> Result<&mut $variant> {
            match self.get_mut(id)? {
                Asset::$variant(asset) => Ok(asset),
                other => Err(Error::KindMismatch {
                    id,
                    expected: AssetKind::$variant,
                    found: other.kind(),
                }),
            }
        }
    };
}

/// Append-only arena owning every asset.
#[derive(Debug, Default)]
pub struct Assets {
    entries: Vec<Asset>,
}

impl Assets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, asset: impl Into<Asset>) -> AssetId {
        let id = AssetId(self.entries.len() as u32);
        self.entries.push(asset.into());
        id
    }

    pub fn get(&self, id: AssetId) -> Result<&Asset> {
        self.entries.get(id.index()).ok_or(Error::DanglingAsset(id))
    }

    pub fn get_mut(&mut self, id: AssetId) -> Result<&mut Asset> {
        self.entries
            .get_mut(id.index())
            .ok_or(Error::DanglingAsset(id))
    }

    pub fn kind(&self, id: AssetId) -> Result<AssetKind> {
        self.get(id).map(Asset::kind)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    typed_get!(scene, scene_mut, Scene);
    typed_get!(node, node_mut, Node);
    typed_get!(mesh, mesh_mut, Mesh);
    typed_get!(primitive, primitive_mut, Primitive);
    typed_get!(accessor, accessor_mut, Accessor);
    typed_get!(buffer_view, buffer_view_mut, BufferView);
    typed_get!(buffer, buffer_mut, Buffer);
    typed_get!(camera, camera_mut, Camera);

    /// Wraps a mesh or a camera into a fresh node.
    pub fn instance(&mut self, id: AssetId) -> Result<AssetId> {
        let content = match self.kind(id)? {
            AssetKind::Mesh => NodeContent::Mesh(id),
            AssetKind::Camera => NodeContent::Camera(id),
            found => {
                return Err(Error::KindMismatch {
                    id,
                    expected: AssetKind::Mesh,
                    found,
                });
            }
        };
        Ok(self.insert(Node::new(None, None, content)))
    }
}
