//! Scenes, nodes and cameras.

use cgmath::{Matrix4, SquareMatrix};

use crate::data_structures::asset::AssetId;

/// A root set of nodes. A node may be shared between several scenes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scene {
    pub name: Option<String>,
    nodes: Vec<AssetId>,
}

impl Scene {
    pub fn new(name: Option<String>) -> Self {
        Self {
            name,
            nodes: Vec::new(),
        }
    }

    /// Returns `false` if the node was already part of the scene.
    pub fn add_node(&mut self, node: AssetId) -> bool {
        if self.nodes.contains(&node) {
            return false;
        }
        self.nodes.push(node);
        true
    }

    pub fn remove_node(&mut self, node: AssetId) -> bool {
        let len = self.nodes.len();
        self.nodes.retain(|n| *n != node);
        self.nodes.len() != len
    }

    pub fn nodes(&self) -> &[AssetId] {
        &self.nodes
    }
}

/// What a node carries besides its children.
///
/// A node holds at most one capability, so "mesh and camera at once" cannot
/// be expressed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NodeContent {
    #[default]
    Empty,
    Mesh(AssetId),
    Camera(AssetId),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Node {
    pub name: Option<String>,
    /// Local transform relative to the parent, identity when `None`.
    pub matrix: Option<Matrix4<f32>>,
    pub content: NodeContent,
    children: Vec<AssetId>,
}

impl Node {
    /// A node without children.
    pub fn new(name: Option<String>, matrix: Option<Matrix4<f32>>, content: NodeContent) -> Self {
        Self {
            name,
            matrix,
            content,
            children: Vec::new(),
        }
    }

    pub fn with_mesh(mesh: AssetId) -> Self {
        Self {
            content: NodeContent::Mesh(mesh),
            ..Default::default()
        }
    }

    pub fn with_camera(camera: AssetId) -> Self {
        Self {
            content: NodeContent::Camera(camera),
            ..Default::default()
        }
    }

    pub fn mesh(&self) -> Option<AssetId> {
        match self.content {
            NodeContent::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn camera(&self) -> Option<AssetId> {
        match self.content {
            NodeContent::Camera(camera) => Some(camera),
            _ => None,
        }
    }

    /// Returns `false` if `child` was already a child of this node.
    pub fn add_child(&mut self, child: AssetId) -> bool {
        if self.children.contains(&child) {
            return false;
        }
        self.children.push(child);
        true
    }

    pub fn remove_child(&mut self, child: AssetId) -> bool {
        let len = self.children.len();
        self.children.retain(|c| *c != child);
        self.children.len() != len
    }

    pub fn children(&self) -> &[AssetId] {
        &self.children
    }

    pub fn local_transform(&self) -> Matrix4<f32> {
        self.matrix.unwrap_or_else(Matrix4::identity)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Projection {
    Perspective {
        yfov: f32,
        aspect_ratio: Option<f32>,
        znear: f32,
        zfar: Option<f32>,
    },
    Orthographic {
        xmag: f32,
        ymag: f32,
        znear: f32,
        zfar: f32,
    },
}

impl Default for Projection {
    fn default() -> Self {
        Projection::Perspective {
            yfov: std::f32::consts::FRAC_PI_4,
            aspect_ratio: None,
            znear: 0.1,
            zfar: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Camera {
    pub name: Option<String>,
    pub projection: Projection,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::asset::Assets;

    #[test]
    fn scene_and_children_reject_duplicates() {
        let mut assets = Assets::new();
        let child = assets.insert(Node::default());
        let mut scene = Scene::default();
        assert!(scene.add_node(child));
        assert!(!scene.add_node(child));
        assert_eq!(scene.nodes(), &[child]);

        let mut node = Node::default();
        assert!(node.add_child(child));
        assert!(!node.add_child(child));
        assert!(node.remove_child(child));
        assert!(node.children().is_empty());
    }

    #[test]
    fn new_node_starts_without_children() {
        let mut assets = Assets::new();
        let mesh = assets.insert(crate::data_structures::mesh::Mesh::default());
        let matrix = Matrix4::from_scale(2.0);
        let node = Node::new(Some("root".to_string()), Some(matrix), NodeContent::Mesh(mesh));
        assert_eq!(node.name.as_deref(), Some("root"));
        assert_eq!(node.local_transform(), matrix);
        assert_eq!(node.mesh(), Some(mesh));
        assert!(node.children().is_empty());
    }

    #[test]
    fn identity_transform_when_unset() {
        assert_eq!(Node::default().local_transform(), Matrix4::identity());
    }
}
