//! Cycle-safe traversal of the asset graph.
//!
//! [`Crawler`] walks every asset reachable from one or more roots in
//! pre-order (parent before children) and records each asset exactly once,
//! however many paths lead to it:
//!
//! - Scene -> nodes
//! - Node -> mesh or camera, then children
//! - Mesh -> primitives
//! - Primitive -> indices, material, attribute accessors, target accessors
//! - Accessor -> buffer view
//! - BufferView -> buffer
//!
//! Crawling never mutates the arena and never suspends.

use std::collections::HashSet;

use crate::{
    data_structures::{
        asset::{Asset, AssetId, Assets},
        asset_set::AssetSet,
        scene::NodeContent,
    },
    error::Result,
};

/// Starting point of a crawl.
#[derive(Clone, Copy, Debug)]
pub enum Root<'a> {
    Asset(AssetId),
    /// A whole graph, crawled from every asset in its pool.
    Graph(&'a AssetSet),
}

impl From<AssetId> for Root<'_> {
    fn from(id: AssetId) -> Self {
        Root::Asset(id)
    }
}

impl<'a> From<&'a AssetSet> for Root<'a> {
    fn from(graph: &'a AssetSet) -> Self {
        Root::Graph(graph)
    }
}

#[derive(Debug, Default)]
pub struct Crawler {
    visited: HashSet<AssetId>,
    order: Vec<AssetId>,
}

impl Crawler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds everything reachable from `root` that this crawler has not seen
    /// yet. Can be called repeatedly to crawl several roots as one.
    pub fn crawl<'a>(&mut self, assets: &Assets, root: impl Into<Root<'a>>) -> Result<()> {
        match root.into() {
            Root::Asset(id) => self.visit(assets, id),
            Root::Graph(graph) => {
                for id in graph.iter() {
                    self.visit(assets, id)?;
                }
                Ok(())
            }
        }
    }

    fn visit(&mut self, assets: &Assets, root: AssetId) -> Result<()> {
        let mut stack = vec![root];
        let mut edges = Vec::new();
        while let Some(id) = stack.pop() {
            if !self.visited.insert(id) {
                continue;
            }
            self.order.push(id);

            edges.clear();
            match assets.get(id)? {
                Asset::Scene(scene) => edges.extend_from_slice(scene.nodes()),
                Asset::Node(node) => {
                    match node.content {
                        NodeContent::Mesh(mesh) => edges.push(mesh),
                        NodeContent::Camera(camera) => edges.push(camera),
                        NodeContent::Empty => (),
                    }
                    edges.extend_from_slice(node.children());
                }
                Asset::Mesh(mesh) => edges.extend_from_slice(&mesh.primitives),
                Asset::Primitive(primitive) => {
                    edges.extend(primitive.indices);
                    edges.extend(primitive.material);
                    edges.extend(primitive.attributes.values().copied());
                    edges.extend(primitive.targets.values().copied());
                }
                Asset::Accessor(accessor) => edges.push(accessor.buffer_view),
                Asset::BufferView(view) => edges.push(view.buffer),
                Asset::Buffer(_)
                | Asset::Camera(_)
                | Asset::Material(_)
                | Asset::Texture(_)
                | Asset::Image(_)
                | Asset::Sampler(_)
                | Asset::Skin(_)
                | Asset::Animation(_) => (),
            }
            // reversed so the first edge is popped (and visited) first
            stack.extend(edges.iter().rev().filter(|e| !self.visited.contains(*e)));
        }
        Ok(())
    }

    pub fn contains(&self, id: AssetId) -> bool {
        self.visited.contains(&id)
    }

    /// Discovered assets in visiting order.
    pub fn assets(&self) -> &[AssetId] {
        &self.order
    }

    pub fn into_assets(self) -> Vec<AssetId> {
        self.order
    }
}

/// Crawls a single root.
pub fn crawl<'a>(assets: &Assets, root: impl Into<Root<'a>>) -> Result<Vec<AssetId>> {
    let mut crawler = Crawler::new();
    crawler.crawl(assets, root)?;
    Ok(crawler.into_assets())
}
