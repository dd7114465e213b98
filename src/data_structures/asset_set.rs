//! Pools of assets.
//!
//! An [`AssetSet`] is a graph: the set of assets it tracks plus the one scene
//! that is currently active. Adding a root pulls in everything the root
//! reaches; removing only evicts the given assets.

use std::collections::BTreeSet;

use crate::{
    data_structures::{
        asset::{AssetId, Assets},
        crawler::{Crawler, Root},
    },
    error::Result,
};

#[derive(Clone, Debug, Default)]
pub struct AssetSet {
    pool: BTreeSet<AssetId>,
    scene: Option<AssetId>,
}

impl AssetSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Crawls every root and pools what it reaches.
    ///
    /// Roots can be single assets or other graphs, which merges their pools
    /// into this one. Returns only the assets that were not pooled before,
    /// in crawl order.
    pub fn add<'a, R>(&mut self, assets: &Assets, roots: impl IntoIterator<Item = R>) -> Result<Vec<AssetId>>
    where
        R: Into<Root<'a>>,
    {
        let mut crawler = Crawler::new();
        for root in roots {
            crawler.crawl(assets, root)?;
        }
        let added: Vec<AssetId> = crawler
            .into_assets()
            .into_iter()
            .filter(|id| self.pool.insert(*id))
            .collect();
        log::debug!("pooled {} new assets ({} total)", added.len(), self.pool.len());
        Ok(added)
    }

    /// Evicts exactly the given assets. Nothing they reference is removed,
    /// and the active scene stays set even if it is evicted.
    ///
    /// Returns the assets that were actually pooled.
    pub fn remove(&mut self, ids: impl IntoIterator<Item = AssetId>) -> Vec<AssetId> {
        ids.into_iter().filter(|id| self.pool.remove(id)).collect()
    }

    pub fn contains(&self, id: AssetId) -> bool {
        self.pool.contains(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = AssetId> + '_ {
        self.pool.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    pub fn scene(&self) -> Option<AssetId> {
        self.scene
    }

    pub fn set_scene(&mut self, scene: Option<AssetId>) {
        self.scene = scene;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::{
        mesh::Mesh,
        scene::{Node, Scene},
    };

    #[test]
    fn add_returns_only_new_assets() {
        let mut assets = Assets::new();
        let mesh = assets.insert(Mesh::default());
        let a = assets.insert(Node::with_mesh(mesh));
        let b = assets.insert(Node::with_mesh(mesh));

        let mut set = AssetSet::new();
        assert_eq!(set.add(&assets, [a]).unwrap(), vec![a, mesh]);
        assert_eq!(set.add(&assets, [b]).unwrap(), vec![b]);
        assert!(set.add(&assets, [a, b]).unwrap().is_empty());
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn graphs_merge_by_identity() {
        let mut assets = Assets::new();
        let mesh = assets.insert(Mesh::default());
        let node = assets.insert(Node::with_mesh(mesh));
        let lone = assets.insert(Node::default());

        let mut first = AssetSet::new();
        first.add(&assets, [node]).unwrap();
        let mut second = AssetSet::new();
        second.add(&assets, [lone, node]).unwrap();

        let added = first.add(&assets, [&second]).unwrap();
        assert_eq!(added, vec![lone]);
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn remove_does_not_cascade() {
        let mut assets = Assets::new();
        let mesh = assets.insert(Mesh::default());
        let node = assets.insert(Node::with_mesh(mesh));
        let mut scene = Scene::default();
        scene.add_node(node);
        let scene = assets.insert(scene);

        let mut set = AssetSet::new();
        set.add(&assets, [scene]).unwrap();
        set.set_scene(Some(scene));

        assert_eq!(set.remove([node, node]), vec![node]);
        assert!(set.contains(mesh));
        assert!(!set.contains(node));

        // evicting the active scene leaves it active
        set.remove([scene]);
        assert_eq!(set.scene(), Some(scene));
        assert!(set.remove([scene]).is_empty());
    }
}
