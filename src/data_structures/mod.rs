//! Asset graph data structures.
//!
//! - `asset` is the arena, asset ids and the closed set of asset kinds
//! - `scene` holds scenes, nodes and cameras
//! - `mesh` holds meshes, primitives and vertex attribute names
//! - `accessor` holds buffers, buffer views and typed accessors
//! - `crawler` is the cycle-safe graph traversal
//! - `asset_set` is a pool of assets with an active scene

pub mod accessor;
pub mod asset;
pub mod asset_set;
pub mod crawler;
pub mod mesh;
pub mod scene;
