//! flow-scene
//!
//! Keeps a glTF-style asset graph in sync with GPU resources. Assets live in
//! an append-only arena, an [`AssetSet`] pools whatever is reachable from the
//! roots it was given, and a [`Renderer`] owns one device resource per pooled
//! primitive and draws the active scene.
//!
//! High-level modules
//! - `context`: the [`RenderDevice`] seam and its wgpu implementation
//! - `data_structures`: the asset arena, graph traversal and asset pools
//! - `error`: crate error type
//! - `pipelines`: render pipelines used to draw primitives
//! - `resources`: device resource creation and glTF import
//! - `render`: resource table and frame rendering
//!

pub mod context;
pub mod data_structures;
pub mod error;
pub mod pipelines;
pub mod render;
pub mod resources;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath;
pub use context::{Context, ContextConfig, RenderDevice};
pub use data_structures::{
    asset::{Asset, AssetId, AssetKind, Assets},
    asset_set::AssetSet,
    crawler::{Crawler, Root, crawl},
};
pub use error::{Error, Result};
pub use render::{DrawCall, FrameStats, Renderer, RendererConfig, UnsupportedPolicy};
pub use resources::{GpuResource, make_resource};
pub use wgpu;
