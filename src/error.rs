//! Error types for asset graph synchronisation.

use thiserror::Error;

use crate::data_structures::asset::{AssetId, AssetKind};

/// Accessor layout value that does not match the interchange encoding.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("unknown accessor type `{0}`")]
    AccessorType(String),

    #[error("unknown component type {0}")]
    ComponentType(u32),
}

/// Main error type for the crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed accessor data. Never retried.
    #[error("unknown layout: {0}")]
    UnknownLayout(#[from] LayoutError),

    #[error("no device resource can be made for {0:?} assets")]
    UnsupportedAssetKind(AssetKind),

    #[error("{id:?} is a {found:?}, expected a {expected:?}")]
    KindMismatch {
        id: AssetId,
        expected: AssetKind,
        found: AssetKind,
    },

    #[error("{0:?} is not part of the asset arena")]
    DanglingAsset(AssetId),

    #[error("glTF buffer {0} has no data")]
    MissingBufferData(usize),

    #[error("accessor {id:?} reads {end} bytes but its buffer holds {len}")]
    OutOfBounds { id: AssetId, end: usize, len: usize },

    #[error("accessor {id:?} has {element} byte elements but a {stride} byte stride")]
    InvalidStride {
        id: AssetId,
        stride: usize,
        element: usize,
    },

    #[error("accessor {id:?} uses {component:?} which cannot index a draw")]
    InvalidIndexType {
        id: AssetId,
        component: crate::data_structures::accessor::ComponentType,
    },

    #[error("accessor {id:?} has {count} elements, more than a draw can address")]
    CountOverflow { id: AssetId, count: usize },

    /// A primitive reachable from the active scene has no table entry.
    #[error("primitive {0:?} was rendered before its resources were added")]
    MissingResource(AssetId),

    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    #[error("device error: {0}")]
    Device(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
