//! Render pipelines.
//!
//! - `geometry` draws primitives from their POSITION buffer, one pipeline per
//!   topology

pub mod geometry;
