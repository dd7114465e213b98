//! Resource table and frame rendering.
//!
//! [`Renderer`] is an [`AssetSet`] that keeps one device resource per pooled
//! primitive. Its mutations are barriers: [`Renderer::add`] only returns once
//! every upload it recorded has finished on the device, and
//! [`Renderer::render`] only returns once the frame has been executed, so a
//! caller that awaits each call always sees a fully settled table.
//!
//! # Key types
//!
//! - [`Renderer<D>`] is the resource table plus frame renderer over a device `D`
//! - [`DrawCall`] is what the renderer asks the device to draw for one primitive
//! - [`RendererConfig`] holds the clear colour and the unsupported-asset policy
//!
//! Calls on one renderer must be serialised by the caller. There is no
//! internal locking and in-flight uploads cannot be cancelled.

use std::{collections::HashMap, ops::Deref};

use crate::{
    context::RenderDevice,
    data_structures::{
        asset::{AssetId, AssetKind, Assets},
        asset_set::AssetSet,
        crawler::{Root, crawl},
        mesh::{AttributeName, PrimitiveMode},
    },
    error::{Error, Result},
    resources::{GpuResource, make_resource},
};

/// Index buffer bound to a draw.
pub struct IndexBinding<'a, B> {
    pub buffer: &'a B,
    pub format: wgpu::IndexFormat,
    pub count: u32,
}

/// One draw for one primitive: its vertex buffers by attribute, plus an
/// index buffer when the primitive is indexed.
pub struct DrawCall<'a, B> {
    pub primitive: AssetId,
    pub mode: PrimitiveMode,
    pub vertex_buffers: Vec<(AttributeName, &'a B)>,
    pub vertex_count: u32,
    pub index: Option<IndexBinding<'a, B>>,
}

impl<'a, B> DrawCall<'a, B> {
    pub fn vertex_buffer(&self, name: AttributeName) -> Option<&'a B> {
        self.vertex_buffers
            .iter()
            .find(|(attribute, _)| *attribute == name)
            .map(|(_, buffer)| *buffer)
    }
}

/// What happens when `add` meets an asset kind that has no device resource
/// implementation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnsupportedPolicy {
    /// Log a warning, leave the asset without a resource and continue.
    #[default]
    Skip,
    /// Fail the whole `add`: nothing from that call stays pooled or uploaded.
    Abort,
}

#[derive(Clone, Debug)]
pub struct RendererConfig {
    pub clear_colour: wgpu::Color,
    pub unsupported: UnsupportedPolicy,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            clear_colour: wgpu::Color::BLACK,
            unsupported: UnsupportedPolicy::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub draws: usize,
}

pub struct Renderer<D: RenderDevice> {
    device: D,
    config: RendererConfig,
    graph: AssetSet,
    resources: HashMap<AssetId, GpuResource<D::Buffer>>,
}

impl<D: RenderDevice> Renderer<D> {
    pub fn new(device: D, config: RendererConfig) -> Self {
        Self {
            device,
            config,
            graph: AssetSet::new(),
            resources: HashMap::new(),
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut RendererConfig {
        &mut self.config
    }

    pub fn set_scene(&mut self, scene: Option<AssetId>) {
        self.graph.set_scene(scene);
    }

    pub fn resource(&self, id: AssetId) -> Option<&GpuResource<D::Buffer>> {
        self.resources.get(&id)
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    /// Pools every root and uploads resources for the newly pooled assets.
    ///
    /// All uploads of one call are recorded into a single batch, submitted
    /// together and awaited before returning. Returns the newly pooled assets.
    ///
    /// On failure the call is undone: assets it pooled are evicted again and
    /// resources it created are released.
    pub async fn add<'a, R>(
        &mut self,
        assets: &Assets,
        roots: impl IntoIterator<Item = R>,
    ) -> Result<Vec<AssetId>>
    where
        R: Into<Root<'a>>,
    {
        let added = self.graph.add(assets, roots)?;
        let mut uploads = self.device.begin_uploads();
        let mut created = Vec::new();

        for &id in &added {
            match make_resource(&self.device, &mut uploads, assets, id) {
                Ok(Some(resource)) => {
                    self.resources.insert(id, resource);
                    created.push(id);
                }
                Ok(None) => (),
                Err(Error::UnsupportedAssetKind(kind))
                    if self.config.unsupported == UnsupportedPolicy::Skip =>
                {
                    log::warn!("{:?} is a {:?}, which gets no device resource", id, kind);
                }
                Err(e) => {
                    log::error!("adding {} assets failed at {:?}: {}", added.len(), id, e);
                    for id in created {
                        if let Some(resource) = self.resources.remove(&id) {
                            resource.release(&self.device);
                        }
                    }
                    self.graph.remove(added.iter().copied());
                    return Err(e);
                }
            }
        }

        self.device.submit_uploads(uploads);
        self.device.on_submitted_work_done().await?;
        log::info!(
            "added {} assets, {} new resources",
            added.len(),
            created.len()
        );
        Ok(added)
    }

    /// Evicts exactly the given assets and releases their resources.
    ///
    /// Assets that are not pooled, or have no resource, are ignored.
    pub fn remove(&mut self, ids: impl IntoIterator<Item = AssetId>) -> Vec<AssetId> {
        let removed = self.graph.remove(ids);
        for id in &removed {
            if let Some(resource) = self.resources.remove(id) {
                resource.release(&self.device);
            }
        }
        removed
    }

    /// Draws every primitive reachable from the active scene.
    ///
    /// Returns `Ok(None)` without touching the device when no scene is
    /// active. Every reachable primitive must have been added (and the `add`
    /// awaited) beforehand, otherwise this fails with
    /// [`Error::MissingResource`] before anything is recorded.
    pub async fn render(&self, assets: &Assets) -> Result<Option<FrameStats>> {
        let Some(scene) = self.graph.scene() else {
            return Ok(None);
        };

        let mut draws = Vec::new();
        for id in crawl(assets, scene)? {
            if assets.kind(id)? != AssetKind::Primitive {
                continue;
            }
            let resource = self.resources.get(&id).ok_or_else(|| {
                log::error!("{:?} is reachable from {:?} but has no resource", id, scene);
                Error::MissingResource(id)
            })?;
            draws.push(resource.draw_call(id));
        }

        let mut frame = self.device.begin_frame(self.config.clear_colour)?;
        for draw in &draws {
            self.device.draw(&mut frame, draw);
        }
        self.device.submit_frame(frame);
        self.device.on_submitted_work_done().await?;

        Ok(Some(FrameStats { draws: draws.len() }))
    }
}

impl<D: RenderDevice> Deref for Renderer<D> {
    type Target = AssetSet;

    fn deref(&self) -> &Self::Target {
        &self.graph
    }
}

impl<D: RenderDevice> Drop for Renderer<D> {
    fn drop(&mut self) {
        for (_, resource) in self.resources.drain() {
            resource.release(&self.device);
        }
    }
}
