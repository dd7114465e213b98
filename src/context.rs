//! Device access.
//!
//! [`RenderDevice`] is the narrow set of device capabilities the resource
//! table and renderer need: buffer allocation, a recording scope for uploads,
//! a render pass, and a submit-then-wait barrier. [`Context`] implements it on
//! top of wgpu, either presenting to a surface or rendering offscreen.

use std::{future::Future, iter};

use wgpu::util::DeviceExt;

use crate::{
    data_structures::mesh::AttributeName,
    error::{Error, Result},
    pipelines::geometry::GeometryPipelines,
    render::DrawCall,
};

pub trait RenderDevice {
    type Buffer;
    /// Recording scope for one batch of uploads.
    type Uploads;
    /// One render pass onto the current back buffer.
    type Frame;

    fn begin_uploads(&self) -> Self::Uploads;

    /// Allocates a buffer holding `contents` and records its upload.
    fn create_buffer(
        &self,
        uploads: &mut Self::Uploads,
        label: &str,
        contents: &[u8],
        usage: wgpu::BufferUsages,
    ) -> Self::Buffer;

    fn destroy_buffer(&self, buffer: Self::Buffer);

    fn submit_uploads(&self, uploads: Self::Uploads);

    fn begin_frame(&self, clear_colour: wgpu::Color) -> Result<Self::Frame>;

    fn draw(&self, frame: &mut Self::Frame, draw: &DrawCall<'_, Self::Buffer>);

    fn submit_frame(&self, frame: Self::Frame);

    /// Resolves once everything submitted so far has finished on the device.
    fn on_submitted_work_done(&self) -> impl Future<Output = Result<()>>;
}

#[derive(Clone, Debug)]
pub struct ContextConfig {
    pub width: u32,
    pub height: u32,
    pub power_preference: wgpu::PowerPreference,
    /// Colour format of the offscreen target. Surfaces pick their own.
    pub format: wgpu::TextureFormat,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            width: 256,
            height: 256,
            power_preference: wgpu::PowerPreference::HighPerformance,
            format: wgpu::TextureFormat::Rgba8Unorm,
        }
    }
}

#[derive(Debug)]
enum Target {
    Surface {
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
    },
    Offscreen {
        texture: wgpu::Texture,
    },
}

#[derive(Debug)]
pub struct Context {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    target: Target,
    pipelines: GeometryPipelines,
}

pub struct Uploads {
    encoder: wgpu::CommandEncoder,
    staging: Vec<wgpu::Buffer>,
}

pub struct Frame {
    // declared before the encoder so an unsubmitted frame ends its pass first
    pass: Option<wgpu::RenderPass<'static>>,
    encoder: wgpu::CommandEncoder,
    output: Option<wgpu::SurfaceTexture>,
}

impl Context {
    /// Renders into an offscreen texture that can be read back with
    /// [`Context::capture`].
    pub async fn headless(config: &ContextConfig) -> anyhow::Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let (device, queue) = request_device(&instance, config, None).await?;
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Offscreen Target"),
            size: wgpu::Extent3d {
                width: config.width.max(1),
                height: config.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: config.format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let pipelines = GeometryPipelines::new(&device, config.format);
        Ok(Self {
            device,
            queue,
            target: Target::Offscreen { texture },
            pipelines,
        })
    }

    /// Presents to a surface, e.g. a winit window or a web canvas.
    pub async fn with_surface(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        config: &ContextConfig,
    ) -> anyhow::Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let surface = instance.create_surface(window)?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: config.power_preference,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;
        let surface_caps = surface.get_capabilities(&adapter);
        let (device, queue) = request_device(&instance, config, Some(adapter)).await?;

        let format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: config.width.max(1),
            height: config.height.max(1),
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);
        let pipelines = GeometryPipelines::new(&device, format);
        Ok(Self {
            device,
            queue,
            target: Target::Surface {
                surface,
                config: surface_config,
            },
            pipelines,
        })
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        match &self.target {
            Target::Surface { config, .. } => config.format,
            Target::Offscreen { texture } => texture.format(),
        }
    }

    pub fn size(&self) -> (u32, u32) {
        match &self.target {
            Target::Surface { config, .. } => (config.width, config.height),
            Target::Offscreen { texture } => (texture.width(), texture.height()),
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        match &mut self.target {
            Target::Surface { surface, config } => {
                config.width = width;
                config.height = height;
                surface.configure(&self.device, config);
            }
            Target::Offscreen { texture } => {
                *texture = self.device.create_texture(&wgpu::TextureDescriptor {
                    label: Some("Offscreen Target"),
                    size: wgpu::Extent3d {
                        width,
                        height,
                        depth_or_array_layers: 1,
                    },
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format: texture.format(),
                    usage: texture.usage(),
                    view_formats: &[],
                });
            }
        }
    }

    /// Reads the offscreen target back as tightly packed rows of texels.
    pub async fn capture(&self) -> anyhow::Result<Vec<u8>> {
        let Target::Offscreen { texture } = &self.target else {
            anyhow::bail!("only offscreen contexts can be captured");
        };
        let texel_size = texture
            .format()
            .block_copy_size(None)
            .ok_or_else(|| anyhow::anyhow!("{:?} cannot be copied", texture.format()))?;
        let (width, height) = (texture.width(), texture.height());
        let row = width * texel_size;
        let padded_row = row.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
            * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

        let output = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Capture Buffer"),
            size: (padded_row * height) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Capture Encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &output,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(height),
                },
            },
            texture.size(),
        );
        self.queue.submit(iter::once(encoder.finish()));

        // NOTE: map first, then poll, then await. Otherwise the receive never
        // resolves on native.
        let slice = output.slice(..);
        let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.poll()?;
        rx.receive()
            .await
            .ok_or_else(|| anyhow::anyhow!("capture mapping was dropped"))??;

        let data = slice.get_mapped_range();
        let mut texels = Vec::with_capacity((row * height) as usize);
        for chunk in data.chunks(padded_row as usize) {
            texels.extend_from_slice(&chunk[..row as usize]);
        }
        drop(data);
        output.unmap();
        Ok(texels)
    }

    fn poll(&self) -> Result<()> {
        #[cfg(target_arch = "wasm32")]
        let poll = self.device.poll(wgpu::PollType::Poll);
        #[cfg(not(target_arch = "wasm32"))]
        let poll = self.device.poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: None,
        });
        poll.map(|_| ()).map_err(|e| Error::Device(e.to_string()))
    }
}

async fn request_device(
    instance: &wgpu::Instance,
    config: &ContextConfig,
    adapter: Option<wgpu::Adapter>,
) -> anyhow::Result<(wgpu::Device, wgpu::Queue)> {
    let adapter = match adapter {
        Some(adapter) => adapter,
        None => {
            instance
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: config.power_preference,
                    compatible_surface: None,
                    force_fallback_adapter: false,
                })
                .await?
        }
    };
    log::info!("using adapter {:?}", adapter.get_info().name);
    let device = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("flow-scene device"),
            // WebGL doesn't support all of wgpu's features, so if
            // we're building for the web we'll have to disable some.
            required_limits: if cfg!(target_arch = "wasm32") {
                wgpu::Limits::downlevel_webgl2_defaults()
            } else {
                wgpu::Limits::default()
            },
            ..Default::default()
        })
        .await?;
    Ok(device)
}

impl RenderDevice for Context {
    type Buffer = wgpu::Buffer;
    type Uploads = Uploads;
    type Frame = Frame;

    fn begin_uploads(&self) -> Uploads {
        Uploads {
            encoder: self
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Upload Encoder"),
                }),
            staging: Vec::new(),
        }
    }

    fn create_buffer(
        &self,
        uploads: &mut Uploads,
        label: &str,
        contents: &[u8],
        usage: wgpu::BufferUsages,
    ) -> wgpu::Buffer {
        if contents.is_empty() {
            return self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: 0,
                usage,
                mapped_at_creation: false,
            });
        }
        // create_buffer_init pads to COPY_BUFFER_ALIGNMENT, so the staging
        // size is always a valid copy size.
        let staging = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} (staging)", label)),
                contents,
                usage: wgpu::BufferUsages::COPY_SRC,
            });
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: staging.size(),
            usage: usage | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        uploads
            .encoder
            .copy_buffer_to_buffer(&staging, 0, &buffer, 0, staging.size());
        uploads.staging.push(staging);
        buffer
    }

    fn destroy_buffer(&self, buffer: wgpu::Buffer) {
        buffer.destroy();
    }

    fn submit_uploads(&self, uploads: Uploads) {
        log::debug!("submitting {} uploads", uploads.staging.len());
        self.queue.submit(iter::once(uploads.encoder.finish()));
    }

    fn begin_frame(&self, clear_colour: wgpu::Color) -> Result<Frame> {
        let (view, output) = match &self.target {
            Target::Surface { surface, .. } => {
                let output = surface.get_current_texture()?;
                let view = output
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                (view, Some(output))
            }
            Target::Offscreen { texture } => (
                texture.create_view(&wgpu::TextureViewDescriptor::default()),
                None,
            ),
        };
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        let pass = encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                ..Default::default()
            })
            .forget_lifetime();
        Ok(Frame {
            encoder,
            pass: Some(pass),
            output,
        })
    }

    fn draw(&self, frame: &mut Frame, draw: &DrawCall<'_, wgpu::Buffer>) {
        let Some(pass) = frame.pass.as_mut() else {
            return;
        };
        let Some(pipeline) = draw
            .mode
            .topology()
            .and_then(|topology| self.pipelines.get(topology))
        else {
            log::warn!("{:?} uses {:?}, which cannot be drawn", draw.primitive, draw.mode);
            return;
        };
        let Some(position) = draw.vertex_buffer(AttributeName::Position) else {
            log::warn!("{:?} has no POSITION attribute", draw.primitive);
            return;
        };
        let empty = match &draw.index {
            Some(index) => index.count == 0 || index.buffer.size() == 0,
            None => draw.vertex_count == 0,
        };
        if empty || position.size() == 0 {
            log::warn!("{:?} has no vertices to draw", draw.primitive);
            return;
        }

        pass.set_pipeline(pipeline);
        pass.set_vertex_buffer(0, position.slice(..));
        match &draw.index {
            Some(index) => {
                pass.set_index_buffer(index.buffer.slice(..), index.format);
                pass.draw_indexed(0..index.count, 0, 0..1);
            }
            None => pass.draw(0..draw.vertex_count, 0..1),
        }
    }

    fn submit_frame(&self, frame: Frame) {
        let Frame {
            encoder,
            pass,
            output,
        } = frame;
        // the pass has to end before the encoder can finish
        drop(pass);
        self.queue.submit(iter::once(encoder.finish()));
        if let Some(output) = output {
            output.present();
        }
    }

    async fn on_submitted_work_done(&self) -> Result<()> {
        let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
        self.queue.on_submitted_work_done(move || {
            let _ = tx.send(());
        });
        self.poll()?;
        rx.receive()
            .await
            .ok_or_else(|| Error::Device("submitted work was never acknowledged".into()))
    }
}
