//! Turns assets into device resources.
//!
//! Only geometry is materialised for now: a primitive becomes one vertex
//! buffer per attribute plus an optional index buffer.

use std::collections::BTreeMap;

use crate::{
    context::RenderDevice,
    data_structures::{
        accessor::Accessor,
        asset::{Asset, AssetId, Assets},
        mesh::{AttributeName, Primitive, PrimitiveMode},
    },
    error::{Error, Result},
    render::{DrawCall, IndexBinding},
};

pub mod document;

/// Device state owned by exactly one asset.
///
/// The device buffers are freed by [`GpuResource::release`], which consumes
/// the resource and can therefore run at most once.
#[derive(Debug)]
pub enum GpuResource<B> {
    Primitive(PrimitiveResource<B>),
}

impl<B> GpuResource<B> {
    pub fn release<D>(self, device: &D)
    where
        D: RenderDevice<Buffer = B>,
    {
        match self {
            GpuResource::Primitive(primitive) => primitive.release(device),
        }
    }

    pub fn buffer_count(&self) -> usize {
        match self {
            GpuResource::Primitive(primitive) => {
                primitive.vertex_buffers.len() + primitive.index.is_some() as usize
            }
        }
    }

    pub fn as_primitive(&self) -> Option<&PrimitiveResource<B>> {
        match self {
            GpuResource::Primitive(primitive) => Some(primitive),
        }
    }

    pub(crate) fn draw_call(&self, id: AssetId) -> DrawCall<'_, B> {
        match self {
            GpuResource::Primitive(primitive) => primitive.draw_call(id),
        }
    }
}

#[derive(Debug)]
pub struct IndexResource<B> {
    pub buffer: B,
    pub format: wgpu::IndexFormat,
    pub count: u32,
}

#[derive(Debug)]
pub struct PrimitiveResource<B> {
    pub mode: PrimitiveMode,
    pub vertex_buffers: BTreeMap<AttributeName, B>,
    pub vertex_count: u32,
    pub index: Option<IndexResource<B>>,
}

impl<B> PrimitiveResource<B> {
    fn release<D>(self, device: &D)
    where
        D: RenderDevice<Buffer = B>,
    {
        for buffer in self.vertex_buffers.into_values() {
            device.destroy_buffer(buffer);
        }
        if let Some(index) = self.index {
            device.destroy_buffer(index.buffer);
        }
    }

    fn draw_call(&self, id: AssetId) -> DrawCall<'_, B> {
        DrawCall {
            primitive: id,
            mode: self.mode,
            vertex_buffers: self
                .vertex_buffers
                .iter()
                .map(|(name, buffer)| (*name, buffer))
                .collect(),
            vertex_count: self.vertex_count,
            index: self.index.as_ref().map(|index| IndexBinding {
                buffer: &index.buffer,
                format: index.format,
                count: index.count,
            }),
        }
    }
}

/// Creates the device resource for one asset, recording its uploads into
/// `uploads`.
///
/// Structural assets yield `Ok(None)`. Kinds that would need device state this
/// crate does not build (materials, textures, images, samplers, skins) fail
/// with [`Error::UnsupportedAssetKind`].
pub fn make_resource<D: RenderDevice>(
    device: &D,
    uploads: &mut D::Uploads,
    assets: &Assets,
    id: AssetId,
) -> Result<Option<GpuResource<D::Buffer>>> {
    match assets.get(id)? {
        Asset::Primitive(primitive) => {
            make_primitive(device, uploads, assets, id, primitive).map(Some)
        }
        Asset::Scene(_)
        | Asset::Node(_)
        | Asset::Mesh(_)
        | Asset::Accessor(_)
        | Asset::BufferView(_)
        | Asset::Buffer(_)
        | Asset::Camera(_)
        | Asset::Animation(_) => Ok(None),
        unsupported @ (Asset::Material(_)
        | Asset::Texture(_)
        | Asset::Image(_)
        | Asset::Sampler(_)
        | Asset::Skin(_)) => Err(Error::UnsupportedAssetKind(unsupported.kind())),
    }
}

struct Upload {
    name: AttributeName,
    count: u32,
    bytes: Vec<u8>,
}

/// Element count of an accessor as the device counts vertices and indices.
fn draw_count(id: AssetId, accessor: &Accessor) -> Result<u32> {
    u32::try_from(accessor.count).map_err(|_| Error::CountOverflow {
        id,
        count: accessor.count,
    })
}

fn make_primitive<D: RenderDevice>(
    device: &D,
    uploads: &mut D::Uploads,
    assets: &Assets,
    id: AssetId,
    primitive: &Primitive,
) -> Result<GpuResource<D::Buffer>> {
    // Everything fallible happens before the first allocation so a failing
    // primitive never leaves buffers behind.
    let mut attributes = Vec::with_capacity(primitive.attributes.len());
    for (name, accessor_id) in &primitive.attributes {
        let accessor = assets.accessor(*accessor_id)?;
        attributes.push(Upload {
            name: *name,
            count: draw_count(*accessor_id, accessor)?,
            bytes: accessor.read_bytes(*accessor_id, assets)?,
        });
    }
    let indices = match primitive.indices {
        Some(accessor_id) => {
            let accessor = assets.accessor(accessor_id)?;
            let format = accessor
                .component_type
                .index_format()
                .ok_or(Error::InvalidIndexType {
                    id: accessor_id,
                    component: accessor.component_type,
                })?;
            let count = draw_count(accessor_id, accessor)?;
            Some((format, count, accessor.read_bytes(accessor_id, assets)?))
        }
        None => None,
    };

    let vertex_count = attributes
        .iter()
        .find(|upload| upload.name == AttributeName::Position)
        .or(attributes.first())
        .map_or(0, |upload| upload.count);

    let vertex_buffers = attributes
        .into_iter()
        .map(|upload| {
            let label = format!("{:?} {} Vertex Buffer", id, upload.name);
            let buffer = device.create_buffer(
                uploads,
                &label,
                &upload.bytes,
                wgpu::BufferUsages::VERTEX,
            );
            (upload.name, buffer)
        })
        .collect();

    let index = indices.map(|(format, count, bytes)| IndexResource {
        buffer: device.create_buffer(
            uploads,
            &format!("{:?} Index Buffer", id),
            &bytes,
            wgpu::BufferUsages::INDEX,
        ),
        format,
        count,
    });

    log::debug!("made primitive resource for {:?} with {} vertices", id, vertex_count);

    Ok(GpuResource::Primitive(PrimitiveResource {
        mode: primitive.mode,
        vertex_buffers,
        vertex_count,
        index,
    }))
}
