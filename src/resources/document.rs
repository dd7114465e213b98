//! Converts an in-memory glTF document into arena assets.
//!
//! Parsing and fetching the binary buffers stay with the caller: this takes
//! an already parsed [`gltf::Document`] plus the bytes of each of its buffers.

use std::sync::Arc;

use cgmath::Matrix4;

use crate::{
    data_structures::{
        accessor::{Accessor, AccessorType, Buffer, BufferTarget, BufferView, ComponentType},
        asset::{Animation, AssetId, Assets, Image, Material, Sampler, Skin, Texture},
        asset_set::AssetSet,
        mesh::{AttributeName, Mesh, Primitive, PrimitiveMode},
        scene::{Camera, Node, NodeContent, Projection, Scene},
    },
    error::{Error, Result},
};

/// Result of an import.
#[derive(Debug)]
pub struct Import {
    /// Every imported asset, with the document's default scene active.
    pub graph: AssetSet,
    /// Scenes in document order.
    pub scenes: Vec<AssetId>,
    pub default_scene: Option<AssetId>,
}

fn owned(name: Option<&str>) -> Option<String> {
    name.map(str::to_string)
}

fn attribute_name(semantic: &gltf::Semantic) -> Option<AttributeName> {
    #[allow(unreachable_patterns)]
    match semantic {
        gltf::Semantic::Positions => Some(AttributeName::Position),
        gltf::Semantic::Normals => Some(AttributeName::Normal),
        gltf::Semantic::Tangents => Some(AttributeName::Tangent),
        gltf::Semantic::TexCoords(set) => Some(AttributeName::TexCoord(*set)),
        gltf::Semantic::Colors(set) => Some(AttributeName::Color(*set)),
        gltf::Semantic::Joints(set) => Some(AttributeName::Joints(*set)),
        gltf::Semantic::Weights(set) => Some(AttributeName::Weights(*set)),
        _ => None,
    }
}

fn primitive_mode(mode: gltf::mesh::Mode) -> PrimitiveMode {
    match mode {
        gltf::mesh::Mode::Points => PrimitiveMode::Points,
        gltf::mesh::Mode::Lines => PrimitiveMode::Lines,
        gltf::mesh::Mode::LineLoop => PrimitiveMode::LineLoop,
        gltf::mesh::Mode::LineStrip => PrimitiveMode::LineStrip,
        gltf::mesh::Mode::Triangles => PrimitiveMode::Triangles,
        gltf::mesh::Mode::TriangleStrip => PrimitiveMode::TriangleStrip,
        gltf::mesh::Mode::TriangleFan => PrimitiveMode::TriangleFan,
    }
}

fn accessor_type(dimensions: gltf::accessor::Dimensions) -> AccessorType {
    match dimensions {
        gltf::accessor::Dimensions::Scalar => AccessorType::Scalar,
        gltf::accessor::Dimensions::Vec2 => AccessorType::Vec2,
        gltf::accessor::Dimensions::Vec3 => AccessorType::Vec3,
        gltf::accessor::Dimensions::Vec4 => AccessorType::Vec4,
        gltf::accessor::Dimensions::Mat2 => AccessorType::Mat2,
        gltf::accessor::Dimensions::Mat3 => AccessorType::Mat3,
        gltf::accessor::Dimensions::Mat4 => AccessorType::Mat4,
    }
}

fn projection(camera: &gltf::Camera) -> Projection {
    match camera.projection() {
        gltf::camera::Projection::Perspective(p) => Projection::Perspective {
            yfov: p.yfov(),
            aspect_ratio: p.aspect_ratio(),
            znear: p.znear(),
            zfar: p.zfar(),
        },
        gltf::camera::Projection::Orthographic(o) => Projection::Orthographic {
            xmag: o.xmag(),
            ymag: o.ymag(),
            znear: o.znear(),
            zfar: o.zfar(),
        },
    }
}

/// Inserts every entity of `document` into `assets`.
///
/// `buffers[i]` must hold the bytes of the document's buffer `i`. Accessors
/// without a buffer view (sparse-only) are skipped, and so is every reference
/// to them.
pub fn import(
    assets: &mut Assets,
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
) -> Result<Import> {
    let mut imported = Vec::new();

    let mut buffer_ids = Vec::new();
    for buffer in document.buffers() {
        let data = buffers
            .get(buffer.index())
            .ok_or(Error::MissingBufferData(buffer.index()))?;
        let id = assets.insert(Buffer {
            name: owned(buffer.name()),
            data: Arc::from(data.0.as_slice()),
        });
        buffer_ids.push(id);
        imported.push(id);
    }

    let mut view_ids = Vec::new();
    for view in document.views() {
        let id = assets.insert(BufferView {
            buffer: buffer_ids[view.buffer().index()],
            byte_offset: view.offset(),
            byte_length: view.length(),
            byte_stride: view.stride(),
            target: view.target().map(|target| match target {
                gltf::buffer::Target::ArrayBuffer => BufferTarget::Vertex,
                gltf::buffer::Target::ElementArrayBuffer => BufferTarget::Index,
            }),
        });
        view_ids.push(id);
        imported.push(id);
    }

    let mut accessor_ids = Vec::new();
    for accessor in document.accessors() {
        let Some(view) = accessor.view() else {
            log::warn!("accessor {} has no buffer view, skipping", accessor.index());
            accessor_ids.push(None);
            continue;
        };
        let id = assets.insert(Accessor {
            buffer_view: view_ids[view.index()],
            byte_offset: accessor.offset(),
            component_type: ComponentType::try_from(accessor.data_type().as_gl_enum())?,
            count: accessor.count(),
            accessor_type: accessor_type(accessor.dimensions()),
        });
        accessor_ids.push(Some(id));
        imported.push(id);
    }
    let accessor_id = |accessor: gltf::Accessor| accessor_ids[accessor.index()];

    let mut material_ids = Vec::new();
    for material in document.materials() {
        let id = assets.insert(Material {
            name: owned(material.name()),
        });
        material_ids.push(id);
        imported.push(id);
    }
    for texture in document.textures() {
        imported.push(assets.insert(Texture {
            name: owned(texture.name()),
        }));
    }
    for image in document.images() {
        imported.push(assets.insert(Image {
            name: owned(image.name()),
        }));
    }
    for sampler in document.samplers() {
        imported.push(assets.insert(Sampler {
            name: owned(sampler.name()),
        }));
    }
    for skin in document.skins() {
        imported.push(assets.insert(Skin {
            name: owned(skin.name()),
        }));
    }
    for animation in document.animations() {
        imported.push(assets.insert(Animation {
            name: owned(animation.name()),
        }));
    }

    let mut camera_ids = Vec::new();
    for camera in document.cameras() {
        let id = assets.insert(Camera {
            name: owned(camera.name()),
            projection: projection(&camera),
        });
        camera_ids.push(id);
        imported.push(id);
    }

    let mut mesh_ids = Vec::new();
    for mesh in document.meshes() {
        let mut primitives = Vec::new();
        for primitive in mesh.primitives() {
            let mut imported_primitive = Primitive {
                mode: primitive_mode(primitive.mode()),
                indices: primitive.indices().and_then(accessor_id),
                material: primitive.material().index().map(|i| material_ids[i]),
                ..Default::default()
            };
            for (semantic, accessor) in primitive.attributes() {
                match (attribute_name(&semantic), accessor_id(accessor)) {
                    (Some(name), Some(id)) => {
                        imported_primitive.attributes.insert(name, id);
                    }
                    (None, _) => log::warn!("unsupported attribute {:?}", semantic),
                    (_, None) => (),
                }
            }
            let mut targets = primitive.morph_targets();
            if let Some(target) = targets.next() {
                let displacements = [
                    (AttributeName::Position, target.positions()),
                    (AttributeName::Normal, target.normals()),
                    (AttributeName::Tangent, target.tangents()),
                ];
                for (name, accessor) in displacements {
                    if let Some(id) = accessor.and_then(accessor_id) {
                        imported_primitive.targets.insert(name, id);
                    }
                }
            }
            if targets.next().is_some() {
                log::debug!("only the first morph target of mesh {} is kept", mesh.index());
            }
            let id = assets.insert(imported_primitive);
            primitives.push(id);
            imported.push(id);
        }
        let id = assets.insert(Mesh {
            name: owned(mesh.name()),
            primitives,
        });
        mesh_ids.push(id);
        imported.push(id);
    }

    let mut node_ids = Vec::new();
    for node in document.nodes() {
        let content = match (node.mesh(), node.camera()) {
            (Some(mesh), camera) => {
                if camera.is_some() {
                    log::warn!(
                        "node {} has a mesh and a camera, keeping the mesh",
                        node.index()
                    );
                }
                NodeContent::Mesh(mesh_ids[mesh.index()])
            }
            (None, Some(camera)) => NodeContent::Camera(camera_ids[camera.index()]),
            (None, None) => NodeContent::Empty,
        };
        let id = assets.insert(Node::new(
            owned(node.name()),
            Some(Matrix4::from(node.transform().matrix())),
            content,
        ));
        node_ids.push(id);
        imported.push(id);
    }
    for node in document.nodes() {
        let parent = assets.node_mut(node_ids[node.index()])?;
        for child in node.children() {
            parent.add_child(node_ids[child.index()]);
        }
    }

    let mut scenes = Vec::new();
    for scene in document.scenes() {
        let mut imported_scene = Scene::new(owned(scene.name()));
        for node in scene.nodes() {
            imported_scene.add_node(node_ids[node.index()]);
        }
        let id = assets.insert(imported_scene);
        scenes.push(id);
        imported.push(id);
    }
    let default_scene = document.default_scene().map(|scene| scenes[scene.index()]);

    let mut graph = AssetSet::new();
    graph.add(assets, imported)?;
    graph.set_scene(default_scene);
    log::info!(
        "imported {} assets in {} scenes",
        graph.len(),
        scenes.len()
    );

    Ok(Import {
        graph,
        scenes,
        default_scene,
    })
}
