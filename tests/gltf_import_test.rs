use cgmath::{Matrix4, vec3};
use flow_scene::{
    AssetKind, Assets, Error, FrameStats, Renderer, RendererConfig, crawl,
    data_structures::scene::{NodeContent, Projection},
    resources::document::import,
};

use crate::common::test_utils::{MockDevice, TRIANGLE, init_logger};

mod common;

const TRIANGLE_GLTF: &str = r#"{
    "asset": { "version": "2.0" },
    "scene": 0,
    "scenes": [{ "name": "main", "nodes": [0] }],
    "nodes": [
        { "name": "root", "children": [1], "translation": [1.0, 2.0, 3.0] },
        { "mesh": 0 },
        { "camera": 0 }
    ],
    "cameras": [
        { "type": "perspective", "perspective": { "yfov": 0.8, "znear": 0.1 } }
    ],
    "meshes": [
        {
            "name": "triangle",
            "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1, "material": 0 }]
        }
    ],
    "materials": [{ "name": "unlit" }],
    "accessors": [
        {
            "bufferView": 0,
            "componentType": 5126,
            "count": 3,
            "type": "VEC3",
            "min": [-0.5, -0.5, 0.0],
            "max": [0.5, 0.5, 0.0]
        },
        { "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }
    ],
    "bufferViews": [
        { "buffer": 0, "byteOffset": 0, "byteLength": 36, "target": 34962 },
        { "buffer": 0, "byteOffset": 36, "byteLength": 6, "target": 34963 }
    ],
    "buffers": [{ "uri": "triangle.bin", "byteLength": 42 }]
}"#;

fn triangle_bin() -> Vec<gltf::buffer::Data> {
    let mut bytes = bytemuck::cast_slice::<_, u8>(&TRIANGLE).to_vec();
    bytes.extend_from_slice(bytemuck::cast_slice(&[0u16, 1, 2]));
    vec![gltf::buffer::Data(bytes)]
}

#[test]
fn should_import_every_entity() {
    init_logger();
    let gltf = gltf::Gltf::from_slice(TRIANGLE_GLTF.as_bytes()).unwrap();
    let mut assets = Assets::new();

    let import = import(&mut assets, &gltf.document, &triangle_bin()).unwrap();
    assert_eq!(import.graph.len(), 13);
    assert_eq!(assets.len(), 13);
    assert_eq!(import.scenes.len(), 1);
    assert_eq!(import.default_scene, Some(import.scenes[0]));
    assert_eq!(import.graph.scene(), import.default_scene);

    let scene = import.scenes[0];
    let reachable = crawl(&assets, scene).unwrap();
    // the camera node is not part of the scene
    assert_eq!(reachable.len(), 11);

    let root = assets.node(reachable[1]).unwrap();
    assert_eq!(root.name.as_deref(), Some("root"));
    assert_eq!(
        root.matrix,
        Some(Matrix4::from_translation(vec3(1.0, 2.0, 3.0)))
    );
    let child = assets.node(root.children()[0]).unwrap();
    let mesh = assets.mesh(child.mesh().unwrap()).unwrap();
    assert_eq!(mesh.name.as_deref(), Some("triangle"));

    let primitive = assets.primitive(mesh.primitives[0]).unwrap();
    assert!(primitive.material.is_some());
    let indices = assets.accessor(primitive.indices.unwrap()).unwrap();
    let view = assets.buffer_view(indices.buffer_view).unwrap();
    assert_eq!(view.byte_offset, 36);
    assert!(view.is_index_buffer());

    let camera = import
        .graph
        .iter()
        .find(|id| assets.kind(*id).unwrap() == AssetKind::Camera)
        .unwrap();
    assert!(matches!(
        assets.camera(camera).unwrap().projection,
        Projection::Perspective { zfar: None, .. }
    ));
    assert!(import.graph.iter().any(|id| {
        matches!(assets.get(id).unwrap(), flow_scene::Asset::Node(node) if node.content == NodeContent::Camera(camera))
    }));
}

#[test]
fn should_fail_without_buffer_data() {
    let gltf = gltf::Gltf::from_slice(TRIANGLE_GLTF.as_bytes()).unwrap();
    let mut assets = Assets::new();

    let err = import(&mut assets, &gltf.document, &[]).unwrap_err();
    assert!(matches!(err, Error::MissingBufferData(0)));
}

#[tokio::test]
async fn should_render_an_imported_scene() {
    init_logger();
    let gltf = gltf::Gltf::from_slice(TRIANGLE_GLTF.as_bytes()).unwrap();
    let mut assets = Assets::new();
    let import = import(&mut assets, &gltf.document, &triangle_bin()).unwrap();
    let device = MockDevice::new();
    let mut renderer = Renderer::new(device.clone(), RendererConfig::default());

    let added = renderer.add(&assets, [&import.graph]).await.unwrap();
    assert_eq!(added.len(), 13);
    renderer.set_scene(import.default_scene);
    let stats = renderer.render(&assets).await.unwrap();
    assert_eq!(stats, Some(FrameStats { draws: 1 }));

    let log = device.log.borrow();
    assert_eq!(log.buffers.len(), 2);
    assert_eq!(log.buffers[0].contents.len(), 36);
    assert_eq!(log.buffers[1].contents, vec![0, 0, 1, 0, 2, 0]);
    let draw = &log.frames[0][0];
    assert_eq!(draw.vertex_count, 3);
    assert_eq!(draw.index.map(|(_, format, count)| (format, count)), Some((wgpu::IndexFormat::Uint16, 3)));
}
