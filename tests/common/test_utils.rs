use std::{
    cell::RefCell,
    collections::BTreeSet,
    rc::Rc,
};

use flow_scene::{
    AssetId, Assets, DrawCall, RenderDevice,
    data_structures::{
        accessor::{Accessor, AccessorType, Buffer, BufferView, ComponentType},
        mesh::{AttributeName, Mesh, Primitive},
        scene::{Node, Scene},
    },
    error::Result,
};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Handle to a buffer made by [`MockDevice`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct MockBuffer(pub usize);

#[derive(Clone, Debug)]
pub struct BufferRecord {
    pub label: String,
    pub usage: wgpu::BufferUsages,
    pub contents: Vec<u8>,
}

/// One recorded draw.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawRecord {
    pub primitive: AssetId,
    pub vertex_buffers: Vec<MockBuffer>,
    pub vertex_count: u32,
    pub index: Option<(MockBuffer, wgpu::IndexFormat, u32)>,
}

/// Everything the renderer asked the device to do.
#[derive(Debug, Default)]
pub struct DeviceLog {
    pub buffers: Vec<BufferRecord>,
    pub live: BTreeSet<MockBuffer>,
    pub destroyed: Vec<MockBuffer>,
    pub upload_batches: usize,
    pub clears: Vec<wgpu::Color>,
    pub frames: Vec<Vec<DrawRecord>>,
    pub waits: usize,
}

impl DeviceLog {
    pub fn live_labels(&self) -> Vec<&str> {
        self.live
            .iter()
            .map(|buffer| self.buffers[buffer.0].label.as_str())
            .collect()
    }
}

/// Recording device: keeps every call in a shared [`DeviceLog`] so the log
/// can still be read after the renderer owning the device is dropped.
#[derive(Clone, Debug, Default)]
pub struct MockDevice {
    pub log: Rc<RefCell<DeviceLog>>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RenderDevice for MockDevice {
    type Buffer = MockBuffer;
    type Uploads = Vec<MockBuffer>;
    type Frame = Vec<DrawRecord>;

    fn begin_uploads(&self) -> Vec<MockBuffer> {
        Vec::new()
    }

    fn create_buffer(
        &self,
        uploads: &mut Vec<MockBuffer>,
        label: &str,
        contents: &[u8],
        usage: wgpu::BufferUsages,
    ) -> MockBuffer {
        let mut log = self.log.borrow_mut();
        let buffer = MockBuffer(log.buffers.len());
        log.buffers.push(BufferRecord {
            label: label.to_string(),
            usage,
            contents: contents.to_vec(),
        });
        log.live.insert(buffer);
        uploads.push(buffer);
        buffer
    }

    fn destroy_buffer(&self, buffer: MockBuffer) {
        let mut log = self.log.borrow_mut();
        assert!(log.live.remove(&buffer), "{:?} destroyed twice", buffer);
        log.destroyed.push(buffer);
    }

    fn submit_uploads(&self, _uploads: Vec<MockBuffer>) {
        self.log.borrow_mut().upload_batches += 1;
    }

    fn begin_frame(&self, clear_colour: wgpu::Color) -> Result<Vec<DrawRecord>> {
        self.log.borrow_mut().clears.push(clear_colour);
        Ok(Vec::new())
    }

    fn draw(&self, frame: &mut Vec<DrawRecord>, draw: &DrawCall<'_, MockBuffer>) {
        frame.push(DrawRecord {
            primitive: draw.primitive,
            vertex_buffers: draw.vertex_buffers.iter().map(|(_, b)| **b).collect(),
            vertex_count: draw.vertex_count,
            index: draw
                .index
                .as_ref()
                .map(|index| (*index.buffer, index.format, index.count)),
        });
    }

    fn submit_frame(&self, frame: Vec<DrawRecord>) {
        self.log.borrow_mut().frames.push(frame);
    }

    async fn on_submitted_work_done(&self) -> Result<()> {
        self.log.borrow_mut().waits += 1;
        Ok(())
    }
}

/// Ids of a single-triangle scene.
#[derive(Clone, Copy, Debug)]
pub struct Triangle {
    pub scene: AssetId,
    pub node: AssetId,
    pub mesh: AssetId,
    pub primitive: AssetId,
    pub accessor: AssetId,
    pub view: AssetId,
    pub buffer: AssetId,
}

pub const TRIANGLE: [[f32; 3]; 3] = [[0.0, 0.5, 0.0], [-0.5, -0.5, 0.0], [0.5, -0.5, 0.0]];

/// Scene -> Node -> Mesh -> Primitive with one float VEC3 POSITION accessor
/// of three vertices.
pub fn triangle(assets: &mut Assets) -> Triangle {
    let buffer = assets.insert(Buffer::new(bytemuck::cast_slice(&TRIANGLE).to_vec()));
    let view = assets.insert(BufferView::new(buffer, 0, 36));
    let accessor = assets.insert(Accessor::new(
        view,
        ComponentType::Float,
        3,
        AccessorType::Vec3,
    ));
    let primitive =
        assets.insert(Primitive::default().with_attribute(AttributeName::Position, accessor));
    let mesh = assets.insert(Mesh {
        name: Some("triangle".to_string()),
        primitives: vec![primitive],
    });
    let node = assets.insert(Node::with_mesh(mesh));
    let mut scene = Scene::new(Some("triangle".to_string()));
    scene.add_node(node);
    let scene = assets.insert(scene);
    Triangle {
        scene,
        node,
        mesh,
        primitive,
        accessor,
        view,
        buffer,
    }
}
