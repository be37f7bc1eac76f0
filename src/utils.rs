use bytemuck::NoUninit;
use glam::Vec3;

use crate::model::MeshNode;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, NoUninit)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
}

/// GPU copy of a [`Mesh`]. Buffers are reused across frames and only
/// reallocated when the mesh outgrows them.
pub struct MeshBuffer {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
    vertex_capacity: usize,
    index_capacity: usize,
}

/// Capacity to reallocate to when `needed` elements do not fit, or None when they do.
fn grown_capacity(current: usize, needed: usize) -> Option<usize> {
    (needed > current).then(|| needed.next_power_of_two())
}

fn create_buffer<T>(device: &wgpu::Device, label: &str, len: usize, usage: wgpu::BufferUsages) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: (len.max(1) * std::mem::size_of::<T>()) as wgpu::BufferAddress,
        usage: usage | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

impl MeshBuffer {
    pub fn with_capacity(device: &wgpu::Device, vertices: usize, indices: usize) -> Self {
        Self {
            vertex_buffer: create_buffer::<Vertex>(device, "Mesh Vertex Buffer", vertices, wgpu::BufferUsages::VERTEX),
            index_buffer: create_buffer::<u32>(device, "Mesh Index Buffer", indices, wgpu::BufferUsages::INDEX),
            index_count: 0,
            vertex_capacity: vertices.max(1),
            index_capacity: indices.max(1),
        }
    }

    /// Copy `mesh` into the buffers, growing them first when it does not fit.
    pub fn write(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, mesh: &Mesh) {
        if let Some(capacity) = grown_capacity(self.vertex_capacity, mesh.vertices.len()) {
            self.vertex_buffer =
                create_buffer::<Vertex>(device, "Mesh Vertex Buffer", capacity, wgpu::BufferUsages::VERTEX);
            self.vertex_capacity = capacity;
            tracing::debug!(capacity, "grew vertex buffer");
        }
        if let Some(capacity) = grown_capacity(self.index_capacity, mesh.indices.len()) {
            self.index_buffer = create_buffer::<u32>(device, "Mesh Index Buffer", capacity, wgpu::BufferUsages::INDEX);
            self.index_capacity = capacity;
        }
        if !mesh.is_empty() {
            queue.write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(&mesh.vertices));
            queue.write_buffer(&self.index_buffer, 0, bytemuck::cast_slice(&mesh.indices));
        }
        self.index_count = mesh.indices.len() as u32;
    }
}

/// CPU-side triangle list, rebuilt every frame from the scene.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

/// Local-space unit normals of the six box faces and the two tangents spanning each face.
const FACES: [(Vec3, Vec3, Vec3); 6] = [
    (Vec3::X, Vec3::NEG_Z, Vec3::Y),
    (Vec3::NEG_X, Vec3::Z, Vec3::Y),
    (Vec3::Y, Vec3::X, Vec3::NEG_Z),
    (Vec3::NEG_Y, Vec3::X, Vec3::Z),
    (Vec3::Z, Vec3::X, Vec3::Y),
    (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
];

impl Mesh {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.indices.is_empty()
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
    }

    /// Append the world-space box of `node`, four vertices per face, counter-clockwise outward.
    pub fn push_box(&mut self, node: &MeshNode) {
        let h = node.half_extents;
        for (normal, u, v) in FACES {
            let base = self.vertices.len() as u32;
            let center = normal * h;
            let (du, dv) = (u * h, v * h);
            let world_normal = (node.orientation * normal).to_array();
            for (su, sv) in [(-1.0f32, -1.0f32), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                let local = center + du * su + dv * sv;
                self.vertices.push(Vertex {
                    pos: (node.position + node.orientation * local).to_array(),
                    normal: world_normal,
                    color: node.color,
                });
            }
            self.indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
    }
}
