use crate::uniforms::ObjectUniforms;
use knotlab_scene::{ObjectId, Shape};
use std::collections::BTreeMap;
use wgpu::util::DeviceExt;

/// Geometry and per-object uniform storage of one scene mesh.
pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
    pub uniform_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    shape: Shape,
}

/// Meshes uploaded on first draw, keyed by scene object.
#[derive(Default)]
pub struct MeshCache {
    meshes: BTreeMap<ObjectId, GpuMesh>,
}

impl MeshCache {
    /// Upload `shape` for `id` unless an identical upload already exists.
    pub fn ensure(
        &mut self,
        device: &wgpu::Device,
        object_layout: &wgpu::BindGroupLayout,
        id: ObjectId,
        shape: &Shape,
    ) {
        if self.meshes.get(&id).is_some_and(|m| m.shape == *shape) {
            return;
        }
        let data = shape.build();
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("mesh_vertex_buffer"),
            contents: bytemuck::cast_slice(&data.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("mesh_index_buffer"),
            contents: bytemuck::cast_slice(&data.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("object_uniform_buffer"),
            size: std::mem::size_of::<ObjectUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("object_bind_group"),
            layout: object_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });
        tracing::debug!(
            "uploaded mesh for object {} ({} triangles)",
            id.0,
            data.triangle_count()
        );
        self.meshes.insert(
            id,
            GpuMesh {
                vertex_buffer,
                index_buffer,
                index_count: data.indices.len() as u32,
                uniform_buffer,
                bind_group,
                shape: *shape,
            },
        );
    }

    pub fn get(&self, id: ObjectId) -> Option<&GpuMesh> {
        self.meshes.get(&id)
    }

    pub fn clear(&mut self) {
        self.meshes.clear();
    }
}
