//! GPU resource handles carrying a stable identity
//!
//! wgpu objects cannot be compared, so every buffer, bind group and
//! pipeline the renderer binds is paired with a [`ResourceId`]. The pass
//! tracker records these ids to tell what is currently bound.

use std::sync::atomic::{AtomicU64, Ordering};

use wgpu::util::DeviceExt;

use crate::bindings::{AttributeStream, BLOCK_BINDING};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u64);

impl ResourceId {
    /// Allocate a process-unique id
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A buffer plus the number of elements it holds
pub struct GpuBuffer {
    pub id: ResourceId,
    pub buffer: wgpu::Buffer,
    pub len: u32,
}

impl GpuBuffer {
    /// Upload `data` into a new buffer with the given usage
    pub fn with_data<T: bytemuck::Pod>(
        device: &wgpu::Device,
        label: &str,
        data: &[T],
        usage: wgpu::BufferUsages,
    ) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(data),
            usage,
        });
        Self {
            id: ResourceId::next(),
            buffer,
            len: data.len() as u32,
        }
    }

    /// A uniform buffer sized for one `T`, rewritten with `queue.write_buffer`
    pub fn uniform<T: bytemuck::Pod>(device: &wgpu::Device, label: &str, initial: &T) -> Self {
        Self::with_data(
            device,
            label,
            std::slice::from_ref(initial),
            wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        )
    }

    pub fn write<T: bytemuck::Pod>(&self, queue: &wgpu::Queue, value: &T) {
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(value));
    }
}

pub struct GpuBindGroup {
    pub id: ResourceId,
    pub group: wgpu::BindGroup,
}

impl GpuBindGroup {
    pub fn new(group: wgpu::BindGroup) -> Self {
        Self {
            id: ResourceId::next(),
            group,
        }
    }
}

/// Layout for a group holding one uniform block at [`BLOCK_BINDING`]
pub fn uniform_block_layout(device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: BLOCK_BINDING,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    })
}

pub fn uniform_block_group(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::BindGroupLayout,
    buffer: &GpuBuffer,
) -> GpuBindGroup {
    GpuBindGroup::new(device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: BLOCK_BINDING,
            resource: buffer.buffer.as_entire_binding(),
        }],
    }))
}

/// One vertex buffer per attribute stream, indexed by [`AttributeStream`]
#[derive(Default)]
pub struct VertexStreams {
    buffers: [Option<GpuBuffer>; AttributeStream::COUNT],
}

impl VertexStreams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: bytemuck::Pod>(
        &mut self,
        device: &wgpu::Device,
        stream: AttributeStream,
        data: &[T],
    ) {
        let label = format!("{} stream", stream.name());
        self.buffers[stream.index()] = Some(GpuBuffer::with_data(
            device,
            &label,
            data,
            wgpu::BufferUsages::VERTEX,
        ));
    }

    pub fn get(&self, stream: AttributeStream) -> Option<&GpuBuffer> {
        self.buffers[stream.index()].as_ref()
    }

    /// Vertex count shared by all present streams
    pub fn vertex_count(&self) -> u32 {
        self.buffers
            .iter()
            .flatten()
            .map(|b| b.len)
            .min()
            .unwrap_or(0)
    }
}
