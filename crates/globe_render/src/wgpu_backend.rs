//! [`GpuBackend`] on a real wgpu device

use slotmap::SlotMap;
use wgpu::util::DeviceExt;

use crate::resources::{GpuBackend, ResourceId, ResourceKind};

/// wgpu requires copy sizes in multiples of four bytes
const COPY_ALIGNMENT: u64 = wgpu::COPY_BUFFER_ALIGNMENT;

enum GpuResource {
    Buffer {
        buffer: wgpu::Buffer,
        size: u64,
    },
    Texture {
        texture: wgpu::Texture,
        view: wgpu::TextureView,
        bytes: u64,
    },
}

impl GpuResource {
    fn bytes(&self) -> u64 {
        match self {
            GpuResource::Buffer { size, .. } => *size,
            GpuResource::Texture { bytes, .. } => *bytes,
        }
    }
}

/// Owns the device, the queue and every allocation made through them
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    resources: SlotMap<ResourceId, GpuResource>,
}

impl WgpuBackend {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            resources: SlotMap::with_key(),
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn buffer(&self, id: ResourceId) -> Option<&wgpu::Buffer> {
        match self.resources.get(id)? {
            GpuResource::Buffer { buffer, .. } => Some(buffer),
            GpuResource::Texture { .. } => None,
        }
    }

    pub fn texture(&self, id: ResourceId) -> Option<&wgpu::Texture> {
        match self.resources.get(id)? {
            GpuResource::Texture { texture, .. } => Some(texture),
            GpuResource::Buffer { .. } => None,
        }
    }

    pub fn texture_view(&self, id: ResourceId) -> Option<&wgpu::TextureView> {
        match self.resources.get(id)? {
            GpuResource::Texture { view, .. } => Some(view),
            GpuResource::Buffer { .. } => None,
        }
    }

    fn new_vertex_buffer(&self, label: &str, contents: &[u8]) -> (wgpu::Buffer, u64) {
        let usage = wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST;
        if contents.is_empty() {
            let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: COPY_ALIGNMENT,
                usage,
                mapped_at_creation: false,
            });
            return (buffer, COPY_ALIGNMENT);
        }
        let padded = pad_to_alignment(contents);
        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: &padded,
            usage,
        });
        (buffer, padded.len() as u64)
    }
}

/// Copy of `contents` zero-padded to [`COPY_ALIGNMENT`]
fn pad_to_alignment(contents: &[u8]) -> Vec<u8> {
    let mut padded = contents.to_vec();
    let remainder = padded.len() as u64 % COPY_ALIGNMENT;
    if remainder != 0 {
        padded.resize(padded.len() + (COPY_ALIGNMENT - remainder) as usize, 0);
    }
    padded
}

impl GpuBackend for WgpuBackend {
    fn create_buffer(&mut self, label: &str, contents: &[u8]) -> ResourceId {
        let (buffer, size) = self.new_vertex_buffer(label, contents);
        self.resources.insert(GpuResource::Buffer { buffer, size })
    }

    fn write_buffer(&mut self, id: ResourceId, contents: &[u8]) -> bool {
        let current = match self.resources.get(id) {
            Some(GpuResource::Buffer { size, .. }) => *size,
            _ => return false,
        };
        if contents.is_empty() {
            return true;
        }
        let padded = pad_to_alignment(contents);
        if padded.len() as u64 > current {
            // Grow in place so the id stays valid
            let (buffer, size) = self.new_vertex_buffer("Grown Vertex Buffer", &padded);
            if let Some(slot) = self.resources.get_mut(id) {
                *slot = GpuResource::Buffer { buffer, size };
            }
            return true;
        }
        if let Some(GpuResource::Buffer { buffer, .. }) = self.resources.get(id) {
            self.queue.write_buffer(buffer, 0, &padded);
        }
        true
    }

    fn create_texture(&mut self, label: &str, width: u32, height: u32, rgba: &[u8]) -> ResourceId {
        let width = width.max(1);
        let height = height.max(1);
        let expected = width as usize * height as usize * 4;
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        if rgba.len() == expected {
            self.queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                rgba,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * width),
                    rows_per_image: Some(height),
                },
                size,
            );
        } else {
            log::warn!(
                "Texture '{}' expected {} bytes, got {}; left zero-filled",
                label,
                expected,
                rgba.len()
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.resources.insert(GpuResource::Texture {
            texture,
            view,
            bytes: expected as u64,
        })
    }

    fn release(&mut self, id: ResourceId) -> bool {
        match self.resources.remove(id) {
            Some(GpuResource::Buffer { buffer, .. }) => {
                buffer.destroy();
                true
            }
            Some(GpuResource::Texture { texture, .. }) => {
                texture.destroy();
                true
            }
            None => false,
        }
    }

    fn kind(&self, id: ResourceId) -> Option<ResourceKind> {
        self.resources.get(id).map(|r| match r {
            GpuResource::Buffer { .. } => ResourceKind::Buffer,
            GpuResource::Texture { .. } => ResourceKind::Texture,
        })
    }

    fn live_count(&self) -> usize {
        self.resources.len()
    }

    fn live_bytes(&self) -> usize {
        self.resources.values().map(|r| r.bytes() as usize).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padding() {
        assert_eq!(pad_to_alignment(&[1, 2, 3]).len(), 4);
        assert_eq!(pad_to_alignment(&[1, 2, 3, 4]).len(), 4);
        assert_eq!(pad_to_alignment(&[9; 41]), {
            let mut v = vec![9; 41];
            v.extend([0, 0, 0]);
            v
        });
    }
}
