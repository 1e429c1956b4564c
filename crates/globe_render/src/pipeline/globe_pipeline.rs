//! Forward pipeline for the globe scene
//!
//! One shader drives three pipelines that differ only in primitive topology.
//! Frame uniforms sit in bind group 0; per-object uniforms live in one
//! dynamic-offset buffer in bind group 1, one slot per draw. Color goes to
//! the post pipeline's scene target; the depth buffer is also read there.

use std::num::NonZeroU64;

use wgpu::util::DeviceExt;

use globe_core::{ObjectKey, Topology};

use super::types::{FrameUniforms, ObjectUniforms, Vertex, OBJECT_UNIFORM_STRIDE};
use crate::resources::ResourceId;
use crate::surface::RenderError;
use crate::wgpu_backend::WgpuBackend;

/// Slots allocated up front in the object uniform buffer
const INITIAL_OBJECT_CAPACITY: usize = 64;

/// One object to draw this frame
#[derive(Clone, Copy, Debug)]
pub struct DrawItem {
    pub key: ObjectKey,
    pub buffer: ResourceId,
    pub vertex_count: u32,
    pub topology: Topology,
    pub uniforms: ObjectUniforms,
}

impl DrawItem {
    /// Translucent items are drawn after opaque ones
    pub fn is_translucent(&self) -> bool {
        self.uniforms.color[3] < 1.0
    }
}

/// Render pipeline for the globe scene
pub struct GlobePipeline {
    triangles: wgpu::RenderPipeline,
    lines: wgpu::RenderPipeline,
    points: wgpu::RenderPipeline,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    object_layout: wgpu::BindGroupLayout,
    object_buffer: wgpu::Buffer,
    object_bind_group: wgpu::BindGroup,
    object_capacity: usize,
    /// Depth texture
    depth_texture: Option<wgpu::TextureView>,
    depth_size: (u32, u32),
}

impl GlobePipeline {
    /// Create a new globe pipeline drawing into `color_format` targets
    pub fn new(device: &wgpu::Device, color_format: wgpu::TextureFormat) -> Self {
        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Globe Frame Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let object_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Globe Object Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(std::mem::size_of::<ObjectUniforms>() as u64),
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Globe Pipeline Layout"),
            bind_group_layouts: &[&frame_layout, &object_layout],
            push_constant_ranges: &[],
        });

        let shader_source = include_str!("../shaders/globe.wgsl");
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Globe Shader"),
            source: wgpu::ShaderSource::Wgsl(shader_source.into()),
        });

        let build = |label: &str, topology: wgpu::PrimitiveTopology, cull_mode: Option<wgpu::Face>| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[Self::vertex_buffer_layout()],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: color_format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode,
                    unclipped_depth: false,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    conservative: false,
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: wgpu::TextureFormat::Depth32Float,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState {
                    count: 1,
                    mask: !0,
                    alpha_to_coverage_enabled: false,
                },
                multiview: None,
                cache: None,
            })
        };

        let triangles = build(
            "Globe Triangle Pipeline",
            wgpu::PrimitiveTopology::TriangleList,
            Some(wgpu::Face::Back),
        );
        let lines = build("Globe Line Pipeline", wgpu::PrimitiveTopology::LineStrip, None);
        let points = build("Globe Point Pipeline", wgpu::PrimitiveTopology::PointList, None);

        let frame_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Globe Frame Uniform Buffer"),
            contents: bytemuck::bytes_of(&FrameUniforms::default()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Globe Frame Bind Group"),
            layout: &frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });

        let (object_buffer, object_bind_group) =
            Self::create_object_slots(device, &object_layout, INITIAL_OBJECT_CAPACITY);

        Self {
            triangles,
            lines,
            points,
            frame_buffer,
            frame_bind_group,
            object_layout,
            object_buffer,
            object_bind_group,
            object_capacity: INITIAL_OBJECT_CAPACITY,
            depth_texture: None,
            depth_size: (0, 0),
        }
    }

    /// Get the vertex buffer layout for Vertex
    fn vertex_buffer_layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                // position: vec3<f32>
                wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x3,
                    offset: 0,
                    shader_location: 0,
                },
                // normal: vec3<f32>
                wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x3,
                    offset: 12,
                    shader_location: 1,
                },
                // color: vec4<f32>
                wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x4,
                    offset: 24,
                    shader_location: 2,
                },
            ],
        }
    }

    fn create_object_slots(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        capacity: usize,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Globe Object Uniform Buffer"),
            size: capacity as u64 * OBJECT_UNIFORM_STRIDE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Globe Object Bind Group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: NonZeroU64::new(std::mem::size_of::<ObjectUniforms>() as u64),
                }),
            }],
        });
        (buffer, bind_group)
    }

    fn pipeline_for(&self, topology: Topology) -> &wgpu::RenderPipeline {
        match topology {
            Topology::Triangles => &self.triangles,
            Topology::LineStrip => &self.lines,
            Topology::Points => &self.points,
        }
    }

    /// Update frame uniforms
    pub fn update_uniforms(&self, queue: &wgpu::Queue, uniforms: &FrameUniforms) {
        queue.write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(uniforms));
    }

    /// Write one uniform slot per item, growing the slot buffer if needed
    pub fn prepare_objects(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, items: &[DrawItem]) {
        if items.len() > self.object_capacity {
            let capacity = items.len().next_power_of_two();
            let (buffer, bind_group) = Self::create_object_slots(device, &self.object_layout, capacity);
            self.object_buffer = buffer;
            self.object_bind_group = bind_group;
            self.object_capacity = capacity;
            log::debug!("Grew object uniform slots to {}", capacity);
        }
        if items.is_empty() {
            return;
        }
        queue.write_buffer(&self.object_buffer, 0, &pack_object_uniforms(items));
    }

    /// Ensure depth texture exists and is the right size
    pub fn ensure_depth_texture(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if self.depth_texture.is_none() || self.depth_size != (width, height) {
            let depth_texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some("Depth Texture"),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Depth32Float,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            });

            self.depth_texture = Some(depth_texture.create_view(&wgpu::TextureViewDescriptor::default()));
            self.depth_size = (width, height);
        }
    }

    /// Depth view, once [`ensure_depth_texture`](Self::ensure_depth_texture) ran
    pub fn depth_view(&self) -> Option<&wgpu::TextureView> {
        self.depth_texture.as_ref()
    }

    /// Render the scene
    ///
    /// `items` must be the same slice passed to [`prepare_objects`](Self::prepare_objects)
    /// this frame. Returns the number of draw calls issued.
    pub fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        items: &[DrawItem],
        backend: &WgpuBackend,
        clear_color: wgpu::Color,
    ) -> Result<u32, RenderError> {
        let depth_view = self
            .depth_texture
            .as_ref()
            .ok_or_else(|| RenderError::Other("depth texture not created".to_string()))?;

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Globe Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear_color),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_bind_group(0, &self.frame_bind_group, &[]);

        let mut draws = 0;
        for (slot, item) in items.iter().enumerate().take(self.object_capacity) {
            if item.vertex_count == 0 {
                continue;
            }
            let Some(buffer) = backend.buffer(item.buffer) else {
                log::warn!("Skipping draw of {:?}: vertex buffer is gone", item.key);
                continue;
            };
            let offset = (slot as u64 * OBJECT_UNIFORM_STRIDE) as u32;
            render_pass.set_pipeline(self.pipeline_for(item.topology));
            render_pass.set_bind_group(1, &self.object_bind_group, &[offset]);
            render_pass.set_vertex_buffer(0, buffer.slice(..));
            render_pass.draw(0..item.vertex_count, 0..1);
            draws += 1;
        }
        Ok(draws)
    }
}

/// Lay out object uniforms at [`OBJECT_UNIFORM_STRIDE`] intervals
pub fn pack_object_uniforms(items: &[DrawItem]) -> Vec<u8> {
    let stride = OBJECT_UNIFORM_STRIDE as usize;
    let mut bytes = vec![0u8; items.len() * stride];
    for (slot, item) in items.iter().enumerate() {
        let src = bytemuck::bytes_of(&item.uniforms);
        bytes[slot * stride..slot * stride + src.len()].copy_from_slice(src);
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(alpha: f32) -> DrawItem {
        DrawItem {
            key: ObjectKey::default(),
            buffer: ResourceId::default(),
            vertex_count: 3,
            topology: Topology::Triangles,
            uniforms: ObjectUniforms {
                color: [1.0, 1.0, 1.0, alpha],
                ..ObjectUniforms::default()
            },
        }
    }

    #[test]
    fn test_vertex_buffer_layout_stride() {
        let layout = GlobePipeline::vertex_buffer_layout();
        assert_eq!(layout.array_stride, std::mem::size_of::<Vertex>() as u64);
        assert_eq!(layout.attributes.len(), 3);
        assert_eq!(layout.attributes[2].offset, 24);
    }

    #[test]
    fn test_object_uniforms_packed_at_stride() {
        let bytes = pack_object_uniforms(&[item(1.0), item(0.5)]);
        assert_eq!(bytes.len(), 2 * OBJECT_UNIFORM_STRIDE as usize);
        let second: ObjectUniforms = bytemuck::pod_read_unaligned(
            &bytes[OBJECT_UNIFORM_STRIDE as usize..OBJECT_UNIFORM_STRIDE as usize + 80],
        );
        assert_eq!(second.color[3], 0.5);
    }

    #[test]
    fn test_translucency() {
        assert!(!item(1.0).is_translucent());
        assert!(item(0.6).is_translucent());
    }
}
