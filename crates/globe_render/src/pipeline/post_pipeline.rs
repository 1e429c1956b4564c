//! Composite pass for the post-processing chain
//!
//! The globe pipeline renders into an offscreen [`SCENE_FORMAT`] target.
//! This pass draws one fullscreen triangle that reads that target and the
//! depth buffer, applies the enabled stages and writes the surface.

use wgpu::util::DeviceExt;

use super::types::PostUniforms;
use crate::surface::RenderError;

/// Offscreen scene color format; linear, so bloom sees values above 1
pub const SCENE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Fullscreen composite pipeline
pub struct PostPipeline {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    /// Scene target and the bind group reading it, rebuilt on resize
    scene_view: Option<wgpu::TextureView>,
    bind_group: Option<wgpu::BindGroup>,
    size: (u32, u32),
}

impl PostPipeline {
    /// Create the composite pipeline writing `surface_format`
    pub fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Post Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Post Pipeline Layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Post Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/post.wgsl").into()),
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Post Composite Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Post Uniform Buffer"),
            contents: bytemuck::bytes_of(&PostUniforms::default()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        Self {
            pipeline,
            layout,
            uniform_buffer,
            scene_view: None,
            bind_group: None,
            size: (0, 0),
        }
    }

    /// Recreate the scene target at `width`x`height` and rebind it with `depth_view`
    ///
    /// Call after the depth texture was recreated, since the bind group
    /// holds its view.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32, depth_view: &wgpu::TextureView) {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Scene Color Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SCENE_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let scene_view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Post Bind Group"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&scene_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(depth_view),
                },
            ],
        });

        self.scene_view = Some(scene_view);
        self.bind_group = Some(bind_group);
        self.size = (width, height);
        log::debug!("Post targets resized to {}x{}", width, height);
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Target the globe pipeline renders into
    pub fn scene_view(&self) -> Result<&wgpu::TextureView, RenderError> {
        self.scene_view
            .as_ref()
            .ok_or_else(|| RenderError::Other("post targets not created".to_string()))
    }

    /// Update composite uniforms
    pub fn update_uniforms(&self, queue: &wgpu::Queue, uniforms: &PostUniforms) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));
    }

    /// Composite the scene target onto `view`
    pub fn render(&self, encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView) -> Result<(), RenderError> {
        let bind_group = self
            .bind_group
            .as_ref()
            .ok_or_else(|| RenderError::Other("post targets not created".to_string()))?;

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Post Composite Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, bind_group, &[]);
        render_pass.draw(0..3, 0..1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shader_layout_matches_uniforms() {
        let source = include_str!("../shaders/post.wgsl");
        assert!(source.contains("struct PostUniforms"));
        // vec4 bloom + vec4 ssao + 4 x 16-byte rows
        assert_eq!(std::mem::size_of::<PostUniforms>(), 16 * 6);
        assert!(source.contains("fn bloom("));
        assert!(source.contains("fn ambient_occlusion("));
    }

    #[test]
    fn test_scene_format_is_linear() {
        assert!(!SCENE_FORMAT.is_srgb());
        assert_eq!(SCENE_FORMAT.block_copy_size(None), Some(8));
    }
}
