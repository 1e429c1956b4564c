//! GPU rendering system
//!
//! Manages GPU rendering including:
//! - Window surface and device
//! - The globe pipeline and its depth buffer
//! - The post-processing composite and its scene target
//! - Frame rendering

use std::sync::Arc;
use winit::window::Window;
use globe_core::Color;
use globe_render::{
    pipeline::{GlobePipeline, PostPipeline, SCENE_FORMAT},
    RenderError, SurfaceContext, WgpuBackend,
};

use crate::app::GlobeApp;

/// Manages GPU rendering
pub struct RenderSystem {
    surface: SurfaceContext,
    pipeline: GlobePipeline,
    post: PostPipeline,
}

impl RenderSystem {
    /// Create the surface and pipeline for `window`
    ///
    /// The returned backend owns the device and is handed to the app.
    pub fn new(window: Arc<Window>, vsync: bool) -> Result<(Self, WgpuBackend), RenderError> {
        let (surface, backend) = pollster::block_on(SurfaceContext::new(window, vsync))?;

        let pipeline = GlobePipeline::new(backend.device(), SCENE_FORMAT);
        let post = PostPipeline::new(backend.device(), surface.format());

        let mut render = Self { surface, pipeline, post };
        let (width, height) = (render.surface.config.width, render.surface.config.height);
        render.ensure_targets(&backend, width, height);
        Ok((render, backend))
    }

    /// Size the depth buffer and the scene target, rebinding the composite
    fn ensure_targets(&mut self, backend: &WgpuBackend, width: u32, height: u32) {
        self.pipeline.ensure_depth_texture(backend.device(), width, height);
        if self.post.size() == (width, height) {
            return;
        }
        if let Some(depth_view) = self.pipeline.depth_view() {
            self.post.resize(backend.device(), width, height, depth_view);
        }
    }

    /// Handle window resize
    pub fn resize(&mut self, backend: &WgpuBackend, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.surface
            .resize(backend.device(), winit::dpi::PhysicalSize::new(width, height));
        self.ensure_targets(backend, width, height);
    }

    /// Reconfigure after the surface was lost
    pub fn reconfigure(&self, backend: &WgpuBackend) {
        self.surface.reconfigure(backend.device());
    }

    /// Render a single frame of the app
    ///
    /// Returns the number of draw calls issued.
    pub fn render_frame(&mut self, app: &GlobeApp<WgpuBackend>) -> Result<u32, RenderError> {
        let backend = app.context().backend();
        let device = backend.device();
        let queue = backend.queue();

        let items = app.context().draw_list();
        self.pipeline.update_uniforms(queue, &app.frame_uniforms());
        self.post.update_uniforms(queue, &app.post_uniforms());
        self.pipeline.prepare_objects(device, queue, &items);

        let output = self.surface.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Globe Render Encoder"),
        });
        let draws = self.pipeline.render(
            &mut encoder,
            self.post.scene_view()?,
            &items,
            backend,
            clear_color(app.clear_color()),
        )?;
        self.post.render(&mut encoder, &view)?;

        queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(draws)
    }
}

/// Theme background as a wgpu clear color
fn clear_color(color: Color) -> wgpu::Color {
    wgpu::Color {
        r: color.r as f64,
        g: color.g as f64,
        b: color.b as f64,
        a: color.a as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_color_conversion() {
        let color = clear_color(Color::rgb(0.0, 0.5, 1.0));
        assert_eq!(color.r, 0.0);
        assert_eq!(color.g, 0.5);
        assert_eq!(color.b, 1.0);
        assert_eq!(color.a, 1.0);
    }
}
