//! Globe Logistics - interactive 3D logistics globe
//!
//! Opens a window, renders the globe with wgpu and forwards input to the
//! application.

use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::WindowId,
};

use globe_core::DataFormat;
use globe_input::InteractionMode;
use globe_render::{OverlayMode, RenderError, WgpuBackend};
use globe_logistics::config::AppConfig;
use globe_logistics::systems::{RenderSystem, SimulationSystem, TitleStatus, WindowSystem};
use globe_logistics::GlobeApp;

/// Main application state
struct App {
    config: AppConfig,
    window: Option<WindowSystem>,
    render: Option<RenderSystem>,
    globe: Option<GlobeApp<WgpuBackend>>,
    simulation: SimulationSystem,
}

impl App {
    fn new(config: AppConfig) -> Self {
        Self {
            config,
            window: None,
            render: None,
            globe: None,
            simulation: SimulationSystem::new(),
        }
    }

    /// Create the window, the GPU surface and the scene
    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<(), String> {
        let window = WindowSystem::create(event_loop, &self.config.window).map_err(|e| e.to_string())?;
        let (render, backend) = RenderSystem::new(window.window().clone(), self.config.window.vsync)
            .map_err(|e| e.to_string())?;

        let mut globe = GlobeApp::new(self.config.clone(), backend);
        let size = window.window().inner_size();
        globe.resize(size.width, size.height);

        if let Some(path) = &self.config.globe.data_file {
            match globe.import_file(path) {
                Ok(()) => log::info!(
                    "Loaded {} cities and {} routes from {}",
                    globe.store().data().cities.len(),
                    globe.store().data().routes.len(),
                    path
                ),
                Err(e) => log::warn!("Failed to load data file {}: {}", path, e),
            }
        }

        window.request_redraw();
        self.window = Some(window);
        self.render = Some(render);
        self.globe = Some(globe);
        Ok(())
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, event: &KeyEvent) {
        if event.state != ElementState::Pressed || event.repeat {
            return;
        }
        let PhysicalKey::Code(key) = event.physical_key else {
            return;
        };
        if key == KeyCode::Escape {
            self.shutdown(event_loop);
            return;
        }
        let Some(globe) = &mut self.globe else {
            return;
        };

        match key {
            KeyCode::KeyT => {
                let theme = globe.cycle_theme();
                log::info!("Theme: {}", theme);
            }
            KeyCode::Digit1 | KeyCode::Digit2 | KeyCode::Digit3 | KeyCode::Digit4 | KeyCode::Digit5 => {
                let index = match key {
                    KeyCode::Digit1 => 1,
                    KeyCode::Digit2 => 2,
                    KeyCode::Digit3 => 3,
                    KeyCode::Digit4 => 4,
                    _ => 5,
                };
                if let Some(mode) = InteractionMode::from_index(index) {
                    globe.set_interaction_mode(mode);
                    log::info!("Interaction mode: {}", mode.name());
                }
            }
            KeyCode::KeyH => log_overlay(globe.toggle_overlay_mode(OverlayMode::Heatmap)),
            KeyCode::KeyS => log_overlay(globe.toggle_overlay_mode(OverlayMode::TimeSeries)),
            KeyCode::KeyC => log_overlay(globe.toggle_overlay_mode(OverlayMode::Category)),
            KeyCode::KeyL => {
                let visible = globe.toggle_lines();
                log::info!("Route lines: {}", if visible { "ON" } else { "OFF" });
            }
            KeyCode::KeyB => {
                let enabled = globe.toggle_bloom();
                log::info!("Bloom: {}", if enabled { "ON" } else { "OFF" });
            }
            KeyCode::KeyF => {
                if let Some(window) = &self.window {
                    window.toggle_fullscreen();
                }
            }
            KeyCode::KeyP => {
                if let Err(e) = globe.write_performance_report() {
                    log::warn!("Failed to write performance report: {}", e);
                }
            }
            KeyCode::KeyE => match globe.export_data(DataFormat::Json) {
                Ok(path) => log::info!("Exported dataset to {}", path.display()),
                Err(e) => log::warn!("Export failed: {}", e),
            },
            KeyCode::Enter => match globe.commit_route() {
                Ok(added) => log::info!("Added {} routes", added),
                Err(e) => log::warn!("Route rejected: {}", e),
            },
            _ => {}
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let (Some(window), Some(render), Some(globe)) = (&self.window, &mut self.render, &mut self.globe) else {
            return;
        };

        self.simulation.update(globe);

        match render.render_frame(globe) {
            Ok(_) => {}
            Err(RenderError::SurfaceLost) => render.reconfigure(globe.context().backend()),
            Err(RenderError::OutOfMemory) => {
                log::error!("GPU out of memory");
                globe.shutdown();
                event_loop.exit();
                return;
            }
            Err(e) => log::warn!("{}", e),
        }

        let overlay = globe.overlays().mode().map(OverlayMode::name);
        window.update_title(&TitleStatus {
            fps: globe.monitor().fps(),
            theme: globe.themes().current_name(),
            interaction: globe.interaction().mode().name(),
            overlay,
        });
        window.request_redraw();
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(globe) = &mut self.globe {
            let freed = globe.shutdown();
            log::info!("Released {} resources", freed);
        }
        event_loop.exit();
    }
}

fn log_overlay(mode: Option<OverlayMode>) {
    log::info!("Overlay: {}", mode.map_or("none", OverlayMode::name));
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.start(event_loop) {
                log::error!("Startup failed: {}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.shutdown(event_loop),

            WindowEvent::Resized(size) => {
                if let (Some(render), Some(globe)) = (&mut self.render, &mut self.globe) {
                    render.resize(globe.context().backend(), size.width, size.height);
                    globe.resize(size.width, size.height);
                }
            }

            WindowEvent::KeyboardInput { event, .. } => self.handle_key(event_loop, &event),

            WindowEvent::CursorMoved { position, .. } => {
                if let Some(globe) = &mut self.globe {
                    globe.orbit_mut().process_cursor_moved(position.x, position.y);
                    globe.pointer_moved(position.x as f32, position.y as f32);
                }
            }

            WindowEvent::MouseInput { state, button, .. } => {
                let Some(globe) = &mut self.globe else {
                    return;
                };
                // Releases always reach the orbit so a drag never sticks
                if state == ElementState::Released || globe.orbit_enabled() {
                    globe.orbit_mut().process_mouse_button(button, state);
                }
                if button == MouseButton::Left {
                    match state {
                        ElementState::Pressed => globe.pointer_down(),
                        ElementState::Released => globe.pointer_up(),
                    }
                }
            }

            WindowEvent::MouseWheel { delta, .. } => {
                if let Some(globe) = &mut self.globe {
                    globe.orbit_mut().process_scroll(delta);
                }
            }

            WindowEvent::RedrawRequested => self.redraw(event_loop),

            _ => {}
        }
    }
}

fn main() {
    let config = AppConfig::load().unwrap_or_else(|e| {
        eprintln!("Failed to load config: {}. Using defaults.", e);
        AppConfig::default()
    });

    // RUST_LOG wins over the configured level
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.debug.log_level.as_str()),
    )
    .init();
    log::info!("Starting Globe Logistics");

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            log::error!("Failed to create event loop: {}", e);
            std::process::exit(1);
        }
    };
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    if let Err(e) = event_loop.run_app(&mut app) {
        log::error!("Event loop error: {}", e);
    }
}
