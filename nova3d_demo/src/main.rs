//! # Nova3D Demo
//!
//! Opens a window, bootstraps the Direct3D 12 backend and runs the
//! StartFrame / EndFrame loop. Each frame uploads a small vertex buffer and a
//! per-frame constant buffer through the current buffer index's upload heap.
//! Window resizes go through `GpuManager::resize`; a lost device is recreated.

#[cfg(windows)]
mod app {
    use std::time::Instant;
    use nova_3d_engine::nova3d::{Config, Engine, Error, FailurePolicy, GpuResourceHandle};
    use nova_3d_engine::nova3d::log::LogFacadeLogger;
    use nova_3d_engine_renderer_d3d12::D3D12AdapterProvider;
    use raw_window_handle::HasWindowHandle;
    use winit::application::ApplicationHandler;
    use winit::event::WindowEvent;
    use winit::event_loop::{ActiveEventLoop, EventLoop};
    use winit::window::{Window, WindowId};

    const TRIANGLE: [f32; 9] = [0.0, 0.5, 0.0, 0.5, -0.5, 0.0, -0.5, -0.5, 0.0];

    struct Scene {
        vertices: GpuResourceHandle,
    }

    struct Running {
        // Declared before the window so the swap chain goes first
        engine: Engine,
        provider: D3D12AdapterProvider,
        scene: Scene,
        window: Window,
    }

    #[derive(Default)]
    struct App {
        running: Option<Running>,
        started: Option<Instant>,
    }

    fn config() -> Config {
        Config {
            failure_policy: FailurePolicy::Propagate,
            ..Config::default()
        }
    }

    fn create_scene(engine: &mut Engine) -> Result<Scene, Error> {
        let gpu = engine.gpu_mut();
        let vertices = gpu.push_vertex_buffer(3, 12, Some("triangle"))?;
        gpu.push_constant_buffer(16, Some("frame-constants"))?;
        Ok(Scene { vertices })
    }

    impl Running {
        fn create(window: Window) -> Result<Self, Error> {
            let size = window.inner_size();
            let handle = window
                .window_handle()
                .map_err(|e| Error::InitializationFailed(format!("window handle: {}", e)))?
                .as_raw();
            let config = config();
            let provider = D3D12AdapterProvider::new(handle, config.enable_debug_layer)?;
            let mut engine = Engine::new(&provider, size.width, size.height, config)?;
            let scene = create_scene(&mut engine)?;

            let info = engine.gpu().adapter_info();
            log::info!(
                "Running on '{}' at {}",
                info.adapter.description,
                info.feature_level
            );
            Ok(Self { engine, provider, scene, window })
        }

        fn render(&mut self, seconds: f32) -> Result<(), Error> {
            let gpu = self.engine.gpu_mut();
            gpu.start_frame()?;
            gpu.set_gpu_resource_data(self.scene.vertices, &TRIANGLE)?;
            let pulse = [seconds.sin() * 0.5 + 0.5, 0.2, 0.4, 1.0];
            gpu.set_gpu_resource_data_by_name("frame-constants", &pulse)?;
            gpu.bind_vertex_buffer(self.scene.vertices)?;
            gpu.end_frame()
        }

        fn recover(&mut self, err: Error) -> Result<(), Error> {
            if !err.is_device_lost() {
                return Err(err);
            }
            log::warn!("Device lost ({}), recreating", err);
            self.engine.gpu_mut().recreate_device(&self.provider)
        }
    }

    impl ApplicationHandler for App {
        fn resumed(&mut self, event_loop: &ActiveEventLoop) {
            if self.running.is_some() {
                return;
            }
            let attributes = Window::default_attributes()
                .with_title("Nova3D Demo")
                .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));

            let window = match event_loop.create_window(attributes) {
                Ok(window) => window,
                Err(e) => {
                    log::error!("Failed to create window: {}", e);
                    event_loop.exit();
                    return;
                }
            };
            match Running::create(window) {
                Ok(running) => {
                    running.window.request_redraw();
                    self.running = Some(running);
                    self.started = Some(Instant::now());
                }
                Err(e) => {
                    log::error!("GPU bootstrap failed: {}", e);
                    event_loop.exit();
                }
            }
        }

        fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
            let Some(running) = self.running.as_mut() else {
                return;
            };
            match event {
                WindowEvent::CloseRequested => {
                    if let Err(e) = running.engine.shutdown() {
                        log::error!("Shutdown failed: {}", e);
                    }
                    let stats = running.engine.gpu().stats();
                    log::info!("Closing after {} frames ({} dropped)", stats.frame_number, stats.dropped_frames);
                    nova_3d_engine_renderer_d3d12::log_validation_stats();
                    self.running = None;
                    event_loop.exit();
                }
                WindowEvent::Resized(size) => {
                    // A minimized window reports 0x0, which the swap chain ignores
                    if let Err(e) = running.engine.gpu_mut().resize(size.width, size.height) {
                        log::error!("Resize to {}x{} failed: {}", size.width, size.height, e);
                    }
                }
                WindowEvent::RedrawRequested => {
                    let seconds = self.started.map(|s| s.elapsed().as_secs_f32()).unwrap_or(0.0);
                    if let Err(e) = running.render(seconds).or_else(|e| running.recover(e)) {
                        log::error!("Frame failed: {}", e);
                        event_loop.exit();
                        return;
                    }
                    running.window.request_redraw();
                }
                _ => {}
            }
        }
    }

    pub fn run() {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
        Engine::set_logger(LogFacadeLogger);

        let event_loop = match EventLoop::new() {
            Ok(event_loop) => event_loop,
            Err(e) => {
                log::error!("Failed to create event loop: {}", e);
                return;
            }
        };
        let mut app = App::default();
        if let Err(e) = event_loop.run_app(&mut app) {
            log::error!("Event loop error: {}", e);
        }
    }
}

#[cfg(windows)]
fn main() {
    app::run();
}

#[cfg(not(windows))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::error!("nova3d_demo needs the Direct3D 12 backend, which is only available on Windows");
}
