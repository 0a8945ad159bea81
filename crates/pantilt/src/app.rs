//! Application window and event loop management.

use std::sync::Arc;
use std::time::Duration;

use pollster::FutureExt;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use pantilt_core::{FrameSink, PantiltError, Resolution, Result, SimOptions};
use pantilt_render::{AssetLoader, Camera, GpuRenderer, RenderEngine};

use crate::clock::FrameClock;
use crate::rig::Rig;
use crate::simulation::Simulation;
use crate::sink::PreviewHandle;

/// The windowed application state.
pub struct App {
    options: SimOptions,
    sink: Box<dyn FrameSink>,
    preview: Option<PreviewHandle>,
    show_preview: bool,
    window: Option<Arc<Window>>,
    renderer: Option<GpuRenderer>,
    simulation: Option<Simulation>,
    camera: Camera,
    clock: FrameClock,
    close_requested: bool,
    error: Option<PantiltError>,

    // Mouse state for camera control
    mouse_pos: (f64, f64),
    left_mouse_down: bool,
    right_mouse_down: bool,
    shift_down: bool,
}

impl App {
    /// Creates the application. Nothing touches the GPU until the event loop
    /// resumes.
    pub fn new(options: SimOptions, sink: Box<dyn FrameSink>) -> Self {
        let camera = Camera::new(options.primary_resolution.aspect());
        Self {
            options,
            sink,
            preview: None,
            show_preview: true,
            window: None,
            renderer: None,
            simulation: None,
            camera,
            clock: FrameClock::new().with_max_delta(Duration::from_millis(250)),
            close_requested: false,
            error: None,
            mouse_pos: (0.0, 0.0),
            left_mouse_down: false,
            right_mouse_down: false,
            shift_down: false,
        }
    }

    /// Shows frames left in `handle` as an inset in the main window.
    #[must_use]
    pub fn with_preview(mut self, handle: PreviewHandle) -> Self {
        self.preview = Some(handle);
        self
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let primary = self.options.primary_resolution;
        let window_attributes = Window::default_attributes()
            .with_title("pantilt-rs")
            .with_inner_size(PhysicalSize::new(primary.width(), primary.height()));

        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .map_err(|e| PantiltError::Render(format!("failed to create window: {e}")))?,
        );

        let mut engine = RenderEngine::new_windowed(window.clone()).block_on()?;
        engine.set_clear_color(self.options.background_color);

        let mut simulation = Simulation::new(&self.options)?;
        simulation.set_primary(engine.primary_size());
        self.camera.set_aspect_ratio(engine.primary_size().aspect());

        let mut loader = AssetLoader::new();
        let rig = Rig::build(&self.options, simulation.mechanism(), &mut loader)?;

        self.renderer = Some(rig.into_renderer(engine));
        self.simulation = Some(simulation);
        self.clock = FrameClock::new().with_max_delta(Duration::from_millis(250));
        window.request_redraw();
        self.window = Some(window);
        Ok(())
    }

    fn fail(&mut self, err: PantiltError) {
        log::error!("{err}");
        self.error = Some(err);
        self.close_requested = true;
    }

    fn redraw(&mut self) {
        let dt = self.clock.delta();
        let main_pose = self.camera.pose();
        let (Some(simulation), Some(renderer)) = (&mut self.simulation, &mut self.renderer) else {
            return;
        };
        if let Err(err) = simulation.tick(dt, renderer, &main_pose, self.sink.as_mut()) {
            self.fail(err);
            return;
        }

        // Shown from the next frame on
        let Some(handle) = &self.preview else {
            return;
        };
        let Some(image) = handle.take() else {
            return;
        };
        if !self.show_preview {
            return;
        }
        if let Err(err) = renderer.engine_mut().upload_inset(image.size, &image.rgba) {
            self.fail(err.into());
        }
    }

    fn toggle_preview(&mut self) {
        self.show_preview = !self.show_preview;
        if !self.show_preview {
            if let Some(renderer) = &mut self.renderer {
                renderer.engine_mut().clear_inset();
            }
        }
        log::info!(
            "gimbal preview {}",
            if self.show_preview { "shown" } else { "hidden" }
        );
    }

    fn resize(&mut self, width: u32, height: u32) {
        // Minimized windows report zero size
        let Ok(primary) = Resolution::new(width, height) else {
            return;
        };
        if let Some(renderer) = &mut self.renderer {
            renderer.engine_mut().resize(primary);
        }
        if let Some(simulation) = &mut self.simulation {
            simulation.set_primary(primary);
        }
        self.camera.set_aspect_ratio(primary.aspect());
    }

    fn save_current_frame(&self) {
        let Some(simulation) = &self.simulation else {
            return;
        };
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let filename = format!("gimbal_{timestamp}.png");
        match pantilt_render::save_image(&filename, simulation.frame()) {
            Ok(()) => log::info!("saved gimbal frame to {filename}"),
            Err(e) => log::error!("failed to save {filename}: {e}"),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.init(event_loop) {
            self.fail(err);
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                self.close_requested = true;
            }
            WindowEvent::Resized(size) => {
                self.resize(size.width, size.height);
            }
            WindowEvent::RedrawRequested => {
                self.redraw();
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.shift_down = modifiers.state().shift_key();
            }
            WindowEvent::MouseInput { state, button, .. } => match (button, state) {
                (MouseButton::Left, state) => {
                    self.left_mouse_down = state == ElementState::Pressed;
                }
                (MouseButton::Right, state) => {
                    self.right_mouse_down = state == ElementState::Pressed;
                }
                _ => {}
            },
            WindowEvent::CursorMoved { position, .. } => {
                let delta_x = position.x - self.mouse_pos.0;
                let delta_y = position.y - self.mouse_pos.1;
                self.mouse_pos = (position.x, position.y);

                // Left drag orbits; Shift + left drag or right drag pans
                let is_rotate = self.left_mouse_down && !self.shift_down;
                let is_pan = (self.left_mouse_down && self.shift_down) || self.right_mouse_down;

                #[allow(clippy::cast_possible_truncation)]
                let (dx, dy) = (delta_x as f32, delta_y as f32);
                if is_rotate {
                    self.camera.orbit(dx * 0.01, dy * 0.01);
                } else if is_pan {
                    let scale = self.camera.position.distance(self.camera.target) * 0.002;
                    self.camera.pan(-dx * scale, dy * scale);
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                #[allow(clippy::cast_possible_truncation)]
                let scroll = match delta {
                    winit::event::MouseScrollDelta::LineDelta(_, y) => y,
                    winit::event::MouseScrollDelta::PixelDelta(pos) => pos.y as f32 * 0.1,
                };
                let scale = self.camera.position.distance(self.camera.target) * 0.1;
                self.camera.zoom(scroll * scale);
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed {
                    match event.physical_key {
                        PhysicalKey::Code(KeyCode::Escape) => {
                            self.close_requested = true;
                        }
                        PhysicalKey::Code(KeyCode::KeyR) => {
                            if let Some(simulation) = &mut self.simulation {
                                simulation.reset_time();
                                log::info!("speed profile restarted");
                            }
                        }
                        PhysicalKey::Code(KeyCode::F12) => {
                            self.save_current_frame();
                        }
                        PhysicalKey::Code(KeyCode::KeyP) => {
                            self.toggle_preview();
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }

        if self.close_requested {
            event_loop.exit();
        }
    }
}

/// Opens a window and runs the simulation until it is closed.
///
/// Captured gimbal frames go to `sink`. Returns the first error that stopped
/// the loop, if any.
pub fn run(options: SimOptions, sink: Box<dyn FrameSink>) -> Result<()> {
    run_app(App::new(options, sink))
}

/// Like [`run`], and also shows the frames left in `preview` as an inset in
/// the bottom-right corner of the window. `P` hides and shows it.
///
/// `preview` usually comes from a [`crate::PreviewSink`] that is part of
/// `sink`.
pub fn run_with_preview(
    options: SimOptions,
    sink: Box<dyn FrameSink>,
    preview: PreviewHandle,
) -> Result<()> {
    run_app(App::new(options, sink).with_preview(preview))
}

fn run_app(mut app: App) -> Result<()> {
    app.options.validate()?;
    let event_loop = EventLoop::new()
        .map_err(|e| PantiltError::Render(format!("failed to create event loop: {e}")))?;

    log::info!("starting windowed run");
    event_loop
        .run_app(&mut app)
        .map_err(|e| PantiltError::Render(format!("event loop error: {e}")))?;
    log::info!("window closed");

    match app.error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
