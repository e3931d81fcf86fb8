// ABOUTME: Main application entry point.
// ABOUTME: Opens the window and drives the renderer from a 60 Hz redraw loop.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowAttributes, WindowId};

use waddle_core::Config;
use waddle_renderer::Renderer;
use waddle_text::DirectoryAtlasProvider;

struct App {
    window: Option<Arc<Window>>,
    renderer: Option<Renderer>,
    config: Config,
    frame_interval: Duration,
    next_frame: Instant,
    /// Set when startup or a frame fails fatally; returned from `main`
    error: Option<anyhow::Error>,
}

impl App {
    fn new(config: Config) -> Self {
        Self {
            window: None,
            renderer: None,
            frame_interval: config.frame_interval(),
            next_frame: Instant::now(),
            config,
            error: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window_attrs = WindowAttributes::default()
            .with_title("improved-waddle")
            .with_inner_size(LogicalSize::new(
                self.config.window_width,
                self.config.window_height,
            ));

        let window = Arc::new(
            event_loop
                .create_window(window_attrs)
                .context("Failed to create window")?,
        );

        let provider = DirectoryAtlasProvider::new(self.config.fonts_dir.clone());
        let renderer = pollster::block_on(Renderer::new(
            Arc::clone(&window),
            &self.config,
            &provider,
        ))
        .context("Failed to create renderer")?;

        let physical_size = window.inner_size();
        tracing::info!(
            "Window created: {}x{} physical pixels, scale factor: {}",
            physical_size.width,
            physical_size.height,
            window.scale_factor()
        );

        self.window = Some(window);
        self.renderer = Some(renderer);
        self.next_frame = Instant::now();
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        tracing::error!("{:#}", err);
        self.error = Some(err);
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.init(event_loop) {
            self.fail(event_loop, err);
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
                tracing::info!("Close requested, exiting");
                event_loop.exit();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed
                    && event.logical_key == Key::Named(NamedKey::Escape)
                {
                    event_loop.exit();
                }
            }
            WindowEvent::Resized(new_size) => {
                if let Some(renderer) = &mut self.renderer {
                    renderer.resize(new_size.width, new_size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                let Some(renderer) = &mut self.renderer else {
                    return;
                };
                // Recoverable surface errors are handled inside render_frame
                if let Err(err) = renderer.render_frame() {
                    self.fail(event_loop, err.into());
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(window) = &self.window else {
            return;
        };

        let now = Instant::now();
        if now >= self.next_frame {
            window.request_redraw();
            self.next_frame += self.frame_interval;
            // Don't try to catch up after a stall
            if self.next_frame < now {
                self.next_frame = now + self.frame_interval;
            }
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_frame));
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    tracing::info!("Starting improved-waddle");

    let config = Config::load_or_default();
    tracing::info!(
        "Loaded config: text={:?}, font={}, particles={}",
        config.display_text,
        config.font,
        config.particles.count
    );

    let event_loop = EventLoop::new()?;
    let mut app = App::new(config);

    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
