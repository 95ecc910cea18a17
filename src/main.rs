mod camera;
mod camera_controller;
mod config;
mod model;
mod player;
mod renderer;
mod simulation;
mod terrain;
mod world;

use clap::Parser;
use config::{Cli, Config};
use renderer::State;
use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{CursorGrabMode, Fullscreen, Window, WindowId},
};

struct App {
    settings: Config,
    start_fullscreen: bool,
    window: Option<Arc<Window>>,
    state: Option<State>,
}

impl App {
    fn new(settings: Config, start_fullscreen: bool) -> Self {
        Self {
            settings,
            start_fullscreen,
            window: None,
            state: None,
        }
    }
}

fn set_pointer_capture(window: &Window, state: &mut State, captured: bool) {
    if captured {
        let grabbed = window
            .set_cursor_grab(CursorGrabMode::Locked)
            .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined));
        if let Err(e) = grabbed {
            log::warn!("cursor grab unavailable: {e}");
        }
    } else if let Err(e) = window.set_cursor_grab(CursorGrabMode::None) {
        log::warn!("failed to release cursor: {e}");
    }
    window.set_cursor_visible(!captured);
    state.set_pointer_captured(captured);
}

fn toggle_fullscreen(window: &Window) {
    if window.fullscreen().is_some() {
        window.set_fullscreen(None);
    } else {
        window.set_fullscreen(Some(Fullscreen::Borderless(None)));
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let mut window_attributes = Window::default_attributes().with_title("Terrain Explorer");
        if self.start_fullscreen {
            window_attributes = window_attributes.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }
        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };
        self.window = Some(window.clone());

        match pollster::block_on(State::new(window, &self.settings)) {
            Ok(state) => self.state = Some(state),
            Err(e) => {
                log::error!("failed to create state: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if let Some(state) = self.state.as_mut() {
            if let DeviceEvent::MouseMotion { delta } = event {
                state.mouse_motion(delta);
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        let window = match self.window.as_ref() {
            Some(w) => w,
            None => return,
        };
        let state = match self.state.as_mut() {
            Some(s) => s,
            None => return,
        };

        if id != window.id() {
            return;
        }

        if state.input(&event) {
            return;
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(code),
                        repeat: false,
                        ..
                    },
                ..
            } => match code {
                KeyCode::Escape if state.is_pointer_captured() => {
                    set_pointer_capture(window, state, false);
                }
                KeyCode::Escape => event_loop.exit(),
                KeyCode::F11 => toggle_fullscreen(window),
                _ => {}
            },
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } if !state.is_pointer_captured() => {
                set_pointer_capture(window, state, true);
            }
            WindowEvent::Focused(false) if state.is_pointer_captured() => {
                set_pointer_capture(window, state, false);
            }
            WindowEvent::Resized(physical_size) => {
                state.resize(physical_size);
                window.request_redraw();
            }
            WindowEvent::RedrawRequested => match state.render() {
                Ok(_) => {}
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => state.resize(state.size()),
                Err(wgpu::SurfaceError::OutOfMemory) => {
                    log::error!("surface out of memory");
                    event_loop.exit();
                }
                Err(e) => log::warn!("{e:?}"),
            },
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = self.state.as_mut() {
            state.update();
        }
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let settings = Config::resolve(&cli)?;
    // Reject bad terrain settings before a window exists.
    let terrain = settings.terrain()?;
    log::info!("world limit +/-{}", terrain.world_limit());

    let event_loop = EventLoop::new()?;
    let mut app = App::new(settings, cli.fullscreen);
    event_loop.run_app(&mut app)?;
    Ok(())
}
