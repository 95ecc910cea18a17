use crate::camera::Orientation;
use crate::player::Intent;
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Turns window and device input into the per-frame `Intent` and look deltas.
#[derive(Debug, Default)]
pub struct CameraController {
    intent: Intent,
    sensitivity: f32,

    captured: bool,
    first_sample: bool,
    mouse_delta_x: f32,
    mouse_delta_y: f32,
}

impl CameraController {
    pub fn new(sensitivity: f32) -> Self {
        Self {
            sensitivity,
            ..Default::default()
        }
    }

    pub fn process_events(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::KeyboardInput { event: key_event, .. } => {
                let PhysicalKey::Code(code) = key_event.physical_key else {
                    return false;
                };
                self.process_key(code, key_event.state == ElementState::Pressed)
            }
            _ => false,
        }
    }

    /// Movement keys only drive the player while the pointer is captured.
    pub fn process_key(&mut self, code: KeyCode, pressed: bool) -> bool {
        if !self.captured {
            return false;
        }
        let flag = match code {
            KeyCode::KeyW | KeyCode::ArrowUp => &mut self.intent.forward,
            KeyCode::KeyS | KeyCode::ArrowDown => &mut self.intent.back,
            KeyCode::KeyA | KeyCode::ArrowLeft => &mut self.intent.left,
            KeyCode::KeyD | KeyCode::ArrowRight => &mut self.intent.right,
            KeyCode::ShiftLeft | KeyCode::ShiftRight => &mut self.intent.run,
            KeyCode::Space => &mut self.intent.jump,
            _ => return false,
        };
        *flag = pressed;
        true
    }

    pub fn is_captured(&self) -> bool {
        self.captured
    }

    /// Going from released to captured arms the first-sample flag so the next
    /// delta only re-establishes the baseline.
    pub fn set_captured(&mut self, captured: bool) {
        if captured && !self.captured {
            self.first_sample = true;
        }
        if !captured {
            // Held keys would otherwise stay latched after focus moves away.
            self.intent = Intent::default();
        }
        self.captured = captured;
        self.mouse_delta_x = 0.0;
        self.mouse_delta_y = 0.0;
    }

    /// Raw device motion, in pixels with +y pointing down the screen.
    pub fn process_mouse_motion(&mut self, delta_x: f64, delta_y: f64) {
        if !self.captured {
            return;
        }
        if self.first_sample {
            self.first_sample = false;
            log::debug!("discarding first pointer sample ({delta_x}, {delta_y})");
            return;
        }
        self.mouse_delta_x += delta_x as f32;
        self.mouse_delta_y += delta_y as f32;
    }

    pub fn intent(&self) -> Intent {
        self.intent
    }

    pub fn update_orientation(&mut self, orientation: &mut Orientation) {
        if self.captured {
            orientation.accumulate(self.mouse_delta_x, -self.mouse_delta_y, self.sensitivity);
        }
        self.mouse_delta_x = 0.0;
        self.mouse_delta_y = 0.0;
    }
}
