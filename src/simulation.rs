use crate::camera::Orientation;
use crate::camera_controller::CameraController;
use crate::player::{Intent, MovementParams, Player};
use crate::world::HeightField;
use glam::Vec3;

/// Everything the frame loop mutates, stepped in a fixed order: look, then move.
pub struct Simulation {
    pub terrain: HeightField,
    pub orientation: Orientation,
    pub player: Player,
}

impl Simulation {
    pub fn new(
        terrain: HeightField,
        orientation: Orientation,
        spawn: (f32, f32),
        params: MovementParams,
    ) -> Self {
        let player = Player::new(spawn.0, spawn.1, &terrain, params);
        log::info!("player spawned at {:?}", player.position);
        Self { terrain, orientation, player }
    }

    pub fn step(&mut self, dt: f32, controller: &mut CameraController) {
        controller.update_orientation(&mut self.orientation);
        self.advance(dt, &controller.intent());
    }

    pub fn advance(&mut self, dt: f32, intent: &Intent) {
        let forward = self.orientation.forward();
        let right = self.orientation.right();
        self.player.update(dt, intent, forward, right, &self.terrain);
    }

    pub fn eye(&self) -> Vec3 {
        self.player.position
    }
}
