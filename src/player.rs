use crate::world::HeightField;
use glam::Vec3;

const MIN_DIRECTION_LENGTH: f32 = 1e-4;

/// Snapshot of the movement the player asked for this frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Intent {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
    pub run: bool,
    pub jump: bool,
}

impl Intent {
    fn axes(&self) -> (f32, f32) {
        let axis = |positive: bool, negative: bool| positive as i8 as f32 - negative as i8 as f32;
        (axis(self.forward, self.back), axis(self.right, self.left))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementParams {
    pub walk_speed: f32,
    pub run_multiplier: f32,
    pub gravity: f32,
    pub jump_speed: f32,
    pub eye_height: f32,
    pub world_limit: f32,
}

impl Default for MovementParams {
    fn default() -> Self {
        Self {
            walk_speed: 5.0,
            run_multiplier: 2.0,
            gravity: 20.0,
            jump_speed: 8.0,
            eye_height: 1.5,
            world_limit: 49.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocomotionState {
    Grounded,
    Airborne,
}

/// First-person body. `position` is the eye point; while grounded it sits
/// exactly `eye_height` above the terrain and `vertical_velocity` is zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub position: Vec3,
    pub vertical_velocity: f32,
    pub state: LocomotionState,
    params: MovementParams,
}

impl Player {
    pub fn new(spawn_x: f32, spawn_z: f32, terrain: &HeightField, params: MovementParams) -> Self {
        let x = spawn_x.clamp(-params.world_limit, params.world_limit);
        let z = spawn_z.clamp(-params.world_limit, params.world_limit);
        Self {
            position: Vec3::new(x, terrain.height(x, z) + params.eye_height, z),
            vertical_velocity: 0.0,
            state: LocomotionState::Grounded,
            params,
        }
    }

    #[cfg(test)]
    pub fn params(&self) -> &MovementParams {
        &self.params
    }

    pub fn is_grounded(&self) -> bool {
        self.state == LocomotionState::Grounded
    }

    /// Advances one frame. `dt` is used as given; a long stall can carry the
    /// player through a thin rise in a single step.
    pub fn update(
        &mut self,
        dt: f32,
        intent: &Intent,
        forward: Vec3,
        right: Vec3,
        terrain: &HeightField,
    ) -> (Vec3, LocomotionState) {
        let p = self.params;

        let direction = horizontal_direction(intent, forward, right);
        let speed = if intent.run { p.walk_speed * p.run_multiplier } else { p.walk_speed };
        self.position.x += direction.x * speed * dt;
        self.position.z += direction.z * speed * dt;

        self.position.x = self.position.x.clamp(-p.world_limit, p.world_limit);
        self.position.z = self.position.z.clamp(-p.world_limit, p.world_limit);

        if self.is_grounded() && intent.jump {
            self.state = LocomotionState::Airborne;
            self.vertical_velocity = p.jump_speed;
            log::trace!("jump from {:?}", self.position);
        }

        self.vertical_velocity -= p.gravity * dt;
        self.position.y += self.vertical_velocity * dt;

        let ground = terrain.height(self.position.x, self.position.z) + p.eye_height;
        if self.position.y <= ground {
            if self.state == LocomotionState::Airborne {
                log::trace!("landed at {:?}", self.position);
            }
            self.position.y = ground;
            self.vertical_velocity = 0.0;
            self.state = LocomotionState::Grounded;
        } else {
            self.state = LocomotionState::Airborne;
        }

        (self.position, self.state)
    }
}

fn horizontal_direction(intent: &Intent, forward: Vec3, right: Vec3) -> Vec3 {
    let flatten = |v: Vec3| Vec3::new(v.x, 0.0, v.z);
    let (along_forward, along_right) = intent.axes();
    let wish = flatten(forward) * along_forward + flatten(right) * along_right;

    if wish.length() < MIN_DIRECTION_LENGTH {
        Vec3::ZERO
    } else {
        wish.normalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::TerrainConfig;

    const DT: f32 = 1.0 / 60.0;

    fn terrain() -> HeightField {
        HeightField::new(TerrainConfig::default())
    }

    fn ground_at(player: &Player, terrain: &HeightField) -> f32 {
        terrain.height(player.position.x, player.position.z) + player.params().eye_height
    }

    fn spawn() -> (HeightField, Player) {
        let terrain = terrain();
        let player = Player::new(3.0, -2.0, &terrain, MovementParams::default());
        (terrain, player)
    }

    #[test]
    fn spawns_grounded_at_eye_height() {
        let (terrain, player) = spawn();
        assert_eq!(player.state, LocomotionState::Grounded);
        assert_eq!(player.vertical_velocity, 0.0);
        assert_eq!(player.position.y, ground_at(&player, &terrain));
    }

    #[test]
    fn zero_dt_and_no_intent_is_a_no_op() {
        let (terrain, mut player) = spawn();
        let before = player.clone();
        player.update(0.0, &Intent::default(), Vec3::NEG_Z, Vec3::X, &terrain);
        assert_eq!(player, before);
    }

    #[test]
    fn idle_grounded_player_follows_terrain() {
        let (terrain, mut player) = spawn();
        for _ in 0..120 {
            player.update(DT, &Intent::default(), Vec3::NEG_Z, Vec3::X, &terrain);
            assert!(player.is_grounded());
            assert_eq!(player.vertical_velocity, 0.0);
            assert_eq!(player.position.y, ground_at(&player, &terrain));
        }
    }

    #[test]
    fn jump_arc_returns_to_ground() {
        let (terrain, mut player) = spawn();
        let params = *player.params();
        let jump = Intent { jump: true, ..Default::default() };

        player.update(DT, &jump, Vec3::NEG_Z, Vec3::X, &terrain);
        assert_eq!(player.state, LocomotionState::Airborne);
        // Launch speed is applied before this frame's gravity step.
        assert!((player.vertical_velocity - (params.jump_speed - params.gravity * DT)).abs() < 1e-5);
        assert!(player.position.y > ground_at(&player, &terrain));

        let mut frames = 0;
        while !player.is_grounded() {
            let before = player.vertical_velocity;
            player.update(DT, &Intent::default(), Vec3::NEG_Z, Vec3::X, &terrain);
            if !player.is_grounded() {
                assert!((before - player.vertical_velocity - params.gravity * DT).abs() < 1e-5);
            }
            frames += 1;
            assert!(frames < 600, "never landed");
        }

        assert_eq!(player.vertical_velocity, 0.0);
        assert_eq!(player.position.y, ground_at(&player, &terrain));
        // 2 * 8 / 20 = 0.8s of flight.
        assert!((40..=55).contains(&frames), "flight lasted {frames} frames");
    }

    #[test]
    fn jump_while_airborne_is_ignored() {
        let (terrain, mut player) = spawn();
        let jump = Intent { jump: true, ..Default::default() };
        player.update(DT, &jump, Vec3::NEG_Z, Vec3::X, &terrain);
        let v = player.vertical_velocity;
        player.update(DT, &jump, Vec3::NEG_Z, Vec3::X, &terrain);
        assert!(player.vertical_velocity < v);
    }

    #[test]
    fn walks_along_flattened_forward() {
        let (terrain, mut player) = spawn();
        let start = player.position;
        // Looking steeply down still walks at full horizontal speed.
        let forward = Vec3::new(0.0, -0.9, -0.1).normalize();
        let intent = Intent { forward: true, ..Default::default() };
        player.update(0.5, &intent, forward, Vec3::X, &terrain);

        assert!((player.position.z - (start.z - 2.5)).abs() < 1e-5);
        assert!((player.position.x - start.x).abs() < 1e-6);
    }

    #[test]
    fn running_doubles_speed_and_diagonals_are_normalized() {
        let (terrain, mut player) = spawn();
        let start = player.position;
        let intent = Intent { forward: true, right: true, run: true, ..Default::default() };
        player.update(0.1, &intent, Vec3::NEG_Z, Vec3::X, &terrain);

        let travelled = Vec3::new(player.position.x - start.x, 0.0, player.position.z - start.z);
        assert!((travelled.length() - 1.0).abs() < 1e-5);
        assert!(travelled.x > 0.0 && travelled.z < 0.0);
    }

    #[test]
    fn opposing_keys_cancel() {
        let (terrain, mut player) = spawn();
        let start = player.position;
        let intent = Intent { forward: true, back: true, left: true, right: true, ..Default::default() };
        player.update(1.0, &intent, Vec3::NEG_Z, Vec3::X, &terrain);
        assert_eq!(player.position.x, start.x);
        assert_eq!(player.position.z, start.z);
    }

    #[test]
    fn straight_up_forward_gives_no_motion() {
        let (terrain, mut player) = spawn();
        let start = player.position;
        let intent = Intent { forward: true, ..Default::default() };
        player.update(1.0, &intent, Vec3::Y, Vec3::X, &terrain);
        assert_eq!(player.position.x, start.x);
        assert_eq!(player.position.z, start.z);
    }

    #[test]
    fn never_crosses_world_limit() {
        let (terrain, mut player) = spawn();
        let limit = player.params().world_limit;
        let intent = Intent { forward: true, run: true, ..Default::default() };
        for _ in 0..2_000 {
            player.update(DT, &intent, Vec3::X, Vec3::Z, &terrain);
            assert!(player.position.x <= limit);
        }
        assert_eq!(player.position.x, limit);
        assert!(player.is_grounded());

        player.update(5.0, &Intent { back: true, ..Default::default() }, Vec3::X, Vec3::Z, &terrain);
        assert!(player.position.x >= -limit);
    }

    #[test]
    fn spawn_outside_limit_is_clamped() {
        let terrain = terrain();
        let player = Player::new(500.0, -500.0, &terrain, MovementParams::default());
        assert_eq!(player.position.x, 49.0);
        assert_eq!(player.position.z, -49.0);
    }
}
