use glam::{Mat4, Vec3};

pub const PITCH_LIMIT: f32 = 89.0;

/// View direction as yaw/pitch in degrees. Yaw is unbounded; pitch is kept
/// inside `[-PITCH_LIMIT, PITCH_LIMIT]` so the view never flips over the vertical.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orientation {
    pub yaw: f32,
    pub pitch: f32,
}

impl Orientation {
    pub fn new(yaw: f32, pitch: f32) -> Self {
        Self {
            yaw,
            pitch: pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT),
        }
    }

    /// Applies a pointer delta. Positive `dy` means the pointer moved toward
    /// the top of the viewport and raises the view.
    pub fn accumulate(&mut self, dx: f32, dy: f32, sensitivity: f32) -> Vec3 {
        self.yaw += dx * sensitivity;
        self.pitch = (self.pitch + dy * sensitivity).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.forward()
    }

    pub fn forward(&self) -> Vec3 {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos()).normalize()
    }

    pub fn right(&self) -> Vec3 {
        self.forward().cross(Vec3::Y).normalize()
    }
}

impl Default for Orientation {
    /// Looking down -Z.
    fn default() -> Self {
        Self::new(-90.0, 0.0)
    }
}

pub fn build_view_matrix(eye: Vec3, orientation: &Orientation) -> Mat4 {
    Mat4::look_to_rh(eye, orientation.forward(), Vec3::Y)
}

pub struct Projection {
    aspect: f32,
    fovy: f32,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new(width: u32, height: u32, fovy_degrees: f32, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height.max(1) as f32,
            fovy: fovy_degrees.to_radians(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    pub fn build_projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fovy, self.aspect, self.znear, self.zfar)
    }
}
