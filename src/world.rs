use thiserror::Error;

pub const DEFAULT_GRID_SIZE: i64 = 100;
pub const DEFAULT_SPACING: f32 = 1.0;
pub const DEFAULT_AMPLITUDE: f32 = 1.5;

/// Distance kept between the player and the outermost ring of the grid.
pub const BOUNDARY_MARGIN: f32 = 1.0;

// (frequency, weight) pairs. Weights sum to 1 so the surface stays within +/- amplitude.
const WAVES: [(f32, f32); 2] = [(0.1, 0.65), (0.05, 0.35)];

// Largest N whose (N + 1)^2 vertices still fit a u32 index buffer.
const MAX_GRID_SIZE: i64 = 65_534;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("grid size must be positive, got {0}")]
    InvalidGridSize(i64),
    #[error("grid size {0} does not fit a 32-bit index buffer")]
    GridTooLarge(i64),
    #[error("grid size {size} needs a {bytes}-byte buffer, device allows {limit}")]
    ExceedsBufferLimit { size: u32, bytes: u64, limit: u64 },
    #[error("grid spacing must be a positive finite number, got {0}")]
    InvalidSpacing(f32),
    #[error("height amplitude must be a positive finite number, got {0}")]
    InvalidAmplitude(f32),
}

/// Validated terrain parameters. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainConfig {
    size: u32,
    spacing: f32,
    amplitude: f32,
}

impl TerrainConfig {
    pub fn new(size: i64, spacing: f32, amplitude: f32) -> Result<Self, ConfigError> {
        if size <= 0 {
            return Err(ConfigError::InvalidGridSize(size));
        }
        if size > MAX_GRID_SIZE {
            return Err(ConfigError::GridTooLarge(size));
        }
        validate_spacing(spacing)?;
        if !(amplitude.is_finite() && amplitude > 0.0) {
            return Err(ConfigError::InvalidAmplitude(amplitude));
        }

        Ok(Self { size: size as u32, spacing, amplitude })
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn spacing(&self) -> f32 {
        self.spacing
    }

    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }

    /// Half-extent of the walkable square centred on the origin.
    pub fn world_limit(&self) -> f32 {
        (self.size as f32 * self.spacing * 0.5 - BOUNDARY_MARGIN).max(0.0)
    }
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_GRID_SIZE as u32,
            spacing: DEFAULT_SPACING,
            amplitude: DEFAULT_AMPLITUDE,
        }
    }
}

pub(crate) fn validate_spacing(spacing: f32) -> Result<(), ConfigError> {
    if spacing.is_finite() && spacing > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidSpacing(spacing))
    }
}

/// Analytic terrain surface. Stateless apart from its fixed configuration, so
/// it can be shared freely between the mesher and the per-frame collision query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeightField {
    config: TerrainConfig,
}

impl HeightField {
    pub fn new(config: TerrainConfig) -> Self {
        Self { config }
    }

    pub fn height(&self, x: f32, z: f32) -> f32 {
        let amplitude = self.config.amplitude;
        WAVES
            .iter()
            .map(|&(frequency, weight)| {
                (x * frequency).sin() * (z * frequency).cos() * weight * amplitude
            })
            .sum()
    }

    /// Upper bound on `|height(x, z)|`.
    pub fn max_elevation(&self) -> f32 {
        WAVES.iter().map(|&(_, weight)| weight).sum::<f32>() * self.config.amplitude
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_grid_size() {
        assert_eq!(TerrainConfig::new(0, 1.0, 1.5), Err(ConfigError::InvalidGridSize(0)));
        assert_eq!(TerrainConfig::new(-4, 1.0, 1.5), Err(ConfigError::InvalidGridSize(-4)));
    }

    #[test]
    fn rejects_bad_spacing_and_amplitude() {
        assert_eq!(TerrainConfig::new(10, 0.0, 1.5), Err(ConfigError::InvalidSpacing(0.0)));
        assert_eq!(TerrainConfig::new(10, -2.0, 1.5), Err(ConfigError::InvalidSpacing(-2.0)));
        assert!(matches!(
            TerrainConfig::new(10, f32::NAN, 1.5),
            Err(ConfigError::InvalidSpacing(_))
        ));
        assert_eq!(TerrainConfig::new(10, 1.0, 0.0), Err(ConfigError::InvalidAmplitude(0.0)));
    }

    #[test]
    fn rejects_grid_beyond_index_space() {
        assert_eq!(
            TerrainConfig::new(70_000, 1.0, 1.5),
            Err(ConfigError::GridTooLarge(70_000))
        );
    }

    #[test]
    fn world_limit_sits_inside_grid() {
        let config = TerrainConfig::new(100, 1.0, 1.5).unwrap();
        assert_eq!(config.world_limit(), 49.0);

        let tiny = TerrainConfig::new(1, 1.0, 1.5).unwrap();
        assert_eq!(tiny.world_limit(), 0.0);
    }

    #[test]
    fn height_is_bounded_and_finite() {
        let field = HeightField::new(TerrainConfig::default());
        let bound = field.max_elevation();
        assert!((bound - DEFAULT_AMPLITUDE).abs() < 1e-6);

        for i in -200..200 {
            for j in -200..200 {
                let (x, z) = (i as f32 * 0.73, j as f32 * 1.31);
                let h = field.height(x, z);
                assert!(h.is_finite());
                assert!(h.abs() <= bound + 1e-5, "height {h} at ({x}, {z}) exceeds {bound}");
            }
        }

        assert!(field.height(1.0e30, -3.0e29).is_finite());
    }

    #[test]
    fn height_is_deterministic() {
        let a = HeightField::new(TerrainConfig::default());
        let b = HeightField::new(TerrainConfig::default());
        for &(x, z) in &[(0.0, 0.0), (12.5, -7.25), (-49.0, 49.0)] {
            assert_eq!(a.height(x, z).to_bits(), a.height(x, z).to_bits());
            assert_eq!(a.height(x, z).to_bits(), b.height(x, z).to_bits());
        }
    }

    #[test]
    fn surface_is_not_flat() {
        let field = HeightField::new(TerrainConfig::default());
        let samples: Vec<f32> = (0..50).map(|i| field.height(i as f32 * 2.0, 5.0)).collect();
        let min = samples.iter().copied().fold(f32::INFINITY, f32::min);
        let max = samples.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        assert!(max - min > 0.5);
    }
}
