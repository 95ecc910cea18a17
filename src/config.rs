use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use serde::Deserialize;

use crate::player::MovementParams;
use crate::world::{
    ConfigError, DEFAULT_AMPLITUDE, DEFAULT_GRID_SIZE, DEFAULT_SPACING, TerrainConfig,
};

#[derive(Debug, Parser, Clone, Default)]
#[command(name = "terrain-explorer", version, about = "Procedural terrain explorer")]
pub struct Cli {
    /// TOML file with terrain, player, camera and scene settings.
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub size: Option<i64>,
    #[arg(long)]
    pub spacing: Option<f32>,
    #[arg(long)]
    pub amplitude: Option<f32>,
    #[arg(long)]
    pub fullscreen: bool,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub terrain: TerrainSection,
    pub player: PlayerSection,
    pub camera: CameraSection,
    pub scene: SceneSection,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct TerrainSection {
    pub size: i64,
    pub spacing: f32,
    pub amplitude: f32,
}

impl Default for TerrainSection {
    fn default() -> Self {
        Self {
            size: DEFAULT_GRID_SIZE,
            spacing: DEFAULT_SPACING,
            amplitude: DEFAULT_AMPLITUDE,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct PlayerSection {
    pub walk_speed: f32,
    pub run_multiplier: f32,
    pub gravity: f32,
    pub jump_speed: f32,
    pub eye_height: f32,
    pub spawn_x: f32,
    pub spawn_z: f32,
}

impl Default for PlayerSection {
    fn default() -> Self {
        let movement = MovementParams::default();
        Self {
            walk_speed: movement.walk_speed,
            run_multiplier: movement.run_multiplier,
            gravity: movement.gravity,
            jump_speed: movement.jump_speed,
            eye_height: movement.eye_height,
            spawn_x: 0.0,
            spawn_z: 0.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct CameraSection {
    pub sensitivity: f32,
    pub fov_degrees: f32,
    pub initial_yaw: f32,
}

impl Default for CameraSection {
    fn default() -> Self {
        Self {
            sensitivity: 0.1,
            fov_degrees: 60.0,
            initial_yaw: -90.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SceneSection {
    pub terrain_texture: PathBuf,
    pub model: Option<PathBuf>,
    pub model_x: f32,
    pub model_z: f32,
    pub model_scale: f32,
}

impl Default for SceneSection {
    fn default() -> Self {
        Self {
            terrain_texture: PathBuf::from("res/grass.png"),
            model: Some(PathBuf::from("res/tree.glb")),
            model_x: 6.0,
            model_z: -8.0,
            model_scale: 1.0,
        }
    }
}

impl Config {
    pub fn from_toml(source: &str) -> anyhow::Result<Self> {
        toml::from_str(source).context("deserializing config")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("loading config from {}", path.display()))
    }

    /// File settings (or defaults) with command-line overrides applied.
    pub fn resolve(cli: &Cli) -> anyhow::Result<Self> {
        let mut config = match &cli.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        if let Some(size) = cli.size {
            config.terrain.size = size;
        }
        if let Some(spacing) = cli.spacing {
            config.terrain.spacing = spacing;
        }
        if let Some(amplitude) = cli.amplitude {
            config.terrain.amplitude = amplitude;
        }
        Ok(config)
    }

    pub fn terrain(&self) -> Result<TerrainConfig, ConfigError> {
        TerrainConfig::new(self.terrain.size, self.terrain.spacing, self.terrain.amplitude)
    }

    pub fn movement(&self, terrain: &TerrainConfig) -> MovementParams {
        MovementParams {
            walk_speed: self.player.walk_speed,
            run_multiplier: self.player.run_multiplier,
            gravity: self.player.gravity,
            jump_speed: self.player.jump_speed,
            eye_height: self.player.eye_height,
            world_limit: terrain.world_limit(),
        }
    }
}
