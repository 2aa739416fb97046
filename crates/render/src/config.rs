use glam::Vec3;
use orbitview_common::hex_rgb;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Errors from reading a scene configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// How the camera is placed once a model's bounds are known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FramingMode {
    /// Keep the camera where it is and re-aim it at the model center.
    #[default]
    LookAt,
    /// Also move the camera so the model fills the vertical field of view.
    FitByFov,
}

impl std::str::FromStr for FramingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "look-at" | "look_at" => Ok(Self::LookAt),
            "fit" | "fit-by-fov" | "fit_by_fov" => Ok(Self::FitByFov),
            other => Err(format!("unknown framing mode `{other}` (expected look-at or fit)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_degrees: f32,
    /// Placeholder until the first resize sets the real ratio.
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 45.0,
            aspect: 2.0,
            near: 0.1,
            far: 1000.0,
            position: Vec3::new(0.0, 10.0, 20.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitConfig {
    pub target: Vec3,
    pub min_distance: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            target: Vec3::new(0.0, 5.0, 0.0),
            min_distance: 0.0,
            rotate_speed: 0.005,
            zoom_speed: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FloorConfig {
    pub enabled: bool,
    pub size: f32,
    pub tile_size: f32,
    pub color_a: [f32; 3],
    pub color_b: [f32; 3],
}

impl Default for FloorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            size: 4000.0,
            tile_size: 200.0,
            color_a: [0.75, 0.75, 0.75],
            color_b: [0.25, 0.25, 0.25],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HemisphereConfig {
    pub sky: [f32; 3],
    pub ground: [f32; 3],
    pub intensity: f32,
}

impl Default for HemisphereConfig {
    fn default() -> Self {
        Self {
            sky: hex_rgb(0xb1e1ff),
            ground: hex_rgb(0xb97a20),
            intensity: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectionalConfig {
    pub color: [f32; 3],
    pub intensity: f32,
    pub position: Vec3,
    pub target: Vec3,
}

impl Default for DirectionalConfig {
    fn default() -> Self {
        Self {
            color: [1.0, 1.0, 1.0],
            intensity: 1.0,
            position: Vec3::new(5.0, 10.0, 2.0),
            target: Vec3::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct XrConfig {
    pub enabled: bool,
    pub controllers: u8,
}

impl Default for XrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            controllers: 2,
        }
    }
}

/// Scene configuration. Every field has a default, so a config file only
/// needs the values it changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub camera: CameraConfig,
    pub orbit: OrbitConfig,
    pub background: [f32; 3],
    pub floor: FloorConfig,
    pub hemisphere_light: HemisphereConfig,
    pub directional_light: DirectionalConfig,
    pub framing: FramingMode,
    pub xr: XrConfig,
}

impl SceneConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)?;
        let config = Self::from_json(&data)?;
        tracing::info!(path = %path.display(), "scene config loaded");
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}
