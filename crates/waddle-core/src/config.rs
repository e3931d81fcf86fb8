// ABOUTME: Application configuration handling.
// ABOUTME: Loads and saves settings from TOML config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::Color;

/// Size of the particle pool allocated at startup
pub const DEFAULT_PARTICLE_COUNT: u32 = 500_000;

/// Where the per-frame particle step runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SimulationBackend {
    /// Compute shader dispatch, 64 particles per workgroup
    #[default]
    Gpu,
    /// Rayon batch update on the host, uploaded every frame
    Cpu,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleSettings {
    /// Draw and simulate the dust particles at all
    pub enabled: bool,

    /// Number of slots in the particle pool
    pub count: u32,

    /// Seed for the spawn layout. None draws one from OS entropy.
    pub seed: Option<u64>,

    pub backend: SimulationBackend,
}

impl Default for ParticleSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            count: DEFAULT_PARTICLE_COUNT,
            seed: None,
            backend: SimulationBackend::Gpu,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Text to assemble on screen
    pub display_text: String,

    /// Font id, resolved as `<fonts_dir>/<font>.json` and `<fonts_dir>/<font>.png`
    pub font: String,

    /// Directory holding MSDF atlas pairs
    pub fonts_dir: PathBuf,

    /// Window dimensions
    pub window_width: u32,
    pub window_height: u32,

    /// Frame callback rate
    pub target_fps: u32,

    pub background_color: Color,
    pub text_color: Color,
    pub particle_color: Color,

    pub particles: ParticleSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            display_text: "Mitakpa".to_string(),
            font: "ppacma".to_string(),
            fonts_dir: PathBuf::from("assets/fonts"),
            window_width: 800,
            window_height: 600,
            target_fps: 60,
            background_color: Color::NIGHT,
            text_color: Color::WHITE,
            particle_color: Color::DUST,
            particles: ParticleSettings::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

impl Config {
    /// Get the default config file path (~/.config/improved-waddle/config.toml)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("improved-waddle").join("config.toml"))
    }

    /// Load config from a path
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load config from default path, or return default config if not found
    pub fn load_or_default() -> Self {
        Self::default_path()
            .and_then(|path| Self::load(&path).ok())
            .unwrap_or_default()
    }

    /// Save config to a path
    pub fn save(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Frame interval for the configured rate, never faster than 240 Hz
    pub fn frame_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.target_fps.clamp(1, 240) as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.display_text = "Hello".to_string();
        config.particles.seed = Some(7);
        config.particles.backend = SimulationBackend::Cpu;

        let temp_path = std::env::temp_dir().join("improved_waddle_test_config.toml");
        config.save(&temp_path).unwrap();

        let loaded = Config::load(&temp_path).unwrap();
        assert_eq!(loaded, config);

        let _ = std::fs::remove_file(&temp_path);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: Config = toml::from_str("display_text = \"Dust\"\n[particles]\nenabled = false\n").unwrap();
        assert_eq!(config.display_text, "Dust");
        assert_eq!(config.font, "ppacma");
        assert!(!config.particles.enabled);
        assert_eq!(config.particles.count, DEFAULT_PARTICLE_COUNT);
        assert_eq!(config.particles.backend, SimulationBackend::Gpu);
    }

    #[test]
    fn test_frame_interval() {
        let config = Config::default();
        let interval = config.frame_interval();
        assert!((interval.as_secs_f64() - 1.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_default_path() {
        if let Some(p) = Config::default_path() {
            assert!(p.ends_with("improved-waddle/config.toml"));
        }
    }
}
