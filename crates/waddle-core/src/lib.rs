// ABOUTME: Shared types and configuration for improved-waddle.
// ABOUTME: Defines colors, particle settings, and config file handling.

pub mod color;
pub mod config;

pub use color::Color;
pub use config::{Config, ConfigError, ParticleSettings, SimulationBackend};
