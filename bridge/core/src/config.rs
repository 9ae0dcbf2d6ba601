//! TOML Configuration File Support
//!
//! Configuration for the bridge lives at
//! `$XDG_CONFIG_HOME/desktop-mate/bridge.toml`.
//!
//! # Configuration Priority
//!
//! Highest first:
//! 1. CLI arguments (applied by the daemon after loading)
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [transport]
//! host = "127.0.0.1"
//! port = 5555
//! join_timeout_ms = 1000
//!
//! [animation]
//! transition_speed = 2.0
//! tick_rate_hz = 60
//!
//! [auto_blink]
//! enabled = true
//! min_interval = 2.0
//! max_interval = 5.0
//! duration = 0.16
//! easing = "smoothstep"   # or "linear", "ease_in_out_cubic"
//!
//! [head_movement]
//! enabled = true
//! min_interval = 3.0
//! max_interval = 7.0
//! duration = 2.0
//! max_yaw = 5.0
//! max_pitch = 2.5
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::animation::blend::{DEFAULT_SPEED, MAX_SPEED, MIN_SPEED};
use crate::animation::idle::IdleBehaviorConfig;
use crate::animation::timing::EasingFunction;
use crate::transport::config::TransportConfig;

/// Default render loop rate
pub const DEFAULT_TICK_RATE_HZ: u32 = 60;

/// Highest accepted render loop rate
pub const MAX_TICK_RATE_HZ: u32 = 240;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// `[transport]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportToml {
    /// Listen host
    pub host: Option<String>,
    /// Listen port
    pub port: Option<u16>,
    /// Bounded wait for the I/O thread on shutdown
    pub join_timeout_ms: Option<u64>,
}

/// `[animation]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationToml {
    /// Blend speed
    pub transition_speed: Option<f32>,
    /// Render loop rate
    pub tick_rate_hz: Option<u32>,
}

/// `[auto_blink]` / `[head_movement]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IdleToml {
    /// Start the behavior at boot
    pub enabled: Option<bool>,
    /// Shortest wait between excursions
    pub min_interval: Option<f32>,
    /// Longest wait between excursions
    pub max_interval: Option<f32>,
    /// Excursion length
    pub duration: Option<f32>,
    /// Excursion curve
    pub easing: Option<EasingFunction>,
    /// Yaw amplitude (head movement only)
    pub max_yaw: Option<f32>,
    /// Pitch amplitude (head movement only)
    pub max_pitch: Option<f32>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeToml {
    /// Transport section
    pub transport: TransportToml,
    /// Animation section
    pub animation: AnimationToml,
    /// Auto-blink section
    pub auto_blink: IdleToml,
    /// Head movement section
    pub head_movement: IdleToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Settings for one idle behavior
#[derive(Clone, Debug, PartialEq)]
pub struct IdleSettings {
    /// Start the behavior at boot
    pub enabled: bool,
    /// Clamped behavior parameters
    pub behavior: IdleBehaviorConfig,
}

/// Centralized configuration for the bridge
#[derive(Clone, Debug)]
pub struct BridgeConfig {
    /// Transport configuration
    pub transport: TransportConfig,

    /// Blend speed
    pub transition_speed: f32,

    /// Render loop rate
    pub tick_rate_hz: u32,

    /// Auto-blink settings
    pub auto_blink: IdleSettings,

    /// Head movement settings
    pub head_movement: IdleSettings,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    source: ConfigSource,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::default(),
            transition_speed: DEFAULT_SPEED,
            tick_rate_hz: DEFAULT_TICK_RATE_HZ,
            auto_blink: IdleSettings {
                enabled: false,
                behavior: IdleBehaviorConfig::auto_blink(),
            },
            head_movement: IdleSettings {
                enabled: true,
                behavior: IdleBehaviorConfig::head_movement(),
            },
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl BridgeConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Clamp soft limits and reject values that cannot be fixed up
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` for an empty host or a zero
    /// tick rate.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        if self.transport.host.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "transport.host must not be empty".to_string(),
            ));
        }
        if self.tick_rate_hz == 0 {
            return Err(ConfigError::ValidationError(
                "animation.tick_rate_hz must be at least 1".to_string(),
            ));
        }
        if self.tick_rate_hz > MAX_TICK_RATE_HZ {
            tracing::warn!(
                requested = self.tick_rate_hz,
                max = MAX_TICK_RATE_HZ,
                "Tick rate too high, clamping"
            );
            self.tick_rate_hz = MAX_TICK_RATE_HZ;
        }

        let speed = if self.transition_speed.is_finite() {
            self.transition_speed.clamp(MIN_SPEED, MAX_SPEED)
        } else {
            DEFAULT_SPEED
        };
        if (speed - self.transition_speed).abs() > f32::EPSILON || !self.transition_speed.is_finite() {
            tracing::warn!(
                requested = self.transition_speed,
                applied = speed,
                "Transition speed out of range, clamping"
            );
        }
        self.transition_speed = speed;

        self.auto_blink.behavior = self.auto_blink.behavior.clone().clamped();
        self.head_movement.behavior = self.head_movement.behavior.clone().clamped();
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/desktop-mate/bridge.toml` or
/// `~/.config/desktop-mate/bridge.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("desktop-mate").join("bridge.toml"))
}

/// Load configuration from the default path plus the process environment
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed or
/// holds invalid values. A missing file is not an error.
pub fn load_config() -> Result<BridgeConfig, ConfigError> {
    load_config_from_path(default_config_path().as_deref())
}

/// Load configuration from a specific path plus the process environment
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or holds invalid
/// values.
pub fn load_config_from_path(path: Option<&Path>) -> Result<BridgeConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration with an explicit environment lookup
///
/// # Errors
///
/// Same as [`load_config_from_path`].
pub fn load_config_with_env<F>(path: Option<&Path>, env: F) -> Result<BridgeConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = BridgeConfig::default();

    if let Some(config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.to_path_buf(),
                    source: e,
                })?;

            let toml_config: BridgeToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.to_path_buf());
            config.source = ConfigSource::File;

            tracing::info!(path = %config_path.display(), "Loaded configuration from file");
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, env);
    config.validate()?;

    Ok(config)
}

fn apply_toml_config(config: &mut BridgeConfig, toml: &BridgeToml) {
    if let Some(host) = &toml.transport.host {
        config.transport.host.clone_from(host);
    }
    if let Some(port) = toml.transport.port {
        config.transport.port = port;
    }
    if let Some(timeout) = toml.transport.join_timeout_ms {
        config.transport.join_timeout_ms = timeout;
    }

    if let Some(speed) = toml.animation.transition_speed {
        config.transition_speed = speed;
    }
    if let Some(rate) = toml.animation.tick_rate_hz {
        config.tick_rate_hz = rate;
    }

    apply_idle_toml(&mut config.auto_blink, &toml.auto_blink);
    apply_idle_toml(&mut config.head_movement, &toml.head_movement);
}

fn apply_idle_toml(settings: &mut IdleSettings, toml: &IdleToml) {
    if let Some(enabled) = toml.enabled {
        settings.enabled = enabled;
    }

    let behavior = &mut settings.behavior;
    behavior.set_timing(
        toml.min_interval.unwrap_or(behavior.min_interval),
        toml.max_interval.unwrap_or(behavior.max_interval),
        toml.duration.unwrap_or(behavior.duration),
    );
    if let Some(easing) = toml.easing {
        behavior.easing = easing;
    }

    let amplitudes: Vec<f32> = behavior
        .channels
        .iter()
        .zip([toml.max_yaw, toml.max_pitch])
        .map(|(channel, value)| value.unwrap_or(channel.amplitude))
        .collect();
    behavior.set_amplitudes(&amplitudes);
}

fn apply_env_config<F>(config: &mut BridgeConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = env("BRIDGE_HOST") {
        config.transport.host = host;
        config.source = ConfigSource::Env;
    }
    if let Some(port) = env("BRIDGE_PORT").and_then(|v| v.parse::<u16>().ok()) {
        config.transport.port = port;
        config.source = ConfigSource::Env;
    }
    if let Some(ms) = env("BRIDGE_JOIN_TIMEOUT").and_then(|v| v.parse::<u64>().ok()) {
        config.transport.join_timeout_ms = ms;
        config.source = ConfigSource::Env;
    }
    if let Some(speed) = env("BRIDGE_TRANSITION_SPEED").and_then(|v| v.parse::<f32>().ok()) {
        config.transition_speed = speed;
        config.source = ConfigSource::Env;
    }
    if let Some(rate) = env("BRIDGE_TICK_RATE").and_then(|v| v.parse::<u32>().ok()) {
        config.tick_rate_hz = rate;
        config.source = ConfigSource::Env;
    }
}
