use std::path::PathBuf;
use std::time::Duration;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CENTER, DEFAULT_MAX_ZOOM, DEFAULT_MIN_ZOOM, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_SERVER_URL, DEFAULT_TILE_URL, DEFAULT_ZOOM,
};
use crate::geo::LatLng;

/// System set for config loading (other plugins can run after this)
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfigLoaded;

/// Application configuration persisted to disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfigData {
    /// Base URL of the place/article backend
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Tile URL template with `{z}`, `{x}`, `{y}` and optional `{s}` placeholders
    #[serde(default = "default_tile_url")]
    pub tile_url: String,

    /// Map center on startup as `[lat, lng]`
    #[serde(default = "default_center")]
    pub center: [f64; 2],

    #[serde(default = "default_zoom")]
    pub initial_zoom: u8,

    #[serde(default = "default_min_zoom")]
    pub min_zoom: u8,

    #[serde(default = "default_max_zoom")]
    pub max_zoom: u8,

    /// Timeout applied to every backend and tile request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

fn default_tile_url() -> String {
    DEFAULT_TILE_URL.to_string()
}

fn default_center() -> [f64; 2] {
    DEFAULT_CENTER.into()
}

fn default_zoom() -> u8 {
    DEFAULT_ZOOM
}

fn default_min_zoom() -> u8 {
    DEFAULT_MIN_ZOOM
}

fn default_max_zoom() -> u8 {
    DEFAULT_MAX_ZOOM
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for AppConfigData {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            tile_url: default_tile_url(),
            center: default_center(),
            initial_zoom: default_zoom(),
            min_zoom: default_min_zoom(),
            max_zoom: default_max_zoom(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl AppConfigData {
    pub fn center(&self) -> LatLng {
        LatLng::from(self.center).normalized()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Zoom limits as `(min, max)`, repaired if the file has them swapped or out of range
    pub fn zoom_limits(&self) -> (u8, u8) {
        let min = self.min_zoom.min(self.max_zoom).min(crate::map::MAX_SUPPORTED_ZOOM);
        let max = self.max_zoom.max(self.min_zoom).min(crate::map::MAX_SUPPORTED_ZOOM);
        (min, max)
    }

    /// Initial zoom clamped into the configured limits
    pub fn initial_zoom(&self) -> u8 {
        let (min, max) = self.zoom_limits();
        self.initial_zoom.clamp(min, max)
    }
}

/// Runtime configuration resource
#[derive(Resource)]
pub struct AppConfig {
    /// The persisted configuration data
    pub data: AppConfigData,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Whether config needs to be saved (dirty flag)
    pub dirty: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data: AppConfigData::default(),
            config_path: crate::paths::config_file(),
            dirty: false,
        }
    }
}

/// Resource to notify user when config was reset to defaults
#[derive(Resource, Default)]
pub struct ConfigResetNotification {
    /// Whether to show the notification dialog
    pub show: bool,
    /// The reason for the reset (parse error, read error, etc.)
    pub reason: Option<String>,
}

/// Message to trigger config save
#[derive(Message)]
pub struct SaveConfigRequest;

/// Result of loading config from disk
struct LoadConfigResult {
    data: AppConfigData,
    /// Whether no file existed and defaults should be written out
    missing: bool,
    /// Error message if config was reset to defaults due to an error
    reset_reason: Option<String>,
}

/// Parse config JSON, falling back to defaults with a human-readable reason
fn parse_config(json: &str) -> (AppConfigData, Option<String>) {
    match serde_json::from_str(json) {
        Ok(data) => (data, None),
        Err(e) => {
            warn!("Failed to parse config file: {}", e);
            (
                AppConfigData::default(),
                Some(format!("Configuration file was corrupted: {}", e)),
            )
        }
    }
}

/// Load configuration from disk
fn load_config(config_path: &std::path::Path) -> LoadConfigResult {
    if !config_path.exists() {
        info!("No config file found, using defaults");
        return LoadConfigResult {
            data: AppConfigData::default(),
            missing: true,
            reset_reason: None,
        };
    }

    let (data, reset_reason) = match std::fs::read_to_string(config_path) {
        Ok(json) => {
            let parsed = parse_config(&json);
            if parsed.1.is_none() {
                info!("Loaded config from {:?}", config_path);
            }
            parsed
        }
        Err(e) => {
            warn!("Failed to read config file: {}", e);
            (
                AppConfigData::default(),
                Some(format!("Could not read configuration file: {}", e)),
            )
        }
    };

    LoadConfigResult {
        data,
        missing: false,
        reset_reason,
    }
}

/// Save configuration to disk
fn save_config(config: &AppConfig) {
    if let Err(e) = crate::paths::ensure_directories() {
        error!("Failed to create config directory: {}", e);
        return;
    }

    match serde_json::to_string_pretty(&config.data) {
        Ok(json) => {
            if let Err(e) = std::fs::write(&config.config_path, json) {
                error!("Failed to save config: {}", e);
            } else {
                info!("Config saved to {:?}", config.config_path);
            }
        }
        Err(e) => {
            error!("Failed to serialize config: {}", e);
        }
    }
}

/// Startup system to load config from disk into the existing resource
fn load_config_system(
    mut config: ResMut<AppConfig>,
    mut reset_notification: ResMut<ConfigResetNotification>,
    mut save_events: MessageWriter<SaveConfigRequest>,
) {
    let result = load_config(&config.config_path);
    config.data = result.data;

    // Write defaults out so the user has a file to edit
    if result.missing {
        config.dirty = true;
        save_events.write(SaveConfigRequest);
    }

    // Set notification if config was reset due to an error
    if let Some(reason) = result.reset_reason {
        reset_notification.show = true;
        reset_notification.reason = Some(reason);
    }
}

/// System to save config when requested
fn save_config_system(
    mut events: MessageReader<SaveConfigRequest>,
    mut config: ResMut<AppConfig>,
) {
    for _ in events.read() {
        if config.dirty {
            save_config(&config);
            config.dirty = false;
        }
    }
}

pub struct ConfigPlugin;

impl Plugin for ConfigPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<AppConfig>()
            .init_resource::<ConfigResetNotification>()
            .add_message::<SaveConfigRequest>()
            .add_systems(Startup, load_config_system.in_set(ConfigLoaded))
            .add_systems(
                Update,
                save_config_system.run_if(on_message::<SaveConfigRequest>),
            );
    }
}
