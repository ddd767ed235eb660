// Configuration management for the VitalBLE CLI
//
// Cross-platform config stored in:
// - macOS: ~/Library/Application Support/vitalble/config.json
// - Linux: ~/.config/vitalble/config.json
// - Windows: %APPDATA%\vitalble\config.json

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use vitalble_core::{
    NativeStatus, ProviderKind, TransportConfig, CHUNK_SIZE, DEFAULT_CHARACTERISTIC_UUID,
    DEFAULT_SERVICE_UUID,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// GATT service identifier handed to the peripheral
    pub service_uuid: String,

    /// GATT characteristic identifier handed to the peripheral
    pub characteristic_uuid: String,

    /// Peripheral backend
    pub provider: ProviderKind,

    /// Status code the dry-run provider answers with (0 = success)
    pub native_status: i32,

    /// Chunking and pacing
    pub transport: TransportSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    /// Maximum bytes per notification
    pub chunk_size: usize,

    /// Pause between notifications in milliseconds
    pub pacing_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_uuid: DEFAULT_SERVICE_UUID.to_string(),
            characteristic_uuid: DEFAULT_CHARACTERISTIC_UUID.to_string(),
            provider: ProviderKind::default(),
            native_status: 0,
            transport: TransportSettings::default(),
        }
    }
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            pacing_ms: 1,
        }
    }
}

impl Config {
    /// Get the config directory path (cross-platform)
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to determine config directory")?
            .join("vitalble");

        std::fs::create_dir_all(&config_dir)
            .context("Failed to create config directory")?;

        Ok(config_dir)
    }

    /// Get the config file path
    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Load config from the default location, or defaults if none is saved
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_json::from_str(&contents)
            .context("Failed to parse config file")?;
        Ok(config)
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)
            .context("Failed to serialize config")?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    pub fn native_status(&self) -> NativeStatus {
        NativeStatus(self.native_status)
    }

    /// Transport settings, validated
    pub fn transport_config(&self) -> Result<TransportConfig> {
        let config = TransportConfig {
            chunk_size: self.transport.chunk_size,
            pacing: Duration::from_millis(self.transport.pacing_ms),
        };
        config.validate().context("Invalid transport settings")?;
        Ok(config)
    }

    /// Set a config value
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "service_uuid" => {
                self.service_uuid = non_blank(value)?;
            }
            "characteristic_uuid" => {
                self.characteristic_uuid = non_blank(value)?;
            }
            "provider" => {
                self.provider = value.parse()
                    .context("Invalid provider (expected dry-run or loopback)")?;
            }
            "native_status" => {
                self.native_status = value.parse()
                    .context("Invalid status code")?;
            }
            "chunk_size" => {
                let chunk_size = value.parse()
                    .context("Invalid number")?;
                TransportConfig { chunk_size, pacing: Duration::ZERO }
                    .validate()
                    .context("Invalid chunk size")?;
                self.transport.chunk_size = chunk_size;
            }
            "pacing_ms" => {
                self.transport.pacing_ms = value.parse()
                    .context("Invalid number")?;
            }
            _ => anyhow::bail!("Unknown config key: {}", key),
        }
        Ok(())
    }

    /// Get a config value
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "service_uuid" => Some(self.service_uuid.clone()),
            "characteristic_uuid" => Some(self.characteristic_uuid.clone()),
            "provider" => Some(self.provider.to_string()),
            "native_status" => Some(self.native_status.to_string()),
            "chunk_size" => Some(self.transport.chunk_size.to_string()),
            "pacing_ms" => Some(self.transport.pacing_ms.to_string()),
            _ => None,
        }
    }

    /// List all config values
    pub fn list(&self) -> Vec<(String, String)> {
        vec![
            ("service_uuid".to_string(), self.service_uuid.clone()),
            ("characteristic_uuid".to_string(), self.characteristic_uuid.clone()),
            ("provider".to_string(), self.provider.to_string()),
            ("native_status".to_string(), self.native_status.to_string()),
            ("chunk_size".to_string(), self.transport.chunk_size.to_string()),
            ("pacing_ms".to_string(), format!("{}ms", self.transport.pacing_ms)),
        ]
    }
}

fn non_blank(value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        anyhow::bail!("Value cannot be blank");
    }
    Ok(trimmed.to_string())
}
