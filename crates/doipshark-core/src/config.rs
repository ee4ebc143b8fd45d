//! Injected configuration: capture, worker pool, filter rule and session.
//!
//! Every section is `#[serde(default)]`, so a JSON file only needs the keys
//! it overrides.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::TransportProtocol;
use crate::filter::FilterRule;
use crate::protocols::doip::layout as doip_layout;

/// Lower bound applied to the routing activation wait.
pub const MIN_ACTIVATION_WAIT_MS: u64 = 100;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub capture: CaptureConfig,
    pub pool: PoolConfig,
    pub filter: FilterRule,
    pub session: SessionConfig,
}

impl AppConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.capture.validate()?;
        self.pool.validate()?;
        self.filter.validate()?;
        Ok(())
    }
}

/// Load and validate a JSON configuration file.
///
/// # Examples
/// ```no_run
/// use std::path::Path;
///
/// let config = doipshark_core::load_config(Path::new("doipshark.json"))?;
/// println!("workers: {}", config.pool.max_workers);
/// # Ok::<(), doipshark_core::ConfigError>(())
/// ```
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    AppConfig::from_json_str(&text)
}

/// Capture handle settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Interface name for live capture.
    pub device: Option<String>,
    /// Compiled capture filter expression (BPF syntax).
    pub filter: String,
    pub snaplen: i32,
    pub promisc: bool,
    pub read_timeout_ms: u64,
    /// Frames longer than this abort the capture.
    pub frame_ceiling: usize,
    /// Largest DoIP payload accepted before `MessageTooLarge`.
    pub max_doip_payload: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device: None,
            filter: "udp or tcp".to_string(),
            snaplen: 65535,
            promisc: true,
            read_timeout_ms: 100,
            frame_ceiling: 65535,
            max_doip_payload: doip_layout::DEFAULT_MAX_PAYLOAD_LEN,
        }
    }
}

impl CaptureConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.snaplen <= 0 {
            return Err(ConfigError::Invalid(format!(
                "capture.snaplen must be positive, got {}",
                self.snaplen
            )));
        }
        if self.frame_ceiling == 0 {
            return Err(ConfigError::Invalid(
                "capture.frame_ceiling must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Worker pool sizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub max_workers: usize,
    /// Workers kept alive while idle.
    pub min_workers: usize,
    pub idle_timeout_ms: u64,
    pub queue_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            min_workers: 1,
            idle_timeout_ms: 30_000,
            queue_capacity: 1024,
        }
    }
}

impl PoolConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_workers == 0 {
            return Err(ConfigError::Invalid(
                "pool.max_workers must be at least 1".to_string(),
            ));
        }
        if self.min_workers > self.max_workers {
            return Err(ConfigError::Invalid(format!(
                "pool.min_workers {} exceeds pool.max_workers {}",
                self.min_workers, self.max_workers
            )));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "pool.queue_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// DoIP client session settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Tester logical address.
    pub source_address: u16,
    /// Entity logical address diagnostic messages are sent to.
    pub target_address: u16,
    pub activation_type: u8,
    pub activation_required: bool,
    pub activation_wait_ms: u64,
    pub oem_specific: Option<[u8; doip_layout::OEM_SPECIFIC_LEN]>,
    pub alive_check_response: bool,
    pub protocol_version: u8,
    pub transport: TransportProtocol,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            source_address: 0x0E00,
            target_address: 0x1001,
            activation_type: 0x00,
            activation_required: true,
            activation_wait_ms: 2000,
            oem_specific: None,
            alive_check_response: true,
            protocol_version: doip_layout::DEFAULT_PROTOCOL_VERSION,
            transport: TransportProtocol::Tcp,
        }
    }
}

impl SessionConfig {
    /// Configured wait, never below [`MIN_ACTIVATION_WAIT_MS`].
    pub fn activation_wait(&self) -> Duration {
        Duration::from_millis(self.activation_wait_ms.max(MIN_ACTIVATION_WAIT_MS))
    }
}
