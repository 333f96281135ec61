//! Configuration file support for etherlightd
//!
//! Loads the daemon configuration from TOML, or from JSON when the file
//! has a `.json` extension. Every key carries a default so that a partial
//! file, or none at all, still yields a runnable configuration.

use crate::error::{EtherlightError, Result};
use crate::snapshot::Snapshot;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::net::Ipv4Addr;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// SNMP agent access
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnmpConfig {
    /// v2c community string
    #[serde(default = "default_community")]
    pub community: String,

    /// Agent UDP port
    #[serde(default = "default_snmp_port")]
    pub port: u16,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_snmp_timeout")]
    pub timeout_ms: u64,
}

/// Front-panel port layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortsConfig {
    /// Number of ports shown on the strip
    #[serde(default = "default_port_count")]
    pub count: usize,
}

/// Monitored switch and strip geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(default = "default_switch_host")]
    pub switch_host: String,

    /// Friendly name of this light bar
    #[serde(default)]
    pub name: Option<String>,

    /// sysDescr captured by switch detection
    #[serde(default)]
    pub model_hint: Option<String>,

    /// sysName captured by switch detection
    #[serde(default)]
    pub switch_name: Option<String>,

    #[serde(default)]
    pub ports: PortsConfig,

    #[serde(default = "default_leds_per_port")]
    pub leds_per_port: usize,

    #[serde(default)]
    pub snmp: SnmpConfig,
}

/// State acquisition schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_poll_interval")]
    pub interval_sec: u64,
}

/// Render loop pacing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Rainbow sweep at startup, 0 disables
    #[serde(default = "default_boot_animation_ms")]
    pub boot_animation_ms: u64,
}

/// Strip output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedConfig {
    /// Global brightness 0-255
    #[serde(default = "default_brightness")]
    pub brightness: u8,

    /// Wire order of the strip, e.g. "GRB"
    #[serde(default = "default_color_order")]
    pub color_order: String,
}

/// Link LED breathing animation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PulseConfig {
    #[serde(default = "default_pulse_period")]
    pub period_ms: u64,

    #[serde(default = "default_pulse_min")]
    pub min: f64,

    #[serde(default = "default_pulse_max")]
    pub max: f64,

    /// "sine" or "triangle"; anything else renders as sine
    #[serde(default = "default_pulse_shape")]
    pub shape: String,
}

/// Role in VLAN color sharing between several light bars
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    #[default]
    Off,
    Master,
    Slave,
}

/// VLAN color multicast sync
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub mode: SyncMode,

    #[serde(default = "default_sync_multicast")]
    pub multicast: String,

    #[serde(default = "default_sync_port")]
    pub port: u16,
}

/// Log output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Complete etherlightd configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EtherlightConfig {
    #[serde(default)]
    pub device: DeviceConfig,

    #[serde(default)]
    pub polling: PollingConfig,

    #[serde(default)]
    pub render: RenderConfig,

    #[serde(default)]
    pub led: LedConfig,

    /// VLAN id (decimal string) → "#RRGGBB"
    #[serde(default)]
    pub vlan_colors: BTreeMap<String, String>,

    /// Speed bucket ("10".."10000") or "down" → "#RRGGBB"
    #[serde(default)]
    pub link_colors: BTreeMap<String, String>,

    #[serde(default)]
    pub pulse: PulseConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Runtime configuration shared with the workers.
pub type ConfigStore = Snapshot<EtherlightConfig>;

// Default functions
fn default_community() -> String {
    "public".to_string()
}

fn default_snmp_port() -> u16 {
    161
}

fn default_snmp_timeout() -> u64 {
    1500
}

fn default_port_count() -> usize {
    16
}

fn default_switch_host() -> String {
    "192.168.1.2".to_string()
}

fn default_leds_per_port() -> usize {
    2
}

fn default_poll_interval() -> u64 {
    5
}

fn default_tick_ms() -> u64 {
    40
}

fn default_boot_animation_ms() -> u64 {
    1200
}

fn default_brightness() -> u8 {
    64
}

fn default_color_order() -> String {
    "GRB".to_string()
}

fn default_pulse_period() -> u64 {
    2000
}

fn default_pulse_min() -> f64 {
    0.15
}

fn default_pulse_max() -> f64 {
    1.0
}

fn default_pulse_shape() -> String {
    "sine".to_string()
}

fn default_sync_multicast() -> String {
    "239.255.42.99".to_string()
}

fn default_sync_port() -> u16 {
    5007
}

fn default_log_level() -> String {
    "info".to_string()
}

// Default implementations
impl Default for SnmpConfig {
    fn default() -> Self {
        Self {
            community: default_community(),
            port: default_snmp_port(),
            timeout_ms: default_snmp_timeout(),
        }
    }
}

impl Default for PortsConfig {
    fn default() -> Self {
        Self {
            count: default_port_count(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            switch_host: default_switch_host(),
            name: None,
            model_hint: None,
            switch_name: None,
            ports: PortsConfig::default(),
            leds_per_port: default_leds_per_port(),
            snmp: SnmpConfig::default(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_sec: default_poll_interval(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            boot_animation_ms: default_boot_animation_ms(),
        }
    }
}

impl Default for LedConfig {
    fn default() -> Self {
        Self {
            brightness: default_brightness(),
            color_order: default_color_order(),
        }
    }
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            period_ms: default_pulse_period(),
            min: default_pulse_min(),
            max: default_pulse_max(),
            shape: default_pulse_shape(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            mode: SyncMode::default(),
            multicast: default_sync_multicast(),
            port: default_sync_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Minimum poll interval
const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Allowed render tick range in milliseconds
const TICK_MS_RANGE: (u64, u64) = (25, 40);

impl EtherlightConfig {
    /// Load configuration from file, falling back to defaults if file not found
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) => {
                let is_json = path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
                Self::parse(&content, is_json).map_err(|e| {
                    EtherlightError::Configuration(format!(
                        "Failed to parse config file {}: {}",
                        path.display(),
                        e
                    ))
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "config file not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(EtherlightError::Io(e)),
        }
    }

    /// Parse configuration text as JSON or TOML
    pub fn parse(content: &str, is_json: bool) -> std::result::Result<Self, String> {
        if is_json {
            serde_json::from_str(content).map_err(|e| e.to_string())
        } else {
            toml::from_str(content).map_err(|e| e.to_string())
        }
    }

    /// Configured port count
    pub fn port_count(&self) -> usize {
        self.device.ports.count
    }

    /// LEDs per port, at least one
    pub fn leds_per_port(&self) -> usize {
        self.device.leds_per_port.max(1)
    }

    /// Poll interval, never below one second
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.polling.interval_sec).max(MIN_POLL_INTERVAL)
    }

    /// Render tick interval, clamped to the supported range
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.render.tick_ms.clamp(TICK_MS_RANGE.0, TICK_MS_RANGE.1))
    }

    /// SNMP request timeout
    pub fn snmp_timeout(&self) -> Duration {
        Duration::from_millis(self.device.snmp.timeout_ms)
    }

    /// Startup animation length
    pub fn boot_animation(&self) -> Duration {
        Duration::from_millis(self.render.boot_animation_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.device.ports.count == 0 {
            return Err(EtherlightError::Configuration(
                "device.ports.count must be > 0".to_string(),
            ));
        }

        if self.device.switch_host.trim().is_empty() {
            return Err(EtherlightError::Configuration(
                "device.switch_host must not be empty".to_string(),
            ));
        }

        if self.pulse.min > self.pulse.max {
            return Err(EtherlightError::Configuration(
                "pulse.min must be <= pulse.max".to_string(),
            ));
        }

        if self.sync.mode != SyncMode::Off {
            let group: Ipv4Addr = self.sync.multicast.parse().map_err(|_| {
                EtherlightError::Configuration(format!(
                    "sync.multicast '{}' is not an IPv4 address",
                    self.sync.multicast
                ))
            })?;
            if !group.is_multicast() {
                return Err(EtherlightError::Configuration(format!(
                    "sync.multicast '{}' is not a multicast group",
                    group
                )));
            }
        }

        Ok(())
    }
}
