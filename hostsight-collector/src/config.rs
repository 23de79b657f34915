//! Configuration for host metrics collection.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Collection settings: cadence, sources and filters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Seconds between the start of two cycles (default: 5).
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Upper bound for a single file read or command run (default: 10).
    #[serde(default = "default_source_timeout")]
    pub source_timeout_secs: u64,

    /// How CPU and network counters are reported.
    #[serde(default)]
    pub counter_mode: CounterMode,

    /// Root of the proc filesystem (default: "/proc").
    #[serde(default = "default_proc_root")]
    pub proc_root: PathBuf,

    /// Which sources to read.
    #[serde(default)]
    pub collect: CollectConfig,

    /// Disk capacity filters.
    #[serde(default)]
    pub disk: DiskConfig,

    /// Disk I/O device filters.
    #[serde(default)]
    pub disk_io: DiskIoConfig,

    /// Network interface filters.
    #[serde(default)]
    pub network: NetworkConfig,

    /// External utilities invoked each cycle.
    #[serde(default)]
    pub commands: CommandsConfig,
}

fn default_interval() -> u64 {
    5
}

fn default_source_timeout() -> u64 {
    10
}

fn default_proc_root() -> PathBuf {
    PathBuf::from("/proc")
}

fn default_true() -> bool {
    true
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            source_timeout_secs: default_source_timeout(),
            counter_mode: CounterMode::default(),
            proc_root: default_proc_root(),
            collect: CollectConfig::default(),
            disk: DiskConfig::default(),
            disk_io: DiskIoConfig::default(),
            network: NetworkConfig::default(),
            commands: CommandsConfig::default(),
        }
    }
}

/// Reporting mode for CPU busy percentage and network throughput.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CounterMode {
    /// Lifetime values derived from counters since boot.
    #[default]
    Cumulative,
    /// Values over the interval between two consecutive cycles.
    Delta,
}

/// Per-source enable flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectConfig {
    #[serde(default = "default_true")]
    pub uptime: bool,
    #[serde(default = "default_true")]
    pub load: bool,
    #[serde(default = "default_true")]
    pub cpu: bool,
    #[serde(default = "default_true")]
    pub memory: bool,
    #[serde(default = "default_true")]
    pub disk_usage: bool,
    #[serde(default = "default_true")]
    pub disk_io: bool,
    #[serde(default = "default_true")]
    pub network: bool,
    /// Runs `netstat`, the most expensive source.
    #[serde(default = "default_true")]
    pub connections: bool,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            uptime: true,
            load: true,
            cpu: true,
            memory: true,
            disk_usage: true,
            disk_io: true,
            network: true,
            connections: true,
        }
    }
}

impl CollectConfig {
    pub fn any_enabled(&self) -> bool {
        self.uptime
            || self.load
            || self.cpu
            || self.memory
            || self.disk_usage
            || self.disk_io
            || self.network
            || self.connections
    }
}

/// Disk capacity filtering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskConfig {
    /// Mount paths starting with any of these are skipped.
    #[serde(default = "default_mount_prefixes")]
    pub exclude_prefixes: Vec<String>,

    /// Glob patterns for additional mount paths to skip.
    #[serde(default)]
    pub exclude: Vec<String>,
}

fn default_mount_prefixes() -> Vec<String> {
    vec!["/dev".to_string(), "/run".to_string(), "/sys".to_string()]
}

impl Default for DiskConfig {
    fn default() -> Self {
        Self {
            exclude_prefixes: default_mount_prefixes(),
            exclude: Vec::new(),
        }
    }
}

impl DiskConfig {
    /// Compile the configured patterns into a filter.
    ///
    /// Invalid patterns are ignored here; [`CollectionConfig::validate`] reports them.
    pub fn filter(&self) -> MountFilter {
        MountFilter {
            exclude_prefixes: self.exclude_prefixes.clone(),
            exclude: self
                .exclude
                .iter()
                .filter_map(|p| glob::Pattern::new(p).ok())
                .collect(),
        }
    }
}

/// Compiled mount path filter.
#[derive(Debug, Clone)]
pub struct MountFilter {
    exclude_prefixes: Vec<String>,
    exclude: Vec<glob::Pattern>,
}

impl MountFilter {
    /// Check if a mount path should be reported.
    pub fn should_include(&self, mount: &str) -> bool {
        if self
            .exclude_prefixes
            .iter()
            .any(|p| mount.starts_with(p.as_str()))
        {
            return false;
        }

        !self.exclude.iter().any(|p| p.matches(mount))
    }
}

impl Default for MountFilter {
    fn default() -> Self {
        DiskConfig::default().filter()
    }
}

/// Disk I/O device filtering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskIoConfig {
    /// Device names starting with any of these are skipped.
    #[serde(default = "default_device_prefixes")]
    pub exclude_prefixes: Vec<String>,
}

fn default_device_prefixes() -> Vec<String> {
    vec!["loop".to_string(), "ram".to_string()]
}

impl Default for DiskIoConfig {
    fn default() -> Self {
        Self {
            exclude_prefixes: default_device_prefixes(),
        }
    }
}

impl DiskIoConfig {
    pub fn should_include(&self, device: &str) -> bool {
        !self
            .exclude_prefixes
            .iter()
            .any(|p| device.starts_with(p.as_str()))
    }
}

/// Network interface filtering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Skip the loopback interface (default: true).
    #[serde(default = "default_true")]
    pub exclude_loopback: bool,

    /// Interface names to skip.
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            exclude_loopback: true,
            exclude: Vec::new(),
        }
    }
}

impl NetworkConfig {
    /// Check if an interface should be included.
    pub fn should_include(&self, name: &str) -> bool {
        if self.exclude_loopback && name == "lo" {
            return false;
        }

        !self.exclude.iter().any(|e| e == name)
    }
}

/// An external program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandConfig {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// Utilities whose output is parsed. The column layout is part of the contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandsConfig {
    /// Capacity listing in KiB blocks (default: `df -k`).
    #[serde(default = "default_df")]
    pub df: CommandConfig,

    /// TCP connection listing (default: `netstat -nat`).
    #[serde(default = "default_netstat")]
    pub netstat: CommandConfig,
}

fn default_df() -> CommandConfig {
    CommandConfig::new("df", &["-k"])
}

fn default_netstat() -> CommandConfig {
    CommandConfig::new("netstat", &["-nat"])
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            df: default_df(),
            netstat: default_netstat(),
        }
    }
}

impl CollectionConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_secs)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_secs == 0 {
            return Err(ConfigError::Validation(
                "interval_secs must be > 0".to_string(),
            ));
        }

        if self.source_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "source_timeout_secs must be > 0".to_string(),
            ));
        }

        if !self.collect.any_enabled() {
            return Err(ConfigError::Validation(
                "At least one source must be enabled".to_string(),
            ));
        }

        for pattern in &self.disk.exclude {
            if let Err(e) = glob::Pattern::new(pattern) {
                return Err(ConfigError::Validation(format!(
                    "Invalid disk exclude pattern '{}': {}",
                    pattern, e
                )));
            }
        }

        for (name, command) in [
            ("df", &self.commands.df),
            ("netstat", &self.commands.netstat),
        ] {
            if command.program.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "commands.{}.program must not be empty",
                    name
                )));
            }
        }

        Ok(())
    }
}
