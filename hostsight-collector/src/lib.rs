//! Host metric collection.
//!
//! Reads the host's raw text sources and turns them into registry updates:
//!
//! ```text
//! TextSource ──> SourceReaders ──> RawSamples ──> SampleBuilder ──> CycleUpdate
//!  (fs, proc)     (timeout, parse)                 (units, ratios)
//! ```
//!
//! # Sources
//!
//! | source        | raw input            |
//! |---------------|----------------------|
//! | `uptime`      | `/proc/uptime`       |
//! | `load`        | `/proc/loadavg`      |
//! | `cpu`         | `/proc/stat`         |
//! | `memory`      | `/proc/meminfo`      |
//! | `disk_usage`  | `df -k`              |
//! | `disk_io`     | `/proc/diskstats`    |
//! | `network`     | `/proc/net/dev`      |
//! | `connections` | `netstat -nat`       |

pub mod builder;
pub mod config;
pub mod error;
pub mod parser;
pub mod rates;
pub mod reader;
pub mod source;

pub use builder::SampleBuilder;
pub use config::{CollectionConfig, ConfigError, CounterMode};
pub use error::{SourceError, SourceKind};
pub use reader::{RawSamples, SourceReaders};
pub use source::{StaticSource, SystemSource, TextSource};
