//! Source identifiers and read failures.

use std::time::Duration;
use thiserror::Error;

/// One raw data source read per cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceKind {
    Uptime,
    Load,
    Cpu,
    Memory,
    DiskUsage,
    DiskIo,
    Network,
    Connections,
}

impl SourceKind {
    pub const ALL: [SourceKind; 8] = [
        SourceKind::Uptime,
        SourceKind::Load,
        SourceKind::Cpu,
        SourceKind::Memory,
        SourceKind::DiskUsage,
        SourceKind::DiskIo,
        SourceKind::Network,
        SourceKind::Connections,
    ];

    /// Value of the `source` label on `exporter_source_up`.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Uptime => "uptime",
            SourceKind::Load => "load",
            SourceKind::Cpu => "cpu",
            SourceKind::Memory => "memory",
            SourceKind::DiskUsage => "disk_usage",
            SourceKind::DiskIo => "disk_io",
            SourceKind::Network => "network",
            SourceKind::Connections => "connections",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a source produced no sample this cycle.
///
/// None of these are fatal: the reader logs them and the cycle moves on.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The file could not be read or the command could not be run.
    #[error("{kind} unavailable: {error}")]
    Unavailable {
        kind: SourceKind,
        #[source]
        error: std::io::Error,
    },

    /// Data was read but did not have the expected shape.
    #[error("{kind} malformed: {reason}")]
    Malformed { kind: SourceKind, reason: String },

    /// The read did not finish within the per-invocation timeout.
    #[error("{kind} timed out after {after:?}")]
    Timeout { kind: SourceKind, after: Duration },
}

impl SourceError {
    pub fn malformed(kind: SourceKind, reason: impl Into<String>) -> Self {
        Self::Malformed {
            kind,
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            SourceError::Unavailable { kind, .. }
            | SourceError::Malformed { kind, .. }
            | SourceError::Timeout { kind, .. } => *kind,
        }
    }
}

/// Result type alias for source reads.
pub type Result<T> = std::result::Result<T, SourceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SourceError::malformed(SourceKind::Load, "expected 3 fields, got 2");
        assert_eq!(err.to_string(), "load malformed: expected 3 fields, got 2");
        assert_eq!(err.kind(), SourceKind::Load);

        let err = SourceError::Timeout {
            kind: SourceKind::Connections,
            after: Duration::from_secs(10),
        };
        assert_eq!(err.to_string(), "connections timed out after 10s");
    }

    #[test]
    fn test_source_names_unique() {
        let names: std::collections::HashSet<_> =
            SourceKind::ALL.iter().map(|s| s.as_str()).collect();
        assert_eq!(names.len(), SourceKind::ALL.len());
    }
}
