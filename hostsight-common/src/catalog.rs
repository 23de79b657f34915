//! Declared metrics: names, help text and fixed label schemas.

/// Every metric the collector exports.
///
/// The exported name is `<prefix>_<suffix>`; with the default `game` prefix the
/// names match the historical exporter (`game_cpu_usage_percent`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HostMetric {
    Uptime,
    SystemLoad,
    CpuUsagePercent,
    MemoryTotalBytes,
    MemoryUsedBytes,
    MemoryFreeBytes,
    MemoryAvailableBytes,
    MemoryUsedPercent,
    MemoryFreePercent,
    DiskTotalSizeBytes,
    DiskTotalUsedBytes,
    DiskTotalAvailableBytes,
    DiskTotalUsedPercent,
    DiskTotalAvailablePercent,
    DiskUsagePercent,
    DiskSizeBytes,
    DiskUsedBytes,
    DiskAvailableBytes,
    DiskPerformance,
    Network,
    Netstat,
    ExporterCycles,
    ExporterCycleDuration,
    ExporterSeries,
    ExporterSourceUp,
}

impl HostMetric {
    pub const ALL: [HostMetric; 25] = [
        HostMetric::Uptime,
        HostMetric::SystemLoad,
        HostMetric::CpuUsagePercent,
        HostMetric::MemoryTotalBytes,
        HostMetric::MemoryUsedBytes,
        HostMetric::MemoryFreeBytes,
        HostMetric::MemoryAvailableBytes,
        HostMetric::MemoryUsedPercent,
        HostMetric::MemoryFreePercent,
        HostMetric::DiskTotalSizeBytes,
        HostMetric::DiskTotalUsedBytes,
        HostMetric::DiskTotalAvailableBytes,
        HostMetric::DiskTotalUsedPercent,
        HostMetric::DiskTotalAvailablePercent,
        HostMetric::DiskUsagePercent,
        HostMetric::DiskSizeBytes,
        HostMetric::DiskUsedBytes,
        HostMetric::DiskAvailableBytes,
        HostMetric::DiskPerformance,
        HostMetric::Network,
        HostMetric::Netstat,
        HostMetric::ExporterCycles,
        HostMetric::ExporterCycleDuration,
        HostMetric::ExporterSeries,
        HostMetric::ExporterSourceUp,
    ];

    /// Name without the configurable prefix.
    pub fn suffix(&self) -> &'static str {
        match self {
            HostMetric::Uptime => "server_uptime_seconds",
            HostMetric::SystemLoad => "system_load",
            HostMetric::CpuUsagePercent => "cpu_usage_percent",
            HostMetric::MemoryTotalBytes => "memory_total_size_bytes",
            HostMetric::MemoryUsedBytes => "memory_usage_bytes",
            HostMetric::MemoryFreeBytes => "memory_free_bytes",
            HostMetric::MemoryAvailableBytes => "memory_available_bytes",
            HostMetric::MemoryUsedPercent => "memory_usage_percent",
            HostMetric::MemoryFreePercent => "memory_free_percent",
            HostMetric::DiskTotalSizeBytes => "disk_total_size_bytes",
            HostMetric::DiskTotalUsedBytes => "disk_total_used_bytes",
            HostMetric::DiskTotalAvailableBytes => "disk_total_available_bytes",
            HostMetric::DiskTotalUsedPercent => "disk_total_used_percent",
            HostMetric::DiskTotalAvailablePercent => "disk_total_available_percent",
            HostMetric::DiskUsagePercent => "disk_usage_percent",
            HostMetric::DiskSizeBytes => "disk_size_bytes",
            HostMetric::DiskUsedBytes => "disk_used_bytes",
            HostMetric::DiskAvailableBytes => "disk_available_bytes",
            HostMetric::DiskPerformance => "disk_performance",
            HostMetric::Network => "network",
            HostMetric::Netstat => "netstat",
            HostMetric::ExporterCycles => "exporter_cycles_total",
            HostMetric::ExporterCycleDuration => "exporter_cycle_duration_seconds",
            HostMetric::ExporterSeries => "exporter_series",
            HostMetric::ExporterSourceUp => "exporter_source_up",
        }
    }

    pub fn help(&self) -> &'static str {
        match self {
            HostMetric::Uptime => "Server uptime in seconds",
            HostMetric::SystemLoad => "System load averages (1m, 5m, 15m)",
            HostMetric::CpuUsagePercent => "CPU usage percentage",
            HostMetric::MemoryTotalBytes => "Total memory size in bytes",
            HostMetric::MemoryUsedBytes => "Memory usage in bytes",
            HostMetric::MemoryFreeBytes => "Free memory in bytes",
            HostMetric::MemoryAvailableBytes => "Available memory in bytes",
            HostMetric::MemoryUsedPercent => "Memory usage percentage",
            HostMetric::MemoryFreePercent => "Percentage of free memory",
            HostMetric::DiskTotalSizeBytes => "Total size of all disks in bytes",
            HostMetric::DiskTotalUsedBytes => "Total used bytes across all disks",
            HostMetric::DiskTotalAvailableBytes => "Total available bytes across all disks",
            HostMetric::DiskTotalUsedPercent => "Percentage of total disk space that is used",
            HostMetric::DiskTotalAvailablePercent => "Percentage of total disk space available",
            HostMetric::DiskUsagePercent => "Disk usage percentage per partition",
            HostMetric::DiskSizeBytes => "Total disk size in bytes per partition",
            HostMetric::DiskUsedBytes => "Used disk space in bytes per partition",
            HostMetric::DiskAvailableBytes => "Available disk space in bytes per partition",
            HostMetric::DiskPerformance => "Disk performance metrics (read/write bytes and IOPS)",
            HostMetric::Network => "Network activity metrics (bps, pps)",
            HostMetric::Netstat => "Network connections by port and state",
            HostMetric::ExporterCycles => "Completed collection cycles",
            HostMetric::ExporterCycleDuration => "Duration of the last collection cycle",
            HostMetric::ExporterSeries => "Series currently held by the registry",
            HostMetric::ExporterSourceUp => "Whether the last read of a source succeeded",
        }
    }

    /// Label keys, fixed for the lifetime of the process.
    ///
    /// An empty schema marks a fixed-cardinality metric.
    pub fn label_keys(&self) -> &'static [&'static str] {
        match self {
            HostMetric::SystemLoad => &["duration"],
            HostMetric::DiskUsagePercent
            | HostMetric::DiskSizeBytes
            | HostMetric::DiskUsedBytes
            | HostMetric::DiskAvailableBytes => &["partition"],
            HostMetric::DiskPerformance => &["device", "activity"],
            HostMetric::Network => &["interface", "direction", "metric"],
            HostMetric::Netstat => &["port", "state"],
            HostMetric::ExporterSourceUp => &["source"],
            _ => &[],
        }
    }

    pub fn is_fixed(&self) -> bool {
        self.label_keys().is_empty()
    }

    /// Full exported name for the given prefix.
    pub fn name(&self, prefix: &str) -> String {
        if prefix.is_empty() {
            self.suffix().to_string()
        } else {
            format!("{}_{}", prefix, self.suffix())
        }
    }
}
