//! Parsers for procfs files and utility output.
//!
//! These are pure functions over text, so every format quirk can be tested
//! with string fixtures. Unit conversions that belong to the source format
//! (KiB to bytes, sectors to bytes) happen here; derived ratios are left to
//! the builder.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::config::{DiskIoConfig, MountFilter, NetworkConfig};
use crate::error::{Result, SourceError, SourceKind};

/// Bytes per KiB, the unit of `/proc/meminfo` and `df -k`.
pub const KIB: u64 = 1024;

/// Sector size assumed for `/proc/diskstats` counters.
pub const SECTOR_SIZE: u64 = 512;

/// Load averages from `/proc/loadavg`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoadAverage {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

/// Aggregate CPU counters from `/proc/stat`, in jiffies since boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
}

impl CpuTimes {
    pub fn total(&self) -> u64 {
        self.user
            .saturating_add(self.nice)
            .saturating_add(self.system)
            .saturating_add(self.idle)
    }

    pub fn busy(&self) -> u64 {
        self.total().saturating_sub(self.idle)
    }

    /// Busy share of all jiffies since boot, in percent.
    ///
    /// This is a lifetime average, not the utilization of the last interval.
    pub fn busy_percent(&self) -> f64 {
        percent(self.busy() as f64, self.total() as f64)
    }
}

/// Memory counters from `/proc/meminfo`, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemInfo {
    pub total_bytes: u64,
    pub free_bytes: u64,
    pub available_bytes: u64,
}

impl MemInfo {
    pub fn used_bytes(&self) -> u64 {
        self.total_bytes.saturating_sub(self.free_bytes)
    }
}

/// One mounted filesystem from `df -k`, in bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    pub mount: String,
    pub size_bytes: u64,
    pub used_bytes: u64,
    pub available_bytes: u64,
    /// The utility's own rounded use percentage.
    pub use_percent: f64,
}

/// Retained partitions of one `df` run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiskUsage {
    pub partitions: Vec<Partition>,
}

/// Sums across all retained partitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskTotals {
    pub size_bytes: u64,
    pub used_bytes: u64,
    pub available_bytes: u64,
}

impl DiskUsage {
    pub fn totals(&self) -> DiskTotals {
        self.partitions
            .iter()
            .fold(DiskTotals::default(), |acc, p| DiskTotals {
                size_bytes: acc.size_bytes.saturating_add(p.size_bytes),
                used_bytes: acc.used_bytes.saturating_add(p.used_bytes),
                available_bytes: acc.available_bytes.saturating_add(p.available_bytes),
            })
    }
}

/// Cumulative I/O counters of one block device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskIo {
    pub device: String,
    pub read_ops: u64,
    pub read_bytes: u64,
    pub write_ops: u64,
    pub write_bytes: u64,
}

/// Cumulative traffic counters of one network interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceIo {
    pub interface: String,
    pub rx_bytes: u64,
    pub rx_packets: u64,
    pub tx_bytes: u64,
    pub tx_packets: u64,
}

/// Connection counts per listening port and TCP state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionTable {
    pub counts: BTreeMap<String, BTreeMap<String, u64>>,
}

impl ConnectionTable {
    pub fn get(&self, port: &str, state: &str) -> Option<u64> {
        self.counts.get(port)?.get(state).copied()
    }

    /// Iterate over `(port, state, count)` triples.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, u64)> {
        self.counts.iter().flat_map(|(port, states)| {
            states
                .iter()
                .map(move |(state, count)| (port.as_str(), state.as_str(), *count))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// `part / whole * 100`, or 0 when `whole` is not positive.
pub fn percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}

/// Parse `/proc/uptime`: seconds since boot.
pub fn parse_uptime(content: &str) -> Result<f64> {
    let token = content
        .split_whitespace()
        .next()
        .ok_or_else(|| SourceError::malformed(SourceKind::Uptime, "empty content"))?;

    token
        .parse()
        .map_err(|_| SourceError::malformed(SourceKind::Uptime, format!("invalid uptime '{}'", token)))
}

/// Parse `/proc/loadavg`: the first three fields.
pub fn parse_loadavg(content: &str) -> Result<LoadAverage> {
    let fields: Vec<&str> = content.split_whitespace().collect();
    if fields.len() < 3 {
        return Err(SourceError::malformed(
            SourceKind::Load,
            format!("expected at least 3 fields, got {}", fields.len()),
        ));
    }

    let parse = |idx: usize| -> Result<f64> {
        fields[idx].parse().map_err(|_| {
            SourceError::malformed(
                SourceKind::Load,
                format!("invalid load average '{}'", fields[idx]),
            )
        })
    };

    Ok(LoadAverage {
        one: parse(0)?,
        five: parse(1)?,
        fifteen: parse(2)?,
    })
}

/// Parse the aggregate `cpu ` line of `/proc/stat`.
///
/// Per-core lines (`cpu0`, `cpu1`, ...) are ignored.
pub fn parse_cpu_stat(content: &str) -> Result<CpuTimes> {
    let line = content
        .lines()
        .find(|l| l.starts_with("cpu "))
        .ok_or_else(|| SourceError::malformed(SourceKind::Cpu, "no aggregate cpu line"))?;

    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 5 {
        return Err(SourceError::malformed(
            SourceKind::Cpu,
            format!("expected at least 5 fields, got {}", fields.len()),
        ));
    }

    let parse = |idx: usize| -> Result<u64> {
        fields[idx].parse().map_err(|_| {
            SourceError::malformed(SourceKind::Cpu, format!("invalid counter '{}'", fields[idx]))
        })
    };

    Ok(CpuTimes {
        user: parse(1)?,
        nice: parse(2)?,
        system: parse(3)?,
        idle: parse(4)?,
    })
}

/// Parse `MemTotal`, `MemFree` and `MemAvailable` from `/proc/meminfo`.
///
/// Missing keys read as zero; content without any of them is malformed.
pub fn parse_meminfo(content: &str) -> Result<MemInfo> {
    let mut info = MemInfo::default();
    let mut found = false;

    for line in content.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };

        let slot = match key.trim() {
            "MemTotal" => &mut info.total_bytes,
            "MemFree" => &mut info.free_bytes,
            "MemAvailable" => &mut info.available_bytes,
            _ => continue,
        };

        let Some(kib) = rest.split_whitespace().next().and_then(|v| v.parse::<u64>().ok()) else {
            debug!(key = key.trim(), "Skipping unparsable meminfo value");
            continue;
        };

        *slot = kib.saturating_mul(KIB);
        found = true;
    }

    if !found {
        return Err(SourceError::malformed(
            SourceKind::Memory,
            "no MemTotal, MemFree or MemAvailable entry",
        ));
    }

    Ok(info)
}

/// Parse `df -k` output.
///
/// The first line is the header. A filesystem name too long for its column
/// sits alone on a line and continues on the next one. Mount paths may
/// contain spaces, so everything from the sixth column on is the mount.
pub fn parse_df(content: &str, filter: &MountFilter) -> Result<DiskUsage> {
    let mut lines = content.lines();
    if lines.next().is_none() {
        return Err(SourceError::malformed(SourceKind::DiskUsage, "empty output"));
    }

    let mut usage = DiskUsage::default();
    let mut pending: Option<&str> = None;

    for line in lines {
        let mut fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() == 1 {
            pending = Some(fields[0]);
            continue;
        }
        if let Some(name) = pending.take() {
            fields.insert(0, name);
        }
        if fields.len() < 6 {
            continue;
        }

        let mount = fields[5..].join(" ");
        if !filter.should_include(&mount) {
            continue;
        }

        let blocks = |idx: usize| fields[idx].parse::<u64>().ok();
        let (Some(size), Some(used), Some(available)) = (blocks(1), blocks(2), blocks(3)) else {
            debug!(line, "Skipping unparsable df row");
            continue;
        };

        // Filesystems without a meaningful percentage print "-"
        let use_percent = fields[4]
            .trim_end_matches('%')
            .parse::<f64>()
            .unwrap_or(0.0);

        usage.partitions.push(Partition {
            mount,
            size_bytes: size.saturating_mul(KIB),
            used_bytes: used.saturating_mul(KIB),
            available_bytes: available.saturating_mul(KIB),
            use_percent,
        });
    }

    Ok(usage)
}

/// Parse `/proc/diskstats`.
///
/// Columns: major, minor, name, reads completed, reads merged, sectors read,
/// ms reading, writes completed, writes merged, sectors written, ...
pub fn parse_diskstats(content: &str, filter: &DiskIoConfig) -> Result<Vec<DiskIo>> {
    if content.trim().is_empty() {
        return Err(SourceError::malformed(SourceKind::DiskIo, "empty content"));
    }

    let mut devices = Vec::new();

    for line in content.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 14 {
            continue;
        }

        let device = fields[2];
        if !filter.should_include(device) {
            continue;
        }

        let counter = |idx: usize| fields[idx].parse::<u64>().ok();
        let (Some(read_ops), Some(read_sectors), Some(write_ops), Some(write_sectors)) =
            (counter(3), counter(5), counter(7), counter(9))
        else {
            debug!(device, "Skipping unparsable diskstats row");
            continue;
        };

        devices.push(DiskIo {
            device: device.to_string(),
            read_ops,
            read_bytes: read_sectors.saturating_mul(SECTOR_SIZE),
            write_ops,
            write_bytes: write_sectors.saturating_mul(SECTOR_SIZE),
        });
    }

    Ok(devices)
}

/// Parse `/proc/net/dev`.
///
/// After `name:` come 8 receive columns (bytes, packets, ...) then 8 transmit
/// columns. Large counters can touch the colon, so split on it rather than on
/// whitespace.
pub fn parse_net_dev(content: &str, filter: &NetworkConfig) -> Result<Vec<InterfaceIo>> {
    if content.trim().is_empty() {
        return Err(SourceError::malformed(SourceKind::Network, "empty content"));
    }

    let mut interfaces = Vec::new();

    for line in content.lines() {
        let Some((name, rest)) = line.split_once(':') else {
            continue;
        };

        let name = name.trim();
        if name.is_empty() || !filter.should_include(name) {
            continue;
        }

        let fields: Vec<&str> = rest.split_whitespace().collect();
        if fields.len() < 10 {
            continue;
        }

        let counter = |idx: usize| fields[idx].parse::<u64>().ok();
        let (Some(rx_bytes), Some(rx_packets), Some(tx_bytes), Some(tx_packets)) =
            (counter(0), counter(1), counter(8), counter(9))
        else {
            debug!(interface = name, "Skipping unparsable net/dev row");
            continue;
        };

        interfaces.push(InterfaceIo {
            interface: name.to_string(),
            rx_bytes,
            rx_packets,
            tx_bytes,
            tx_packets,
        });
    }

    Ok(interfaces)
}

/// Parse `netstat -nat` output into per-port state counts.
///
/// Two passes: the first collects every local port with a `LISTEN` row, the
/// second counts the rows of those ports by state. Connections on ports that
/// never listen (client-side ephemeral ports) are not reported.
pub fn parse_netstat(content: &str) -> Result<ConnectionTable> {
    let rows: Vec<(&str, &str)> = content
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 6 {
                return None;
            }
            let (_, port) = fields[3].rsplit_once(':')?;
            if port.is_empty() {
                return None;
            }
            Some((port, fields[5]))
        })
        .collect();

    let listening: BTreeSet<&str> = rows
        .iter()
        .filter(|(_, state)| *state == "LISTEN")
        .map(|(port, _)| *port)
        .collect();

    let mut table = ConnectionTable::default();
    for (port, state) in rows {
        if !listening.contains(port) {
            continue;
        }
        *table
            .counts
            .entry(port.to_string())
            .or_default()
            .entry(state.to_string())
            .or_insert(0) += 1;
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DF_OUTPUT: &str = "\
Filesystem     1K-blocks     Used Available Use% Mounted on
udev             8123456        0   8123456   0% /dev
tmpfs            1634000     2100   1631900   1% /run
/dev/sda2      102400000 51200000  46080000  53% /
tmpfs            8170000        0   8170000   0% /dev/shm
/dev/sda1         524272     6220    518052   2% /boot/efi
/dev/sdb1      204800000 10240000 194560000   5% /data
tmpfs            1634000       16   1633984   1% /run/user/1000
cgroup                 0        0         0    - /sys/fs/cgroup
";

    const DISKSTATS: &str = "\
   7       0 loop0 55 0 2216 21 0 0 0 0 0 40 21 0 0 0 0
   1       0 ram0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0
   8       0 sda 12000 300 2400000 5000 8000 900 1600000 7000 0 9000 12000 0 0 0 0
   8       1 sda1 500 0 10000 100 10 0 80 5 0 90 105 0 0 0 0
 259       0 nvme0n1 42 0 84 1 21 0 42 2 0 3 3 0 0 0 0
";

    const NET_DEV: &str = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo: 9000000   90000    0    0    0     0          0         0  9000000   90000    0    0    0     0       0          0
  eth0: 1000000    2000    0    0    0     0          0         0   500000    1500    0    0    0     0       0          0
 wlan0:12345678901   777    0    0    0     0          0         0      42       7    0    0    0     0       0          0
";

    const NETSTAT: &str = "\
Active Internet connections (servers and established)
Proto Recv-Q Send-Q Local Address           Foreign Address         State
tcp        0      0 0.0.0.0:22              0.0.0.0:*               LISTEN
tcp        0      0 127.0.0.1:5432          0.0.0.0:*               LISTEN
tcp        0      0 10.0.0.5:22             10.0.0.9:51514          ESTABLISHED
tcp        0      0 10.0.0.5:22             10.0.0.7:40022          ESTABLISHED
tcp        0      0 10.0.0.5:48810          140.82.112.4:443        ESTABLISHED
tcp        0      0 10.0.0.5:22             10.0.0.8:33000          TIME_WAIT
tcp6       0      0 :::80                   :::*                    LISTEN
tcp6       0      0 ::1:80                  ::1:59000               CLOSE_WAIT
";

    #[test]
    fn test_parse_uptime() {
        assert_eq!(parse_uptime("350735.47 234388.90\n").unwrap(), 350735.47);
    }

    #[test]
    fn test_parse_uptime_malformed() {
        assert!(parse_uptime("").is_err());
        assert!(parse_uptime("abc 1.0").is_err());
    }

    #[test]
    fn test_parse_loadavg() {
        let load = parse_loadavg("0.52 0.58 0.59 2/1011 12345\n").unwrap();
        assert_eq!(
            load,
            LoadAverage {
                one: 0.52,
                five: 0.58,
                fifteen: 0.59
            }
        );
    }

    #[test]
    fn test_parse_loadavg_exactly_three_fields() {
        let load = parse_loadavg("1 2 3").unwrap();
        assert_eq!(load.one, 1.0);
        assert_eq!(load.fifteen, 3.0);
    }

    #[test]
    fn test_parse_loadavg_too_few_fields() {
        let err = parse_loadavg("0.52 0.58").unwrap_err();
        assert!(matches!(err, SourceError::Malformed { kind: SourceKind::Load, .. }));
    }

    #[test]
    fn test_parse_cpu_stat_aggregate_line() {
        let content = "\
cpu0 1 1 1 1 0 0 0 0 0 0
cpu  100 0 50 850 10 0 3 0 0 0
cpu1 7 7 7 7 0 0 0 0 0 0
intr 12345
";
        let cpu = parse_cpu_stat(content).unwrap();

        assert_eq!(
            cpu,
            CpuTimes {
                user: 100,
                nice: 0,
                system: 50,
                idle: 850
            }
        );
        assert_eq!(cpu.busy_percent(), 15.0);
    }

    #[test]
    fn test_parse_cpu_stat_without_aggregate() {
        assert!(parse_cpu_stat("cpu0 1 2 3 4\ncpu1 1 2 3 4\n").is_err());
        assert!(parse_cpu_stat("cpu  1 2 3\n").is_err());
    }

    #[test]
    fn test_cpu_busy_percent_bounds() {
        let idle = CpuTimes {
            idle: 500,
            ..Default::default()
        };
        assert_eq!(idle.busy_percent(), 0.0);

        let busy = CpuTimes {
            user: 10,
            nice: 5,
            system: 5,
            idle: 0,
        };
        assert_eq!(busy.busy_percent(), 100.0);

        assert_eq!(CpuTimes::default().busy_percent(), 0.0);
    }

    #[test]
    fn test_cpu_counters_at_u64_max_saturate() {
        let cpu = parse_cpu_stat("cpu  18446744073709551615 1 0 0\n").unwrap();

        assert_eq!(cpu.total(), u64::MAX);
        assert_eq!(cpu.busy(), u64::MAX);
        assert_eq!(cpu.busy_percent(), 100.0);

        let idle = CpuTimes {
            idle: u64::MAX,
            user: 1,
            ..Default::default()
        };
        assert_eq!(idle.busy(), 0);
    }

    #[test]
    fn test_parse_meminfo() {
        let content = "\
MemTotal:       16303428 kB
MemFree:         1204372 kB
MemAvailable:    9876543 kB
Buffers:          512000 kB
";
        let mem = parse_meminfo(content).unwrap();

        assert_eq!(mem.total_bytes, 16303428 * 1024);
        assert_eq!(mem.free_bytes, 1204372 * 1024);
        assert_eq!(mem.available_bytes, 9876543 * 1024);
        assert_eq!(mem.used_bytes(), (16303428 - 1204372) * 1024);
    }

    #[test]
    fn test_parse_meminfo_missing_keys() {
        let mem = parse_meminfo("MemFree: 100 kB\n").unwrap();
        assert_eq!(mem.total_bytes, 0);
        assert_eq!(mem.used_bytes(), 0);

        assert!(parse_meminfo("SwapTotal: 100 kB\n").is_err());
    }

    #[test]
    fn test_parse_df_excludes_virtual_mounts() {
        let usage = parse_df(DF_OUTPUT, &MountFilter::default()).unwrap();

        let mounts: Vec<_> = usage.partitions.iter().map(|p| p.mount.as_str()).collect();
        assert_eq!(mounts, vec!["/", "/boot/efi", "/data"]);

        let root = &usage.partitions[0];
        assert_eq!(root.size_bytes, 102400000 * 1024);
        assert_eq!(root.used_bytes, 51200000 * 1024);
        assert_eq!(root.available_bytes, 46080000 * 1024);
        assert_eq!(root.use_percent, 53.0);
    }

    #[test]
    fn test_disk_totals_sum_included_partitions() {
        let usage = parse_df(DF_OUTPUT, &MountFilter::default()).unwrap();
        let totals = usage.totals();

        assert_eq!(totals.size_bytes, (102400000 + 524272 + 204800000) * 1024);
        assert_eq!(totals.used_bytes, (51200000 + 6220 + 10240000) * 1024);
        assert_eq!(totals.available_bytes, (46080000 + 518052 + 194560000) * 1024);
    }

    #[test]
    fn test_disk_totals_saturate_on_huge_sizes() {
        let content = "\
Filesystem 1K-blocks Used Available Use% Mounted on
/dev/sda1 18446744073709551615 18446744073709551615 1 100% /a
/dev/sdb1 18446744073709551615 1 18446744073709551615 1% /b
";
        let totals = parse_df(content, &MountFilter::default()).unwrap().totals();

        assert_eq!(totals.size_bytes, u64::MAX);
        assert_eq!(totals.used_bytes, u64::MAX);
        assert_eq!(totals.available_bytes, u64::MAX);
    }

    #[test]
    fn test_parse_df_wrapped_name_and_spaces() {
        let content = "\
Filesystem 1K-blocks Used Available Use% Mounted on
/dev/mapper/very-long-volume-group-name-root
                1000 400 600 40% /
/dev/sdc1 2000 1000 1000 50% /media/usb stick
";
        let usage = parse_df(content, &MountFilter::default()).unwrap();

        assert_eq!(usage.partitions.len(), 2);
        assert_eq!(usage.partitions[0].mount, "/");
        assert_eq!(usage.partitions[0].size_bytes, 1000 * 1024);
        assert_eq!(usage.partitions[1].mount, "/media/usb stick");
    }

    #[test]
    fn test_parse_df_empty() {
        assert!(parse_df("", &MountFilter::default()).is_err());

        let header_only = parse_df("Filesystem 1K-blocks Used Available Use% Mounted on\n", &MountFilter::default()).unwrap();
        assert!(header_only.partitions.is_empty());
        assert_eq!(header_only.totals(), DiskTotals::default());
    }

    #[test]
    fn test_parse_diskstats() {
        let devices = parse_diskstats(DISKSTATS, &DiskIoConfig::default()).unwrap();

        let names: Vec<_> = devices.iter().map(|d| d.device.as_str()).collect();
        assert_eq!(names, vec!["sda", "sda1", "nvme0n1"]);

        let sda = &devices[0];
        assert_eq!(sda.read_ops, 12000);
        assert_eq!(sda.read_bytes, 2400000 * 512);
        assert_eq!(sda.write_ops, 8000);
        assert_eq!(sda.write_bytes, 1600000 * 512);
    }

    #[test]
    fn test_parse_diskstats_short_rows_skipped() {
        let devices =
            parse_diskstats("8 0 sda 1 2 3\n", &DiskIoConfig::default()).unwrap();
        assert!(devices.is_empty());
        assert!(parse_diskstats("  \n", &DiskIoConfig::default()).is_err());
    }

    #[test]
    fn test_parse_net_dev() {
        let interfaces = parse_net_dev(NET_DEV, &NetworkConfig::default()).unwrap();

        let names: Vec<_> = interfaces.iter().map(|i| i.interface.as_str()).collect();
        assert_eq!(names, vec!["eth0", "wlan0"]);

        let eth0 = &interfaces[0];
        assert_eq!(eth0.rx_bytes, 1000000);
        assert_eq!(eth0.rx_packets, 2000);
        assert_eq!(eth0.tx_bytes, 500000);
        assert_eq!(eth0.tx_packets, 1500);

        // Counter glued to the colon
        assert_eq!(interfaces[1].rx_bytes, 12345678901);
        assert_eq!(interfaces[1].tx_packets, 7);
    }

    #[test]
    fn test_parse_net_dev_keeps_loopback_when_allowed() {
        let filter = NetworkConfig {
            exclude_loopback: false,
            exclude: vec![],
        };
        let interfaces = parse_net_dev(NET_DEV, &filter).unwrap();
        assert!(interfaces.iter().any(|i| i.interface == "lo"));
    }

    #[test]
    fn test_parse_netstat_two_pass() {
        let table = parse_netstat(NETSTAT).unwrap();

        assert_eq!(table.get("22", "LISTEN"), Some(1));
        assert_eq!(table.get("22", "ESTABLISHED"), Some(2));
        assert_eq!(table.get("22", "TIME_WAIT"), Some(1));
        assert_eq!(table.get("5432", "LISTEN"), Some(1));
        assert_eq!(table.get("80", "LISTEN"), Some(1));
        assert_eq!(table.get("80", "CLOSE_WAIT"), Some(1));

        // Outgoing connection from an ephemeral port
        assert!(!table.counts.contains_key("48810"));
    }

    #[test]
    fn test_parse_netstat_established_without_listen_excluded() {
        let content = "\
tcp        0      0 10.0.0.5:9000           10.0.0.9:51514          ESTABLISHED
tcp        0      0 10.0.0.5:9000           10.0.0.7:40022          ESTABLISHED
";
        let table = parse_netstat(content).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_parse_netstat_listen_then_established() {
        let content = "\
tcp        0      0 0.0.0.0:8080            0.0.0.0:*               LISTEN
tcp        0      0 10.0.0.5:8080           10.0.0.9:51514          ESTABLISHED
";
        let table = parse_netstat(content).unwrap();

        let expected = BTreeMap::from([(
            "8080".to_string(),
            BTreeMap::from([
                ("ESTABLISHED".to_string(), 1),
                ("LISTEN".to_string(), 1),
            ]),
        )]);
        assert_eq!(table.counts, expected);
    }

    #[test]
    fn test_parse_netstat_listen_after_established_still_counts() {
        let content = "\
tcp        0      0 10.0.0.5:8080           10.0.0.9:51514          ESTABLISHED
tcp        0      0 0.0.0.0:8080            0.0.0.0:*               LISTEN
";
        let table = parse_netstat(content).unwrap();
        assert_eq!(table.get("8080", "ESTABLISHED"), Some(1));
        assert_eq!(table.iter().count(), 2);
    }

    #[test]
    fn test_percent_guards_zero_divisor() {
        assert_eq!(percent(800.0, 1000.0), 80.0);
        assert_eq!(percent(5.0, 0.0), 0.0);
    }
}
