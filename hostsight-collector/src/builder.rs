//! Sample builder: raw samples in, one [`CycleUpdate`] out.
//!
//! Derived ratios are computed here, and every value is checked before it is
//! emitted. A source that failed this cycle contributes no family update, so
//! the registry keeps whatever it last held for those metrics.

use std::collections::BTreeMap;

use hostsight_common::{CycleUpdate, HostMetric, LabelSet};
use tracing::warn;

use crate::config::CounterMode;
use crate::parser::{ConnectionTable, DiskIo, DiskUsage, InterfaceIo, LoadAverage, MemInfo, percent};
use crate::rates::RateTracker;
use crate::reader::RawSamples;

/// Builds the registry update of each cycle.
#[derive(Debug)]
pub struct SampleBuilder {
    prefix: String,
    mode: CounterMode,
    rates: RateTracker,
    last_dropped: usize,
}

impl SampleBuilder {
    pub fn new(prefix: impl Into<String>, mode: CounterMode) -> Self {
        Self {
            prefix: prefix.into(),
            mode,
            rates: RateTracker::new(),
            last_dropped: 0,
        }
    }

    /// Points dropped as invalid during the last [`build`](Self::build).
    pub fn last_dropped(&self) -> usize {
        self.last_dropped
    }

    /// Build the update for one cycle started at `timestamp` (epoch ms).
    pub fn build(&mut self, samples: &RawSamples, timestamp: i64) -> CycleUpdate {
        let mut out = Emitter {
            update: CycleUpdate::new(timestamp),
            prefix: &self.prefix,
            dropped: 0,
        };

        if let Some(uptime) = samples.uptime {
            out.fixed(HostMetric::Uptime, uptime);
        }
        if let Some(load) = &samples.load {
            emit_load(&mut out, load);
        }
        if let Some(cpu) = samples.cpu {
            let busy = match self.mode {
                CounterMode::Cumulative => Some(cpu.busy_percent()),
                CounterMode::Delta => self.rates.cpu_busy_percent(cpu),
            };
            if let Some(busy) = busy {
                out.fixed(HostMetric::CpuUsagePercent, busy);
            }
        }
        if let Some(memory) = &samples.memory {
            emit_memory(&mut out, memory);
        }
        if let Some(usage) = &samples.disk_usage {
            emit_disk_usage(&mut out, usage);
        }
        if let Some(devices) = &samples.disk_io {
            emit_disk_io(&mut out, devices);
        }
        if let Some(interfaces) = &samples.network {
            match self.mode {
                CounterMode::Cumulative => emit_network_totals(&mut out, interfaces),
                CounterMode::Delta => {
                    // Nothing to compare against on the first cycle
                    if let Some(rates) = self.rates.network_rates(interfaces, timestamp) {
                        out.family(
                            HostMetric::Network,
                            rates.iter().flat_map(|r| {
                                [
                                    (network_labels(&r.interface, "in", "bps"), r.rx_bits_per_sec),
                                    (network_labels(&r.interface, "in", "pps"), r.rx_packets_per_sec),
                                    (network_labels(&r.interface, "out", "bps"), r.tx_bits_per_sec),
                                    (network_labels(&r.interface, "out", "pps"), r.tx_packets_per_sec),
                                ]
                            }),
                        );
                    }
                }
            }
        }
        if let Some(table) = &samples.connections {
            emit_connections(&mut out, table);
        }

        self.last_dropped = out.dropped;
        out.update
    }
}

struct Emitter<'a> {
    update: CycleUpdate,
    prefix: &'a str,
    dropped: usize,
}

impl Emitter<'_> {
    fn fixed(&mut self, metric: HostMetric, value: f64) {
        let name = metric.name(self.prefix);
        if self.accept(&name, value) {
            self.update.set_fixed(name, value);
        }
    }

    fn family(&mut self, metric: HostMetric, entries: impl IntoIterator<Item = (LabelSet, f64)>) {
        let name = metric.name(self.prefix);
        let mut series = BTreeMap::new();
        for (labels, value) in entries {
            if self.accept(&name, value) {
                series.insert(labels, value);
            }
        }
        self.update.replace_family(name, series);
    }

    fn accept(&mut self, name: &str, value: f64) -> bool {
        if value.is_finite() && value >= 0.0 {
            return true;
        }
        warn!(metric = name, value, "Dropping invalid derived value");
        self.dropped += 1;
        false
    }
}

fn emit_load(out: &mut Emitter<'_>, load: &LoadAverage) {
    out.family(
        HostMetric::SystemLoad,
        [("1m", load.one), ("5m", load.five), ("15m", load.fifteen)]
            .map(|(duration, value)| (LabelSet::new().with("duration", duration), value)),
    );
}

fn emit_memory(out: &mut Emitter<'_>, memory: &MemInfo) {
    let total = memory.total_bytes as f64;
    let free = memory.free_bytes as f64;
    let used = memory.used_bytes() as f64;

    out.fixed(HostMetric::MemoryTotalBytes, total);
    out.fixed(HostMetric::MemoryUsedBytes, used);
    out.fixed(HostMetric::MemoryFreeBytes, free);
    out.fixed(HostMetric::MemoryAvailableBytes, memory.available_bytes as f64);
    out.fixed(HostMetric::MemoryUsedPercent, percent(used, total));
    out.fixed(HostMetric::MemoryFreePercent, percent(free, total));
}

fn emit_disk_usage(out: &mut Emitter<'_>, usage: &DiskUsage) {
    let totals = usage.totals();
    let size = totals.size_bytes as f64;

    out.fixed(HostMetric::DiskTotalSizeBytes, size);
    out.fixed(HostMetric::DiskTotalUsedBytes, totals.used_bytes as f64);
    out.fixed(HostMetric::DiskTotalAvailableBytes, totals.available_bytes as f64);
    out.fixed(
        HostMetric::DiskTotalUsedPercent,
        percent(totals.used_bytes as f64, size),
    );
    out.fixed(
        HostMetric::DiskTotalAvailablePercent,
        percent(totals.available_bytes as f64, size),
    );

    let partition = |mount: &str| LabelSet::new().with("partition", mount);
    out.family(
        HostMetric::DiskUsagePercent,
        usage
            .partitions
            .iter()
            .map(|p| (partition(&p.mount), p.use_percent)),
    );
    out.family(
        HostMetric::DiskSizeBytes,
        usage
            .partitions
            .iter()
            .map(|p| (partition(&p.mount), p.size_bytes as f64)),
    );
    out.family(
        HostMetric::DiskUsedBytes,
        usage
            .partitions
            .iter()
            .map(|p| (partition(&p.mount), p.used_bytes as f64)),
    );
    out.family(
        HostMetric::DiskAvailableBytes,
        usage
            .partitions
            .iter()
            .map(|p| (partition(&p.mount), p.available_bytes as f64)),
    );
}

fn emit_disk_io(out: &mut Emitter<'_>, devices: &[DiskIo]) {
    out.family(
        HostMetric::DiskPerformance,
        devices.iter().flat_map(|d| {
            [
                ("readbytes", d.read_bytes),
                ("readiops", d.read_ops),
                ("writebytes", d.write_bytes),
                ("writeiops", d.write_ops),
            ]
            .map(|(activity, value)| {
                (
                    LabelSet::new()
                        .with("device", d.device.as_str())
                        .with("activity", activity),
                    value as f64,
                )
            })
        }),
    );
}

fn emit_network_totals(out: &mut Emitter<'_>, interfaces: &[InterfaceIo]) {
    out.family(
        HostMetric::Network,
        interfaces.iter().flat_map(|i| {
            [
                (network_labels(&i.interface, "in", "bps"), i.rx_bytes as f64 * 8.0),
                (network_labels(&i.interface, "in", "pps"), i.rx_packets as f64),
                (network_labels(&i.interface, "out", "bps"), i.tx_bytes as f64 * 8.0),
                (network_labels(&i.interface, "out", "pps"), i.tx_packets as f64),
            ]
        }),
    );
}

fn network_labels(interface: &str, direction: &str, metric: &str) -> LabelSet {
    LabelSet::new()
        .with("interface", interface)
        .with("direction", direction)
        .with("metric", metric)
}

fn emit_connections(out: &mut Emitter<'_>, table: &ConnectionTable) {
    out.family(
        HostMetric::Netstat,
        table.iter().map(|(port, state, count)| {
            (
                LabelSet::new().with("port", port).with("state", state),
                count as f64,
            )
        }),
    );
}
