//! Source readers: fetch raw text, bound it with a timeout, parse it.

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::{CollectionConfig, CommandConfig, MountFilter};
use crate::error::{Result, SourceError, SourceKind};
use crate::parser::{
    self, ConnectionTable, CpuTimes, DiskIo, DiskUsage, InterfaceIo, LoadAverage, MemInfo,
};
use crate::source::TextSource;

/// Parsed output of one cycle. A `None` field means the source was disabled
/// or failed; [`RawSamples::status`] tells the two apart.
#[derive(Debug, Clone, Default)]
pub struct RawSamples {
    pub uptime: Option<f64>,
    pub load: Option<LoadAverage>,
    pub cpu: Option<CpuTimes>,
    pub memory: Option<MemInfo>,
    pub disk_usage: Option<DiskUsage>,
    pub disk_io: Option<Vec<DiskIo>>,
    pub network: Option<Vec<InterfaceIo>>,
    pub connections: Option<ConnectionTable>,
    /// Read outcome of every enabled source.
    pub status: BTreeMap<SourceKind, bool>,
}

impl RawSamples {
    pub fn succeeded(&self) -> usize {
        self.status.values().filter(|ok| **ok).count()
    }

    pub fn failed(&self) -> usize {
        self.status.values().filter(|ok| !**ok).count()
    }
}

/// Reads every configured source through a [`TextSource`].
pub struct SourceReaders<S> {
    source: S,
    config: CollectionConfig,
    mount_filter: MountFilter,
}

impl<S: TextSource> SourceReaders<S> {
    pub fn new(source: S, config: CollectionConfig) -> Self {
        let mount_filter = config.disk.filter();
        Self {
            source,
            config,
            mount_filter,
        }
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Read all enabled sources one after another.
    ///
    /// Failures are logged and isolated; the remaining sources are still read.
    pub async fn read_all(&self) -> RawSamples {
        let collect = &self.config.collect;
        let mut samples = RawSamples::default();

        samples.uptime = settle(
            &mut samples.status,
            SourceKind::Uptime,
            gated(collect.uptime, self.read_uptime()).await,
        );
        samples.load = settle(
            &mut samples.status,
            SourceKind::Load,
            gated(collect.load, self.read_load()).await,
        );
        samples.cpu = settle(
            &mut samples.status,
            SourceKind::Cpu,
            gated(collect.cpu, self.read_cpu()).await,
        );
        samples.memory = settle(
            &mut samples.status,
            SourceKind::Memory,
            gated(collect.memory, self.read_memory()).await,
        );
        samples.disk_usage = settle(
            &mut samples.status,
            SourceKind::DiskUsage,
            gated(collect.disk_usage, self.read_disk_usage()).await,
        );
        samples.disk_io = settle(
            &mut samples.status,
            SourceKind::DiskIo,
            gated(collect.disk_io, self.read_disk_io()).await,
        );
        samples.network = settle(
            &mut samples.status,
            SourceKind::Network,
            gated(collect.network, self.read_network()).await,
        );
        samples.connections = settle(
            &mut samples.status,
            SourceKind::Connections,
            gated(collect.connections, self.read_connections()).await,
        );

        debug!(
            ok = samples.succeeded(),
            failed = samples.failed(),
            "Sources read"
        );

        samples
    }

    pub async fn read_uptime(&self) -> Result<f64> {
        let content = self.fetch_file(SourceKind::Uptime, "uptime").await?;
        parser::parse_uptime(&content)
    }

    pub async fn read_load(&self) -> Result<LoadAverage> {
        let content = self.fetch_file(SourceKind::Load, "loadavg").await?;
        parser::parse_loadavg(&content)
    }

    pub async fn read_cpu(&self) -> Result<CpuTimes> {
        let content = self.fetch_file(SourceKind::Cpu, "stat").await?;
        parser::parse_cpu_stat(&content)
    }

    pub async fn read_memory(&self) -> Result<MemInfo> {
        let content = self.fetch_file(SourceKind::Memory, "meminfo").await?;
        parser::parse_meminfo(&content)
    }

    pub async fn read_disk_usage(&self) -> Result<DiskUsage> {
        let output = self
            .fetch_command(SourceKind::DiskUsage, &self.config.commands.df)
            .await?;
        parser::parse_df(&output, &self.mount_filter)
    }

    pub async fn read_disk_io(&self) -> Result<Vec<DiskIo>> {
        let content = self.fetch_file(SourceKind::DiskIo, "diskstats").await?;
        parser::parse_diskstats(&content, &self.config.disk_io)
    }

    pub async fn read_network(&self) -> Result<Vec<InterfaceIo>> {
        let content = self.fetch_file(SourceKind::Network, "net/dev").await?;
        parser::parse_net_dev(&content, &self.config.network)
    }

    pub async fn read_connections(&self) -> Result<ConnectionTable> {
        let output = self
            .fetch_command(SourceKind::Connections, &self.config.commands.netstat)
            .await?;
        parser::parse_netstat(&output)
    }

    async fn fetch_file(&self, kind: SourceKind, relative: &str) -> Result<String> {
        let path = self.config.proc_root.join(relative);
        bounded(kind, self.config.source_timeout(), self.source.read_file(&path)).await
    }

    async fn fetch_command(&self, kind: SourceKind, command: &CommandConfig) -> Result<String> {
        bounded(
            kind,
            self.config.source_timeout(),
            self.source.run_command(&command.program, &command.args),
        )
        .await
    }
}

/// Await a raw fetch, mapping I/O failures and expiry to [`SourceError`].
async fn bounded<F>(kind: SourceKind, after: Duration, fetch: F) -> Result<String>
where
    F: Future<Output = std::io::Result<String>>,
{
    match tokio::time::timeout(after, fetch).await {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(error)) => Err(SourceError::Unavailable { kind, error }),
        Err(_) => Err(SourceError::Timeout { kind, after }),
    }
}

/// Run `read` only when the source is enabled.
async fn gated<T>(enabled: bool, read: impl Future<Output = Result<T>>) -> Option<Result<T>> {
    if enabled { Some(read.await) } else { None }
}

/// Record the outcome of one source and keep its value on success.
fn settle<T>(
    status: &mut BTreeMap<SourceKind, bool>,
    kind: SourceKind,
    outcome: Option<Result<T>>,
) -> Option<T> {
    match outcome? {
        Ok(value) => {
            status.insert(kind, true);
            Some(value)
        }
        Err(e) => {
            warn!(source = %kind, error = %e, "Source read failed");
            status.insert(kind, false);
            None
        }
    }
}
