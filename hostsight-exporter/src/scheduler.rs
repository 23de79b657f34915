//! Collection scheduler: one cycle per interval, never overlapping.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use hostsight_collector::{CollectionConfig, SampleBuilder, SourceReaders, TextSource};
use hostsight_common::{HostMetric, LabelSet};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::mapping::sanitize_metric_name;
use crate::registry::SharedRegistry;

/// What the scheduler is doing right now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SchedulerState {
    #[default]
    Idle,
    Collecting,
}

/// Published after every state change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStatus {
    pub state: SchedulerState,
    /// Cycles completed since start.
    pub cycles: u64,
}

impl SchedulerStatus {
    /// At least one cycle has reached the registry.
    pub fn is_ready(&self) -> bool {
        self.cycles > 0
    }
}

/// Summary of one cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    pub cycle: u64,
    pub duration: Duration,
    pub sources_ok: usize,
    pub sources_failed: usize,
    pub families_applied: usize,
    pub families_rejected: usize,
    pub points_dropped: usize,
}

/// Drives the readers, the builder and the registry.
pub struct Scheduler<S> {
    readers: SourceReaders<S>,
    builder: SampleBuilder,
    registry: SharedRegistry,
    prefix: String,
    interval: Duration,
    cycles: u64,
    status: watch::Sender<SchedulerStatus>,
}

impl<S: TextSource> Scheduler<S> {
    pub fn new(
        source: S,
        collection: CollectionConfig,
        prefix: &str,
        registry: SharedRegistry,
    ) -> Self {
        let prefix = sanitize_metric_name(prefix);
        let builder = SampleBuilder::new(prefix.clone(), collection.counter_mode);
        let interval = collection.interval();
        let (status, _) = watch::channel(SchedulerStatus::default());

        Self {
            readers: SourceReaders::new(source, collection),
            builder,
            registry,
            prefix,
            interval,
            cycles: 0,
            status,
        }
    }

    /// Watch the scheduler state.
    pub fn subscribe(&self) -> watch::Receiver<SchedulerStatus> {
        self.status.subscribe()
    }

    pub fn readers_mut(&mut self) -> &mut SourceReaders<S> {
        &mut self.readers
    }

    /// Run cycles until the shutdown signal is received.
    ///
    /// The first cycle starts immediately. A cycle that overruns the interval
    /// delays the next tick instead of bunching up missed ones.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_secs = self.interval.as_secs(),
            prefix = %self.prefix,
            "Starting collection scheduler"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_cycle().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!(cycles = self.cycles, "Collection scheduler stopped");
    }

    /// Run a single cycle: read, build, apply.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let started = Instant::now();
        let timestamp = chrono::Utc::now().timestamp_millis();
        self.status
            .send_modify(|s| s.state = SchedulerState::Collecting);

        let samples = self.readers.read_all().await;
        let mut update = self.builder.build(&samples, timestamp);
        let points_dropped = self.builder.last_dropped();

        let source_up: BTreeMap<LabelSet, f64> = samples
            .status
            .iter()
            .map(|(kind, ok)| {
                (
                    LabelSet::new().with("source", kind.as_str()),
                    if *ok { 1.0 } else { 0.0 },
                )
            })
            .collect();
        update.replace_family(self.name(HostMetric::ExporterSourceUp), source_up);
        update.set_fixed(self.name(HostMetric::ExporterCycles), (self.cycles + 1) as f64);
        update.set_fixed(
            self.name(HostMetric::ExporterCycleDuration),
            started.elapsed().as_secs_f64(),
        );

        let outcome = self.registry.apply(update);
        self.registry.record_dropped(points_dropped);
        // Counted after the cycle landed
        self.registry
            .set_fixed(
                &self.name(HostMetric::ExporterSeries),
                self.registry.series_count() as f64,
                timestamp,
            )
            .ok();

        self.cycles += 1;
        let cycles = self.cycles;
        self.status.send_modify(|s| {
            s.state = SchedulerState::Idle;
            s.cycles = cycles;
        });

        let report = CycleReport {
            cycle: self.cycles,
            duration: started.elapsed(),
            sources_ok: samples.succeeded(),
            sources_failed: samples.failed(),
            families_applied: outcome.applied,
            families_rejected: outcome.rejected.len(),
            points_dropped,
        };

        debug!(
            cycle = report.cycle,
            duration_ms = report.duration.as_millis() as u64,
            sources_ok = report.sources_ok,
            sources_failed = report.sources_failed,
            families = report.families_applied,
            "Collection cycle complete"
        );

        report
    }

    fn name(&self, metric: HostMetric) -> String {
        metric.name(&self.prefix)
    }
}
