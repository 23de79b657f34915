//! Metric registry: the current value of every exported series.
//!
//! The scheduler writes one [`CycleUpdate`] per cycle; HTTP handlers read
//! concurrently. All writes of a cycle happen under a single write lock, so a
//! scrape sees either the previous cycle or the new one for every family.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::sync::Arc;

use hostsight_common::{CycleUpdate, HostMetric, LabelSet, MetricPoint, SeriesUpdate};
use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::mapping::{PrometheusType, metric_name, sanitize_label_name};

/// Rejected registry writes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    #[error("label keys {found:?} of {name} do not match schema {expected:?}")]
    LabelSchema {
        name: String,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("{name} is declared as a {declared} metric, got a {requested} update")]
    KindMismatch {
        name: String,
        declared: &'static str,
        requested: &'static str,
    },
}

/// Declared shape of one metric.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricDesc {
    pub name: String,
    pub help: String,
    pub metric_type: PrometheusType,
    /// Sorted label keys; empty for a fixed-cardinality metric.
    pub label_keys: Vec<String>,
}

impl MetricDesc {
    pub fn new(
        name: impl Into<String>,
        help: impl Into<String>,
        metric_type: PrometheusType,
        label_keys: &[&str],
    ) -> Self {
        let mut label_keys: Vec<String> = label_keys.iter().map(|k| k.to_string()).collect();
        label_keys.sort();
        Self {
            name: name.into(),
            help: help.into(),
            metric_type,
            label_keys,
        }
    }

    /// Descriptor of a catalog metric.
    pub fn from_catalog(prefix: &str, metric: HostMetric) -> Self {
        Self::new(
            metric_name(prefix, metric),
            metric.help(),
            PrometheusType::for_metric(metric),
            metric.label_keys(),
        )
    }

    fn is_fixed(&self) -> bool {
        self.label_keys.is_empty()
    }
}

#[derive(Debug, Clone)]
enum Series {
    Fixed(Option<f64>),
    Labeled(BTreeMap<LabelSet, f64>),
}

impl Series {
    fn kind(&self) -> &'static str {
        match self {
            Series::Fixed(_) => "fixed",
            Series::Labeled(_) => "labeled",
        }
    }

    fn len(&self) -> usize {
        match self {
            Series::Fixed(value) => usize::from(value.is_some()),
            Series::Labeled(series) => series.len(),
        }
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
struct Family {
    desc: MetricDesc,
    series: Series,
    /// Epoch ms of the cycle that last wrote this family.
    timestamp: i64,
}

impl Family {
    fn new(desc: MetricDesc) -> Self {
        let series = if desc.is_fixed() {
            Series::Fixed(None)
        } else {
            Series::Labeled(BTreeMap::new())
        };
        Self {
            desc,
            series,
            timestamp: 0,
        }
    }
}

/// Registry statistics.
#[derive(Debug, Clone, Default)]
pub struct RegistryStats {
    /// Cycle updates applied.
    pub cycles_applied: u64,
    /// Fixed metrics overwritten.
    pub fixed_updates: u64,
    /// Label families replaced.
    pub families_replaced: u64,
    /// Updates rejected by schema or kind checks.
    pub updates_rejected: u64,
    /// Values dropped by the builder as negative or non-finite.
    pub points_dropped: u64,
}

/// Outcome of [`MetricRegistry::apply`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyOutcome {
    pub applied: usize,
    pub rejected: Vec<RegistryError>,
}

/// Thread-safe metric registry.
pub struct MetricRegistry {
    families: RwLock<BTreeMap<String, Family>>,
    /// Extra labels rendered on every series, sanitized.
    default_labels: Vec<(String, String)>,
    stats: RwLock<RegistryStats>,
}

impl MetricRegistry {
    pub fn new(default_labels: &HashMap<String, String>) -> Self {
        let mut default_labels: Vec<(String, String)> = default_labels
            .iter()
            .map(|(k, v)| (sanitize_label_name(k), v.clone()))
            .collect();
        default_labels.sort();

        Self {
            families: RwLock::new(BTreeMap::new()),
            default_labels,
            stats: RwLock::new(RegistryStats::default()),
        }
    }

    /// Registry with every catalog metric declared under `prefix`.
    pub fn with_catalog(prefix: &str, default_labels: &HashMap<String, String>) -> Self {
        let registry = Self::new(default_labels);
        for metric in HostMetric::ALL {
            registry.declare(MetricDesc::from_catalog(prefix, metric));
        }
        registry
    }

    /// Register a metric. Re-declaring replaces the descriptor and clears its values.
    pub fn declare(&self, desc: MetricDesc) {
        trace!(name = %desc.name, keys = ?desc.label_keys, "Declaring metric");
        self.families
            .write()
            .insert(desc.name.clone(), Family::new(desc));
    }

    /// Overwrite the single point of a fixed metric.
    ///
    /// An undeclared name is declared on the fly without help text.
    pub fn set_fixed(&self, name: &str, value: f64, timestamp: i64) -> Result<(), RegistryError> {
        let result = set_fixed_locked(&mut self.families.write(), name, value, timestamp);
        self.count(&result);
        result
    }

    /// Swap the full set of series of a labeled metric.
    ///
    /// Series absent from `series` are removed. Returns the number of series
    /// now held. An undeclared name takes its schema from the first entry.
    pub fn replace_family(
        &self,
        name: &str,
        series: BTreeMap<LabelSet, f64>,
        timestamp: i64,
    ) -> Result<usize, RegistryError> {
        let result = replace_family_locked(&mut self.families.write(), name, series, timestamp);
        self.count(&result);
        result
    }

    /// Apply a whole cycle under one write lock.
    ///
    /// A rejected family is logged and left untouched; the rest still apply.
    pub fn apply(&self, update: CycleUpdate) -> ApplyOutcome {
        let mut outcome = ApplyOutcome::default();
        let mut fixed = 0;
        let mut replaced = 0;

        {
            let mut families = self.families.write();
            for family in update.families {
                let result = match family.series {
                    SeriesUpdate::Fixed(value) => {
                        set_fixed_locked(&mut families, &family.name, value, update.timestamp)
                            .map(|_| fixed += 1)
                    }
                    SeriesUpdate::Family(series) => replace_family_locked(
                        &mut families,
                        &family.name,
                        series,
                        update.timestamp,
                    )
                    .map(|_| replaced += 1),
                };

                match result {
                    Ok(()) => outcome.applied += 1,
                    Err(e) => {
                        warn!(error = %e, "Registry update rejected");
                        outcome.rejected.push(e);
                    }
                }
            }
        }

        let mut stats = self.stats.write();
        stats.cycles_applied += 1;
        stats.fixed_updates += fixed;
        stats.families_replaced += replaced;
        stats.updates_rejected += outcome.rejected.len() as u64;

        debug!(
            applied = outcome.applied,
            rejected = outcome.rejected.len(),
            "Cycle applied"
        );

        outcome
    }

    /// Count values the builder dropped before they reached the registry.
    pub fn record_dropped(&self, dropped: usize) {
        if dropped > 0 {
            self.stats.write().points_dropped += dropped as u64;
        }
    }

    /// Current value of one series.
    pub fn get(&self, name: &str, labels: &LabelSet) -> Option<f64> {
        let families = self.families.read();
        match &families.get(name)?.series {
            Series::Fixed(value) if labels.is_empty() => *value,
            Series::Fixed(_) => None,
            Series::Labeled(series) => series.get(labels).copied(),
        }
    }

    /// Every current point, sorted by name then labels.
    ///
    /// Default labels are an exposition concern and are not included.
    pub fn snapshot(&self) -> Vec<MetricPoint> {
        let families = self.families.read();
        let mut points = Vec::with_capacity(families.len());

        for (name, family) in families.iter() {
            match &family.series {
                Series::Fixed(Some(value)) => points.push(MetricPoint {
                    name: name.clone(),
                    labels: LabelSet::new(),
                    value: *value,
                    timestamp: family.timestamp,
                }),
                Series::Fixed(None) => {}
                Series::Labeled(series) => {
                    points.extend(series.iter().map(|(labels, value)| MetricPoint {
                        name: name.clone(),
                        labels: labels.clone(),
                        value: *value,
                        timestamp: family.timestamp,
                    }))
                }
            }
        }

        points
    }

    /// Number of series currently held.
    pub fn series_count(&self) -> usize {
        self.families.read().values().map(|f| f.series.len()).sum()
    }

    /// Number of declared metric names.
    pub fn family_count(&self) -> usize {
        self.families.read().len()
    }

    pub fn stats(&self) -> RegistryStats {
        self.stats.read().clone()
    }

    /// Render metrics in Prometheus exposition format.
    pub fn render(&self) -> String {
        let families = self.families.read();
        let mut output = Vec::with_capacity(families.len() * 128);

        for (name, family) in families.iter() {
            if family.series.is_empty() {
                continue;
            }

            if !family.desc.help.is_empty() {
                writeln!(output, "# HELP {} {}", name, escape_help(&family.desc.help)).ok();
            }
            writeln!(output, "# TYPE {} {}", name, family.desc.metric_type.as_str()).ok();

            match &family.series {
                Series::Fixed(Some(value)) => {
                    writeln!(
                        output,
                        "{}{} {}",
                        name,
                        self.format_labels(&LabelSet::new()),
                        format_value(*value)
                    )
                    .ok();
                }
                Series::Fixed(None) => {}
                Series::Labeled(series) => {
                    for (labels, value) in series {
                        writeln!(
                            output,
                            "{}{} {}",
                            name,
                            self.format_labels(labels),
                            format_value(*value)
                        )
                        .ok();
                    }
                }
            }
        }

        String::from_utf8(output).unwrap_or_default()
    }

    /// Series labels merged with the default labels, which never override.
    fn format_labels(&self, labels: &LabelSet) -> String {
        let mut merged = labels.clone();
        for (k, v) in &self.default_labels {
            if merged.get(k).is_none() {
                merged.insert(k.as_str(), v.as_str());
            }
        }
        format_labels(&merged)
    }

    fn count<T>(&self, result: &Result<T, RegistryError>) {
        if let Err(e) = result {
            warn!(error = %e, "Registry update rejected");
            self.stats.write().updates_rejected += 1;
        }
    }
}

/// Create a shareable registry handle.
pub type SharedRegistry = Arc<MetricRegistry>;

fn set_fixed_locked(
    families: &mut BTreeMap<String, Family>,
    name: &str,
    value: f64,
    timestamp: i64,
) -> Result<(), RegistryError> {
    let family = families.entry(name.to_string()).or_insert_with(|| {
        Family::new(MetricDesc::new(name, "", PrometheusType::Gauge, &[]))
    });

    match &mut family.series {
        Series::Fixed(slot) => {
            *slot = Some(value);
            family.timestamp = timestamp;
            Ok(())
        }
        other => Err(RegistryError::KindMismatch {
            name: name.to_string(),
            declared: other.kind(),
            requested: "fixed",
        }),
    }
}

fn replace_family_locked(
    families: &mut BTreeMap<String, Family>,
    name: &str,
    series: BTreeMap<LabelSet, f64>,
    timestamp: i64,
) -> Result<usize, RegistryError> {
    let family = families.entry(name.to_string()).or_insert_with(|| {
        let keys: Vec<&str> = series
            .keys()
            .next()
            .map(|labels| labels.keys().collect())
            .unwrap_or_default();
        Family {
            desc: MetricDesc::new(name, "", PrometheusType::Gauge, &keys),
            series: Series::Labeled(BTreeMap::new()),
            timestamp: 0,
        }
    });

    let declared = family.series.kind();
    let Series::Labeled(current) = &mut family.series else {
        return Err(RegistryError::KindMismatch {
            name: name.to_string(),
            declared,
            requested: "labeled",
        });
    };

    // A family declared without keys adopts those of its first entry
    if family.desc.label_keys.is_empty()
        && let Some(labels) = series.keys().next()
    {
        family.desc.label_keys = labels.keys().map(str::to_string).collect();
    }

    let expected = &family.desc.label_keys;
    if let Some(bad) = series
        .keys()
        .find(|labels| !labels.keys().eq(expected.iter().map(String::as_str)))
    {
        return Err(RegistryError::LabelSchema {
            name: name.to_string(),
            expected: expected.clone(),
            found: bad.keys().map(str::to_string).collect(),
        });
    }

    *current = series;
    family.timestamp = timestamp;
    Ok(current.len())
}

/// Escape special characters in label values.
fn escape_label_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            _ => result.push(c),
        }
    }
    result
}

/// Escape help text (backslash and newline only).
fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Format a floating point value for Prometheus.
fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            "+Inf".to_string()
        } else {
            "-Inf".to_string()
        }
    } else if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}

/// Format labels for Prometheus exposition format.
fn format_labels(labels: &LabelSet) -> String {
    if labels.is_empty() {
        return String::new();
    }

    let parts: Vec<String> = labels
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label_value(v)))
        .collect();

    format!("{{{}}}", parts.join(","))
}
