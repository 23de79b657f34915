use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::BTreeMap;

/// A set of label key/value pairs, kept sorted by key.
///
/// Keys are unique; inserting an existing key replaces its value. The sorted
/// order makes rendering and hashing deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LabelSet(Vec<(String, String)>);

impl LabelSet {
    /// Create an empty label set.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Build a label set from key/value pairs.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        pairs
            .into_iter()
            .fold(Self::new(), |set, (k, v)| set.with(k, v))
    }

    /// Add or replace a label.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a label, replacing any existing value for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.binary_search_by(|(k, _)| k.as_str().cmp(&key)) {
            Ok(idx) => self.0[idx].1 = value,
            Err(idx) => self.0.insert(idx, (key, value)),
        }
    }

    /// Look up a label value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .binary_search_by(|(k, _)| k.as_str().cmp(key))
            .ok()
            .map(|idx| self.0[idx].1.as_str())
    }

    /// Label keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    /// Iterate over `(key, value)` pairs in sorted key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for LabelSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// A single exported sample: one series of one metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricPoint {
    /// Full metric name (prefix included).
    pub name: String,

    /// Series labels.
    #[serde(skip_serializing_if = "LabelSet::is_empty")]
    pub labels: LabelSet,

    /// Current value.
    pub value: f64,

    /// Unix epoch milliseconds of the cycle that produced the value.
    pub timestamp: i64,
}

/// New contents for one metric in a cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesUpdate {
    /// Overwrite the single point of a fixed-cardinality metric.
    Fixed(f64),
    /// Replace every series of a dynamic-cardinality metric.
    Family(BTreeMap<LabelSet, f64>),
}

/// Update for a single metric name.
#[derive(Debug, Clone, PartialEq)]
pub struct FamilyUpdate {
    pub name: String,
    pub series: SeriesUpdate,
}

/// Everything one collection cycle wants written to the registry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleUpdate {
    /// Unix epoch milliseconds when the cycle started.
    pub timestamp: i64,
    pub families: Vec<FamilyUpdate>,
}

impl CycleUpdate {
    pub fn new(timestamp: i64) -> Self {
        Self {
            timestamp,
            families: Vec::new(),
        }
    }

    /// Queue an overwrite of a fixed metric.
    pub fn set_fixed(&mut self, name: impl Into<String>, value: f64) {
        self.families.push(FamilyUpdate {
            name: name.into(),
            series: SeriesUpdate::Fixed(value),
        });
    }

    /// Queue a full replacement of a label family.
    pub fn replace_family(&mut self, name: impl Into<String>, series: BTreeMap<LabelSet, f64>) {
        self.families.push(FamilyUpdate {
            name: name.into(),
            series: SeriesUpdate::Family(series),
        });
    }

    /// Find the queued update for a metric name.
    pub fn get(&self, name: &str) -> Option<&SeriesUpdate> {
        self.families
            .iter()
            .find(|f| f.name == name)
            .map(|f| &f.series)
    }

    pub fn len(&self) -> usize {
        self.families.len()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }
}
