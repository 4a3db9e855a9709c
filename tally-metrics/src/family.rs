use ahash::AHashMap;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::key::Interner;
use crate::labels::{LabelPairs, LabelSet, normalize_labels};
use crate::metrics::{Counter, Gauge, Histogram, MetricHandle, MetricKind};
use crate::names::BUCKET_LABEL;
use crate::snapshot::{FamilySnapshot, SeriesSnapshot};

/// All label variants of one named metric.
#[derive(Debug)]
pub struct MetricFamily {
    name: Arc<str>,
    help: Arc<str>,
    kind: MetricKind,
    // Empty unless `kind` is histogram.
    buckets: Arc<[f64]>,
    max_series: Option<usize>,
    // Label strings of this family only, so series creation here never
    // blocks lookups in other families.
    interner: Interner,
    series: RwLock<AHashMap<LabelSet, MetricHandle>>,
}

impl MetricFamily {
    pub(crate) fn new(
        name: &str,
        help: &str,
        kind: MetricKind,
        buckets: Arc<[f64]>,
        max_series: Option<usize>,
    ) -> Self {
        Self {
            name: Arc::from(name),
            help: Arc::from(help),
            kind,
            buckets,
            max_series,
            interner: Interner::new(),
            series: RwLock::new(AHashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    /// Bucket upper bounds, ending in `+Inf`. Empty for counters and gauges.
    pub fn buckets(&self) -> &[f64] {
        &self.buckets
    }

    pub fn series_count(&self) -> usize {
        self.series.read().len()
    }

    pub(crate) fn same_definition(&self, help: &str, kind: MetricKind, buckets: &[f64]) -> bool {
        *self.help == *help && self.kind == kind && *self.buckets == *buckets
    }

    /// Returns the handle for `labels`, creating the series on first use.
    pub fn get_or_create(&self, labels: &[(&str, &str)]) -> Result<MetricHandle> {
        let labels = normalize_labels(labels)?;

        if let Some(set) = LabelSet::lookup(&self.interner, &labels)
            && let Some(handle) = self.series.read().get(&set)
        {
            return Ok(handle.clone());
        }

        self.create(&labels)
    }

    fn create(&self, labels: &LabelPairs<'_>) -> Result<MetricHandle> {
        if self.kind == MetricKind::Histogram && labels.iter().any(|(k, _)| *k == BUCKET_LABEL) {
            return Err(Error::InvalidLabel {
                name: BUCKET_LABEL.to_string(),
                reason: "reserved for histogram buckets",
            });
        }

        let mut series = self.series.write();

        // Check again under the write lock; strings are interned only once the
        // series is known to be admissible.
        if let Some(set) = LabelSet::lookup(&self.interner, labels)
            && let Some(handle) = series.get(&set)
        {
            return Ok(handle.clone());
        }

        if let Some(limit) = self.max_series
            && series.len() >= limit
        {
            tracing::warn!(metric = %self.name, limit, "series limit reached, dropping new label set");
            return Err(Error::CardinalityExceeded {
                name: self.name.to_string(),
                limit,
            });
        }

        let set = LabelSet::intern(&self.interner, labels);
        let handle = MetricHandle::new(self.kind, &self.buckets);
        series.insert(set, handle.clone());
        Ok(handle)
    }

    pub fn counter(&self, labels: &[(&str, &str)]) -> Result<Counter> {
        self.get_or_create(labels)?.as_counter().cloned()
    }

    pub fn gauge(&self, labels: &[(&str, &str)]) -> Result<Gauge> {
        self.get_or_create(labels)?.as_gauge().cloned()
    }

    pub fn histogram(&self, labels: &[(&str, &str)]) -> Result<Histogram> {
        self.get_or_create(labels)?.as_histogram().cloned()
    }

    /// Copies the current value of every series.
    ///
    /// The series lock is only held while handles are cloned; values are read
    /// afterwards, one atomic read per handle.
    pub(crate) fn snapshot(&self) -> FamilySnapshot {
        let handles: Vec<(LabelSet, MetricHandle)> = self
            .series
            .read()
            .iter()
            .map(|(set, handle)| (set.clone(), handle.clone()))
            .collect();

        let mut series: Vec<SeriesSnapshot> = handles
            .into_iter()
            .map(|(set, handle)| SeriesSnapshot {
                labels: set.resolve(&self.interner),
                value: handle.value(),
            })
            .collect();
        series.sort_by(|a, b| a.labels.cmp(&b.labels));

        FamilySnapshot {
            name: self.name.to_string(),
            help: self.help.to_string(),
            kind: self.kind,
            series,
        }
    }
}
