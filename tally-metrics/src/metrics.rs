use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::error::{Error, Result};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
}

/// Latency buckets in seconds, ending in `+Inf`.
pub const DEFAULT_BUCKETS: [f64; 15] = [
    0.005,
    0.01,
    0.025,
    0.05,
    0.075,
    0.1,
    0.25,
    0.5,
    0.75,
    1.0,
    2.5,
    5.0,
    7.5,
    10.0,
    f64::INFINITY,
];

/// `count` buckets starting at `start`, each `width` apart.
pub fn linear_buckets(start: f64, width: f64, count: usize) -> Result<Vec<f64>> {
    if count == 0 {
        return Err(Error::InvalidBuckets("bucket count must be positive"));
    }
    if width.is_nan() || width <= 0.0 {
        return Err(Error::InvalidBuckets("bucket width must be positive"));
    }
    validate_buckets(&(0..count).map(|i| start + width * i as f64).collect::<Vec<_>>())
}

/// `count` buckets starting at `start`, each `factor` times the previous one.
pub fn exponential_buckets(start: f64, factor: f64, count: usize) -> Result<Vec<f64>> {
    if count == 0 {
        return Err(Error::InvalidBuckets("bucket count must be positive"));
    }
    if start.is_nan() || start <= 0.0 {
        return Err(Error::InvalidBuckets("bucket start must be positive"));
    }
    if factor.is_nan() || factor <= 1.0 {
        return Err(Error::InvalidBuckets("bucket factor must be greater than 1"));
    }
    validate_buckets(
        &(0..count)
            .map(|i| start * factor.powi(i as i32))
            .collect::<Vec<_>>(),
    )
}

/// Checks that bounds are finite and strictly increasing and appends the
/// `+Inf` bucket when it is missing.
pub fn validate_buckets(bounds: &[f64]) -> Result<Vec<f64>> {
    let Some((&last, init)) = bounds.split_last() else {
        return Err(Error::InvalidBuckets("at least one bucket is required"));
    };

    let finite = if last == f64::INFINITY { init } else { bounds };
    if finite.iter().any(|b| !b.is_finite()) {
        return Err(Error::InvalidBuckets("bucket bounds must be finite"));
    }
    if finite.windows(2).any(|w| w[0] >= w[1]) {
        return Err(Error::InvalidBuckets(
            "bucket bounds must be strictly increasing",
        ));
    }

    let mut out = finite.to_vec();
    out.push(f64::INFINITY);
    Ok(out)
}

/// An `f64` stored as raw bits in an `AtomicU64`.
#[derive(Debug, Default)]
struct AtomicF64(AtomicU64);

impl AtomicF64 {
    fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }

    fn store(&self, v: f64) {
        self.0.store(v.to_bits(), Ordering::Release);
    }

    /// Adds `delta` in one CAS step. Returns `false` and leaves the value
    /// untouched when the sum would not be finite.
    fn try_add(&self, delta: f64) -> bool {
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                let next = f64::from_bits(bits) + delta;
                next.is_finite().then(|| next.to_bits())
            })
            .is_ok()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Counter(Arc<AtomicF64>);

impl Counter {
    pub fn inc(&self, delta: f64) -> Result<()> {
        if !delta.is_finite() {
            return Err(Error::invalid_value(
                MetricKind::Counter,
                delta,
                "value must be finite",
            ));
        }
        if delta < 0.0 {
            return Err(Error::invalid_value(
                MetricKind::Counter,
                delta,
                "counters can only increase",
            ));
        }
        if self.0.try_add(delta) {
            Ok(())
        } else {
            Err(Error::invalid_value(
                MetricKind::Counter,
                delta,
                "counter would overflow",
            ))
        }
    }

    pub fn get(&self) -> f64 {
        self.0.load()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Gauge(Arc<AtomicF64>);

impl Gauge {
    pub fn set(&self, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(Error::invalid_value(
                MetricKind::Gauge,
                value,
                "value must be finite",
            ));
        }
        self.0.store(value);
        Ok(())
    }

    pub fn add(&self, delta: f64) -> Result<()> {
        if !delta.is_finite() {
            return Err(Error::invalid_value(
                MetricKind::Gauge,
                delta,
                "value must be finite",
            ));
        }
        if self.0.try_add(delta) {
            Ok(())
        } else {
            Err(Error::invalid_value(
                MetricKind::Gauge,
                delta,
                "gauge would overflow",
            ))
        }
    }

    pub fn sub(&self, delta: f64) -> Result<()> {
        self.add(-delta)
    }

    pub fn get(&self) -> f64 {
        self.0.load()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSnapshot {
    /// `(upper bound, cumulative count)` per bucket, ending in `+Inf`.
    pub buckets: Vec<(f64, u64)>,
    pub sum: f64,
    pub count: u64,
}

#[derive(Debug)]
struct HistogramState {
    cumulative: Vec<u64>,
    sum: f64,
    count: u64,
}

#[derive(Debug)]
struct HistogramCore {
    bounds: Arc<[f64]>,
    state: Mutex<HistogramState>,
}

#[derive(Debug, Clone)]
pub struct Histogram(Arc<HistogramCore>);

impl Histogram {
    /// `bounds` must already be validated (see [`validate_buckets`]).
    pub(crate) fn with_bounds(bounds: Arc<[f64]>) -> Self {
        let state = HistogramState {
            cumulative: vec![0; bounds.len()],
            sum: 0.0,
            count: 0,
        };
        Self(Arc::new(HistogramCore {
            bounds,
            state: Mutex::new(state),
        }))
    }

    pub fn observe(&self, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(Error::invalid_value(
                MetricKind::Histogram,
                value,
                "value must be finite",
            ));
        }

        // Bounds are sorted, so every bucket from the first match onwards
        // covers the value.
        let first = self.0.bounds.partition_point(|b| *b < value);
        let mut state = self.0.state.lock();
        let sum = state.sum + value;
        if !sum.is_finite() {
            return Err(Error::invalid_value(
                MetricKind::Histogram,
                value,
                "histogram sum would overflow",
            ));
        }
        for c in &mut state.cumulative[first..] {
            *c += 1;
        }
        state.sum = sum;
        state.count += 1;
        Ok(())
    }

    pub fn start_timer(&self) -> HistogramTimer {
        HistogramTimer {
            histogram: self.clone(),
            start: Instant::now(),
            observed: false,
        }
    }

    pub fn bounds(&self) -> &[f64] {
        &self.0.bounds
    }

    pub fn snapshot(&self) -> HistogramSnapshot {
        let state = self.0.state.lock();
        HistogramSnapshot {
            buckets: self
                .0
                .bounds
                .iter()
                .copied()
                .zip(state.cumulative.iter().copied())
                .collect(),
            sum: state.sum,
            count: state.count,
        }
    }
}

/// Observes the elapsed time in seconds once, either explicitly or on drop.
#[derive(Debug)]
#[must_use = "dropping the timer immediately records a near-zero duration"]
pub struct HistogramTimer {
    histogram: Histogram,
    start: Instant,
    observed: bool,
}

impl HistogramTimer {
    /// Records the elapsed time and returns it in seconds.
    pub fn observe_duration(mut self) -> f64 {
        self.record()
    }

    pub fn stop_and_discard(mut self) {
        self.observed = true;
    }

    fn record(&mut self) -> f64 {
        let secs = self.start.elapsed().as_secs_f64();
        if !self.observed {
            self.observed = true;
            // Elapsed time is always finite.
            let _ = self.histogram.observe(secs);
        }
        secs
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        if !self.observed {
            self.record();
        }
    }
}

/// Write access to a single series.
#[derive(Debug, Clone)]
pub enum MetricHandle {
    Counter(Counter),
    Gauge(Gauge),
    Histogram(Histogram),
}

impl MetricHandle {
    pub(crate) fn new(kind: MetricKind, bounds: &Arc<[f64]>) -> Self {
        match kind {
            MetricKind::Counter => Self::Counter(Counter::default()),
            MetricKind::Gauge => Self::Gauge(Gauge::default()),
            MetricKind::Histogram => Self::Histogram(Histogram::with_bounds(bounds.clone())),
        }
    }

    pub fn kind(&self) -> MetricKind {
        match self {
            Self::Counter(_) => MetricKind::Counter,
            Self::Gauge(_) => MetricKind::Gauge,
            Self::Histogram(_) => MetricKind::Histogram,
        }
    }

    fn mismatch(&self, expected: MetricKind) -> Error {
        Error::KindMismatch {
            expected,
            actual: self.kind(),
        }
    }

    pub fn as_counter(&self) -> Result<&Counter> {
        match self {
            Self::Counter(c) => Ok(c),
            _ => Err(self.mismatch(MetricKind::Counter)),
        }
    }

    pub fn as_gauge(&self) -> Result<&Gauge> {
        match self {
            Self::Gauge(g) => Ok(g),
            _ => Err(self.mismatch(MetricKind::Gauge)),
        }
    }

    pub fn as_histogram(&self) -> Result<&Histogram> {
        match self {
            Self::Histogram(h) => Ok(h),
            _ => Err(self.mismatch(MetricKind::Histogram)),
        }
    }

    #[inline]
    pub fn inc(&self, delta: f64) -> Result<()> {
        self.as_counter()?.inc(delta)
    }

    #[inline]
    pub fn set(&self, value: f64) -> Result<()> {
        self.as_gauge()?.set(value)
    }

    #[inline]
    pub fn observe(&self, value: f64) -> Result<()> {
        self.as_histogram()?.observe(value)
    }

    /// Reads the current value in one atomic step.
    pub fn value(&self) -> MetricValue {
        match self {
            Self::Counter(c) => MetricValue::Counter(c.get()),
            Self::Gauge(g) => MetricValue::Gauge(g.get()),
            Self::Histogram(h) => MetricValue::Histogram(h.snapshot()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Counter(f64),
    Gauge(f64),
    Histogram(HistogramSnapshot),
}
