use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::family::MetricFamily;
use crate::key::{Interner, KeyId};
use crate::metrics::{
    Counter, DEFAULT_BUCKETS, Gauge, Histogram, MetricHandle, MetricKind, validate_buckets,
};
use crate::names::validate_metric_name;
use crate::snapshot::Snapshot;

pub const DEFAULT_MAX_SERIES_PER_FAMILY: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Upper bound on label sets per family; `None` disables the limit.
    pub max_series_per_family: Option<usize>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_series_per_family: Some(DEFAULT_MAX_SERIES_PER_FAMILY),
        }
    }
}

/// Collection of metric families, keyed by name.
///
/// Lookups go through a sharded index and never touch the registration
/// order list, so producers on existing families do not contend with
/// registrations or snapshots.
#[derive(Debug, Default)]
pub struct Registry {
    config: RegistryConfig,
    // Family names only; label strings live in each family.
    interner: Interner,
    order: RwLock<Vec<Arc<MetricFamily>>>,
    families: DashMap<KeyId, Arc<MetricFamily>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> RegistryConfig {
        self.config
    }

    /// Registers a family. Histograms get [`DEFAULT_BUCKETS`].
    ///
    /// Repeating an identical definition returns the existing family.
    pub fn register(&self, name: &str, help: &str, kind: MetricKind) -> Result<Arc<MetricFamily>> {
        let buckets: &[f64] = match kind {
            MetricKind::Histogram => &DEFAULT_BUCKETS,
            MetricKind::Counter | MetricKind::Gauge => &[],
        };
        self.register_inner(name, help, kind, buckets)
    }

    pub fn register_histogram(
        &self,
        name: &str,
        help: &str,
        buckets: &[f64],
    ) -> Result<Arc<MetricFamily>> {
        let buckets = validate_buckets(buckets)?;
        self.register_inner(name, help, MetricKind::Histogram, &buckets)
    }

    fn register_inner(
        &self,
        name: &str,
        help: &str,
        kind: MetricKind,
        buckets: &[f64],
    ) -> Result<Arc<MetricFamily>> {
        validate_metric_name(name)?;

        let mut order = self.order.write();

        if let Some(existing) = self.family(name) {
            if existing.same_definition(help, kind, buckets) {
                return Ok(existing);
            }
            return Err(Error::DuplicateMetric {
                name: name.to_string(),
            });
        }

        let family = Arc::new(MetricFamily::new(
            name,
            help,
            kind,
            Arc::from(buckets),
            self.config.max_series_per_family,
        ));
        let id = self.interner.get_or_intern(name);
        self.families.insert(id, family.clone());
        order.push(family.clone());

        tracing::debug!(metric = name, %kind, "registered metric family");
        Ok(family)
    }

    /// Removes a family. Handles already given out keep working but are no
    /// longer rendered.
    pub fn unregister(&self, name: &str) -> bool {
        let mut order = self.order.write();
        let Some(id) = self.interner.get(name) else {
            return false;
        };
        if self.families.remove(&id).is_none() {
            return false;
        }
        order.retain(|f| f.name() != name);
        true
    }

    pub fn family(&self, name: &str) -> Option<Arc<MetricFamily>> {
        let id = self.interner.get(name)?;
        self.families.get(&id).map(|f| f.value().clone())
    }

    pub fn get_or_create_handle(&self, name: &str, labels: &[(&str, &str)]) -> Result<MetricHandle> {
        self.family(name)
            .ok_or_else(|| Error::UnknownMetric(name.to_string()))?
            .get_or_create(labels)
    }

    pub fn counter(&self, name: &str, labels: &[(&str, &str)]) -> Result<Counter> {
        self.get_or_create_handle(name, labels)?
            .as_counter()
            .cloned()
    }

    pub fn gauge(&self, name: &str, labels: &[(&str, &str)]) -> Result<Gauge> {
        self.get_or_create_handle(name, labels)?.as_gauge().cloned()
    }

    pub fn histogram(&self, name: &str, labels: &[(&str, &str)]) -> Result<Histogram> {
        self.get_or_create_handle(name, labels)?
            .as_histogram()
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.order.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies every family in registration order.
    ///
    /// The order lock is released before any family is read, and each
    /// family only holds its series lock while cloning handles.
    pub fn snapshot(&self) -> Snapshot {
        let families: Vec<Arc<MetricFamily>> = self.order.read().clone();
        Snapshot {
            families: families.iter().map(|f| f.snapshot()).collect(),
        }
    }

    pub fn render(&self) -> String {
        self.snapshot().render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricValue;

    #[test]
    fn register_is_idempotent_for_identical_definitions() -> Result<()> {
        let registry = Registry::new();
        let a = registry.register("hits", "Hits", MetricKind::Counter)?;
        let b = registry.register("hits", "Hits", MetricKind::Counter)?;
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
        Ok(())
    }

    #[test]
    fn conflicting_definitions_are_rejected() -> Result<()> {
        let registry = Registry::new();
        registry.register("x", "X", MetricKind::Counter)?;
        registry.counter("x", &[])?.inc(4.0)?;

        let dup = Err(Error::DuplicateMetric {
            name: "x".to_string(),
        });
        assert_eq!(
            registry.register("x", "X", MetricKind::Gauge).map(|_| ()),
            dup
        );
        assert_eq!(
            registry.register("x", "other", MetricKind::Counter).map(|_| ()),
            dup
        );

        let family = registry.family("x").ok_or(Error::UnknownMetric("x".into()))?;
        assert_eq!(family.kind(), MetricKind::Counter);
        assert_eq!(registry.counter("x", &[])?.get(), 4.0);
        Ok(())
    }

    #[test]
    fn histogram_buckets_are_part_of_the_definition() -> Result<()> {
        let registry = Registry::new();
        let f = registry.register_histogram("lat", "Latency", &[0.1, 1.0])?;
        assert_eq!(f.buckets(), &[0.1, 1.0, f64::INFINITY]);
        assert!(registry.register_histogram("lat", "Latency", &[0.1, 1.0]).is_ok());
        assert!(matches!(
            registry.register("lat", "Latency", MetricKind::Histogram),
            Err(Error::DuplicateMetric { .. })
        ));
        Ok(())
    }

    #[test]
    fn unknown_metric_is_reported() {
        let registry = Registry::new();
        assert_eq!(
            registry.get_or_create_handle("nope", &[]).err(),
            Some(Error::UnknownMetric("nope".to_string()))
        );
    }

    #[test]
    fn invalid_names_are_rejected() {
        let registry = Registry::new();
        assert!(matches!(
            registry.register("", "empty", MetricKind::Gauge),
            Err(Error::InvalidName(_))
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn unregister_allows_redefinition() -> Result<()> {
        let registry = Registry::new();
        registry.register("a", "A", MetricKind::Counter)?;
        registry.register("b", "B", MetricKind::Gauge)?;
        assert!(registry.unregister("a"));
        assert!(!registry.unregister("a"));
        assert!(!registry.unregister("never"));

        registry.register("a", "A again", MetricKind::Gauge)?;
        let names: Vec<String> = registry
            .snapshot()
            .families
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["b".to_string(), "a".to_string()]);
        Ok(())
    }

    #[test]
    fn snapshot_keeps_registration_order_and_sorts_series() -> Result<()> {
        let registry = Registry::new();
        registry.register("zeta", "Z", MetricKind::Gauge)?;
        registry.register("alpha", "A", MetricKind::Counter)?;
        registry.counter("alpha", &[("k", "b")])?.inc(1.0)?;
        registry.counter("alpha", &[("k", "a")])?.inc(2.0)?;

        let snap = registry.snapshot();
        assert_eq!(snap.families[0].name, "zeta");
        assert_eq!(snap.families[1].name, "alpha");

        let alpha = &snap.families[1];
        assert_eq!(alpha.series[0].labels[0].1, "a");
        assert_eq!(alpha.series[0].value, MetricValue::Counter(2.0));
        assert_eq!(
            alpha.series(&[("k", "b")]).map(|s| &s.value),
            Some(&MetricValue::Counter(1.0))
        );
        Ok(())
    }

    #[test]
    fn series_limit_comes_from_config() -> Result<()> {
        let registry = Registry::with_config(RegistryConfig {
            max_series_per_family: Some(2),
        });
        registry.register("c", "C", MetricKind::Counter)?;
        registry.counter("c", &[("n", "1")])?;
        registry.counter("c", &[("n", "2")])?;
        assert!(matches!(
            registry.counter("c", &[("n", "3")]),
            Err(Error::CardinalityExceeded { limit: 2, .. })
        ));
        Ok(())
    }
}
