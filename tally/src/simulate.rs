use std::sync::Arc;
use std::time::Duration;

use tally_metrics::{Gauge, Histogram, MetricFamily, MetricKind, Registry};
use tokio::sync::watch;

pub const ENDPOINTS: [&str; 4] = ["/api/users", "/api/orders", "/api/products", "/health"];
pub const METHODS: [&str; 4] = ["GET", "POST", "PUT", "DELETE"];
pub const ERROR_TYPES: [&str; 4] = ["timeout", "validation", "database", "network"];

/// The demo application's instruments.
#[derive(Debug, Clone)]
pub struct AppMetrics {
    pub requests: Arc<MetricFamily>,
    pub latency: Histogram,
    pub active_users: Gauge,
    pub errors: Arc<MetricFamily>,
}

impl AppMetrics {
    pub fn register(registry: &Registry) -> tally_metrics::Result<Self> {
        let requests = registry.register(
            "app_requests_total",
            "Total app requests",
            MetricKind::Counter,
        )?;
        let latency = registry
            .register(
                "app_request_duration_seconds",
                "Request latency",
                MetricKind::Histogram,
            )?
            .histogram(&[])?;
        let active_users = registry
            .register(
                "app_active_users",
                "Number of active users",
                MetricKind::Gauge,
            )?
            .gauge(&[])?;
        let errors =
            registry.register("app_errors_total", "Total app errors", MetricKind::Counter)?;

        Ok(Self {
            requests,
            latency,
            active_users,
            errors,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatorConfig {
    pub interval_min: Duration,
    pub interval_max: Duration,
    /// Probability in `[0, 1]` that a simulated request also records an error.
    pub error_rate: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            interval_min: Duration::from_millis(100),
            interval_max: Duration::from_secs(1),
            error_rate: 0.05,
        }
    }
}

impl SimulatorConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.interval_min <= self.interval_max,
            "interval min ({:?}) must not exceed interval max ({:?})",
            self.interval_min,
            self.interval_max
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.error_rate),
            "error rate must be within [0, 1], got {}",
            self.error_rate
        );
        Ok(())
    }
}

/// Random request traffic against [`AppMetrics`].
#[derive(Debug, Clone)]
pub struct Simulator {
    metrics: AppMetrics,
    cfg: SimulatorConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub method: &'static str,
    pub endpoint: &'static str,
    pub latency_secs: f64,
    pub active_users: u32,
    pub error: Option<&'static str>,
}

fn pick(items: &[&'static str]) -> &'static str {
    items[rand::random_range(0..items.len())]
}

impl Simulator {
    pub fn new(metrics: AppMetrics, cfg: SimulatorConfig) -> Self {
        Self { metrics, cfg }
    }

    pub fn tick(&self) -> tally_metrics::Result<Tick> {
        let method = pick(&METHODS);
        let endpoint = pick(&ENDPOINTS);
        self.metrics
            .requests
            .counter(&[("method", method), ("endpoint", endpoint)])?
            .inc(1.0)?;

        let latency_secs: f64 = rand::random_range(0.01..2.0);
        self.metrics.latency.observe(latency_secs)?;

        let active_users: u32 = rand::random_range(10..=100);
        self.metrics.active_users.set(f64::from(active_users))?;

        let error = if rand::random::<f64>() < self.cfg.error_rate {
            let error_type = pick(&ERROR_TYPES);
            self.metrics
                .errors
                .counter(&[("error_type", error_type)])?
                .inc(1.0)?;
            Some(error_type)
        } else {
            None
        };

        Ok(Tick {
            method,
            endpoint,
            latency_secs,
            active_users,
            error,
        })
    }

    fn next_delay(&self) -> Duration {
        let min = self.cfg.interval_min.as_millis() as u64;
        let max = self.cfg.interval_max.as_millis() as u64;
        if max <= min {
            return self.cfg.interval_min;
        }
        Duration::from_millis(rand::random_range(min..=max))
    }

    /// Ticks until `shutdown` flips to `true` or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            interval_min = ?self.cfg.interval_min,
            interval_max = ?self.cfg.interval_max,
            error_rate = self.cfg.error_rate,
            "activity simulator started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.tick() {
                Ok(t) => tracing::debug!(
                    method = t.method,
                    endpoint = t.endpoint,
                    latency_secs = t.latency_secs,
                    active_users = t.active_users,
                    error = t.error,
                    "simulated request"
                ),
                Err(err) => tracing::warn!(error = %err, "simulated request not recorded"),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.next_delay()) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::info!("activity simulator stopped");
    }
}
