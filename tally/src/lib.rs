pub mod server;
pub mod simulate;

pub use server::{DEFAULT_METRICS_PATH, MetricsServer, ServerConfig, router, validate_path};
pub use simulate::{AppMetrics, Simulator, SimulatorConfig};
