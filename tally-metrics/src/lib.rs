pub mod error;
pub mod family;
pub mod key;
pub mod labels;
pub mod metrics;
pub mod names;
pub mod registry;
pub mod render;
pub mod snapshot;

pub use error::{Error, Result};
pub use family::MetricFamily;
pub use key::KeyId;
pub use labels::LabelSet;
pub use metrics::{
    Counter, DEFAULT_BUCKETS, Gauge, Histogram, HistogramSnapshot, HistogramTimer, MetricHandle,
    MetricKind, MetricValue, exponential_buckets, linear_buckets,
};
pub use registry::{DEFAULT_MAX_SERIES_PER_FAMILY, Registry, RegistryConfig};
pub use render::{CONTENT_TYPE, render};
pub use snapshot::{FamilySnapshot, SeriesSnapshot, Snapshot};
