use crate::metrics::MetricKind;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("metric `{name}` is already registered with a different definition")]
    DuplicateMetric { name: String },

    #[error("metric `{0}` is not registered")]
    UnknownMetric(String),

    #[error("invalid value {value} for {kind}: {reason}")]
    InvalidValue {
        kind: MetricKind,
        value: f64,
        reason: &'static str,
    },

    #[error("invalid metric name `{0}`")]
    InvalidName(String),

    #[error("invalid label `{name}`: {reason}")]
    InvalidLabel { name: String, reason: &'static str },

    #[error("invalid histogram buckets: {0}")]
    InvalidBuckets(&'static str),

    #[error("expected a {expected} handle, found a {actual}")]
    KindMismatch {
        expected: MetricKind,
        actual: MetricKind,
    },

    #[error("metric `{name}` reached its limit of {limit} series")]
    CardinalityExceeded { name: String, limit: usize },
}

impl Error {
    pub(crate) fn invalid_value(kind: MetricKind, value: f64, reason: &'static str) -> Self {
        Self::InvalidValue {
            kind,
            value,
            reason,
        }
    }
}
