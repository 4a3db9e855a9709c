//! Text exposition format.
//!
//! Output depends only on the snapshot: families keep registration order,
//! series are already sorted, and numbers use Rust's shortest round-trip
//! formatting, so equal snapshots render to equal bytes.

use std::fmt::Write;

use crate::metrics::MetricValue;
use crate::names::BUCKET_LABEL;
use crate::snapshot::{FamilySnapshot, Snapshot};

pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

pub fn render(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    for family in &snapshot.families {
        render_family(family, &mut out);
    }
    out
}

fn render_family(family: &FamilySnapshot, out: &mut String) {
    let name = &family.name;
    let _ = writeln!(out, "# HELP {name} {}", escape_help(&family.help));
    let _ = writeln!(out, "# TYPE {name} {}", family.kind);

    for series in &family.series {
        let labels = format_labels(&series.labels);
        match &series.value {
            MetricValue::Counter(v) | MetricValue::Gauge(v) => {
                let _ = writeln!(out, "{name}{} {}", braced(&labels), format_value(*v));
            }
            MetricValue::Histogram(h) => {
                let prefix = if labels.is_empty() {
                    String::new()
                } else {
                    format!("{labels},")
                };
                for (bound, count) in &h.buckets {
                    let _ = writeln!(
                        out,
                        "{name}_bucket{{{prefix}{BUCKET_LABEL}=\"{}\"}} {count}",
                        format_value(*bound)
                    );
                }
                let _ = writeln!(
                    out,
                    "{name}_sum{} {}",
                    braced(&labels),
                    format_value(h.sum)
                );
                let _ = writeln!(out, "{name}_count{} {}", braced(&labels), h.count);
            }
        }
    }
}

fn braced(labels: &str) -> String {
    if labels.is_empty() {
        String::new()
    } else {
        format!("{{{labels}}}")
    }
}

fn format_labels(labels: &[(String, String)]) -> String {
    labels
        .iter()
        .map(|(k, v)| format!("{k}=\"{}\"", escape_label_value(v)))
        .collect::<Vec<_>>()
        .join(",")
}

/// Shortest round-trip text, switching to exponent notation outside
/// `[1e-7, 1e21)`.
pub fn format_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v == f64::INFINITY {
        "+Inf".to_string()
    } else if v == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else if v != 0.0 && !(1e-7..1e21).contains(&v.abs()) {
        format!("{v:e}")
    } else {
        v.to_string()
    }
}

fn escape_help(v: &str) -> String {
    v.replace('\\', "\\\\").replace('\n', "\\n")
}

fn escape_label_value(v: &str) -> String {
    v.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
