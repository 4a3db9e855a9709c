use crate::metrics::{MetricKind, MetricValue};

/// Point-in-time copy of a registry, in registration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub families: Vec<FamilySnapshot>,
}

impl Snapshot {
    pub fn render(&self) -> String {
        crate::render::render(self)
    }

    pub fn family(&self, name: &str) -> Option<&FamilySnapshot> {
        self.families.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FamilySnapshot {
    pub name: String,
    pub help: String,
    pub kind: MetricKind,
    /// Sorted by label pairs.
    pub series: Vec<SeriesSnapshot>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSnapshot {
    /// Label pairs sorted by name; empty for the unlabeled series.
    pub labels: Vec<(String, String)>,
    pub value: MetricValue,
}

impl FamilySnapshot {
    pub fn series(&self, labels: &[(&str, &str)]) -> Option<&SeriesSnapshot> {
        let mut wanted: Vec<(&str, &str)> = labels.to_vec();
        wanted.sort_unstable_by(|a, b| a.0.cmp(b.0));

        self.series.iter().find(|s| {
            s.labels.len() == wanted.len()
                && s
                    .labels
                    .iter()
                    .zip(&wanted)
                    .all(|((k, v), (wk, wv))| k == wk && v == wv)
        })
    }
}
