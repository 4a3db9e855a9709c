use smallvec::SmallVec;

use crate::error::{Error, Result};
use crate::key::{Interner, KeyId};
use crate::names::validate_label_name;

/// Validated label pairs, sorted by label name.
pub type LabelPairs<'a> = SmallVec<[(&'a str, &'a str); 4]>;

/// Identity of one series inside a family.
///
/// Pairs are kept sorted by `KeyId`, so two sets built from the same pairs in
/// a different order compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct LabelSet {
    // SmallVec to avoid allocation for small label sets (usually < 4)
    pub(crate) pairs: SmallVec<[(KeyId, KeyId); 4]>,
}

impl LabelSet {
    /// Builds the set only if every name and value is already interned.
    pub(crate) fn lookup(interner: &Interner, labels: &LabelPairs<'_>) -> Option<Self> {
        let mut pairs = SmallVec::with_capacity(labels.len());
        for (k, v) in labels {
            pairs.push((interner.get(k)?, interner.get(v)?));
        }
        pairs.sort_unstable();
        Some(Self { pairs })
    }

    pub(crate) fn intern(interner: &Interner, labels: &LabelPairs<'_>) -> Self {
        let mut pairs: SmallVec<[(KeyId, KeyId); 4]> = labels
            .iter()
            .map(|(k, v)| (interner.get_or_intern(k), interner.get_or_intern(v)))
            .collect();
        pairs.sort_unstable();
        Self { pairs }
    }

    /// Resolves the set back to strings, ordered by label name.
    pub(crate) fn resolve(&self, interner: &Interner) -> Vec<(String, String)> {
        let resolve = |id| {
            interner
                .resolve(id)
                .map(|s| s.to_string())
                .unwrap_or_default()
        };

        let mut out: Vec<(String, String)> = self
            .pairs
            .iter()
            .map(|(k, v)| (resolve(*k), resolve(*v)))
            .collect();
        out.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        out
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }
}

/// Validates label names and rejects repeated keys.
pub fn normalize_labels<'a>(labels: &[(&'a str, &'a str)]) -> Result<LabelPairs<'a>> {
    let mut out: LabelPairs<'a> = labels.iter().copied().collect();
    out.sort_unstable_by(|a, b| a.0.cmp(b.0));

    for (name, _) in &out {
        validate_label_name(name)?;
    }
    if let Some(w) = out.windows(2).find(|w| w[0].0 == w[1].0) {
        return Err(Error::InvalidLabel {
            name: w[0].0.to_string(),
            reason: "label name appears more than once",
        });
    }

    Ok(out)
}
