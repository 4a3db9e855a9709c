use ahash::AHashMap;
use parking_lot::RwLock;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyId(u32);

impl From<u32> for KeyId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

impl From<KeyId> for u32 {
    fn from(v: KeyId) -> Self {
        v.0
    }
}

/// Append-only string table. A registry keeps one for family names and each
/// family keeps its own for label names and values.
///
/// Ids are dense and never reused, so a resolved id stays valid for the
/// lifetime of the interner.
#[derive(Default, Debug)]
pub struct Interner {
    map: RwLock<AHashMap<Arc<str>, u32>>,
    vec: RwLock<Vec<Arc<str>>>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up an already interned string without allocating.
    pub fn get(&self, s: &str) -> Option<KeyId> {
        self.map.read().get(s).copied().map(KeyId)
    }

    pub fn get_or_intern(&self, s: &str) -> KeyId {
        if let Some(id) = self.get(s) {
            return id;
        }

        let mut map = self.map.write();
        let mut vec = self.vec.write();

        // Another writer may have won the race between the two locks.
        if let Some(&id) = map.get(s) {
            return KeyId(id);
        }

        let id = vec.len() as u32;
        let s: Arc<str> = Arc::from(s);
        vec.push(s.clone());
        map.insert(s, id);

        KeyId(id)
    }

    pub fn resolve(&self, id: KeyId) -> Option<Arc<str>> {
        self.vec.read().get(id.0 as usize).cloned()
    }

    pub fn len(&self) -> usize {
        self.vec.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
