use crate::classes::MapUserIriClass;
use crate::database::Column;
use rustc_hash::FxHashMap;

/// The outcome of a cache lookup.
///
/// The three states are deliberately distinct: `Unknown` means the pair has
/// never been classified, `Mismatch` is a confirmed negative that must not
/// trigger re-querying, and `Resolved` carries the mapped column values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IriCacheResult {
    Unknown,
    Mismatch,
    Resolved(Vec<Column>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CachedOutcome {
    Mismatch,
    Resolved(Vec<Column>),
}

/// Per-translation memo of (IRI, user class) classification outcomes.
///
/// Entries are transaction-scoped reads and must never be shared across
/// translations; each in-flight translation owns its own instance.
#[derive(Debug, Default)]
pub struct IriCache {
    entries: FxHashMap<(String, String), CachedOutcome>,
}

impl IriCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, iri: &str, class: &MapUserIriClass) -> IriCacheResult {
        match self.entries.get(&(iri.to_owned(), class.name().to_owned())) {
            None => IriCacheResult::Unknown,
            Some(CachedOutcome::Mismatch) => IriCacheResult::Mismatch,
            Some(CachedOutcome::Resolved(columns)) => IriCacheResult::Resolved(columns.clone()),
        }
    }

    /// Stores a classification outcome; storing twice overwrites.
    pub fn store(&mut self, iri: &str, class: &MapUserIriClass, outcome: IriCacheResult) {
        let key = (iri.to_owned(), class.name().to_owned());
        match outcome {
            IriCacheResult::Unknown => {
                self.entries.remove(&key);
            }
            IriCacheResult::Mismatch => {
                self.entries.insert(key, CachedOutcome::Mismatch);
            }
            IriCacheResult::Resolved(columns) => {
                self.entries.insert(key, CachedOutcome::Resolved(columns));
            }
        }
    }
}
