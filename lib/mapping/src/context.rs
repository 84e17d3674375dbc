use crate::backend::MapLookup;
use crate::cache::{IriCache, IriCacheResult};
use crate::classes::MapUserIriClass;
use crate::config::MappingConfiguration;
use crate::database::Column;
use crate::error::FatalError;
use std::cell::RefCell;

/// Per-translation state threaded explicitly through every component.
///
/// One context is owned by exactly one in-flight translation and binds the
/// configuration snapshot, the backend connection and the classification
/// cache together. Contexts are never shared between translations: cached
/// classification outcomes are transaction-scoped reads.
pub struct TranslationContext<'a> {
    config: &'a MappingConfiguration,
    backend: RefCell<&'a mut dyn MapLookup>,
    cache: RefCell<IriCache>,
}

impl<'a> TranslationContext<'a> {
    pub fn new(config: &'a MappingConfiguration, backend: &'a mut dyn MapLookup) -> Self {
        Self {
            config,
            backend: RefCell::new(backend),
            cache: RefCell::new(IriCache::new()),
        }
    }

    pub fn config(&self) -> &'a MappingConfiguration {
        self.config
    }

    /// Classifies `iri` against a user class, returning the mapped columns
    /// or `None` on a confirmed mismatch.
    ///
    /// The cache guarantees at most one backend round trip per distinct
    /// (IRI, class) pair within this translation.
    pub fn resolve_user_class(
        &self,
        class: &MapUserIriClass,
        iri: &str,
    ) -> Result<Option<Vec<Column>>, FatalError> {
        match self.cache.borrow().lookup(iri, class) {
            IriCacheResult::Mismatch => return Ok(None),
            IriCacheResult::Resolved(columns) => {
                tracing::trace!(iri, class = class.name(), "iri cache hit");
                return Ok(Some(columns));
            }
            IriCacheResult::Unknown => {}
        }

        tracing::trace!(iri, class = class.name(), "iri cache miss");
        let row = self
            .backend
            .borrow_mut()
            .lookup_value(class.lookup_sql(), iri)?;

        let outcome = match row {
            None => IriCacheResult::Mismatch,
            Some(value) => IriCacheResult::Resolved(class.columns_for_internal_id(&value)),
        };

        self.cache.borrow_mut().store(iri, class, outcome.clone());

        Ok(match outcome {
            IriCacheResult::Resolved(columns) => Some(columns),
            _ => None,
        })
    }
}
