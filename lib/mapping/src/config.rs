use crate::classes::MapUserIriClass;
use crate::procedure::ProcedureDefinition;
use crate::quad_mapping::QuadMapping;
use std::sync::Arc;

/// The externally-owned schema snapshot a translation runs against.
///
/// The configuration is immutable once built; the compiler only reads it.
/// Ordering matters: user classes are tried in registration order when
/// classifying `VALUES` constants, and quad mappings are tried in order for
/// every triple pattern.
#[derive(Debug, Default)]
pub struct MappingConfiguration {
    iri_classes: Vec<Arc<MapUserIriClass>>,
    mappings: Vec<QuadMapping>,
    procedures: Vec<ProcedureDefinition>,
}

impl MappingConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_iri_class(&mut self, class: MapUserIriClass) -> Arc<MapUserIriClass> {
        let class = Arc::new(class);
        self.iri_classes.push(Arc::clone(&class));
        class
    }

    pub fn add_mapping(&mut self, mapping: QuadMapping) {
        self.mappings.push(mapping);
    }

    pub fn add_procedure(&mut self, procedure: ProcedureDefinition) {
        self.procedures.push(procedure);
    }

    pub fn iri_classes(&self) -> &[Arc<MapUserIriClass>] {
        &self.iri_classes
    }

    pub fn mappings(&self) -> &[QuadMapping] {
        &self.mappings
    }

    pub fn procedure(&self, name: &str) -> Option<&ProcedureDefinition> {
        self.procedures.iter().find(|p| p.name == name)
    }
}
