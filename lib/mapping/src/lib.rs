//! Declarative schema describing how RDF quads are stored in relational
//! tables, together with the resource-class model that types every value
//! encoding, the per-translation IRI classification cache and the backend
//! lookup seam.

mod backend;
mod cache;
mod classes;
mod config;
mod context;
mod database;
mod error;
mod procedure;
mod quad_mapping;

pub use backend::MapLookup;
pub use cache::{IriCache, IriCacheResult};
pub use classes::{LiteralClass, MapUserIriClass, ResourceClass};
pub use config::MappingConfiguration;
pub use context::TranslationContext;
pub use database::{quote_identifier, quote_string_literal, Column, Table};
pub use error::{BackendError, FatalError};
pub use procedure::{ParameterDefinition, ProcedureDefinition, ResultDefinition};
pub use quad_mapping::{ConstantMapping, NodeMapping, ParametrisedMapping, QuadMapping};
