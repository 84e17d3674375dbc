#![doc = include_str!("../README.md")]

mod error;

pub use error::QueryError;

pub mod model {
    pub use sparql_rel_model::*;
}

pub mod mapping {
    pub use sparql_rel_mapping::*;
}

pub mod translator {
    pub use sparql_rel_translator::*;
}

pub use sparql_rel_mapping::{MapLookup, MappingConfiguration};
pub use sparql_rel_translator::{TranslateReport, Translator};

use sparql_rel_model::{lower_query, SelectQuery};
use sparql_rel_translator::TranslateError;
use spargebra::Query;

/// Parses a SPARQL `SELECT` query into the translator's query model.
pub fn parse_query(query: &str, base_iri: Option<&str>) -> Result<SelectQuery, QueryError> {
    let parsed = Query::parse(query, base_iri)?;
    Ok(lower_query(&parsed)?)
}

/// Parses and translates a query, failing on the first semantic error.
pub fn translate_sparql(
    query: &str,
    base_iri: Option<&str>,
    config: &MappingConfiguration,
    backend: &mut dyn MapLookup,
) -> Result<String, QueryError> {
    let query = parse_query(query, base_iri)?;
    tracing::debug!(variables = query.select.projections.len(), "query parsed");
    let translator = Translator::new(config, backend);
    Ok(translator.translate(&query)?)
}

/// Parses and translates a query, collecting every semantic diagnostic.
pub fn try_translate_sparql(
    query: &str,
    base_iri: Option<&str>,
    config: &MappingConfiguration,
    backend: &mut dyn MapLookup,
) -> Result<TranslateReport, QueryError> {
    let query = parse_query(query, base_iri)?;
    let translator = Translator::new(config, backend);
    Ok(translator
        .try_translate(&query)
        .map_err(TranslateError::from)?)
}
