use sparql_rel::mapping::{
    BackendError, Column, LiteralClass, MapLookup, MapUserIriClass, MappingConfiguration,
    NodeMapping, QuadMapping, ResourceClass, Table,
};
use sparql_rel::model::{NamedNode, Node};
use sparql_rel::{translate_sparql, try_translate_sparql, QueryError};
use std::collections::HashMap;

struct MapBackend {
    rows: HashMap<String, String>,
}

impl MapBackend {
    fn new(rows: &[(&str, &str)]) -> Self {
        Self {
            rows: rows
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect(),
        }
    }
}

impl MapLookup for MapBackend {
    fn lookup_value(&mut self, _sql: &str, parameter: &str) -> Result<Option<String>, BackendError> {
        Ok(self.rows.get(parameter).cloned())
    }
}

const LABEL: &str = "http://example.org/p/label";

/// Compound subjects live behind a map-backed IRI class; labels are plain
/// strings.
fn configuration() -> MappingConfiguration {
    let mut config = MappingConfiguration::new();
    let compound = config.add_iri_class(
        MapUserIriClass::new(
            "compound",
            "integer",
            Table::new("compound_bases"),
            "id",
            "iri_id",
            Some("http://example.org/compound/CID".to_owned()),
            0,
            Some("[0-9]+"),
            None,
        )
        .unwrap(),
    );
    config.add_mapping(QuadMapping::new(
        Table::new("compound_labels"),
        None,
        NodeMapping::parametrised(
            ResourceClass::User(compound),
            vec![Column::Table("id".to_owned())],
        ),
        NodeMapping::constant(
            ResourceClass::Iri,
            Node::Iri(NamedNode::new_unchecked(LABEL)),
        ),
        NodeMapping::parametrised(
            ResourceClass::Literal(LiteralClass::String),
            vec![Column::Table("label".to_owned())],
        ),
    ));
    config
}

#[test]
fn parsed_query_translates_to_sql() {
    let config = configuration();
    let mut backend = MapBackend::new(&[]);

    let sql = translate_sparql(
        "SELECT ?s ?l WHERE { ?s <http://example.org/p/label> ?l }",
        None,
        &config,
        &mut backend,
    )
    .unwrap();

    assert!(sql.contains("FROM \"compound_labels\""), "{sql}");
    assert!(sql.contains("AS \"s\""), "{sql}");
    assert!(sql.contains("AS \"l\""), "{sql}");
}

#[test]
fn classified_iri_constant_becomes_an_identifier_condition() {
    let config = configuration();
    let mut backend = MapBackend::new(&[("http://example.org/compound/CID2244", "2244")]);

    let sql = translate_sparql(
        "SELECT ?l WHERE { <http://example.org/compound/CID2244> <http://example.org/p/label> ?l }",
        None,
        &config,
        &mut backend,
    )
    .unwrap();

    assert!(sql.contains("\"id\" = '2244'::integer"), "{sql}");
}

#[test]
fn unbacked_iri_constant_matches_no_mapping() {
    let config = configuration();
    let mut backend = MapBackend::new(&[]);

    let report = try_translate_sparql(
        "SELECT ?l WHERE { <http://example.org/compound/CID999> <http://example.org/p/label> ?l }",
        None,
        &config,
        &mut backend,
    )
    .unwrap();

    assert!(report.is_success());
    assert_eq!(report.warnings.len(), 1);
    assert!(report.sql.unwrap().contains("WHERE false"));
}

#[test]
fn property_paths_surface_as_diagnostics() {
    let config = configuration();
    let mut backend = MapBackend::new(&[]);

    let report = try_translate_sparql(
        "SELECT ?s WHERE { ?s <http://example.org/p/label>+ ?o }",
        None,
        &config,
        &mut backend,
    )
    .unwrap();

    assert!(!report.is_success());
    assert!(report.sql.is_none());
}

#[test]
fn non_select_queries_are_rejected_at_lowering() {
    let config = configuration();
    let mut backend = MapBackend::new(&[]);

    let result = translate_sparql(
        "ASK { ?s <http://example.org/p/label> ?l }",
        None,
        &config,
        &mut backend,
    );

    assert!(matches!(result, Err(QueryError::Lowering(_))));
}
