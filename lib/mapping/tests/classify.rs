use sparql_rel_mapping::{
    BackendError, MapLookup, MapUserIriClass, MappingConfiguration, ResourceClass, Table,
    TranslationContext,
};
use sparql_rel_model::{NamedNode, Node};
use std::collections::HashMap;
use std::sync::Arc;

struct CountingBackend {
    rows: HashMap<String, String>,
    calls: usize,
}

impl CountingBackend {
    fn new(rows: &[(&str, &str)]) -> Self {
        Self {
            rows: rows
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect(),
            calls: 0,
        }
    }
}

impl MapLookup for CountingBackend {
    fn lookup_value(
        &mut self,
        _sql: &str,
        parameter: &str,
    ) -> Result<Option<String>, BackendError> {
        self.calls += 1;
        Ok(self.rows.get(parameter).cloned())
    }
}

fn compound_class() -> MapUserIriClass {
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
    .unwrap()
}

#[test]
fn structural_pattern_prefilters_candidates() {
    let class = compound_class();
    assert!(class.matches_text("http://example.org/compound/CID2244"));
    assert!(!class.matches_text("http://example.org/compound/CIDx"));
    assert!(!class.matches_text("http://example.org/protein/P1"));
}

#[test]
fn lookup_sql_strips_the_prefix() {
    let class = compound_class();
    assert!(class.lookup_sql().contains("right($1, -31)::varchar"));
    assert!(class.lookup_sql().contains("\"compound_bases\""));
}

#[test]
fn classification_queries_the_backend_at_most_once() {
    let config = MappingConfiguration::new();
    let mut backend =
        CountingBackend::new(&[("http://example.org/compound/CID2244", "2244")]);
    let class = Arc::new(compound_class());

    {
        let ctx = TranslationContext::new(&config, &mut backend);
        let iri = "http://example.org/compound/CID2244";

        let first = ctx.resolve_user_class(&class, iri).unwrap();
        let second = ctx.resolve_user_class(&class, iri).unwrap();
        assert_eq!(first, second);
        assert!(first.is_some());
    }
    assert_eq!(backend.calls, 1);
}

#[test]
fn confirmed_mismatch_never_requeries() {
    let config = MappingConfiguration::new();
    let mut backend = CountingBackend::new(&[]);
    let class = Arc::new(compound_class());

    {
        let ctx = TranslationContext::new(&config, &mut backend);
        let iri = "http://example.org/compound/CID999";

        assert!(ctx.resolve_user_class(&class, iri).unwrap().is_none());
        assert!(ctx.resolve_user_class(&class, iri).unwrap().is_none());
    }
    assert_eq!(backend.calls, 1);
}

#[test]
fn user_class_matches_only_backed_iris() {
    let config = MappingConfiguration::new();
    let mut backend =
        CountingBackend::new(&[("http://example.org/compound/CID2244", "2244")]);
    let class = ResourceClass::User(Arc::new(compound_class()));

    let ctx = TranslationContext::new(&config, &mut backend);

    let hit = Node::Iri(NamedNode::new_unchecked("http://example.org/compound/CID2244"));
    let miss = Node::Iri(NamedNode::new_unchecked("http://example.org/compound/CID1"));

    assert!(class.match_node(&hit, &ctx).unwrap());
    assert!(!class.match_node(&miss, &ctx).unwrap());
}

#[test]
fn resolved_columns_carry_the_internal_identifier() {
    let config = MappingConfiguration::new();
    let mut backend =
        CountingBackend::new(&[("http://example.org/compound/CID2244", "2244")]);
    let class = ResourceClass::User(Arc::new(compound_class()));

    let ctx = TranslationContext::new(&config, &mut backend);
    let node = Node::Iri(NamedNode::new_unchecked("http://example.org/compound/CID2244"));

    let columns = class.to_columns(&node, &ctx).unwrap();
    assert_eq!(columns.len(), 1);
    assert_eq!(columns[0].to_string(), "'2244'::integer");
}
