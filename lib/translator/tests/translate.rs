use sparql_rel_mapping::{
    BackendError, Column, LiteralClass, MapLookup, MappingConfiguration, NodeMapping,
    ParameterDefinition, ProcedureDefinition, QuadMapping, ResourceClass, ResultDefinition, Table,
};
use sparql_rel_model::{
    BinaryOperator, DataSet, Expression, Literal, NamedNode, Node, Pattern, Position,
    ProcedureArgument, ProcedureCallPattern, ProcedureResults, Projection, Range, Select,
    SelectQuery, Variable,
};
use sparql_rel_translator::{ErrorKind, TranslateReport, Translator, WarningKind};

struct NoMapBackend;

impl MapLookup for NoMapBackend {
    fn lookup_value(&mut self, _sql: &str, _parameter: &str) -> Result<Option<String>, BackendError> {
        Ok(None)
    }
}

const TYPE: &str = "http://example.org/p/type";
const LABEL: &str = "http://example.org/p/label";
const COUNT: &str = "http://example.org/p/count";
const THING: &str = "http://example.org/Thing";
const NAMED_GRAPH: &str = "http://example.org/graph/extra";

fn iri(value: &str) -> Node {
    Node::Iri(NamedNode::new_unchecked(value))
}

fn var(name: &str) -> Node {
    Node::Variable(Variable::new_unchecked(name))
}

fn string(value: &str) -> Node {
    Node::Literal(Literal::new_simple_literal(value))
}

fn iri_column(name: &str) -> NodeMapping {
    NodeMapping::parametrised(ResourceClass::Iri, vec![Column::Table(name.to_owned())])
}

fn constant_iri(value: &str) -> NodeMapping {
    NodeMapping::constant(ResourceClass::Iri, iri(value))
}

/// Three tables: rdf:type rows of a fixed class, string labels and integer
/// counts, plus one mapping confined to a named graph.
fn configuration() -> MappingConfiguration {
    let mut config = MappingConfiguration::new();
    config.add_mapping(QuadMapping::new(
        Table::new("things"),
        None,
        iri_column("s"),
        constant_iri(TYPE),
        constant_iri(THING),
    ));
    config.add_mapping(QuadMapping::new(
        Table::new("labels"),
        None,
        iri_column("s"),
        constant_iri(LABEL),
        NodeMapping::parametrised(
            ResourceClass::Literal(LiteralClass::String),
            vec![Column::Table("label".to_owned())],
        ),
    ));
    config.add_mapping(QuadMapping::new(
        Table::new("counts"),
        None,
        iri_column("s"),
        constant_iri(COUNT),
        NodeMapping::parametrised(
            ResourceClass::Literal(LiteralClass::Integer),
            vec![Column::Table("n".to_owned())],
        ),
    ));
    config.add_mapping(QuadMapping::new(
        Table::new("extra_labels"),
        Some(constant_iri(NAMED_GRAPH)),
        iri_column("s"),
        constant_iri(LABEL),
        NodeMapping::parametrised(
            ResourceClass::Literal(LiteralClass::String),
            vec![Column::Table("label".to_owned())],
        ),
    ));
    config
}

fn translate(select: Select) -> TranslateReport {
    let config = configuration();
    let mut backend = NoMapBackend;
    let translator = Translator::new(&config, &mut backend);
    translator
        .try_translate(&SelectQuery::new(select))
        .unwrap()
}

#[test]
fn single_triple_pattern_end_to_end() {
    let report = translate(Select::new(vec![Pattern::triple(
        var("s"),
        iri(LABEL),
        string("water"),
    )]));

    assert!(report.is_success());
    let sql = report.sql.unwrap();
    assert!(sql.contains("FROM \"labels\""), "{sql}");
    assert!(sql.contains("\"label\" = 'water'::varchar"), "{sql}");
    assert!(sql.contains("\"s\" IS NOT NULL"), "{sql}");
    assert!(sql.contains("AS \"s!iri!0\""), "{sql}");
}

#[test]
fn pattern_without_matching_mapping_is_empty_and_warned() {
    let report = translate(Select::new(vec![Pattern::triple(
        var("s"),
        iri("http://example.org/p/unknown"),
        var("o"),
    )]));

    assert!(report.is_success());
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(
        report.warnings[0].kind,
        WarningKind::PatternMatchesNoMapping
    );
    assert!(report.sql.unwrap().contains("WHERE false"));
}

#[test]
fn shared_variable_with_distinct_encodings_excludes_the_mapping() {
    // Subject and object of the labels mapping carry different classes, so
    // ?x can never take the same value in both positions.
    let report = translate(Select::new(vec![Pattern::triple(
        var("x"),
        iri(LABEL),
        var("x"),
    )]));

    assert!(report.is_success());
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(
        report.warnings[0].kind,
        WarningKind::PatternMatchesNoMapping
    );
}

#[test]
fn disjoint_patterns_join_without_conditions() {
    let report = translate(Select::new(vec![
        Pattern::triple(var("a"), iri(TYPE), iri(THING)),
        Pattern::triple(var("b"), iri(COUNT), var("n")),
    ]));

    assert!(report.is_success());
    let sql = report.sql.unwrap();
    assert!(sql.contains("INNER JOIN"), "{sql}");
    assert!(sql.contains("ON true"), "{sql}");
}

#[test]
fn shared_variable_join_equates_both_sides() {
    let report = translate(Select::new(vec![
        Pattern::triple(var("s"), iri(TYPE), iri(THING)),
        Pattern::triple(var("s"), iri(COUNT), var("n")),
    ]));

    assert!(report.is_success());
    let sql = report.sql.unwrap();
    assert!(
        sql.contains("\"#l\".\"s!iri!0\" = \"#r\".\"s!iri!0\""),
        "{sql}"
    );
}

#[test]
fn optional_renders_a_left_outer_join() {
    let report = translate(Select::new(vec![
        Pattern::triple(var("s"), iri(TYPE), iri(THING)),
        Pattern::Optional(vec![Pattern::triple(var("s"), iri(LABEL), var("l"))]),
    ]));

    assert!(report.is_success());
    let sql = report.sql.unwrap();
    assert!(sql.contains("LEFT OUTER JOIN"), "{sql}");
    assert!(sql.contains("AS \"l!string!0\""), "{sql}");
}

#[test]
fn optional_filter_stays_inside_the_join_condition() {
    let filter = Expression::Binary {
        operator: BinaryOperator::Equals,
        lhs: Box::new(Expression::variable("l")),
        rhs: Box::new(Expression::Literal(Literal::new_simple_literal("water"))),
    };
    let report = translate(Select::new(vec![
        Pattern::triple(var("s"), iri(TYPE), iri(THING)),
        Pattern::Optional(vec![
            Pattern::triple(var("s"), iri(LABEL), var("l")),
            Pattern::Filter {
                constraint: filter,
                range: Range::default(),
            },
        ]),
    ]));

    assert!(report.is_success());
    let sql = report.sql.unwrap();
    // The filter must restrict the joined side, not the whole result.
    let on = sql.split(" ON ").nth(1).unwrap();
    assert!(on.contains("= 'water'::varchar"), "{sql}");
}

#[test]
fn statically_unsatisfiable_optional_is_warned_and_degenerates() {
    // A string-class variable ordered against an integer can never hold.
    let filter = Expression::Binary {
        operator: BinaryOperator::GreaterThan,
        lhs: Box::new(Expression::variable("l")),
        rhs: Box::new(Expression::Literal(Literal::new_typed_literal(
            "5",
            NamedNode::new_unchecked("http://www.w3.org/2001/XMLSchema#integer"),
        ))),
    };
    let report = translate(Select::new(vec![
        Pattern::triple(var("s"), iri(TYPE), iri(THING)),
        Pattern::Optional(vec![
            Pattern::triple(var("s"), iri(LABEL), var("l")),
            Pattern::Filter {
                constraint: filter,
                range: Range::default(),
            },
        ]),
    ]));

    assert!(report.is_success());
    assert!(report
        .warnings
        .iter()
        .any(|w| w.kind == WarningKind::UnsatisfiableOptional));
    // The outer rows survive.
    assert!(report.sql.unwrap().contains("FROM \"things\""));
}

#[test]
fn union_merges_scopes_and_pads_missing_columns() {
    let report = translate(Select::new(vec![Pattern::Union(vec![
        vec![Pattern::triple(var("s"), iri(LABEL), var("l"))],
        vec![Pattern::triple(var("s"), iri(COUNT), var("n"))],
    ])]));

    assert!(report.is_success());
    let sql = report.sql.unwrap();
    assert!(sql.contains("UNION ALL"), "{sql}");
    assert!(sql.contains("CAST(NULL AS"), "{sql}");
    assert!(sql.contains("AS \"l!string!0\""), "{sql}");
    assert!(sql.contains("AS \"n!integer!0\""), "{sql}");
}

#[test]
fn bind_on_a_variable_already_in_scope_is_rejected() {
    let report = translate(Select::new(vec![
        Pattern::triple(var("s"), iri(COUNT), var("n")),
        Pattern::Bind {
            expression: Expression::variable("s"),
            variable: Variable::new_unchecked("n"),
            range: Range::default(),
        },
    ]));

    assert!(!report.is_success());
    assert!(report.sql.is_none());
    assert_eq!(report.errors[0].kind, ErrorKind::VariableUsedBeforeBind);
}

#[test]
fn minus_without_shared_variables_removes_nothing() {
    let report = translate(Select::new(vec![
        Pattern::triple(var("s"), iri(TYPE), iri(THING)),
        Pattern::Minus(vec![Pattern::triple(var("x"), iri(COUNT), var("n"))]),
    ]));

    assert!(report.is_success());
    assert!(!report.sql.unwrap().contains("NOT EXISTS"));
}

#[test]
fn minus_with_shared_variables_uses_an_anti_join() {
    let report = translate(Select::new(vec![
        Pattern::triple(var("s"), iri(TYPE), iri(THING)),
        Pattern::Minus(vec![Pattern::triple(var("s"), iri(COUNT), var("n"))]),
    ]));

    assert!(report.is_success());
    assert!(report.sql.unwrap().contains("NOT EXISTS"));
}

#[test]
fn grouped_query_renders_group_by_and_count() {
    let mut select = Select::new(vec![Pattern::triple(var("s"), iri(COUNT), var("n"))]);
    select.projections = vec![
        Projection::of(Variable::new_unchecked("s")),
        Projection {
            variable: Variable::new_unchecked("total"),
            expression: Some(Expression::Aggregate {
                function: sparql_rel_model::AggregateFunction::Count,
                distinct: false,
                argument: Some(Box::new(Expression::variable("n"))),
                separator: None,
                range: Range::default(),
            }),
            range: Range::default(),
        },
    ];
    select.group_by = vec![sparql_rel_model::GroupCondition {
        expression: Expression::variable("s"),
        variable: None,
        range: Range::default(),
    }];

    let report = translate(select);
    assert!(report.is_success(), "{:?}", report.errors);
    let sql = report.sql.unwrap();
    assert!(sql.contains("GROUP BY"), "{sql}");
    assert!(sql.contains("count("), "{sql}");
    assert!(sql.contains("AS \"total\""), "{sql}");
}

#[test]
fn mixed_numeric_encodings_sum_in_one_column() {
    let mut config = configuration();
    config.add_mapping(QuadMapping::new(
        Table::new("measurements"),
        None,
        iri_column("s"),
        constant_iri(COUNT),
        NodeMapping::parametrised(
            ResourceClass::Literal(LiteralClass::Double),
            vec![Column::Table("value".to_owned())],
        ),
    ));

    let mut select = Select::new(vec![Pattern::triple(var("s"), iri(COUNT), var("n"))]);
    select.projections = vec![
        Projection::of(Variable::new_unchecked("s")),
        Projection {
            variable: Variable::new_unchecked("total"),
            expression: Some(Expression::Aggregate {
                function: sparql_rel_model::AggregateFunction::Sum,
                distinct: false,
                argument: Some(Box::new(Expression::variable("n"))),
                separator: None,
                range: Range::default(),
            }),
            range: Range::default(),
        },
    ];
    select.group_by = vec![sparql_rel_model::GroupCondition {
        expression: Expression::variable("s"),
        variable: None,
        range: Range::default(),
    }];

    let mut backend = NoMapBackend;
    let translator = Translator::new(&config, &mut backend);
    let report = translator.try_translate(&SelectQuery::new(select)).unwrap();

    assert!(report.is_success(), "{:?}", report.errors);
    let sql = report.sql.unwrap();
    // Both encodings feed one promoted aggregate; per-class partial sums
    // merged after grouping would drop every class after the first.
    assert_eq!(sql.matches("sum(").count(), 1, "{sql}");
    assert!(
        sql.contains("sum(COALESCE(\"n!integer!0\"::double precision, \"n!double!0\"))"),
        "{sql}"
    );
    assert!(sql.contains("AS \"total\""), "{sql}");
}

#[test]
fn ungrouped_variable_next_to_an_aggregate_is_rejected() {
    let mut select = Select::new(vec![Pattern::triple(var("s"), iri(COUNT), var("n"))]);
    select.projections = vec![
        Projection::of(Variable::new_unchecked("s")),
        Projection {
            variable: Variable::new_unchecked("total"),
            expression: Some(Expression::Aggregate {
                function: sparql_rel_model::AggregateFunction::Count,
                distinct: false,
                argument: Some(Box::new(Expression::variable("n"))),
                separator: None,
                range: Range::default(),
            }),
            range: Range::default(),
        },
    ];

    let report = translate(select);
    assert!(!report.is_success());
    assert_eq!(
        report.errors[0].kind,
        ErrorKind::InvalidVariableOutsideAggregate
    );
}

#[test]
fn aggregate_inside_an_aggregate_is_rejected() {
    let mut select = Select::new(vec![Pattern::triple(var("s"), iri(COUNT), var("n"))]);
    select.projections = vec![Projection {
        variable: Variable::new_unchecked("total"),
        expression: Some(Expression::Aggregate {
            function: sparql_rel_model::AggregateFunction::Sum,
            distinct: false,
            argument: Some(Box::new(Expression::Aggregate {
                function: sparql_rel_model::AggregateFunction::Count,
                distinct: false,
                argument: None,
                separator: None,
                range: Range::default(),
            })),
            separator: None,
            range: Range::default(),
        }),
        range: Range::default(),
    }];

    let report = translate(select);
    assert!(!report.is_success());
    assert!(report
        .errors
        .iter()
        .any(|e| e.kind == ErrorKind::NestedAggregateFunction));
}

#[test]
fn aggregate_in_a_filter_is_rejected() {
    let report = translate(Select::new(vec![
        Pattern::triple(var("s"), iri(COUNT), var("n")),
        Pattern::Filter {
            constraint: Expression::Aggregate {
                function: sparql_rel_model::AggregateFunction::Count,
                distinct: false,
                argument: None,
                separator: None,
                range: Range::default(),
            },
            range: Range::default(),
        },
    ]));

    assert!(!report.is_success());
    assert_eq!(report.errors[0].kind, ErrorKind::InvalidContextOfAggregate);
}

#[test]
fn service_patterns_are_rejected_explicitly() {
    let report = translate(Select::new(vec![Pattern::Service {
        range: Range::default(),
    }]));

    assert!(!report.is_success());
    assert_eq!(
        report.errors[0].kind,
        ErrorKind::UnsupportedServicePattern
    );
}

#[test]
fn property_paths_are_rejected_explicitly() {
    let report = translate(Select::new(vec![Pattern::Path {
        subject: var("s"),
        object: var("o"),
        range: Range::default(),
    }]));

    assert!(!report.is_success());
    assert_eq!(report.errors[0].kind, ErrorKind::UnsupportedPropertyPath);
}

#[test]
fn dataset_restriction_skips_other_graph_mappings() {
    let mut select = Select::new(vec![Pattern::Graph {
        name: sparql_rel_model::VarOrIri::Iri(NamedNode::new_unchecked(NAMED_GRAPH)),
        patterns: vec![Pattern::triple(var("s"), iri(LABEL), var("l"))],
    }]);
    select.datasets = vec![DataSet {
        is_default: false,
        iri: NamedNode::new_unchecked("http://example.org/graph/other"),
    }];

    let report = translate(select);
    assert!(report.is_success());
    assert!(report
        .warnings
        .iter()
        .any(|w| w.kind == WarningKind::PatternMatchesNoMapping));
}

#[test]
fn graph_pattern_reaches_graph_confined_mappings() {
    let report = translate(Select::new(vec![Pattern::Graph {
        name: sparql_rel_model::VarOrIri::Iri(NamedNode::new_unchecked(NAMED_GRAPH)),
        patterns: vec![Pattern::triple(var("s"), iri(LABEL), var("l"))],
    }]));

    assert!(report.is_success());
    assert!(report.sql.unwrap().contains("FROM \"extra_labels\""));
}

#[test]
fn procedure_call_inside_graph_is_rejected() {
    let call = ProcedureCallPattern {
        procedure: NamedNode::new_unchecked("http://example.org/proc/score"),
        parameters: Vec::new(),
        results: ProcedureResults::Single(var("r")),
        range: Range::default(),
    };
    let report = translate(Select::new(vec![Pattern::Graph {
        name: sparql_rel_model::VarOrIri::Iri(NamedNode::new_unchecked(NAMED_GRAPH)),
        patterns: vec![Pattern::ProcedureCall(call)],
    }]));

    assert!(!report.is_success());
    assert_eq!(report.errors[0].kind, ErrorKind::ProcedureCallInsideGraph);
}

#[test]
fn procedure_call_renders_a_lateral_function() {
    let mut config = configuration();
    config.add_procedure(
        ProcedureDefinition::new("http://example.org/proc/score", "sparql.compute_score")
            .with_parameter(ParameterDefinition::required(
                "http://example.org/proc/score#input",
                ResourceClass::Literal(LiteralClass::Integer),
            ))
            .with_result(ResultDefinition {
                name: None,
                class: ResourceClass::Literal(LiteralClass::Double),
                sql_column: "score".to_owned(),
            }),
    );

    let call = ProcedureCallPattern {
        procedure: NamedNode::new_unchecked("http://example.org/proc/score"),
        parameters: vec![ProcedureArgument {
            name: NamedNode::new_unchecked("http://example.org/proc/score#input"),
            value: var("n"),
            range: Range::default(),
        }],
        results: ProcedureResults::Single(var("r")),
        range: Range::default(),
    };
    let select = Select::new(vec![
        Pattern::triple(var("s"), iri(COUNT), var("n")),
        Pattern::ProcedureCall(call),
    ]);

    let mut backend = NoMapBackend;
    let translator = Translator::new(&config, &mut backend);
    let report = translator.try_translate(&SelectQuery::new(select)).unwrap();

    assert!(report.is_success(), "{:?}", report.errors);
    let sql = report.sql.unwrap();
    assert!(sql.contains("sparql.compute_score("), "{sql}");
    assert!(sql.contains("\"n!integer!0\""), "{sql}");
    assert!(sql.contains("AS \"r!double!0\""), "{sql}");
}

#[test]
fn missing_required_procedure_parameter_is_rejected() {
    let mut config = configuration();
    config.add_procedure(
        ProcedureDefinition::new("http://example.org/proc/score", "sparql.compute_score")
            .with_parameter(ParameterDefinition::required(
                "http://example.org/proc/score#input",
                ResourceClass::Literal(LiteralClass::Integer),
            ))
            .with_result(ResultDefinition {
                name: None,
                class: ResourceClass::Literal(LiteralClass::Double),
                sql_column: "score".to_owned(),
            }),
    );

    let call = ProcedureCallPattern {
        procedure: NamedNode::new_unchecked("http://example.org/proc/score"),
        parameters: Vec::new(),
        results: ProcedureResults::Single(var("r")),
        range: Range::default(),
    };
    let mut backend = NoMapBackend;
    let translator = Translator::new(&config, &mut backend);
    let report = translator
        .try_translate(&SelectQuery::new(Select::new(vec![Pattern::ProcedureCall(
            call,
        )])))
        .unwrap();

    assert!(!report.is_success());
    assert_eq!(
        report.errors[0].kind,
        ErrorKind::MissingParameterPredicate
    );
}

#[test]
fn multi_column_parameter_class_is_rejected() {
    let mut config = configuration();
    config.add_procedure(
        ProcedureDefinition::new("http://example.org/proc/describe", "sparql.describe")
            .with_parameter(ParameterDefinition::required(
                "http://example.org/proc/describe#term",
                ResourceClass::UnsupportedLiteral,
            ))
            .with_result(ResultDefinition {
                name: None,
                class: ResourceClass::Literal(LiteralClass::String),
                sql_column: "text".to_owned(),
            }),
    );

    let call = ProcedureCallPattern {
        procedure: NamedNode::new_unchecked("http://example.org/proc/describe"),
        parameters: vec![ProcedureArgument {
            name: NamedNode::new_unchecked("http://example.org/proc/describe#term"),
            value: string("water"),
            range: Range::default(),
        }],
        results: ProcedureResults::Single(var("r")),
        range: Range::default(),
    };
    let mut backend = NoMapBackend;
    let translator = Translator::new(&config, &mut backend);
    let report = translator
        .try_translate(&SelectQuery::new(Select::new(vec![Pattern::ProcedureCall(
            call,
        )])))
        .unwrap();

    assert!(!report.is_success());
    assert_eq!(report.errors[0].kind, ErrorKind::InvalidParameterPredicate);
}

#[test]
fn parameter_diagnostics_carry_the_argument_position() {
    let mut config = configuration();
    config.add_procedure(
        ProcedureDefinition::new("http://example.org/proc/score", "sparql.compute_score")
            .with_parameter(ParameterDefinition::required(
                "http://example.org/proc/score#input",
                ResourceClass::Literal(LiteralClass::Integer),
            ))
            .with_result(ResultDefinition {
                name: None,
                class: ResourceClass::Literal(LiteralClass::Double),
                sql_column: "score".to_owned(),
            }),
    );

    let position = Range::new(
        Position { line: 3, column: 7 },
        Position { line: 3, column: 21 },
    );
    let call = ProcedureCallPattern {
        procedure: NamedNode::new_unchecked("http://example.org/proc/score"),
        parameters: vec![ProcedureArgument {
            name: NamedNode::new_unchecked("http://example.org/proc/score#input"),
            value: var("ghost"),
            range: position,
        }],
        results: ProcedureResults::Single(var("r")),
        range: Range::default(),
    };
    let mut backend = NoMapBackend;
    let translator = Translator::new(&config, &mut backend);
    let report = translator
        .try_translate(&SelectQuery::new(Select::new(vec![Pattern::ProcedureCall(
            call,
        )])))
        .unwrap();

    assert!(!report.is_success());
    assert_eq!(
        report.errors[0].kind,
        ErrorKind::UnboundedVariableParameterValue
    );
    assert_eq!(report.errors[0].range, position);
}

#[test]
fn values_with_a_repeated_variable_is_rejected() {
    let block = sparql_rel_model::ValuesBlock {
        variables: vec![
            Variable::new_unchecked("x"),
            Variable::new_unchecked("x"),
        ],
        rows: vec![vec![
            Some(sparql_rel_model::ValuesTerm::Literal(
                Literal::new_simple_literal("a"),
            )),
            Some(sparql_rel_model::ValuesTerm::Literal(
                Literal::new_simple_literal("b"),
            )),
        ]],
        range: Range::default(),
    };
    let report = translate(Select::new(vec![Pattern::Values(block)]));

    assert!(!report.is_success());
    assert_eq!(report.errors[0].kind, ErrorKind::RepeatOfValuesVariable);
}

#[test]
fn values_joins_against_the_matching_pattern() {
    let block = sparql_rel_model::ValuesBlock {
        variables: vec![Variable::new_unchecked("l")],
        rows: vec![
            vec![Some(sparql_rel_model::ValuesTerm::Literal(
                Literal::new_simple_literal("water"),
            ))],
            vec![Some(sparql_rel_model::ValuesTerm::Literal(
                Literal::new_simple_literal("salt"),
            ))],
        ],
        range: Range::default(),
    };
    let report = translate(Select::new(vec![
        Pattern::triple(var("s"), iri(LABEL), var("l")),
        Pattern::Values(block),
    ]));

    assert!(report.is_success());
    let sql = report.sql.unwrap();
    assert!(sql.contains("VALUES"), "{sql}");
    assert!(sql.contains("'water'::varchar"), "{sql}");
    assert!(sql.contains("'salt'::varchar"), "{sql}");
}

#[test]
fn projection_of_a_statically_absent_variable_is_null() {
    let mut select = Select::new(vec![Pattern::triple(var("s"), iri(TYPE), iri(THING))]);
    select.projections = vec![
        Projection::of(Variable::new_unchecked("s")),
        Projection::of(Variable::new_unchecked("missing")),
    ];

    let report = translate(select);
    assert!(report.is_success());
    assert!(report.sql.unwrap().contains("NULL AS \"missing\""));
}

#[test]
fn distinct_limit_and_offset_render_in_order() {
    let mut select = Select::new(vec![Pattern::triple(var("s"), iri(TYPE), iri(THING))]);
    select.distinct = true;
    select.limit = Some(10);
    select.offset = Some(5);

    let report = translate(select);
    assert!(report.is_success());
    let sql = report.sql.unwrap();
    assert!(sql.contains("SELECT DISTINCT"), "{sql}");
    assert!(sql.contains("LIMIT 10"), "{sql}");
    assert!(sql.contains("OFFSET 5"), "{sql}");
}
