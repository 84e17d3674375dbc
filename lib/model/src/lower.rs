//! Lowering of [`spargebra`] algebra trees into the element-list query model.
//!
//! `spargebra` normalizes the surface syntax into a binary algebra. The
//! translator works on ordered pattern groups instead, so this module undoes
//! the normalization: joins become sibling elements, left joins become
//! `OPTIONAL` elements, `Extend` becomes `BIND` and aggregate plumbing is
//! folded back into the `SELECT` clause.

use crate::expression::{
    AggregateFunction, BinaryOperator, BuiltInFunction, Expression, UnaryOperator,
};
use crate::node::Node;
use crate::pattern::{Pattern, TriplePattern, ValuesBlock, ValuesTerm, VarOrIri};
use crate::query::{
    DataSet, GroupCondition, OrderCondition, OrderDirection, Projection, Select, SelectQuery,
};
use crate::range::Range;
use oxrdf::Variable;
use spargebra::algebra::{
    AggregateExpression, Expression as AlgebraExpression, Function, GraphPattern, OrderExpression,
};
use spargebra::term::{GroundTerm, NamedNodePattern, TermPattern};
use spargebra::Query;
use std::collections::HashMap;

/// An error raised while lowering a parsed query into the translator model.
///
/// Lowering errors are structural: the query uses a construct outside the
/// supported grammar. They are distinct from the semantic diagnostics the
/// translator accumulates.
#[derive(Debug, thiserror::Error)]
pub enum LoweringError {
    #[error("only SELECT queries are supported")]
    UnsupportedQueryForm,
    #[error("sub-selects are not supported")]
    UnsupportedSubSelect,
    #[error("unsupported expression construct: {0}")]
    UnsupportedExpression(String),
    #[error("unsupported function: {0}")]
    UnsupportedFunction(String),
    #[error("unsupported term in this position")]
    UnsupportedTerm,
}

/// Lowers a parsed [`Query`] into a [`SelectQuery`].
pub fn lower_query(query: &Query) -> Result<SelectQuery, LoweringError> {
    let Query::Select {
        dataset, pattern, ..
    } = query
    else {
        return Err(LoweringError::UnsupportedQueryForm);
    };

    let mut select = Select::new(Vec::new());

    if let Some(dataset) = dataset {
        for iri in &dataset.default {
            select.datasets.push(DataSet {
                is_default: true,
                iri: iri.clone(),
            });
        }
        for iri in dataset.named.iter().flatten() {
            select.datasets.push(DataSet {
                is_default: false,
                iri: iri.clone(),
            });
        }
    }

    let mut inner = pattern;

    if let GraphPattern::Slice {
        inner: sliced,
        start,
        length,
    } = inner
    {
        if *start > 0 {
            select.offset = Some(*start as u64);
        }
        select.limit = length.map(|l| l as u64);
        inner = sliced;
    }

    match inner {
        GraphPattern::Distinct { inner: distinct } => {
            select.distinct = true;
            inner = distinct;
        }
        GraphPattern::Reduced { inner: reduced } => {
            // REDUCED only permits deduplication; emitting DISTINCT is a
            // valid implementation of it.
            select.distinct = true;
            inner = reduced;
        }
        _ => {}
    }

    let projected = if let GraphPattern::Project {
        inner: projected,
        variables,
    } = inner
    {
        inner = projected;
        variables.clone()
    } else {
        return Err(LoweringError::UnsupportedQueryForm);
    };

    let mut order_by = Vec::new();
    if let GraphPattern::OrderBy {
        inner: ordered,
        expression,
    } = inner
    {
        order_by = expression.clone();
        inner = ordered;
    }

    lower_select_body(inner, &projected, &order_by, &mut select)?;
    Ok(SelectQuery::new(select))
}

/// Lowers the pattern below the solution modifiers, folding aggregate
/// plumbing (`Extend`/`Filter` chains above a `Group`) back into the
/// `SELECT` clause.
fn lower_select_body(
    pattern: &GraphPattern,
    projected: &[Variable],
    order_by: &[OrderExpression],
    select: &mut Select,
) -> Result<(), LoweringError> {
    // Walk the Extend/Filter chain above a potential Group node.
    let mut extends: Vec<(&Variable, &AlgebraExpression)> = Vec::new();
    let mut havings: Vec<&AlgebraExpression> = Vec::new();
    let mut inner = pattern;

    let group = loop {
        match inner {
            GraphPattern::Extend {
                inner: below,
                variable,
                expression,
            } => {
                extends.push((variable, expression));
                inner = below;
            }
            GraphPattern::Filter { inner: below, expr } => {
                havings.push(expr);
                inner = below;
            }
            GraphPattern::Group { .. } => break Some(inner),
            _ => break None,
        }
    };

    if let Some(GraphPattern::Group {
        inner: grouped,
        variables,
        aggregates,
    }) = group
    {
        let mut substitutions: HashMap<String, Expression> = HashMap::new();
        for (variable, aggregate) in aggregates {
            substitutions.insert(
                variable.as_str().to_owned(),
                lower_aggregate(aggregate)?,
            );
        }

        for variable in variables {
            select.group_by.push(GroupCondition {
                expression: Expression::Variable(variable.clone()),
                variable: None,
                range: Range::default(),
            });
        }

        let mut bindings: HashMap<String, Expression> = HashMap::new();
        for (variable, expression) in extends.iter().rev() {
            let lowered = substitute(lower_expression(expression)?, &substitutions, &bindings);
            bindings.insert(variable.as_str().to_owned(), lowered);
        }

        for variable in projected {
            let expression = bindings.remove(variable.as_str());
            select.projections.push(Projection {
                variable: variable.clone(),
                expression,
                range: Range::default(),
            });
        }

        for having in havings.iter().rev() {
            let lowered = substitute(lower_expression(having)?, &substitutions, &bindings);
            select.having.push(lowered);
        }

        for order in order_by {
            let (direction, expression) = lower_order(order)?;
            select.order_by.push(OrderCondition {
                direction,
                expression: substitute(expression, &substitutions, &bindings),
                range: Range::default(),
            });
        }

        select.pattern = lower_group_pattern(grouped)?;
        return Ok(());
    }

    // Non-aggregate query: the Extend/Filter chain is an ordinary pattern
    // suffix and projected variables come through unchanged.
    select.pattern = lower_group_pattern(pattern)?;

    for variable in projected {
        select.projections.push(Projection::of(variable.clone()));
    }

    for order in order_by {
        let (direction, expression) = lower_order(order)?;
        select.order_by.push(OrderCondition {
            direction,
            expression,
            range: Range::default(),
        });
    }

    Ok(())
}

/// Replaces references to synthetic aggregate variables and select-expression
/// bindings inside `expression`.
fn substitute(
    expression: Expression,
    aggregates: &HashMap<String, Expression>,
    bindings: &HashMap<String, Expression>,
) -> Expression {
    match expression {
        Expression::Variable(v) => aggregates
            .get(v.as_str())
            .or_else(|| bindings.get(v.as_str()))
            .cloned()
            .unwrap_or(Expression::Variable(v)),
        Expression::Literal(_) | Expression::Iri(_) => expression,
        Expression::Unary { operator, operand } => Expression::Unary {
            operator,
            operand: Box::new(substitute(*operand, aggregates, bindings)),
        },
        Expression::Binary { operator, lhs, rhs } => Expression::Binary {
            operator,
            lhs: Box::new(substitute(*lhs, aggregates, bindings)),
            rhs: Box::new(substitute(*rhs, aggregates, bindings)),
        },
        Expression::Call {
            function,
            arguments,
            range,
        } => Expression::Call {
            function,
            arguments: arguments
                .into_iter()
                .map(|a| substitute(a, aggregates, bindings))
                .collect(),
            range,
        },
        Expression::Aggregate {
            function,
            distinct,
            argument,
            separator,
            range,
        } => Expression::Aggregate {
            function,
            distinct,
            argument: argument.map(|a| Box::new(substitute(*a, aggregates, bindings))),
            separator,
            range,
        },
    }
}

/// Lowers a graph pattern into an ordered element list.
fn lower_group_pattern(pattern: &GraphPattern) -> Result<Vec<Pattern>, LoweringError> {
    match pattern {
        GraphPattern::Bgp { patterns } => patterns.iter().map(lower_triple).collect(),
        GraphPattern::Join { left, right } => {
            let mut elements = lower_group_pattern(left)?;
            elements.extend(lower_group_pattern(right)?);
            Ok(elements)
        }
        GraphPattern::Filter { expr, inner } => {
            let mut elements = lower_group_pattern(inner)?;
            elements.push(Pattern::Filter {
                constraint: lower_expression(expr)?,
                range: Range::default(),
            });
            Ok(elements)
        }
        GraphPattern::Extend {
            inner,
            variable,
            expression,
        } => {
            let mut elements = lower_group_pattern(inner)?;
            elements.push(Pattern::Bind {
                expression: lower_expression(expression)?,
                variable: variable.clone(),
                range: Range::default(),
            });
            Ok(elements)
        }
        GraphPattern::LeftJoin {
            left,
            right,
            expression,
        } => {
            let mut elements = lower_group_pattern(left)?;
            let mut optional = lower_group_pattern(right)?;
            if let Some(expression) = expression {
                optional.push(Pattern::Filter {
                    constraint: lower_expression(expression)?,
                    range: Range::default(),
                });
            }
            elements.push(Pattern::Optional(optional));
            Ok(elements)
        }
        GraphPattern::Minus { left, right } => {
            let mut elements = lower_group_pattern(left)?;
            elements.push(Pattern::Minus(lower_group_pattern(right)?));
            Ok(elements)
        }
        GraphPattern::Union { left, right } => {
            // Collapse nested unions into one n-ary branch list.
            let mut branches = Vec::new();
            collect_union_branches(left, &mut branches)?;
            collect_union_branches(right, &mut branches)?;
            Ok(vec![Pattern::Union(branches)])
        }
        GraphPattern::Graph { name, inner } => {
            let name = match name {
                NamedNodePattern::NamedNode(n) => VarOrIri::Iri(n.clone()),
                NamedNodePattern::Variable(v) => VarOrIri::Variable(v.clone()),
            };
            Ok(vec![Pattern::Graph {
                name,
                patterns: lower_group_pattern(inner)?,
            }])
        }
        GraphPattern::Values {
            variables,
            bindings,
        } => {
            let rows = bindings
                .iter()
                .map(|row| row.iter().map(|cell| cell.as_ref().map(lower_ground_term)).collect())
                .collect();
            Ok(vec![Pattern::Values(ValuesBlock {
                variables: variables.clone(),
                rows,
                range: Range::default(),
            })])
        }
        GraphPattern::Path {
            subject, object, ..
        } => Ok(vec![Pattern::Path {
            subject: lower_term(subject)?,
            object: lower_term(object)?,
            range: Range::default(),
        }]),
        GraphPattern::Service { .. } => Ok(vec![Pattern::Service {
            range: Range::default(),
        }]),
        GraphPattern::Project { .. }
        | GraphPattern::Distinct { .. }
        | GraphPattern::Reduced { .. }
        | GraphPattern::Slice { .. }
        | GraphPattern::OrderBy { .. }
        | GraphPattern::Group { .. } => Err(LoweringError::UnsupportedSubSelect),
        _ => Err(LoweringError::UnsupportedExpression(format!("{pattern:?}"))),
    }
}

fn collect_union_branches(
    pattern: &GraphPattern,
    branches: &mut Vec<Vec<Pattern>>,
) -> Result<(), LoweringError> {
    if let GraphPattern::Union { left, right } = pattern {
        collect_union_branches(left, branches)?;
        collect_union_branches(right, branches)?;
    } else {
        branches.push(lower_group_pattern(pattern)?);
    }
    Ok(())
}

fn lower_triple(triple: &spargebra::term::TriplePattern) -> Result<Pattern, LoweringError> {
    Ok(Pattern::Triple(TriplePattern {
        subject: lower_term(&triple.subject)?,
        predicate: match &triple.predicate {
            NamedNodePattern::NamedNode(n) => Node::Iri(n.clone()),
            NamedNodePattern::Variable(v) => Node::Variable(v.clone()),
        },
        object: lower_term(&triple.object)?,
        range: Range::default(),
    }))
}

fn lower_term(term: &TermPattern) -> Result<Node, LoweringError> {
    match term {
        TermPattern::NamedNode(n) => Ok(Node::Iri(n.clone())),
        TermPattern::BlankNode(b) => Ok(Node::BlankNode(b.clone())),
        TermPattern::Literal(l) => Ok(Node::Literal(l.clone())),
        TermPattern::Variable(v) => Ok(Node::Variable(v.clone())),
        _ => Err(LoweringError::UnsupportedTerm),
    }
}

fn lower_ground_term(term: &GroundTerm) -> ValuesTerm {
    match term {
        GroundTerm::NamedNode(n) => ValuesTerm::Iri(n.clone()),
        GroundTerm::Literal(l) => ValuesTerm::Literal(l.clone()),
    }
}

fn lower_order(order: &OrderExpression) -> Result<(OrderDirection, Expression), LoweringError> {
    match order {
        OrderExpression::Asc(e) => Ok((OrderDirection::Ascending, lower_expression(e)?)),
        OrderExpression::Desc(e) => Ok((OrderDirection::Descending, lower_expression(e)?)),
    }
}

fn lower_aggregate(aggregate: &AggregateExpression) -> Result<Expression, LoweringError> {
    match aggregate {
        AggregateExpression::CountSolutions { distinct } => Ok(Expression::Aggregate {
            function: AggregateFunction::Count,
            distinct: *distinct,
            argument: None,
            separator: None,
            range: Range::default(),
        }),
        AggregateExpression::FunctionCall {
            name,
            expr,
            distinct,
        } => {
            use spargebra::algebra::AggregateFunction as Af;
            let (function, separator) = match name {
                Af::Count => (AggregateFunction::Count, None),
                Af::Sum => (AggregateFunction::Sum, None),
                Af::Avg => (AggregateFunction::Avg, None),
                Af::Min => (AggregateFunction::Min, None),
                Af::Max => (AggregateFunction::Max, None),
                Af::Sample => (AggregateFunction::Sample, None),
                Af::GroupConcat { separator } => {
                    (AggregateFunction::GroupConcat, separator.clone())
                }
                Af::Custom(name) => {
                    return Err(LoweringError::UnsupportedFunction(name.to_string()))
                }
            };
            Ok(Expression::Aggregate {
                function,
                distinct: *distinct,
                argument: Some(Box::new(lower_expression(expr)?)),
                separator,
                range: Range::default(),
            })
        }
    }
}

fn binary(operator: BinaryOperator, lhs: &AlgebraExpression, rhs: &AlgebraExpression) -> Result<Expression, LoweringError> {
    Ok(Expression::Binary {
        operator,
        lhs: Box::new(lower_expression(lhs)?),
        rhs: Box::new(lower_expression(rhs)?),
    })
}

fn lower_expression(expression: &AlgebraExpression) -> Result<Expression, LoweringError> {
    match expression {
        AlgebraExpression::NamedNode(n) => Ok(Expression::Iri(n.clone())),
        AlgebraExpression::Literal(l) => Ok(Expression::Literal(l.clone())),
        AlgebraExpression::Variable(v) => Ok(Expression::Variable(v.clone())),
        AlgebraExpression::Or(lhs, rhs) => binary(BinaryOperator::Or, lhs, rhs),
        AlgebraExpression::And(lhs, rhs) => binary(BinaryOperator::And, lhs, rhs),
        AlgebraExpression::Equal(lhs, rhs) | AlgebraExpression::SameTerm(lhs, rhs) => {
            binary(BinaryOperator::Equals, lhs, rhs)
        }
        AlgebraExpression::Greater(lhs, rhs) => binary(BinaryOperator::GreaterThan, lhs, rhs),
        AlgebraExpression::GreaterOrEqual(lhs, rhs) => {
            binary(BinaryOperator::GreaterThanOrEqual, lhs, rhs)
        }
        AlgebraExpression::Less(lhs, rhs) => binary(BinaryOperator::LessThan, lhs, rhs),
        AlgebraExpression::LessOrEqual(lhs, rhs) => {
            binary(BinaryOperator::LessThanOrEqual, lhs, rhs)
        }
        AlgebraExpression::In(needle, haystack) => {
            // `x IN (a, b)` is sugar for a disjunction of equalities.
            let mut result: Option<Expression> = None;
            for candidate in haystack {
                let equals = binary(BinaryOperator::Equals, needle, candidate)?;
                result = Some(match result {
                    None => equals,
                    Some(prev) => Expression::Binary {
                        operator: BinaryOperator::Or,
                        lhs: Box::new(prev),
                        rhs: Box::new(equals),
                    },
                });
            }
            result.ok_or_else(|| {
                LoweringError::UnsupportedExpression("empty IN list".to_owned())
            })
        }
        AlgebraExpression::Add(lhs, rhs) => binary(BinaryOperator::Add, lhs, rhs),
        AlgebraExpression::Subtract(lhs, rhs) => binary(BinaryOperator::Subtract, lhs, rhs),
        AlgebraExpression::Multiply(lhs, rhs) => binary(BinaryOperator::Multiply, lhs, rhs),
        AlgebraExpression::Divide(lhs, rhs) => binary(BinaryOperator::Divide, lhs, rhs),
        AlgebraExpression::UnaryPlus(operand) => Ok(Expression::Unary {
            operator: UnaryOperator::Plus,
            operand: Box::new(lower_expression(operand)?),
        }),
        AlgebraExpression::UnaryMinus(operand) => Ok(Expression::Unary {
            operator: UnaryOperator::Minus,
            operand: Box::new(lower_expression(operand)?),
        }),
        AlgebraExpression::Not(operand) => Ok(Expression::Unary {
            operator: UnaryOperator::Not,
            operand: Box::new(lower_expression(operand)?),
        }),
        AlgebraExpression::Bound(variable) => Ok(Expression::Call {
            function: BuiltInFunction::Bound,
            arguments: vec![Expression::Variable(variable.clone())],
            range: Range::default(),
        }),
        AlgebraExpression::If(cond, then, otherwise) => Ok(Expression::Call {
            function: BuiltInFunction::If,
            arguments: vec![
                lower_expression(cond)?,
                lower_expression(then)?,
                lower_expression(otherwise)?,
            ],
            range: Range::default(),
        }),
        AlgebraExpression::Coalesce(arguments) => Ok(Expression::Call {
            function: BuiltInFunction::Coalesce,
            arguments: arguments
                .iter()
                .map(lower_expression)
                .collect::<Result<Vec<_>, _>>()?,
            range: Range::default(),
        }),
        AlgebraExpression::FunctionCall(function, arguments) => {
            let function = lower_function(function)?;
            Ok(Expression::Call {
                function,
                arguments: arguments
                    .iter()
                    .map(lower_expression)
                    .collect::<Result<Vec<_>, _>>()?,
                range: Range::default(),
            })
        }
        AlgebraExpression::Exists(_) => Err(LoweringError::UnsupportedExpression(
            "EXISTS".to_owned(),
        )),
    }
}

fn lower_function(function: &Function) -> Result<BuiltInFunction, LoweringError> {
    Ok(match function {
        Function::Str => BuiltInFunction::Str,
        Function::Lang => BuiltInFunction::Lang,
        Function::Datatype => BuiltInFunction::Datatype,
        Function::Iri => BuiltInFunction::Iri,
        Function::Abs => BuiltInFunction::Abs,
        Function::Ceil => BuiltInFunction::Ceil,
        Function::Floor => BuiltInFunction::Floor,
        Function::Round => BuiltInFunction::Round,
        Function::Concat => BuiltInFunction::Concat,
        Function::StrLen => BuiltInFunction::StrLen,
        Function::UCase => BuiltInFunction::UCase,
        Function::LCase => BuiltInFunction::LCase,
        Function::Contains => BuiltInFunction::Contains,
        Function::StrStarts => BuiltInFunction::StrStarts,
        Function::StrEnds => BuiltInFunction::StrEnds,
        Function::Regex => BuiltInFunction::Regex,
        Function::IsIri => BuiltInFunction::IsIri,
        Function::IsBlank => BuiltInFunction::IsBlank,
        Function::IsLiteral => BuiltInFunction::IsLiteral,
        Function::IsNumeric => BuiltInFunction::IsNumeric,
        other => return Err(LoweringError::UnsupportedFunction(format!("{other:?}"))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lower(query: &str) -> SelectQuery {
        let parsed = Query::parse(query, None).unwrap();
        lower_query(&parsed).unwrap()
    }

    #[test]
    fn bgp_becomes_sibling_triples() {
        let query = lower("SELECT ?s WHERE { ?s <http://ex.org/p> ?o . ?o <http://ex.org/q> ?v }");
        assert_eq!(query.select.pattern.len(), 2);
        assert!(matches!(query.select.pattern[0], Pattern::Triple(_)));
        assert_eq!(query.select.projections.len(), 1);
        assert_eq!(query.select.projections[0].variable.as_str(), "s");
    }

    #[test]
    fn optional_with_filter_keeps_filter_inside() {
        let query = lower(
            "SELECT ?s WHERE { ?s <http://ex.org/p> ?o OPTIONAL { ?s <http://ex.org/q> ?v FILTER(?v > 5) } }",
        );
        let Pattern::Optional(inner) = &query.select.pattern[1] else {
            panic!("expected optional");
        };
        assert!(matches!(inner.last(), Some(Pattern::Filter { .. })));
    }

    #[test]
    fn union_branches_are_flattened() {
        let query = lower(
            "SELECT ?s WHERE { { ?s <http://ex.org/a> ?x } UNION { ?s <http://ex.org/b> ?x } UNION { ?s <http://ex.org/c> ?x } }",
        );
        let Pattern::Union(branches) = &query.select.pattern[0] else {
            panic!("expected union");
        };
        assert_eq!(branches.len(), 3);
    }

    #[test]
    fn group_by_is_folded_back_into_select() {
        let query = lower(
            "SELECT ?g (COUNT(?x) AS ?c) WHERE { ?g <http://ex.org/p> ?x } GROUP BY ?g",
        );
        assert_eq!(query.select.group_by.len(), 1);
        assert_eq!(query.select.projections.len(), 2);
        let aggregated = query.select.projections[1].expression.as_ref().unwrap();
        assert!(matches!(
            aggregated,
            Expression::Aggregate {
                function: AggregateFunction::Count,
                ..
            }
        ));
    }

    #[test]
    fn values_block_keeps_rows_and_unbound_cells() {
        let query = lower(
            "SELECT ?s WHERE { ?s <http://ex.org/p> ?x VALUES (?x ?y) { (<http://ex.org/a> 1) (UNDEF \"b\") } }",
        );
        let block = query
            .select
            .pattern
            .iter()
            .find_map(|pattern| match pattern {
                Pattern::Values(block) => Some(block),
                _ => None,
            })
            .expect("values block");
        assert_eq!(block.variables.len(), 2);
        assert_eq!(block.rows.len(), 2);
        assert!(matches!(block.rows[0][0], Some(ValuesTerm::Iri(_))));
        assert!(matches!(block.rows[0][1], Some(ValuesTerm::Literal(_))));
        assert!(block.rows[1][0].is_none());
        assert!(matches!(block.rows[1][1], Some(ValuesTerm::Literal(_))));
    }

    #[test]
    fn property_path_lowers_to_explicit_marker() {
        let query = lower("SELECT ?s WHERE { ?s <http://ex.org/p>+ ?o }");
        assert!(matches!(query.select.pattern[0], Pattern::Path { .. }));
    }

    #[test]
    fn limit_offset_distinct() {
        let query = lower(
            "SELECT DISTINCT ?s WHERE { ?s <http://ex.org/p> ?o } LIMIT 10 OFFSET 5",
        );
        assert!(query.select.distinct);
        assert_eq!(query.select.limit, Some(10));
        assert_eq!(query.select.offset, Some(5));
    }
}
