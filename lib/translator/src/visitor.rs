use crate::accessor::{LeftJoinVariableAccessor, SimpleVariableAccessor};
use crate::error::{Diagnostic, ErrorKind, Warning, WarningKind};
use crate::expression::{
    boxed_variable, build_expression, iri_constant, literal_constant, SqlExpression,
};
use crate::intercode::{SqlAggregate, SqlIntercode, SqlValuesCell, VariableBinding};
use crate::variables::{quoted_variable_column, SyntheticVariables, UsedVariables};
use sparql_rel_mapping::{
    quote_string_literal, Column, FatalError, LiteralClass, NodeMapping, ParameterDefinition,
    QuadMapping, ResourceClass, ResultDefinition, TranslationContext,
};
use sparql_rel_model::{
    BinaryOperator, DataSet, Expression, Node, OrderDirection, Pattern, ProcedureCallPattern,
    ProcedureResults, Range, Select, TriplePattern, ValuesBlock, ValuesTerm, VarOrIri,
};

/// The scope list and algebra subtree produced by one visit step.
///
/// The scope carries every name visible for projection, including variables
/// that are statically absent (bound by no surviving mapping); those have no
/// entry in the subtree's `UsedVariables` and project as NULL.
#[derive(Debug)]
pub(crate) struct TranslatedSegment {
    pub scope: Vec<String>,
    pub node: SqlIntercode,
}

impl TranslatedSegment {
    fn empty() -> Self {
        Self {
            scope: Vec::new(),
            node: SqlIntercode::EmptySolution,
        }
    }

    fn add_scope(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.scope.contains(&name) {
            self.scope.push(name);
        }
    }

    fn join(mut self, other: TranslatedSegment) -> TranslatedSegment {
        for name in other.scope {
            if !self.scope.contains(&name) {
                self.scope.push(name);
            }
        }
        TranslatedSegment {
            scope: self.scope,
            node: SqlIntercode::join(self.node, other.node),
        }
    }
}

/// The graph-pattern compiler.
///
/// Walks the query tree top-down, drives quad-mapping matching and folds
/// the pieces into the intermediate algebra. Semantic problems accumulate
/// in `errors`; only backend and mapping-consistency failures abort.
pub(crate) struct TranslateVisitor<'a, 'b> {
    ctx: &'b TranslationContext<'a>,
    datasets: Vec<DataSet>,
    graph_stack: Vec<Node>,
    synthetic: SyntheticVariables,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Warning>,
}

impl<'a, 'b> TranslateVisitor<'a, 'b> {
    pub fn new(ctx: &'b TranslationContext<'a>) -> Self {
        Self {
            ctx,
            datasets: Vec::new(),
            graph_stack: Vec::new(),
            synthetic: SyntheticVariables::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn visit_select(&mut self, select: &Select) -> Result<SqlIntercode, FatalError> {
        self.datasets = select.datasets.clone();

        let TranslatedSegment { mut scope, node } = self.translate_pattern_list(&select.pattern)?;
        let mut tree = node;

        let aggregate_mode = !select.group_by.is_empty()
            || !select.having.is_empty()
            || select
                .projections
                .iter()
                .any(|p| p.expression.as_ref().is_some_and(Expression::contains_aggregate))
            || select
                .order_by
                .iter()
                .any(|o| o.expression.contains_aggregate());

        let mut group_keys: Vec<String> = Vec::new();
        let mut projection_expressions: Vec<Option<Expression>> =
            select.projections.iter().map(|p| p.expression.clone()).collect();
        let mut having = select.having.clone();
        let mut order_expressions: Vec<Expression> =
            select.order_by.iter().map(|o| o.expression.clone()).collect();

        if aggregate_mode {
            // Grouping keys first; aliased and computed keys are bound as
            // fresh columns before grouping.
            for condition in &select.group_by {
                match (&condition.expression, &condition.variable) {
                    (Expression::Variable(variable), None) => {
                        group_keys.push(variable.as_str().to_owned());
                    }
                    (expression, alias) => {
                        let name = match alias {
                            Some(variable) => {
                                let name = variable.as_str().to_owned();
                                if scope.contains(&name) {
                                    self.errors.push(Diagnostic::new(
                                        ErrorKind::VariableUsedBeforeBind,
                                        condition.range,
                                        format!("grouping key ?{name} is already in scope"),
                                    ));
                                    self.synthetic.fresh()
                                } else {
                                    name
                                }
                            }
                            None => self.synthetic.fresh(),
                        };
                        let built = {
                            let accessor = SimpleVariableAccessor::new(tree.variables());
                            build_expression(expression, &accessor, &mut self.errors)
                        };
                        tree = SqlIntercode::bind(tree, &name, built);
                        if !scope.contains(&name) {
                            scope.push(name.clone());
                        }
                        group_keys.push(name);
                    }
                }
            }

            // Rewrite every post-grouping expression, replacing aggregate
            // calls with synthetic variables bound by the aggregation node.
            let mut aggregates: Vec<(String, SqlAggregate)> = Vec::new();
            for expression in projection_expressions.iter_mut().flatten() {
                *expression = self.rewrite_aggregates(
                    expression,
                    &group_keys,
                    &mut aggregates,
                    tree.variables(),
                    false,
                );
            }
            for expression in &mut having {
                *expression = self.rewrite_aggregates(
                    expression,
                    &group_keys,
                    &mut aggregates,
                    tree.variables(),
                    false,
                );
            }
            for expression in &mut order_expressions {
                *expression = self.rewrite_aggregates(
                    expression,
                    &group_keys,
                    &mut aggregates,
                    tree.variables(),
                    false,
                );
            }

            scope = group_keys.clone();
            scope.extend(aggregates.iter().map(|(name, _)| name.clone()));
            tree = SqlIntercode::aggregation(tree, group_keys.clone(), aggregates);

            if !having.is_empty() {
                let built: Vec<_> = {
                    let accessor = SimpleVariableAccessor::new(tree.variables());
                    having
                        .iter()
                        .map(|h| build_expression(h, &accessor, &mut self.errors))
                        .collect()
                };
                tree = SqlIntercode::filter(tree, built);
            }
        }

        // Projections.
        let mut projected: Vec<String> = Vec::new();
        for (projection, expression) in select.projections.iter().zip(&projection_expressions) {
            let name = projection.variable.as_str().to_owned();
            if projected.contains(&name) {
                self.errors.push(Diagnostic::new(
                    ErrorKind::RepeatOfProjectionVariable,
                    projection.range,
                    format!("?{name} is projected twice"),
                ));
                continue;
            }

            match expression {
                Some(expression) => {
                    if scope.contains(&name) {
                        self.errors.push(Diagnostic::new(
                            ErrorKind::VariableUsedBeforeBind,
                            projection.range,
                            format!("?{name} is already in scope"),
                        ));
                    } else {
                        let built = {
                            let accessor = SimpleVariableAccessor::new(tree.variables());
                            build_expression(expression, &accessor, &mut self.errors)
                        };
                        tree = SqlIntercode::bind(tree, &name, built);
                        scope.push(name.clone());
                    }
                }
                None => {
                    if aggregate_mode && !group_keys.contains(&name) {
                        self.errors.push(Diagnostic::new(
                            ErrorKind::InvalidVariableOutsideAggregate,
                            projection.range,
                            format!("?{name} is neither aggregated nor a grouping key"),
                        ));
                    }
                }
            }
            projected.push(name);
        }

        if select.projections.is_empty() {
            if aggregate_mode {
                self.errors.push(Diagnostic::new(
                    ErrorKind::InvalidProjection,
                    select.range,
                    "grouped query without an explicit projection",
                ));
            }
            // SELECT * projects every user-visible variable.
            projected = scope
                .iter()
                .filter(|name| !name.starts_with('@') && !name.starts_with("_:"))
                .cloned()
                .collect();
        }

        // ORDER BY; non-variable sort expressions are bound first.
        let mut order: Vec<(String, OrderDirection)> = Vec::new();
        for (condition, expression) in select.order_by.iter().zip(&order_expressions) {
            match expression {
                Expression::Variable(variable) => {
                    order.push((variable.as_str().to_owned(), condition.direction));
                }
                expression => {
                    let name = self.synthetic.fresh();
                    let built = {
                        let accessor = SimpleVariableAccessor::new(tree.variables());
                        build_expression(expression, &accessor, &mut self.errors)
                    };
                    tree = SqlIntercode::bind(tree, &name, built);
                    order.push((name, condition.direction));
                }
            }
        }

        Ok(SqlIntercode::select(
            tree,
            projected,
            select.distinct,
            select.limit,
            select.offset,
            order,
        ))
    }

    /// Replaces each aggregate call with a synthetic variable and records
    /// the aggregate it stands for. Identical aggregates share one variable,
    /// which also makes the rewrite idempotent.
    fn rewrite_aggregates(
        &mut self,
        expression: &Expression,
        group_keys: &[String],
        aggregates: &mut Vec<(String, SqlAggregate)>,
        pre_grouping: &UsedVariables,
        inside_aggregate: bool,
    ) -> Expression {
        match expression {
            Expression::Variable(variable) => {
                let name = variable.as_str();
                if inside_aggregate {
                    if group_keys.iter().any(|k| k == name) {
                        self.errors.push(Diagnostic::new(
                            ErrorKind::InvalidVariableInAggregate,
                            Range::default(),
                            format!("grouping key ?{name} used inside an aggregate"),
                        ));
                    }
                } else if !group_keys.iter().any(|k| k == name) && !name.starts_with('@') {
                    self.errors.push(Diagnostic::new(
                        ErrorKind::InvalidVariableOutsideAggregate,
                        Range::default(),
                        format!("?{name} is neither aggregated nor a grouping key"),
                    ));
                }
                expression.clone()
            }
            Expression::Literal(_) | Expression::Iri(_) => expression.clone(),
            Expression::Unary { operator, operand } => Expression::Unary {
                operator: *operator,
                operand: Box::new(self.rewrite_aggregates(
                    operand,
                    group_keys,
                    aggregates,
                    pre_grouping,
                    inside_aggregate,
                )),
            },
            Expression::Binary { operator, lhs, rhs } => Expression::Binary {
                operator: *operator,
                lhs: Box::new(self.rewrite_aggregates(
                    lhs,
                    group_keys,
                    aggregates,
                    pre_grouping,
                    inside_aggregate,
                )),
                rhs: Box::new(self.rewrite_aggregates(
                    rhs,
                    group_keys,
                    aggregates,
                    pre_grouping,
                    inside_aggregate,
                )),
            },
            Expression::Call {
                function,
                arguments,
                range,
            } => Expression::Call {
                function: *function,
                arguments: arguments
                    .iter()
                    .map(|a| {
                        self.rewrite_aggregates(
                            a,
                            group_keys,
                            aggregates,
                            pre_grouping,
                            inside_aggregate,
                        )
                    })
                    .collect(),
                range: *range,
            },
            Expression::Aggregate {
                function,
                distinct,
                argument,
                separator,
                range,
            } => {
                if inside_aggregate {
                    self.errors.push(Diagnostic::new(
                        ErrorKind::NestedAggregateFunction,
                        *range,
                        "aggregate function inside an aggregate argument",
                    ));
                    return Expression::variable(&self.synthetic.fresh());
                }

                let rewritten_argument = argument.as_ref().map(|a| {
                    self.rewrite_aggregates(a, group_keys, aggregates, pre_grouping, true)
                });
                let built_argument = rewritten_argument.as_ref().map(|a| {
                    let accessor = SimpleVariableAccessor::new(pre_grouping);
                    build_expression(a, &accessor, &mut self.errors)
                });

                let aggregate = SqlAggregate {
                    function: *function,
                    distinct: *distinct,
                    argument: built_argument,
                    separator: separator.clone(),
                };

                let name = match aggregates.iter().find(|(_, a)| *a == aggregate) {
                    Some((name, _)) => name.clone(),
                    None => {
                        let name = self.synthetic.fresh();
                        aggregates.push((name.clone(), aggregate));
                        name
                    }
                };
                Expression::variable(&name)
            }
        }
    }

    /// Compiles one pattern group, applying its own filters at the end.
    fn translate_pattern_list(
        &mut self,
        patterns: &[Pattern],
    ) -> Result<TranslatedSegment, FatalError> {
        let (segment, filters) = self.translate_group(patterns)?;
        Ok(self.apply_filters(segment, &filters))
    }

    fn apply_filters(
        &mut self,
        segment: TranslatedSegment,
        filters: &[Expression],
    ) -> TranslatedSegment {
        if filters.is_empty() {
            return segment;
        }

        let TranslatedSegment { scope, node } = segment;
        let built: Vec<_> = {
            let accessor = SimpleVariableAccessor::new(node.variables());
            filters
                .iter()
                .map(|f| build_expression(f, &accessor, &mut self.errors))
                .collect()
        };
        TranslatedSegment {
            scope,
            node: SqlIntercode::filter(node, built),
        }
    }

    /// Walks the elements of one group left to right. Filters are deferred
    /// and returned to the caller so later bindings in the group stay
    /// visible to them.
    fn translate_group(
        &mut self,
        patterns: &[Pattern],
    ) -> Result<(TranslatedSegment, Vec<Expression>), FatalError> {
        let mut segment = TranslatedSegment::empty();
        let mut filters: Vec<Expression> = Vec::new();

        for pattern in patterns {
            match pattern {
                Pattern::Triple(triple) => {
                    let part = self.translate_triple(triple)?;
                    segment = segment.join(part);
                }
                Pattern::Path { range, .. } => {
                    self.errors.push(Diagnostic::new(
                        ErrorKind::UnsupportedPropertyPath,
                        *range,
                        "property path patterns are not supported",
                    ));
                }
                Pattern::Service { range } => {
                    self.errors.push(Diagnostic::new(
                        ErrorKind::UnsupportedServicePattern,
                        *range,
                        "federated SERVICE patterns are not supported",
                    ));
                }
                Pattern::Group(inner) => {
                    let part = self.translate_pattern_list(inner)?;
                    segment = segment.join(part);
                }
                Pattern::Graph { name, patterns } => {
                    let graph = match name {
                        VarOrIri::Variable(variable) => Node::Variable(variable.clone()),
                        VarOrIri::Iri(iri) => Node::Iri(iri.clone()),
                    };
                    self.graph_stack.push(graph);
                    let part = self.translate_pattern_list(patterns);
                    self.graph_stack.pop();
                    segment = segment.join(part?);
                }
                Pattern::Union(branches) => {
                    let mut part = TranslatedSegment {
                        scope: Vec::new(),
                        node: SqlIntercode::NoSolution,
                    };
                    let mut nodes = Vec::new();
                    for branch in branches {
                        let translated = self.translate_pattern_list(branch)?;
                        for name in translated.scope {
                            if !part.scope.contains(&name) {
                                part.scope.push(name);
                            }
                        }
                        nodes.push(translated.node);
                    }
                    part.node = SqlIntercode::union(nodes);
                    segment = segment.join(part);
                }
                Pattern::Optional(inner) => {
                    segment = self.translate_optional(segment, inner)?;
                }
                Pattern::Minus(inner) => {
                    let part = self.translate_pattern_list(inner)?;
                    segment.node = SqlIntercode::minus(segment.node, part.node);
                }
                Pattern::Filter { constraint, .. } => {
                    filters.push(constraint.clone());
                }
                Pattern::Bind {
                    expression,
                    variable,
                    range,
                } => {
                    let name = variable.as_str().to_owned();
                    if segment.scope.contains(&name) {
                        self.errors.push(Diagnostic::new(
                            ErrorKind::VariableUsedBeforeBind,
                            *range,
                            format!("?{name} is already in scope"),
                        ));
                        continue;
                    }
                    let built = {
                        let accessor = SimpleVariableAccessor::new(segment.node.variables());
                        build_expression(expression, &accessor, &mut self.errors)
                    };
                    segment.node = SqlIntercode::bind(segment.node, &name, built);
                    segment.add_scope(name);
                }
                Pattern::Values(block) => {
                    let part = self.translate_values(block)?;
                    segment = segment.join(part);
                }
                Pattern::ProcedureCall(call) => {
                    if !self.graph_stack.is_empty() {
                        self.errors.push(Diagnostic::new(
                            ErrorKind::ProcedureCallInsideGraph,
                            call.range,
                            "procedure calls are not allowed inside GRAPH patterns",
                        ));
                        continue;
                    }
                    segment = self.translate_procedure_call(segment, call)?;
                }
            }
        }

        Ok((segment, filters))
    }

    /// Compiles an OPTIONAL element against the running tree.
    ///
    /// The inner group's own filters are evaluated under an accessor seeing
    /// both scopes; statically-unsatisfiable filters degenerate the whole
    /// element to a no-op with the inner variables marked absent.
    fn translate_optional(
        &mut self,
        segment: TranslatedSegment,
        inner: &[Pattern],
    ) -> Result<TranslatedSegment, FatalError> {
        let (inner_segment, inner_filters) = self.translate_group(inner)?;

        let conditions: Vec<SqlExpression> = {
            let accessor = LeftJoinVariableAccessor::new(
                segment.node.variables(),
                inner_segment.node.variables(),
                "#l",
                "#r",
            );
            inner_filters
                .iter()
                .map(|f| build_expression(f, &accessor, &mut self.errors).optimize(&accessor))
                .collect()
        };

        if conditions.iter().any(SqlExpression::is_always_false_or_null) {
            self.warnings.push(Warning::new(
                WarningKind::UnsatisfiableOptional,
                Range::default(),
                "optional pattern can never match",
            ));
        }

        let TranslatedSegment { mut scope, node } = segment;
        for name in inner_segment.scope {
            if !scope.contains(&name) {
                scope.push(name);
            }
        }
        Ok(TranslatedSegment {
            scope,
            node: SqlIntercode::left_join(node, inner_segment.node, conditions),
        })
    }

    /// Compiles one triple pattern into a union of table accesses, one per
    /// surviving quad mapping.
    fn translate_triple(
        &mut self,
        triple: &TriplePattern,
    ) -> Result<TranslatedSegment, FatalError> {
        let graph = self.graph_stack.last().cloned();

        let mut segment = TranslatedSegment {
            scope: Vec::new(),
            node: SqlIntercode::NoSolution,
        };
        for node in [
            graph.as_ref(),
            Some(&triple.subject),
            Some(&triple.predicate),
            Some(&triple.object),
        ]
        .into_iter()
        .flatten()
        {
            if let Some(name) = node.variable_name() {
                segment.add_scope(name);
            }
        }

        let config = self.ctx.config();
        let mut branches = Vec::new();
        for mapping in config.mappings() {
            if self.excluded_by_dataset(mapping) {
                continue;
            }
            if !mapping.match_pattern(
                graph.as_ref(),
                &triple.subject,
                &triple.predicate,
                &triple.object,
                self.ctx,
            )? {
                continue;
            }
            if let Some(access) = self.build_table_access(mapping, graph.as_ref(), triple)? {
                branches.push(access);
            }
        }

        tracing::trace!(
            matches = branches.len(),
            subject = %triple.subject,
            predicate = %triple.predicate,
            object = %triple.object,
            "quad pattern compiled"
        );

        segment.node = SqlIntercode::union(branches);
        if segment.node.is_no_solution() {
            self.warnings.push(Warning::new(
                WarningKind::PatternMatchesNoMapping,
                triple.range,
                format!(
                    "no mapping matches {} {} {}",
                    triple.subject, triple.predicate, triple.object
                ),
            ));
        }
        Ok(segment)
    }

    /// Skips mappings whose constant graph is not selected by the query's
    /// dataset restriction.
    fn excluded_by_dataset(&self, mapping: &QuadMapping) -> bool {
        if self.datasets.is_empty() {
            return false;
        }
        match mapping.graph() {
            Some(NodeMapping::Constant(constant)) => match constant.value() {
                Node::Iri(iri) => !self
                    .datasets
                    .iter()
                    .any(|d| d.iri.as_str() == iri.as_str()),
                _ => false,
            },
            _ => false,
        }
    }

    /// Builds the table-access node of one matched mapping, or `None` when
    /// a shared variable maps to provably distinct encodings.
    fn build_table_access(
        &mut self,
        mapping: &QuadMapping,
        graph: Option<&Node>,
        triple: &TriplePattern,
    ) -> Result<Option<SqlIntercode>, FatalError> {
        let mut positions: Vec<(&Node, &NodeMapping)> = Vec::new();
        if let (Some(node), Some(node_mapping)) = (graph, mapping.graph()) {
            positions.push((node, node_mapping));
        }
        positions.push((&triple.subject, mapping.subject()));
        positions.push((&triple.predicate, mapping.predicate()));
        positions.push((&triple.object, mapping.object()));

        let mut conditions: Vec<String> = mapping
            .condition()
            .map(|c| vec![c.to_owned()])
            .unwrap_or_default();
        let mut bindings: Vec<VariableBinding> = Vec::new();

        // Positions sharing one variable must produce the same value; pairs
        // with provably distinct encodings exclude the whole mapping.
        for i in 0..positions.len() {
            for j in (i + 1)..positions.len() {
                let (node_i, mapping_i) = positions[i];
                let (node_j, mapping_j) = positions[j];
                let (Some(name_i), Some(name_j)) =
                    (node_i.variable_name(), node_j.variable_name())
                else {
                    continue;
                };
                if name_i != name_j {
                    continue;
                }
                if mapping_i.resource_class() != mapping_j.resource_class() {
                    return Ok(None);
                }
                match (mapping_i, mapping_j) {
                    (NodeMapping::Constant(a), NodeMapping::Constant(b)) => {
                        if a.value() != b.value() {
                            return Ok(None);
                        }
                    }
                    (NodeMapping::Constant(constant), NodeMapping::Parametrised(columns))
                    | (NodeMapping::Parametrised(columns), NodeMapping::Constant(constant)) => {
                        for (column, value) in
                            columns.columns().iter().zip(constant.columns(self.ctx)?)
                        {
                            conditions.push(format!("{column} = {value}"));
                        }
                    }
                    (NodeMapping::Parametrised(_), NodeMapping::Parametrised(_)) => {
                        // Equality is added when the second binding of the
                        // variable is encountered below.
                    }
                }
            }
        }

        for (node, node_mapping) in positions {
            match node.variable_name() {
                Some(name) => {
                    let class = node_mapping.resource_class().clone();
                    let columns = match node_mapping {
                        NodeMapping::Constant(constant) => constant.columns(self.ctx)?,
                        NodeMapping::Parametrised(parametrised) => {
                            parametrised.columns().to_vec()
                        }
                    };

                    match bindings.iter().find(|b| b.name == name) {
                        Some(existing) => {
                            for (a, b) in existing.columns.iter().zip(&columns) {
                                if a != b {
                                    conditions.push(format!("{a} = {b}"));
                                }
                            }
                        }
                        None => {
                            for column in &columns {
                                if matches!(column, Column::Table(_)) {
                                    conditions.push(format!("{column} IS NOT NULL"));
                                }
                            }
                            bindings.push(VariableBinding::new(name, class, columns));
                        }
                    }
                }
                None => {
                    if let NodeMapping::Parametrised(parametrised) = node_mapping {
                        let values = node_mapping.resource_class().to_columns(node, self.ctx)?;
                        for (column, value) in parametrised.columns().iter().zip(values) {
                            conditions.push(format!("{column} = {value}"));
                        }
                    }
                }
            }
        }

        Ok(Some(SqlIntercode::table_access(
            mapping.table().clone(),
            conditions,
            bindings,
        )))
    }

    /// Compiles a `VALUES` block. Cell classes are inferred independently
    /// per column; IRI cells are classified against the configured user
    /// classes in registration order.
    fn translate_values(
        &mut self,
        block: &ValuesBlock,
    ) -> Result<TranslatedSegment, FatalError> {
        let mut names: Vec<String> = Vec::new();
        for variable in &block.variables {
            let name = variable.as_str().to_owned();
            if names.contains(&name) {
                self.errors.push(Diagnostic::new(
                    ErrorKind::RepeatOfValuesVariable,
                    block.range,
                    format!("?{name} appears twice in the VALUES variable list"),
                ));
            }
            names.push(name);
        }

        let mut rows = Vec::with_capacity(block.rows.len());
        for row in &block.rows {
            let mut cells = Vec::with_capacity(row.len());
            for term in row {
                let cell = match term {
                    None => None,
                    Some(ValuesTerm::Iri(iri)) => Some(self.classify_iri_cell(iri.as_str())?),
                    Some(ValuesTerm::Literal(literal)) => {
                        match literal_constant(literal) {
                            SqlExpression::Constant { class, parts } => {
                                Some(SqlValuesCell { class, parts })
                            }
                            boolean => Some(SqlValuesCell {
                                class: ResourceClass::Literal(LiteralClass::Boolean),
                                parts: vec![if matches!(boolean, SqlExpression::True) {
                                    "true::boolean".to_owned()
                                } else {
                                    "false::boolean".to_owned()
                                }],
                            }),
                        }
                    }
                };
                cells.push(cell);
            }
            rows.push(cells);
        }

        Ok(TranslatedSegment {
            scope: names.clone(),
            node: SqlIntercode::values(names, rows),
        })
    }

    fn classify_iri_cell(&mut self, iri: &str) -> Result<SqlValuesCell, FatalError> {
        for class in self.ctx.config().iri_classes() {
            if !class.matches_text(iri) {
                continue;
            }
            if let Some(columns) = self.ctx.resolve_user_class(class, iri)? {
                return Ok(SqlValuesCell {
                    class: ResourceClass::User(class.clone()),
                    parts: columns.iter().map(Column::to_string).collect(),
                });
            }
        }
        Ok(SqlValuesCell {
            class: ResourceClass::Iri,
            parts: vec![format!("{}::varchar", quote_string_literal(iri))],
        })
    }

    /// Compiles a procedure call: resolves named parameters against the
    /// definition, binds defaults, reports every parameter and result
    /// problem, and extends the tree with a procedure-call node.
    fn translate_procedure_call(
        &mut self,
        segment: TranslatedSegment,
        call: &ProcedureCallPattern,
    ) -> Result<TranslatedSegment, FatalError> {
        let config = self.ctx.config();
        let Some(definition) = config.procedure(call.procedure.as_str()) else {
            self.errors.push(Diagnostic::new(
                ErrorKind::UnknownProcedure,
                call.range,
                format!("unknown procedure <{}>", call.procedure.as_str()),
            ));
            return Ok(segment);
        };

        let TranslatedSegment { mut scope, node: child } = segment;

        // Named parameters, in definition order; omitted optional
        // parameters take their default value.
        let mut provided: Vec<(&str, &Node, Range)> = Vec::new();
        for argument in &call.parameters {
            let name = argument.name.as_str();
            if definition.parameter(name).is_none() {
                self.errors.push(Diagnostic::new(
                    ErrorKind::InvalidParameterPredicate,
                    argument.range,
                    format!("<{name}> is not a parameter of <{}>", definition.name),
                ));
                continue;
            }
            if provided.iter().any(|(n, _, _)| *n == name) {
                self.errors.push(Diagnostic::new(
                    ErrorKind::RepeatOfParameterPredicate,
                    argument.range,
                    format!("parameter <{name}> is given twice"),
                ));
                continue;
            }
            provided.push((name, &argument.value, argument.range));
        }

        let mut parameters = Vec::with_capacity(definition.parameters.len());
        for parameter in &definition.parameters {
            let (value, range) = match provided.iter().find(|(n, _, _)| *n == parameter.name) {
                Some((_, value, range)) => (Some((*value).clone()), *range),
                None => (parameter.default_value.clone(), call.range),
            };
            let sql = match value {
                None => {
                    self.errors.push(Diagnostic::new(
                        ErrorKind::MissingParameterPredicate,
                        call.range,
                        format!("required parameter <{}> is missing", parameter.name),
                    ));
                    None
                }
                Some(value) => self.parameter_sql(parameter, &value, child.variables(), range)?,
            };
            parameters.push(sql.unwrap_or_else(|| "NULL".to_owned()));
        }

        // Result bindings. Fresh variables bind directly; constants and
        // in-scope variables go through a synthetic variable plus an
        // equality filter.
        let mut results: Vec<(String, ResourceClass, String)> = Vec::new();
        let mut post_filters: Vec<SqlExpression> = Vec::new();
        match &call.results {
            ProcedureResults::Single(value) => match definition.result(None) {
                Some(result) => self.bind_result(
                    result,
                    value,
                    child.variables(),
                    &mut scope,
                    &mut results,
                    &mut post_filters,
                ),
                None => self.errors.push(Diagnostic::new(
                    ErrorKind::InvalidResultPredicate,
                    call.range,
                    format!("<{}> produces named results", definition.name),
                )),
            },
            ProcedureResults::Multi(arguments) => {
                let mut seen: Vec<&str> = Vec::new();
                for argument in arguments {
                    let name = argument.name.as_str();
                    let Some(result) = definition.result(Some(name)) else {
                        self.errors.push(Diagnostic::new(
                            ErrorKind::InvalidResultPredicate,
                            argument.range,
                            format!("<{name}> is not a result of <{}>", definition.name),
                        ));
                        continue;
                    };
                    if seen.contains(&name) {
                        self.errors.push(Diagnostic::new(
                            ErrorKind::RepeatOfResultPredicate,
                            argument.range,
                            format!("result <{name}> is given twice"),
                        ));
                        continue;
                    }
                    seen.push(name);
                    self.bind_result(
                        result,
                        &argument.value,
                        child.variables(),
                        &mut scope,
                        &mut results,
                        &mut post_filters,
                    );
                }
            }
        }

        let mut node = SqlIntercode::procedure_call(
            child,
            definition.sql_function.clone(),
            parameters,
            results,
        );
        if !post_filters.is_empty() {
            node = SqlIntercode::filter(node, post_filters);
        }
        Ok(TranslatedSegment { scope, node })
    }

    fn bind_result(
        &mut self,
        result: &ResultDefinition,
        value: &Node,
        variables: &UsedVariables,
        scope: &mut Vec<String>,
        results: &mut Vec<(String, ResourceClass, String)>,
        post_filters: &mut Vec<SqlExpression>,
    ) {
        match value.variable_name() {
            Some(name) if !scope.contains(&name) => {
                scope.push(name.clone());
                results.push((name, result.class.clone(), result.sql_column.clone()));
            }
            _ => {
                let synthetic = self.synthetic.fresh();
                let lhs = SqlExpression::Variable {
                    name: synthetic.clone(),
                    classes: vec![result.class.clone()],
                    can_be_null: false,
                };
                let rhs = match value {
                    Node::Iri(iri) => iri_constant(iri),
                    Node::Literal(literal) => literal_constant(literal),
                    Node::Variable(variable) => match variables.get(variable.as_str()) {
                        Some(used) => SqlExpression::Variable {
                            name: used.name().to_owned(),
                            classes: used.classes().to_vec(),
                            can_be_null: used.can_be_null(),
                        },
                        None => SqlExpression::Null,
                    },
                    Node::BlankNode(_) => SqlExpression::Null,
                };
                results.push((synthetic, result.class.clone(), result.sql_column.clone()));
                post_filters.push(SqlExpression::Binary {
                    operator: BinaryOperator::Equals,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                });
            }
        }
    }

    /// Renders one parameter value in the declared parameter class.
    ///
    /// Procedure parameters are single SQL arguments, so a class with a
    /// multi-column encoding cannot serve as a parameter class.
    fn parameter_sql(
        &mut self,
        parameter: &ParameterDefinition,
        value: &Node,
        variables: &UsedVariables,
        range: Range,
    ) -> Result<Option<String>, FatalError> {
        if parameter.class.part_count() != 1 {
            self.errors.push(Diagnostic::new(
                ErrorKind::InvalidParameterPredicate,
                range,
                format!(
                    "parameter <{}> is declared with a multi-column class",
                    parameter.name
                ),
            ));
            return Ok(None);
        }

        match value {
            Node::Variable(variable) => {
                let name = variable.as_str();
                let Some(used) = variables.get(name) else {
                    self.errors.push(Diagnostic::new(
                        ErrorKind::UnboundedVariableParameterValue,
                        range,
                        format!("?{name} is not bound before the procedure call"),
                    ));
                    return Ok(None);
                };
                if used.classes().contains(&parameter.class) {
                    Ok(Some(quoted_variable_column(name, &parameter.class, 0)))
                } else {
                    let accessor = SimpleVariableAccessor::new(variables);
                    let boxed = boxed_variable(&accessor, name, used.classes());
                    Ok(parameter.class.extract_code(&boxed).into_iter().next())
                }
            }
            Node::BlankNode(_) => {
                self.errors.push(Diagnostic::new(
                    ErrorKind::UnboundedBlankNodeParameterValue,
                    range,
                    "blank nodes cannot be procedure parameter values",
                ));
                Ok(None)
            }
            constant => {
                if !parameter.class.match_node(constant, self.ctx)? {
                    self.errors.push(Diagnostic::new(
                        ErrorKind::InvalidParameterPredicate,
                        range,
                        format!(
                            "parameter <{}> value does not match its declared class",
                            parameter.name
                        ),
                    ));
                    return Ok(None);
                }
                let columns = parameter.class.to_columns(constant, self.ctx)?;
                Ok(columns.first().map(Column::to_string))
            }
        }
    }
}

