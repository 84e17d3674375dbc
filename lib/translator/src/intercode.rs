use crate::accessor::{LeftJoinVariableAccessor, SimpleVariableAccessor, VariableAccessor};
use crate::expression::{boxed_variable, is_numeric_class, SqlExpression};
use crate::variables::{quoted_variable_column, UsedVariable, UsedVariables};
use itertools::Itertools;
use sparql_rel_mapping::{quote_identifier, quote_string_literal, Column, ResourceClass, Table};
use sparql_rel_model::{AggregateFunction, OrderDirection};

static EMPTY_VARIABLES: UsedVariables = UsedVariables::empty();

/// The physical columns backing one class of one variable in a table access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableBinding {
    pub name: String,
    pub class: ResourceClass,
    pub columns: Vec<Column>,
}

impl VariableBinding {
    pub fn new(name: impl Into<String>, class: ResourceClass, columns: Vec<Column>) -> Self {
        debug_assert_eq!(class.part_count(), columns.len());
        Self {
            name: name.into(),
            class,
            columns,
        }
    }
}

/// One aggregate computed by an aggregation node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlAggregate {
    pub function: AggregateFunction,
    pub distinct: bool,
    /// `None` only for `COUNT(*)`.
    pub argument: Option<SqlExpression>,
    /// `GROUP_CONCAT` separator; the default is a single space.
    pub separator: Option<String>,
}

/// One cell of a `VALUES` row: the class and the rendered encoding parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlValuesCell {
    pub class: ResourceClass,
    pub parts: Vec<String>,
}

/// The relational-algebra intermediate form.
///
/// Trees are built exclusively through the smart constructors, which perform
/// the local simplifications: no-solution propagation, empty-solution
/// identity, union flattening and class-set intersection on shared
/// variables. Construction is append-only; no node is mutated after being
/// handed to a parent.
#[derive(Debug, Clone)]
pub enum SqlIntercode {
    /// The statically-empty relation. Joining anything with it is empty.
    NoSolution,
    /// The single-row, zero-variable relation; the join identity.
    EmptySolution,
    TableAccess {
        table: Table,
        conditions: Vec<String>,
        bindings: Vec<VariableBinding>,
        variables: UsedVariables,
    },
    Join {
        lhs: Box<SqlIntercode>,
        rhs: Box<SqlIntercode>,
        variables: UsedVariables,
    },
    LeftJoin {
        lhs: Box<SqlIntercode>,
        rhs: Box<SqlIntercode>,
        conditions: Vec<SqlExpression>,
        variables: UsedVariables,
    },
    Union {
        branches: Vec<SqlIntercode>,
        variables: UsedVariables,
    },
    Minus {
        lhs: Box<SqlIntercode>,
        rhs: Box<SqlIntercode>,
        variables: UsedVariables,
    },
    Filter {
        child: Box<SqlIntercode>,
        conditions: Vec<SqlExpression>,
        variables: UsedVariables,
    },
    Bind {
        child: Box<SqlIntercode>,
        name: String,
        expression: SqlExpression,
        variables: UsedVariables,
    },
    Values {
        columns: Vec<String>,
        rows: Vec<Vec<Option<SqlValuesCell>>>,
        variables: UsedVariables,
    },
    Aggregation {
        child: Box<SqlIntercode>,
        group_keys: Vec<String>,
        aggregates: Vec<(String, SqlAggregate)>,
        variables: UsedVariables,
    },
    ProcedureCall {
        child: Box<SqlIntercode>,
        function: String,
        /// Rendered SQL parameter expressions, in call order.
        parameters: Vec<String>,
        /// (variable, class, procedure result column) per bound result.
        results: Vec<(String, ResourceClass, String)>,
        variables: UsedVariables,
    },
    Select {
        child: Box<SqlIntercode>,
        projection: Vec<String>,
        distinct: bool,
        limit: Option<u64>,
        offset: Option<u64>,
        order: Vec<(String, OrderDirection)>,
        variables: UsedVariables,
    },
}

impl SqlIntercode {
    pub fn variables(&self) -> &UsedVariables {
        match self {
            SqlIntercode::NoSolution | SqlIntercode::EmptySolution => &EMPTY_VARIABLES,
            SqlIntercode::TableAccess { variables, .. }
            | SqlIntercode::Join { variables, .. }
            | SqlIntercode::LeftJoin { variables, .. }
            | SqlIntercode::Union { variables, .. }
            | SqlIntercode::Minus { variables, .. }
            | SqlIntercode::Filter { variables, .. }
            | SqlIntercode::Bind { variables, .. }
            | SqlIntercode::Values { variables, .. }
            | SqlIntercode::Aggregation { variables, .. }
            | SqlIntercode::ProcedureCall { variables, .. }
            | SqlIntercode::Select { variables, .. } => variables,
        }
    }

    pub fn is_no_solution(&self) -> bool {
        matches!(self, SqlIntercode::NoSolution)
    }

    pub fn table_access(
        table: Table,
        conditions: Vec<String>,
        bindings: Vec<VariableBinding>,
    ) -> SqlIntercode {
        let variables = bindings
            .iter()
            .map(|b| UsedVariable::new(&b.name, b.class.clone(), false))
            .collect();

        SqlIntercode::TableAccess {
            table,
            conditions,
            bindings,
            variables,
        }
    }

    /// Natural join over shared variable names.
    ///
    /// When a shared variable is certainly bound on both sides, its class
    /// set narrows to the intersection; an empty intersection makes the
    /// whole join statically empty.
    pub fn join(lhs: SqlIntercode, rhs: SqlIntercode) -> SqlIntercode {
        if lhs.is_no_solution() || rhs.is_no_solution() {
            return SqlIntercode::NoSolution;
        }
        if matches!(lhs, SqlIntercode::EmptySolution) {
            return rhs;
        }
        if matches!(rhs, SqlIntercode::EmptySolution) {
            return lhs;
        }

        let mut variables = UsedVariables::new();
        for left in lhs.variables().iter() {
            match rhs.variables().get(left.name()) {
                None => variables.insert(left.clone()),
                Some(right) => {
                    let both_bound = !left.can_be_null() && !right.can_be_null();
                    let classes = if both_bound {
                        let shared = left.shared_classes(right);
                        if shared.is_empty() {
                            return SqlIntercode::NoSolution;
                        }
                        shared
                    } else {
                        let mut union = left.classes().to_vec();
                        for class in right.classes() {
                            if !union.contains(class) {
                                union.push(class.clone());
                            }
                        }
                        union
                    };
                    variables.insert(UsedVariable::with_classes(
                        left.name(),
                        classes,
                        left.can_be_null() && right.can_be_null(),
                    ));
                }
            }
        }
        for right in rhs.variables().iter() {
            if !variables.contains(right.name()) {
                variables.insert(right.clone());
            }
        }

        SqlIntercode::Join {
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            variables,
        }
    }

    /// Left join preserving every row of `lhs`; `conditions` are evaluated
    /// in the join condition together with the shared-variable equality.
    ///
    /// A statically-unsatisfiable right side degenerates to the left tree
    /// unchanged.
    pub fn left_join(
        lhs: SqlIntercode,
        rhs: SqlIntercode,
        conditions: Vec<SqlExpression>,
    ) -> SqlIntercode {
        if lhs.is_no_solution() {
            return SqlIntercode::NoSolution;
        }
        if rhs.is_no_solution() || conditions.iter().any(SqlExpression::is_always_false_or_null) {
            return lhs;
        }

        let conditions: Vec<_> = conditions
            .into_iter()
            .filter(|c| !matches!(c, SqlExpression::True))
            .collect();

        if matches!(rhs, SqlIntercode::EmptySolution) && conditions.is_empty() {
            return lhs;
        }

        let mut variables = UsedVariables::new();
        for left in lhs.variables().iter() {
            let mut merged = left.clone();
            if let Some(right) = rhs.variables().get(left.name()) {
                for class in right.classes() {
                    merged.add_class(class.clone());
                }
            }
            variables.insert(merged);
        }
        for right in rhs.variables().iter() {
            if !variables.contains(right.name()) {
                let mut nullable = right.clone();
                nullable.set_nullable(true);
                variables.insert(nullable);
            }
        }

        SqlIntercode::LeftJoin {
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            conditions,
            variables,
        }
    }

    /// N-ary union; flattens nested unions and drops empty branches.
    pub fn union(branches: Vec<SqlIntercode>) -> SqlIntercode {
        let mut flat = Vec::new();
        for branch in branches {
            match branch {
                SqlIntercode::NoSolution => {}
                SqlIntercode::Union { branches, .. } => flat.extend(branches),
                other => flat.push(other),
            }
        }

        match flat.len() {
            0 => return SqlIntercode::NoSolution,
            1 => return flat.into_iter().next().unwrap_or(SqlIntercode::NoSolution),
            _ => {}
        }

        let mut variables = UsedVariables::new();
        for branch in &flat {
            for variable in branch.variables().iter() {
                variables.merge(variable.clone());
            }
        }
        // A variable absent from any branch may come back unbound.
        let names: Vec<String> = variables.names().map(str::to_owned).collect();
        for name in names {
            if !flat.iter().all(|b| b.variables().contains(&name)) {
                if let Some(variable) = variables.get_mut(&name) {
                    variable.set_nullable(true);
                }
            }
        }

        SqlIntercode::Union {
            branches: flat,
            variables,
        }
    }

    /// Anti-join on the variables shared with `rhs`. Never changes the
    /// left-side scope; sharing no variable leaves `lhs` untouched.
    pub fn minus(lhs: SqlIntercode, rhs: SqlIntercode) -> SqlIntercode {
        if lhs.is_no_solution() {
            return SqlIntercode::NoSolution;
        }
        if rhs.is_no_solution() {
            return lhs;
        }

        let shares_variable = lhs
            .variables()
            .iter()
            .any(|v| rhs.variables().contains(v.name()));
        if !shares_variable {
            return lhs;
        }

        let variables = lhs.variables().clone();
        SqlIntercode::Minus {
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            variables,
        }
    }

    /// Conjoined filter with constant propagation.
    ///
    /// A condition statically reducing to false or null collapses the whole
    /// node to no-solution; statically-true conditions are dropped. A filter
    /// over a union distributes into the branches so each condition is
    /// re-optimized under the branch's own typing.
    pub fn filter(child: SqlIntercode, conditions: Vec<SqlExpression>) -> SqlIntercode {
        if child.is_no_solution() {
            return SqlIntercode::NoSolution;
        }

        let optimized: Vec<_> = {
            let accessor = SimpleVariableAccessor::new(child.variables());
            conditions.iter().map(|c| c.optimize(&accessor)).collect()
        };

        if optimized.iter().any(|c| c.is_always_false_or_null()) {
            return SqlIntercode::NoSolution;
        }

        let conditions: Vec<_> = optimized
            .into_iter()
            .filter(|c| !matches!(c, SqlExpression::True))
            .collect();
        if conditions.is_empty() {
            return child;
        }

        if let SqlIntercode::Union { branches, .. } = child {
            return SqlIntercode::union(
                branches
                    .into_iter()
                    .map(|b| SqlIntercode::filter(b, conditions.clone()))
                    .collect(),
            );
        }

        let variables = child.variables().clone();
        SqlIntercode::Filter {
            child: Box::new(child),
            conditions,
            variables,
        }
    }

    /// Extends the scope with a variable bound to an expression.
    ///
    /// A statically-null expression leaves the tree unchanged; the caller
    /// keeps the name in scope as a statically-absent variable.
    pub fn bind(
        child: SqlIntercode,
        name: impl Into<String>,
        expression: SqlExpression,
    ) -> SqlIntercode {
        if child.is_no_solution() {
            return SqlIntercode::NoSolution;
        }

        let expression = {
            let accessor = SimpleVariableAccessor::new(child.variables());
            expression.optimize(&accessor)
        };
        if matches!(expression, SqlExpression::Null) {
            return child;
        }

        let name = name.into();
        let mut variables = child.variables().clone();
        variables.insert(UsedVariable::with_classes(
            &name,
            expression.possible_classes(),
            expression.can_return_null(),
        ));

        SqlIntercode::Bind {
            child: Box::new(child),
            name,
            expression,
            variables,
        }
    }

    /// An inline table. Per column, the class set is inferred from the
    /// cells present across all rows; a column missing from any row is
    /// nullable. A column with no cell at all stays out of the scope.
    pub fn values(
        columns: Vec<String>,
        rows: Vec<Vec<Option<SqlValuesCell>>>,
    ) -> SqlIntercode {
        if rows.is_empty() {
            return SqlIntercode::NoSolution;
        }

        let mut variables = UsedVariables::new();
        for (index, name) in columns.iter().enumerate() {
            let mut classes: Vec<ResourceClass> = Vec::new();
            let mut nullable = false;
            for row in &rows {
                match row.get(index).and_then(Option::as_ref) {
                    Some(cell) => {
                        if !classes.contains(&cell.class) {
                            classes.push(cell.class.clone());
                        }
                    }
                    None => nullable = true,
                }
            }
            if !classes.is_empty() {
                variables.insert(UsedVariable::with_classes(name, classes, nullable));
            }
        }

        // Rows binding nothing at all constrain nothing.
        if variables.is_empty() {
            return SqlIntercode::EmptySolution;
        }

        SqlIntercode::Values {
            columns,
            rows,
            variables,
        }
    }

    /// Grouping node. Group keys must already be bound in the child scope;
    /// keys missing from it are statically absent and stay out of the
    /// result scope.
    pub fn aggregation(
        child: SqlIntercode,
        group_keys: Vec<String>,
        aggregates: Vec<(String, SqlAggregate)>,
    ) -> SqlIntercode {
        if child.is_no_solution() && !group_keys.is_empty() {
            return SqlIntercode::NoSolution;
        }

        let mut variables = UsedVariables::new();
        for key in &group_keys {
            if let Some(variable) = child.variables().get(key) {
                variables.insert(variable.clone());
            }
        }
        for (name, aggregate) in &aggregates {
            variables.insert(aggregate_variable(name, aggregate));
        }

        SqlIntercode::Aggregation {
            child: Box::new(child),
            group_keys,
            aggregates,
            variables,
        }
    }

    /// A lateral call of an external procedure, binding its result columns
    /// as fresh variables.
    pub fn procedure_call(
        child: SqlIntercode,
        function: impl Into<String>,
        parameters: Vec<String>,
        results: Vec<(String, ResourceClass, String)>,
    ) -> SqlIntercode {
        if child.is_no_solution() {
            return SqlIntercode::NoSolution;
        }

        let mut variables = child.variables().clone();
        for (name, class, _) in &results {
            variables.insert(UsedVariable::new(name, class.clone(), false));
        }

        SqlIntercode::ProcedureCall {
            child: Box::new(child),
            function: function.into(),
            parameters,
            results,
            variables,
        }
    }

    /// The terminal projection node.
    ///
    /// `projection` may name variables the child never binds; they render
    /// as NULL result columns.
    pub fn select(
        child: SqlIntercode,
        projection: Vec<String>,
        distinct: bool,
        limit: Option<u64>,
        offset: Option<u64>,
        order: Vec<(String, OrderDirection)>,
    ) -> SqlIntercode {
        let variables = child.variables().clone();
        SqlIntercode::Select {
            child: Box::new(child),
            projection,
            distinct,
            limit,
            offset,
            order,
            variables,
        }
    }

    /// Rebuilds the tree bottom-up through the smart constructors, letting
    /// their simplifications apply to the whole tree again.
    pub fn optimize(self) -> SqlIntercode {
        match self {
            SqlIntercode::Join { lhs, rhs, .. } => {
                SqlIntercode::join(lhs.optimize(), rhs.optimize())
            }
            SqlIntercode::LeftJoin {
                lhs,
                rhs,
                conditions,
                ..
            } => SqlIntercode::left_join(lhs.optimize(), rhs.optimize(), conditions),
            SqlIntercode::Union { branches, .. } => {
                SqlIntercode::union(branches.into_iter().map(SqlIntercode::optimize).collect())
            }
            SqlIntercode::Minus { lhs, rhs, .. } => {
                SqlIntercode::minus(lhs.optimize(), rhs.optimize())
            }
            SqlIntercode::Filter {
                child, conditions, ..
            } => SqlIntercode::filter(child.optimize(), conditions),
            SqlIntercode::Bind {
                child,
                name,
                expression,
                ..
            } => SqlIntercode::bind(child.optimize(), name, expression),
            SqlIntercode::Aggregation {
                child,
                group_keys,
                aggregates,
                ..
            } => SqlIntercode::aggregation(child.optimize(), group_keys, aggregates),
            SqlIntercode::ProcedureCall {
                child,
                function,
                parameters,
                results,
                ..
            } => SqlIntercode::procedure_call(child.optimize(), function, parameters, results),
            SqlIntercode::Select {
                child,
                projection,
                distinct,
                limit,
                offset,
                order,
                ..
            } => SqlIntercode::select(child.optimize(), projection, distinct, limit, offset, order),
            leaf => leaf,
        }
    }

    /// Renders the node as a complete `SELECT` statement.
    pub fn translate(&self) -> String {
        match self {
            SqlIntercode::NoSolution => "SELECT 1 AS \"!\" WHERE false".to_owned(),
            SqlIntercode::EmptySolution => "SELECT 1 AS \"!\"".to_owned(),
            SqlIntercode::TableAccess {
                table,
                conditions,
                bindings,
                ..
            } => translate_table_access(table, conditions, bindings),
            SqlIntercode::Join {
                lhs,
                rhs,
                variables,
            } => translate_join(lhs, rhs, variables, None),
            SqlIntercode::LeftJoin {
                lhs,
                rhs,
                conditions,
                variables,
            } => translate_join(lhs, rhs, variables, Some(conditions)),
            SqlIntercode::Union {
                branches,
                variables,
            } => translate_union(branches, variables),
            SqlIntercode::Minus { lhs, rhs, .. } => translate_minus(lhs, rhs),
            SqlIntercode::Filter {
                child, conditions, ..
            } => translate_filter(child, conditions),
            SqlIntercode::Bind {
                child,
                name,
                expression,
                variables,
            } => translate_bind(child, name, expression, variables),
            SqlIntercode::Values {
                columns,
                rows,
                variables,
            } => translate_values(columns, rows, variables),
            SqlIntercode::Aggregation {
                child,
                group_keys,
                aggregates,
                variables,
            } => translate_aggregation(child, group_keys, aggregates, variables),
            SqlIntercode::ProcedureCall {
                child,
                function,
                parameters,
                results,
                ..
            } => translate_procedure_call(child, function, parameters, results),
            SqlIntercode::Select {
                child,
                projection,
                distinct,
                limit,
                offset,
                order,
                ..
            } => translate_select(child, projection, *distinct, *limit, *offset, order),
        }
    }
}

fn aggregate_variable(name: &str, aggregate: &SqlAggregate) -> UsedVariable {
    use sparql_rel_mapping::LiteralClass;

    match aggregate.function {
        AggregateFunction::Count => UsedVariable::new(
            name,
            ResourceClass::Literal(LiteralClass::Integer),
            false,
        ),
        AggregateFunction::GroupConcat => UsedVariable::new(
            name,
            ResourceClass::Literal(LiteralClass::String),
            aggregate
                .argument
                .as_ref()
                .is_some_and(SqlExpression::can_return_null),
        ),
        AggregateFunction::Sum | AggregateFunction::Avg => {
            let argument = aggregate.argument.as_ref();
            let classes = argument
                .map(SqlExpression::possible_classes)
                .unwrap_or_default();
            let numeric: Vec<ResourceClass> = classes
                .iter()
                .filter(|class| is_numeric_class(class))
                .cloned()
                .collect();
            let nullable = argument.is_some_and(SqlExpression::can_return_null)
                || numeric.len() != classes.len();
            match numeric.as_slice() {
                [class] => UsedVariable::new(name, class.clone(), nullable),
                // Mixed numeric encodings aggregate in one promoted column.
                _ => UsedVariable::new(name, ResourceClass::Literal(LiteralClass::Double), true),
            }
        }
        AggregateFunction::Min | AggregateFunction::Max | AggregateFunction::Sample => {
            let argument = aggregate.argument.as_ref();
            let classes = argument
                .map(SqlExpression::possible_classes)
                .unwrap_or_else(|| vec![ResourceClass::Literal(LiteralClass::Integer)]);
            UsedVariable::with_classes(
                name,
                classes,
                argument.is_some_and(SqlExpression::can_return_null),
            )
        }
    }
}

fn subselect(node: &SqlIntercode, alias: &str) -> String {
    format!("({}) AS {}", node.translate(), quote_identifier(alias))
}

fn side_column(alias: &str, name: &str, class: &ResourceClass, part: usize) -> String {
    format!(
        "{}.{}",
        quote_identifier(alias),
        quoted_variable_column(name, class, part)
    )
}

/// SQL testing that every encoding of `variable` is NULL on `alias`.
fn variable_is_null(alias: &str, variable: &UsedVariable) -> String {
    let terms = variable
        .classes()
        .iter()
        .map(|class| format!("{} IS NULL", side_column(alias, variable.name(), class, 0)))
        .join(" AND ");
    format!("({terms})")
}

/// SQL equating two sides of a shared variable over their shared classes.
fn variable_equality(
    left_alias: &str,
    right_alias: &str,
    left: &UsedVariable,
    right: &UsedVariable,
) -> String {
    let shared = left.shared_classes(right);
    if shared.is_empty() {
        return "false".to_owned();
    }

    let terms = shared
        .iter()
        .map(|class| {
            let parts = (0..class.part_count())
                .map(|part| {
                    format!(
                        "{} = {}",
                        side_column(left_alias, left.name(), class, part),
                        side_column(right_alias, right.name(), class, part)
                    )
                })
                .join(" AND ");
            format!("({parts})")
        })
        .join(" OR ");
    format!("({terms})")
}

/// The join compatibility condition of one shared variable: equal when both
/// bound, unconstrained when either side is unbound.
fn variable_compatibility(
    left_alias: &str,
    right_alias: &str,
    left: &UsedVariable,
    right: &UsedVariable,
) -> String {
    let equality = variable_equality(left_alias, right_alias, left, right);
    if !left.can_be_null() && !right.can_be_null() {
        return equality;
    }

    let mut terms = Vec::new();
    if left.can_be_null() {
        terms.push(variable_is_null(left_alias, left));
    }
    if right.can_be_null() {
        terms.push(variable_is_null(right_alias, right));
    }
    terms.push(equality);
    format!("({})", terms.join(" OR "))
}

fn translate_table_access(
    table: &Table,
    conditions: &[String],
    bindings: &[VariableBinding],
) -> String {
    let columns = if bindings.is_empty() {
        "1 AS \"!\"".to_owned()
    } else {
        bindings
            .iter()
            .flat_map(|binding| {
                binding.columns.iter().enumerate().map(|(part, column)| {
                    format!(
                        "{} AS {}",
                        column,
                        quoted_variable_column(&binding.name, &binding.class, part)
                    )
                })
            })
            .join(", ")
    };

    let mut sql = format!("SELECT {columns} FROM {table}");
    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }
    sql
}

fn translate_join(
    lhs: &SqlIntercode,
    rhs: &SqlIntercode,
    variables: &UsedVariables,
    left_join_conditions: Option<&[SqlExpression]>,
) -> String {
    let left_vars = lhs.variables();
    let right_vars = rhs.variables();

    let columns = variables
        .iter()
        .flat_map(|variable| {
            variable.classes().iter().flat_map(move |class| {
                (0..class.part_count()).map(move |part| {
                    let on_left = left_vars
                        .get(variable.name())
                        .is_some_and(|v| v.classes().contains(class));
                    let on_right = right_vars
                        .get(variable.name())
                        .is_some_and(|v| v.classes().contains(class));
                    let value = match (on_left, on_right) {
                        (true, true) => format!(
                            "COALESCE({}, {})",
                            side_column("#l", variable.name(), class, part),
                            side_column("#r", variable.name(), class, part)
                        ),
                        (true, false) => side_column("#l", variable.name(), class, part),
                        (false, _) => side_column("#r", variable.name(), class, part),
                    };
                    format!(
                        "{value} AS {}",
                        quoted_variable_column(variable.name(), class, part)
                    )
                })
            })
        })
        .join(", ");
    let columns = if columns.is_empty() {
        "1 AS \"!\"".to_owned()
    } else {
        columns
    };

    let mut on_terms: Vec<String> = left_vars
        .iter()
        .filter_map(|left| {
            right_vars
                .get(left.name())
                .map(|right| variable_compatibility("#l", "#r", left, right))
        })
        .collect();

    if let Some(conditions) = left_join_conditions {
        let accessor = LeftJoinVariableAccessor::new(left_vars, right_vars, "#l", "#r");
        on_terms.extend(conditions.iter().map(|c| c.translate_condition(&accessor)));
    }

    let on = if on_terms.is_empty() {
        "true".to_owned()
    } else {
        on_terms.join(" AND ")
    };

    let operator = if left_join_conditions.is_some() {
        "LEFT OUTER JOIN"
    } else {
        "INNER JOIN"
    };

    format!(
        "SELECT {columns} FROM {} {operator} {} ON {on}",
        subselect(lhs, "#l"),
        subselect(rhs, "#r")
    )
}

fn translate_union(branches: &[SqlIntercode], variables: &UsedVariables) -> String {
    branches
        .iter()
        .map(|branch| {
            let branch_vars = branch.variables();
            let columns = variables
                .iter()
                .flat_map(|variable| {
                    variable.classes().iter().flat_map(move |class| {
                        let present = branch_vars
                            .get(variable.name())
                            .is_some_and(|v| v.classes().contains(class));
                        let types = class.parts();
                        (0..class.part_count()).map(move |part| {
                            let value = if present {
                                side_column("#u", variable.name(), class, part)
                            } else {
                                format!("CAST(NULL AS {})", types[part])
                            };
                            format!(
                                "{value} AS {}",
                                quoted_variable_column(variable.name(), class, part)
                            )
                        })
                    })
                })
                .join(", ");
            let columns = if columns.is_empty() {
                "1 AS \"!\"".to_owned()
            } else {
                columns
            };
            format!("SELECT {columns} FROM {}", subselect(branch, "#u"))
        })
        .join(" UNION ALL ")
}

fn translate_minus(lhs: &SqlIntercode, rhs: &SqlIntercode) -> String {
    let left_vars = lhs.variables();
    let right_vars = rhs.variables();

    let shared: Vec<(&UsedVariable, &UsedVariable)> = left_vars
        .iter()
        .filter_map(|left| right_vars.get(left.name()).map(|right| (left, right)))
        .collect();

    let mut terms: Vec<String> = shared
        .iter()
        .map(|(left, right)| variable_compatibility("#l", "#r", left, right))
        .collect();

    // MINUS only removes rows sharing at least one bound variable pair.
    let any_bound = shared
        .iter()
        .map(|(left, right)| {
            if !left.can_be_null() && !right.can_be_null() {
                "true".to_owned()
            } else {
                format!(
                    "(NOT {} AND NOT {})",
                    variable_is_null("#l", left),
                    variable_is_null("#r", right)
                )
            }
        })
        .join(" OR ");
    terms.push(format!("({any_bound})"));

    format!(
        "SELECT \"#l\".* FROM {} WHERE NOT EXISTS (SELECT 1 FROM {} WHERE {})",
        subselect(lhs, "#l"),
        subselect(rhs, "#r"),
        terms.join(" AND ")
    )
}

fn translate_filter(child: &SqlIntercode, conditions: &[SqlExpression]) -> String {
    let accessor = SimpleVariableAccessor::new(child.variables());
    let condition = conditions
        .iter()
        .map(|c| c.translate_condition(&accessor))
        .join(" AND ");
    format!(
        "SELECT \"#t\".* FROM {} WHERE {condition}",
        subselect(child, "#t")
    )
}

fn translate_bind(
    child: &SqlIntercode,
    name: &str,
    expression: &SqlExpression,
    variables: &UsedVariables,
) -> String {
    let accessor = SimpleVariableAccessor::new(child.variables());
    let bound = variables
        .get(name)
        .expect("bind registers its variable");

    let columns = match bound.single_class() {
        Some(class) if expression.value_class().as_ref() == Some(class) => {
            let value = expression.translate(&accessor);
            match class.part_count() {
                1 => vec![format!(
                    "{value} AS {}",
                    quoted_variable_column(name, class, 0)
                )],
                _ => {
                    // Multi-part single-class values round-trip through the box.
                    let boxed = expression.translate_boxed(&accessor);
                    extraction_columns(name, class, &boxed)
                }
            }
        }
        _ => {
            let boxed = expression.translate_boxed(&accessor);
            bound
                .classes()
                .iter()
                .flat_map(|class| extraction_columns(name, class, &boxed))
                .collect()
        }
    };

    format!(
        "SELECT \"#t\".*, {} FROM {}",
        columns.join(", "),
        subselect(child, "#t")
    )
}

fn extraction_columns(name: &str, class: &ResourceClass, boxed: &str) -> Vec<String> {
    class
        .extract_code(boxed)
        .into_iter()
        .enumerate()
        .map(|(part, code)| format!("{code} AS {}", quoted_variable_column(name, class, part)))
        .collect()
}

fn translate_values(
    columns: &[String],
    rows: &[Vec<Option<SqlValuesCell>>],
    variables: &UsedVariables,
) -> String {
    let mut aliases = Vec::new();
    let mut cells_of = Vec::new();
    for name in columns {
        if let Some(variable) = variables.get(name) {
            for class in variable.classes() {
                for part in 0..class.part_count() {
                    aliases.push(quoted_variable_column(name, class, part));
                    cells_of.push((name.clone(), class.clone(), part));
                }
            }
        }
    }

    let rendered_rows = rows
        .iter()
        .map(|row| {
            let entries = cells_of
                .iter()
                .map(|(name, class, part)| {
                    let index = columns.iter().position(|c| c == name);
                    let cell = index.and_then(|i| row.get(i)).and_then(Option::as_ref);
                    match cell {
                        Some(cell) if cell.class == *class => cell.parts[*part].clone(),
                        _ => format!("CAST(NULL AS {})", class.parts()[*part]),
                    }
                })
                .join(", ");
            format!("({entries})")
        })
        .join(", ");

    format!(
        "SELECT \"#t\".* FROM (VALUES {rendered_rows}) AS \"#t\"({})",
        aliases.join(", ")
    )
}

fn translate_aggregation(
    child: &SqlIntercode,
    group_keys: &[String],
    aggregates: &[(String, SqlAggregate)],
    variables: &UsedVariables,
) -> String {
    let accessor = SimpleVariableAccessor::new(child.variables());
    let mut columns = Vec::new();
    let mut group_columns = Vec::new();

    for key in group_keys {
        if let Some(variable) = child.variables().get(key) {
            for class in variable.classes() {
                for part in 0..class.part_count() {
                    let column = quoted_variable_column(key, class, part);
                    columns.push(column.clone());
                    group_columns.push(column);
                }
            }
        }
    }

    for (name, aggregate) in aggregates {
        let Some(variable) = variables.get(name) else {
            continue;
        };
        columns.extend(translate_aggregate(name, aggregate, variable, &accessor));
    }

    let mut sql = format!(
        "SELECT {} FROM {}",
        columns.join(", "),
        subselect(child, "#t")
    );
    if !group_columns.is_empty() {
        sql.push_str(" GROUP BY ");
        sql.push_str(&group_columns.join(", "));
    }
    sql
}

fn translate_aggregate(
    name: &str,
    aggregate: &SqlAggregate,
    variable: &UsedVariable,
    accessor: &SimpleVariableAccessor<'_>,
) -> Vec<String> {
    let distinct = if aggregate.distinct { "DISTINCT " } else { "" };

    match aggregate.function {
        AggregateFunction::Count => {
            let class = &variable.classes()[0];
            let value = match &aggregate.argument {
                None => "count(*)".to_owned(),
                Some(argument) => {
                    format!("count({distinct}{})", argument.translate_boxed(accessor))
                }
            };
            vec![format!(
                "{value} AS {}",
                quoted_variable_column(name, class, 0)
            )]
        }
        AggregateFunction::GroupConcat => {
            let class = &variable.classes()[0];
            let separator = quote_string_literal(aggregate.separator.as_deref().unwrap_or(" "));
            let argument = aggregate
                .argument
                .as_ref()
                .expect("GROUP_CONCAT carries an argument");
            vec![format!(
                "string_agg({distinct}{}, {separator}) AS {}",
                argument.translate_string(accessor),
                quoted_variable_column(name, class, 0)
            )]
        }
        AggregateFunction::Sum | AggregateFunction::Avg => {
            let function = match aggregate.function {
                AggregateFunction::Sum => "sum",
                _ => "avg",
            };
            let class = &variable.classes()[0];
            let argument = aggregate
                .argument
                .as_ref()
                .expect("only COUNT may omit its argument");
            vec![format!(
                "{function}({distinct}{}) AS {}",
                numeric_value(argument, class, accessor),
                quoted_variable_column(name, class, 0)
            )]
        }
        _ => {
            let function = match aggregate.function {
                AggregateFunction::Min | AggregateFunction::Sample => "min",
                AggregateFunction::Max => "max",
                _ => unreachable!("handled above"),
            };
            let argument = aggregate
                .argument
                .as_ref()
                .expect("only COUNT may omit its argument");

            variable
                .classes()
                .iter()
                .flat_map(|class| {
                    let values = per_class_values(argument, class, accessor);
                    values.into_iter().enumerate().map(move |(part, value)| {
                        format!(
                            "{function}({distinct}{value}) AS {}",
                            quoted_variable_column(name, class, part)
                        )
                    })
                })
                .collect()
        }
    }
}

/// One numeric value per input row of a SUM/AVG argument, rendered in the
/// target class.
///
/// At most one encoding of a variable is bound per input row, so the
/// row-level COALESCE over the casted encodings is exact; casting before
/// grouping keeps the whole aggregate a single column when the argument
/// carries mixed numeric encodings.
fn numeric_value(
    argument: &SqlExpression,
    class: &ResourceClass,
    accessor: &dyn VariableAccessor,
) -> String {
    if argument.value_class().as_ref() == Some(class) {
        return argument.translate(accessor);
    }

    let target = &class.parts()[0];
    let values: Vec<String> = argument
        .possible_classes()
        .iter()
        .filter(|candidate| is_numeric_class(candidate))
        .map(|candidate| {
            let value = per_class_values(argument, candidate, accessor).remove(0);
            if candidate == class {
                value
            } else {
                format!("{value}::{target}")
            }
        })
        .collect();

    match values.as_slice() {
        [] => class
            .extract_code(&argument.translate_boxed(accessor))
            .remove(0),
        [single] => single.clone(),
        _ => format!("COALESCE({})", values.join(", ")),
    }
}

/// The per-part values of an aggregate argument in one class encoding.
fn per_class_values(
    argument: &SqlExpression,
    class: &ResourceClass,
    accessor: &dyn VariableAccessor,
) -> Vec<String> {
    if argument.value_class().as_ref() == Some(class) && class.part_count() == 1 {
        return vec![argument.translate(accessor)];
    }
    if let SqlExpression::Variable { name, classes, .. } = argument {
        if classes.contains(class) {
            return (0..class.part_count())
                .map(|part| accessor.column_ref(name, class, part))
                .collect();
        }
    }
    class.extract_code(&argument.translate_boxed(accessor))
}

fn translate_procedure_call(
    child: &SqlIntercode,
    function: &str,
    parameters: &[String],
    results: &[(String, ResourceClass, String)],
) -> String {
    let result_aliases = results
        .iter()
        .map(|(_, _, column)| quote_identifier(column))
        .join(", ");
    let result_columns = results
        .iter()
        .map(|(name, class, column)| {
            format!(
                "\"#p\".{} AS {}",
                quote_identifier(column),
                quoted_variable_column(name, class, 0)
            )
        })
        .join(", ");

    format!(
        "SELECT \"#t\".*, {result_columns} FROM {}, LATERAL {function}({}) AS \"#p\"({result_aliases})",
        subselect(child, "#t"),
        parameters.join(", ")
    )
}

fn translate_select(
    child: &SqlIntercode,
    projection: &[String],
    distinct: bool,
    limit: Option<u64>,
    offset: Option<u64>,
    order: &[(String, OrderDirection)],
) -> String {
    let child_vars = child.variables();
    let accessor = SimpleVariableAccessor::new(child_vars);

    let columns = if projection.is_empty() {
        "1 AS \"!\"".to_owned()
    } else {
        projection
            .iter()
            .map(|name| {
                let result = match child_vars.get(name) {
                    None => "NULL".to_owned(),
                    Some(variable) => result_value(variable, &accessor),
                };
                format!("{result} AS {}", quote_identifier(name))
            })
            .join(", ")
    };

    let mut sql = format!(
        "SELECT {}{columns} FROM {}",
        if distinct { "DISTINCT " } else { "" },
        subselect(child, "#t")
    );

    let order_terms = order
        .iter()
        .filter_map(|(name, direction)| {
            child_vars.get(name).map(|variable| {
                let value = match variable.single_class() {
                    Some(class) if class.part_count() == 1 => {
                        accessor.column_ref(name, class, 0)
                    }
                    _ => boxed_variable(&accessor, name, variable.classes()),
                };
                let direction = match direction {
                    OrderDirection::Ascending => "ASC",
                    OrderDirection::Descending => "DESC",
                };
                format!("{value} {direction}")
            })
        })
        .join(", ");
    if !order_terms.is_empty() {
        sql.push_str(" ORDER BY ");
        sql.push_str(&order_terms);
    }

    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }
    if let Some(offset) = offset {
        sql.push_str(&format!(" OFFSET {offset}"));
    }
    sql
}

/// The final result expression of one projected variable.
fn result_value(variable: &UsedVariable, accessor: &dyn VariableAccessor) -> String {
    match variable.single_class() {
        Some(class) if class.part_count() == 1 => {
            let column = accessor.column_ref(variable.name(), class, 0);
            class.result_code(&[column])
        }
        _ => boxed_variable(accessor, variable.name(), variable.classes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sparql_rel_mapping::LiteralClass;

    fn access(name: &str, var: &str, class: ResourceClass, column: &str) -> SqlIntercode {
        SqlIntercode::table_access(
            Table::new(name),
            Vec::new(),
            vec![VariableBinding::new(
                var,
                class,
                vec![Column::Table(column.to_owned())],
            )],
        )
    }

    #[test]
    fn join_with_no_solution_is_empty() {
        let left = access("t", "s", ResourceClass::Iri, "iri");
        let joined = SqlIntercode::join(left, SqlIntercode::NoSolution);
        assert!(joined.is_no_solution());
    }

    #[test]
    fn empty_solution_is_the_join_identity() {
        let left = access("t", "s", ResourceClass::Iri, "iri");
        let joined = SqlIntercode::join(SqlIntercode::EmptySolution, left.clone());
        assert_eq!(joined.translate(), left.translate());
    }

    #[test]
    fn disjoint_join_keeps_both_scopes_unchanged() {
        let left = access("a", "x", ResourceClass::Iri, "ca");
        let right = access(
            "b",
            "y",
            ResourceClass::Literal(LiteralClass::Integer),
            "cb",
        );

        let joined = SqlIntercode::join(left, right);
        let variables = joined.variables();
        assert_eq!(variables.len(), 2);
        assert!(!variables.get("x").unwrap().can_be_null());
        assert!(!variables.get("y").unwrap().can_be_null());
        assert!(joined.translate().contains("ON true"));
    }

    #[test]
    fn incompatible_shared_classes_make_the_join_empty() {
        let left = access("a", "x", ResourceClass::Iri, "ca");
        let right = access("b", "x", ResourceClass::Literal(LiteralClass::Integer), "cb");
        assert!(SqlIntercode::join(left, right).is_no_solution());
    }

    #[test]
    fn left_join_marks_optional_variables_nullable() {
        let left = access("a", "x", ResourceClass::Iri, "ca");
        let mut right = access("b", "x", ResourceClass::Iri, "cb");
        if let SqlIntercode::TableAccess { bindings, variables, .. } = &mut right {
            bindings.push(VariableBinding::new(
                "o",
                ResourceClass::Literal(LiteralClass::Integer),
                vec![Column::Table("co".to_owned())],
            ));
            variables.insert(UsedVariable::new(
                "o",
                ResourceClass::Literal(LiteralClass::Integer),
                false,
            ));
        }

        let joined = SqlIntercode::left_join(left, right, Vec::new());
        let variables = joined.variables();
        assert!(!variables.get("x").unwrap().can_be_null());
        assert!(variables.get("o").unwrap().can_be_null());
    }

    #[test]
    fn unsatisfiable_optional_degenerates_to_the_left_tree() {
        let left = access("a", "x", ResourceClass::Iri, "ca");
        let right = access("b", "o", ResourceClass::Iri, "cb");
        let joined =
            SqlIntercode::left_join(left.clone(), right, vec![SqlExpression::False]);
        assert_eq!(joined.translate(), left.translate());
    }

    #[test]
    fn union_merges_scopes_and_marks_one_sided_variables_nullable() {
        let left = access("a", "x", ResourceClass::Iri, "ca");
        let right = access("b", "y", ResourceClass::Iri, "cb");

        let union = SqlIntercode::union(vec![left, right]);
        let names: Vec<_> = union.variables().names().map(str::to_owned).collect();
        assert_eq!(names, vec!["x".to_owned(), "y".to_owned()]);
        assert!(union.variables().get("x").unwrap().can_be_null());
        assert!(union.variables().get("y").unwrap().can_be_null());
    }

    #[test]
    fn union_without_branches_is_no_solution() {
        assert!(SqlIntercode::union(Vec::new()).is_no_solution());
        assert!(SqlIntercode::union(vec![SqlIntercode::NoSolution]).is_no_solution());
    }

    #[test]
    fn minus_without_shared_variables_is_dropped() {
        let left = access("a", "x", ResourceClass::Iri, "ca");
        let right = access("b", "y", ResourceClass::Iri, "cb");
        let result = SqlIntercode::minus(left.clone(), right);
        assert_eq!(result.translate(), left.translate());
    }

    #[test]
    fn statically_false_filter_short_circuits() {
        let child = access("a", "x", ResourceClass::Iri, "ca");
        let filtered = SqlIntercode::filter(child, vec![SqlExpression::False]);
        assert!(filtered.is_no_solution());
    }

    #[test]
    fn statically_true_filter_is_dropped() {
        let child = access("a", "x", ResourceClass::Iri, "ca");
        let filtered = SqlIntercode::filter(child.clone(), vec![SqlExpression::True]);
        assert_eq!(filtered.translate(), child.translate());
    }

    #[test]
    fn filter_distributes_over_union_branches() {
        let left = access("a", "x", ResourceClass::Iri, "ca");
        let right = access("b", "x", ResourceClass::Literal(LiteralClass::Integer), "cb");
        let union = SqlIntercode::union(vec![left, right]);

        // The condition types only against the integer branch; the IRI
        // branch folds away entirely.
        let condition = SqlExpression::Binary {
            operator: sparql_rel_model::BinaryOperator::GreaterThan,
            lhs: Box::new(SqlExpression::Variable {
                name: "x".to_owned(),
                classes: vec![ResourceClass::Literal(LiteralClass::Integer)],
                can_be_null: false,
            }),
            rhs: Box::new(SqlExpression::Constant {
                class: ResourceClass::Literal(LiteralClass::Integer),
                parts: vec!["'5'::bigint".to_owned()],
            }),
        };

        let filtered = SqlIntercode::filter(union, vec![condition]);
        match &filtered {
            SqlIntercode::Filter { child, .. } => {
                assert!(matches!(**child, SqlIntercode::TableAccess { .. }));
            }
            other => panic!("expected a filter over a single branch, got {other:?}"),
        }
    }
}
