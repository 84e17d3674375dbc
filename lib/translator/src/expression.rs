use crate::accessor::VariableAccessor;
use crate::error::{Diagnostic, ErrorKind};
use itertools::Itertools;
use sparql_rel_mapping::{quote_string_literal, LiteralClass, ResourceClass};
use sparql_rel_model::{
    BinaryOperator, BuiltInFunction, Expression, Literal, NamedNode, UnaryOperator,
};

/// The expression intermediate form.
///
/// Constants carry their resource class and the SQL text of each encoding
/// part; variables carry the scope state captured when the expression was
/// built. Rendering goes through a [`VariableAccessor`], so the same tree
/// translates correctly in a plain `WHERE` clause and in a join condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlExpression {
    /// A statically-known absent value, distinct from a runtime-unbound
    /// variable.
    Null,
    True,
    False,
    Constant {
        class: ResourceClass,
        parts: Vec<String>,
    },
    Variable {
        name: String,
        classes: Vec<ResourceClass>,
        can_be_null: bool,
    },
    Unary {
        operator: UnaryOperator,
        operand: Box<SqlExpression>,
    },
    Binary {
        operator: BinaryOperator,
        lhs: Box<SqlExpression>,
        rhs: Box<SqlExpression>,
    },
    Function {
        function: BuiltInFunction,
        arguments: Vec<SqlExpression>,
    },
}

fn function_sql_name(function: BuiltInFunction) -> &'static str {
    match function {
        BuiltInFunction::Str => "str",
        BuiltInFunction::Lang => "lang",
        BuiltInFunction::Datatype => "datatype",
        BuiltInFunction::Bound => "bound",
        BuiltInFunction::Iri => "iri",
        BuiltInFunction::Abs => "abs",
        BuiltInFunction::Ceil => "ceil",
        BuiltInFunction::Floor => "floor",
        BuiltInFunction::Round => "round",
        BuiltInFunction::Concat => "concat",
        BuiltInFunction::StrLen => "strlen",
        BuiltInFunction::UCase => "ucase",
        BuiltInFunction::LCase => "lcase",
        BuiltInFunction::Contains => "contains",
        BuiltInFunction::StrStarts => "strstarts",
        BuiltInFunction::StrEnds => "strends",
        BuiltInFunction::Regex => "regex",
        BuiltInFunction::If => "if",
        BuiltInFunction::Coalesce => "coalesce",
        BuiltInFunction::IsIri => "isiri",
        BuiltInFunction::IsBlank => "isblank",
        BuiltInFunction::IsLiteral => "isliteral",
        BuiltInFunction::IsNumeric => "isnumeric",
    }
}

fn comparison_symbol(operator: BinaryOperator) -> &'static str {
    match operator {
        BinaryOperator::Equals => "=",
        BinaryOperator::NotEquals => "<>",
        BinaryOperator::LessThan => "<",
        BinaryOperator::LessThanOrEqual => "<=",
        BinaryOperator::GreaterThan => ">",
        BinaryOperator::GreaterThanOrEqual => ">=",
        _ => unreachable!("not a comparison operator"),
    }
}

fn arithmetic_symbol(operator: BinaryOperator) -> &'static str {
    match operator {
        BinaryOperator::Add => "+",
        BinaryOperator::Subtract => "-",
        BinaryOperator::Multiply => "*",
        BinaryOperator::Divide => "/",
        _ => unreachable!("not an arithmetic operator"),
    }
}

fn arithmetic_function(operator: BinaryOperator) -> &'static str {
    match operator {
        BinaryOperator::Add => "sparql.rdfbox_add",
        BinaryOperator::Subtract => "sparql.rdfbox_sub",
        BinaryOperator::Multiply => "sparql.rdfbox_mul",
        BinaryOperator::Divide => "sparql.rdfbox_div",
        _ => unreachable!("not an arithmetic operator"),
    }
}

/// Builds the intercode of a literal constant, classifying it by language
/// tag and datatype. Boolean literals fold to the boolean constants.
pub fn literal_constant(literal: &Literal) -> SqlExpression {
    if let Some(tag) = literal.language() {
        return SqlExpression::Constant {
            class: ResourceClass::LangString(tag.to_owned()),
            parts: vec![format!("{}::varchar", quote_string_literal(literal.value()))],
        };
    }

    match LiteralClass::from_datatype(literal.datatype().as_str()) {
        Some(LiteralClass::Boolean) if literal.value() == "true" => SqlExpression::True,
        Some(LiteralClass::Boolean) if literal.value() == "false" => SqlExpression::False,
        Some(class) => SqlExpression::Constant {
            class: ResourceClass::Literal(class),
            parts: vec![format!(
                "{}::{}",
                quote_string_literal(literal.value()),
                class.sql_type()
            )],
        },
        None => SqlExpression::Constant {
            class: ResourceClass::UnsupportedLiteral,
            parts: vec![
                format!("{}::varchar", quote_string_literal(literal.value())),
                format!(
                    "{}::varchar",
                    quote_string_literal(literal.datatype().as_str())
                ),
            ],
        },
    }
}

/// Builds the intercode of an IRI constant.
///
/// IRI constants always carry the common IRI class. A comparison against a
/// map-backed user class still works: the boxed form of a user-class
/// variable reconstructs the full IRI text.
pub fn iri_constant(iri: &NamedNode) -> SqlExpression {
    SqlExpression::Constant {
        class: ResourceClass::Iri,
        parts: vec![format!("{}::varchar", quote_string_literal(iri.as_str()))],
    }
}

/// Lowers a query expression into the intercode under the given scope.
///
/// Aggregate calls are rewritten to synthetic variables before expressions
/// reach this point; one surviving here is in a non-aggregating context and
/// reported as such.
pub fn build_expression(
    expression: &Expression,
    accessor: &dyn VariableAccessor,
    errors: &mut Vec<Diagnostic>,
) -> SqlExpression {
    match expression {
        Expression::Variable(variable) => match accessor.variable(variable.as_str()) {
            Some(used) => SqlExpression::Variable {
                name: used.name().to_owned(),
                classes: used.classes().to_vec(),
                can_be_null: used.can_be_null(),
            },
            None => SqlExpression::Null,
        },
        Expression::Literal(literal) => literal_constant(literal),
        Expression::Iri(iri) => iri_constant(iri),
        Expression::Unary { operator, operand } => SqlExpression::Unary {
            operator: *operator,
            operand: Box::new(build_expression(operand, accessor, errors)),
        },
        Expression::Binary { operator, lhs, rhs } => SqlExpression::Binary {
            operator: *operator,
            lhs: Box::new(build_expression(lhs, accessor, errors)),
            rhs: Box::new(build_expression(rhs, accessor, errors)),
        },
        Expression::Call {
            function,
            arguments,
            ..
        } => SqlExpression::Function {
            function: *function,
            arguments: arguments
                .iter()
                .map(|a| build_expression(a, accessor, errors))
                .collect(),
        },
        Expression::Aggregate { range, .. } => {
            errors.push(Diagnostic::new(
                ErrorKind::InvalidContextOfAggregate,
                *range,
                "aggregate function used outside an aggregating context",
            ));
            SqlExpression::Null
        }
    }
}

impl SqlExpression {
    /// Whether the expression statically never selects a row when used as a
    /// filter condition.
    pub fn is_always_false_or_null(&self) -> bool {
        matches!(self, SqlExpression::Null | SqlExpression::False)
    }

    /// The single resource class of the value, when statically known.
    pub fn value_class(&self) -> Option<ResourceClass> {
        match self {
            SqlExpression::Null => None,
            SqlExpression::True | SqlExpression::False => {
                Some(ResourceClass::Literal(LiteralClass::Boolean))
            }
            SqlExpression::Constant { class, .. } => Some(class.clone()),
            SqlExpression::Variable { classes, .. } => match classes.as_slice() {
                [class] => Some(class.clone()),
                _ => None,
            },
            SqlExpression::Unary {
                operator: UnaryOperator::Plus | UnaryOperator::Minus,
                operand,
            } => operand.value_class().filter(is_numeric_class),
            SqlExpression::Unary {
                operator: UnaryOperator::Not,
                ..
            } => Some(ResourceClass::Literal(LiteralClass::Boolean)),
            SqlExpression::Binary { operator, lhs, rhs } => {
                if operator.is_comparison()
                    || matches!(operator, BinaryOperator::And | BinaryOperator::Or)
                {
                    Some(ResourceClass::Literal(LiteralClass::Boolean))
                } else {
                    match (lhs.value_class(), rhs.value_class()) {
                        (Some(l), Some(r)) if l == r && is_numeric_class(&l) => Some(l),
                        _ => None,
                    }
                }
            }
            SqlExpression::Function { function, .. } => match function {
                BuiltInFunction::Str
                | BuiltInFunction::Lang
                | BuiltInFunction::Concat
                | BuiltInFunction::UCase
                | BuiltInFunction::LCase => Some(ResourceClass::Literal(LiteralClass::String)),
                BuiltInFunction::StrLen => Some(ResourceClass::Literal(LiteralClass::Integer)),
                BuiltInFunction::Bound
                | BuiltInFunction::Contains
                | BuiltInFunction::StrStarts
                | BuiltInFunction::StrEnds
                | BuiltInFunction::Regex
                | BuiltInFunction::IsIri
                | BuiltInFunction::IsBlank
                | BuiltInFunction::IsLiteral
                | BuiltInFunction::IsNumeric => Some(ResourceClass::Literal(LiteralClass::Boolean)),
                BuiltInFunction::Iri | BuiltInFunction::Datatype => Some(ResourceClass::Iri),
                _ => None,
            },
        }
    }

    fn is_boolean_kind(&self) -> bool {
        self.value_class() == Some(ResourceClass::Literal(LiteralClass::Boolean))
    }

    /// The resource classes the value may hold, for scope registration of a
    /// bound variable. Falls back to the full set of expressible classes
    /// when no tighter bound is statically known.
    pub fn possible_classes(&self) -> Vec<ResourceClass> {
        if let Some(class) = self.value_class() {
            return vec![class];
        }

        match self {
            SqlExpression::Variable { classes, .. } => classes.clone(),
            SqlExpression::Binary { operator, .. } if !operator.is_comparison() => vec![
                ResourceClass::Literal(LiteralClass::Integer),
                ResourceClass::Literal(LiteralClass::Decimal),
                ResourceClass::Literal(LiteralClass::Double),
            ],
            SqlExpression::Function {
                function: BuiltInFunction::If,
                arguments,
            } => {
                let mut classes = arguments[1].possible_classes();
                for class in arguments[2].possible_classes() {
                    if !classes.contains(&class) {
                        classes.push(class);
                    }
                }
                classes
            }
            SqlExpression::Function {
                function: BuiltInFunction::Coalesce,
                arguments,
            } => {
                let mut classes = Vec::new();
                for argument in arguments {
                    for class in argument.possible_classes() {
                        if !classes.contains(&class) {
                            classes.push(class);
                        }
                    }
                }
                classes
            }
            _ => vec![
                ResourceClass::Iri,
                ResourceClass::Literal(LiteralClass::Boolean),
                ResourceClass::Literal(LiteralClass::Integer),
                ResourceClass::Literal(LiteralClass::Decimal),
                ResourceClass::Literal(LiteralClass::Double),
                ResourceClass::Literal(LiteralClass::String),
                ResourceClass::Literal(LiteralClass::Date),
                ResourceClass::Literal(LiteralClass::DateTime),
                ResourceClass::UnsupportedLiteral,
            ],
        }
    }

    /// Whether the evaluated value may be NULL at runtime.
    pub fn can_return_null(&self) -> bool {
        match self {
            SqlExpression::True | SqlExpression::False | SqlExpression::Constant { .. } => false,
            SqlExpression::Null => true,
            SqlExpression::Variable { can_be_null, .. } => *can_be_null,
            _ => true,
        }
    }

    /// Constant folding and scope refresh under the given accessor.
    ///
    /// Returns a new tree; the input is never mutated.
    pub fn optimize(&self, accessor: &dyn VariableAccessor) -> SqlExpression {
        match self {
            SqlExpression::Variable { name, .. } => match accessor.variable(name) {
                Some(used) => SqlExpression::Variable {
                    name: used.name().to_owned(),
                    classes: used.classes().to_vec(),
                    can_be_null: used.can_be_null(),
                },
                None => SqlExpression::Null,
            },
            SqlExpression::Unary { operator, operand } => {
                let operand = operand.optimize(accessor);
                match (operator, &operand) {
                    (UnaryOperator::Not, SqlExpression::True) => SqlExpression::False,
                    (UnaryOperator::Not, SqlExpression::False) => SqlExpression::True,
                    (_, SqlExpression::Null) => SqlExpression::Null,
                    _ => SqlExpression::Unary {
                        operator: *operator,
                        operand: Box::new(operand),
                    },
                }
            }
            SqlExpression::Binary { operator, lhs, rhs } => {
                let lhs = lhs.optimize(accessor);
                let rhs = rhs.optimize(accessor);
                Self::optimize_binary(*operator, lhs, rhs)
            }
            SqlExpression::Function {
                function,
                arguments,
            } => {
                let arguments: Vec<_> = arguments.iter().map(|a| a.optimize(accessor)).collect();
                if *function == BuiltInFunction::Bound {
                    match arguments.first() {
                        Some(SqlExpression::Null) => return SqlExpression::False,
                        Some(SqlExpression::Variable { can_be_null, .. }) if !can_be_null => {
                            return SqlExpression::True
                        }
                        _ => {}
                    }
                }
                SqlExpression::Function {
                    function: *function,
                    arguments,
                }
            }
            _ => self.clone(),
        }
    }

    /// Whether two values can never hold comparable terms. IRI-kind classes
    /// are mutually comparable since they all carry IRIs; literal classes
    /// compare only within the same class or between numerics.
    fn statically_incomparable(lhs: &SqlExpression, rhs: &SqlExpression) -> bool {
        let (Some(l), Some(r)) = (lhs.value_class(), rhs.value_class()) else {
            return false;
        };
        if l == r {
            return false;
        }
        if l.is_iri_kind() && r.is_iri_kind() {
            return false;
        }
        if is_numeric_class(&l) && is_numeric_class(&r) {
            return false;
        }
        true
    }

    fn optimize_binary(
        operator: BinaryOperator,
        lhs: SqlExpression,
        rhs: SqlExpression,
    ) -> SqlExpression {
        use SqlExpression::{False, Null, True};

        match operator {
            BinaryOperator::And => match (&lhs, &rhs) {
                (False, _) | (_, False) => False,
                (Null, _) | (_, Null) => Null,
                (True, _) => rhs,
                (_, True) => lhs,
                _ => SqlExpression::Binary {
                    operator,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
            },
            BinaryOperator::Or => match (&lhs, &rhs) {
                (True, _) | (_, True) => True,
                (Null, _) | (_, Null) => Null,
                (False, _) => rhs,
                (_, False) => lhs,
                _ => SqlExpression::Binary {
                    operator,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
            },
            BinaryOperator::Equals | BinaryOperator::NotEquals => match (&lhs, &rhs) {
                (Null, _) | (_, Null) => Null,
                (
                    SqlExpression::Constant {
                        class: lc,
                        parts: lp,
                    },
                    SqlExpression::Constant {
                        class: rc,
                        parts: rp,
                    },
                ) if lc == rc => {
                    let equal = lp == rp;
                    if equal == (operator == BinaryOperator::Equals) {
                        True
                    } else {
                        False
                    }
                }
                _ => match Self::statically_incomparable(&lhs, &rhs) {
                    // Distinct term kinds never compare equal.
                    true if operator == BinaryOperator::Equals => False,
                    true => True,
                    false => SqlExpression::Binary {
                        operator,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    },
                },
            },
            _ if operator.is_comparison() => match (&lhs, &rhs) {
                (Null, _) | (_, Null) => Null,
                // Ordering values of unrelated classes is a type error.
                _ if Self::statically_incomparable(&lhs, &rhs) => Null,
                _ => SqlExpression::Binary {
                    operator,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
            },
            _ => match (&lhs, &rhs) {
                (Null, _) | (_, Null) => Null,
                _ => SqlExpression::Binary {
                    operator,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
            },
        }
    }

    /// Renders the expression as an SQL value.
    ///
    /// Boolean-kind trees render as SQL booleans; values without a single
    /// statically-known class render in the boxed representation.
    pub fn translate(&self, accessor: &dyn VariableAccessor) -> String {
        match self {
            SqlExpression::Null => "NULL".to_owned(),
            SqlExpression::True => "true".to_owned(),
            SqlExpression::False => "false".to_owned(),
            SqlExpression::Constant { class, parts } => {
                if parts.len() == 1 {
                    parts[0].clone()
                } else {
                    class.box_code(parts)
                }
            }
            SqlExpression::Variable { name, classes, .. } => match classes.as_slice() {
                [class] if class.part_count() == 1 => accessor.column_ref(name, class, 0),
                _ => boxed_variable(accessor, name, classes),
            },
            SqlExpression::Unary { operator, operand } => match operator {
                UnaryOperator::Not => format!("NOT({})", operand.translate_condition(accessor)),
                UnaryOperator::Plus => operand.translate(accessor),
                UnaryOperator::Minus => format!("-({})", operand.translate(accessor)),
            },
            SqlExpression::Binary { operator, lhs, rhs } => match operator {
                BinaryOperator::And => format!(
                    "({} AND {})",
                    lhs.translate_condition(accessor),
                    rhs.translate_condition(accessor)
                ),
                BinaryOperator::Or => format!(
                    "({} OR {})",
                    lhs.translate_condition(accessor),
                    rhs.translate_condition(accessor)
                ),
                _ if operator.is_comparison() => Self::translate_comparison(
                    *operator, lhs, rhs, accessor,
                ),
                _ => match (lhs.value_class(), rhs.value_class()) {
                    (Some(l), Some(r)) if is_numeric_class(&l) && is_numeric_class(&r) => {
                        format!(
                            "({} {} {})",
                            lhs.translate(accessor),
                            arithmetic_symbol(*operator),
                            rhs.translate(accessor)
                        )
                    }
                    _ => format!(
                        "{}({}, {})",
                        arithmetic_function(*operator),
                        lhs.translate_boxed(accessor),
                        rhs.translate_boxed(accessor)
                    ),
                },
            },
            SqlExpression::Function {
                function,
                arguments,
            } => Self::translate_function(*function, arguments, accessor),
        }
    }

    fn translate_comparison(
        operator: BinaryOperator,
        lhs: &SqlExpression,
        rhs: &SqlExpression,
        accessor: &dyn VariableAccessor,
    ) -> String {
        let symbol = comparison_symbol(operator);

        match (lhs.value_class(), rhs.value_class()) {
            (Some(l), Some(r)) if l == r && l.part_count() == 1 => format!(
                "({} {} {})",
                lhs.translate(accessor),
                symbol,
                rhs.translate(accessor)
            ),
            _ => match operator {
                BinaryOperator::Equals => format!(
                    "sparql.rdfbox_eq({}, {})",
                    lhs.translate_boxed(accessor),
                    rhs.translate_boxed(accessor)
                ),
                BinaryOperator::NotEquals => format!(
                    "NOT sparql.rdfbox_eq({}, {})",
                    lhs.translate_boxed(accessor),
                    rhs.translate_boxed(accessor)
                ),
                _ => format!(
                    "(sparql.rdfbox_compare({}, {}) {} 0)",
                    lhs.translate_boxed(accessor),
                    rhs.translate_boxed(accessor),
                    symbol
                ),
            },
        }
    }

    fn translate_function(
        function: BuiltInFunction,
        arguments: &[SqlExpression],
        accessor: &dyn VariableAccessor,
    ) -> String {
        let string_class = ResourceClass::Literal(LiteralClass::String);

        match function {
            BuiltInFunction::Bound => match arguments.first() {
                Some(SqlExpression::Variable {
                    name,
                    classes,
                    can_be_null,
                }) => {
                    if !can_be_null {
                        "true".to_owned()
                    } else {
                        format!(
                            "({})",
                            classes
                                .iter()
                                .map(|class| {
                                    format!("{} IS NOT NULL", accessor.column_ref(name, class, 0))
                                })
                                .join(" OR ")
                        )
                    }
                }
                _ => "false".to_owned(),
            },
            BuiltInFunction::If => {
                let condition = arguments[0].translate_condition(accessor);
                match (arguments[1].value_class(), arguments[2].value_class()) {
                    (Some(t), Some(e)) if t == e && t.part_count() == 1 => format!(
                        "CASE WHEN {condition} THEN {} ELSE {} END",
                        arguments[1].translate(accessor),
                        arguments[2].translate(accessor)
                    ),
                    _ => format!(
                        "CASE WHEN {condition} THEN {} ELSE {} END",
                        arguments[1].translate_boxed(accessor),
                        arguments[2].translate_boxed(accessor)
                    ),
                }
            }
            BuiltInFunction::Coalesce => format!(
                "COALESCE({})",
                arguments
                    .iter()
                    .map(|a| a.translate_boxed(accessor))
                    .join(", ")
            ),
            BuiltInFunction::Regex => {
                let flags = arguments
                    .get(2)
                    .map_or_else(|| "''".to_owned(), |f| f.translate(accessor));
                format!(
                    "sparql.regex_string({}, {}, {})",
                    arguments[0].translate_string(accessor),
                    arguments[1].translate_string(accessor),
                    flags
                )
            }
            BuiltInFunction::UCase if arguments[0].value_class() == Some(string_class.clone()) => {
                format!("upper({})", arguments[0].translate(accessor))
            }
            BuiltInFunction::LCase if arguments[0].value_class() == Some(string_class.clone()) => {
                format!("lower({})", arguments[0].translate(accessor))
            }
            BuiltInFunction::StrLen if arguments[0].value_class() == Some(string_class.clone()) => {
                format!("length({})", arguments[0].translate(accessor))
            }
            BuiltInFunction::Concat
                if arguments
                    .iter()
                    .all(|a| a.value_class() == Some(string_class.clone())) =>
            {
                format!(
                    "({})",
                    arguments.iter().map(|a| a.translate(accessor)).join(" || ")
                )
            }
            _ => format!(
                "sparql.{}_rdfbox({})",
                function_sql_name(function),
                arguments
                    .iter()
                    .map(|a| a.translate_boxed(accessor))
                    .join(", ")
            ),
        }
    }

    /// Renders a string-typed value, unboxing when the class is ambiguous.
    pub fn translate_string(&self, accessor: &dyn VariableAccessor) -> String {
        match self.value_class() {
            Some(ResourceClass::Literal(LiteralClass::String) | ResourceClass::LangString(_)) => {
                self.translate(accessor)
            }
            _ => format!(
                "sparql.rdfbox_extract_string({})",
                self.translate_boxed(accessor)
            ),
        }
    }

    /// Renders the expression in the boxed polymorphic representation.
    pub fn translate_boxed(&self, accessor: &dyn VariableAccessor) -> String {
        match self {
            SqlExpression::Null => "NULL".to_owned(),
            SqlExpression::True => "sparql.rdfbox_from_boolean(true)".to_owned(),
            SqlExpression::False => "sparql.rdfbox_from_boolean(false)".to_owned(),
            SqlExpression::Constant { class, parts } => class.box_code(parts),
            SqlExpression::Variable { name, classes, .. } => {
                boxed_variable(accessor, name, classes)
            }
            _ => match self.value_class() {
                Some(class) if class.part_count() == 1 => {
                    class.box_code(&[self.translate(accessor)])
                }
                _ => self.translate(accessor),
            },
        }
    }

    /// Renders the expression as an SQL boolean for `WHERE`/`ON` use,
    /// applying the effective-boolean-value rule to non-boolean values.
    pub fn translate_condition(&self, accessor: &dyn VariableAccessor) -> String {
        match self {
            SqlExpression::Null => "false".to_owned(),
            _ if self.is_boolean_kind() => self.translate(accessor),
            _ => format!("sparql.rdfbox_ebv({})", self.translate_boxed(accessor)),
        }
    }
}

pub(crate) fn is_numeric_class(class: &ResourceClass) -> bool {
    matches!(class, ResourceClass::Literal(l) if l.is_numeric())
}

/// The boxed rendering of a variable: one constructor per possible class,
/// merged with `COALESCE` since at most one encoding is bound per row.
pub(crate) fn boxed_variable(
    accessor: &dyn VariableAccessor,
    name: &str,
    classes: &[ResourceClass],
) -> String {
    let boxed = classes
        .iter()
        .map(|class| {
            let parts: Vec<_> = (0..class.part_count())
                .map(|part| accessor.column_ref(name, class, part))
                .collect();
            class.box_code(&parts)
        })
        .collect::<Vec<_>>();

    match boxed.as_slice() {
        [single] => single.clone(),
        _ => format!("COALESCE({})", boxed.join(", ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::SimpleVariableAccessor;
    use crate::variables::{UsedVariable, UsedVariables};
    use sparql_rel_model::Variable;

    fn scope_with_integer(name: &str) -> UsedVariables {
        let mut scope = UsedVariables::new();
        scope.insert(UsedVariable::new(
            name,
            ResourceClass::Literal(LiteralClass::Integer),
            false,
        ));
        scope
    }

    fn integer(value: &str) -> Expression {
        Expression::Literal(Literal::new_typed_literal(
            value,
            NamedNode::new_unchecked("http://www.w3.org/2001/XMLSchema#integer"),
        ))
    }

    #[test]
    fn null_has_no_value_class() {
        assert_eq!(SqlExpression::Null.value_class(), None);
        assert!(SqlExpression::Null.can_return_null());
    }

    #[test]
    fn single_class_comparison_renders_raw_columns() {
        let scope = scope_with_integer("o");
        let accessor = SimpleVariableAccessor::new(&scope);
        let mut errors = Vec::new();

        let expression = Expression::Binary {
            operator: BinaryOperator::GreaterThan,
            lhs: Box::new(Expression::Variable(Variable::new_unchecked("o"))),
            rhs: Box::new(integer("5")),
        };

        let built = build_expression(&expression, &accessor, &mut errors);
        assert!(errors.is_empty());
        assert_eq!(
            built.translate_condition(&accessor),
            "(\"o!integer!0\" > '5'::bigint)"
        );
    }

    #[test]
    fn unbound_variable_folds_to_null() {
        let scope = UsedVariables::new();
        let accessor = SimpleVariableAccessor::new(&scope);
        let mut errors = Vec::new();

        let expression = Expression::Binary {
            operator: BinaryOperator::Equals,
            lhs: Box::new(Expression::variable("missing")),
            rhs: Box::new(integer("1")),
        };

        let built = build_expression(&expression, &accessor, &mut errors).optimize(&accessor);
        assert!(built.is_always_false_or_null());
    }

    #[test]
    fn boolean_folding_short_circuits() {
        let scope = scope_with_integer("o");
        let accessor = SimpleVariableAccessor::new(&scope);

        let condition = SqlExpression::Binary {
            operator: BinaryOperator::And,
            lhs: Box::new(SqlExpression::False),
            rhs: Box::new(SqlExpression::Variable {
                name: "o".to_owned(),
                classes: vec![ResourceClass::Literal(LiteralClass::Boolean)],
                can_be_null: false,
            }),
        };

        assert_eq!(condition.optimize(&accessor), SqlExpression::False);
    }

    #[test]
    fn equal_constants_fold_statically() {
        let scope = UsedVariables::new();
        let accessor = SimpleVariableAccessor::new(&scope);
        let mut errors = Vec::new();

        let expression = Expression::Binary {
            operator: BinaryOperator::Equals,
            lhs: Box::new(integer("7")),
            rhs: Box::new(integer("7")),
        };

        let built = build_expression(&expression, &accessor, &mut errors).optimize(&accessor);
        assert_eq!(built, SqlExpression::True);
    }

    #[test]
    fn bound_on_certain_variable_is_true() {
        let scope = scope_with_integer("o");
        let accessor = SimpleVariableAccessor::new(&scope);

        let bound = SqlExpression::Function {
            function: BuiltInFunction::Bound,
            arguments: vec![SqlExpression::Variable {
                name: "o".to_owned(),
                classes: vec![ResourceClass::Literal(LiteralClass::Integer)],
                can_be_null: false,
            }],
        };

        assert_eq!(bound.optimize(&accessor), SqlExpression::True);
    }

    #[test]
    fn mixed_class_equality_uses_boxed_comparison() {
        let mut scope = UsedVariables::new();
        scope.insert(UsedVariable::with_classes(
            "x",
            vec![
                ResourceClass::Iri,
                ResourceClass::Literal(LiteralClass::String),
            ],
            false,
        ));
        let accessor = SimpleVariableAccessor::new(&scope);
        let mut errors = Vec::new();

        let expression = Expression::Binary {
            operator: BinaryOperator::Equals,
            lhs: Box::new(Expression::variable("x")),
            rhs: Box::new(Expression::Iri(NamedNode::new_unchecked(
                "http://example.org/a",
            ))),
        };

        let built = build_expression(&expression, &accessor, &mut errors);
        let sql = built.translate_condition(&accessor);
        assert!(sql.starts_with("sparql.rdfbox_eq("));
        assert!(sql.contains("sparql.rdfbox_from_iri"));
    }
}
