use crate::range::Range;
use oxrdf::{Literal, NamedNode, Variable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Plus,
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Or,
    And,
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl BinaryOperator {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOperator::Equals
                | BinaryOperator::NotEquals
                | BinaryOperator::LessThan
                | BinaryOperator::LessThanOrEqual
                | BinaryOperator::GreaterThan
                | BinaryOperator::GreaterThanOrEqual
        )
    }
}

/// Non-aggregate built-in functions supported by the translator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltInFunction {
    Str,
    Lang,
    Datatype,
    Bound,
    Iri,
    Abs,
    Ceil,
    Floor,
    Round,
    Concat,
    StrLen,
    UCase,
    LCase,
    Contains,
    StrStarts,
    StrEnds,
    Regex,
    If,
    Coalesce,
    IsIri,
    IsBlank,
    IsLiteral,
    IsNumeric,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Count,
    Sum,
    Min,
    Max,
    Avg,
    Sample,
    GroupConcat,
}

/// A query expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    Variable(Variable),
    Literal(Literal),
    Iri(NamedNode),
    Unary {
        operator: UnaryOperator,
        operand: Box<Expression>,
    },
    Binary {
        operator: BinaryOperator,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    Call {
        function: BuiltInFunction,
        arguments: Vec<Expression>,
        range: Range,
    },
    Aggregate {
        function: AggregateFunction,
        distinct: bool,
        /// `None` only for `COUNT(*)`.
        argument: Option<Box<Expression>>,
        /// `GROUP_CONCAT` separator.
        separator: Option<String>,
        range: Range,
    },
}

impl Expression {
    pub fn variable(name: &str) -> Self {
        Expression::Variable(Variable::new_unchecked(name))
    }

    /// Pre-order walk over the expression tree.
    pub fn walk<'a>(&'a self, action: &mut dyn FnMut(&'a Expression)) {
        action(self);

        match self {
            Expression::Variable(_) | Expression::Literal(_) | Expression::Iri(_) => {}
            Expression::Unary { operand, .. } => operand.walk(action),
            Expression::Binary { lhs, rhs, .. } => {
                lhs.walk(action);
                rhs.walk(action);
            }
            Expression::Call { arguments, .. } => {
                for argument in arguments {
                    argument.walk(action);
                }
            }
            Expression::Aggregate { argument, .. } => {
                if let Some(argument) = argument {
                    argument.walk(action);
                }
            }
        }
    }

    pub fn contains_aggregate(&self) -> bool {
        let mut found = false;
        self.walk(&mut |e| {
            if matches!(e, Expression::Aggregate { .. }) {
                found = true;
            }
        });
        found
    }

    pub fn range(&self) -> Range {
        match self {
            Expression::Call { range, .. } | Expression::Aggregate { range, .. } => *range,
            _ => Range::default(),
        }
    }
}
