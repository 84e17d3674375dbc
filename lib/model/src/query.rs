use crate::expression::Expression;
use crate::pattern::Pattern;
use crate::range::Range;
use oxrdf::{NamedNode, Variable};

/// A `FROM` / `FROM NAMED` dataset restriction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSet {
    pub is_default: bool,
    pub iri: NamedNode,
}

/// One projection of the `SELECT` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    pub variable: Variable,
    /// `None` for a plain projected variable, `Some` for `(expr AS ?var)`.
    pub expression: Option<Expression>,
    pub range: Range,
}

impl Projection {
    pub fn of(variable: Variable) -> Self {
        Self {
            variable,
            expression: None,
            range: Range::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderCondition {
    pub direction: OrderDirection,
    pub expression: Expression,
    pub range: Range,
}

/// One `GROUP BY` condition, optionally aliased (`GROUP BY (expr AS ?var)`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupCondition {
    pub expression: Expression,
    pub variable: Option<Variable>,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Select {
    pub projections: Vec<Projection>,
    pub pattern: Vec<Pattern>,
    pub datasets: Vec<DataSet>,
    pub group_by: Vec<GroupCondition>,
    pub having: Vec<Expression>,
    pub order_by: Vec<OrderCondition>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub distinct: bool,
    pub range: Range,
}

impl Select {
    /// A `SELECT *` over the given group pattern.
    pub fn new(pattern: Vec<Pattern>) -> Self {
        Self {
            projections: Vec::new(),
            pattern,
            datasets: Vec::new(),
            group_by: Vec::new(),
            having: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            distinct: false,
            range: Range::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectQuery {
    pub select: Select,
}

impl SelectQuery {
    pub fn new(select: Select) -> Self {
        Self { select }
    }
}
