use crate::expression::Expression;
use crate::node::Node;
use crate::range::Range;
use oxrdf::{Literal, NamedNode, Variable};

/// A triple pattern with an already-resolved predicate node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriplePattern {
    pub subject: Node,
    pub predicate: Node,
    pub object: Node,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VarOrIri {
    Variable(Variable),
    Iri(NamedNode),
}

/// A ground term usable inside a `VALUES` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValuesTerm {
    Iri(NamedNode),
    Literal(Literal),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValuesBlock {
    pub variables: Vec<Variable>,
    /// One row per binding list; a `None` cell leaves the variable unbound.
    pub rows: Vec<Vec<Option<ValuesTerm>>>,
    pub range: Range,
}

/// A named argument (parameter or result) of a procedure call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureArgument {
    pub name: NamedNode,
    pub value: Node,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcedureResults {
    /// The procedure binds its single unnamed result to this node.
    Single(Node),
    /// The procedure binds named result predicates.
    Multi(Vec<ProcedureArgument>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureCallPattern {
    pub procedure: NamedNode,
    pub parameters: Vec<ProcedureArgument>,
    pub results: ProcedureResults,
    pub range: Range,
}

/// One element of a graph pattern group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    Triple(TriplePattern),
    /// A property-path triple. Kept in the tree so the translator can reject
    /// it explicitly instead of silently dropping the pattern.
    Path {
        subject: Node,
        object: Node,
        range: Range,
    },
    Group(Vec<Pattern>),
    Graph {
        name: VarOrIri,
        patterns: Vec<Pattern>,
    },
    Union(Vec<Vec<Pattern>>),
    Optional(Vec<Pattern>),
    Minus(Vec<Pattern>),
    Filter {
        constraint: Expression,
        range: Range,
    },
    Bind {
        expression: Expression,
        variable: Variable,
        range: Range,
    },
    Values(ValuesBlock),
    ProcedureCall(ProcedureCallPattern),
    /// A federated sub-query. Kept in the tree so the translator can reject
    /// it explicitly.
    Service {
        range: Range,
    },
}

impl Pattern {
    pub fn triple(subject: impl Into<Node>, predicate: impl Into<Node>, object: impl Into<Node>) -> Self {
        Pattern::Triple(TriplePattern {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
            range: Range::default(),
        })
    }
}
