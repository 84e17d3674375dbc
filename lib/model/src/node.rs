use oxrdf::{BlankNode, Literal, NamedNode, Variable};
use std::fmt;

/// One position of a triple or quad pattern.
///
/// Blank nodes inside patterns behave as variables. Their names live in the
/// `_:` name space, which cannot collide with parsed query variables.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Node {
    Iri(NamedNode),
    Literal(Literal),
    BlankNode(BlankNode),
    Variable(Variable),
}

impl Node {
    /// Returns the scope name if the node acts as a variable.
    pub fn variable_name(&self) -> Option<String> {
        match self {
            Node::Variable(v) => Some(v.as_str().to_owned()),
            Node::BlankNode(b) => Some(format!("_:{}", b.as_str())),
            Node::Iri(_) | Node::Literal(_) => None,
        }
    }

    pub fn is_variable_or_blank_node(&self) -> bool {
        matches!(self, Node::Variable(_) | Node::BlankNode(_))
    }
}

impl From<NamedNode> for Node {
    fn from(value: NamedNode) -> Self {
        Node::Iri(value)
    }
}

impl From<Literal> for Node {
    fn from(value: Literal) -> Self {
        Node::Literal(value)
    }
}

impl From<BlankNode> for Node {
    fn from(value: BlankNode) -> Self {
        Node::BlankNode(value)
    }
}

impl From<Variable> for Node {
    fn from(value: Variable) -> Self {
        Node::Variable(value)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Iri(n) => n.fmt(f),
            Node::Literal(l) => l.fmt(f),
            Node::BlankNode(b) => b.fmt(f),
            Node::Variable(v) => v.fmt(f),
        }
    }
}
