//! Query tree model consumed by the sparql-rel translation engine.
//!
//! The surface grammar is handled by [`spargebra`]; this crate lowers its
//! algebra into the element-list form the translator walks. Procedure calls
//! have no surface syntax and are constructed directly by callers.

mod expression;
mod lower;
mod node;
mod pattern;
mod query;
mod range;

pub use expression::{
    AggregateFunction, BinaryOperator, BuiltInFunction, Expression, UnaryOperator,
};
pub use lower::{lower_query, LoweringError};
pub use node::Node;
pub use pattern::{
    Pattern, ProcedureArgument, ProcedureCallPattern, ProcedureResults, TriplePattern, ValuesBlock,
    ValuesTerm, VarOrIri,
};
pub use query::{
    DataSet, GroupCondition, OrderCondition, OrderDirection, Projection, Select, SelectQuery,
};
pub use range::{Position, Range};

pub use oxrdf::{BlankNode, Literal, NamedNode, Variable};
