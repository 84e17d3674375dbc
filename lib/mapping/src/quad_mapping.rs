use crate::classes::ResourceClass;
use crate::context::TranslationContext;
use crate::database::{Column, Table};
use crate::error::FatalError;
use sparql_rel_model::Node;

/// A position mapping producing a fixed constant value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantMapping {
    class: ResourceClass,
    value: Node,
}

impl ConstantMapping {
    pub fn new(class: ResourceClass, value: Node) -> Self {
        debug_assert!(!value.is_variable_or_blank_node());
        Self { class, value }
    }

    pub fn value(&self) -> &Node {
        &self.value
    }

    pub fn columns(&self, ctx: &TranslationContext<'_>) -> Result<Vec<Column>, FatalError> {
        self.class.to_columns(&self.value, ctx)
    }
}

/// A position mapping backed by physical columns, one per class part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParametrisedMapping {
    class: ResourceClass,
    columns: Vec<Column>,
}

impl ParametrisedMapping {
    pub fn new(class: ResourceClass, columns: Vec<Column>) -> Self {
        debug_assert_eq!(class.part_count(), columns.len());
        Self { class, columns }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }
}

/// How one quad position is encoded in a mapped table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeMapping {
    Constant(ConstantMapping),
    Parametrised(ParametrisedMapping),
}

impl NodeMapping {
    pub fn constant(class: ResourceClass, value: Node) -> Self {
        NodeMapping::Constant(ConstantMapping::new(class, value))
    }

    pub fn parametrised(class: ResourceClass, columns: Vec<Column>) -> Self {
        NodeMapping::Parametrised(ParametrisedMapping::new(class, columns))
    }

    pub fn resource_class(&self) -> &ResourceClass {
        match self {
            NodeMapping::Constant(m) => &m.class,
            NodeMapping::Parametrised(m) => &m.class,
        }
    }

    /// Structural compatibility of a pattern node with this mapping.
    pub fn matches(&self, node: &Node, ctx: &TranslationContext<'_>) -> Result<bool, FatalError> {
        if node.is_variable_or_blank_node() {
            return Ok(true);
        }

        match self {
            NodeMapping::Constant(m) => Ok(m.value == *node),
            NodeMapping::Parametrised(m) => m.class.match_node(node, ctx),
        }
    }
}

/// One declarative rule binding a quad pattern to a relational table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuadMapping {
    table: Table,
    /// Extra SQL restriction applied whenever the table is accessed.
    condition: Option<String>,
    graph: Option<NodeMapping>,
    subject: NodeMapping,
    predicate: NodeMapping,
    object: NodeMapping,
}

impl QuadMapping {
    pub fn new(
        table: Table,
        graph: Option<NodeMapping>,
        subject: NodeMapping,
        predicate: NodeMapping,
        object: NodeMapping,
    ) -> Self {
        Self {
            table,
            condition: None,
            graph,
            subject,
            predicate,
            object,
        }
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn condition(&self) -> Option<&str> {
        self.condition.as_deref()
    }

    pub fn graph(&self) -> Option<&NodeMapping> {
        self.graph.as_ref()
    }

    pub fn subject(&self) -> &NodeMapping {
        &self.subject
    }

    pub fn predicate(&self) -> &NodeMapping {
        &self.predicate
    }

    pub fn object(&self) -> &NodeMapping {
        &self.object
    }

    /// Tests all four positions of a pattern against this rule.
    ///
    /// A pattern without a graph restriction matches rules for any graph; a
    /// graph-restricted pattern requires a graph mapping to test against.
    pub fn match_pattern(
        &self,
        graph: Option<&Node>,
        subject: &Node,
        predicate: &Node,
        object: &Node,
        ctx: &TranslationContext<'_>,
    ) -> Result<bool, FatalError> {
        if let Some(graph) = graph {
            match &self.graph {
                None => return Ok(false),
                Some(mapping) => {
                    if !mapping.matches(graph, ctx)? {
                        return Ok(false);
                    }
                }
            }
        }

        Ok(self.subject.matches(subject, ctx)?
            && self.predicate.matches(predicate, ctx)?
            && self.object.matches(object, ctx)?)
    }
}
