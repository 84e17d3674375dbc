use crate::classes::ResourceClass;
use sparql_rel_model::Node;

/// A named parameter of an external SQL procedure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDefinition {
    /// The parameter predicate IRI.
    pub name: String,
    pub class: ResourceClass,
    /// Bound when the call omits the parameter; required when `None`.
    pub default_value: Option<Node>,
}

impl ParameterDefinition {
    pub fn required(name: impl Into<String>, class: ResourceClass) -> Self {
        Self {
            name: name.into(),
            class,
            default_value: None,
        }
    }

    pub fn optional(name: impl Into<String>, class: ResourceClass, default_value: Node) -> Self {
        Self {
            name: name.into(),
            class,
            default_value: Some(default_value),
        }
    }
}

/// A result column of an external SQL procedure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultDefinition {
    /// The result predicate IRI; `None` denotes the single unnamed result.
    pub name: Option<String>,
    pub class: ResourceClass,
    /// The column name of the procedure's result relation.
    pub sql_column: String,
}

/// An external procedure callable from a graph pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureDefinition {
    /// The procedure IRI.
    pub name: String,
    /// The schema-qualified SQL function implementing the procedure.
    pub sql_function: String,
    pub parameters: Vec<ParameterDefinition>,
    pub results: Vec<ResultDefinition>,
}

impl ProcedureDefinition {
    pub fn new(name: impl Into<String>, sql_function: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_function: sql_function.into(),
            parameters: Vec::new(),
            results: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, parameter: ParameterDefinition) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_result(mut self, result: ResultDefinition) -> Self {
        self.results.push(result);
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterDefinition> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn result(&self, name: Option<&str>) -> Option<&ResultDefinition> {
        self.results.iter().find(|r| r.name.as_deref() == name)
    }
}
