use sparql_rel_mapping::FatalError;
use sparql_rel_model::Range;
use std::fmt;

/// The fixed taxonomy of semantic translation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    VariableUsedBeforeBind,
    RepeatOfProjectionVariable,
    InvalidProjection,
    NestedAggregateFunction,
    InvalidVariableInAggregate,
    InvalidVariableOutsideAggregate,
    InvalidContextOfAggregate,
    ProcedureCallInsideGraph,
    UnknownProcedure,
    InvalidParameterPredicate,
    RepeatOfParameterPredicate,
    MissingParameterPredicate,
    UnboundedVariableParameterValue,
    UnboundedBlankNodeParameterValue,
    InvalidResultPredicate,
    RepeatOfResultPredicate,
    RepeatOfValuesVariable,
    UnsupportedServicePattern,
    UnsupportedPropertyPath,
}

impl ErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::VariableUsedBeforeBind => "variableUsedBeforeBind",
            ErrorKind::RepeatOfProjectionVariable => "repeatOfProjectionVariable",
            ErrorKind::InvalidProjection => "invalidProjection",
            ErrorKind::NestedAggregateFunction => "nestedAggregateFunction",
            ErrorKind::InvalidVariableInAggregate => "invalidVariableInAggregate",
            ErrorKind::InvalidVariableOutsideAggregate => "invalidVariableOutsideAggregate",
            ErrorKind::InvalidContextOfAggregate => "invalidContextOfAggregate",
            ErrorKind::ProcedureCallInsideGraph => "procedureCallInsideGraph",
            ErrorKind::UnknownProcedure => "unknownProcedure",
            ErrorKind::InvalidParameterPredicate => "invalidParameterPredicate",
            ErrorKind::RepeatOfParameterPredicate => "repeatOfParameterPredicate",
            ErrorKind::MissingParameterPredicate => "missingParameterPredicate",
            ErrorKind::UnboundedVariableParameterValue => "unboundedVariableParameterValue",
            ErrorKind::UnboundedBlankNodeParameterValue => "unboundedBlankNodeParameterValue",
            ErrorKind::InvalidResultPredicate => "invalidResultPredicate",
            ErrorKind::RepeatOfResultPredicate => "repeatOfResultPredicate",
            ErrorKind::RepeatOfValuesVariable => "repeatOfValuesVariable",
            ErrorKind::UnsupportedServicePattern => "unsupportedServicePattern",
            ErrorKind::UnsupportedPropertyPath => "unsupportedPropertyPath",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// The fixed taxonomy of translation warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarningKind {
    /// A quad pattern matched by no configured mapping. The pattern compiles
    /// to no solutions, which is usually a query or configuration mistake.
    PatternMatchesNoMapping,
    /// An optional pattern whose filters can never be satisfied.
    UnsatisfiableOptional,
}

impl WarningKind {
    pub fn code(self) -> &'static str {
        match self {
            WarningKind::PatternMatchesNoMapping => "patternMatchesNoMapping",
            WarningKind::UnsatisfiableOptional => "unsatisfiableOptional",
        }
    }
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One accumulated semantic diagnostic.
///
/// Diagnostics are values, not errors: translation continues best-effort
/// after recording one, so a single request reports every independent
/// problem at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub range: Range,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: ErrorKind, range: Range, message: impl Into<String>) -> Self {
        Self {
            kind,
            range,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.range.is_unknown() {
            write!(f, "{}: {}", self.kind, self.message)
        } else {
            write!(f, "{} at {}: {}", self.kind, self.range, self.message)
        }
    }
}

/// One accumulated translation warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub kind: WarningKind,
    pub range: Range,
    pub message: String,
}

impl Warning {
    pub fn new(kind: WarningKind, range: Range, message: impl Into<String>) -> Self {
        Self {
            kind,
            range,
            message: message.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.range.is_unknown() {
            write!(f, "{}: {}", self.kind, self.message)
        } else {
            write!(f, "{} at {}: {}", self.kind, self.range, self.message)
        }
    }
}

/// The failure side of a translate-and-render call.
#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    /// The query is semantically invalid; all collected diagnostics, in
    /// source order.
    #[error("query translation failed with {} error(s)", .0.len())]
    Semantic(Vec<Diagnostic>),
    #[error(transparent)]
    Fatal(#[from] FatalError),
}

/// The outcome of a trial translation: diagnostics are always collected,
/// SQL is present only when no semantic error occurred.
#[derive(Debug)]
pub struct TranslateReport {
    pub sql: Option<String>,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Warning>,
}

impl TranslateReport {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}
