//! The SPARQL-to-SQL compilation engine: lowers a parsed `SELECT` query
//! into the relational intermediate form and renders it as a single
//! backend-executable SQL statement.

mod accessor;
mod error;
mod expression;
mod intercode;
mod variables;
mod visitor;

pub use accessor::{LeftJoinVariableAccessor, SimpleVariableAccessor, VariableAccessor};
pub use error::{
    Diagnostic, ErrorKind, TranslateError, TranslateReport, Warning, WarningKind,
};
pub use expression::SqlExpression;
pub use intercode::{SqlAggregate, SqlIntercode, SqlValuesCell, VariableBinding};
pub use variables::{UsedVariable, UsedVariables};

use sparql_rel_mapping::{FatalError, MapLookup, MappingConfiguration, TranslationContext};
use sparql_rel_model::SelectQuery;
use visitor::TranslateVisitor;

/// One-shot translator over a configuration snapshot and a backend
/// connection.
///
/// Classification outcomes are cached for the lifetime of this value, so a
/// translator must not outlive the transaction its backend reads from.
pub struct Translator<'a> {
    context: TranslationContext<'a>,
}

impl<'a> Translator<'a> {
    pub fn new(config: &'a MappingConfiguration, backend: &'a mut dyn MapLookup) -> Self {
        Self {
            context: TranslationContext::new(config, backend),
        }
    }

    /// Translates the query, failing on the first of the collected semantic
    /// diagnostics.
    pub fn translate(&self, query: &SelectQuery) -> Result<String, TranslateError> {
        let report = self.try_translate(query)?;
        match report.sql {
            Some(sql) => Ok(sql),
            None => Err(TranslateError::Semantic(report.errors)),
        }
    }

    /// Translates the query, collecting every semantic diagnostic instead of
    /// failing on the first.
    ///
    /// Only backend and mapping-consistency failures surface as `Err`; an
    /// invalid query is a report without SQL.
    pub fn try_translate(&self, query: &SelectQuery) -> Result<TranslateReport, FatalError> {
        let mut visitor = TranslateVisitor::new(&self.context);
        let tree = visitor.visit_select(&query.select)?;

        let sql = if visitor.errors.is_empty() {
            Some(tree.optimize().translate())
        } else {
            None
        };

        tracing::debug!(
            errors = visitor.errors.len(),
            warnings = visitor.warnings.len(),
            success = sql.is_some(),
            "query translated"
        );

        Ok(TranslateReport {
            sql,
            errors: visitor.errors,
            warnings: visitor.warnings,
        })
    }
}
