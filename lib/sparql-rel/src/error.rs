use sparql_rel_model::LoweringError;
use sparql_rel_translator::TranslateError;

/// Any failure of the parse, lower, translate pipeline.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error(transparent)]
    Syntax(#[from] spargebra::SparqlSyntaxError),
    #[error(transparent)]
    Lowering(#[from] LoweringError),
    #[error(transparent)]
    Translation(#[from] TranslateError),
}
