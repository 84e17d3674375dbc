use crate::error::BackendError;

/// The blocking relational seam used while classifying IRIs against
/// map-backed user classes.
///
/// The translator issues at most one lookup per distinct (IRI, class) pair
/// per translation; results are memoized in the per-translation
/// [`IriCache`](crate::IriCache). Implementations are expected to run the
/// statement inside the transaction that backs the whole translation, since
/// cached outcomes must not outlive it.
pub trait MapLookup {
    /// Executes `sql` with `parameter` bound to the single `$1` placeholder
    /// and returns the first column of the first row, if any.
    fn lookup_value(&mut self, sql: &str, parameter: &str)
        -> Result<Option<String>, BackendError>;
}
