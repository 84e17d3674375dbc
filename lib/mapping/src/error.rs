use std::error::Error;

/// A relational-access failure reported by the backend seam.
#[derive(Debug, thiserror::Error)]
#[error("backend failure: {0}")]
pub struct BackendError(#[source] pub Box<dyn Error + Send + Sync + 'static>);

impl BackendError {
    pub fn new(error: impl Into<Box<dyn Error + Send + Sync + 'static>>) -> Self {
        Self(error.into())
    }

    pub fn msg(msg: impl Into<String>) -> Self {
        Self(msg.into().into())
    }
}

/// An unrecoverable translation failure.
///
/// Unlike semantic diagnostics, which are accumulated and reported together,
/// a fatal error aborts the whole translation immediately: the backend
/// session is unusable or the mapping configuration contradicts the data.
#[derive(Debug, thiserror::Error)]
pub enum FatalError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    /// A user IRI class confirmed a match but the subsequent column lookup
    /// returned no row. This is a configuration or data-consistency defect,
    /// not a recoverable translation error.
    #[error("IRI class {class} matched {iri} but resolved no columns")]
    InconsistentMapping { iri: String, class: String },
}
