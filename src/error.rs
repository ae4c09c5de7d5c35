use thiserror::Error;

/// The error type returned by the report entry points and drawing surfaces.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The search returned more results than a report may contain.
    #[error("Too many results, refine your search to return no more than {limit} results")]
    TooManyResults { total: usize, limit: usize },

    /// The drawing surface failed while producing the final document.
    #[error("Failed to create the PDF document: {0}")]
    Serialization(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ReportError>;
