use std::path::Path;

use thiserror::Error;

use crate::TextSpan;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to open PDF: {0}")]
    OpenError(String),
    #[error("failed to extract text: {0}")]
    ExtractionError(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for PDF span extraction backends.
///
/// Implementors return one span list per page, in page order, with each
/// span carrying its bounding box. Line reconstruction, reference
/// segmentation and field extraction live in `refcheck_parsing`.
pub trait SpanSource: Send + Sync {
    fn extract_pages(&self, path: &Path) -> Result<Vec<Vec<TextSpan>>, BackendError>;
}

impl<F> SpanSource for F
where
    F: Fn(&Path) -> Result<Vec<Vec<TextSpan>>, BackendError> + Send + Sync,
{
    fn extract_pages(&self, path: &Path) -> Result<Vec<Vec<TextSpan>>, BackendError> {
        self(path)
    }
}
