use thiserror::Error;

/// Errors surfaced by the indexing and query core.
///
/// Lookup misses are not errors: an unknown term or an empty wildcard
/// expansion is reported as `Ok(None)` or an empty result list.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Query parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt index file {file}: {reason}")]
    Corrupt { file: String, reason: String },

    #[error("Invalid index: {0}")]
    InvalidIndex(String),

    #[error("Cannot read document {document_id}: {reason}")]
    Document { document_id: u32, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn corrupt(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Corrupt { file: file.into(), reason: reason.into() }
    }

    /// True for failures caused by the query text rather than the index.
    pub fn is_parse(&self) -> bool {
        matches!(self, Error::Parse(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::corrupt("postings.bin", "unexpected end of file");
        assert_eq!(err.to_string(), "Corrupt index file postings.bin: unexpected end of file");
        assert!(Error::Parse("unterminated phrase".into()).is_parse());
        assert!(!err.is_parse());
    }
}
