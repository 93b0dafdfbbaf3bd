use thiserror::Error;

/// Top-level error type for the chatmark render pipeline.
#[derive(Debug, Error)]
pub enum ChatmarkError {
    /// The text between the citation sentinels is not a valid record array.
    #[error("malformed citation payload: {0}")]
    MalformedCitations(#[source] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("download failed for file {file_id}: {message}")]
    Download { file_id: String, message: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ChatmarkError {
    pub fn is_malformed_citations(&self) -> bool {
        matches!(self, Self::MalformedCitations(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_citations_message() {
        let source = serde_json::from_str::<Vec<u32>>("[1,").unwrap_err();
        let err = ChatmarkError::MalformedCitations(source);
        assert!(err.is_malformed_citations());
        assert!(err.to_string().starts_with("malformed citation payload"));
    }

    #[test]
    fn test_download_message_names_file() {
        let err = ChatmarkError::Download {
            file_id: "abc".into(),
            message: "empty body".into(),
        };
        assert_eq!(err.to_string(), "download failed for file abc: empty body");
    }
}
