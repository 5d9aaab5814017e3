pub type ClipstackResult<T> = Result<T, ClipstackError>;

#[derive(thiserror::Error, Debug)]
pub enum ClipstackError {
    /// Bad duration, segment length or other configuration. Fatal to the run.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The video yields fewer than two segments, so no split output exists.
    /// Fatal to this video, not to sibling runs.
    #[error("insufficient content: {0}")]
    InsufficientContent(String),

    /// Probe or decode failure on a media source.
    #[error("media error: {0}")]
    Media(String),

    /// Encoder subprocess or artifact write failure.
    #[error("encode error: {0}")]
    Encode(String),

    /// The external speech-to-text tool failed to run or exited nonzero.
    /// Treated as non-fatal by the pipeline (the transcript is skipped).
    #[error("transcription error: {0}")]
    Transcription(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ClipstackError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn insufficient_content(msg: impl Into<String>) -> Self {
        Self::InsufficientContent(msg.into())
    }

    pub fn media(msg: impl Into<String>) -> Self {
        Self::Media(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    pub fn transcription(msg: impl Into<String>) -> Self {
        Self::Transcription(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            ClipstackError::invalid_input("x")
                .to_string()
                .contains("invalid input:")
        );
        assert!(
            ClipstackError::insufficient_content("x")
                .to_string()
                .contains("insufficient content:")
        );
        assert!(ClipstackError::media("x").to_string().contains("media error:"));
        assert!(
            ClipstackError::encode("x")
                .to_string()
                .contains("encode error:")
        );
        assert!(
            ClipstackError::transcription("x")
                .to_string()
                .contains("transcription error:")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = ClipstackError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
