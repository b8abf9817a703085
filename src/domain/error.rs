// ============================================================
// Layer 3: Error Taxonomy
// ============================================================
// The model layer validates structural invariants only (shape,
// length, layer count) and fails fast with one of these. The
// application layer wraps them in anyhow with context.
//
// Unknown tokens are deliberately absent: mapping them to <unk>
// is a contracted substitution, not a failure.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Seq2SeqError {
    /// Missing or malformed configuration, found before model construction.
    InvalidConfig(String),
    /// Degenerate tensors handed to the encoder, decoder or attention layer.
    InvalidInput(String),
    /// Checkpoint storage could not be read or written.
    CheckpointIo(String),
}

impl Seq2SeqError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

impl fmt::Display for Seq2SeqError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
            Self::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            Self::CheckpointIo(msg) => write!(f, "checkpoint I/O failed: {msg}"),
        }
    }
}

impl std::error::Error for Seq2SeqError {}

pub type Seq2SeqResult<T> = Result<T, Seq2SeqError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_the_category() {
        let e = Seq2SeqError::invalid_input("empty encoder outputs");
        assert_eq!(e.to_string(), "invalid input: empty encoder outputs");
        let e = Seq2SeqError::invalid_config("units must be > 0");
        assert!(e.to_string().starts_with("invalid configuration"));
    }

    #[test]
    fn test_converts_into_anyhow() {
        fn fails() -> anyhow::Result<()> {
            Err(Seq2SeqError::CheckpointIo("disk full".into()))?;
            Ok(())
        }
        let err = fails().unwrap_err();
        assert!(err.downcast_ref::<Seq2SeqError>().is_some());
    }
}
