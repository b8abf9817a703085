// ============================================================
// Layer 3: SentencePair Domain Type
// ============================================================
// One line-aligned example from a parallel corpus, after
// normalisation. Both sides already carry the <s> ... </s>
// markers, so splitting on whitespace yields the exact token
// sequence the vocabulary sees.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentencePair {
    /// Normalised sentence in the input language
    pub source: String,
    /// Normalised sentence in the target language
    pub target: String,
}

impl SentencePair {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    /// Whitespace token count of the source side (markers included)
    pub fn source_len(&self) -> usize {
        self.source.split_whitespace().count()
    }

    /// Whitespace token count of the target side (markers included)
    pub fn target_len(&self) -> usize {
        self.target.split_whitespace().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lengths_count_markers() {
        let p = SentencePair::new("<s> hello . </s>", "<s> hallo . </s>");
        assert_eq!(p.source_len(), 4);
        assert_eq!(p.target_len(), 4);
    }
}
