// ============================================================
// Layer 3: Core Traits (Abstractions)
// ============================================================
// The application layer programs against these so that, for
// example, a TSV corpus reader could replace the two-file
// reader without touching the training workflow.

use anyhow::Result;

use crate::domain::sentence_pair::SentencePair;
use crate::domain::tokens::TokenId;

// ─── CorpusSource ─────────────────────────────────────────────────────────────
/// Anything that can produce normalised parallel sentence pairs.
///
/// Implementations:
///   - ParallelCorpusLoader → `train.{src}` / `train.{tgt}` line-aligned files
pub trait CorpusSource {
    fn load_pairs(&self) -> Result<Vec<SentencePair>>;
}

// ─── Translator ───────────────────────────────────────────────────────────────
/// Anything that turns a raw sentence into target-language tokens.
pub trait Translator {
    fn translate(&self, sentence: &str) -> Result<Translation>;
}

/// Result of translating one sentence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    /// The source sentence after normalisation (with <s> / </s>)
    pub normalized_input: String,
    /// Predicted target ids, including </s> when decoding stopped early
    pub token_ids: Vec<TokenId>,
    /// `token_ids` mapped back through the target vocabulary
    pub tokens: Vec<String>,
}

impl Translation {
    /// Predicted tokens joined with single spaces
    pub fn text(&self) -> String {
        self.tokens.join(" ")
    }
}
