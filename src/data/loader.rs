// ============================================================
// Layer 4: Parallel Corpus Loader
// ============================================================
// Reads a line-aligned parallel corpus:
//
//   {data_dir}/train.{source_lang}   one sentence per line
//   {data_dir}/train.{target_lang}   translation on the same line
//
// Every line is normalised with the Preprocessor. Pairs longer
// than `max_len` tokens on either side (markers included) are
// dropped, and `limit` caps the number of pairs kept.
//
// Implements the CorpusSource trait from Layer 3.

use anyhow::{bail, Context, Result};
use std::{fs, path::PathBuf};

use crate::data::preprocessor::Preprocessor;
use crate::domain::sentence_pair::SentencePair;
use crate::domain::traits::CorpusSource;

pub struct ParallelCorpusLoader {
    data_dir:    PathBuf,
    source_lang: String,
    target_lang: String,
    max_len:     Option<usize>,
    limit:       Option<usize>,
    prep:        Preprocessor,
}

impl ParallelCorpusLoader {
    pub fn new(
        data_dir:    impl Into<PathBuf>,
        source_lang: impl Into<String>,
        target_lang: impl Into<String>,
    ) -> Self {
        Self {
            data_dir:    data_dir.into(),
            source_lang: source_lang.into(),
            target_lang: target_lang.into(),
            max_len:     None,
            limit:       None,
            prep:        Preprocessor::new(),
        }
    }

    pub fn with_max_len(mut self, max_len: Option<usize>) -> Self {
        self.max_len = max_len;
        self
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    fn corpus_path(&self, lang: &str) -> PathBuf {
        self.data_dir.join(format!("train.{lang}"))
    }

    fn read_lines(&self, lang: &str) -> Result<Vec<String>> {
        let path = self.corpus_path(lang);
        let text = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read corpus file '{}'", path.display()))?;
        Ok(text.lines().map(str::to_string).collect())
    }

    /// Normalise and filter already-read, line-aligned sentences.
    pub fn pair_lines(&self, sources: &[String], targets: &[String]) -> Result<Vec<SentencePair>> {
        if sources.len() != targets.len() {
            bail!(
                "Corpus is not line-aligned: {} source lines vs {} target lines",
                sources.len(),
                targets.len()
            );
        }

        let mut pairs   = Vec::new();
        let mut dropped = 0usize;

        for (src, tgt) in sources.iter().zip(targets) {
            if src.trim().is_empty() && tgt.trim().is_empty() {
                continue;
            }
            let pair = SentencePair::new(self.prep.normalize(src), self.prep.normalize(tgt));

            if let Some(max_len) = self.max_len {
                if pair.source_len() > max_len || pair.target_len() > max_len {
                    dropped += 1;
                    continue;
                }
            }

            pairs.push(pair);
            if self.limit.is_some_and(|limit| pairs.len() >= limit) {
                break;
            }
        }

        tracing::debug!("Kept {} pairs, dropped {} over the length limit", pairs.len(), dropped);
        Ok(pairs)
    }
}

impl CorpusSource for ParallelCorpusLoader {
    fn load_pairs(&self) -> Result<Vec<SentencePair>> {
        let sources = self.read_lines(&self.source_lang)?;
        let targets = self.read_lines(&self.target_lang)?;
        let pairs   = self.pair_lines(&sources, &targets)?;

        tracing::info!(
            "Loaded {} sentence pairs ({} → {}) from '{}'",
            pairs.len(),
            self.source_lang,
            self.target_lang,
            self.data_dir.display()
        );
        Ok(pairs)
    }
}
