// ============================================================
// Layer 4: Translation Dataset
// ============================================================
// Turns normalised sentence pairs into fixed-width id rows:
//
//   "<s> how are you ? </s>" → [2, 14, 9, 11, 6, 3, 0, 0]
//
// Each side is post-padded to its own corpus-wide maximum, so
// every batch the Batcher builds has the same shape. Over-long
// rows are cut from the front, keeping the closing </s>.

use anyhow::Result;
use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::data::vocab::Vocabulary;
use crate::domain::sentence_pair::SentencePair;
use crate::domain::tokens::{TokenId, PAD_ID};

/// One tokenised pair, post-padded to the corpus-wide lengths.
/// Target ids start with <s>; position 0 is never a prediction target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationSample {
    pub source_ids: Vec<TokenId>,
    pub target_ids: Vec<TokenId>,
}

/// Encoded corpus plus the padded lengths it was laid out with.
pub struct EncodedCorpus {
    pub samples:        Vec<TranslationSample>,
    pub max_len_input:  usize,
    pub max_len_target: usize,
}

/// Post-pad with <pad> to exactly `len` ids. Longer rows keep their
/// last `len` ids.
pub fn pad_to(mut ids: Vec<TokenId>, len: usize) -> Vec<TokenId> {
    if ids.len() > len {
        ids.drain(..ids.len() - len);
    } else {
        ids.resize(len, PAD_ID);
    }
    ids
}

/// Tokenise every pair and pad each side to its longest sentence.
pub fn encode_pairs(
    pairs:        &[SentencePair],
    source_vocab: &Vocabulary,
    target_vocab: &Vocabulary,
) -> Result<EncodedCorpus> {
    let mut raw = Vec::with_capacity(pairs.len());
    for pair in pairs {
        raw.push((source_vocab.encode(&pair.source)?, target_vocab.encode(&pair.target)?));
    }

    let max_len_input  = raw.iter().map(|(s, _)| s.len()).max().unwrap_or(0);
    let max_len_target = raw.iter().map(|(_, t)| t.len()).max().unwrap_or(0);

    let samples = raw
        .into_iter()
        .map(|(s, t)| TranslationSample {
            source_ids: pad_to(s, max_len_input),
            target_ids: pad_to(t, max_len_target),
        })
        .collect();

    Ok(EncodedCorpus { samples, max_len_input, max_len_target })
}

pub struct TranslationDataset {
    samples: Vec<TranslationSample>,
}

impl TranslationDataset {
    pub fn new(samples: Vec<TranslationSample>) -> Self { Self { samples } }

    pub fn sample_count(&self) -> usize { self.samples.len() }
}

impl Dataset<TranslationSample> for TranslationDataset {
    fn get(&self, index: usize) -> Option<TranslationSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_to_pads_and_truncates() {
        assert_eq!(pad_to(vec![2, 5, 3], 5), vec![2, 5, 3, 0, 0]);
        // the tail survives, so </s> is kept
        assert_eq!(pad_to(vec![2, 5, 6, 7, 3], 3), vec![6, 7, 3]);
    }

    #[test]
    fn test_encode_pairs_pads_to_longest() {
        let pairs = vec![
            SentencePair::new("<s> a b c </s>", "<s> x </s>"),
            SentencePair::new("<s> a </s>", "<s> x y z w </s>"),
        ];
        let src = Vocabulary::build(pairs.iter().map(|p| p.source.as_str())).unwrap();
        let tgt = Vocabulary::build(pairs.iter().map(|p| p.target.as_str())).unwrap();

        let corpus = encode_pairs(&pairs, &src, &tgt).unwrap();
        assert_eq!(corpus.max_len_input, 5);
        assert_eq!(corpus.max_len_target, 6);
        assert!(corpus.samples.iter().all(|s| s.source_ids.len() == 5));
        assert!(corpus.samples.iter().all(|s| s.target_ids.len() == 6));
        assert_eq!(corpus.samples[0].target_ids[3..], [PAD_ID, PAD_ID, PAD_ID]);
    }
}
