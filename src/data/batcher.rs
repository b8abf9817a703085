// ============================================================
// Layer 4: Translation Batcher
// ============================================================
// Implements Burn's Batcher trait to stack TranslationSamples
// into two Int tensors:
//
//   source: [batch_size, max_len_input]
//   target: [batch_size, max_len_target]
//
// Samples are already padded to corpus-wide lengths, so every
// row has the same width and a flat Vec + reshape is enough.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::TranslationSample;
use crate::domain::tokens::TokenId;

#[derive(Debug, Clone)]
pub struct TranslationBatch<B: Backend> {
    /// Source token ids, padded with <pad>
    pub source: Tensor<B, 2, Int>,
    /// Target token ids starting with <s>, padded with <pad>
    pub target: Tensor<B, 2, Int>,
}

#[derive(Clone, Debug)]
pub struct TranslationBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> TranslationBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

/// Build a `[rows, width]` Int tensor from equal-length id rows.
pub fn ids_to_tensor<B: Backend>(
    rows:   &[&[TokenId]],
    device: &B::Device,
) -> Tensor<B, 2, Int> {
    let width = rows.first().map(|r| r.len()).unwrap_or(0);
    let flat: Vec<i32> = rows
        .iter()
        .flat_map(|r| r.iter().map(|&id| id as i32))
        .collect();
    Tensor::<B, 1, Int>::from_ints(flat.as_slice(), device).reshape([rows.len(), width])
}

impl<B: Backend> Batcher<TranslationSample, TranslationBatch<B>> for TranslationBatcher<B> {
    fn batch(&self, items: Vec<TranslationSample>) -> TranslationBatch<B> {
        let sources: Vec<&[TokenId]> = items.iter().map(|s| s.source_ids.as_slice()).collect();
        let targets: Vec<&[TokenId]> = items.iter().map(|s| s.target_ids.as_slice()).collect();

        TranslationBatch {
            source: ids_to_tensor(&sources, &self.device),
            target: ids_to_tensor(&targets, &self.device),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    #[test]
    fn test_batch_shapes_follow_padded_lengths() {
        let device = Default::default();
        let batcher = TranslationBatcher::<NdArray>::new(device);
        let items = vec![
            TranslationSample { source_ids: vec![2, 5, 3, 0], target_ids: vec![2, 7, 3] },
            TranslationSample { source_ids: vec![2, 6, 6, 3], target_ids: vec![2, 3, 0] },
        ];
        let batch = batcher.batch(items);
        assert_eq!(batch.source.dims(), [2, 4]);
        assert_eq!(batch.target.dims(), [2, 3]);

        let flat: Vec<i64> = batch
            .target
            .into_data()
            .iter::<i64>()
            .collect();
        assert_eq!(flat, vec![2, 7, 3, 2, 3, 0]);
    }
}
