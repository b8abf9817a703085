// ============================================================
// Layer 5: Translator (greedy inference)
// ============================================================
// Loads the run snapshot, both vocabularies and the latest
// checkpoint once, then translates sentences one at a time:
//
//   raw sentence
//     → Preprocessor::normalize     "<s> hello . </s>"
//     → source Vocabulary::encode   unknown words → <unk>
//     → post-pad to max_len_input (long input keeps its tail)
//     → Seq2Seq::translate          greedy, ≤ max_len_target steps
//     → target Vocabulary::decode

use anyhow::{Context, Result};
use burn::prelude::*;

use crate::application::train_use_case::RunSnapshot;
use crate::data::{dataset::pad_to, preprocessor::Preprocessor, vocab::Vocabulary};
use crate::domain::error::Seq2SeqResult;
use crate::domain::tokens::{TokenId, END_ID, START_ID};
use crate::domain::traits::{Translation, Translator};
use crate::infra::{checkpoint::CheckpointManager, vocab_store::VocabStore};
use crate::ml::model::Seq2Seq;

pub type InferBackend = burn::backend::Wgpu;

/// Autoregressive greedy loop.
///
/// `next` maps the previously emitted token (starting with <s>) to the
/// next one. Stops after </s> (which is kept) or after `max_len` tokens.
pub fn greedy_decode<F>(max_len: usize, mut next: F) -> Seq2SeqResult<Vec<TokenId>>
where
    F: FnMut(TokenId) -> Seq2SeqResult<TokenId>,
{
    let mut output = Vec::with_capacity(max_len);
    let mut prev   = START_ID;

    for _ in 0..max_len {
        let token = next(prev)?;
        output.push(token);
        if token == END_ID {
            break;
        }
        prev = token;
    }

    Ok(output)
}

pub struct NeuralTranslator<B: Backend> {
    model:          Seq2Seq<B>,
    source_vocab:   Vocabulary,
    target_vocab:   Vocabulary,
    preprocessor:   Preprocessor,
    max_len_input:  usize,
    max_len_target: usize,
    device:         B::Device,
}

impl<B: Backend> NeuralTranslator<B> {
    pub fn new(
        model:        Seq2Seq<B>,
        source_vocab: Vocabulary,
        target_vocab: Vocabulary,
        snapshot:     &RunSnapshot,
        device:       B::Device,
    ) -> Self {
        Self {
            model,
            source_vocab,
            target_vocab,
            preprocessor:   Preprocessor::new(),
            max_len_input:  snapshot.max_len_input,
            max_len_target: snapshot.max_len_target,
            device,
        }
    }

    /// Rebuild the trained model from `{checkpoint_dir}`: config.json,
    /// vocab.{lang}.json and the latest model_epoch_N weights.
    pub fn from_checkpoint(ckpt: &CheckpointManager, device: B::Device) -> Result<Self> {
        let snapshot = ckpt.load_snapshot()?;
        snapshot.validate()?;

        let vocabs       = VocabStore::new(ckpt.dir());
        let source_vocab = vocabs.load(&snapshot.train.source_lang)?;
        let target_vocab = vocabs.load(&snapshot.train.target_lang)?;

        let model: Seq2Seq<B> = snapshot
            .model
            .init(&device)
            .context("Cannot rebuild model from config.json")?;
        let (model, latest) = ckpt.restore_latest(&model, &device)?;

        tracing::info!(
            "Restored epoch {} checkpoint (loss={:.4}), vocab {} → {}",
            latest.epoch,
            latest.loss,
            source_vocab.size(),
            target_vocab.size(),
        );

        Ok(Self::new(model, source_vocab, target_vocab, &snapshot, device))
    }

    pub fn max_len_target(&self) -> usize {
        self.max_len_target
    }
}

impl<B: Backend> Translator for NeuralTranslator<B> {
    fn translate(&self, sentence: &str) -> Result<Translation> {
        let normalized_input = self.preprocessor.normalize(sentence);
        let ids = pad_to(self.source_vocab.encode(&normalized_input)?, self.max_len_input);

        tracing::debug!("Source ids: {:?}", ids);

        let token_ids = self.model.translate(&ids, self.max_len_target, &self.device)?;
        let tokens    = self.target_vocab.decode(&token_ids);

        Ok(Translation { normalized_input, token_ids, tokens })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::Seq2SeqError;

    #[test]
    fn test_stops_right_after_end_token() {
        let mut script = vec![7, 8, END_ID, 9].into_iter();
        let out = greedy_decode(10, |_| Ok(script.next().unwrap())).unwrap();
        assert_eq!(out, vec![7, 8, END_ID]);
    }

    #[test]
    fn test_never_exceeds_max_len() {
        let out = greedy_decode(4, |_| Ok(5)).unwrap();
        assert_eq!(out, vec![5; 4]);
        assert!(greedy_decode(0, |_| Ok(5)).unwrap().is_empty());
    }

    #[test]
    fn test_feeds_back_previous_prediction() {
        let mut seen = Vec::new();
        greedy_decode(3, |prev| {
            seen.push(prev);
            Ok(prev + 10)
        })
        .unwrap();
        assert_eq!(seen, vec![START_ID, START_ID + 10, START_ID + 20]);
    }

    #[test]
    fn test_step_errors_propagate() {
        let result = greedy_decode(3, |_| Err(Seq2SeqError::invalid_input("boom")));
        assert!(result.is_err());
    }

    #[test]
    fn test_restores_newest_trained_run_and_translates() {
        use crate::application::train_use_case::{TrainConfig, TrainUseCase};
        use burn::backend::{Autodiff, NdArray};
        use std::fs;

        let dir = std::env::temp_dir().join(format!("nmt_translator_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(dir.join("data")).unwrap();
        fs::write(dir.join("data/train.en"), "Hello.\nHow are you?\nThank you!\nGood night.\n").unwrap();
        fs::write(dir.join("data/train.es"), "Hola.\n¿Cómo estás?\n¡Gracias!\nBuenas noches.\n").unwrap();

        let config = TrainConfig {
            data_dir:       dir.join("data").display().to_string(),
            checkpoint_dir: dir.join("ckpt").display().to_string(),
            dev_split:      0.0,
            batch_size:     2,
            epochs:         1,
            learning_rate:  0.01,
            embedding_dim:  8,
            units:          8,
            num_layers:     1,
            dropout:        0.0,
            ..TrainConfig::default()
        };
        TrainUseCase::new(config.clone())
            .execute_on::<Autodiff<NdArray>>(Default::default())
            .unwrap();

        // a wider run that stops before its first checkpoint
        TrainUseCase::new(TrainConfig { units: 16, ..config.clone() }).prepare().unwrap();

        let ckpt       = CheckpointManager::open(&config.checkpoint_dir).unwrap();
        let translator = NeuralTranslator::<NdArray>::from_checkpoint(&ckpt, Default::default()).unwrap();

        let t = translator.translate("How are you, friend?").unwrap();
        assert_eq!(t.normalized_input, "<s> how are you , friend ? </s>");
        assert!(!t.token_ids.is_empty());
        assert!(t.token_ids.len() <= translator.max_len_target());
        assert_eq!(t.tokens.len(), t.token_ids.len());

        fs::remove_dir_all(&dir).ok();
    }
}
