// ============================================================
// Layer 2: TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load + normalise parallel corpus  (Layer 4 - data)
//   Step 2: Build source/target vocabularies  (Layer 4 - data)
//   Step 3: Encode + post-pad every pair      (Layer 4 - data)
//   Step 4: Split train/validation            (Layer 4 - data)
//   Step 5: Freeze the run snapshot           (derived lengths, sizes)
//   Step 6: Claim a run directory, save       (Layer 6 - infra)
//           config.json + vocabularies
//   Step 7: Run training loop                 (Layer 5 - ml)
//
// The snapshot is fully computed and validated before the
// model is built; nothing is added to it afterwards. Training
// results come back as a TrainingReport.

use anyhow::{bail, Result};
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};

use crate::data::{
    dataset::{encode_pairs, TranslationDataset},
    loader::ParallelCorpusLoader,
    splitter::split_train_val,
    vocab::Vocabulary,
};
use crate::domain::error::{Seq2SeqError, Seq2SeqResult};
use crate::domain::traits::CorpusSource;
use crate::infra::{checkpoint::CheckpointManager, metrics::MetricsLogger, vocab_store::VocabStore};
use crate::ml::attention::AttentionMethod;
use crate::ml::model::Seq2SeqConfig;
use crate::ml::optim::OptimizerKind;
use crate::ml::trainer::{train_on_device, TrainBackend, TrainingReport};

// ─── Training Configuration ──────────────────────────────────────────────────
// User-facing knobs for a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub data_dir:       String,
    pub source_lang:    String,
    pub target_lang:    String,
    pub checkpoint_dir: String,
    /// Drop pairs with more tokens than this on either side
    pub max_len:        Option<usize>,
    /// Keep at most this many pairs
    pub limit:          Option<usize>,
    pub dev_split:      f64,
    pub batch_size:     usize,
    pub epochs:         usize,
    pub learning_rate:  f64,
    pub embedding_dim:  usize,
    pub units:          usize,
    pub num_layers:     usize,
    pub method:         AttentionMethod,
    pub dropout:        f64,
    pub optimizer:      OptimizerKind,
    pub seed:           u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_dir:       "data".to_string(),
            source_lang:    "en".to_string(),
            target_lang:    "es".to_string(),
            checkpoint_dir: "checkpoints".to_string(),
            max_len:        None,
            limit:          None,
            dev_split:      0.1,
            batch_size:     64,
            epochs:         10,
            learning_rate:  1e-3,
            embedding_dim:  256,
            units:          512,
            num_layers:     4,
            method:         AttentionMethod::General,
            dropout:        0.2,
            optimizer:      OptimizerKind::Adam,
            seed:           42,
        }
    }
}

// ─── Run Snapshot ─────────────────────────────────────────────────────────────
/// Everything needed to rebuild the model, written once as config.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub train:           TrainConfig,
    pub model:           Seq2SeqConfig,
    pub max_len_input:   usize,
    pub max_len_target:  usize,
    pub steps_per_epoch: usize,
}

impl RunSnapshot {
    pub fn new(
        train:           TrainConfig,
        model:           Seq2SeqConfig,
        max_len_input:   usize,
        max_len_target:  usize,
        steps_per_epoch: usize,
    ) -> Self {
        Self { train, model, max_len_input, max_len_target, steps_per_epoch }
    }

    pub fn validate(&self) -> Seq2SeqResult<()> {
        self.model.validate()?;

        let t = &self.train;
        if t.source_lang.is_empty() || t.target_lang.is_empty() || t.source_lang == t.target_lang {
            return Err(Seq2SeqError::invalid_config(format!(
                "language suffixes must be distinct and non-empty (got {:?} and {:?})",
                t.source_lang, t.target_lang
            )));
        }
        if t.batch_size == 0 || t.epochs == 0 {
            return Err(Seq2SeqError::invalid_config("batch_size and epochs must be positive"));
        }
        if !(t.learning_rate.is_finite() && t.learning_rate > 0.0) {
            return Err(Seq2SeqError::invalid_config(format!(
                "learning_rate {} must be a positive number",
                t.learning_rate
            )));
        }
        if !(0.0..1.0).contains(&t.dev_split) {
            return Err(Seq2SeqError::invalid_config(format!(
                "dev_split {} is outside [0, 1)",
                t.dev_split
            )));
        }
        if self.max_len_input == 0 || self.max_len_target < 2 {
            return Err(Seq2SeqError::invalid_config(format!(
                "padded lengths ({}, {}) are too short",
                self.max_len_input, self.max_len_target
            )));
        }
        Ok(())
    }
}

/// Datasets and directories ready for the training loop.
pub struct PreparedRun {
    pub snapshot: RunSnapshot,
    pub train:    TranslationDataset,
    pub val:      TranslationDataset,
    pub ckpt:     CheckpointManager,
    pub metrics:  MetricsLogger,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Full pipeline on the GPU backend.
    pub fn execute(&self) -> Result<TrainingReport> {
        let device = burn::backend::wgpu::WgpuDevice::default();
        tracing::info!("Using WGPU device: {:?}", device);
        self.execute_on::<TrainBackend>(device)
    }

    /// Full pipeline on any autodiff backend.
    pub fn execute_on<B: AutodiffBackend>(&self, device: B::Device) -> Result<TrainingReport> {
        let run = self.prepare()?;
        train_on_device::<B>(&run.snapshot, run.train, run.val, run.ckpt, run.metrics, device)
    }

    /// Steps 1 to 6: everything up to the first optimizer update.
    pub fn prepare(&self) -> Result<PreparedRun> {
        let cfg = &self.config;

        // ── Step 1: Load + normalise corpus ───────────────────────────────────
        let loader = ParallelCorpusLoader::new(&cfg.data_dir, &cfg.source_lang, &cfg.target_lang)
            .with_max_len(cfg.max_len)
            .with_limit(cfg.limit);
        let pairs = loader.load_pairs()?;
        if pairs.is_empty() {
            bail!("No sentence pairs left in '{}' after filtering", cfg.data_dir);
        }

        // ── Step 2: Vocabularies ──────────────────────────────────────────────
        let source_vocab = Vocabulary::build(pairs.iter().map(|p| p.source.as_str()))?;
        let target_vocab = Vocabulary::build(pairs.iter().map(|p| p.target.as_str()))?;
        tracing::info!(
            "Vocabulary sizes: {}={} {}={}",
            cfg.source_lang,
            source_vocab.size(),
            cfg.target_lang,
            target_vocab.size(),
        );

        // ── Step 3: Encode + pad ──────────────────────────────────────────────
        let corpus = encode_pairs(&pairs, &source_vocab, &target_vocab)?;

        // ── Step 4: Train / validation split ──────────────────────────────────
        let (train_samples, val_samples) = split_train_val(corpus.samples, cfg.dev_split, cfg.seed);
        if train_samples.is_empty() {
            bail!("dev_split {} leaves no training pairs", cfg.dev_split);
        }
        tracing::info!(
            "Split: {} train, {} validation",
            train_samples.len(),
            val_samples.len()
        );

        // ── Step 5: Snapshot ──────────────────────────────────────────────────
        let model = Seq2SeqConfig::new(
            source_vocab.size(),
            target_vocab.size(),
            cfg.embedding_dim,
            cfg.units,
            cfg.method,
        )
        .with_num_layers(cfg.num_layers)
        .with_dropout(cfg.dropout);

        let steps_per_epoch = train_samples.len().div_ceil(cfg.batch_size.max(1));
        let snapshot = RunSnapshot::new(
            cfg.clone(),
            model,
            corpus.max_len_input,
            corpus.max_len_target,
            steps_per_epoch,
        );
        snapshot.validate()?;

        // ── Step 6: Persist config + vocabularies ─────────────────────────────
        let ckpt = CheckpointManager::create_run(&cfg.checkpoint_dir)?;
        ckpt.save_snapshot(&snapshot)?;

        let vocabs = VocabStore::new(ckpt.dir());
        vocabs.save(&cfg.source_lang, &source_vocab)?;
        vocabs.save(&cfg.target_lang, &target_vocab)?;

        let metrics = MetricsLogger::new(ckpt.dir())?;

        Ok(PreparedRun {
            snapshot,
            train: TranslationDataset::new(train_samples),
            val:   TranslationDataset::new(val_samples),
            ckpt,
            metrics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use std::{fs, path::PathBuf};

    fn workspace(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("nmt_train_{name}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(dir.join("data")).unwrap();
        fs::write(
            dir.join("data/train.en"),
            "Hello.\nHow are you?\nI am fine.\nThank you!\nGood night.\nSee you soon.\n",
        )
        .unwrap();
        fs::write(
            dir.join("data/train.es"),
            "Hola.\n¿Cómo estás?\nEstoy bien.\n¡Gracias!\nBuenas noches.\nHasta pronto.\n",
        )
        .unwrap();
        dir
    }

    fn tiny_config(dir: &PathBuf) -> TrainConfig {
        TrainConfig {
            data_dir:       dir.join("data").display().to_string(),
            checkpoint_dir: dir.join("ckpt").display().to_string(),
            dev_split:      0.2,
            batch_size:     2,
            epochs:         2,
            learning_rate:  0.01,
            embedding_dim:  8,
            units:          8,
            num_layers:     2,
            dropout:        0.0,
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        let snapshot = RunSnapshot::new(
            TrainConfig::default(),
            Seq2SeqConfig::new(100, 120, 256, 512, AttentionMethod::General),
            20,
            22,
            10,
        );
        assert!(snapshot.validate().is_ok());
    }

    #[test]
    fn test_bad_knobs_are_invalid_config() {
        let model = Seq2SeqConfig::new(100, 120, 8, 8, AttentionMethod::Dot);
        for train in [
            TrainConfig { batch_size: 0, ..TrainConfig::default() },
            TrainConfig { learning_rate: f64::NAN, ..TrainConfig::default() },
            TrainConfig { dev_split: 1.0, ..TrainConfig::default() },
            TrainConfig { target_lang: "en".into(), ..TrainConfig::default() },
        ] {
            let snapshot = RunSnapshot::new(train, model.clone(), 10, 10, 1);
            assert!(matches!(snapshot.validate(), Err(Seq2SeqError::InvalidConfig(_))));
        }
    }

    #[test]
    fn test_prepare_writes_snapshot_and_vocabularies() {
        let dir = workspace("prepare");
        let run = TrainUseCase::new(tiny_config(&dir)).prepare().unwrap();

        let ckpt = run.ckpt.dir();
        assert!(ckpt.starts_with(dir.join("ckpt")));
        assert!(ckpt.join("config.json").exists());
        assert!(ckpt.join("vocab.en.json").exists());
        assert!(ckpt.join("vocab.es.json").exists());

        assert_eq!(run.train.sample_count() + run.val.sample_count(), 6);
        assert_eq!(run.snapshot.steps_per_epoch, run.train.sample_count().div_ceil(2));
        // "<s> how are you ? </s>"
        assert_eq!(run.snapshot.max_len_input, 6);

        let reloaded = run.ckpt.load_snapshot().unwrap();
        assert_eq!(reloaded.train, run.snapshot.train);
        assert_eq!(reloaded.model.vocab_input_size, run.snapshot.model.vocab_input_size);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_end_to_end_training_checkpoints_first_epoch() {
        let dir = workspace("e2e");
        let report = TrainUseCase::new(tiny_config(&dir))
            .execute_on::<Autodiff<NdArray>>(Default::default())
            .unwrap();

        assert_eq!(report.epochs.len(), 2);
        assert!(report.epochs[0].checkpointed);
        assert!(report.epochs.iter().all(|e| e.val_loss.is_some()));

        let ckpt = report.run_dir.clone().unwrap();
        assert!(ckpt.starts_with(dir.join("ckpt")));
        assert!(ckpt.join("model_epoch_1.mpk.gz").exists());
        assert!(ckpt.join("optim_epoch_1.mpk.gz").exists());
        assert!(ckpt.join("latest.json").exists());

        let csv = fs::read_to_string(ckpt.join("metrics.csv")).unwrap();
        assert_eq!(csv.lines().count(), 3);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_second_run_leaves_first_run_untouched() {
        let dir   = workspace("rerun");
        let cfg   = TrainConfig { epochs: 1, ..tiny_config(&dir) };
        let first = TrainUseCase::new(cfg.clone())
            .execute_on::<Autodiff<NdArray>>(Default::default())
            .unwrap();
        let first_dir = first.run_dir.unwrap();
        let weights   = fs::read(first_dir.join("model_epoch_1.mpk.gz")).unwrap();
        let config    = fs::read_to_string(first_dir.join("config.json")).unwrap();

        let second = TrainUseCase::new(TrainConfig { units: 16, ..cfg }).prepare().unwrap();
        assert_ne!(second.ckpt.dir(), first_dir.as_path());
        assert_eq!(second.snapshot.model.units, 16);

        assert_eq!(fs::read(first_dir.join("model_epoch_1.mpk.gz")).unwrap(), weights);
        assert_eq!(fs::read_to_string(first_dir.join("config.json")).unwrap(), config);
        assert!(!second.ckpt.dir().join("latest.json").exists());

        fs::remove_dir_all(&dir).ok();
    }
}
