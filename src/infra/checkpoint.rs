// ============================================================
// Layer 6: Checkpoint Manager
// ============================================================
// Saves and restores model + optimizer state using Burn's
// CompactRecorder, plus the JSON run snapshot needed to
// rebuild the model for inference.
//
// Every training run claims its own directory, so a new run never
// overwrites an earlier run's weights, config or vocabularies:
//
//   checkpoints/
//     run_1760781234_000/
//       model_epoch_1.mpk.gz   ← weights after an improving epoch
//       optim_epoch_1.mpk.gz   ← optimizer moments for that epoch
//       model_epoch_4.mpk.gz
//       optim_epoch_4.mpk.gz
//       latest.json            ← {"epoch": 4, "loss": 2.91}
//       config.json            ← RunSnapshot (written before epoch 1)
//       vocab.{lang}.json      ← see vocab_store.rs
//       metrics.csv            ← see metrics.rs
//     run_1760790000_000/      ← a later run
//
// `open` accepts either a run directory or the root; for the root
// it picks the newest run that has saved at least one checkpoint.
//
// Only improving epochs are written, so numbers can skip.
// latest.json is rewritten last; a crash mid-save leaves it
// pointing at the previous complete checkpoint.
//
// Read failures surface as Seq2SeqError::CheckpointIo (or
// InvalidConfig for a malformed config.json) wrapped in anyhow,
// so callers can downcast.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use burn::{
    optim::Optimizer,
    prelude::*,
    record::{CompactRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use crate::application::train_use_case::RunSnapshot;
use crate::domain::error::Seq2SeqError;
use crate::ml::model::Seq2Seq;

const LATEST_FILE: &str = "latest.json";
const CONFIG_FILE: &str = "config.json";
const RUN_PREFIX:  &str = "run_";

/// Contents of latest.json.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatestCheckpoint {
    pub epoch: usize,
    pub loss:  f64,
}

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Claim a fresh `run_<unix secs>_<n>` directory under `root`,
    /// creating `root` if needed.
    pub fn create_run(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        fs::create_dir_all(root)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", root.display()))?;

        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        for n in 0..1000 {
            let dir = root.join(format!("{RUN_PREFIX}{secs:010}_{n:03}"));
            match fs::create_dir(&dir) {
                Ok(()) => {
                    tracing::info!("Run directory: '{}'", dir.display());
                    return Ok(Self { dir });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("Cannot create run directory '{}'", dir.display())
                    })
                }
            }
        }

        Err(Seq2SeqError::CheckpointIo(format!(
            "no free run directory left under '{}'",
            root.display()
        ))
        .into())
    }

    /// Open a run for reading; nothing is created. `dir` may be a run
    /// directory or a root holding several runs.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(Seq2SeqError::CheckpointIo(format!(
                "checkpoint directory '{}' does not exist. Have you run 'train' first?",
                dir.display()
            ))
            .into());
        }
        if dir.join(LATEST_FILE).is_file() {
            return Ok(Self { dir });
        }

        let entries = fs::read_dir(&dir).map_err(|e| {
            Seq2SeqError::CheckpointIo(format!("cannot list '{}': {e}", dir.display()))
        })?;
        let newest = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with(RUN_PREFIX))
            })
            .filter(|path| path.join(LATEST_FILE).is_file())
            .max();

        match newest {
            Some(run) => {
                tracing::info!("Using newest checkpointed run '{}'", run.display());
                Ok(Self { dir: run })
            }
            // reads fail later with CheckpointIo
            None => Ok(Self { dir }),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn model_path(&self, epoch: usize) -> PathBuf {
        // recorder adds .mpk.gz
        self.dir.join(format!("model_epoch_{epoch}"))
    }

    fn optim_path(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("optim_epoch_{epoch}"))
    }

    // ─── Save ─────────────────────────────────────────────────────────────────
    /// Model weights, optimizer state, then the latest.json pointer.
    pub fn save<B, O>(&self, model: &Seq2Seq<B>, optim: &O, epoch: usize, loss: f64) -> Result<()>
    where
        B: AutodiffBackend,
        O: Optimizer<Seq2Seq<B>, B>,
    {
        self.save_model(model, epoch)?;
        self.save_optimizer(optim, epoch)?;
        self.mark_latest(LatestCheckpoint { epoch, loss })?;
        tracing::info!("Checkpoint saved: epoch {} (loss={:.4})", epoch, loss);
        Ok(())
    }

    pub fn save_model<B: Backend>(&self, model: &Seq2Seq<B>, epoch: usize) -> Result<()> {
        let path = self.model_path(epoch);
        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .map_err(|e| {
                Seq2SeqError::CheckpointIo(format!("cannot save model to '{}': {e}", path.display()))
            })?;
        Ok(())
    }

    pub fn save_optimizer<B, O>(&self, optim: &O, epoch: usize) -> Result<()>
    where
        B: AutodiffBackend,
        O: Optimizer<Seq2Seq<B>, B>,
    {
        let path     = self.optim_path(epoch);
        let recorder = CompactRecorder::new();
        <CompactRecorder as Recorder<B>>::record(&recorder, optim.to_record(), path.clone())
            .map_err(|e| {
                Seq2SeqError::CheckpointIo(format!(
                    "cannot save optimizer state to '{}': {e}",
                    path.display()
                ))
            })?;
        Ok(())
    }

    fn mark_latest(&self, latest: LatestCheckpoint) -> Result<()> {
        let path = self.dir.join(LATEST_FILE);
        let json = serde_json::to_string(&latest)?;
        fs::write(&path, json).map_err(|e| {
            Seq2SeqError::CheckpointIo(format!("cannot write '{}': {e}", path.display()))
        })?;
        Ok(())
    }

    // ─── Restore ──────────────────────────────────────────────────────────────
    /// Read latest.json.
    pub fn latest(&self) -> Result<LatestCheckpoint> {
        let path = self.dir.join(LATEST_FILE);
        let json = fs::read_to_string(&path).map_err(|e| {
            Seq2SeqError::CheckpointIo(format!(
                "cannot read '{}': {e}. Have you run 'train' first?",
                path.display()
            ))
        })?;
        let latest = serde_json::from_str(&json).map_err(|e| {
            Seq2SeqError::CheckpointIo(format!("malformed '{}': {e}", path.display()))
        })?;
        Ok(latest)
    }

    /// Load the latest weights into a copy of `model`. On failure the
    /// caller's model is untouched. Weights whose shapes disagree with
    /// `model` are rejected as InvalidConfig.
    pub fn restore_latest<B: Backend>(
        &self,
        model:  &Seq2Seq<B>,
        device: &B::Device,
    ) -> Result<(Seq2Seq<B>, LatestCheckpoint)> {
        let latest = self.latest()?;
        let path   = self.model_path(latest.epoch);

        tracing::info!("Loading checkpoint from epoch {}", latest.epoch);

        let record = CompactRecorder::new().load(path.clone(), device).map_err(|e| {
            Seq2SeqError::CheckpointIo(format!("cannot load '{}': {e}", path.display()))
        })?;

        let restored = model.clone().load_record(record);
        if restored.num_params() != model.num_params() {
            return Err(Seq2SeqError::invalid_config(format!(
                "'{}' holds {} parameters but config.json describes {}",
                path.display(),
                restored.num_params(),
                model.num_params(),
            ))
            .into());
        }

        Ok((restored, latest))
    }

    // ─── Run snapshot ─────────────────────────────────────────────────────────
    pub fn save_snapshot(&self, snapshot: &RunSnapshot) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(snapshot)?;
        fs::write(&path, json).map_err(|e| {
            Seq2SeqError::CheckpointIo(format!("cannot write config to '{}': {e}", path.display()))
        })?;
        tracing::debug!("Saved run snapshot to '{}'", path.display());
        Ok(())
    }

    /// Missing file → CheckpointIo, missing or malformed keys → InvalidConfig.
    pub fn load_snapshot(&self) -> Result<RunSnapshot> {
        let path = self.dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path).map_err(|e| {
            Seq2SeqError::CheckpointIo(format!(
                "cannot read config from '{}': {e}. Make sure you have run 'train' before 'translate'.",
                path.display()
            ))
        })?;
        let snapshot = serde_json::from_str(&json).map_err(|e| {
            Seq2SeqError::invalid_config(format!("'{}': {e}", path.display()))
        })?;
        Ok(snapshot)
    }
}
