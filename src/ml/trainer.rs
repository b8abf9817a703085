// ============================================================
// Layer 5: Training Loop
// ============================================================
// Teacher-forced training with Burn's DataLoader and a
// configurable optimizer.
//
// Per batch (`train_step`):
//   encode source once → unroll decoder over target[1..T]
//   → summed masked cross-entropy
//   → backward on the sum → one optimizer update for encoder + decoder
//   → reported loss = sum / real token count
//
// Per epoch (`fit`):
//   epoch loss = mean of batch losses
//   checkpoint iff strictly lower than every earlier epoch
//   validation loss (no update) logged alongside
//
// Burn notes:
//   - Training uses TrainBackend (Autodiff<Wgpu>) for gradients
//   - model.valid() returns the model on the inner backend, so the
//     validation batcher is built on B::InnerBackend too
//
// Reference: Burn Book §5 (Training)

use anyhow::Result;
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    module::AutodiffModule,
    optim::{AdaGradConfig, AdamConfig, GradientsParams, Optimizer, RmsPropConfig, SgdConfig},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, sync::Arc};

use crate::application::train_use_case::RunSnapshot;
use crate::data::{
    batcher::{TranslationBatch, TranslationBatcher},
    dataset::TranslationDataset,
};
use crate::domain::error::Seq2SeqResult;
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::model::Seq2Seq;
use crate::ml::optim::OptimizerKind;
use crate::ml::recurrent::Mode;

pub type TrainBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

const LOG_EVERY: usize = 10;

// ─── Single step ──────────────────────────────────────────────────────────────
/// One teacher-forced forward/backward pass and optimizer update.
/// Gradients come from the summed loss; the returned batch loss is
/// the per-token average.
pub fn train_step<B, O>(
    model:         Seq2Seq<B>,
    optim:         &mut O,
    batch:         TranslationBatch<B>,
    learning_rate: f64,
) -> Seq2SeqResult<(Seq2Seq<B>, f64)>
where
    B: AutodiffBackend,
    O: Optimizer<Seq2Seq<B>, B>,
{
    let [batch_size, _] = batch.source.dims();
    let device          = batch.source.device();

    let out = model.forward_loss(
        batch.source,
        batch.target,
        model.initial_state(batch_size, &device),
        Mode::Train,
    )?;
    let loss_val: f64 = out.loss.clone().into_scalar().elem::<f64>();

    let grads = out.total.backward();
    let grads = GradientsParams::from_grads(grads, &model);
    let model = optim.step(learning_rate, model, grads);

    Ok((model, loss_val))
}

// ─── Checkpoint policy ────────────────────────────────────────────────────────
/// Tracks the lowest epoch loss seen so far. Non-finite losses
/// never count as an improvement.
#[derive(Debug, Clone, Default)]
pub struct BestLossTracker {
    best: Option<f64>,
}

impl BestLossTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn best(&self) -> Option<f64> {
        self.best
    }

    /// True (and remembered) iff `loss` is strictly below the best so far.
    pub fn observe(&mut self, loss: f64) -> bool {
        if !loss.is_finite() {
            return false;
        }
        match self.best {
            Some(best) if loss >= best => false,
            _ => {
                self.best = Some(loss);
                true
            }
        }
    }
}

// ─── Reports ──────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq)]
pub struct EpochOutcome {
    pub train_loss:         f64,
    pub val_loss:           Option<f64>,
    pub non_finite_batches: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochSummary {
    pub epoch:              usize,
    pub train_loss:         f64,
    pub val_loss:           Option<f64>,
    pub checkpointed:       bool,
    pub non_finite_batches: usize,
}

/// Everything a finished run learned about itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingReport {
    pub epochs:     Vec<EpochSummary>,
    pub best_epoch: Option<usize>,
    pub best_loss:  Option<f64>,
    /// Where this run's checkpoints live
    pub run_dir:    Option<PathBuf>,
}

impl TrainingReport {
    pub fn checkpoints(&self) -> usize {
        self.epochs.iter().filter(|e| e.checkpointed).count()
    }

    pub fn non_finite_batches(&self) -> usize {
        self.epochs.iter().map(|e| e.non_finite_batches).sum()
    }
}

// ─── Epoch driver ─────────────────────────────────────────────────────────────
/// What `fit` needs from a concrete training setup.
pub trait EpochRunner {
    fn run_epoch(&mut self, epoch: usize) -> Result<EpochOutcome>;

    fn checkpoint(&mut self, epoch: usize, loss: f64) -> Result<()>;

    fn record(&mut self, _summary: &EpochSummary) -> Result<()> {
        Ok(())
    }
}

/// Run `epochs` epochs, checkpointing on strict improvement of the
/// training loss. No early stopping.
pub fn fit<R: EpochRunner>(runner: &mut R, epochs: usize) -> Result<TrainingReport> {
    let mut tracker = BestLossTracker::new();
    let mut report  = TrainingReport::default();

    for epoch in 1..=epochs {
        let outcome = runner.run_epoch(epoch)?;

        if !outcome.train_loss.is_finite() {
            tracing::warn!("Epoch {}: loss is {}, not checkpointing", epoch, outcome.train_loss);
        }

        let checkpointed = tracker.observe(outcome.train_loss);
        if checkpointed {
            runner.checkpoint(epoch, outcome.train_loss)?;
            report.best_epoch = Some(epoch);
            report.best_loss  = Some(outcome.train_loss);
        }

        let summary = EpochSummary {
            epoch,
            train_loss:         outcome.train_loss,
            val_loss:           outcome.val_loss,
            checkpointed,
            non_finite_batches: outcome.non_finite_batches,
        };

        tracing::info!(
            "Epoch {:>3}/{} | train_loss={:.4} | val_loss={} | best={} | {}",
            epoch,
            epochs,
            summary.train_loss,
            summary.val_loss.map_or_else(|| "n/a".to_string(), |v| format!("{v:.4}")),
            tracker.best().map_or_else(|| "n/a".to_string(), |v| format!("{v:.4}")),
            if checkpointed { "checkpoint saved" } else { "no improvement" },
        );

        runner.record(&summary)?;
        report.epochs.push(summary);
    }

    Ok(report)
}

// ─── Burn-backed runner ───────────────────────────────────────────────────────
pub struct Seq2SeqTrainer<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<Seq2Seq<B>, B>,
{
    model:           Seq2Seq<B>,
    optim:           O,
    train_loader:    Arc<dyn DataLoader<TranslationBatch<B>>>,
    val_loader:      Option<Arc<dyn DataLoader<TranslationBatch<B::InnerBackend>>>>,
    learning_rate:   f64,
    steps_per_epoch: usize,
    ckpt:            CheckpointManager,
    metrics:         MetricsLogger,
}

impl<B, O> Seq2SeqTrainer<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<Seq2Seq<B>, B>,
{
    pub fn new(
        model:    Seq2Seq<B>,
        optim:    O,
        snapshot: &RunSnapshot,
        train:    TranslationDataset,
        val:      TranslationDataset,
        ckpt:     CheckpointManager,
        metrics:  MetricsLogger,
        device:   B::Device,
    ) -> Self {
        let cfg = &snapshot.train;

        // ── Training data loader (AutodiffBackend) ────────────────────────────
        let train_loader = DataLoaderBuilder::new(TranslationBatcher::<B>::new(device.clone()))
            .batch_size(cfg.batch_size)
            .shuffle(cfg.seed)
            .num_workers(1)
            .build(train);

        // ── Validation data loader (InnerBackend, no autodiff overhead) ───────
        let val_loader = (val.sample_count() > 0).then(|| {
            DataLoaderBuilder::new(TranslationBatcher::<B::InnerBackend>::new(device))
                .batch_size(cfg.batch_size)
                .num_workers(1)
                .build(val)
        });

        Self {
            model,
            optim,
            train_loader,
            val_loader,
            learning_rate: cfg.learning_rate,
            steps_per_epoch: snapshot.steps_per_epoch,
            ckpt,
            metrics,
        }
    }

    /// Teacher-forced loss on the held-out split, dropout off.
    fn validate(&self) -> Result<Option<f64>> {
        let Some(loader) = &self.val_loader else {
            return Ok(None);
        };
        let model = self.model.valid();

        let mut loss_sum = 0.0f64;
        let mut batches  = 0usize;
        for batch in loader.iter() {
            let [batch_size, _] = batch.source.dims();
            let device          = batch.source.device();
            let out = model.forward_loss(
                batch.source,
                batch.target,
                model.initial_state(batch_size, &device),
                Mode::Eval,
            )?;
            loss_sum += out.loss.into_scalar().elem::<f64>();
            batches  += 1;
        }

        Ok((batches > 0).then(|| loss_sum / batches as f64))
    }
}

impl<B, O> EpochRunner for Seq2SeqTrainer<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<Seq2Seq<B>, B>,
{
    fn run_epoch(&mut self, epoch: usize) -> Result<EpochOutcome> {
        let mut model      = self.model.clone();
        let mut loss_sum   = 0.0f64;
        let mut batches    = 0usize;
        let mut non_finite = 0usize;

        for batch in self.train_loader.iter() {
            let (next, loss) = train_step(model, &mut self.optim, batch, self.learning_rate)?;
            model = next;

            loss_sum += loss;
            batches  += 1;

            if !loss.is_finite() {
                non_finite += 1;
                tracing::warn!("Epoch {} batch {}: non-finite loss {}", epoch, batches, loss);
            }
            if batches % LOG_EVERY == 0 {
                tracing::info!(
                    "Epoch {} batch {}/{} loss={:.4}",
                    epoch, batches, self.steps_per_epoch, loss,
                );
            }
        }
        self.model = model;

        let train_loss = if batches > 0 { loss_sum / batches as f64 } else { f64::NAN };
        let val_loss   = self.validate()?;

        Ok(EpochOutcome { train_loss, val_loss, non_finite_batches: non_finite })
    }

    fn checkpoint(&mut self, epoch: usize, loss: f64) -> Result<()> {
        self.ckpt.save(&self.model, &self.optim, epoch, loss)
    }

    fn record(&mut self, summary: &EpochSummary) -> Result<()> {
        self.metrics.log(&EpochMetrics::from(summary))
    }
}

// ─── Entry points ─────────────────────────────────────────────────────────────
/// Backend-generic training; the optimizer is picked from the snapshot.
pub fn train_on_device<B: AutodiffBackend>(
    snapshot: &RunSnapshot,
    train:    TranslationDataset,
    val:      TranslationDataset,
    ckpt:     CheckpointManager,
    metrics:  MetricsLogger,
    device:   B::Device,
) -> Result<TrainingReport> {
    let model: Seq2Seq<B> = snapshot.model.init(&device)?;
    tracing::info!(
        "Model ready: {} layers, units={}, attention={}, optimizer={}",
        snapshot.model.num_layers,
        snapshot.model.units,
        snapshot.model.method,
        snapshot.train.optimizer,
    );

    let epochs  = snapshot.train.epochs;
    let run_dir = ckpt.dir().to_path_buf();
    macro_rules! fit_with {
        ($optim:expr) => {{
            let mut trainer =
                Seq2SeqTrainer::new(model, $optim, snapshot, train, val, ckpt, metrics, device);
            fit(&mut trainer, epochs)
        }};
    }

    let mut report = match snapshot.train.optimizer {
        OptimizerKind::Adam    => fit_with!(AdamConfig::new().with_epsilon(1e-8).init()),
        OptimizerKind::Sgd     => fit_with!(SgdConfig::new().init()),
        OptimizerKind::RmsProp => fit_with!(RmsPropConfig::new().init()),
        OptimizerKind::AdaGrad => fit_with!(AdaGradConfig::new().init()),
    }?;
    report.run_dir = Some(run_dir);

    tracing::info!(
        "Training complete: {} checkpoint(s), best loss {:?} at epoch {:?}",
        report.checkpoints(),
        report.best_loss,
        report.best_epoch,
    );
    if report.non_finite_batches() > 0 {
        tracing::warn!("{} batch(es) produced a non-finite loss", report.non_finite_batches());
    }

    Ok(report)
}
