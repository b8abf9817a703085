// ============================================================
// Layer 5: ML / Model Layer (Burn)
// ============================================================
// All tensor code lives here.
//
//   recurrent.rs  : Mode flag, per-layer RecurrentState, StackedLstm
//   attention.rs  : dot / general / concat global attention
//   encoder.rs    : embedding + stacked LSTM over the source
//   decoder.rs    : one input-feeding decode step
//   model.rs      : Seq2Seq, teacher-forced masked loss, greedy translate
//   optim.rs      : optimizer names
//   trainer.rs    : train_step, epoch loop, checkpoint-on-improvement
//   translator.rs : greedy_decode loop + checkpoint-backed Translator
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)
//            Luong et al. (2015) Effective Approaches to
//            Attention-based Neural Machine Translation

pub mod recurrent;

pub mod attention;

pub mod encoder;

pub mod decoder;

/// Encoder-decoder model and loss
pub mod model;

pub mod optim;

/// Training loop with validation and checkpointing
pub mod trainer;

/// Inference: greedy decoding from a restored checkpoint
pub mod translator;
