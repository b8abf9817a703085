// ============================================================
// Layer 6: Infrastructure Layer
// ============================================================
// Everything that touches the checkpoint directory:
//
//   checkpoint.rs  : model + optimizer records (CompactRecorder),
//                    latest.json pointer, config.json snapshot
//
//   vocab_store.rs : per-language WordLevel tokenizer JSON, so
//                    inference sees exactly the training ids
//
//   metrics.rs     : per-epoch CSV of losses and checkpoint flags
//
// Reference: Burn Book §5 (Checkpointing)

/// Model/optimizer checkpoints and the run snapshot
pub mod checkpoint;

/// Vocabulary persistence
pub mod vocab_store;

/// Training metrics CSV logger
pub mod metrics;
