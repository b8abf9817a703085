// ============================================================
// Layer 4: Data Pipeline
// ============================================================
// Everything between the raw parallel text files and the Int
// tensors the model consumes:
//
//   train.{src} / train.{tgt}
//       │
//       ▼
//   ParallelCorpusLoader → reads line-aligned files
//       │
//       ▼
//   Preprocessor         → punctuation spacing, lowercase, <s> … </s>
//       │
//       ▼
//   Vocabulary           → word ↔ id, unknown words → <unk>
//       │
//       ▼
//   encode_pairs         → ids, post-padded to corpus max length
//       │
//       ▼
//   split_train_val      → seeded shuffle + hold-out
//       │
//       ▼
//   TranslationDataset   → Burn Dataset
//       │
//       ▼
//   TranslationBatcher   → [batch, len] Int tensors

pub mod loader;

pub mod preprocessor;

pub mod vocab;

pub mod dataset;

pub mod batcher;

pub mod splitter;
