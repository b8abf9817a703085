// ============================================================
// Layer 2: Application / Use Cases
// ============================================================
// Workflow coordination only: no tensor code and no argument
// parsing. Each use case wires data, ml and infra together for
// one goal.

// The training workflow
pub mod train_use_case;

// Checkpoint-backed translation, single sentence or interactive
pub mod translate_use_case;
