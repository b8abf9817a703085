// ============================================================
// Layer 3: Domain Layer
// ============================================================
// Plain Rust types and traits describing what the system works
// with: token ids, sentence pairs, and the error taxonomy.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits

// Reserved vocabulary entries shared by both languages
pub mod tokens;

// A normalised source/target sentence pair
pub mod sentence_pair;

// Error taxonomy for the model and its loops
pub mod error;

// Core abstractions that other layers implement
pub mod traits;
