// ============================================================
// Layer 4: Train/Validation Splitter
// ============================================================
// Shuffles encoded pairs and holds out `dev_fraction` of them
// for validation. The validation loss is reported every epoch
// but never drives checkpointing (that uses the training loss).
//
// The shuffle is seeded so a run can be reproduced from its
// saved config.json.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Shuffle `samples` and split into (train, validation).
///
/// `dev_fraction` is clamped to [0, 1]; e.g. 0.2 holds out 20%.
pub fn split_train_val<T>(mut samples: Vec<T>, dev_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total    = samples.len();
    let dev      = ((total as f64) * dev_fraction.clamp(0.0, 1.0)).round() as usize;
    let split_at = total - dev.min(total);

    let val = samples.split_off(split_at);

    tracing::debug!(
        "Dataset split: {} training, {} validation",
        samples.len(),
        val.len(),
    );

    (samples, val)
}
