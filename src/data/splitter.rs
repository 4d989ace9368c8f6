// ============================================================
// Layer 4 — Train/Validation Splitter
// ============================================================
// Shuffles samples with a seeded RNG and splits them into a
// training set and a validation set.
//
//   train_size = floor(ratio * n)   clamped to [1, n - 1]
//   val_size   = n - train_size
//
// The seed comes from the run configuration, so the same seed
// and the same corpus always give the same partition. Both sets
// must be non-empty, which needs at least two samples.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::error::{EmotionError, Result};

/// Number of (train, validation) samples for `n` samples at `ratio`.
pub fn split_sizes(n: usize, ratio: f64) -> Result<(usize, usize)> {
    if !(ratio > 0.0 && ratio < 1.0) {
        return Err(EmotionError::configuration(format!(
            "split ratio must be strictly between 0 and 1, got {ratio}"
        )));
    }
    if n < 2 {
        return Err(EmotionError::configuration(format!(
            "need at least 2 samples to build non-empty train and validation sets, got {n}"
        )));
    }

    let train = ((n as f64) * ratio).floor() as usize;
    let train = train.clamp(1, n - 1);
    Ok((train, n - train))
}

/// Shuffle `samples` with `seed` and split into (train, validation).
pub fn split_train_val<T>(mut samples: Vec<T>, ratio: f64, seed: u64) -> Result<(Vec<T>, Vec<T>)> {
    let (train_size, val_size) = split_sizes(samples.len(), ratio)?;

    // Fisher-Yates shuffle driven by the run's seed
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    // split_off(n) leaves [0..n) in `samples` and returns [n..)
    let val = samples.split_off(train_size);

    tracing::debug!(
        "Dataset split: {} training, {} validation (seed {})",
        train_size, val_size, seed,
    );

    Ok((samples, val))
}
