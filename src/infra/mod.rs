// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything that touches the disk on behalf of other layers:
//
//   checkpoint.rs — model weights (burn NamedMpkGzFileRecorder),
//                   checkpoint.json metadata and train_config.json.
//                   Writes go to a temp file and are renamed into
//                   place, so a reader never sees half a checkpoint.
//
//   metrics.rs    — one CSV row per epoch: loss, validation
//                   accuracy, skipped samples, checkpoint flag.

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;
