// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between the dataset directory and tensor batches:
//
//   dataset root
//       │
//       ▼
//   LabeledImageCorpus → (image_path, label) per file
//       │
//       ▼
//   split_train_val    → seeded train / validation partitions
//       │
//       ▼
//   SampleDataset      → burn Dataset over one partition
//       │
//       ▼
//   EmotionBatcher     → decode + Preprocessor + stack
//
// Preprocessor is also used on its own by the inference path.

/// Scans the dataset directory and labels files
pub mod corpus;

/// Crop, resize and normalise images
pub mod preprocessor;

/// Implements burn's Dataset trait for samples
pub mod dataset;

/// Builds tensor batches, skipping undecodable samples
pub mod batcher;

/// Seeded train/validation split
pub mod splitter;
