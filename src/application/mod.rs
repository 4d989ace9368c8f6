// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers into the two things a user does:
// fit a model on a labelled corpus, or ask a fitted model what
// emotion a face shows.
//
// Rules for this layer:
//   - No tensor math or model code here
//   - No printing here (that's Layer 1)
//   - Only workflow coordination

// The training workflow
pub mod train_use_case;

// Checkpoint + localizer + classifier, loaded once
pub mod inference_service;

// axum routes over InferenceService
pub mod web;
