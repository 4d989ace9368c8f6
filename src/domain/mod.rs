// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain structs, enums and traits describing what the system
// works with. No burn types and no file I/O live here.

/// A labelled image on disk
pub mod sample;

/// Ordered emotion names bound to model outputs
pub mod vocabulary;

/// Pixel region of a detected face
pub mod bbox;

/// Outcome of classifying one image
pub mod prediction;

/// Abstractions the other layers implement
pub mod traits;
