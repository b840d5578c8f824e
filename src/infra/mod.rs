// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by training and prediction:
//
//   checkpoint.rs — Saving and loading reader weights with
//                   Burn's CompactRecorder, plus the run
//                   config as JSON so prediction can rebuild
//                   the architecture.
//
//   metrics.rs    — Per-epoch validation metrics written to
//                   a CSV file.
//
// Reference: Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;
