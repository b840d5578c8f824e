// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Takes pre-tokenised reader examples from disk all the way
// to padded tensor batches.
//
//   examples.jsonl
//       │
//       ▼
//   JsonlLoader       → one ReaderExample per line
//       │
//       ▼
//   split_train_val   → seeded train / validation split
//       │
//       ▼
//   ReaderDataset     → implements Burn's Dataset trait
//       │
//       ▼
//   ReaderBatcher     → pads and masks into ReaderBatch
//       │
//       ▼
//   DataLoader        → feeds batches to the training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads pre-tokenised examples from a JSON Lines file
pub mod loader;

/// Implements Burn's Dataset trait for reader examples
pub mod dataset;

/// Implements Burn's Batcher trait to create padded tensor batches
pub mod batcher;

/// Shuffles and splits data into train/validation sets
pub mod splitter;
