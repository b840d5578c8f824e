// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// This layer contains ALL Burn framework specific code
// except the tensor batching in data/batcher.rs.
//
// What's in this layer:
//
//   config.rs     — DocReaderConfig and the closed option
//                   sets (RnnType, QuestionMerge)
//   error.rs      — ConfigError / InputError
//   embedding.rs  — word table with padding, freezing and
//                   partial-tuning policies
//   attention.rs  — masked softmax, question alignment,
//                   self-attention pooling, bilinear heads
//   rnn.rs        — LSTM / GRU / tanh cells and the stacked
//                   bidirectional encoder
//   relation.rs   — relation network over document objects
//   model.rs      — the DocReader forward pipeline and loss
//   trainer.rs    — Adam training loop with validation
//   inferencer.rs — checkpoint loading and span decoding
//
// Reference: Chen et al. (2017) Reading Wikipedia to Answer
//            Open-Domain Questions (DrQA)
//            Burn Book §3 (Building Blocks), §5 (Training)

pub mod attention;
pub mod config;
pub mod embedding;
pub mod error;
pub mod inferencer;
pub mod model;
pub mod relation;
pub mod rnn;
pub mod trainer;
