// ============================================================
// Layer 5 — Model Errors
// ============================================================
// Two failure classes reach callers of the model layer:
//
//   ConfigError — an option value or combination the reader
//                 cannot be built from. Raised by
//                 DocReaderConfig::init* before any tensor
//                 is allocated, and by the string parsers of
//                 the closed option sets (rnn_type,
//                 question_merge).
//
//   InputError  — a forward call whose arrays disagree with
//                 each other or with the built model (batch
//                 size, sequence length, feature width,
//                 missing POS/NER tags, ids past the end of
//                 an embedding table).
//
// Nothing here is retried; both propagate to the caller.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("unsupported configuration: question_merge = {0:?} (expected \"avg\" or \"self_attn\")")]
    UnsupportedQuestionMerge(String),

    #[error("unsupported configuration: rnn_type = {0:?} (expected \"lstm\", \"gru\" or \"rnn\")")]
    UnsupportedRnnType(String),

    #[error("fix_embeddings and tune_partial = {tune_partial} cannot both be set")]
    ConflictingEmbeddingPolicy { tune_partial: usize },

    #[error("tune_partial = {tune_partial} leaves no fixed rows in a vocabulary of {vocab_size}")]
    TunePartialTooLarge { tune_partial: usize, vocab_size: usize },

    #[error("padding_idx = {padding_idx} is outside a vocabulary of {vocab_size}")]
    PaddingIndex { padding_idx: usize, vocab_size: usize },

    #[error("pretrained_words is set but no embedding matrix was supplied")]
    MissingPretrained,

    #[error("pretrained embedding has shape {actual:?}, expected {expected:?}")]
    PretrainedShape { expected: [usize; 2], actual: [usize; 2] },

    #[error("{name} width {width} is not divisible by reduction_ratio {ratio}")]
    IndivisibleReduction { name: &'static str, width: usize, ratio: usize },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("{name} = {value} is outside [0, 1)")]
    DropoutRange { name: &'static str, value: f64 },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("{name} has batch size {actual}, expected {expected}")]
    BatchSize { name: &'static str, expected: usize, actual: usize },

    #[error("{name} has length {actual}, expected {expected}")]
    Length { name: &'static str, expected: usize, actual: usize },

    #[error("document features have width {actual}, expected {expected}")]
    FeatureWidth { expected: usize, actual: usize },

    #[error("{0} is empty")]
    EmptySequence(&'static str),

    #[error("{0} tags are enabled but were not supplied")]
    MissingTags(&'static str),

    #[error("{name} contain id {value}, outside a table of {limit} rows")]
    IdOutOfRange { name: &'static str, value: i64, limit: usize },
}
