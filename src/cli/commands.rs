// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `predict`, and
// their flags.
//
// Architecture flags describe the reader when no
// --model-config file is given; a config file replaces all of
// them at once.
//
// Reference: Rust Book §12 (Building a CLI Program)

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use std::fs;

use crate::application::train_use_case::TrainConfig;
use crate::ml::config::{DocReaderConfig, QuestionMerge, RnnType};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the reader on a JSON Lines file of labelled examples
    Train(TrainArgs),

    /// Extract answer spans with a trained checkpoint
    Predict(PredictArgs),
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// JSON Lines file of pre-tokenised examples
    #[arg(long, default_value = "data/train.jsonl")]
    pub data_file: String,

    /// Directory for checkpoints, config and metrics
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// JSON file with a complete reader configuration
    #[arg(long)]
    pub model_config: Option<String>,

    /// JSON matrix of pretrained word vectors (enables pretrained_words)
    #[arg(long)]
    pub embeddings_file: Option<String>,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 40)]
    pub epochs: usize,

    #[arg(long, default_value_t = 2e-3)]
    pub lr: f64,

    /// Maximum global gradient norm
    #[arg(long, default_value_t = 10.0)]
    pub grad_clip: f64,

    /// Share of labelled examples used for training; the rest validate
    #[arg(long, default_value_t = 0.9)]
    pub train_fraction: f64,

    /// Seed for the train/validation split and batch shuffling
    #[arg(long, default_value_t = 1013)]
    pub seed: u64,

    /// Longest span (in tokens) considered when decoding
    #[arg(long, default_value_t = 15)]
    pub max_span_len: usize,

    #[arg(long, default_value_t = 50_000)]
    pub vocab_size: usize,

    #[arg(long, default_value_t = 300)]
    pub embedding_dim: usize,

    /// Width of the manual per-token feature rows
    #[arg(long, default_value_t = 4)]
    pub num_features: usize,

    #[arg(long, default_value_t = 128)]
    pub hidden_size: usize,

    #[arg(long, default_value_t = 3)]
    pub doc_layers: usize,

    #[arg(long, default_value_t = 3)]
    pub question_layers: usize,

    /// lstm, gru or rnn
    #[arg(long, default_value = "lstm")]
    pub rnn_type: RnnType,

    /// avg or self_attn
    #[arg(long, default_value = "self_attn")]
    pub question_merge: QuestionMerge,

    /// Number of document objects pooled for the relation network
    #[arg(long, default_value_t = 8)]
    pub num_objects: usize,

    #[arg(long, default_value_t = 2)]
    pub reduction_ratio: usize,

    #[arg(long, default_value_t = 0.4)]
    pub dropout: f64,

    /// Train only the k most frequent pretrained word vectors (needs --embeddings-file)
    #[arg(long, default_value_t = 0)]
    pub tune_partial: usize,

    /// Freeze the pretrained word table (needs --embeddings-file)
    #[arg(long)]
    pub fix_embeddings: bool,

    /// Use POS tag embeddings
    #[arg(long)]
    pub pos: bool,

    /// Use NER tag embeddings
    #[arg(long)]
    pub ner: bool,
}

impl TrainArgs {
    fn model_from_flags(&self) -> DocReaderConfig {
        DocReaderConfig::new(self.vocab_size, self.embedding_dim)
            .with_pretrained_words(self.embeddings_file.is_some())
            .with_num_features(self.num_features)
            .with_hidden_size(self.hidden_size)
            .with_doc_layers(self.doc_layers)
            .with_question_layers(self.question_layers)
            .with_rnn_type(self.rnn_type)
            .with_question_merge(self.question_merge)
            .with_num_objects(self.num_objects)
            .with_reduction_ratio(self.reduction_ratio)
            .with_dropout_emb(self.dropout)
            .with_dropout_rnn(self.dropout)
            .with_tune_partial(self.tune_partial)
            .with_fix_embeddings(self.fix_embeddings)
            .with_pos(self.pos)
            .with_ner(self.ner)
    }

    /// Convert CLI args into the application-layer TrainConfig.
    pub fn into_config(self) -> Result<TrainConfig> {
        let model = match &self.model_config {
            Some(path) => {
                let json = fs::read_to_string(path)
                    .with_context(|| format!("Cannot read model config '{path}'"))?;
                serde_json::from_str::<DocReaderConfig>(&json)
                    .with_context(|| format!("Invalid model config '{path}'"))?
            }
            None => self.model_from_flags(),
        };

        Ok(TrainConfig {
            data_file:       self.data_file,
            embeddings_file: self.embeddings_file,
            checkpoint_dir:  self.checkpoint_dir,
            batch_size:      self.batch_size,
            epochs:          self.epochs,
            lr:              self.lr,
            grad_clip:       self.grad_clip,
            train_fraction:  self.train_fraction,
            seed:            self.seed,
            max_span_len:    self.max_span_len,
            model,
        })
    }
}

#[derive(Args, Debug)]
pub struct PredictArgs {
    /// JSON Lines file of pre-tokenised examples
    #[arg(long)]
    pub data_file: String,

    /// Directory where checkpoints were saved during training
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Longest span (in tokens) considered when decoding
    #[arg(long, default_value_t = 15)]
    pub max_span_len: usize,

    /// Number of candidate spans reported per example
    #[arg(long, default_value_t = 1)]
    pub top_k: usize,
}
