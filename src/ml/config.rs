// ============================================================
// Layer 5 — Reader Configuration
// ============================================================
// Every hyperparameter of the document reader lives in
// DocReaderConfig. The two closed option sets are enums:
//
//   RnnType        lstm | gru | rnn
//   QuestionMerge  avg  | self_attn
//
// Both parse from their snake_case names (JSON files, CLI
// flags) and reject anything else with ConfigError, so an
// unknown policy never survives past loading.
//
// validate() checks the remaining cross-field rules. The
// init* constructors in model.rs call it before building a
// single parameter.

use std::{fmt, str::FromStr};

use burn::config::Config;
use serde::{Deserialize, Serialize};

use crate::ml::error::ConfigError;

/// Recurrent cell family shared by the document and question encoders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum RnnType {
    Lstm,
    Gru,
    Rnn,
}

impl RnnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RnnType::Lstm => "lstm",
            RnnType::Gru  => "gru",
            RnnType::Rnn  => "rnn",
        }
    }

    /// Number of stacked gate blocks in the cell's projections.
    pub fn num_gates(&self) -> usize {
        match self {
            RnnType::Lstm => 4,
            RnnType::Gru  => 3,
            RnnType::Rnn  => 1,
        }
    }
}

impl FromStr for RnnType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lstm" => Ok(RnnType::Lstm),
            "gru"  => Ok(RnnType::Gru),
            "rnn"  => Ok(RnnType::Rnn),
            other  => Err(ConfigError::UnsupportedRnnType(other.to_string())),
        }
    }
}

impl TryFrom<String> for RnnType {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for RnnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the question hidden states collapse into one summary vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum QuestionMerge {
    /// Uniform average over non-padded positions.
    Avg,
    /// Learned linear-softmax attention over positions.
    SelfAttn,
}

impl QuestionMerge {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionMerge::Avg      => "avg",
            QuestionMerge::SelfAttn => "self_attn",
        }
    }
}

impl FromStr for QuestionMerge {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "avg"       => Ok(QuestionMerge::Avg),
            "self_attn" => Ok(QuestionMerge::SelfAttn),
            other       => Err(ConfigError::UnsupportedQuestionMerge(other.to_string())),
        }
    }
}

impl TryFrom<String> for QuestionMerge {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for QuestionMerge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct DocReaderConfig {
    /// Rows of the word embedding table, padding and unknown included.
    pub vocab_size:    usize,
    pub embedding_dim: usize,

    /// Word table comes from a caller-supplied pretrained matrix.
    #[config(default = false)]
    pub pretrained_words: bool,
    /// Freeze the whole word table. Applies to pretrained tables only.
    #[config(default = false)]
    pub fix_embeddings: bool,
    /// Keep only the first tune_partial + 2 rows trainable. Applies to
    /// pretrained tables only.
    #[config(default = 0)]
    pub tune_partial: usize,
    /// Row-wise L2 normalisation of the embedding tables at construction.
    #[config(default = false)]
    pub normalize_emb: bool,
    #[config(default = 0)]
    pub padding_idx: usize,

    #[config(default = false)]
    pub pos: bool,
    #[config(default = 56)]
    pub pos_size: usize,
    #[config(default = 12)]
    pub pos_dim: usize,

    #[config(default = false)]
    pub ner: bool,
    #[config(default = 19)]
    pub ner_size: usize,
    #[config(default = 8)]
    pub ner_dim: usize,

    /// Append the question-aligned embedding to every document token.
    #[config(default = true)]
    pub use_qemb: bool,
    #[config(default = 4)]
    pub num_features: usize,

    #[config(default = 128)]
    pub hidden_size: usize,
    #[config(default = 3)]
    pub doc_layers: usize,
    #[config(default = 3)]
    pub question_layers: usize,
    #[config(default = "RnnType::Lstm")]
    pub rnn_type: RnnType,
    #[config(default = true)]
    pub rnn_padding: bool,
    #[config(default = true)]
    pub concat_rnn_layers: bool,

    #[config(default = 0.4)]
    pub dropout_emb: f64,
    #[config(default = 0.4)]
    pub dropout_rnn: f64,
    #[config(default = true)]
    pub dropout_rnn_output: bool,

    #[config(default = 8)]
    pub num_objects: usize,
    #[config(default = 2)]
    pub reduction_ratio: usize,
    #[config(default = "QuestionMerge::SelfAttn")]
    pub question_merge: QuestionMerge,
    /// Combine every object pair with the question instead of each
    /// object with the question alone.
    #[config(default = true)]
    pub relation_pairs: bool,
}

impl DocReaderConfig {
    /// Width of the document encoder input: word embedding, manual
    /// features, aligned question embedding, POS and NER embeddings.
    pub fn doc_input_size(&self) -> usize {
        let mut size = self.embedding_dim + self.num_features;
        if self.use_qemb { size += self.embedding_dim; }
        if self.pos      { size += self.pos_dim; }
        if self.ner      { size += self.ner_dim; }
        size
    }

    pub fn doc_hidden_size(&self) -> usize {
        self.encoder_width(self.doc_layers)
    }

    pub fn question_hidden_size(&self) -> usize {
        self.encoder_width(self.question_layers)
    }

    pub fn doc_reduced_size(&self) -> usize {
        self.doc_hidden_size() / self.reduction_ratio.max(1)
    }

    pub fn question_reduced_size(&self) -> usize {
        self.question_hidden_size() / self.reduction_ratio.max(1)
    }

    /// First word-table row that is kept fixed under tune_partial.
    pub fn tune_boundary(&self) -> Option<usize> {
        (self.tune_partial > 0).then_some(self.tune_partial + 2)
    }

    fn encoder_width(&self, layers: usize) -> usize {
        if self.concat_rnn_layers {
            2 * self.hidden_size * layers
        } else {
            2 * self.hidden_size
        }
    }

    /// Reject option combinations the reader cannot be built from.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("vocab_size",      self.vocab_size),
            ("embedding_dim",   self.embedding_dim),
            ("hidden_size",     self.hidden_size),
            ("doc_layers",      self.doc_layers),
            ("question_layers", self.question_layers),
            ("num_objects",     self.num_objects),
            ("reduction_ratio", self.reduction_ratio),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ConfigError::Zero(name));
            }
        }
        if self.pos && (self.pos_size == 0 || self.pos_dim == 0) {
            return Err(ConfigError::Zero("pos_size/pos_dim"));
        }
        if self.ner && (self.ner_size == 0 || self.ner_dim == 0) {
            return Err(ConfigError::Zero("ner_size/ner_dim"));
        }

        for (name, value) in [("dropout_emb", self.dropout_emb), ("dropout_rnn", self.dropout_rnn)] {
            if !(0.0..1.0).contains(&value) {
                return Err(ConfigError::DropoutRange { name, value });
            }
        }

        if self.padding_idx >= self.vocab_size {
            return Err(ConfigError::PaddingIndex {
                padding_idx: self.padding_idx,
                vocab_size:  self.vocab_size,
            });
        }

        if self.fix_embeddings && self.tune_partial > 0 {
            return Err(ConfigError::ConflictingEmbeddingPolicy {
                tune_partial: self.tune_partial,
            });
        }
        if let Some(boundary) = self.tune_boundary() {
            if boundary >= self.vocab_size {
                return Err(ConfigError::TunePartialTooLarge {
                    tune_partial: self.tune_partial,
                    vocab_size:   self.vocab_size,
                });
            }
        }

        for (name, width) in [
            ("document encoder", self.doc_hidden_size()),
            ("question encoder", self.question_hidden_size()),
        ] {
            if width % self.reduction_ratio != 0 {
                return Err(ConfigError::IndivisibleReduction {
                    name,
                    width,
                    ratio: self.reduction_ratio,
                });
            }
        }

        if !self.rnn_padding {
            tracing::warn!(
                "rnn_padding = false requested; padded steps are always skipped by the encoders"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> DocReaderConfig {
        DocReaderConfig::new(20, 6)
            .with_hidden_size(4)
            .with_doc_layers(1)
            .with_question_layers(1)
            .with_num_objects(2)
    }

    #[test]
    fn test_closed_options_parse() {
        assert_eq!("gru".parse::<RnnType>(), Ok(RnnType::Gru));
        assert_eq!("self_attn".parse::<QuestionMerge>(), Ok(QuestionMerge::SelfAttn));
        assert_eq!(
            "max".parse::<QuestionMerge>(),
            Err(ConfigError::UnsupportedQuestionMerge("max".into()))
        );
        assert!(matches!("transformer".parse::<RnnType>(), Err(ConfigError::UnsupportedRnnType(_))));
    }

    #[test]
    fn test_unknown_question_merge_rejected_when_loading_json() {
        let mut value = serde_json::to_value(small()).unwrap();
        value["question_merge"] = serde_json::json!("max");
        let err = serde_json::from_value::<DocReaderConfig>(value).unwrap_err();
        assert!(err.to_string().contains("unsupported configuration"));
    }

    #[test]
    fn test_json_round_trip_keeps_enums() {
        let cfg = small().with_rnn_type(RnnType::Gru).with_question_merge(QuestionMerge::Avg);
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains("\"gru\""));
        let back: DocReaderConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.rnn_type, RnnType::Gru);
        assert_eq!(back.question_merge, QuestionMerge::Avg);
    }

    #[test]
    fn test_embedding_policies_are_exclusive() {
        let cfg = small().with_fix_embeddings(true).with_tune_partial(5);
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::ConflictingEmbeddingPolicy { tune_partial: 5 })
        );
    }

    #[test]
    fn test_tune_partial_must_leave_fixed_rows() {
        // 18 + 2 == vocab_size → nothing left to freeze
        let cfg = small().with_tune_partial(18);
        assert!(matches!(cfg.validate(), Err(ConfigError::TunePartialTooLarge { .. })));
        assert!(small().with_tune_partial(17).validate().is_ok());
    }

    #[test]
    fn test_padding_index_inside_vocabulary() {
        let cfg = small().with_padding_idx(20);
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::PaddingIndex { padding_idx: 20, vocab_size: 20 })
        );
        assert!(small().with_padding_idx(1).validate().is_ok());
    }

    #[test]
    fn test_widths() {
        let cfg = small()
            .with_doc_layers(3)
            .with_num_features(2)
            .with_pos(true)
            .with_pos_dim(5);
        // 6 word + 2 features + 6 qemb + 5 pos
        assert_eq!(cfg.doc_input_size(), 19);
        // concat of 3 bidirectional layers of width 4
        assert_eq!(cfg.doc_hidden_size(), 24);
        assert_eq!(cfg.doc_reduced_size(), 12);
        assert_eq!(cfg.question_reduced_size(), 4);
    }

    #[test]
    fn test_reduction_must_divide() {
        let cfg = small().with_reduction_ratio(3);
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::IndivisibleReduction { width: 8, ratio: 3, .. })
        ));
    }

    #[test]
    fn test_dropout_range() {
        let cfg = small().with_dropout_rnn(1.0);
        assert!(matches!(cfg.validate(), Err(ConfigError::DropoutRange { name: "dropout_rnn", .. })));
    }
}
