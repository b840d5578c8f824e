// ============================================================
// Layer 3 — Reader Example
// ============================================================
// One pre-tokenised document/question pair, exactly as it is
// stored in the JSON Lines data files:
//
//   {"id": "q17",
//    "document": [12, 845, 3, ...],       word ids, 0 = padding
//    "features": [[1.0, 0.0, 0.0, 0.2], ...],  one row per token
//    "pos": [4, 9, ...], "ner": [0, 0, ...],   optional tag ids
//    "question": [33, 7, ...],
//    "answer_start": 5, "answer_end": 7,       optional gold span
//    "document_tokens": ["The", "ceremony", ...]}  optional text
//
// Vocabulary lookup happens upstream; this type only
// carries ids.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderExample {
    pub id: String,

    pub document: Vec<u32>,

    /// Manual per-token features; missing rows are zero-filled by the batcher.
    #[serde(default)]
    pub features: Vec<Vec<f32>>,

    #[serde(default)]
    pub pos: Vec<u32>,

    #[serde(default)]
    pub ner: Vec<u32>,

    pub question: Vec<u32>,

    /// Gold span, inclusive on both ends.
    #[serde(default)]
    pub answer_start: Option<usize>,
    #[serde(default)]
    pub answer_end:   Option<usize>,

    #[serde(default)]
    pub document_tokens: Vec<String>,
}

impl ReaderExample {
    pub fn doc_len(&self) -> usize {
        self.document.len()
    }

    pub fn question_len(&self) -> usize {
        self.question.len()
    }

    /// (start, end) when both ends of the gold span are known.
    pub fn answer_span(&self) -> Option<(usize, usize)> {
        self.answer_start.zip(self.answer_end)
    }

    /// Surface text of the inclusive token range, if tokens were supplied.
    pub fn answer_text(&self, start: usize, end: usize) -> Option<String> {
        if self.document_tokens.is_empty() || end >= self.document_tokens.len() || start > end {
            return None;
        }
        Some(self.document_tokens[start..=end].join(" "))
    }

    /// Structural checks that do not depend on the model configuration.
    pub fn validate(&self, num_features: usize) -> Result<()> {
        if self.document.is_empty() {
            bail!("example '{}' has an empty document", self.id);
        }
        if self.question.is_empty() {
            bail!("example '{}' has an empty question", self.id);
        }
        let len = self.doc_len();
        if let Some(row) = self.features.iter().find(|row| row.len() != num_features) {
            bail!(
                "example '{}' has a feature row of width {}, expected {}",
                self.id, row.len(), num_features
            );
        }
        for (name, tags) in [("features", self.features.len()), ("pos", self.pos.len()), ("ner", self.ner.len())] {
            if tags != 0 && tags != len {
                bail!("example '{}' has {} {} entries for {} tokens", self.id, tags, name, len);
            }
        }
        if let Some((start, end)) = self.answer_span() {
            if start > end || end >= len {
                bail!("example '{}' has answer span [{}, {}] outside a document of {}", self.id, start, end, len);
            }
        }
        Ok(())
    }
}
