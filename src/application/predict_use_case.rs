// ============================================================
// Layer 2 — Predict Use Case
// ============================================================
// Loads a trained reader from its checkpoint directory and
// extracts an answer span for every example in a data file.
//
//   checkpoint dir → Inferencer (config + weights)
//   examples.jsonl → JsonlLoader → Inferencer::predict_top_k
//                  → one Prediction per example
//
// Gold spans in the input are ignored.

use anyhow::Result;
use serde::Serialize;

use crate::data::loader::JsonlLoader;
use crate::domain::{example::ReaderExample, span::Span, traits::ExampleSource};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::inferencer::Inferencer;

type InferBackend = burn::backend::Wgpu;

/// One decoded answer, serialised as a JSON line by the CLI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub id:     String,
    pub start:  Option<usize>,
    pub end:    Option<usize>,
    pub score:  Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<Span>,
}

impl Prediction {
    /// `spans` best first; the first becomes the answer, the rest alternatives.
    pub fn from_spans(example: &ReaderExample, spans: Vec<Span>) -> Self {
        let mut spans = spans.into_iter();
        let best = spans.next();
        Self {
            id:           example.id.clone(),
            start:        best.map(|s| s.start),
            end:          best.map(|s| s.end),
            score:        best.map(|s| s.score),
            answer:       best.and_then(|s| example.answer_text(s.start, s.end)),
            alternatives: spans.collect(),
        }
    }
}

pub struct PredictUseCase {
    inferencer: Inferencer<InferBackend>,
    top_k:      usize,
}

impl PredictUseCase {
    pub fn new(checkpoint_dir: &str, max_span_len: usize, top_k: usize) -> Result<Self> {
        let ckpt   = CheckpointManager::new(checkpoint_dir)?;
        let device = burn::backend::wgpu::WgpuDevice::default();
        let inferencer = Inferencer::from_checkpoint(&ckpt, device, max_span_len)?;
        Ok(Self { inferencer, top_k: top_k.max(1) })
    }

    pub fn run(&self, data_file: &str) -> Result<Vec<Prediction>> {
        let loader   = JsonlLoader::new(data_file, self.inferencer.num_features());
        let examples = loader.load_all()?;
        if examples.is_empty() {
            tracing::warn!("No examples found in '{}'", data_file);
            return Ok(Vec::new());
        }

        let spans = self.inferencer.predict_top_k(&examples, self.top_k)?;
        Ok(examples
            .iter()
            .zip(spans)
            .map(|(example, spans)| Prediction::from_spans(example, spans))
            .collect())
    }
}
