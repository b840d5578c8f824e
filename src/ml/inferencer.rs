// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Runs the reader in inference mode and decodes answer spans.
//
//   examples → ReaderBatcher → DocReader::forward → logits
//            → softmax per row (real tokens only) → best span
//
// Padded positions carry a large negative logit already, but
// decoding still cuts every row to the example's own document
// length so a span can never end on padding.

use anyhow::Result;
use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::domain::{
    example::ReaderExample,
    span::{softmax, top_k_spans, Span},
    traits::SpanPredictor,
};
use crate::infra::checkpoint::CheckpointManager;
use crate::data::batcher::ReaderBatcher;
use crate::ml::model::{DocReader, SpanLogits};

fn logit_rows<B: Backend>(logits: Tensor<B, 2>) -> Result<Vec<Vec<f32>>> {
    let [_, len] = logits.dims();
    let flat: Vec<f32> = logits
        .into_data()
        .convert::<f32>()
        .to_vec()
        .map_err(|e| anyhow::anyhow!("Cannot read logits: {e:?}"))?;
    Ok(flat.chunks(len.max(1)).map(<[f32]>::to_vec).collect())
}

/// Top `k` spans per batch row, each row cut to its document length.
pub fn decode_top_k<B: Backend>(
    logits:       SpanLogits<B>,
    doc_lengths:  &[usize],
    max_span_len: usize,
    k:            usize,
) -> Result<Vec<Vec<Span>>> {
    let starts = logit_rows(logits.start)?;
    let ends   = logit_rows(logits.end)?;

    Ok(starts
        .iter()
        .zip(&ends)
        .zip(doc_lengths)
        .map(|((start, end), &len)| {
            let len = len.min(start.len());
            top_k_spans(&softmax(&start[..len]), &softmax(&end[..len]), max_span_len, k)
        })
        .collect())
}

/// Best span per batch row.
pub fn decode_spans<B: Backend>(
    logits:       SpanLogits<B>,
    doc_lengths:  &[usize],
    max_span_len: usize,
) -> Result<Vec<Option<Span>>> {
    Ok(decode_top_k(logits, doc_lengths, max_span_len, 1)?
        .into_iter()
        .map(|spans| spans.into_iter().next())
        .collect())
}

pub struct Inferencer<B: Backend> {
    model:        DocReader<B>,
    batcher:      ReaderBatcher<B>,
    max_span_len: usize,
    batch_size:   usize,
}

impl<B: Backend> Inferencer<B> {
    pub fn new(model: DocReader<B>, device: B::Device, max_span_len: usize, batch_size: usize) -> Self {
        let batcher = ReaderBatcher::new(device, model.num_features)
            .with_padding_idx(model.embedding.padding_idx());
        Self { model, batcher, max_span_len, batch_size: batch_size.max(1) }
    }

    /// Rebuild the trained reader from a checkpoint directory.
    pub fn from_checkpoint(
        ckpt_manager: &CheckpointManager,
        device:       B::Device,
        max_span_len: usize,
    ) -> Result<Self> {
        let (cfg, model) = ckpt_manager.restore::<B>(&device)?;
        tracing::info!("Model loaded from checkpoint in '{}'", ckpt_manager.dir().display());
        Ok(Self::new(model, device, max_span_len, cfg.batch_size))
    }

    /// Manual feature width the reader was built for.
    pub fn num_features(&self) -> usize {
        self.model.num_features
    }

    /// The `k` best spans per example, best first.
    pub fn predict_top_k(&self, examples: &[ReaderExample], k: usize) -> Result<Vec<Vec<Span>>> {
        let mut out = Vec::with_capacity(examples.len());
        for chunk in examples.chunks(self.batch_size) {
            let batch  = self.batcher.batch(chunk.to_vec());
            let logits = self.model.forward(batch.input)?;
            out.extend(decode_top_k(logits, &batch.doc_lengths, self.max_span_len, k)?);
        }
        tracing::debug!("Decoded spans for {} examples", out.len());
        Ok(out)
    }
}

impl<B: Backend> SpanPredictor for Inferencer<B> {
    fn predict(&self, examples: &[ReaderExample]) -> Result<Vec<Option<Span>>> {
        Ok(self
            .predict_top_k(examples, 1)?
            .into_iter()
            .map(|spans| spans.into_iter().next())
            .collect())
    }
}
