// ============================================================
// Layer 4 — Reader Batcher
// ============================================================
// Implements Burn's Batcher trait to turn a Vec<ReaderExample>
// into the tensors of one forward call.
//
// Examples have different lengths, so each batch is padded
// to its own longest document and longest question with the
// word table's padding index (0 unless configured):
//
//   document  [5, 6, 7]        →  [5, 6, 7, 0, 0]
//   mask      (true = padding) →  [F, F, F, T, T]
//
// Manual features are zero-filled on padded positions (and
// for examples that carry none). POS/NER arrays are only
// produced when at least one example in the batch has tags;
// the model rejects a batch without them if it needs them.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
    tensor::TensorData,
};

use crate::domain::example::ReaderExample;
use crate::ml::model::ReaderInput;

// ─── ReaderBatch ──────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct ReaderBatch<B: Backend> {
    pub input: ReaderInput<B>,

    /// Gold start positions [batch]; 0 for unlabelled examples.
    pub start_positions: Tensor<B, 1, Int>,

    /// Gold end positions [batch]; 0 for unlabelled examples.
    pub end_positions: Tensor<B, 1, Int>,

    /// Unpadded document length of each example.
    pub doc_lengths: Vec<usize>,
}

// ─── ReaderBatcher ────────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct ReaderBatcher<B: Backend> {
    pub device:       B::Device,
    pub num_features: usize,
    /// Word id written into padded document/question slots.
    pub padding_idx:  usize,
}

impl<B: Backend> ReaderBatcher<B> {
    pub fn new(device: B::Device, num_features: usize) -> Self {
        Self { device, num_features, padding_idx: 0 }
    }

    pub fn with_padding_idx(mut self, padding_idx: usize) -> Self {
        self.padding_idx = padding_idx;
        self
    }

    /// Row-major ids padded with `pad` to `len`, as a [batch, len] tensor.
    fn padded_ids<'a>(
        &self,
        rows: impl Iterator<Item = &'a [u32]>,
        batch: usize,
        len: usize,
        pad: i32,
    ) -> Tensor<B, 2, Int> {
        let flat: Vec<i32> = rows
            .flat_map(|row| (0..len).map(move |i| row.get(i).map_or(pad, |&x| x as i32)))
            .collect();
        Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &self.device).reshape([batch, len])
    }

    /// true where position i is beyond the row's real length.
    fn padding_mask(&self, lengths: &[usize], len: usize) -> Tensor<B, 2, Bool> {
        let flat: Vec<bool> = lengths
            .iter()
            .flat_map(|&n| (0..len).map(move |i| i >= n))
            .collect();
        Tensor::from_data(TensorData::new(flat, [lengths.len(), len]), &self.device)
    }

    fn features(&self, items: &[ReaderExample], doc_len: usize) -> Tensor<B, 3> {
        let width = self.num_features;
        let mut flat = vec![0.0f32; items.len() * doc_len * width];
        for (b, example) in items.iter().enumerate() {
            for (t, row) in example.features.iter().take(doc_len).enumerate() {
                let offset = (b * doc_len + t) * width;
                for (k, value) in row.iter().take(width).enumerate() {
                    flat[offset + k] = *value;
                }
            }
        }
        Tensor::from_data(TensorData::new(flat, [items.len(), doc_len, width]), &self.device)
    }

    fn tags(
        &self,
        items:   &[ReaderExample],
        select:  fn(&ReaderExample) -> &[u32],
        doc_len: usize,
    ) -> Option<Tensor<B, 2, Int>> {
        if items.iter().all(|e| select(e).is_empty()) {
            return None;
        }
        Some(self.padded_ids(items.iter().map(select), items.len(), doc_len, 0))
    }
}

impl<B: Backend> Batcher<ReaderExample, ReaderBatch<B>> for ReaderBatcher<B> {
    fn batch(&self, items: Vec<ReaderExample>) -> ReaderBatch<B> {
        let batch = items.len();
        let pad   = self.padding_idx as i32;
        let doc_lengths: Vec<usize> = items.iter().map(|e| e.doc_len()).collect();
        let q_lengths:   Vec<usize> = items.iter().map(|e| e.question_len()).collect();
        let doc_len = doc_lengths.iter().copied().max().unwrap_or(0).max(1);
        let q_len   = q_lengths.iter().copied().max().unwrap_or(0).max(1);

        let input = ReaderInput {
            doc_ids:       self.padded_ids(items.iter().map(|e| e.document.as_slice()), batch, doc_len, pad),
            doc_features:  self.features(&items, doc_len),
            doc_pos:       self.tags(&items, |e| e.pos.as_slice(), doc_len),
            doc_ner:       self.tags(&items, |e| e.ner.as_slice(), doc_len),
            doc_mask:      self.padding_mask(&doc_lengths, doc_len),
            question_ids:  self.padded_ids(items.iter().map(|e| e.question.as_slice()), batch, q_len, pad),
            question_mask: self.padding_mask(&q_lengths, q_len),
        };

        let starts: Vec<i32> = items
            .iter()
            .map(|e| e.answer_span().map_or(0, |(s, _)| s as i32))
            .collect();
        let ends: Vec<i32> = items
            .iter()
            .map(|e| e.answer_span().map_or(0, |(_, e)| e as i32))
            .collect();

        ReaderBatch {
            input,
            start_positions: Tensor::<B, 1, Int>::from_ints(starts.as_slice(), &self.device),
            end_positions:   Tensor::<B, 1, Int>::from_ints(ends.as_slice(), &self.device),
            doc_lengths,
        }
    }
}
