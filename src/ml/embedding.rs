// ============================================================
// Layer 5 — Word Embedding Table
// ============================================================
// Wraps Burn's Embedding with the three word-table policies
// the reader supports:
//
//   trainable  — one table, every row updated by the optimiser
//   fixed      — one table, frozen with Module::no_grad()
//   partial    — rows [0, boundary) in a trainable table,
//                rows [boundary, vocab) in a frozen table.
//                The lookup picks the right table per token.
//
// The padding row is never read: looked-up vectors at
// padding_idx are multiplied by zero, so the padding
// embedding is structurally the zero vector and no gradient
// flows into that row.

use burn::{
    module::Param,
    nn::{Embedding, EmbeddingConfig},
    prelude::*,
};

/// Scale every row of `weight` to unit L2 norm.
pub fn normalize_rows<B: Backend>(weight: Tensor<B, 2>) -> Tensor<B, 2> {
    let [rows, dim] = weight.dims();
    let norms = weight
        .clone()
        .powf_scalar(2.0)
        .sum_dim(1)
        .sqrt()
        .add_scalar(1e-8); // [rows, 1]
    weight / norms.expand([rows, dim])
}

/// Build an Embedding module around an existing weight matrix.
///
/// The matrix becomes a fresh leaf parameter: any graph it was
/// computed in (slicing, normalisation) is cut off.
pub fn embedding_from_weight<B: Backend>(weight: Tensor<B, 2>) -> Embedding<B> {
    Embedding { weight: Param::from_tensor(weight.detach()) }
}

/// Random table of the given shape, optionally row-normalised.
pub fn init_table<B: Backend>(
    rows:      usize,
    dim:       usize,
    normalize: bool,
    device:    &B::Device,
) -> Embedding<B> {
    let table = EmbeddingConfig::new(rows, dim).init(device);
    if normalize {
        embedding_from_weight(normalize_rows(table.weight.val()))
    } else {
        table
    }
}

#[derive(Module, Debug)]
pub struct WordEmbedding<B: Backend> {
    /// Trainable rows (all rows unless a fixed tail is split off).
    tuned:       Embedding<B>,
    /// Frozen tail for tune_partial; row 0 here is vocabulary row `boundary`.
    fixed:       Option<Embedding<B>>,
    padding_idx: usize,
}

impl<B: Backend> WordEmbedding<B> {
    /// `boundary` splits off a frozen tail; `freeze_all` freezes everything.
    pub fn new(
        weight:      Tensor<B, 2>,
        padding_idx: usize,
        freeze_all:  bool,
        boundary:    Option<usize>,
    ) -> Self {
        let [rows, dim] = weight.dims();
        let (tuned, fixed) = match boundary {
            Some(boundary) if boundary < rows => {
                let head = weight.clone().slice([0..boundary, 0..dim]);
                let tail = weight.slice([boundary..rows, 0..dim]);
                (embedding_from_weight(head), Some(embedding_from_weight(tail).no_grad()))
            }
            _ => (embedding_from_weight(weight), None),
        };
        let tuned = if freeze_all { tuned.no_grad() } else { tuned };
        Self { tuned, fixed, padding_idx }
    }

    pub fn padding_idx(&self) -> usize {
        self.padding_idx
    }

    pub fn embedding_dim(&self) -> usize {
        self.tuned.weight.dims()[1]
    }

    pub fn vocab_size(&self) -> usize {
        let tail = self.fixed.as_ref().map_or(0, |f| f.weight.dims()[0]);
        self.tuned.weight.dims()[0] + tail
    }

    /// The full table, trainable rows first.
    pub fn weight(&self) -> Tensor<B, 2> {
        match &self.fixed {
            Some(fixed) => Tensor::cat(vec![self.tuned.weight.val(), fixed.weight.val()], 0),
            None        => self.tuned.weight.val(),
        }
    }

    /// ids: [batch, len] → [batch, len, embedding_dim]
    pub fn forward(&self, ids: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let [batch, len] = ids.dims();
        let dim = self.embedding_dim();

        let embedded = match &self.fixed {
            None => self.tuned.forward(ids.clone()),
            Some(fixed) => {
                let boundary = self.tuned.weight.dims()[0] as i64;
                let in_tail  = ids
                    .clone()
                    .greater_equal_elem(boundary)
                    .unsqueeze_dim::<3>(2)
                    .expand([batch, len, dim]);
                let head = self.tuned.forward(ids.clone().clamp_max(boundary - 1));
                let tail = fixed.forward(ids.clone().sub_scalar(boundary).clamp_min(0));
                head.mask_where(in_tail, tail)
            }
        };

        let keep = ids
            .equal_elem(self.padding_idx as i64)
            .bool_not()
            .float()
            .unsqueeze_dim::<3>(2)
            .expand([batch, len, dim]);
        embedded * keep
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::TensorData;

    type TestBackend = burn::backend::NdArray;

    fn table(device: &<TestBackend as Backend>::Device) -> Tensor<TestBackend, 2> {
        // row r = [r, r + 0.5]
        let values: Vec<f32> = (0..6).flat_map(|r| [r as f32, r as f32 + 0.5]).collect();
        Tensor::from_data(TensorData::new(values, [6, 2]), device)
    }

    #[test]
    fn test_normalize_rows_gives_unit_norms() {
        let device = Default::default();
        let normed = normalize_rows(table(&device).slice([1..6, 0..2]));
        let norms: Vec<f32> = normed
            .powf_scalar(2.0)
            .sum_dim(1)
            .sqrt()
            .into_data()
            .to_vec()
            .unwrap();
        for n in norms {
            assert!((n - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_padding_index_is_zero_vector() {
        let device = Default::default();
        let emb = WordEmbedding::new(table(&device), 0, false, None);
        let ids = Tensor::<TestBackend, 1, Int>::from_ints([3, 0], &device).reshape([1, 2]);
        let out: Vec<f32> = emb.forward(ids).into_data().to_vec().unwrap();
        assert_eq!(out, vec![3.0, 3.5, 0.0, 0.0]);
    }

    #[test]
    fn test_split_and_normalized_tables_build_on_autodiff() {
        type AutodiffBackend = burn::backend::Autodiff<TestBackend>;
        let device = Default::default();

        let random = init_table::<AutodiffBackend>(6, 2, false, &device).weight.val();
        let split  = WordEmbedding::new(random, 0, false, Some(3));
        assert_eq!(split.vocab_size(), 6);

        let normed = init_table::<AutodiffBackend>(6, 2, true, &device);
        let ids = Tensor::<AutodiffBackend, 1, Int>::from_ints([1, 2], &device).reshape([1, 2]);
        let grads = normed.forward(ids).sum().backward();
        assert!(normed.weight.grad(&grads).is_some());
    }

    #[test]
    fn test_partial_table_matches_single_table_lookup() {
        let device = Default::default();
        let split = WordEmbedding::new(table(&device), 0, false, Some(3));
        let whole = WordEmbedding::new(table(&device), 0, false, None);
        assert_eq!(split.vocab_size(), 6);

        let ids = Tensor::<TestBackend, 1, Int>::from_ints([1, 2, 3, 5, 0, 4], &device)
            .reshape([2, 3]);
        let a: Vec<f32> = split.forward(ids.clone()).into_data().to_vec().unwrap();
        let b: Vec<f32> = whole.forward(ids).into_data().to_vec().unwrap();
        assert_eq!(a, b);

        let full: Vec<f32> = split.weight().into_data().to_vec().unwrap();
        let orig: Vec<f32> = table(&device).into_data().to_vec().unwrap();
        assert_eq!(full, orig);
    }
}
