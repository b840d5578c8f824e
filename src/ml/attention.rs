// ============================================================
// Layer 5 — Attention Building Blocks
// ============================================================
// All the attention the reader needs, built from Linear
// layers and a masked softmax:
//
//   SeqAttnMatch     document token × question token similarity,
//                    returns the question embeddings aligned
//                    to each document token            [B, Ld, E]
//   LinearSeqAttn    one learned distribution over a
//                    sequence                          [B, L]
//   ObjectSeqAttn    O learned distributions over a
//                    sequence, one per document object [B, L, O]
//   BilinearSeqAttn  token · W · summary span logits   [B, L]
//
// Masks are Bool tensors where true marks padding. Masked
// positions get exactly zero attention weight; a row whose
// every position is masked gets all-zero weights instead of
// NaN.

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation::{relu, softmax},
};

/// Score given to padded document positions by the span heads.
pub const MASKED_SCORE: f32 = -1.0e30;

/// Softmax along `dim` that ignores positions where `mask` is true.
pub fn masked_softmax<B: Backend, const D: usize>(
    scores: Tensor<B, D>,
    mask:   Tensor<B, D, Bool>,
    dim:    usize,
) -> Tensor<B, D> {
    let valid   = mask.clone().bool_not().float();
    let weights = softmax(scores.mask_fill(mask, MASKED_SCORE), dim) * valid;
    let dims    = weights.dims();
    let total   = weights.clone().sum_dim(dim).clamp_min(1e-12).expand(dims);
    weights / total
}

/// Equal weight on every non-padded position. mask: [B, L] → [B, L]
pub fn uniform_weights<B: Backend>(mask: Tensor<B, 2, Bool>) -> Tensor<B, 2> {
    let [batch, len] = mask.dims();
    let valid = mask.bool_not().float();
    let count = valid.clone().sum_dim(1).clamp_min(1.0).expand([batch, len]);
    valid / count
}

/// Weighted sum over positions. x: [B, L, H], weights: [B, L] → [B, H]
pub fn weighted_avg<B: Backend>(x: Tensor<B, 3>, weights: Tensor<B, 2>) -> Tensor<B, 2> {
    let [batch, _, hidden] = x.dims();
    weights
        .unsqueeze_dim::<3>(1)
        .matmul(x)
        .reshape([batch, hidden])
}

// ─── SeqAttnMatch ─────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct SeqAttnMatchConfig {
    pub input_size: usize,
}

impl SeqAttnMatchConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> SeqAttnMatch<B> {
        SeqAttnMatch {
            linear: LinearConfig::new(self.input_size, self.input_size).init(device),
        }
    }
}

/// Question-aware document embedding.
#[derive(Module, Debug)]
pub struct SeqAttnMatch<B: Backend> {
    linear: Linear<B>,
}

impl<B: Backend> SeqAttnMatch<B> {
    /// x: [B, Ld, E], y: [B, Lq, E], y_mask: [B, Lq] → [B, Ld, E]
    pub fn forward(
        &self,
        x:      Tensor<B, 3>,
        y:      Tensor<B, 3>,
        y_mask: Tensor<B, 2, Bool>,
    ) -> Tensor<B, 3> {
        let [batch, len_x, _] = x.dims();
        let len_y = y.dims()[1];

        // Shared projection so both sides land in the same space
        let x_proj = relu(self.linear.forward(x));
        let y_proj = relu(self.linear.forward(y.clone()));
        let scores = x_proj.matmul(y_proj.swap_dims(1, 2)); // [B, Ld, Lq]

        let mask  = y_mask.unsqueeze_dim::<3>(1).expand([batch, len_x, len_y]);
        let alpha = masked_softmax(scores, mask, 2);
        alpha.matmul(y)
    }
}

// ─── LinearSeqAttn ────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct LinearSeqAttnConfig {
    pub input_size: usize,
}

impl LinearSeqAttnConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> LinearSeqAttn<B> {
        LinearSeqAttn { linear: LinearConfig::new(self.input_size, 1).init(device) }
    }
}

#[derive(Module, Debug)]
pub struct LinearSeqAttn<B: Backend> {
    linear: Linear<B>,
}

impl<B: Backend> LinearSeqAttn<B> {
    /// x: [B, L, H], mask: [B, L] → weights [B, L]
    pub fn forward(&self, x: Tensor<B, 3>, mask: Tensor<B, 2, Bool>) -> Tensor<B, 2> {
        let [batch, len, _] = x.dims();
        let scores = self.linear.forward(x).reshape([batch, len]);
        masked_softmax(scores, mask, 1)
    }
}

// ─── ObjectSeqAttn ────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct ObjectSeqAttnConfig {
    pub input_size:  usize,
    pub num_objects: usize,
}

impl ObjectSeqAttnConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ObjectSeqAttn<B> {
        ObjectSeqAttn {
            linear: LinearConfig::new(self.input_size, self.num_objects).init(device),
        }
    }
}

/// One attention distribution over the document per object.
#[derive(Module, Debug)]
pub struct ObjectSeqAttn<B: Backend> {
    linear: Linear<B>,
}

impl<B: Backend> ObjectSeqAttn<B> {
    /// x: [B, L, H], mask: [B, L] → weights [B, L, O], normalised over L
    pub fn forward(&self, x: Tensor<B, 3>, mask: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let scores = self.linear.forward(x);
        let dims   = scores.dims();
        let mask   = mask.unsqueeze_dim::<3>(2).expand(dims);
        masked_softmax(scores, mask, 1)
    }

    /// Attention-pooled object vectors. x: [B, L, H] → [B, O, H]
    pub fn pool(&self, x: Tensor<B, 3>, mask: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let weights = self.forward(x.clone(), mask);
        weights.swap_dims(1, 2).matmul(x)
    }
}

// ─── BilinearSeqAttn ──────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct BilinearSeqAttnConfig {
    pub x_size: usize,
    pub y_size: usize,
}

impl BilinearSeqAttnConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> BilinearSeqAttn<B> {
        BilinearSeqAttn { linear: LinearConfig::new(self.y_size, self.x_size).init(device) }
    }
}

/// Span head: score_i = x_i · W · y
#[derive(Module, Debug)]
pub struct BilinearSeqAttn<B: Backend> {
    linear: Linear<B>,
}

impl<B: Backend> BilinearSeqAttn<B> {
    /// x: [B, L, Hx], y: [B, Hy], x_mask: [B, L] → raw logits [B, L]
    pub fn forward(
        &self,
        x:      Tensor<B, 3>,
        y:      Tensor<B, 2>,
        x_mask: Tensor<B, 2, Bool>,
    ) -> Tensor<B, 2> {
        let [batch, len, _] = x.dims();
        let wy = self.linear.forward(y).unsqueeze_dim::<3>(2); // [B, Hx, 1]
        x.matmul(wy)
            .reshape([batch, len])
            .mask_fill(x_mask, MASKED_SCORE)
    }
}
