// ============================================================
// Layer 5 — Stacked Bidirectional Recurrent Encoder
// ============================================================
// Each layer runs one cell forward over the sequence and a
// second cell backward, then concatenates both directions
// per position:
//
//   input [B, L, D]
//     │  locked dropout (same mask for every time step)
//     ▼
//   ┌──────────── layer 1 ────────────┐
//   │ forward cell  t = 0 .. L-1      │ ──┐
//   │ backward cell t = L-1 .. 0      │ ──┴─ cat → [B, L, 2H]
//   └─────────────────────────────────┘
//     │  ... repeated num_layers times
//     ▼
//   concat of every layer's output  [B, L, 2H·layers]
//   (or only the last layer's)      [B, L, 2H]
//
// Padding: each step blends the new state with the old one
// through the mask, so a padded step leaves the state
// untouched in both directions and emits a zero vector. The
// result matches running packed sequences; the content of
// padded positions never reaches a real token.
//
// Cell families (lstm, gru, rnn) are variants of one Module
// enum, picked once when the encoder is built.

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::{
        activation::{sigmoid, tanh},
        Distribution,
    },
};

use crate::ml::config::RnnType;

// ─── Locked dropout ───────────────────────────────────────────────────────────
/// Dropout whose mask is shared by every time step of a sequence.
/// Active only on autodiff backends, like Burn's own Dropout.
#[derive(Module, Clone, Debug)]
pub struct LockedDropout {
    prob: f64,
}

impl LockedDropout {
    pub fn new(prob: f64) -> Self {
        Self { prob }
    }

    /// x: [B, L, D] → [B, L, D]
    pub fn forward<B: Backend>(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        if !B::ad_enabled() || self.prob == 0.0 {
            return x;
        }
        let [batch, len, dim] = x.dims();
        let keep = 1.0 - self.prob;
        let mask = Tensor::<B, 3>::random([batch, 1, dim], Distribution::Bernoulli(keep), &x.device())
            .div_scalar(keep)
            .expand([batch, len, dim]);
        x * mask
    }
}

// ─── Recurrent state ──────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct RecurrentState<B: Backend> {
    pub hidden: Tensor<B, 2>,
    /// LSTM memory cell; carried unchanged by the other cells.
    pub memory: Tensor<B, 2>,
}

impl<B: Backend> RecurrentState<B> {
    pub fn zeros(batch: usize, hidden: usize, device: &B::Device) -> Self {
        Self {
            hidden: Tensor::zeros([batch, hidden], device),
            memory: Tensor::zeros([batch, hidden], device),
        }
    }

    /// keep: [B, H] of 0/1 — take `next` where 1, stay where 0.
    fn blend(self, next: Self, keep: Tensor<B, 2>) -> Self {
        let stay = keep.clone().neg().add_scalar(1.0);
        Self {
            hidden: next.hidden * keep.clone() + self.hidden * stay.clone(),
            memory: next.memory * keep + self.memory * stay,
        }
    }
}

/// Columns [index·width, (index+1)·width) of a stacked gate tensor.
fn gate<B: Backend>(gates: &Tensor<B, 2>, index: usize, width: usize) -> Tensor<B, 2> {
    let [batch, _] = gates.dims();
    gates.clone().slice([0..batch, index * width..(index + 1) * width])
}

// ─── Cells ────────────────────────────────────────────────────────────────────
// Every cell receives its input already projected through `input`
// (done once for the whole sequence) and applies `hidden` per step.

#[derive(Module, Debug)]
pub struct LstmCell<B: Backend> {
    input:       Linear<B>,
    hidden:      Linear<B>,
    hidden_size: usize,
}

impl<B: Backend> LstmCell<B> {
    fn step(&self, x_gates: Tensor<B, 2>, state: &RecurrentState<B>) -> RecurrentState<B> {
        let h = self.hidden_size;
        let gates = x_gates + self.hidden.forward(state.hidden.clone());

        let input_gate  = sigmoid(gate(&gates, 0, h));
        let forget_gate = sigmoid(gate(&gates, 1, h));
        let candidate   = tanh(gate(&gates, 2, h));
        let output_gate = sigmoid(gate(&gates, 3, h));

        let memory = forget_gate * state.memory.clone() + input_gate * candidate;
        let hidden = output_gate * tanh(memory.clone());
        RecurrentState { hidden, memory }
    }
}

#[derive(Module, Debug)]
pub struct GruCell<B: Backend> {
    input:       Linear<B>,
    hidden:      Linear<B>,
    hidden_size: usize,
}

impl<B: Backend> GruCell<B> {
    fn step(&self, x_gates: Tensor<B, 2>, state: &RecurrentState<B>) -> RecurrentState<B> {
        let h = self.hidden_size;
        let h_gates = self.hidden.forward(state.hidden.clone());

        let reset  = sigmoid(gate(&x_gates, 0, h) + gate(&h_gates, 0, h));
        let update = sigmoid(gate(&x_gates, 1, h) + gate(&h_gates, 1, h));
        let candidate = tanh(gate(&x_gates, 2, h) + reset * gate(&h_gates, 2, h));

        // (1 - z) · n + z · h
        let hidden = candidate.clone() + update * (state.hidden.clone() - candidate);
        RecurrentState { hidden, memory: state.memory.clone() }
    }
}

/// Elman cell: h' = tanh(W x + U h)
#[derive(Module, Debug)]
pub struct TanhCell<B: Backend> {
    input:       Linear<B>,
    hidden:      Linear<B>,
    hidden_size: usize,
}

impl<B: Backend> TanhCell<B> {
    fn step(&self, x_gates: Tensor<B, 2>, state: &RecurrentState<B>) -> RecurrentState<B> {
        let hidden = tanh(x_gates + self.hidden.forward(state.hidden.clone()));
        RecurrentState { hidden, memory: state.memory.clone() }
    }
}

#[derive(Module, Debug)]
pub enum RecurrentCell<B: Backend> {
    Lstm(LstmCell<B>),
    Gru(GruCell<B>),
    Rnn(TanhCell<B>),
}

impl<B: Backend> RecurrentCell<B> {
    pub fn new(rnn_type: RnnType, input_size: usize, hidden_size: usize, device: &B::Device) -> Self {
        let width  = rnn_type.num_gates() * hidden_size;
        let input  = LinearConfig::new(input_size, width).init(device);
        let hidden = LinearConfig::new(hidden_size, width).init(device);
        match rnn_type {
            RnnType::Lstm => RecurrentCell::Lstm(LstmCell { input, hidden, hidden_size }),
            RnnType::Gru  => RecurrentCell::Gru(GruCell { input, hidden, hidden_size }),
            RnnType::Rnn  => RecurrentCell::Rnn(TanhCell { input, hidden, hidden_size }),
        }
    }

    pub fn rnn_type(&self) -> RnnType {
        match self {
            RecurrentCell::Lstm(_) => RnnType::Lstm,
            RecurrentCell::Gru(_)  => RnnType::Gru,
            RecurrentCell::Rnn(_)  => RnnType::Rnn,
        }
    }

    pub fn hidden_size(&self) -> usize {
        match self {
            RecurrentCell::Lstm(c) => c.hidden_size,
            RecurrentCell::Gru(c)  => c.hidden_size,
            RecurrentCell::Rnn(c)  => c.hidden_size,
        }
    }

    fn project_input(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        match self {
            RecurrentCell::Lstm(c) => c.input.forward(x),
            RecurrentCell::Gru(c)  => c.input.forward(x),
            RecurrentCell::Rnn(c)  => c.input.forward(x),
        }
    }

    fn step(&self, x_gates: Tensor<B, 2>, state: &RecurrentState<B>) -> RecurrentState<B> {
        match self {
            RecurrentCell::Lstm(c) => c.step(x_gates, state),
            RecurrentCell::Gru(c)  => c.step(x_gates, state),
            RecurrentCell::Rnn(c)  => c.step(x_gates, state),
        }
    }

    /// Run the cell over a whole sequence.
    ///
    /// x: [B, L, D], valid: [B, L] (1 = real token) → [B, L, H],
    /// zero at padded positions. `reverse` walks from the last step.
    pub fn scan(&self, x: Tensor<B, 3>, valid: Tensor<B, 2>, reverse: bool) -> Tensor<B, 3> {
        let [batch, len, _] = x.dims();
        let hidden_size = self.hidden_size();
        let device = x.device();

        let projected = self.project_input(x);
        let width = projected.dims()[2];

        let steps: Vec<usize> = if reverse {
            (0..len).rev().collect()
        } else {
            (0..len).collect()
        };

        let mut state = RecurrentState::zeros(batch, hidden_size, &device);
        let mut outputs = Vec::with_capacity(len);
        for t in steps {
            let x_t = projected
                .clone()
                .slice([0..batch, t..t + 1, 0..width])
                .reshape([batch, width]);
            let keep = valid
                .clone()
                .slice([0..batch, t..t + 1])
                .expand([batch, hidden_size]);

            let next = self.step(x_t, &state);
            state = state.blend(next, keep.clone());
            outputs.push(state.hidden.clone() * keep);
        }
        if reverse {
            outputs.reverse();
        }
        Tensor::stack(outputs, 1)
    }
}

// ─── One bidirectional layer ──────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct BidirectionalLayer<B: Backend> {
    forward_cell:  RecurrentCell<B>,
    backward_cell: RecurrentCell<B>,
}

impl<B: Backend> BidirectionalLayer<B> {
    /// x: [B, L, D], valid: [B, L] → [B, L, 2H]
    pub fn forward(&self, x: Tensor<B, 3>, valid: Tensor<B, 2>) -> Tensor<B, 3> {
        let ahead  = self.forward_cell.scan(x.clone(), valid.clone(), false);
        let behind = self.backward_cell.scan(x, valid, true);
        Tensor::cat(vec![ahead, behind], 2)
    }
}

// ─── StackedBrnn ──────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct StackedBrnnConfig {
    pub input_size:  usize,
    pub hidden_size: usize,
    pub num_layers:  usize,
    #[config(default = "RnnType::Lstm")]
    pub rnn_type: RnnType,
    #[config(default = 0.0)]
    pub dropout_rate: f64,
    /// Also drop out the final (possibly concatenated) output.
    #[config(default = false)]
    pub dropout_output: bool,
    #[config(default = false)]
    pub concat_layers: bool,
}

impl StackedBrnnConfig {
    pub fn output_size(&self) -> usize {
        if self.concat_layers {
            2 * self.hidden_size * self.num_layers
        } else {
            2 * self.hidden_size
        }
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> StackedBrnn<B> {
        let layers = (0..self.num_layers)
            .map(|i| {
                let input_size = if i == 0 { self.input_size } else { 2 * self.hidden_size };
                BidirectionalLayer {
                    forward_cell:  RecurrentCell::new(self.rnn_type, input_size, self.hidden_size, device),
                    backward_cell: RecurrentCell::new(self.rnn_type, input_size, self.hidden_size, device),
                }
            })
            .collect();
        StackedBrnn {
            layers,
            dropout:        LockedDropout::new(self.dropout_rate),
            dropout_output: self.dropout_output,
            concat_layers:  self.concat_layers,
        }
    }
}

#[derive(Module, Debug)]
pub struct StackedBrnn<B: Backend> {
    layers:         Vec<BidirectionalLayer<B>>,
    dropout:        LockedDropout,
    dropout_output: bool,
    concat_layers:  bool,
}

impl<B: Backend> StackedBrnn<B> {
    /// x: [B, L, D], mask: [B, L] (true = padding) → [B, L, output_size]
    pub fn forward(&self, x: Tensor<B, 3>, mask: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let valid = mask.bool_not().float();

        let mut input = x;
        let mut layer_outputs = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            let output = layer.forward(self.dropout.forward(input), valid.clone());
            if self.concat_layers {
                layer_outputs.push(output.clone());
            }
            input = output;
        }

        let output = if self.concat_layers {
            Tensor::cat(layer_outputs, 2)
        } else {
            input
        };

        if self.dropout_output {
            self.dropout.forward(output)
        } else {
            output
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::TensorData;

    type TestBackend = burn::backend::NdArray;
    type TestAutodiffBackend = burn::backend::Autodiff<TestBackend>;

    fn padding_mask(rows: Vec<bool>, shape: [usize; 2]) -> Tensor<TestBackend, 2, Bool> {
        Tensor::from_data(TensorData::new(rows, shape), &Default::default())
    }

    fn values(t: Tensor<TestBackend, 3>) -> Vec<f32> {
        t.into_data().to_vec().unwrap()
    }

    #[test]
    fn test_output_width_for_each_cell() {
        let device = Default::default();
        for rnn_type in [RnnType::Lstm, RnnType::Gru, RnnType::Rnn] {
            let cfg = StackedBrnnConfig::new(5, 3, 2)
                .with_rnn_type(rnn_type)
                .with_concat_layers(true);
            let rnn = cfg.init::<TestBackend>(&device);
            let x = Tensor::<TestBackend, 3>::random([2, 4, 5], Distribution::Normal(0.0, 1.0), &device);
            let out = rnn.forward(x, padding_mask(vec![false; 8], [2, 4]));
            assert_eq!(out.dims(), [2, 4, cfg.output_size()]);
            assert_eq!(cfg.output_size(), 12);
        }
    }

    #[test]
    fn test_cell_variant_matches_config() {
        let device = Default::default();
        let cell = RecurrentCell::<TestBackend>::new(RnnType::Gru, 4, 3, &device);
        assert_eq!(cell.rnn_type(), RnnType::Gru);
        assert_eq!(cell.hidden_size(), 3);
    }

    #[test]
    fn test_padded_positions_are_zero_and_do_not_leak() {
        let device = Default::default();
        let rnn = StackedBrnnConfig::new(3, 4, 2)
            .with_rnn_type(RnnType::Lstm)
            .init::<TestBackend>(&device);

        let mask = padding_mask(vec![false, false, false, true, true], [1, 5]);
        let x = Tensor::<TestBackend, 3>::random([1, 5, 3], Distribution::Normal(0.0, 1.0), &device);
        let noisy = x.clone().slice_assign(
            [0..1, 3..5, 0..3],
            Tensor::random([1, 2, 3], Distribution::Normal(5.0, 3.0), &device),
        );

        let clean = values(rnn.forward(x, mask.clone()));
        let dirty = values(rnn.forward(noisy, mask));

        // 8 channels per position; positions 0..3 are real
        for i in 0..24 {
            assert!((clean[i] - dirty[i]).abs() < 1e-6, "leak at {i}");
        }
        assert!(clean[24..].iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_locked_dropout_inactive_without_autodiff() {
        let device = Default::default();
        let dropout = LockedDropout::new(0.5);
        let x = Tensor::<TestBackend, 3>::ones([2, 3, 4], &device);
        assert_eq!(values(dropout.forward(x)), vec![1.0; 24]);
    }

    #[test]
    fn test_locked_dropout_shares_mask_across_time() {
        let device = Default::default();
        let dropout = LockedDropout::new(0.5);
        let x = Tensor::<TestAutodiffBackend, 3>::ones([2, 6, 16], &device);
        let out: Vec<f32> = dropout.forward(x).into_data().to_vec().unwrap();
        for b in 0..2 {
            for t in 1..6 {
                for d in 0..16 {
                    let first = out[b * 96 + d];
                    assert_eq!(out[b * 96 + t * 16 + d], first);
                }
            }
        }
        assert!(out.iter().all(|v| *v == 0.0 || *v == 2.0));
    }
}
