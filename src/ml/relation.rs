// ============================================================
// Layer 5 — Relation Network
// ============================================================
// Fuses the question summary into the fixed set of document
// objects produced by the object attention.
//
//   pairwise (default):
//     g([o_i ; o_j ; q])  for every ordered pair (i, j)
//     fused_i = mean_j g(...)
//
//   question only:
//     fused_i = g([o_i ; q])
//
// g is a two-layer ReLU network shared by every pair. The
// span heads need one vector per batch element, so summarize()
// averages the fused objects and applies the output layer f.
//
// Reference: Santoro et al. (2017) A simple neural network
//            module for relational reasoning

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation::relu,
};

#[derive(Config, Debug)]
pub struct RelationNetworkConfig {
    pub object_size:   usize,
    pub question_size: usize,
    pub output_size:   usize,
    #[config(default = true)]
    pub pairwise: bool,
}

impl RelationNetworkConfig {
    pub fn pair_size(&self) -> usize {
        if self.pairwise {
            2 * self.object_size + self.question_size
        } else {
            self.object_size + self.question_size
        }
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> RelationNetwork<B> {
        RelationNetwork {
            g_hidden: LinearConfig::new(self.pair_size(), self.output_size).init(device),
            g_out:    LinearConfig::new(self.output_size, self.output_size).init(device),
            f_out:    LinearConfig::new(self.output_size, self.output_size).init(device),
            pairwise: self.pairwise,
        }
    }
}

#[derive(Module, Debug)]
pub struct RelationNetwork<B: Backend> {
    g_hidden: Linear<B>,
    g_out:    Linear<B>,
    f_out:    Linear<B>,
    pairwise: bool,
}

impl<B: Backend> RelationNetwork<B> {
    fn g<const D: usize>(&self, pairs: Tensor<B, D>) -> Tensor<B, D> {
        relu(self.g_out.forward(relu(self.g_hidden.forward(pairs))))
    }

    /// objects: [B, O, Ro], question: [B, Rq] → fused objects [B, O, R]
    pub fn forward(&self, objects: Tensor<B, 3>, question: Tensor<B, 2>) -> Tensor<B, 3> {
        let [batch, num_objects, object_size] = objects.dims();
        let question_size = question.dims()[1];

        if self.pairwise {
            let pair_shape = |width| [batch, num_objects, num_objects, width];
            let left  = objects.clone().unsqueeze_dim::<4>(2).expand(pair_shape(object_size));
            let right = objects.unsqueeze_dim::<4>(1).expand(pair_shape(object_size));
            let q     = question
                .reshape([batch, 1, 1, question_size])
                .expand(pair_shape(question_size));

            let related = self.g(Tensor::cat(vec![left, right, q], 3)); // [B, O, O, R]
            let width = related.dims()[3];
            related.mean_dim(2).reshape([batch, num_objects, width])
        } else {
            let q = question
                .unsqueeze_dim::<3>(1)
                .expand([batch, num_objects, question_size]);
            self.g(Tensor::cat(vec![objects, q], 2))
        }
    }

    /// fused: [B, O, R] → [B, R]
    pub fn summarize(&self, fused: Tensor<B, 3>) -> Tensor<B, 2> {
        let [batch, _, width] = fused.dims();
        self.f_out.forward(fused.mean_dim(1).reshape([batch, width]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::Distribution;

    type TestBackend = burn::backend::NdArray;

    #[test]
    fn test_pairwise_shapes() {
        let device = Default::default();
        let cfg = RelationNetworkConfig::new(6, 4, 6);
        assert_eq!(cfg.pair_size(), 16);
        let rn = cfg.init::<TestBackend>(&device);

        let objects  = Tensor::<TestBackend, 3>::random([2, 3, 6], Distribution::Normal(0.0, 1.0), &device);
        let question = Tensor::<TestBackend, 2>::random([2, 4], Distribution::Normal(0.0, 1.0), &device);
        let fused = rn.forward(objects, question);
        assert_eq!(fused.dims(), [2, 3, 6]);
        assert_eq!(rn.summarize(fused).dims(), [2, 6]);
    }

    #[test]
    fn test_question_only_shapes() {
        let device = Default::default();
        let cfg = RelationNetworkConfig::new(6, 4, 5).with_pairwise(false);
        assert_eq!(cfg.pair_size(), 10);
        let rn = cfg.init::<TestBackend>(&device);

        let objects  = Tensor::<TestBackend, 3>::random([1, 2, 6], Distribution::Normal(0.0, 1.0), &device);
        let question = Tensor::<TestBackend, 2>::random([1, 4], Distribution::Normal(0.0, 1.0), &device);
        assert_eq!(rn.forward(objects, question).dims(), [1, 2, 5]);
    }

    #[test]
    fn test_fused_objects_depend_on_question() {
        let device = Default::default();
        let rn = RelationNetworkConfig::new(4, 4, 16).init::<TestBackend>(&device);
        let objects = Tensor::<TestBackend, 3>::random([1, 2, 4], Distribution::Normal(0.0, 1.0), &device);
        let q1 = Tensor::<TestBackend, 2>::random([1, 4], Distribution::Normal(0.0, 1.0), &device);
        let q2 = q1.clone().mul_scalar(-3.0).add_scalar(1.0);

        let a: Vec<f32> = rn.summarize(rn.forward(objects.clone(), q1)).into_data().to_vec().unwrap();
        let b: Vec<f32> = rn.summarize(rn.forward(objects, q2)).into_data().to_vec().unwrap();
        assert!(a.iter().zip(&b).any(|(x, y)| (x - y).abs() > 1e-6));
    }
}
