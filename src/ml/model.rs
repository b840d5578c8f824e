// ============================================================
// Layer 5 — Document Reader Model
// ============================================================
// Forward pipeline, leaves first:
//
//   1. embeddings      word (+ POS, NER) lookups, dropout
//   2. qemb            question-aligned embedding per doc token
//   3. encoders        stacked BiRNN over document and question
//   4. reduction       position-wise Linear, width / ratio
//   5. pooling         O document objects, 1 question summary
//   6. relation        question-conditioned fused objects
//   7. span heads      bilinear start / end logits [B, Ld]
//
// Optional parts (POS, NER, qemb, question self-attention)
// exist as Some(...) only when enabled, so the forward pass
// branches on what was built rather than on config flags.

use burn::{
    nn::{loss::CrossEntropyLossConfig, Dropout, DropoutConfig, Embedding, Linear, LinearConfig},
    prelude::*,
};

use crate::ml::{
    attention::{
        uniform_weights, weighted_avg, BilinearSeqAttn, BilinearSeqAttnConfig, LinearSeqAttn,
        LinearSeqAttnConfig, ObjectSeqAttn, ObjectSeqAttnConfig, SeqAttnMatch, SeqAttnMatchConfig,
    },
    config::{DocReaderConfig, QuestionMerge},
    embedding::{init_table, normalize_rows, WordEmbedding},
    error::{ConfigError, InputError},
    relation::{RelationNetwork, RelationNetworkConfig},
    rnn::{StackedBrnn, StackedBrnnConfig},
};

/// Arrays for one forward call. Masks mark padding with `true`.
#[derive(Debug, Clone)]
pub struct ReaderInput<B: Backend> {
    /// [B, Ld]
    pub doc_ids:       Tensor<B, 2, Int>,
    /// [B, Ld, num_features]
    pub doc_features:  Tensor<B, 3>,
    /// [B, Ld], required when POS tags are enabled
    pub doc_pos:       Option<Tensor<B, 2, Int>>,
    /// [B, Ld], required when NER tags are enabled
    pub doc_ner:       Option<Tensor<B, 2, Int>>,
    /// [B, Ld]
    pub doc_mask:      Tensor<B, 2, Bool>,
    /// [B, Lq]
    pub question_ids:  Tensor<B, 2, Int>,
    /// [B, Lq]
    pub question_mask: Tensor<B, 2, Bool>,
}

/// Unnormalised span scores; padded positions hold MASKED_SCORE.
#[derive(Debug, Clone)]
pub struct SpanLogits<B: Backend> {
    /// [B, Ld]
    pub start: Tensor<B, 2>,
    /// [B, Ld]
    pub end:   Tensor<B, 2>,
}

impl DocReaderConfig {
    /// Randomly initialised reader. Fails if a pretrained matrix is required.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<DocReader<B>, ConfigError> {
        self.validate()?;
        if self.pretrained_words {
            return Err(ConfigError::MissingPretrained);
        }
        Ok(self.build(None, device))
    }

    /// Reader whose word table starts from `embedding` [vocab_size, embedding_dim].
    pub fn init_pretrained<B: Backend>(
        &self,
        embedding: Tensor<B, 2>,
        device:    &B::Device,
    ) -> Result<DocReader<B>, ConfigError> {
        self.validate()?;
        let expected = [self.vocab_size, self.embedding_dim];
        let actual   = embedding.dims();
        if actual != expected {
            return Err(ConfigError::PretrainedShape { expected, actual });
        }
        Ok(self.build(Some(embedding), device))
    }

    /// Architecture skeleton to load a saved record into.
    pub fn init_for_restore<B: Backend>(&self, device: &B::Device) -> Result<DocReader<B>, ConfigError> {
        self.validate()?;
        Ok(self.build(None, device))
    }

    fn build<B: Backend>(&self, pretrained: Option<Tensor<B, 2>>, device: &B::Device) -> DocReader<B> {
        // ── Embeddings ────────────────────────────────────────────────────────
        // Freezing only makes sense for pretrained vectors; a random
        // table is always fully trainable.
        let from_pretrained = self.pretrained_words;
        if !from_pretrained && (self.fix_embeddings || self.tune_partial > 0) {
            tracing::warn!(
                "fix_embeddings / tune_partial ignored: the word table is not pretrained"
            );
        }
        let word_weight = match pretrained {
            Some(weight) if self.normalize_emb => normalize_rows(weight),
            Some(weight) => weight,
            None => init_table::<B>(self.vocab_size, self.embedding_dim, self.normalize_emb, device)
                .weight
                .val(),
        };
        let embedding = WordEmbedding::new(
            word_weight,
            self.padding_idx,
            from_pretrained && self.fix_embeddings,
            self.tune_boundary().filter(|_| from_pretrained),
        );
        let pos_embedding = self
            .pos
            .then(|| init_table(self.pos_size, self.pos_dim, self.normalize_emb, device));
        let ner_embedding = self
            .ner
            .then(|| init_table(self.ner_size, self.ner_dim, self.normalize_emb, device));
        let qemb_match = self
            .use_qemb
            .then(|| SeqAttnMatchConfig::new(self.embedding_dim).init(device));

        // ── Encoders ──────────────────────────────────────────────────────────
        let encoder = |input_size, num_layers| {
            StackedBrnnConfig::new(input_size, self.hidden_size, num_layers)
                .with_rnn_type(self.rnn_type)
                .with_dropout_rate(self.dropout_rnn)
                .with_dropout_output(self.dropout_rnn_output)
                .with_concat_layers(self.concat_rnn_layers)
        };
        let doc_rnn      = encoder(self.doc_input_size(), self.doc_layers).init(device);
        let question_rnn = encoder(self.embedding_dim, self.question_layers).init(device);

        // ── Reduction, pooling, relation, span heads ──────────────────────────
        let doc_r      = self.doc_reduced_size();
        let question_r = self.question_reduced_size();

        let doc_reduce      = LinearConfig::new(self.doc_hidden_size(), doc_r).init(device);
        let question_reduce = LinearConfig::new(self.question_hidden_size(), question_r).init(device);
        let doc_self_attn   = ObjectSeqAttnConfig::new(doc_r, self.num_objects).init(device);
        let question_self_attn = match self.question_merge {
            QuestionMerge::SelfAttn => Some(LinearSeqAttnConfig::new(question_r).init(device)),
            QuestionMerge::Avg      => None,
        };
        let relation = RelationNetworkConfig::new(doc_r, question_r, doc_r)
            .with_pairwise(self.relation_pairs)
            .init(device);

        tracing::debug!(
            "Reader built: doc input {} → hidden {} → reduced {}, {} objects, {} cells",
            self.doc_input_size(),
            self.doc_hidden_size(),
            doc_r,
            self.num_objects,
            self.rnn_type,
        );

        DocReader {
            embedding,
            pos_embedding,
            ner_embedding,
            qemb_match,
            emb_dropout: DropoutConfig::new(self.dropout_emb).init(),
            doc_rnn,
            question_rnn,
            doc_reduce,
            question_reduce,
            doc_self_attn,
            question_self_attn,
            relation,
            start_attn: BilinearSeqAttnConfig::new(doc_r, doc_r).init(device),
            end_attn:   BilinearSeqAttnConfig::new(doc_r, doc_r).init(device),
            num_features: self.num_features,
        }
    }
}

#[derive(Module, Debug)]
pub struct DocReader<B: Backend> {
    pub embedding:          WordEmbedding<B>,
    pub pos_embedding:      Option<Embedding<B>>,
    pub ner_embedding:      Option<Embedding<B>>,
    pub qemb_match:         Option<SeqAttnMatch<B>>,
    pub emb_dropout:        Dropout,
    pub doc_rnn:            StackedBrnn<B>,
    pub question_rnn:       StackedBrnn<B>,
    pub doc_reduce:         Linear<B>,
    pub question_reduce:    Linear<B>,
    pub doc_self_attn:      ObjectSeqAttn<B>,
    pub question_self_attn: Option<LinearSeqAttn<B>>,
    pub relation:           RelationNetwork<B>,
    pub start_attn:         BilinearSeqAttn<B>,
    pub end_attn:           BilinearSeqAttn<B>,
    pub num_features:       usize,
}

impl<B: Backend> DocReader<B> {
    pub fn question_merge(&self) -> QuestionMerge {
        match self.question_self_attn {
            Some(_) => QuestionMerge::SelfAttn,
            None    => QuestionMerge::Avg,
        }
    }

    /// Check every array against the others and against what was built.
    pub fn check_input(&self, input: &ReaderInput<B>) -> Result<(), InputError> {
        let [batch, doc_len]  = input.doc_ids.dims();
        let [q_batch, q_len]  = input.question_ids.dims();
        let [f_batch, f_len, f_width] = input.doc_features.dims();

        if doc_len == 0 {
            return Err(InputError::EmptySequence("document"));
        }
        if q_len == 0 {
            return Err(InputError::EmptySequence("question"));
        }

        let mut shaped = vec![
            ("document mask", input.doc_mask.dims()),
            ("document features", [f_batch, f_len]),
        ];
        match (&input.doc_pos, &self.pos_embedding) {
            (Some(pos), Some(_)) => shaped.push(("document POS tags", pos.dims())),
            (None, Some(_))      => return Err(InputError::MissingTags("POS")),
            _ => {}
        }
        match (&input.doc_ner, &self.ner_embedding) {
            (Some(ner), Some(_)) => shaped.push(("document NER tags", ner.dims())),
            (None, Some(_))      => return Err(InputError::MissingTags("NER")),
            _ => {}
        }

        for (name, [b, len]) in shaped {
            if b != batch {
                return Err(InputError::BatchSize { name, expected: batch, actual: b });
            }
            if len != doc_len {
                return Err(InputError::Length { name, expected: doc_len, actual: len });
            }
        }

        if q_batch != batch {
            return Err(InputError::BatchSize { name: "question", expected: batch, actual: q_batch });
        }
        let [qm_batch, qm_len] = input.question_mask.dims();
        if qm_batch != batch {
            return Err(InputError::BatchSize { name: "question mask", expected: batch, actual: qm_batch });
        }
        if qm_len != q_len {
            return Err(InputError::Length { name: "question mask", expected: q_len, actual: qm_len });
        }

        if self.num_features > 0 && f_width != self.num_features {
            return Err(InputError::FeatureWidth { expected: self.num_features, actual: f_width });
        }
        if batch == 0 {
            return Err(InputError::EmptySequence("batch"));
        }

        let vocab_size = self.embedding.vocab_size();
        let mut indexed = vec![
            ("document ids", &input.doc_ids, vocab_size),
            ("question ids", &input.question_ids, vocab_size),
        ];
        if let (Some(pos), Some(table)) = (&input.doc_pos, &self.pos_embedding) {
            indexed.push(("document POS tags", pos, table.weight.dims()[0]));
        }
        if let (Some(ner), Some(table)) = (&input.doc_ner, &self.ner_embedding) {
            indexed.push(("document NER tags", ner, table.weight.dims()[0]));
        }
        for (name, ids, limit) in indexed {
            let min = ids.clone().min().into_scalar().elem::<i64>();
            let max = ids.clone().max().into_scalar().elem::<i64>();
            if min < 0 || max >= limit as i64 {
                let value = if min < 0 { min } else { max };
                return Err(InputError::IdOutOfRange { name, value, limit });
            }
        }
        Ok(())
    }

    /// Start and end logits, each [batch, document length].
    pub fn forward(&self, input: ReaderInput<B>) -> Result<SpanLogits<B>, InputError> {
        self.check_input(&input)?;
        let ReaderInput {
            doc_ids, doc_features, doc_pos, doc_ner, doc_mask, question_ids, question_mask,
        } = input;

        // ── 1-2. Document encoder input ───────────────────────────────────────
        let doc_emb      = self.emb_dropout.forward(self.embedding.forward(doc_ids));
        let question_emb = self.emb_dropout.forward(self.embedding.forward(question_ids));

        let mut doc_inputs = vec![doc_emb.clone()];
        if self.num_features > 0 {
            doc_inputs.push(doc_features);
        }
        if let Some(qemb) = &self.qemb_match {
            doc_inputs.push(qemb.forward(doc_emb, question_emb.clone(), question_mask.clone()));
        }
        if let (Some(table), Some(pos)) = (&self.pos_embedding, doc_pos) {
            doc_inputs.push(self.emb_dropout.forward(table.forward(pos)));
        }
        if let (Some(table), Some(ner)) = (&self.ner_embedding, doc_ner) {
            doc_inputs.push(self.emb_dropout.forward(table.forward(ner)));
        }

        // ── 3-5. Document: encode, reduce, pool into objects ──────────────────
        let doc_hiddens = self.doc_reduce.forward(
            self.doc_rnn.forward(Tensor::cat(doc_inputs, 2), doc_mask.clone()),
        );
        let objects = self.doc_self_attn.pool(doc_hiddens.clone(), doc_mask.clone());

        // ── 3-5. Question: encode, reduce, merge into one vector ──────────────
        let question_hiddens = self.question_reduce.forward(
            self.question_rnn.forward(question_emb, question_mask.clone()),
        );
        let question_weights = match &self.question_self_attn {
            Some(attn) => attn.forward(question_hiddens.clone(), question_mask),
            None       => uniform_weights(question_mask),
        };
        let question_hidden = weighted_avg(question_hiddens, question_weights);

        // ── 6. Relation reasoning ─────────────────────────────────────────────
        let fused   = self.relation.forward(objects, question_hidden);
        let summary = self.relation.summarize(fused);

        // ── 7. Span scores ────────────────────────────────────────────────────
        let start = self.start_attn.forward(doc_hiddens.clone(), summary.clone(), doc_mask.clone());
        let end   = self.end_attn.forward(doc_hiddens, summary, doc_mask);
        Ok(SpanLogits { start, end })
    }

    /// Forward pass plus span loss against gold positions [B].
    pub fn forward_loss(
        &self,
        input:           ReaderInput<B>,
        start_positions: Tensor<B, 1, Int>,
        end_positions:   Tensor<B, 1, Int>,
    ) -> Result<(Tensor<B, 1>, SpanLogits<B>), InputError> {
        let logits = self.forward(input)?;
        let loss = span_loss(&logits, start_positions, end_positions);
        Ok((loss, logits))
    }
}

/// Loss = (CE_start + CE_end) / 2
pub fn span_loss<B: Backend>(
    logits:          &SpanLogits<B>,
    start_positions: Tensor<B, 1, Int>,
    end_positions:   Tensor<B, 1, Int>,
) -> Tensor<B, 1> {
    let ce = CrossEntropyLossConfig::new().init(&logits.start.device());
    (ce.forward(logits.start.clone(), start_positions)
        + ce.forward(logits.end.clone(), end_positions))
        / 2.0_f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::{attention::MASKED_SCORE, config::RnnType};
    use burn::{module::AutodiffModule, tensor::{Distribution, TensorData}};

    type TestBackend = burn::backend::NdArray;
    type TestAutodiffBackend = burn::backend::Autodiff<TestBackend>;

    const BATCH: usize = 2;
    const DOC_LEN: usize = 5;
    const Q_LEN: usize = 3;

    fn scenario_config() -> DocReaderConfig {
        DocReaderConfig::new(30, 6)
            .with_pos(false)
            .with_ner(false)
            .with_use_qemb(false)
            .with_num_features(2)
            .with_hidden_size(4)
            .with_doc_layers(1)
            .with_question_layers(1)
            .with_num_objects(2)
            .with_reduction_ratio(2)
    }

    fn ids<B: Backend>(values: Vec<i32>, len: usize, device: &B::Device) -> Tensor<B, 2, Int> {
        Tensor::<B, 1, Int>::from_ints(values.as_slice(), device).reshape([BATCH, len])
    }

    fn mask<B: Backend>(values: Vec<bool>, len: usize, device: &B::Device) -> Tensor<B, 2, Bool> {
        Tensor::from_data(TensorData::new(values, [BATCH, len]), device)
    }

    /// Second document has two padded positions, second question one.
    fn scenario_input<B: Backend>(device: &B::Device) -> ReaderInput<B> {
        ReaderInput {
            doc_ids:      ids(vec![4, 7, 9, 2, 11, 5, 8, 3, 0, 0], DOC_LEN, device),
            doc_features: Tensor::random([BATCH, DOC_LEN, 2], Distribution::Uniform(0.0, 1.0), device),
            doc_pos:      Some(ids(vec![1; BATCH * DOC_LEN], DOC_LEN, device)),
            doc_ner:      Some(ids(vec![2; BATCH * DOC_LEN], DOC_LEN, device)),
            doc_mask:     mask(
                vec![false, false, false, false, false, false, false, false, true, true],
                DOC_LEN,
                device,
            ),
            question_ids:  ids(vec![3, 12, 6, 10, 13, 0], Q_LEN, device),
            question_mask: mask(vec![false, false, false, false, false, true], Q_LEN, device),
        }
    }

    fn values(t: Tensor<TestBackend, 2>) -> Vec<f32> {
        t.into_data().to_vec().unwrap()
    }

    #[test]
    fn test_end_to_end_scenario() {
        let device = Default::default();
        let model = scenario_config().init::<TestBackend>(&device).unwrap();
        let logits = model.forward(scenario_input(&device)).unwrap();

        assert_eq!(logits.start.dims(), [BATCH, DOC_LEN]);
        assert_eq!(logits.end.dims(), [BATCH, DOC_LEN]);

        for scores in [values(logits.start), values(logits.end)] {
            assert!(scores.iter().all(|v| v.is_finite()));
            assert_eq!(scores[8], MASKED_SCORE);
            assert_eq!(scores[9], MASKED_SCORE);
            assert!(scores[..8].iter().all(|v| *v > MASKED_SCORE));
        }
    }

    #[test]
    fn test_output_shape_independent_of_widths() {
        let device = Default::default();
        let variants = [
            scenario_config().with_hidden_size(8).with_reduction_ratio(4),
            scenario_config().with_num_objects(5).with_doc_layers(2).with_question_layers(3),
            scenario_config().with_concat_rnn_layers(false).with_doc_layers(2),
            scenario_config().with_rnn_type(RnnType::Gru).with_question_merge(QuestionMerge::Avg),
            scenario_config().with_rnn_type(RnnType::Rnn).with_relation_pairs(false),
            scenario_config().with_use_qemb(true).with_pos(true).with_ner(true),
        ];
        for cfg in variants {
            let model = cfg.init::<TestBackend>(&device).unwrap();
            let logits = model.forward(scenario_input(&device)).unwrap();
            assert_eq!(logits.start.dims(), [BATCH, DOC_LEN]);
            assert_eq!(logits.end.dims(), [BATCH, DOC_LEN]);
        }
    }

    #[test]
    fn test_padding_content_does_not_change_real_scores() {
        let device = Default::default();
        let cfg = scenario_config().with_use_qemb(true).with_pos(true);
        let model = cfg.init::<TestBackend>(&device).unwrap();

        let input = scenario_input::<TestBackend>(&device);
        let mut noisy = input.clone();
        noisy.doc_ids = ids(vec![4, 7, 9, 2, 11, 5, 8, 3, 17, 21], DOC_LEN, &device);
        noisy.doc_pos = Some(ids(vec![1, 1, 1, 1, 1, 1, 1, 1, 40, 33], DOC_LEN, &device));
        noisy.doc_features = input.doc_features.clone().slice_assign(
            [1..2, 3..5, 0..2],
            Tensor::ones([1, 2, 2], &device).mul_scalar(9.0),
        );
        noisy.question_ids = ids(vec![3, 12, 6, 10, 13, 25], Q_LEN, &device);

        let a = model.forward(input).unwrap();
        let b = model.forward(noisy).unwrap();
        for (x, y) in values(a.start).iter().zip(values(b.start)) {
            assert!((x - y).abs() < 1e-5);
        }
        for (x, y) in values(a.end).iter().zip(values(b.end)) {
            assert!((x - y).abs() < 1e-5);
        }
    }

    #[test]
    fn test_inference_mode_is_deterministic() {
        let device = Default::default();
        let cfg = scenario_config().with_dropout_emb(0.5).with_dropout_rnn(0.5);
        let model = cfg.init::<TestAutodiffBackend>(&device).unwrap().valid();

        let input = scenario_input::<TestBackend>(&device);
        let first  = values(model.forward(input.clone()).unwrap().start);
        let second = values(model.forward(input).unwrap().start);
        assert_eq!(first, second);
    }

    #[test]
    fn test_training_mode_applies_dropout() {
        let device = Default::default();
        let cfg = DocReaderConfig::new(30, 32)
            .with_use_qemb(false)
            .with_num_features(2)
            .with_doc_layers(1)
            .with_question_layers(1)
            .with_num_objects(2)
            .with_reduction_ratio(2)
            .with_hidden_size(16)
            .with_dropout_emb(0.5)
            .with_dropout_rnn(0.5);
        let model = cfg.init::<TestAutodiffBackend>(&device).unwrap();

        let input = scenario_input::<TestAutodiffBackend>(&device);
        let runs: Vec<Vec<f32>> = (0..3)
            .map(|_| model.forward(input.clone()).unwrap().start.into_data().to_vec().unwrap())
            .collect();
        assert!(runs[1..].iter().any(|run| *run != runs[0]));
    }

    #[test]
    fn test_construction_errors() {
        let device = Default::default();
        let conflicting = scenario_config().with_fix_embeddings(true).with_tune_partial(4);
        assert!(matches!(
            conflicting.init::<TestBackend>(&device),
            Err(ConfigError::ConflictingEmbeddingPolicy { tune_partial: 4 })
        ));

        let pretrained = scenario_config().with_pretrained_words(true);
        assert!(matches!(pretrained.init::<TestBackend>(&device), Err(ConfigError::MissingPretrained)));

        let wrong_shape = Tensor::<TestBackend, 2>::zeros([10, 6], &device);
        assert!(matches!(
            pretrained.init_pretrained(wrong_shape, &device),
            Err(ConfigError::PretrainedShape { .. })
        ));
    }

    #[test]
    fn test_pretrained_table_is_used() {
        let device = Default::default();
        let cfg = scenario_config().with_pretrained_words(true).with_tune_partial(5);
        let weight = Tensor::<TestBackend, 2>::random([30, 6], Distribution::Normal(0.0, 1.0), &device);
        let model = cfg.init_pretrained(weight.clone(), &device).unwrap();

        let stored: Vec<f32> = model.embedding.weight().into_data().to_vec().unwrap();
        let given:  Vec<f32> = weight.into_data().to_vec().unwrap();
        assert_eq!(stored, given);
        assert_eq!(model.embedding.vocab_size(), 30);
    }

    #[test]
    fn test_embedding_policies_build_on_autodiff() {
        let device = Default::default();
        let weight = Tensor::<TestAutodiffBackend, 2>::random([30, 6], Distribution::Normal(0.0, 1.0), &device);

        let partial = scenario_config().with_pretrained_words(true).with_tune_partial(3);
        let model = partial.init_pretrained(weight.clone(), &device).unwrap();
        assert_eq!(model.embedding.vocab_size(), 30);

        let normalized = scenario_config().with_normalize_emb(true).with_pos(true);
        let model = normalized.init::<TestAutodiffBackend>(&device).unwrap();
        let logits = model.forward(scenario_input(&device)).unwrap();
        assert_eq!(logits.start.dims(), [BATCH, DOC_LEN]);

        let normalized_pretrained = scenario_config().with_pretrained_words(true).with_normalize_emb(true);
        assert!(normalized_pretrained.init_pretrained(weight, &device).is_ok());
    }

    #[test]
    fn test_freezing_needs_pretrained_words() {
        type Grads = <TestAutodiffBackend as burn::tensor::backend::AutodiffBackend>::Gradients;
        let device = Default::default();
        let word_grad = |model: &DocReader<TestAutodiffBackend>, grads: &Grads| {
            model.embedding.weight().grad(grads).is_some()
        };

        // Random table: tune_partial is ignored, every row trains
        let random = scenario_config().with_fix_embeddings(true).init::<TestAutodiffBackend>(&device).unwrap();
        let (loss, _) = random
            .forward_loss(
                scenario_input(&device),
                Tensor::from_ints([1, 0], &device),
                Tensor::from_ints([3, 2], &device),
            )
            .unwrap();
        let grads = loss.backward();
        assert!(word_grad(&random, &grads));

        // Pretrained table: fix_embeddings freezes it
        let weight = Tensor::<TestAutodiffBackend, 2>::random([30, 6], Distribution::Normal(0.0, 1.0), &device);
        let frozen = scenario_config()
            .with_pretrained_words(true)
            .with_fix_embeddings(true)
            .init_pretrained(weight, &device)
            .unwrap();
        let (loss, _) = frozen
            .forward_loss(
                scenario_input(&device),
                Tensor::from_ints([1, 0], &device),
                Tensor::from_ints([3, 2], &device),
            )
            .unwrap();
        let grads = loss.backward();
        assert!(!word_grad(&frozen, &grads));
    }

    #[test]
    fn test_question_merge_policy_is_built() {
        let device = Default::default();
        let avg = scenario_config().with_question_merge(QuestionMerge::Avg);
        assert_eq!(avg.init::<TestBackend>(&device).unwrap().question_merge(), QuestionMerge::Avg);
        let attn = scenario_config();
        assert_eq!(attn.init::<TestBackend>(&device).unwrap().question_merge(), QuestionMerge::SelfAttn);
    }

    #[test]
    fn test_input_errors() {
        let device = Default::default();
        let model = scenario_config().with_pos(true).init::<TestBackend>(&device).unwrap();

        let mut missing_pos = scenario_input::<TestBackend>(&device);
        missing_pos.doc_pos = None;
        assert_eq!(model.forward(missing_pos).unwrap_err(), InputError::MissingTags("POS"));

        let mut short_mask = scenario_input::<TestBackend>(&device);
        short_mask.doc_mask = Tensor::from_data(TensorData::new(vec![false; 8], [2, 4]), &device);
        assert_eq!(
            model.forward(short_mask).unwrap_err(),
            InputError::Length { name: "document mask", expected: 5, actual: 4 }
        );

        let mut wide = scenario_input::<TestBackend>(&device);
        wide.doc_features = Tensor::zeros([2, 5, 3], &device);
        assert_eq!(
            model.forward(wide).unwrap_err(),
            InputError::FeatureWidth { expected: 2, actual: 3 }
        );

        let mut unknown_word = scenario_input::<TestBackend>(&device);
        unknown_word.doc_ids = ids(vec![4, 7, 31, 2, 11, 5, 8, 3, 0, 0], DOC_LEN, &device);
        assert_eq!(
            model.forward(unknown_word).unwrap_err(),
            InputError::IdOutOfRange { name: "document ids", value: 31, limit: 30 }
        );

        let mut negative_question = scenario_input::<TestBackend>(&device);
        negative_question.question_ids = ids(vec![3, -1, 6, 10, 13, 0], Q_LEN, &device);
        assert!(matches!(
            model.forward(negative_question).unwrap_err(),
            InputError::IdOutOfRange { name: "question ids", value: -1, .. }
        ));

        let mut unknown_tag = scenario_input::<TestBackend>(&device);
        unknown_tag.doc_pos = Some(ids(vec![56; BATCH * DOC_LEN], DOC_LEN, &device));
        assert_eq!(
            model.forward(unknown_tag).unwrap_err(),
            InputError::IdOutOfRange { name: "document POS tags", value: 56, limit: 56 }
        );

        let mut odd_batch = scenario_input::<TestBackend>(&device);
        odd_batch.question_mask = Tensor::from_data(TensorData::new(vec![false; 3], [1, 3]), &device);
        assert!(matches!(model.forward(odd_batch).unwrap_err(), InputError::BatchSize { .. }));
    }

    #[test]
    fn test_span_loss_is_finite() {
        let device = Default::default();
        let model = scenario_config().init::<TestBackend>(&device).unwrap();
        let starts = Tensor::<TestBackend, 1, Int>::from_ints([1, 0], &device);
        let ends   = Tensor::<TestBackend, 1, Int>::from_ints([3, 2], &device);
        let (loss, _) = model.forward_loss(scenario_input(&device), starts, ends).unwrap();
        let loss: f32 = loss.into_scalar().elem();
        assert!(loss.is_finite() && loss > 0.0);
    }
}
