// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Train + validation loop using Burn's DataLoader and Adam.
//
//   - Training runs on an AutodiffBackend; dropout is live.
//   - model.valid() returns the reader on B::InnerBackend with
//     dropout off, so validation is deterministic.
//   - The validation batcher must also use B::InnerBackend.
//   - Gradients are clipped by global norm before each step.
//
// The loop itself is generic over the backend so it can run
// on NdArray in tests; run_training() picks the Wgpu device.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::{Context, Result};
use burn::{
    data::dataloader::DataLoaderBuilder,
    grad_clipping::GradientClippingConfig,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::{backend::AutodiffBackend, TensorData},
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{ReaderBatch, ReaderBatcher},
    dataset::ReaderDataset,
};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, MetricsLogger, SpanAccuracy},
};
use crate::ml::{
    inferencer::decode_spans,
    model::{span_loss, DocReader},
};

type MyBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

/// Pretrained word vectors, one row per vocabulary entry.
pub type PretrainedRows = Vec<Vec<f32>>;

/// Build the reader described by `cfg.model`, from `pretrained` when given.
pub fn build_model<B: Backend>(
    cfg:        &TrainConfig,
    pretrained: Option<PretrainedRows>,
    device:     &B::Device,
) -> Result<DocReader<B>> {
    let model = match pretrained {
        Some(rows) => {
            let dim  = rows.first().map_or(0, Vec::len);
            let n    = rows.len();
            let flat: Vec<f32> = rows.into_iter().flatten().collect();
            if flat.len() != n * dim {
                anyhow::bail!("Pretrained embedding rows have inconsistent widths");
            }
            let weight = Tensor::<B, 2>::from_data(TensorData::new(flat, [n, dim]), device);
            cfg.model.init_pretrained(weight, device)?
        }
        None => cfg.model.init(device)?,
    };
    Ok(model)
}

pub fn run_training(
    cfg:           &TrainConfig,
    pretrained:    Option<PretrainedRows>,
    train_dataset: ReaderDataset,
    val_dataset:   ReaderDataset,
    ckpt_manager:  &CheckpointManager,
) -> Result<()> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);

    let model = build_model::<MyBackend>(cfg, pretrained, &device)?;
    train_loop(cfg, model, train_dataset, val_dataset, ckpt_manager, device)?;
    Ok(())
}

/// One optimiser step on one batch. Returns the updated reader and the batch loss.
pub fn train_step<B, O>(
    model: DocReader<B>,
    optim: &mut O,
    batch: ReaderBatch<B>,
    lr:    f64,
) -> Result<(DocReader<B>, f64)>
where
    B: AutodiffBackend,
    O: Optimizer<DocReader<B>, B>,
{
    let (loss, _) = model.forward_loss(batch.input, batch.start_positions, batch.end_positions)?;
    let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();

    let grads = loss.backward();
    let grads = GradientsParams::from_grads(grads, &model);
    Ok((optim.step(lr, model, grads), loss_val))
}

/// Average loss and span accuracy of `model` over `batches`.
pub fn evaluate<B: Backend>(
    model:        &DocReader<B>,
    batches:      impl Iterator<Item = ReaderBatch<B>>,
    max_span_len: usize,
) -> Result<(f64, SpanAccuracy)> {
    let mut loss_sum = 0.0f64;
    let mut count    = 0usize;
    let mut accuracy = SpanAccuracy::default();

    for batch in batches {
        let logits = model.forward(batch.input)?;
        loss_sum += span_loss(&logits, batch.start_positions.clone(), batch.end_positions.clone())
            .into_scalar()
            .elem::<f64>();
        count += 1;

        let starts: Vec<i64> = int_values(batch.start_positions)?;
        let ends:   Vec<i64> = int_values(batch.end_positions)?;
        let spans = decode_spans(logits, &batch.doc_lengths, max_span_len)?;
        for ((span, start), end) in spans.into_iter().zip(starts).zip(ends) {
            accuracy.record(span.map(|s| (s.start, s.end)), (start as usize, end as usize));
        }
    }

    let avg = if count > 0 { loss_sum / count as f64 } else { f64::NAN };
    Ok((avg, accuracy))
}

fn int_values<B: Backend>(t: Tensor<B, 1, Int>) -> Result<Vec<i64>> {
    let data = t.into_data().convert::<i64>();
    data.to_vec::<i64>()
        .map_err(|e| anyhow::anyhow!("Cannot read position tensor: {e:?}"))
}

pub fn train_loop<B: AutodiffBackend>(
    cfg:           &TrainConfig,
    mut model:     DocReader<B>,
    train_dataset: ReaderDataset,
    val_dataset:   ReaderDataset,
    ckpt_manager:  &CheckpointManager,
    device:        B::Device,
) -> Result<DocReader<B>> {
    tracing::info!(
        "Reader ready: {} doc layers, {} question layers, hidden={}, rnn={}, objects={}",
        cfg.model.doc_layers,
        cfg.model.question_layers,
        cfg.model.hidden_size,
        cfg.model.rnn_type,
        cfg.model.num_objects,
    );

    // ── Adam with global-norm gradient clipping ──────────────────────────────
    let optim_cfg = AdamConfig::new()
        .with_epsilon(1e-8)
        .with_grad_clipping(Some(GradientClippingConfig::Norm(cfg.grad_clip as f32)));
    let mut optim = optim_cfg.init();

    let num_features = cfg.model.num_features;

    let train_batcher = ReaderBatcher::<B>::new(device.clone(), num_features)
        .with_padding_idx(cfg.model.padding_idx);
    let train_loader  = DataLoaderBuilder::new(train_batcher)
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(train_dataset);

    let val_batcher = ReaderBatcher::<B::InnerBackend>::new(device.clone(), num_features)
        .with_padding_idx(cfg.model.padding_idx);
    let val_loader  = DataLoaderBuilder::new(val_batcher)
        .batch_size(cfg.batch_size)
        .num_workers(1)
        .build(val_dataset);

    let metrics = MetricsLogger::new(ckpt_manager.dir())
        .context("Cannot open metrics log")?;
    let mut best_val_loss = f64::INFINITY;

    for epoch in 1..=cfg.epochs {
        // ── Training phase ───────────────────────────────────────────────────
        let mut train_loss_sum = 0.0f64;
        let mut train_batches  = 0usize;

        for batch in train_loader.iter() {
            let (updated, loss) = train_step(model, &mut optim, batch, cfg.lr)?;
            model = updated;
            train_loss_sum += loss;
            train_batches  += 1;
        }

        let avg_train_loss = if train_batches > 0 {
            train_loss_sum / train_batches as f64
        } else { f64::NAN };

        // ── Validation phase ─────────────────────────────────────────────────
        let model_valid = model.valid();
        let (avg_val_loss, accuracy) = evaluate(&model_valid, val_loader.iter(), cfg.max_span_len)?;

        let m = EpochMetrics::new(epoch, avg_train_loss, avg_val_loss, &accuracy);
        tracing::info!(
            "Epoch {:>3}/{} | train_loss={:.4} | val_loss={:.4} | start_acc={:.1}% | end_acc={:.1}% | em={:.1}%",
            epoch, cfg.epochs, m.train_loss, m.val_loss,
            m.start_acc * 100.0, m.end_acc * 100.0, m.exact_match * 100.0,
        );
        if m.is_improvement(best_val_loss) {
            best_val_loss = m.val_loss;
            tracing::debug!("New best validation loss {:.4}", best_val_loss);
        }
        metrics.log(&m)?;

        ckpt_manager.save_model(&model, epoch)?;
        tracing::info!("Checkpoint saved for epoch {}", epoch);
    }

    tracing::info!("Training complete!");
    Ok(model)
}
