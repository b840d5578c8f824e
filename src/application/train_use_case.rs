// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load examples              (Layer 4 - data)
//   Step 2: Keep labelled examples     (Layer 4 - data)
//   Step 3: Seeded train/val split     (Layer 4 - data)
//   Step 4: Save config                (Layer 6 - infra)
//   Step 5: Load pretrained vectors    (optional)
//   Step 6: Run training loop          (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;

use crate::data::{dataset::ReaderDataset, loader::JsonlLoader, splitter::split_train_val};
use crate::domain::traits::ExampleSource;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{
    config::DocReaderConfig,
    trainer::{run_training, PretrainedRows},
};

// ─── Training Configuration ──────────────────────────────────────────────────
// Run parameters plus the reader architecture. Saved next to the
// checkpoints so prediction can rebuild the same model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub data_file:       String,
    /// JSON array of rows, [vocab_size][embedding_dim]; needed when
    /// `model.pretrained_words` is set.
    pub embeddings_file: Option<String>,
    pub checkpoint_dir:  String,
    pub batch_size:      usize,
    pub epochs:          usize,
    pub lr:              f64,
    /// Maximum global gradient norm.
    pub grad_clip:       f64,
    pub train_fraction:  f64,
    pub seed:            u64,
    pub max_span_len:    usize,
    pub model:           DocReaderConfig,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_file:       "data/train.jsonl".to_string(),
            embeddings_file: None,
            checkpoint_dir:  "checkpoints".to_string(),
            batch_size:      32,
            epochs:          40,
            lr:              2e-3,
            grad_clip:       10.0,
            train_fraction:  0.9,
            seed:            1013,
            max_span_len:    15,
            model:           DocReaderConfig::new(50_000, 300),
        }
    }
}

/// Read a JSON matrix of pretrained word vectors.
pub fn load_pretrained(path: &str) -> Result<PretrainedRows> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Cannot read embeddings file '{path}'"))?;
    let rows: PretrainedRows = serde_json::from_str(&json)
        .with_context(|| format!("Embeddings file '{path}' is not a JSON matrix"))?;
    tracing::info!("Loaded {} pretrained vectors from '{}'", rows.len(), path);
    Ok(rows)
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<()> {
        let cfg = &self.config;
        cfg.model.validate().context("Invalid model configuration")?;

        // ── Step 1–2: Load and keep labelled examples ────────────────────────
        tracing::info!("Loading examples from '{}'", cfg.data_file);
        let loader   = JsonlLoader::new(&cfg.data_file, cfg.model.num_features);
        let examples: Vec<_> = loader
            .load_all()?
            .into_iter()
            .filter(|e| e.answer_span().is_some())
            .collect();
        if examples.is_empty() {
            anyhow::bail!("No labelled examples in '{}'", cfg.data_file);
        }

        // ── Step 3: Train / validation split ─────────────────────────────────
        let (train_examples, val_examples) = split_train_val(examples, cfg.train_fraction, cfg.seed);
        tracing::info!(
            "Split: {} train, {} validation",
            train_examples.len(),
            val_examples.len()
        );
        if val_examples.is_empty() {
            tracing::warn!("Validation set is empty; validation metrics will be NaN");
        }

        // ── Step 4: Save config for prediction ───────────────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir)?;
        ckpt_manager.save_config(cfg)?;

        // ── Step 5: Pretrained vectors ───────────────────────────────────────
        let pretrained = match (&cfg.embeddings_file, cfg.model.pretrained_words) {
            (Some(path), true) => Some(load_pretrained(path)?),
            (None, true) => anyhow::bail!("pretrained_words is set but no embeddings file was given"),
            (Some(path), false) => {
                tracing::warn!("Ignoring embeddings file '{}': pretrained_words is off", path);
                None
            }
            (None, false) => None,
        };

        // ── Step 6: Training loop ────────────────────────────────────────────
        let train_dataset = ReaderDataset::new(train_examples);
        let val_dataset   = ReaderDataset::new(val_examples);
        tracing::info!(
            "Training on {} examples for {} epochs (batch size {})",
            train_dataset.example_count(),
            cfg.epochs,
            cfg.batch_size
        );
        run_training(cfg, pretrained, train_dataset, val_dataset, &ckpt_manager)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_json_fills_missing_fields() {
        let model = serde_json::to_string(&DocReaderConfig::new(100, 8)).unwrap();
        let json  = format!(r#"{{"data_file": "x.jsonl", "epochs": 3, "model": {model}}}"#);
        let cfg: TrainConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg.epochs, 3);
        assert_eq!(cfg.grad_clip, 10.0);
        assert_eq!(cfg.max_span_len, 15);
        assert_eq!(cfg.model.vocab_size, 100);
        assert_eq!(cfg.model.hidden_size, 128);
    }

    #[test]
    fn test_load_pretrained_matrix() {
        let path = std::env::temp_dir().join(format!("relation_reader_emb_{}.json", std::process::id()));
        fs::write(&path, "[[0.0, 1.0], [2.0, 3.0]]").unwrap();
        let rows = load_pretrained(path.to_str().unwrap()).unwrap();
        assert_eq!(rows, vec![vec![0.0, 1.0], vec![2.0, 3.0]]);
        let _ = fs::remove_file(&path);
        assert!(load_pretrained("/nonexistent/emb.json").is_err());
    }
}
