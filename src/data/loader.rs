// ============================================================
// Layer 4 — Example Loader
// ============================================================
// Reads pre-tokenised examples from a JSON Lines file: one
// ReaderExample object per line, blank lines ignored.
//
// A malformed line fails the whole load with its line number,
// since silently dropping labelled examples would skew the
// train/validation split. Structurally invalid examples (span
// outside the document, ragged feature rows) are rejected the
// same way.
//
// Reference: Rust Book §9 (Error Handling)
//            serde_json crate documentation

use anyhow::{Context, Result};
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::PathBuf,
};

use crate::domain::{example::ReaderExample, traits::ExampleSource};

/// Loads ReaderExamples from a .jsonl file.
pub struct JsonlLoader {
    path:         PathBuf,
    num_features: usize,
}

impl JsonlLoader {
    pub fn new(path: impl Into<PathBuf>, num_features: usize) -> Self {
        Self { path: path.into(), num_features }
    }

    /// Parse one line; `line_no` is 1-based for error messages.
    fn parse_line(&self, line: &str, line_no: usize) -> Result<ReaderExample> {
        let example: ReaderExample = serde_json::from_str(line).with_context(|| {
            format!("{}:{}: invalid example", self.path.display(), line_no)
        })?;
        example
            .validate(self.num_features)
            .with_context(|| format!("{}:{}", self.path.display(), line_no))?;
        Ok(example)
    }
}

impl ExampleSource for JsonlLoader {
    fn load_all(&self) -> Result<Vec<ReaderExample>> {
        let file = File::open(&self.path)
            .with_context(|| format!("Cannot open examples file '{}'", self.path.display()))?;

        let mut examples = Vec::new();
        for (i, line) in BufReader::new(file).lines().enumerate() {
            let line = line
                .with_context(|| format!("Cannot read '{}'", self.path.display()))?;
            if line.trim().is_empty() {
                continue;
            }
            examples.push(self.parse_line(&line, i + 1)?);
        }

        let labelled = examples.iter().filter(|e| e.answer_span().is_some()).count();
        tracing::info!(
            "Loaded {} examples ({} labelled) from '{}'",
            examples.len(),
            labelled,
            self.path.display()
        );
        Ok(examples)
    }
}
