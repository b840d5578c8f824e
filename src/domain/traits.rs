// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer talks to these traits, not to the
// concrete loader or the Burn inferencer:
//
//   ExampleSource  — JsonlLoader today; anything that yields
//                    pre-tokenised examples tomorrow
//   SpanPredictor  — Inferencer over any Burn backend

use anyhow::Result;

use crate::domain::{example::ReaderExample, span::Span};

pub trait ExampleSource {
    /// Load every available example.
    fn load_all(&self) -> Result<Vec<ReaderExample>>;
}

pub trait SpanPredictor {
    /// Best answer span per example, in input order.
    /// None when the document admits no span.
    fn predict(&self, examples: &[ReaderExample]) -> Result<Vec<Option<Span>>>;
}
