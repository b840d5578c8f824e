// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs and traits: no Burn types, no file I/O.
//
//   example.rs — one pre-tokenised document/question pair
//   span.rs    — answer spans and their decoding from scores
//   traits.rs  — ExampleSource, SpanPredictor

pub mod example;
pub mod span;
pub mod traits;
