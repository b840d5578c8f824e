// ============================================================
// Layer 4 — Reader Dataset
// ============================================================
// Burn's DataLoader pulls items by index through the Dataset
// trait; batching and padding happen later in ReaderBatcher.

use burn::data::dataset::Dataset;

use crate::domain::example::ReaderExample;

/// In-memory examples served to Burn's DataLoader.
pub struct ReaderDataset {
    examples: Vec<ReaderExample>,
}

impl ReaderDataset {
    pub fn new(examples: Vec<ReaderExample>) -> Self { Self { examples } }

    pub fn example_count(&self) -> usize { self.examples.len() }
}

impl Dataset<ReaderExample> for ReaderDataset {
    fn get(&self, index: usize) -> Option<ReaderExample> {
        self.examples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.examples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example(id: &str, span: Option<(usize, usize)>) -> ReaderExample {
        ReaderExample {
            id:              id.into(),
            document:        vec![1, 2, 3],
            features:        Vec::new(),
            pos:             Vec::new(),
            ner:             Vec::new(),
            question:        vec![4],
            answer_start:    span.map(|s| s.0),
            answer_end:      span.map(|s| s.1),
            document_tokens: Vec::new(),
        }
    }

    #[test]
    fn test_get_by_index() {
        let ds = ReaderDataset::new(vec![example("a", Some((0, 1)))]);
        assert_eq!(ds.example_count(), 1);
        assert_eq!(ds.get(0).map(|e| e.id), Some("a".to_string()));
        assert!(ds.get(1).is_none());
    }
}
