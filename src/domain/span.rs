// ============================================================
// Layer 3 — Answer Span Decoding
// ============================================================
// The model returns raw logits. Turning them into an answer
// is plain arithmetic on two probability vectors:
//
//   score(s, e) = p_start[s] · p_end[e]
//   subject to  s ≤ e < s + max_len
//
// Kept free of Burn types so it can be tested without a
// backend.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    /// Inclusive.
    pub end:   usize,
    pub score: f32,
}

impl Span {
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }
}

/// Numerically stable softmax of one logit row.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|x| (x - max).exp()).collect();
    let total: f32 = exps.iter().sum();
    if total > 0.0 && total.is_finite() {
        exps.into_iter().map(|x| x / total).collect()
    } else {
        vec![0.0; logits.len()]
    }
}

/// The `k` highest-scoring spans, best first.
pub fn top_k_spans(start_probs: &[f32], end_probs: &[f32], max_len: usize, k: usize) -> Vec<Span> {
    let len = start_probs.len().min(end_probs.len());
    let mut spans = Vec::new();
    for start in 0..len {
        for end in start..(start + max_len).min(len) {
            spans.push(Span { start, end, score: start_probs[start] * end_probs[end] });
        }
    }
    spans.sort_by(|a, b| b.score.total_cmp(&a.score));
    spans.truncate(k);
    spans
}

/// Best span, or None for an empty document or max_len = 0.
pub fn best_span(start_probs: &[f32], end_probs: &[f32], max_len: usize) -> Option<Span> {
    top_k_spans(start_probs, end_probs, max_len, 1).into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_softmax_sums_to_one() {
        let p = softmax(&[1.0, 2.0, -1.0e30]);
        assert!((p.iter().sum::<f32>() - 1.0).abs() < 1e-6);
        assert_eq!(p[2], 0.0);
    }

    #[test]
    fn test_best_span_respects_order() {
        // End probability peaks before start probability
        let start = [0.1, 0.1, 0.8];
        let end   = [0.7, 0.2, 0.1];
        let span  = best_span(&start, &end, 15).unwrap();
        assert!(span.start <= span.end);
        assert_eq!((span.start, span.end), (2, 2));
    }

    #[test]
    fn test_best_span_respects_max_len() {
        let start = [0.9, 0.05, 0.05, 0.0];
        let end   = [0.0, 0.0, 0.1, 0.9];
        let span  = best_span(&start, &end, 2).unwrap();
        assert!(span.len() <= 2);
        assert_eq!(best_span(&start, &end, 4).map(|s| (s.start, s.end)), Some((0, 3)));
    }

    #[test]
    fn test_top_k_sorted() {
        let spans = top_k_spans(&[0.5, 0.5], &[0.3, 0.7], 2, 3);
        assert_eq!(spans.len(), 3);
        assert!(spans.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(best_span(&[], &[], 15), None);
        assert_eq!(best_span(&[1.0], &[1.0], 0), None);
    }
}
