// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers to accomplish one goal
// (training a reader or predicting spans with it).
//
// Rules for this layer:
//   - No model math here
//   - No argument parsing or printing (that's Layer 1)
//   - Only workflow coordination

// The training workflow
pub mod train_use_case;

// The span prediction workflow
pub mod predict_use_case;
