#![recursion_limit = "256"]
//! Document reader for extractive question answering.
//!
//! Given a tokenised document and question, the reader predicts the start
//! and end positions of the answer span inside the document. The network
//! stacks bidirectional recurrent encoders, a 1x1 channel reduction,
//! self-attention pooling into a fixed set of document "objects", a
//! relation network that conditions every object on the question, and two
//! bilinear span-scoring heads.

pub mod application;
pub mod cli;
pub mod data;
pub mod domain;
pub mod infra;
pub mod ml;
