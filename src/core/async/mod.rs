//! Concurrent journal replay
//!
//! The core components are already thread-safe (`DashMap` storage, `&self`
//! methods), so the async side only adds the scheduling layer:
//!
//! - **BatchProcessor**: partitions journal batches by group and replays each
//!   group in its own tokio task
//!
//! # Thread Safety
//!
//! - Records of different groups proceed in parallel
//! - Records of the same group are replayed sequentially, in journal order

pub mod batch_processor;

pub use batch_processor::{BatchProcessor, ProcessingResult};
