//! Storage traits and reference backends
//!
//! The engine is storage-agnostic: workflow definitions and execution records
//! sit behind [`WorkflowStore`] and [`ExecutionStore`]. The in-memory
//! implementations are the reference backends and preserve the read/write
//! contracts exactly (not-found semantics, merge-on-update, single-record
//! mutation scope).

mod memory;
mod traits;

pub use memory::{InMemoryExecutionStore, InMemoryWorkflowStore};
pub use traits::{ExecutionFilter, ExecutionStore, StoreError, WorkflowFilter, WorkflowStore};
