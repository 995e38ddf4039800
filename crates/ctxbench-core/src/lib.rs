//! ctxbench-core: domain types for the context-reuse benchmark.
//!
//! Modules:
//! - `query`: symbolic retrieval query grammar
//! - `snippet`: snippet type, content-hash ids, size estimates
//! - `tracker`: session-scoped snippet deduplication
//! - `step`: the closed planner/executor/verifier step set
//! - `prompt`: full-resend and reference prompt assembly
//! - `backend`: the generation boundary (trait + metrics record)
//! - `catalog`: task prompts and their retrieval queries
//! - `report`: aggregation, deltas, diagnostic classification

pub mod backend;
pub mod catalog;
pub mod error;
pub mod prompt;
pub mod query;
pub mod report;
pub mod snippet;
pub mod step;
pub mod tracker;

pub use backend::{Backend, GenerationRequest, StepMetrics};
pub use catalog::{Catalog, TaskSpec};
pub use error::{CtxError, CtxResult};
pub use prompt::{assemble_full, assemble_reference, Mode, PRIOR_OUTPUT_BUDGET};
pub use query::Query;
pub use report::{
    ComparisonReport, Deltas, Diagnostic, ModeReport, StepRecord, TaskReport,
    DEFAULT_TOLERANCE_PCT,
};
pub use snippet::{
    size_estimate, snippet_id, truncate_bytes, Snippet, SourceLocator, MAX_SNIPPET_SIZE,
    SIZE_DIVISOR,
};
pub use step::StepName;
pub use tracker::SnippetTracker;
