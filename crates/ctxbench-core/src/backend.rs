//! The generation boundary.
//!
//! The backend itself (model loading, sampling, tokenization) is out
//! of scope; this trait is the whole contract. Every metric the
//! backend may decline to expose is an `Option`; absent and zero mean
//! different things to the diagnostic classifier, so absence is never
//! coerced to 0.

use serde::{Deserialize, Serialize};

use crate::error::CtxResult;
use crate::step::StepName;

/// One generation request.
#[derive(Debug, Clone)]
pub struct GenerationRequest<'a> {
    pub prompt: &'a str,
    pub step: StepName,
    pub max_output_size: u64,
    pub temperature: f32,
}

/// Measurements for one generation call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepMetrics {
    /// Output size estimate (backend-reported where available).
    pub output_size: u64,
    /// End-to-end latency of the call in milliseconds.
    pub latency_ms: f64,
    /// Prefill-phase latency, when the backend splits it out.
    pub prefill_ms: Option<f64>,
    /// Decode-phase latency, when the backend splits it out.
    pub decode_ms: Option<f64>,
    /// Input size the backend actually computed over.
    pub computed_input_size: Option<u64>,
    /// Backend-reported reused (cache-hit) input size. `Some(0)` means
    /// "measured, nothing reused"; `None` means "not exposed".
    pub reused_size: Option<u64>,
    /// Energy estimate in joules, when the backend exposes one.
    pub energy_joules: Option<f64>,
}

/// A language-model backend consumed as a request/response boundary.
/// One outstanding call at a time; failures are fatal for the run, as
/// retrying would silently corrupt the latency measurements under
/// test.
pub trait Backend {
    fn name(&self) -> &str;

    fn generate(&self, request: &GenerationRequest<'_>) -> CtxResult<(String, StepMetrics)>;
}
