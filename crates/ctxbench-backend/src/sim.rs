//! Deterministic simulated backend.
//!
//! No model, no randomness: output text is derived from a hash of the
//! prompt, and latency/energy are modeled from the size estimates
//! under a profile. This makes the whole pipeline (including the
//! diagnostic classifier) exercisable offline and in tests, and lets
//! a profile fabricate the signals a real backend may or may not
//! expose.

use std::collections::HashSet;
use std::fmt;
use std::sync::RwLock;

use sha2::{Digest, Sha256};

use ctxbench_core::{
    size_estimate, Backend, CtxResult, GenerationRequest, StepMetrics, SIZE_DIVISOR,
};

/// Energy model: joules per millisecond of modeled compute.
const JOULES_PER_MS: f64 = 0.28;

/// Latency/reporting profile for the simulated backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimProfile {
    /// Prefill and decode costs of the same order; no reuse signal.
    Balanced,
    /// Prefill dominates, isolating transmission effects, the
    /// configuration the mixed-signal diagnostic asks for.
    PrefillDominant,
    /// Simulates a backend with a content cache: previously seen
    /// prompt lines are reported as reused and cost no prefill.
    KvReuse,
}

impl SimProfile {
    /// (prefill ms per size unit, decode ms per size unit)
    fn costs(&self) -> (f64, f64) {
        match self {
            Self::Balanced => (0.2, 1.5),
            Self::PrefillDominant => (1.0, 0.2),
            Self::KvReuse => (0.2, 1.5),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Balanced => "balanced",
            Self::PrefillDominant => "prefill-dominant",
            Self::KvReuse => "kv-reuse",
        }
    }
}

impl fmt::Display for SimProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SimProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "balanced" => Ok(Self::Balanced),
            "prefill-dominant" | "prefill_dominant" => Ok(Self::PrefillDominant),
            "kv-reuse" | "kv_reuse" => Ok(Self::KvReuse),
            _ => Err(format!("unknown sim profile: {s}")),
        }
    }
}

pub struct SimBackend {
    profile: SimProfile,
    /// Hashes of prompt lines this "session" has already prefilled.
    /// Only consulted by the kv-reuse profile.
    seen_lines: RwLock<HashSet<[u8; 8]>>,
}

impl SimBackend {
    pub fn new(profile: SimProfile) -> Self {
        Self {
            profile,
            seen_lines: RwLock::new(HashSet::new()),
        }
    }

    /// Partition the prompt into (computed, reused) size units by line,
    /// marking every line as seen afterwards.
    fn split_reuse(&self, prompt: &str) -> (u64, u64) {
        let mut seen = self.seen_lines.write().expect("lock");
        let mut computed = 0u64;
        let mut reused = 0u64;
        for line in prompt.lines() {
            let cost = line.len() as u64 / SIZE_DIVISOR;
            let digest = Sha256::digest(line.as_bytes());
            let mut key = [0u8; 8];
            key.copy_from_slice(&digest[..8]);
            if seen.insert(key) {
                computed += cost;
            } else {
                reused += cost;
            }
        }
        (computed, reused)
    }
}

impl Backend for SimBackend {
    fn name(&self) -> &str {
        "sim"
    }

    fn generate(&self, request: &GenerationRequest<'_>) -> CtxResult<(String, StepMetrics)> {
        let input_size = size_estimate(request.prompt);
        let output_size = request.max_output_size;
        let (prefill_cost, decode_cost) = self.profile.costs();

        let (computed, reused) = match self.profile {
            SimProfile::KvReuse => {
                let (computed, reused) = self.split_reuse(request.prompt);
                (computed, Some(reused))
            }
            _ => (input_size, None),
        };

        let prefill_ms = computed as f64 * prefill_cost;
        let decode_ms = output_size as f64 * decode_cost;
        let latency_ms = prefill_ms + decode_ms;

        let output = pseudo_output(request, output_size);

        let metrics = StepMetrics {
            output_size,
            latency_ms,
            prefill_ms: Some(prefill_ms),
            decode_ms: Some(decode_ms),
            computed_input_size: Some(computed),
            reused_size: reused,
            energy_joules: Some(latency_ms * JOULES_PER_MS),
        };
        Ok((output, metrics))
    }
}

/// Deterministic pseudo-text of `output_size` size units, seeded from
/// the prompt and step so each step of a chain produces distinct prior
/// output.
fn pseudo_output(request: &GenerationRequest<'_>, output_size: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(request.step.as_str().as_bytes());
    hasher.update(request.prompt.as_bytes());
    let digest = hasher.finalize();

    let seed: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    let target_bytes = (output_size * SIZE_DIVISOR) as usize;
    let mut out = String::with_capacity(target_bytes + seed.len());
    out.push_str(&format!("[{} analysis {}] ", request.step, &seed[..12]));
    while out.len() < target_bytes {
        out.push_str(&seed);
        out.push(' ');
    }
    out.truncate(target_bytes.max(out.find(']').map(|i| i + 1).unwrap_or(0)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctxbench_core::StepName;

    fn request(prompt: &str) -> GenerationRequest<'_> {
        GenerationRequest {
            prompt,
            step: StepName::Planner,
            max_output_size: 64,
            temperature: 0.7,
        }
    }

    #[test]
    fn test_output_is_deterministic() {
        let backend = SimBackend::new(SimProfile::Balanced);
        let (out1, m1) = backend.generate(&request("hello world")).unwrap();
        let (out2, m2) = backend.generate(&request("hello world")).unwrap();
        assert_eq!(out1, out2);
        assert_eq!(m1.latency_ms, m2.latency_ms);
    }

    #[test]
    fn test_balanced_reports_no_reuse() {
        let backend = SimBackend::new(SimProfile::Balanced);
        let (_, metrics) = backend.generate(&request("some prompt text")).unwrap();
        assert_eq!(metrics.reused_size, None);
        assert!(metrics.prefill_ms.is_some());
        assert!(metrics.energy_joules.is_some());
    }

    #[test]
    fn test_prefill_dominant_shifts_latency() {
        let prompt = "x".repeat(4000);
        let req = GenerationRequest {
            prompt: &prompt,
            step: StepName::Planner,
            max_output_size: 10,
            temperature: 0.0,
        };
        let backend = SimBackend::new(SimProfile::PrefillDominant);
        let (_, metrics) = backend.generate(&req).unwrap();
        assert!(metrics.prefill_ms.unwrap() > metrics.decode_ms.unwrap());
    }

    #[test]
    fn test_kv_reuse_reports_reused_lines() {
        let backend = SimBackend::new(SimProfile::KvReuse);
        let prompt = "shared context line one\nshared context line two\n";
        let (_, first) = backend.generate(&request(prompt)).unwrap();
        assert_eq!(first.reused_size, Some(0));

        let (_, second) = backend.generate(&request(prompt)).unwrap();
        assert!(second.reused_size.unwrap() > 0);
        // Reused lines cost no prefill the second time.
        assert!(second.prefill_ms.unwrap() < first.prefill_ms.unwrap());
    }

    #[test]
    fn test_output_size_matches_request() {
        let backend = SimBackend::new(SimProfile::Balanced);
        let (out, metrics) = backend.generate(&request("p")).unwrap();
        assert_eq!(metrics.output_size, 64);
        assert_eq!(out.len(), 64 * SIZE_DIVISOR as usize);
    }

    #[test]
    fn test_profile_from_str() {
        assert_eq!(
            "prefill_dominant".parse::<SimProfile>().unwrap(),
            SimProfile::PrefillDominant
        );
        assert!("turbo".parse::<SimProfile>().is_err());
    }
}
