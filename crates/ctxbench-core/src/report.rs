//! Metrics aggregation and diagnostic classification.
//!
//! Raw per-call measurements roll up into per-task and whole-run
//! totals, then into a comparison with percentage deltas and a
//! computed diagnostic label: were the savings transmission shrink or
//! genuine backend compute reuse? Optional backend metrics stay
//! `None` through every aggregate, since "unknown" and 0 carry different
//! diagnostic meaning.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::backend::StepMetrics;
use crate::prompt::Mode;
use crate::step::StepName;

/// Tolerance band, in percentage points, for deciding whether the
/// prefill-latency reduction tracks the transmitted-size reduction.
/// Arbitrary by nature; exposed through config rather than baked in.
pub const DEFAULT_TOLERANCE_PCT: f64 = 10.0;

/// One completed backend call with its dedup bookkeeping.
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub task_idx: usize,
    pub step: StepName,
    /// Client-side size estimate of the assembled prompt.
    pub input_size: u64,
    /// Snippet size actually embedded in full at this step.
    pub new_snippet_size: u64,
    /// Snippet size full-resend would have sent but this step did not.
    pub avoided_size: u64,
    pub snippet_ids: Vec<String>,
    pub metrics: StepMetrics,
}

/// Per-task rollup.
#[derive(Debug, Clone, Serialize)]
pub struct TaskReport {
    pub task_idx: usize,
    pub input_size: u64,
    pub output_size: u64,
    pub latency_ms: f64,
    pub prefill_ms: f64,
    pub decode_ms: f64,
    pub new_snippets: usize,
    pub avoided_size: u64,
}

/// Whole-run aggregate for one session/mode.
#[derive(Debug, Clone, Serialize)]
pub struct ModeReport {
    pub mode: Mode,
    pub num_tasks: usize,
    pub total_steps: usize,
    pub total_input_size: u64,
    pub total_output_size: u64,
    pub total_latency_ms: f64,
    pub total_prefill_ms: f64,
    pub total_decode_ms: f64,
    /// True when any step's prefill/decode split had to be
    /// reconstructed heuristically instead of backend-reported. The
    /// split is then a best-effort estimate, not a measurement.
    pub prefill_estimated: bool,
    pub total_computed_input_size: Option<u64>,
    pub total_reused_size: Option<u64>,
    pub total_energy_joules: Option<f64>,
    pub total_avoided_size: u64,
    /// Distinct snippet ids transmitted in full (reference mode only).
    pub unique_snippets: Option<usize>,
    /// Fraction of snippet transmissions that were references
    /// (reference mode only).
    pub reuse_rate: Option<f64>,
    pub avg_input_size: f64,
    pub avg_output_size: f64,
    pub avg_latency_ms: f64,
    pub tasks: Vec<TaskReport>,
}

impl ModeReport {
    /// Roll step records up into one mode report. `dedup` carries the
    /// tracker's final counts for reference mode, `None` for
    /// full-resend.
    pub fn from_steps(
        mode: Mode,
        num_tasks: usize,
        steps: &[StepRecord],
        dedup: Option<(usize, f64)>,
    ) -> Self {
        let mut tasks: Vec<TaskReport> = Vec::new();
        let mut prefill_estimated = false;

        let mut total_computed: Option<u64> = None;
        let mut total_reused: Option<u64> = None;
        let mut total_energy: Option<f64> = None;

        for record in steps {
            let (prefill, decode, estimated) = split_latency(record);
            prefill_estimated |= estimated;

            if let Some(c) = record.metrics.computed_input_size {
                total_computed = Some(total_computed.unwrap_or(0) + c);
            }
            if let Some(r) = record.metrics.reused_size {
                total_reused = Some(total_reused.unwrap_or(0) + r);
            }
            if let Some(e) = record.metrics.energy_joules {
                total_energy = Some(total_energy.unwrap_or(0.0) + e);
            }

            let task = match tasks.last_mut() {
                Some(t) if t.task_idx == record.task_idx => t,
                _ => {
                    tasks.push(TaskReport {
                        task_idx: record.task_idx,
                        input_size: 0,
                        output_size: 0,
                        latency_ms: 0.0,
                        prefill_ms: 0.0,
                        decode_ms: 0.0,
                        new_snippets: 0,
                        avoided_size: 0,
                    });
                    tasks.last_mut().expect("just pushed")
                }
            };
            task.input_size += record.input_size;
            task.output_size += record.metrics.output_size;
            task.latency_ms += record.metrics.latency_ms;
            task.prefill_ms += prefill;
            task.decode_ms += decode;
            task.avoided_size += record.avoided_size;
        }

        // new_snippets per task = ids whose first occurrence in the
        // session falls inside that task.
        count_new_snippets(&mut tasks, steps);

        let total_input_size: u64 = tasks.iter().map(|t| t.input_size).sum();
        let total_output_size: u64 = tasks.iter().map(|t| t.output_size).sum();
        let total_latency_ms: f64 = tasks.iter().map(|t| t.latency_ms).sum();
        let total_prefill_ms: f64 = tasks.iter().map(|t| t.prefill_ms).sum();
        let total_decode_ms: f64 = tasks.iter().map(|t| t.decode_ms).sum();
        let total_avoided_size: u64 = tasks.iter().map(|t| t.avoided_size).sum();

        let n = num_tasks.max(1) as f64;
        Self {
            mode,
            num_tasks,
            total_steps: steps.len(),
            total_input_size,
            total_output_size,
            total_latency_ms,
            total_prefill_ms,
            total_decode_ms,
            prefill_estimated,
            total_computed_input_size: total_computed,
            total_reused_size: total_reused,
            total_energy_joules: total_energy,
            total_avoided_size,
            unique_snippets: dedup.map(|(unique, _)| unique),
            reuse_rate: dedup.map(|(_, rate)| rate),
            avg_input_size: total_input_size as f64 / n,
            avg_output_size: total_output_size as f64 / n,
            avg_latency_ms: total_latency_ms / n,
            tasks,
        }
    }
}

/// Backend-reported split when available, otherwise the documented
/// heuristic: prefill scales with the input share of total traffic.
fn split_latency(record: &StepRecord) -> (f64, f64, bool) {
    match (record.metrics.prefill_ms, record.metrics.decode_ms) {
        (Some(p), Some(d)) => (p, d, false),
        (Some(p), None) => (p, (record.metrics.latency_ms - p).max(0.0), false),
        _ => {
            let total = record.input_size + record.metrics.output_size;
            let share = if total == 0 {
                0.0
            } else {
                record.input_size as f64 / total as f64
            };
            let prefill = record.metrics.latency_ms * share;
            (prefill, record.metrics.latency_ms - prefill, true)
        }
    }
}

fn count_new_snippets(tasks: &mut [TaskReport], steps: &[StepRecord]) {
    use std::collections::HashSet;
    let mut seen: HashSet<&str> = HashSet::new();
    for record in steps {
        let task = tasks
            .iter_mut()
            .find(|t| t.task_idx == record.task_idx)
            .expect("task row exists for every record");
        for id in &record.snippet_ids {
            if seen.insert(id.as_str()) {
                task.new_snippets += 1;
            }
        }
    }
}

/// Percentage deltas between the two modes. Reductions are positive
/// when the treatment is smaller/faster than the baseline.
#[derive(Debug, Clone, Serialize)]
pub struct Deltas {
    pub input_size_reduction: i64,
    pub input_size_reduction_pct: f64,
    pub latency_reduction_ms: f64,
    pub latency_reduction_pct: f64,
    pub prefill_reduction_ms: f64,
    pub prefill_reduction_pct: f64,
    pub decode_reduction_ms: f64,
    pub decode_reduction_pct: f64,
    pub energy_reduction_joules: Option<f64>,
    pub energy_reduction_pct: Option<f64>,
}

/// Percent reduction from `base` to `new`; 0.0 on a zero baseline
/// rather than a division error.
pub fn pct_reduction(base: f64, new: f64) -> f64 {
    if base == 0.0 {
        return 0.0;
    }
    (base - new) / base * 100.0
}

impl Deltas {
    pub fn between(baseline: &ModeReport, treatment: &ModeReport) -> Self {
        let energy = match (baseline.total_energy_joules, treatment.total_energy_joules) {
            (Some(b), Some(t)) => Some((b - t, pct_reduction(b, t))),
            _ => None,
        };
        Self {
            input_size_reduction: baseline.total_input_size as i64
                - treatment.total_input_size as i64,
            input_size_reduction_pct: pct_reduction(
                baseline.total_input_size as f64,
                treatment.total_input_size as f64,
            ),
            latency_reduction_ms: baseline.total_latency_ms - treatment.total_latency_ms,
            latency_reduction_pct: pct_reduction(
                baseline.total_latency_ms,
                treatment.total_latency_ms,
            ),
            prefill_reduction_ms: baseline.total_prefill_ms - treatment.total_prefill_ms,
            prefill_reduction_pct: pct_reduction(
                baseline.total_prefill_ms,
                treatment.total_prefill_ms,
            ),
            decode_reduction_ms: baseline.total_decode_ms - treatment.total_decode_ms,
            decode_reduction_pct: pct_reduction(
                baseline.total_decode_ms,
                treatment.total_decode_ms,
            ),
            energy_reduction_joules: energy.map(|(j, _)| j),
            energy_reduction_pct: energy.map(|(_, p)| p),
        }
    }
}

/// Why the observed savings happened. Computed, never asserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Diagnostic {
    /// Backend explicitly reported reused tokens, the strongest
    /// evidence of compute-side savings.
    ComputeReuse,
    /// No reuse signal, but dedup avoided payload and prefill latency
    /// tracked the size reduction: savings came from sending less
    /// data.
    TransmissionShrink,
    /// Avoided payload exists but size and prefill reductions diverge
    /// beyond tolerance: ambiguous, needs a different configuration.
    MixedSignal,
    /// Nothing avoided and no reuse reported.
    NoReuseDetected,
}

impl Diagnostic {
    pub fn classify(
        reused_size: Option<u64>,
        avoided_size: u64,
        size_reduction_pct: f64,
        prefill_reduction_pct: f64,
        tolerance_pct: f64,
    ) -> Self {
        if matches!(reused_size, Some(r) if r > 0) {
            return Self::ComputeReuse;
        }
        if avoided_size == 0 {
            return Self::NoReuseDetected;
        }
        if (prefill_reduction_pct - size_reduction_pct).abs() <= tolerance_pct {
            Self::TransmissionShrink
        } else {
            Self::MixedSignal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ComputeReuse => "compute-reuse",
            Self::TransmissionShrink => "transmission-shrink",
            Self::MixedSignal => "mixed-signal",
            Self::NoReuseDetected => "no-reuse-detected",
        }
    }

    /// One-line interpretation printed under the diagnostic header.
    pub fn summary(&self) -> &'static str {
        match self {
            Self::ComputeReuse => {
                "backend reported reused tokens > 0: savings are compute-side (cache reuse)"
            }
            Self::TransmissionShrink => {
                "prefill latency dropped proportionally to payload size: savings are from \
                 smaller transmissions, not backend compute reuse"
            }
            Self::MixedSignal => {
                "size and prefill reductions diverge beyond tolerance: rerun with a \
                 prefill-dominant configuration to disambiguate"
            }
            Self::NoReuseDetected => "no avoided payload and no reuse reported",
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The externally observable artifact of a full comparison run.
/// Stable in shape across runs of the same configuration.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub generated_at: DateTime<Utc>,
    pub num_tasks: usize,
    pub baseline: ModeReport,
    pub treatment: ModeReport,
    pub deltas: Deltas,
    pub tolerance_pct: f64,
    pub diagnostic: Diagnostic,
}

impl ComparisonReport {
    pub fn build(baseline: ModeReport, treatment: ModeReport, tolerance_pct: f64) -> Self {
        let deltas = Deltas::between(&baseline, &treatment);
        let diagnostic = Diagnostic::classify(
            treatment.total_reused_size,
            treatment.total_avoided_size,
            deltas.input_size_reduction_pct,
            deltas.prefill_reduction_pct,
            tolerance_pct,
        );
        Self {
            generated_at: Utc::now(),
            num_tasks: baseline.num_tasks,
            baseline,
            treatment,
            deltas,
            tolerance_pct,
            diagnostic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(task_idx: usize, step: StepName, input: u64, metrics: StepMetrics) -> StepRecord {
        StepRecord {
            task_idx,
            step,
            input_size: input,
            new_snippet_size: 0,
            avoided_size: 0,
            snippet_ids: Vec::new(),
            metrics,
        }
    }

    #[test]
    fn test_pct_reduction_zero_safe() {
        assert_eq!(pct_reduction(0.0, 10.0), 0.0);
        assert_eq!(pct_reduction(100.0, 50.0), 50.0);
        assert_eq!(pct_reduction(100.0, 120.0), -20.0);
    }

    #[test]
    fn test_optional_metrics_stay_unknown() {
        let steps = vec![
            record(1, StepName::Planner, 100, StepMetrics {
                output_size: 50,
                latency_ms: 10.0,
                ..Default::default()
            }),
            record(1, StepName::Executor, 100, StepMetrics {
                output_size: 50,
                latency_ms: 10.0,
                ..Default::default()
            }),
        ];
        let report = ModeReport::from_steps(Mode::FullResend, 1, &steps, None);
        assert_eq!(report.total_reused_size, None);
        assert_eq!(report.total_energy_joules, None);
        assert_eq!(report.total_computed_input_size, None);
        assert!(report.prefill_estimated);
    }

    #[test]
    fn test_reported_reuse_sums_and_is_not_estimated() {
        let metrics = StepMetrics {
            output_size: 50,
            latency_ms: 10.0,
            prefill_ms: Some(6.0),
            decode_ms: Some(4.0),
            reused_size: Some(30),
            ..Default::default()
        };
        let steps = vec![
            record(1, StepName::Planner, 100, metrics.clone()),
            record(1, StepName::Executor, 100, metrics),
        ];
        let report = ModeReport::from_steps(Mode::Reference, 1, &steps, Some((2, 0.5)));
        assert_eq!(report.total_reused_size, Some(60));
        assert!(!report.prefill_estimated);
        assert_eq!(report.total_prefill_ms, 12.0);
        assert_eq!(report.total_decode_ms, 8.0);
        assert_eq!(report.unique_snippets, Some(2));
    }

    #[test]
    fn test_heuristic_split_follows_input_share() {
        // input 300, output 100: prefill share = 0.75
        let steps = vec![record(1, StepName::Planner, 300, StepMetrics {
            output_size: 100,
            latency_ms: 40.0,
            ..Default::default()
        })];
        let report = ModeReport::from_steps(Mode::FullResend, 1, &steps, None);
        assert!((report.total_prefill_ms - 30.0).abs() < 1e-9);
        assert!((report.total_decode_ms - 10.0).abs() < 1e-9);
        assert!(report.prefill_estimated);
    }

    #[test]
    fn test_task_rollup_groups_by_task() {
        let m = StepMetrics {
            output_size: 10,
            latency_ms: 5.0,
            ..Default::default()
        };
        let steps = vec![
            record(1, StepName::Planner, 100, m.clone()),
            record(1, StepName::Executor, 100, m.clone()),
            record(2, StepName::Planner, 200, m.clone()),
        ];
        let report = ModeReport::from_steps(Mode::FullResend, 2, &steps, None);
        assert_eq!(report.tasks.len(), 2);
        assert_eq!(report.tasks[0].input_size, 200);
        assert_eq!(report.tasks[1].input_size, 200);
        assert_eq!(report.total_input_size, 400);
        assert_eq!(report.avg_input_size, 200.0);
    }

    #[test]
    fn test_new_snippet_count_first_task_wins() {
        let m = StepMetrics::default();
        let mut s1 = record(1, StepName::Planner, 0, m.clone());
        s1.snippet_ids = vec!["a".into(), "b".into()];
        let mut s2 = record(1, StepName::Executor, 0, m.clone());
        s2.snippet_ids = vec!["a".into(), "b".into()];
        let mut s3 = record(2, StepName::Planner, 0, m);
        s3.snippet_ids = vec!["a".into(), "c".into()];
        let report = ModeReport::from_steps(Mode::Reference, 2, &[s1, s2, s3], Some((3, 0.5)));
        assert_eq!(report.tasks[0].new_snippets, 2);
        assert_eq!(report.tasks[1].new_snippets, 1);
    }

    #[test]
    fn test_classify_compute_reuse_takes_precedence() {
        // Even with divergent percentages, reported reuse wins.
        let d = Diagnostic::classify(Some(500), 1000, 40.0, 5.0, DEFAULT_TOLERANCE_PCT);
        assert_eq!(d, Diagnostic::ComputeReuse);
    }

    #[test]
    fn test_classify_reported_zero_is_not_reuse() {
        let d = Diagnostic::classify(Some(0), 1000, 40.0, 38.0, DEFAULT_TOLERANCE_PCT);
        assert_eq!(d, Diagnostic::TransmissionShrink);
    }

    #[test]
    fn test_classify_transmission_vs_mixed() {
        let within = Diagnostic::classify(None, 1000, 40.0, 35.0, DEFAULT_TOLERANCE_PCT);
        assert_eq!(within, Diagnostic::TransmissionShrink);
        let diverged = Diagnostic::classify(None, 1000, 40.0, 5.0, DEFAULT_TOLERANCE_PCT);
        assert_eq!(diverged, Diagnostic::MixedSignal);
    }

    #[test]
    fn test_classify_no_reuse() {
        assert_eq!(
            Diagnostic::classify(None, 0, 0.0, 0.0, DEFAULT_TOLERANCE_PCT),
            Diagnostic::NoReuseDetected
        );
        assert_eq!(
            Diagnostic::classify(Some(0), 0, 0.0, 0.0, DEFAULT_TOLERANCE_PCT),
            Diagnostic::NoReuseDetected
        );
    }

    #[test]
    fn test_classify_respects_custom_tolerance() {
        // 15-point divergence: mixed at default, shrink at 20.
        let at_default = Diagnostic::classify(None, 10, 40.0, 25.0, DEFAULT_TOLERANCE_PCT);
        assert_eq!(at_default, Diagnostic::MixedSignal);
        let relaxed = Diagnostic::classify(None, 10, 40.0, 25.0, 20.0);
        assert_eq!(relaxed, Diagnostic::TransmissionShrink);
    }

    #[test]
    fn test_comparison_report_zero_baseline_deltas() {
        let empty = ModeReport::from_steps(Mode::FullResend, 0, &[], None);
        let empty2 = ModeReport::from_steps(Mode::Reference, 0, &[], Some((0, 0.0)));
        let report = ComparisonReport::build(empty, empty2, DEFAULT_TOLERANCE_PCT);
        assert_eq!(report.deltas.input_size_reduction_pct, 0.0);
        assert_eq!(report.deltas.latency_reduction_pct, 0.0);
        assert_eq!(report.diagnostic, Diagnostic::NoReuseDetected);
    }

    #[test]
    fn test_report_serializes() {
        let steps = vec![record(1, StepName::Planner, 100, StepMetrics {
            output_size: 10,
            latency_ms: 5.0,
            ..Default::default()
        })];
        let baseline = ModeReport::from_steps(Mode::FullResend, 1, &steps, None);
        let treatment = ModeReport::from_steps(Mode::Reference, 1, &steps, Some((1, 0.0)));
        let report = ComparisonReport::build(baseline, treatment, DEFAULT_TOLERANCE_PCT);
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"diagnostic\""));
        assert!(json.contains("\"reused_size\"") || json.contains("\"total_reused_size\""));
    }
}
