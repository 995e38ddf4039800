//! Session orchestration: N tasks × 3 ordered steps against one
//! backend, one mode, one fresh tracker.
//!
//! Strictly sequential: step *n* needs step *n-1*'s real output
//! before it can assemble its prompt. The backend call is the single
//! blocking operation; a failure there is fatal for the run (no
//! retries, they would corrupt the latency measurements).

use std::collections::HashSet;

use tracing::debug;

use ctxbench_core::{
    assemble_full, assemble_reference, size_estimate, snippet_id, Backend, Catalog, CtxError,
    CtxResult, GenerationRequest, Mode, ModeReport, Snippet, SnippetTracker, StepName, StepRecord,
};
use ctxbench_store::RepoStore;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub num_tasks: usize,
    pub max_output_size: u64,
    pub temperature: f32,
}

pub struct SessionRunner<'a> {
    store: &'a RepoStore,
    backend: &'a dyn Backend,
    catalog: &'a Catalog,
    options: RunOptions,
}

impl<'a> SessionRunner<'a> {
    pub fn new(
        store: &'a RepoStore,
        backend: &'a dyn Backend,
        catalog: &'a Catalog,
        options: RunOptions,
    ) -> Self {
        Self {
            store,
            backend,
            catalog,
            options,
        }
    }

    /// Run one full session under the given mode and aggregate it.
    /// The tracker is created here so a session can never inherit
    /// dedup state from another run.
    pub fn run(&self, mode: Mode) -> CtxResult<ModeReport> {
        let mut tracker = SnippetTracker::new();
        let mut records: Vec<StepRecord> = Vec::new();

        for task_idx in 1..=self.options.num_tasks {
            let task = self.catalog.task(task_idx)?;
            let snippets: Vec<Snippet> =
                task.queries.iter().map(|q| self.store.resolve(q)).collect();
            let mut prior_outputs: Vec<String> = Vec::new();

            for step in StepName::ALL {
                // Dedup decisions are committed by `record` during
                // assembly; compute the avoided/new split first, while
                // `has_seen` still reflects the pre-step state.
                let (new_size, avoided_size) = step_split(mode, &tracker, &snippets);

                let prompt = match mode {
                    Mode::FullResend => assemble_full(
                        task_idx,
                        &task.prompt,
                        step,
                        &snippets,
                        &prior_outputs,
                    ),
                    Mode::Reference => assemble_reference(
                        task_idx,
                        &task.prompt,
                        step,
                        &snippets,
                        &prior_outputs,
                        &mut tracker,
                    ),
                };

                let input_size = size_estimate(&prompt);
                let ids: Vec<String> =
                    snippets.iter().map(|s| s.snippet_id.clone()).collect();
                debug!(
                    task = task_idx,
                    step = step.as_str(),
                    prompt_sha = %snippet_id(&prompt),
                    input_size,
                    snippets = %ids.join(","),
                    "assembled prompt"
                );

                let request = GenerationRequest {
                    prompt: &prompt,
                    step,
                    max_output_size: self.options.max_output_size,
                    temperature: self.options.temperature,
                };
                let (output, metrics) =
                    self.backend
                        .generate(&request)
                        .map_err(|e| CtxError::Backend {
                            task: task_idx,
                            step: step.as_str().to_string(),
                            message: e.to_string(),
                        })?;
                prior_outputs.push(output);

                records.push(StepRecord {
                    task_idx,
                    step,
                    input_size,
                    new_snippet_size: new_size,
                    avoided_size,
                    snippet_ids: ids,
                    metrics,
                });
            }
        }

        let dedup = match mode {
            Mode::FullResend => None,
            Mode::Reference => Some((tracker.unique_count(), tracker.reuse_rate())),
        };
        Ok(ModeReport::from_steps(
            mode,
            self.options.num_tasks,
            &records,
            dedup,
        ))
    }
}

/// (size sent in full, size avoided) for one step, mirroring exactly
/// what `record` will decide during assembly, including duplicate ids
/// inside a single step, where only the first occurrence embeds.
fn step_split(mode: Mode, tracker: &SnippetTracker, snippets: &[Snippet]) -> (u64, u64) {
    if mode == Mode::FullResend {
        let total = snippets.iter().map(|s| s.size_estimate).sum();
        return (total, 0);
    }
    let mut new_size = 0;
    let mut avoided = 0;
    let mut embedding_now: HashSet<&str> = HashSet::new();
    for snippet in snippets {
        if tracker.has_seen(&snippet.snippet_id) || embedding_now.contains(snippet.snippet_id.as_str())
        {
            avoided += snippet.size_estimate;
        } else {
            embedding_now.insert(&snippet.snippet_id);
            new_size += snippet.size_estimate;
        }
    }
    (new_size, avoided)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture;
    use ctxbench_backend::{SimBackend, SimProfile};
    use ctxbench_core::{Diagnostic, StepMetrics, TaskSpec, DEFAULT_TOLERANCE_PCT};

    fn options(num_tasks: usize) -> RunOptions {
        RunOptions {
            num_tasks,
            max_output_size: 64,
            temperature: 0.7,
        }
    }

    fn two_task_catalog() -> Catalog {
        let queries: Vec<String> = vec![
            "file:routing.rs".into(),
            "file:scoring.rs".into(),
            "file:audit.rs".into(),
        ];
        Catalog::new(vec![
            TaskSpec {
                prompt: "analyze routing".into(),
                queries: queries.clone(),
            },
            TaskSpec {
                prompt: "analyze scoring".into(),
                queries,
            },
        ])
    }

    struct FailingBackend;

    impl Backend for FailingBackend {
        fn name(&self) -> &str {
            "failing"
        }

        fn generate(
            &self,
            _request: &GenerationRequest<'_>,
        ) -> CtxResult<(String, StepMetrics)> {
            Err(CtxError::Generation("connection refused".into()))
        }
    }

    #[test]
    fn test_end_to_end_dedup_scenario() {
        // 2 tasks × the same 3 queries × 3 steps = 18 lookups:
        // 3 full transmissions, 15 references, reuse rate 15/18.
        let dir = tempfile::tempdir().unwrap();
        fixture::materialize(dir.path()).unwrap();
        let store = RepoStore::new(dir.path());
        let backend = SimBackend::new(SimProfile::Balanced);
        let catalog = two_task_catalog();
        let runner = SessionRunner::new(&store, &backend, &catalog, options(2));

        let report = runner.run(Mode::Reference).unwrap();
        assert_eq!(report.total_steps, 6);
        assert_eq!(report.unique_snippets, Some(3));
        let rate = report.reuse_rate.unwrap();
        assert!((rate - 15.0 / 18.0).abs() < 1e-9, "rate was {rate}");
        assert_eq!(report.tasks[0].new_snippets, 3);
        assert_eq!(report.tasks[1].new_snippets, 0);
    }

    #[test]
    fn test_avoided_size_conservation() {
        let dir = tempfile::tempdir().unwrap();
        fixture::materialize(dir.path()).unwrap();
        let store = RepoStore::new(dir.path());
        let backend = SimBackend::new(SimProfile::Balanced);
        let catalog = two_task_catalog();
        let runner = SessionRunner::new(&store, &backend, &catalog, options(2));

        let snippet_sum: u64 = catalog.tasks[0]
            .queries
            .iter()
            .map(|q| store.resolve(q).size_estimate)
            .sum();

        let report = runner.run(Mode::Reference).unwrap();
        // Task 1 avoids the set twice (steps 2 and 3); task 2 avoids
        // it in all three steps.
        assert_eq!(report.tasks[0].avoided_size, 2 * snippet_sum);
        assert_eq!(report.tasks[1].avoided_size, 3 * snippet_sum);
        assert_eq!(report.total_avoided_size, 5 * snippet_sum);
    }

    #[test]
    fn test_baseline_sends_more_than_reference() {
        let dir = tempfile::tempdir().unwrap();
        fixture::materialize(dir.path()).unwrap();
        let store = RepoStore::new(dir.path());
        let backend = SimBackend::new(SimProfile::Balanced);
        let catalog = two_task_catalog();
        let runner = SessionRunner::new(&store, &backend, &catalog, options(2));

        let baseline = runner.run(Mode::FullResend).unwrap();
        let treatment = runner.run(Mode::Reference).unwrap();
        assert!(baseline.total_input_size > treatment.total_input_size);
        assert_eq!(baseline.unique_snippets, None);
        assert_eq!(baseline.total_avoided_size, 0);
    }

    #[test]
    fn test_runs_are_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        fixture::materialize(dir.path()).unwrap();
        let store = RepoStore::new(dir.path());
        let catalog = two_task_catalog();

        // Fresh backend per run: the sim's reuse state must not leak.
        let backend1 = SimBackend::new(SimProfile::Balanced);
        let runner1 = SessionRunner::new(&store, &backend1, &catalog, options(2));
        let report1 = runner1.run(Mode::Reference).unwrap();

        let backend2 = SimBackend::new(SimProfile::Balanced);
        let runner2 = SessionRunner::new(&store, &backend2, &catalog, options(2));
        let report2 = runner2.run(Mode::Reference).unwrap();

        assert_eq!(report1.total_input_size, report2.total_input_size);
        assert_eq!(report1.total_latency_ms, report2.total_latency_ms);
        assert_eq!(report1.total_avoided_size, report2.total_avoided_size);
    }

    #[test]
    fn test_backend_failure_is_fatal_with_context() {
        let dir = tempfile::tempdir().unwrap();
        fixture::materialize(dir.path()).unwrap();
        let store = RepoStore::new(dir.path());
        let catalog = two_task_catalog();
        let runner = SessionRunner::new(&store, &FailingBackend, &catalog, options(1));

        let err = runner.run(Mode::FullResend).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("task 1"), "{msg}");
        assert!(msg.contains("planner"), "{msg}");
        assert!(msg.contains("connection refused"), "{msg}");
    }

    #[test]
    fn test_kv_reuse_profile_yields_compute_reuse_diagnostic() {
        let dir = tempfile::tempdir().unwrap();
        fixture::materialize(dir.path()).unwrap();
        let store = RepoStore::new(dir.path());
        let catalog = two_task_catalog();

        let baseline_backend = SimBackend::new(SimProfile::KvReuse);
        let baseline = SessionRunner::new(&store, &baseline_backend, &catalog, options(2))
            .run(Mode::FullResend)
            .unwrap();
        let treatment_backend = SimBackend::new(SimProfile::KvReuse);
        let treatment = SessionRunner::new(&store, &treatment_backend, &catalog, options(2))
            .run(Mode::Reference)
            .unwrap();

        // Repeated prompt sections make the simulated cache report
        // reused lines, which must dominate the classification.
        assert!(treatment.total_reused_size.unwrap_or(0) > 0);
        let report = ctxbench_core::ComparisonReport::build(
            baseline,
            treatment,
            DEFAULT_TOLERANCE_PCT,
        );
        assert_eq!(report.diagnostic, Diagnostic::ComputeReuse);
    }

    #[test]
    fn test_not_found_queries_flow_through() {
        let dir = tempfile::tempdir().unwrap();
        fixture::materialize(dir.path()).unwrap();
        let store = RepoStore::new(dir.path());
        let backend = SimBackend::new(SimProfile::Balanced);
        let catalog = Catalog::new(vec![TaskSpec {
            prompt: "missing content".into(),
            queries: vec![
                "file:no_such_file.xyz".into(),
                "function-lookup:phantom".into(),
            ],
        }]);
        let runner = SessionRunner::new(&store, &backend, &catalog, options(1));

        let report = runner.run(Mode::Reference).unwrap();
        // Placeholders still dedup: 2 unique, 4 reuse hits over 6.
        assert_eq!(report.unique_snippets, Some(2));
        let rate = report.reuse_rate.unwrap();
        assert!((rate - 4.0 / 6.0).abs() < 1e-9);
    }
}
