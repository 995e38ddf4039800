//! Prompt assembly for the two transmission protocols.
//!
//! Both assemblers are pure functions of their inputs (plus tracker
//! state in reference mode): identical inputs produce byte-identical
//! prompts, which is what makes the prompt-hash audit trace useful.
//! Snippets render in retrieval order because dedup decisions are
//! order-dependent, first occurrence in the session wins.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::snippet::{truncate_bytes, Snippet, SourceLocator};
use crate::step::StepName;
use crate::tracker::SnippetTracker;

/// Character budget for each prior-step output rendered into a later
/// step's prompt. Keeps the 3-step chain from growing without bound.
pub const PRIOR_OUTPUT_BUDGET: usize = 1500;

/// Which transmission protocol a session runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// Stateless: every snippet's full text in every step.
    FullResend,
    /// Session-aware: full text once per session, id reference after.
    Reference,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FullResend => "full-resend",
            Self::Reference => "reference",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full-resend assembly: every snippet embedded in full, labeled by
/// its source locator, regardless of earlier steps or tasks.
pub fn assemble_full(
    task_idx: usize,
    task_text: &str,
    step: StepName,
    snippets: &[Snippet],
    prior_outputs: &[String],
) -> String {
    let mut parts = Vec::new();
    parts.push(format!("## Task {task_idx}: {task_text}"));

    if !snippets.is_empty() {
        parts.push("\n## Retrieved Code Snippets\n".to_string());
        for snippet in snippets {
            parts.push(format!("### Snippet: {}", locator_label(&snippet.locator)));
            parts.push(format!("```\n{}\n```\n", snippet.text));
        }
    }

    push_prior_outputs(&mut parts, prior_outputs);
    push_instruction(&mut parts, step);
    parts.join("\n")
}

/// Reference assembly: consult the tracker per snippet. Newly seen ids
/// get the full text exactly once; anything seen earlier in the
/// session (this task or any prior task) gets a one-line reference.
pub fn assemble_reference(
    task_idx: usize,
    task_text: &str,
    step: StepName,
    snippets: &[Snippet],
    prior_outputs: &[String],
    tracker: &mut SnippetTracker,
) -> String {
    let mut parts = Vec::new();
    parts.push(format!("## Task {task_idx}: {task_text}"));

    if !snippets.is_empty() {
        parts.push("\n## Retrieved Code Snippets\n".to_string());
        for snippet in snippets {
            if tracker.record(&snippet.snippet_id) {
                parts.push(format!(
                    "### Snippet [{}]: {}",
                    snippet.snippet_id,
                    locator_label(&snippet.locator)
                ));
                parts.push(format!("```\n{}\n```\n", snippet.text));
            } else {
                parts.push(format!(
                    "### Snippet Reference: [{}] (previously loaded)",
                    snippet.snippet_id
                ));
            }
        }
    }

    push_prior_outputs(&mut parts, prior_outputs);
    push_instruction(&mut parts, step);
    parts.join("\n")
}

fn locator_label(locator: &SourceLocator) -> String {
    locator.to_string()
}

fn push_prior_outputs(parts: &mut Vec<String>, prior_outputs: &[String]) {
    if prior_outputs.is_empty() {
        return;
    }
    parts.push("\n## Previous Analysis\n".to_string());
    for (i, output) in prior_outputs.iter().enumerate() {
        let label = StepName::ALL
            .get(i)
            .map(|s| s.label().to_string())
            .unwrap_or_else(|| format!("Step {}", i + 1));
        let bounded = if output.len() > PRIOR_OUTPUT_BUDGET {
            format!("{}...", truncate_bytes(output, PRIOR_OUTPUT_BUDGET))
        } else {
            output.clone()
        };
        parts.push(format!("### {label} Output\n{bounded}\n"));
    }
}

fn push_instruction(parts: &mut Vec<String>, step: StepName) {
    parts.push(format!(
        "\n## Your Task: {}\n{}",
        step.label(),
        step.instruction()
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snippet::Snippet;

    fn snip(text: &str) -> Snippet {
        Snippet::from_text(
            "file:x.rs",
            text.to_string(),
            SourceLocator::Resolved {
                path: "src/x.rs".into(),
                start_line: 1,
                end_line: 3,
            },
        )
    }

    #[test]
    fn test_full_mode_always_embeds() {
        let snippets = vec![snip("fn a() {}"), snip("fn b() {}")];
        let p1 = assemble_full(1, "analyze", StepName::Planner, &snippets, &[]);
        let p2 = assemble_full(1, "analyze", StepName::Executor, &snippets, &[]);
        assert!(p1.contains("fn a() {}"));
        assert!(p1.contains("fn b() {}"));
        // second step still embeds everything
        assert!(p2.contains("fn a() {}"));
        assert!(p2.contains("fn b() {}"));
    }

    #[test]
    fn test_reference_mode_embeds_once_then_references() {
        let snippets = vec![snip("fn a() {}")];
        let mut tracker = SnippetTracker::new();
        let id = snippets[0].snippet_id.clone();

        let first = assemble_reference(1, "t", StepName::Planner, &snippets, &[], &mut tracker);
        assert!(first.contains("fn a() {}"));
        assert!(first.contains(&id));

        let second = assemble_reference(1, "t", StepName::Executor, &snippets, &[], &mut tracker);
        assert!(!second.contains("fn a() {}"));
        assert!(second.contains("previously loaded"));
        assert!(second.contains(&id));
    }

    #[test]
    fn test_reference_dedup_crosses_tasks() {
        let snippets = vec![snip("fn a() {}")];
        let mut tracker = SnippetTracker::new();
        let _ = assemble_reference(1, "t1", StepName::Planner, &snippets, &[], &mut tracker);
        // Same snippet retrieved for a different task: still a reference.
        let p = assemble_reference(2, "t2", StepName::Planner, &snippets, &[], &mut tracker);
        assert!(!p.contains("fn a() {}"));
        assert!(p.contains("previously loaded"));
    }

    #[test]
    fn test_determinism_byte_identical() {
        let snippets = vec![snip("fn a() {}"), snip("fn b() {}")];
        let prior = vec!["plan output".to_string()];
        let a = assemble_full(3, "task", StepName::Verifier, &snippets, &prior);
        let b = assemble_full(3, "task", StepName::Verifier, &snippets, &prior);
        assert_eq!(a, b);
    }

    #[test]
    fn test_prior_outputs_bounded() {
        let long = "x".repeat(PRIOR_OUTPUT_BUDGET + 500);
        let prompt = assemble_full(1, "t", StepName::Executor, &[], &[long]);
        assert!(prompt.contains("..."));
        assert!(prompt.len() < PRIOR_OUTPUT_BUDGET + 600);
    }

    #[test]
    fn test_snippet_order_preserved() {
        let snippets = vec![snip("AAAA first"), snip("BBBB second")];
        let prompt = assemble_full(1, "t", StepName::Planner, &snippets, &[]);
        let a = prompt.find("AAAA first").unwrap();
        let b = prompt.find("BBBB second").unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_instruction_selected_by_step() {
        let p = assemble_full(1, "t", StepName::Verifier, &[], &[]);
        assert!(p.contains("## Your Task: Verifier"));
        assert!(p.contains(StepName::Verifier.instruction()));
    }
}
