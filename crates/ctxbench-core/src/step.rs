//! The closed set of workflow steps and their instruction text.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Ordered steps of one task. Adding a step means touching every match
/// below, which is the point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepName {
    Planner,
    Executor,
    Verifier,
}

impl StepName {
    /// Canonical execution order.
    pub const ALL: [StepName; 3] = [StepName::Planner, StepName::Executor, StepName::Verifier];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planner => "planner",
            Self::Executor => "executor",
            Self::Verifier => "verifier",
        }
    }

    /// Title-cased label used in prompt section headers.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Planner => "Planner",
            Self::Executor => "Executor",
            Self::Verifier => "Verifier",
        }
    }

    /// Fixed instruction block appended at the end of each prompt.
    pub fn instruction(&self) -> &'static str {
        match self {
            Self::Planner => {
                "Create a detailed analysis plan for this task. \
                 Identify the main components involved, list the specific \
                 code to examine, and outline the approach step by step."
            }
            Self::Executor => {
                "Execute the analysis based on the plan above. Document \
                 specific findings with file names and line numbers where \
                 relevant, and provide concrete examples from the code."
            }
            Self::Verifier => {
                "Verify the findings above. Check that each one is \
                 accurate and well-supported, note anything the analysis \
                 missed, and provide a final summary with prioritized \
                 recommendations."
            }
        }
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StepName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "planner" => Ok(Self::Planner),
            "executor" => Ok(Self::Executor),
            "verifier" => Ok(Self::Verifier),
            _ => Err(format!("invalid step name: {s}")),
        }
    }
}
