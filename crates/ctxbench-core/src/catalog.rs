//! Task catalog: ordered task prompts, each with an ordered list of
//! retrieval queries. Static input, loaded once per run.

use serde::{Deserialize, Serialize};

use crate::error::{CtxError, CtxResult};

/// One task: a natural-language prompt plus the queries retrieved for
/// every step of that task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSpec {
    pub prompt: String,
    pub queries: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub tasks: Vec<TaskSpec>,
}

impl Catalog {
    pub fn new(tasks: Vec<TaskSpec>) -> Self {
        Self { tasks }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Task by 1-based index, cycling past the end so a run can ask
    /// for more tasks than the catalog defines.
    pub fn task(&self, task_idx: usize) -> CtxResult<&TaskSpec> {
        if self.tasks.is_empty() {
            return Err(CtxError::Catalog("catalog has no tasks".into()));
        }
        let idx = (task_idx.saturating_sub(1)) % self.tasks.len();
        Ok(&self.tasks[idx])
    }

    /// Parse a catalog from its JSON representation:
    /// `{"tasks": [{"prompt": "...", "queries": ["...", ...]}, ...]}`.
    pub fn from_json_str(json: &str) -> CtxResult<Self> {
        let catalog: Catalog = serde_json::from_str(json)?;
        if catalog.tasks.is_empty() {
            return Err(CtxError::Catalog("catalog file defines no tasks".into()));
        }
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_task_catalog() -> Catalog {
        Catalog::new(vec![
            TaskSpec {
                prompt: "first".into(),
                queries: vec!["file:a.rs".into()],
            },
            TaskSpec {
                prompt: "second".into(),
                queries: vec!["file:b.rs".into()],
            },
        ])
    }

    #[test]
    fn test_task_is_one_based_and_cycles() {
        let catalog = two_task_catalog();
        assert_eq!(catalog.task(1).unwrap().prompt, "first");
        assert_eq!(catalog.task(2).unwrap().prompt, "second");
        assert_eq!(catalog.task(3).unwrap().prompt, "first");
    }

    #[test]
    fn test_empty_catalog_errors() {
        let catalog = Catalog::new(Vec::new());
        assert!(catalog.task(1).is_err());
    }

    #[test]
    fn test_from_json_str() {
        let json = r#"{"tasks": [{"prompt": "analyze routing",
                      "queries": ["file:routing.rs", "function-lookup:route_ticket"]}]}"#;
        let catalog = Catalog::from_json_str(json).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.task(1).unwrap().queries.len(), 2);
    }

    #[test]
    fn test_from_json_rejects_empty() {
        assert!(Catalog::from_json_str(r#"{"tasks": []}"#).is_err());
    }
}
