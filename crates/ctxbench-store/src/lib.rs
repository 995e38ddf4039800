//! ctxbench-store: deterministic, content-addressed retrieval over a
//! fixed content root.

pub mod repo;

pub use repo::RepoStore;
