use thiserror::Error;

#[derive(Debug, Error)]
pub enum CtxError {
    #[error("backend failure at task {task}, step {step}: {message}")]
    Backend {
        task: usize,
        step: String,
        message: String,
    },

    #[error("generation failed: {0}")]
    Generation(String),

    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),
}

pub type CtxResult<T> = Result<T, CtxError>;
