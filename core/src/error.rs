use thiserror::Error;

use crate::source::interface::SourceError;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("evidence source error: {0}")]
    Source(#[from] SourceError),

    #[error("report sink error: {0}")]
    Sink(String),

    #[error("determinism violation: {0}")]
    DeterminismViolation(String),

    #[error("invalid run state: {0}")]
    RunState(String),

    #[error("tracing init error: {0}")]
    TracingInit(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("zip error: {0}")]
    Zip(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("time format error: {0}")]
    TimeFormat(#[from] time::error::Format),

    #[error("time parse error: {0}")]
    TimeParse(#[from] time::error::Parse),
}

pub type CoreResult<T> = Result<T, CoreError>;
