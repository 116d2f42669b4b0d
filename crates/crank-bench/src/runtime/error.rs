use crank_core::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BenchError {
    #[error("invalid estimator configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("trace output failed: {0}")]
    Trace(#[from] std::io::Error),
    #[error("poll thread panicked")]
    PollThread,
}
