use thiserror::Error;

use crate::browser::ActionError;
use crate::sink::SinkError;

#[derive(Debug, Error)]
pub enum ScoutError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("No jobs found in the input file.")]
    NoJobs,

    #[error("Browser action error: {0}")]
    Action(#[from] ActionError),

    #[error("Result sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
