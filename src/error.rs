use crate::application::escalation::EscalationStep;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("Malformed input: {0}")]
    MalformedInput(#[from] serde_json::Error),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Retry ledger unavailable: {0}")]
    Ledger(String),
    #[error("{service} call failed: {message}")]
    Dependency {
        service: &'static str,
        message: String,
    },
    #[error(
        "Escalation for {correlation_id} stopped at {failed_step} (completed: {completed:?}): {source}"
    )]
    Escalation {
        correlation_id: String,
        failed_step: EscalationStep,
        completed: Vec<EscalationStep>,
        source: Box<ProvisionError>,
    },
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

impl ProvisionError {
    pub fn dependency(service: &'static str, message: impl Into<String>) -> Self {
        Self::Dependency {
            service,
            message: message.into(),
        }
    }

    /// True for failures that leave a request half-escalated.
    pub fn is_escalation_failure(&self) -> bool {
        matches!(self, Self::Escalation { .. })
    }
}

pub type Result<T> = std::result::Result<T, ProvisionError>;
