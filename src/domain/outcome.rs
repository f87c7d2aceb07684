use crate::error::ProvisionError;

/// Result of a single identity or vault call.
///
/// The workflow's retry accounting keys off this discriminant: business
/// failures are well-formed refusals from the downstream, transient failures
/// are everything that went wrong on the way there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome<T> {
    Success(T),
    BusinessFailure(String),
    TransientFailure(String),
}

impl<T> CallOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Folds a transport-level error into a transient failure.
    pub fn from_result(result: Result<Self, ProvisionError>) -> Self {
        result.unwrap_or_else(|e| Self::TransientFailure(e.to_string()))
    }
}

/// Terminal-failure bookkeeping for a request that was handed to a human.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscalationRecord {
    pub correlation_id: String,
    pub reason: String,
    pub ticket_id: String,
}

/// What one workflow pass did with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Group and safe exist; message deleted and ledger cleared.
    Success { safe_id: Option<String> },
    /// Ledger incremented; the message stays on the queue for redelivery.
    RetryScheduled { retry_count: u32 },
    /// Ticket, notification and dead letter emitted; message deleted and
    /// ledger cleared.
    Escalated(EscalationRecord),
    /// Input could not be used; neither the ledger nor the queue was touched.
    Skipped(String),
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::RetryScheduled { .. } => "retry_scheduled",
            Self::Escalated(_) => "escalated",
            Self::Skipped(_) => "skipped",
        }
    }
}
