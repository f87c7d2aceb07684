use crate::domain::message::QueueMessage;
use crate::domain::outcome::Outcome;

/// What became of one message in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Processed(Outcome),
    /// Processing stopped on an infrastructure error; the message stays on
    /// the queue.
    Failed(String),
    /// An escalation leg failed after the budget was spent.
    EscalationIncomplete(String),
}

impl Disposition {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Processed(outcome) => outcome.label(),
            Self::Failed(_) => "failed",
            Self::EscalationIncomplete(_) => "escalation_incomplete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageReport {
    pub message_id: String,
    pub correlation_id: Option<String>,
    pub disposition: Disposition,
}

impl MessageReport {
    pub fn new(
        message: &QueueMessage,
        correlation_id: Option<String>,
        disposition: Disposition,
    ) -> Self {
        Self {
            message_id: message.message_id.clone(),
            correlation_id,
            disposition,
        }
    }
}

/// Per-message results of one batch, in batch order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub entries: Vec<MessageReport>,
}

impl BatchReport {
    pub fn push(&mut self, entry: MessageReport) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, label: &str) -> usize {
        self.entries
            .iter()
            .filter(|e| e.disposition.label() == label)
            .count()
    }

    pub fn succeeded(&self) -> usize {
        self.count("success")
    }

    pub fn retried(&self) -> usize {
        self.count("retry_scheduled")
    }

    pub fn escalated(&self) -> usize {
        self.count("escalated")
    }

    pub fn skipped(&self) -> usize {
        self.count("skipped")
    }

    pub fn failed(&self) -> usize {
        self.count("failed")
    }

    pub fn escalation_failures(&self) -> usize {
        self.count("escalation_incomplete")
    }
}

impl FromIterator<MessageReport> for BatchReport {
    fn from_iter<I: IntoIterator<Item = MessageReport>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
