use crate::domain::notification::Notification;
use crate::domain::ports::{DeadLetterSinkBox, NotifierBox, TicketSystemBox};
use crate::domain::request::{DeadLetterPayload, ProvisioningRequest};
use crate::error::{ProvisionError, Result};
use std::fmt;
use std::future::Future;
use tracing::{debug, error};

/// Legs of the escalation sequence, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationStep {
    Ticket,
    Notify,
    DeadLetter,
    DeleteMessage,
    ClearLedger,
}

impl fmt::Display for EscalationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ticket => "ticket",
            Self::Notify => "notify",
            Self::DeadLetter => "dead-letter",
            Self::DeleteMessage => "delete-message",
            Self::ClearLedger => "clear-ledger",
        };
        f.write_str(name)
    }
}

/// The human-facing side of the workflow: ticketing, notifications and the
/// dead-letter sink.
pub struct Escalator {
    tickets: TicketSystemBox,
    notifier: NotifierBox,
    dead_letters: DeadLetterSinkBox,
}

impl Escalator {
    pub fn new(
        tickets: TicketSystemBox,
        notifier: NotifierBox,
        dead_letters: DeadLetterSinkBox,
    ) -> Self {
        Self {
            tickets,
            notifier,
            dead_letters,
        }
    }

    pub async fn open_ticket(&self, correlation_id: &str, reason: &str) -> Result<String> {
        self.tickets.create(correlation_id, reason).await
    }

    pub async fn notify(&self, notification: &Notification) -> Result<()> {
        self.notifier.send(notification).await
    }

    pub async fn dead_letter(&self, request: &ProvisioningRequest, reason: &str) -> Result<()> {
        let payload = DeadLetterPayload::new(request.clone(), reason);
        self.dead_letters.send(&payload).await
    }
}

/// Tracks which escalation legs have completed.
///
/// The first failing leg ends the sequence; later legs never run, so a
/// half-escalated message is neither deleted nor cleared from the ledger.
pub(crate) struct EscalationProgress<'a> {
    correlation_id: &'a str,
    completed: Vec<EscalationStep>,
}

impl<'a> EscalationProgress<'a> {
    pub(crate) fn new(correlation_id: &'a str) -> Self {
        Self {
            correlation_id,
            completed: Vec::with_capacity(5),
        }
    }

    pub(crate) async fn run<T, F>(&mut self, step: EscalationStep, action: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match action.await {
            Ok(value) => {
                debug!(correlation_id = self.correlation_id, %step, "escalation step completed");
                self.completed.push(step);
                Ok(value)
            }
            Err(e) => {
                error!(
                    critical = true,
                    correlation_id = self.correlation_id,
                    failed_step = %step,
                    completed = ?self.completed,
                    error = %e,
                    "escalation sequence incomplete"
                );
                Err(ProvisionError::Escalation {
                    correlation_id: self.correlation_id.to_string(),
                    failed_step: step,
                    completed: self.completed.clone(),
                    source: Box::new(e),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_progress_records_completed_steps_until_failure() {
        let mut progress = EscalationProgress::new("123");

        let ticket = progress
            .run(EscalationStep::Ticket, async { Ok("TKT-1".to_string()) })
            .await
            .unwrap();
        assert_eq!(ticket, "TKT-1");

        progress
            .run(EscalationStep::Notify, async { Ok(()) })
            .await
            .unwrap();

        let err = progress
            .run(EscalationStep::DeadLetter, async {
                Err::<(), _>(ProvisionError::dependency("dead-letter", "queue offline"))
            })
            .await
            .unwrap_err();

        match err {
            ProvisionError::Escalation {
                correlation_id,
                failed_step,
                completed,
                ..
            } => {
                assert_eq!(correlation_id, "123");
                assert_eq!(failed_step, EscalationStep::DeadLetter);
                assert_eq!(
                    completed,
                    vec![EscalationStep::Ticket, EscalationStep::Notify]
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    /// Collects formatted log lines for inspection.
    #[derive(Clone, Default)]
    struct CapturedLogs(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[tokio::test]
    async fn test_incomplete_escalation_is_logged_as_critical() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::ERROR)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let mut progress = EscalationProgress::new("123");
        progress
            .run(EscalationStep::Ticket, async { Ok(()) })
            .await
            .unwrap();
        progress
            .run(EscalationStep::Notify, async { Ok(()) })
            .await
            .unwrap();
        let err = progress
            .run(EscalationStep::DeadLetter, async {
                Err::<(), _>(ProvisionError::dependency("dead-letter", "queue offline"))
            })
            .await
            .unwrap_err();

        let output = logs.contents();
        assert!(output.contains("ERROR"));
        assert!(output.contains("escalation sequence incomplete"));
        assert!(output.contains("critical=true"));
        assert!(output.contains("failed_step=dead-letter"));
        assert!(output.contains("completed=[Ticket, Notify]"));

        assert_eq!(
            err.to_string(),
            "Escalation for 123 stopped at dead-letter (completed: [Ticket, Notify]): \
             dead-letter call failed: queue offline"
        );
    }

    #[test]
    fn test_step_names() {
        assert_eq!(EscalationStep::DeleteMessage.to_string(), "delete-message");
        assert_eq!(EscalationStep::ClearLedger.to_string(), "clear-ledger");
    }
}
