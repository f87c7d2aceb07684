use crate::application::report::{BatchReport, Disposition};
use crate::domain::outcome::Outcome;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct ReportRow<'a> {
    message_id: &'a str,
    correlation_id: &'a str,
    outcome: &'static str,
    detail: String,
}

/// Writes one CSV row per message of a dispatched batch.
pub struct ReportWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(destination: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(destination),
        }
    }

    pub fn write_report(&mut self, report: &BatchReport) -> Result<()> {
        for entry in &report.entries {
            self.writer.serialize(ReportRow {
                message_id: &entry.message_id,
                correlation_id: entry.correlation_id.as_deref().unwrap_or(""),
                outcome: entry.disposition.label(),
                detail: detail(&entry.disposition),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

fn detail(disposition: &Disposition) -> String {
    match disposition {
        Disposition::Processed(Outcome::Success { safe_id }) => {
            safe_id.clone().unwrap_or_default()
        }
        Disposition::Processed(Outcome::RetryScheduled { retry_count }) => {
            format!("retry {retry_count}")
        }
        Disposition::Processed(Outcome::Escalated(record)) => {
            format!("{}: {}", record.ticket_id, record.reason)
        }
        Disposition::Processed(Outcome::Skipped(reason))
        | Disposition::Failed(reason)
        | Disposition::EscalationIncomplete(reason) => reason.clone(),
    }
}
