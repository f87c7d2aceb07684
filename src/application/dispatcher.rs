use crate::application::engine::ProvisioningEngine;
use crate::application::report::{BatchReport, Disposition, MessageReport};
use crate::domain::message::QueueMessage;
use crate::domain::outcome::Outcome;
use crate::domain::request::ProvisioningRequest;
use crate::error::Result;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Feeds a queue batch through the workflow engine.
///
/// Every message gets exactly one workflow pass and its own entry in the
/// returned report; no failure in one message stops the rest of the batch.
/// Retries are never attempted here: an unacknowledged message comes back
/// through the queue after its visibility timeout.
pub struct RequestDispatcher {
    engine: Arc<ProvisioningEngine>,
    lanes: usize,
}

impl RequestDispatcher {
    pub fn new(engine: ProvisioningEngine) -> Self {
        Self {
            engine: Arc::new(engine),
            lanes: 1,
        }
    }

    /// Splits each batch into `lanes` partitions keyed by correlation id.
    ///
    /// Partitions run concurrently, messages inside one run in batch order,
    /// so two copies of the same request never race on the ledger.
    pub fn with_lanes(mut self, lanes: usize) -> Self {
        self.lanes = lanes.max(1);
        self
    }

    pub async fn dispatch(&self, batch: &[QueueMessage]) -> BatchReport {
        info!(messages = batch.len(), lanes = self.lanes, "dispatching batch");

        let report = if self.lanes == 1 {
            self.dispatch_sequential(batch).await
        } else {
            self.dispatch_partitioned(batch).await
        };

        info!(
            succeeded = report.succeeded(),
            retried = report.retried(),
            escalated = report.escalated(),
            skipped = report.skipped(),
            failed = report.failed(),
            escalation_failures = report.escalation_failures(),
            "batch complete"
        );
        report
    }

    async fn dispatch_sequential(&self, batch: &[QueueMessage]) -> BatchReport {
        let mut report = BatchReport::default();
        for message in batch {
            let parsed = ProvisioningRequest::from_json(&message.body);
            report.push(isolated(&self.engine, message.clone(), parsed).await);
        }
        report
    }

    async fn dispatch_partitioned(&self, batch: &[QueueMessage]) -> BatchReport {
        let mut lanes: Vec<Vec<(usize, QueueMessage, Result<ProvisioningRequest>)>> =
            (0..self.lanes).map(|_| Vec::new()).collect();

        for (index, message) in batch.iter().enumerate() {
            let parsed = ProvisioningRequest::from_json(&message.body);
            let lane = match &parsed {
                Ok(request) => lane_for(&request.correlation_id, self.lanes),
                Err(_) => 0,
            };
            lanes[lane].push((index, message.clone(), parsed));
        }

        let mut tasks = JoinSet::new();
        for lane in lanes.into_iter().filter(|lane| !lane.is_empty()) {
            let engine = Arc::clone(&self.engine);
            tasks.spawn(async move {
                let mut entries = Vec::with_capacity(lane.len());
                for (index, message, parsed) in lane {
                    entries.push((index, isolated(&engine, message, parsed).await));
                }
                entries
            });
        }

        let mut entries = Vec::with_capacity(batch.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(lane) => entries.extend(lane),
                Err(e) => error!(error = %e, "dispatch lane aborted"),
            }
        }
        entries.sort_by_key(|(index, _)| *index);
        entries.into_iter().map(|(_, entry)| entry).collect()
    }
}

/// Runs one message on its own task so a panic costs only that message.
async fn isolated(
    engine: &Arc<ProvisioningEngine>,
    message: QueueMessage,
    parsed: Result<ProvisioningRequest>,
) -> MessageReport {
    let correlation_id = parsed
        .as_ref()
        .ok()
        .map(|request| request.correlation_id.clone());
    let engine = Arc::clone(engine);
    let task_message = message.clone();
    let task = tokio::spawn(async move { handle_message(&engine, &task_message, parsed).await });

    match task.await {
        Ok(entry) => entry,
        Err(e) => {
            error!(
                message_id = %message.message_id,
                correlation_id = ?correlation_id,
                error = %e,
                "message processing panicked; left for redelivery"
            );
            MessageReport::new(
                &message,
                correlation_id,
                Disposition::Failed(format!("panicked: {e}")),
            )
        }
    }
}

fn lane_for(correlation_id: &str, lanes: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    correlation_id.hash(&mut hasher);
    (hasher.finish() % lanes as u64) as usize
}

async fn handle_message(
    engine: &ProvisioningEngine,
    message: &QueueMessage,
    parsed: Result<ProvisioningRequest>,
) -> MessageReport {
    let request = match parsed {
        Ok(request) => request,
        Err(e) => {
            warn!(message_id = %message.message_id, error = %e, "skipping malformed message");
            return MessageReport::new(
                message,
                None,
                Disposition::Processed(Outcome::Skipped(e.to_string())),
            );
        }
    };

    let disposition = match engine.process(&request, &message.receipt_handle).await {
        Ok(outcome) => Disposition::Processed(outcome),
        Err(e) if e.is_escalation_failure() => {
            error!(
                critical = true,
                message_id = %message.message_id,
                correlation_id = %request.correlation_id,
                error = %e,
                "escalation incomplete; message left on the queue"
            );
            Disposition::EscalationIncomplete(e.to_string())
        }
        Err(e) => {
            error!(
                message_id = %message.message_id,
                correlation_id = %request.correlation_id,
                error = %e,
                "message processing failed; left for redelivery"
            );
            Disposition::Failed(e.to_string())
        }
    };

    MessageReport::new(message, Some(request.correlation_id), disposition)
}
