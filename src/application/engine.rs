use crate::application::escalation::{EscalationProgress, EscalationStep, Escalator};
use crate::domain::notification::Notification;
use crate::domain::outcome::{CallOutcome, EscalationRecord, Outcome};
use crate::domain::ports::{
    IdentityGroupClientBox, MessageQueueBox, RetryLedgerBox, VaultSafeClientBox,
};
use crate::domain::request::ProvisioningRequest;
use crate::domain::retry::RetryPolicy;
use crate::error::Result;
use tracing::{Instrument, debug, info, info_span, warn};

/// Reason recorded when a request arrives with its budget already spent.
pub const BUDGET_EXHAUSTED_REASON: &str = "retry budget exhausted";

/// How a pass over the downstream systems ended, before retry accounting.
enum Pass {
    Completed { safe_id: Option<String> },
    /// Counts against the budget; escalation waits for the next delivery's
    /// budget check.
    Deferred { reason: String },
    /// Counts against the budget and escalates as soon as it is spent.
    Failed { reason: String },
}

/// Drives one provisioning request through group lookup, group creation and
/// safe creation.
///
/// The engine keeps no state between passes. Each call recomputes where the
/// request stands from the retry ledger and the downstream systems, so the
/// same message can be delivered any number of times.
pub struct ProvisioningEngine {
    identity: IdentityGroupClientBox,
    vault: VaultSafeClientBox,
    ledger: RetryLedgerBox,
    escalator: Escalator,
    queue: MessageQueueBox,
    policy: RetryPolicy,
}

impl ProvisioningEngine {
    /// Creates a new `ProvisioningEngine` instance.
    ///
    /// # Arguments
    ///
    /// * `identity` - Queries and creates identity-governance groups.
    /// * `vault` - Creates vault safes.
    /// * `ledger` - Per-correlation-id retry counters.
    /// * `escalator` - Ticketing, notifications and dead-lettering.
    /// * `queue` - Acknowledges (deletes) processed messages.
    /// * `policy` - The retry budget.
    pub fn new(
        identity: IdentityGroupClientBox,
        vault: VaultSafeClientBox,
        ledger: RetryLedgerBox,
        escalator: Escalator,
        queue: MessageQueueBox,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            identity,
            vault,
            ledger,
            escalator,
            queue,
            policy,
        }
    }

    /// Runs one workflow pass for a delivered request.
    ///
    /// Downstream failures never surface as errors; they become a scheduled
    /// retry or an escalation. An `Err` means the ledger was unreachable or an
    /// escalation could not be completed, and in both cases the message is
    /// left on the queue.
    pub async fn process(
        &self,
        request: &ProvisioningRequest,
        receipt_handle: &str,
    ) -> Result<Outcome> {
        let span = info_span!("provision", correlation_id = %request.correlation_id);
        self.process_inner(request, receipt_handle)
            .instrument(span)
            .await
    }

    async fn process_inner(
        &self,
        request: &ProvisioningRequest,
        receipt_handle: &str,
    ) -> Result<Outcome> {
        let retry_count = self.ledger.get(&request.correlation_id).await?;
        debug!(retry_count, "processing provisioning request");

        // Checked before any remote call so exhausted requests cost no
        // downstream traffic.
        if self.policy.is_exhausted(retry_count) {
            warn!(
                retry_count,
                max_retries = self.policy.max_retries(),
                "retry budget exhausted"
            );
            return self
                .escalate(request, receipt_handle, BUDGET_EXHAUSTED_REASON)
                .await;
        }

        match self.run_pass(request, receipt_handle).await? {
            Pass::Completed { safe_id } => {
                info!(safe_id = ?safe_id, "provisioning completed");
                Ok(Outcome::Success { safe_id })
            }
            Pass::Deferred { reason } => {
                let next = self.record_attempt(request, retry_count).await?;
                info!(retry_count = next, %reason, "left for redelivery");
                Ok(Outcome::RetryScheduled { retry_count: next })
            }
            Pass::Failed { reason } => {
                let next = self.record_attempt(request, retry_count).await?;
                if self.policy.is_exhausted(next) {
                    warn!(retry_count = next, %reason, "retry budget spent, escalating");
                    self.escalate(request, receipt_handle, &reason).await
                } else {
                    info!(retry_count = next, %reason, "left for redelivery");
                    Ok(Outcome::RetryScheduled { retry_count: next })
                }
            }
        }
    }

    /// Bumps the ledger from the count read at entry.
    async fn record_attempt(&self, request: &ProvisioningRequest, last_known: u32) -> Result<u32> {
        let next = last_known.saturating_add(1);
        self.ledger.set(&request.correlation_id, next).await?;
        Ok(next)
    }

    async fn run_pass(
        &self,
        request: &ProvisioningRequest,
        receipt_handle: &str,
    ) -> Result<Pass> {
        let group = &request.group_attributes;

        let status = match self.identity.check_status(&group.name).await {
            CallOutcome::Success(status) => status,
            CallOutcome::BusinessFailure(reason) => return Ok(Pass::Deferred { reason }),
            CallOutcome::TransientFailure(reason) => return Ok(Pass::Failed { reason }),
        };
        debug!(group = %group.name, ?status, "group status");

        if status.needs_creation() {
            match self.identity.create_group(group).await {
                CallOutcome::Success(created) => {
                    info!(group = %group.name, group_id = ?created.id, "group creation accepted");
                }
                CallOutcome::BusinessFailure(reason) => {
                    warn!(group = %group.name, %reason, "group creation failed");
                    return Ok(Pass::Deferred { reason });
                }
                CallOutcome::TransientFailure(reason) => return Ok(Pass::Failed { reason }),
            }
        }

        // A group that was absent at entry gets its safe on a later pass.
        if !status.is_present() {
            return Ok(Pass::Deferred {
                reason: format!("group {} is not yet available", group.name),
            });
        }

        let safe = &request.safe_attributes;
        match self.vault.create_safe(safe).await {
            CallOutcome::Success(created) => self.complete(request, receipt_handle, created.id).await,
            CallOutcome::BusinessFailure(reason) | CallOutcome::TransientFailure(reason) => {
                warn!(safe = %safe.name, %reason, "safe creation failed");
                Ok(Pass::Failed { reason })
            }
        }
    }

    async fn complete(
        &self,
        request: &ProvisioningRequest,
        receipt_handle: &str,
        safe_id: Option<String>,
    ) -> Result<Pass> {
        let notification = Notification::provisioned(request);
        if let Err(e) = self.escalator.notify(&notification).await {
            return Ok(Pass::Failed {
                reason: e.to_string(),
            });
        }
        if let Err(e) = self.queue.delete_message(receipt_handle).await {
            return Ok(Pass::Failed {
                reason: e.to_string(),
            });
        }
        // The message is acknowledged at this point; a stale record expires
        // with its TTL.
        if let Err(e) = self.ledger.delete(&request.correlation_id).await {
            warn!(error = %e, "could not clear retry ledger after success");
        }
        Ok(Pass::Completed { safe_id })
    }

    /// Ticket, notify, dead-letter, delete, clear; strictly in that order.
    async fn escalate(
        &self,
        request: &ProvisioningRequest,
        receipt_handle: &str,
        reason: &str,
    ) -> Result<Outcome> {
        let correlation_id = request.correlation_id.as_str();
        let mut progress = EscalationProgress::new(correlation_id);

        let ticket_id = progress
            .run(
                EscalationStep::Ticket,
                self.escalator.open_ticket(correlation_id, reason),
            )
            .await?;
        let notification = Notification::escalated(request, reason, &ticket_id);
        progress
            .run(EscalationStep::Notify, self.escalator.notify(&notification))
            .await?;
        progress
            .run(
                EscalationStep::DeadLetter,
                self.escalator.dead_letter(request, reason),
            )
            .await?;
        progress
            .run(
                EscalationStep::DeleteMessage,
                self.queue.delete_message(receipt_handle),
            )
            .await?;
        progress
            .run(
                EscalationStep::ClearLedger,
                self.ledger.delete(correlation_id),
            )
            .await?;

        warn!(%ticket_id, %reason, "request escalated");
        Ok(Outcome::Escalated(EscalationRecord {
            correlation_id: correlation_id.to_string(),
            reason: reason.to_string(),
            ticket_id,
        }))
    }
}
