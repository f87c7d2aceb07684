#![allow(dead_code)]

use access_provisioner::application::dispatcher::RequestDispatcher;
use access_provisioner::application::engine::ProvisioningEngine;
use access_provisioner::application::escalation::Escalator;
use access_provisioner::domain::message::QueueMessage;
use access_provisioner::domain::request::ProvisioningRequest;
use access_provisioner::domain::retry::RetryPolicy;
use access_provisioner::infrastructure::in_memory::{
    InMemoryDeadLetterSink, InMemoryIdentityDirectory, InMemoryQueue, InMemoryRetryLedger,
    InMemoryTicketSystem, InMemoryVault, RecordingNotifier,
};

/// In-memory collaborators plus handles to inspect them after a run.
#[derive(Clone, Default)]
pub struct World {
    pub identity: InMemoryIdentityDirectory,
    pub vault: InMemoryVault,
    pub ledger: InMemoryRetryLedger,
    pub tickets: InMemoryTicketSystem,
    pub notifier: RecordingNotifier,
    pub dead_letters: InMemoryDeadLetterSink,
    pub queue: InMemoryQueue,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn engine(&self, max_retries: u32) -> ProvisioningEngine {
        ProvisioningEngine::new(
            Box::new(self.identity.clone()),
            Box::new(self.vault.clone()),
            Box::new(self.ledger.clone()),
            Escalator::new(
                Box::new(self.tickets.clone()),
                Box::new(self.notifier.clone()),
                Box::new(self.dead_letters.clone()),
            ),
            Box::new(self.queue.clone()),
            RetryPolicy::new(max_retries),
        )
    }

    pub fn dispatcher(&self, max_retries: u32) -> RequestDispatcher {
        RequestDispatcher::new(self.engine(max_retries))
    }

    /// Redelivers whatever the queue still holds, as a visibility timeout would.
    pub async fn redeliver(&self, dispatcher: &RequestDispatcher) -> usize {
        let pending = self.queue.pending().await;
        let count = pending.len();
        dispatcher.dispatch(&pending).await;
        count
    }
}

pub fn request_body(correlation_id: &str, group: &str, safe: &str) -> String {
    serde_json::json!({
        "correlationId": correlation_id,
        "adGroupAttributes": {"groupName": group, "description": "Access group", "owner": "owner@example.com"},
        "pamSafeAttributes": {"safeName": safe, "description": "Credential safe", "managingCPM": "PasswordManager"}
    })
    .to_string()
}

pub fn message(index: usize, correlation_id: &str) -> QueueMessage {
    QueueMessage::new(
        format!("msg-{index}"),
        format!("receipt-{index}"),
        request_body(correlation_id, "grp-apps", &format!("safe-{correlation_id}")),
    )
}

pub fn request(correlation_id: &str) -> ProvisioningRequest {
    ProvisioningRequest::from_json(&request_body(correlation_id, "grp-apps", "safe-apps"))
        .expect("valid request body")
}
