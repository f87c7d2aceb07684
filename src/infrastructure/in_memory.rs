use crate::domain::message::QueueMessage;
use crate::domain::notification::Notification;
use crate::domain::outcome::CallOutcome;
use crate::domain::ports::{
    DeadLetterSink, IdentityGroupClient, MessageQueue, Notifier, RetryLedger, TicketSystem,
    VaultSafeClient,
};
use crate::domain::request::{DeadLetterPayload, GroupAttributes, SafeAttributes};
use crate::domain::retry::RetryRecord;
use crate::domain::status::{Created, GroupState, GroupStatus};
use crate::error::{ProvisionError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::{Mutex, RwLock};

/// Switch that makes an in-memory collaborator fail every call.
#[derive(Default, Clone)]
struct Outage(Arc<AtomicBool>);

impl Outage {
    fn set(&self, unavailable: bool) {
        self.0.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self, service: &'static str) -> Result<()> {
        self.check_with(|| ProvisionError::dependency(service, "service unavailable"))
    }

    fn check_with(&self, error: impl FnOnce() -> ProvisionError) -> Result<()> {
        if self.0.load(Ordering::SeqCst) {
            Err(error())
        } else {
            Ok(())
        }
    }
}

/// A thread-safe in-memory retry ledger.
///
/// Records expire like the durable ledger does: an expired record reads as 0.
#[derive(Default, Clone)]
pub struct InMemoryRetryLedger {
    records: Arc<RwLock<HashMap<String, RetryRecord>>>,
    outage: Outage,
}

impl InMemoryRetryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every ledger call fail, as an unreachable table would.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.outage.set(unavailable);
    }

    /// Stores a record as-is, expiry included.
    pub async fn insert_record(&self, record: RetryRecord) {
        let mut records = self.records.write().await;
        records.insert(record.correlation_id.clone(), record);
    }

    pub async fn record(&self, correlation_id: &str) -> Option<RetryRecord> {
        let records = self.records.read().await;
        records.get(correlation_id).cloned()
    }

    fn check(&self) -> Result<()> {
        self.outage
            .check_with(|| ProvisionError::Ledger("ledger table unreachable".to_string()))
    }
}

#[async_trait]
impl RetryLedger for InMemoryRetryLedger {
    async fn get(&self, correlation_id: &str) -> Result<u32> {
        self.check()?;
        let records = self.records.read().await;
        Ok(records
            .get(correlation_id)
            .filter(|record| !record.is_expired(Utc::now()))
            .map_or(0, |record| record.retry_count))
    }

    async fn set(&self, correlation_id: &str, retry_count: u32) -> Result<()> {
        self.check()?;
        let mut records = self.records.write().await;
        records.insert(
            correlation_id.to_string(),
            RetryRecord::new(correlation_id, retry_count, Utc::now()),
        );
        Ok(())
    }

    async fn delete(&self, correlation_id: &str) -> Result<()> {
        self.check()?;
        let mut records = self.records.write().await;
        records.remove(correlation_id);
        Ok(())
    }
}

/// An in-memory identity-governance directory.
///
/// Unscripted calls behave like a healthy directory: unknown groups report
/// as absent and creation registers the group as created. Scripted outcomes
/// are consumed first, one per call.
#[derive(Default, Clone)]
pub struct InMemoryIdentityDirectory {
    groups: Arc<RwLock<HashMap<String, GroupStatus>>>,
    scripted_status: Arc<Mutex<VecDeque<CallOutcome<GroupStatus>>>>,
    scripted_create: Arc<Mutex<VecDeque<CallOutcome<Created>>>>,
    status_calls: Arc<AtomicUsize>,
    create_calls: Arc<AtomicUsize>,
}

impl InMemoryIdentityDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_group(&self, name: &str, status: GroupStatus) {
        let mut groups = self.groups.write().await;
        groups.insert(name.to_string(), status);
    }

    pub async fn push_status(&self, outcome: CallOutcome<GroupStatus>) {
        self.scripted_status.lock().await.push_back(outcome);
    }

    pub async fn push_create(&self, outcome: CallOutcome<Created>) {
        self.scripted_create.lock().await.push_back(outcome);
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityGroupClient for InMemoryIdentityDirectory {
    async fn check_status(&self, group_name: &str) -> CallOutcome<GroupStatus> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.scripted_status.lock().await.pop_front();
        if let Some(outcome) = scripted {
            return outcome;
        }
        let groups = self.groups.read().await;
        CallOutcome::Success(
            groups
                .get(group_name)
                .cloned()
                .unwrap_or_else(GroupStatus::absent),
        )
    }

    async fn create_group(&self, attributes: &GroupAttributes) -> CallOutcome<Created> {
        let call = self.create_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let scripted = self.scripted_create.lock().await.pop_front();
        if let Some(outcome) = scripted {
            return outcome;
        }
        let mut groups = self.groups.write().await;
        let status = groups
            .entry(attributes.name.clone())
            .and_modify(|status| {
                status.exists = true;
                status.status = GroupState::Created;
            })
            .or_insert_with(|| GroupStatus::created(format!("grp-{call}")));
        CallOutcome::Success(Created {
            id: status.id.clone(),
            message: None,
        })
    }
}

/// An in-memory vault. Creating a safe that already exists returns the
/// existing id, the way an idempotent facade would.
#[derive(Default, Clone)]
pub struct InMemoryVault {
    safes: Arc<RwLock<HashMap<String, String>>>,
    scripted_create: Arc<Mutex<VecDeque<CallOutcome<Created>>>>,
    create_calls: Arc<AtomicUsize>,
}

impl InMemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push_create(&self, outcome: CallOutcome<Created>) {
        self.scripted_create.lock().await.push_back(outcome);
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub async fn safe_id(&self, name: &str) -> Option<String> {
        self.safes.read().await.get(name).cloned()
    }

    pub async fn safe_count(&self) -> usize {
        self.safes.read().await.len()
    }
}

#[async_trait]
impl VaultSafeClient for InMemoryVault {
    async fn create_safe(&self, attributes: &SafeAttributes) -> CallOutcome<Created> {
        let call = self.create_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let scripted = self.scripted_create.lock().await.pop_front();
        if let Some(outcome) = scripted {
            if let CallOutcome::Success(created) = &outcome {
                let id = created.id.clone().unwrap_or_else(|| format!("safe-{call}"));
                self.safes
                    .write()
                    .await
                    .entry(attributes.name.clone())
                    .or_insert(id);
            }
            return outcome;
        }
        let mut safes = self.safes.write().await;
        let id = safes
            .entry(attributes.name.clone())
            .or_insert_with(|| format!("safe-{call}"));
        CallOutcome::Success(Created::with_id(id.clone()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketRecord {
    pub id: String,
    pub correlation_id: String,
    pub reason: String,
}

#[derive(Default, Clone)]
pub struct InMemoryTicketSystem {
    tickets: Arc<RwLock<Vec<TicketRecord>>>,
    outage: Outage,
}

impl InMemoryTicketSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.outage.set(unavailable);
    }

    pub async fn tickets(&self) -> Vec<TicketRecord> {
        self.tickets.read().await.clone()
    }
}

#[async_trait]
impl TicketSystem for InMemoryTicketSystem {
    async fn create(&self, correlation_id: &str, reason: &str) -> Result<String> {
        self.outage.check("ticketing")?;
        let mut tickets = self.tickets.write().await;
        let id = format!("TKT{:07}", tickets.len() + 1);
        tickets.push(TicketRecord {
            id: id.clone(),
            correlation_id: correlation_id.to_string(),
            reason: reason.to_string(),
        });
        Ok(id)
    }
}

#[derive(Default, Clone)]
pub struct RecordingNotifier {
    sent: Arc<RwLock<Vec<Notification>>>,
    outage: Outage,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.outage.set(unavailable);
    }

    pub async fn notifications(&self) -> Vec<Notification> {
        self.sent.read().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<()> {
        self.outage.check("notification")?;
        self.sent.write().await.push(notification.clone());
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryDeadLetterSink {
    payloads: Arc<RwLock<Vec<DeadLetterPayload>>>,
    outage: Outage,
}

impl InMemoryDeadLetterSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.outage.set(unavailable);
    }

    pub async fn payloads(&self) -> Vec<DeadLetterPayload> {
        self.payloads.read().await.clone()
    }
}

#[async_trait]
impl DeadLetterSink for InMemoryDeadLetterSink {
    async fn send(&self, payload: &DeadLetterPayload) -> Result<()> {
        self.outage.check("dead-letter")?;
        self.payloads.write().await.push(payload.clone());
        Ok(())
    }
}

/// An in-memory queue that tracks which deliveries were acknowledged.
///
/// Messages that were never deleted stay `pending`, which is what a real
/// queue would hand out again after the visibility timeout.
#[derive(Default, Clone)]
pub struct InMemoryQueue {
    messages: Arc<RwLock<Vec<QueueMessage>>>,
    deleted: Arc<RwLock<Vec<String>>>,
    outage: Outage,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_messages(messages: Vec<QueueMessage>) -> Self {
        Self {
            messages: Arc::new(RwLock::new(messages)),
            ..Self::default()
        }
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.outage.set(unavailable);
    }

    pub async fn enqueue(&self, message: QueueMessage) {
        self.messages.write().await.push(message);
    }

    /// Messages still eligible for redelivery.
    pub async fn pending(&self) -> Vec<QueueMessage> {
        let deleted = self.deleted.read().await;
        let messages = self.messages.read().await;
        messages
            .iter()
            .filter(|m| !deleted.contains(&m.receipt_handle))
            .cloned()
            .collect()
    }

    pub async fn deleted(&self) -> Vec<String> {
        self.deleted.read().await.clone()
    }

    pub async fn is_deleted(&self, receipt_handle: &str) -> bool {
        self.deleted
            .read()
            .await
            .iter()
            .any(|handle| handle == receipt_handle)
    }
}

#[async_trait]
impl MessageQueue for InMemoryQueue {
    async fn delete_message(&self, receipt_handle: &str) -> Result<()> {
        self.outage.check("queue")?;
        let mut deleted = self.deleted.write().await;
        if !deleted.iter().any(|handle| handle == receipt_handle) {
            deleted.push(receipt_handle.to_string());
        }
        Ok(())
    }
}
