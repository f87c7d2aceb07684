use super::notification::Notification;
use super::outcome::CallOutcome;
use super::request::{DeadLetterPayload, GroupAttributes, SafeAttributes};
use super::status::{Created, GroupStatus};
use crate::error::Result;
use async_trait::async_trait;

/// Durable per-correlation-id retry counter.
///
/// Reads and writes are independent; there is no atomic increment.
#[async_trait]
pub trait RetryLedger: Send + Sync {
    /// Current count, 0 when no live record exists.
    async fn get(&self, correlation_id: &str) -> Result<u32>;
    async fn set(&self, correlation_id: &str, retry_count: u32) -> Result<()>;
    async fn delete(&self, correlation_id: &str) -> Result<()>;
}

#[async_trait]
pub trait IdentityGroupClient: Send + Sync {
    async fn check_status(&self, group_name: &str) -> CallOutcome<GroupStatus>;
    async fn create_group(&self, attributes: &GroupAttributes) -> CallOutcome<Created>;
}

#[async_trait]
pub trait VaultSafeClient: Send + Sync {
    async fn create_safe(&self, attributes: &SafeAttributes) -> CallOutcome<Created>;
}

#[async_trait]
pub trait TicketSystem: Send + Sync {
    /// Opens a ticket and returns its id.
    async fn create(&self, correlation_id: &str, reason: &str) -> Result<String>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<()>;
}

#[async_trait]
pub trait DeadLetterSink: Send + Sync {
    async fn send(&self, payload: &DeadLetterPayload) -> Result<()>;
}

#[async_trait]
pub trait MessageQueue: Send + Sync {
    async fn delete_message(&self, receipt_handle: &str) -> Result<()>;
}

pub type RetryLedgerBox = Box<dyn RetryLedger>;
pub type IdentityGroupClientBox = Box<dyn IdentityGroupClient>;
pub type VaultSafeClientBox = Box<dyn VaultSafeClient>;
pub type TicketSystemBox = Box<dyn TicketSystem>;
pub type NotifierBox = Box<dyn Notifier>;
pub type DeadLetterSinkBox = Box<dyn DeadLetterSink>;
pub type MessageQueueBox = Box<dyn MessageQueue>;
