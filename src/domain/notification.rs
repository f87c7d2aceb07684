use super::request::ProvisioningRequest;
use serde::Serialize;

/// Human-facing notification sent on terminal outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub subject: String,
    pub body: String,
}

impl Notification {
    pub fn provisioned(request: &ProvisioningRequest) -> Self {
        Self {
            subject: format!("Safe Creation Succeeded: {}", request.correlation_id),
            body: format!(
                "Group {} and safe {} created.",
                request.group_attributes.name, request.safe_attributes.name
            ),
        }
    }

    pub fn escalated(request: &ProvisioningRequest, reason: &str, ticket_id: &str) -> Self {
        Self {
            subject: format!("Safe Creation Failed: {}", request.correlation_id),
            body: format!(
                "Provisioning of group {} and safe {} failed: {}. Ticket: {}",
                request.group_attributes.name, request.safe_attributes.name, reason, ticket_id
            ),
        }
    }
}
