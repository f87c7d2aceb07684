use crate::error::{ProvisionError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Attributes of the identity-governance group to provision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupAttributes {
    #[serde(rename = "groupName")]
    pub name: String,
    pub description: String,
    pub owner: String,
}

/// Attributes of the vault safe to provision once the group exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafeAttributes {
    #[serde(rename = "safeName")]
    pub name: String,
    pub description: String,
    #[serde(rename = "managingCPM")]
    pub managing_entity: String,
}

/// A queued provisioning request.
///
/// Immutable once enqueued: every redelivered copy carries the same payload,
/// and `correlation_id` ties the copies to a single retry ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningRequest {
    #[serde(rename = "correlationId")]
    pub correlation_id: String,
    #[serde(rename = "adGroupAttributes")]
    pub group_attributes: GroupAttributes,
    #[serde(rename = "pamSafeAttributes")]
    pub safe_attributes: SafeAttributes,
}

impl ProvisioningRequest {
    /// Parses a queue message body.
    ///
    /// Fails with `MalformedInput` when the JSON does not match the message
    /// schema and with `Validation` when the identifying fields are blank.
    pub fn from_json(body: &str) -> Result<Self> {
        let request: Self = serde_json::from_str(body)?;
        request.validate()?;
        Ok(request)
    }

    fn validate(&self) -> Result<()> {
        if self.correlation_id.trim().is_empty() {
            return Err(ProvisionError::Validation(
                "correlationId must not be empty".to_string(),
            ));
        }
        if self.group_attributes.name.trim().is_empty() {
            return Err(ProvisionError::Validation(
                "groupName must not be empty".to_string(),
            ));
        }
        if self.safe_attributes.name.trim().is_empty() {
            return Err(ProvisionError::Validation(
                "safeName must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Payload emitted to the dead-letter sink: the original request plus the
/// failure reason and when it was given up on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLetterPayload {
    #[serde(flatten)]
    pub request: ProvisioningRequest,
    #[serde(rename = "errorMessage")]
    pub error_message: String,
    #[serde(rename = "failedAt")]
    pub failed_at: DateTime<Utc>,
}

impl DeadLetterPayload {
    pub fn new(request: ProvisioningRequest, error_message: impl Into<String>) -> Self {
        Self {
            request,
            error_message: error_message.into(),
            failed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{
        "correlationId": "123",
        "adGroupAttributes": {"groupName": "grp-finance", "description": "Finance admins", "owner": "jdoe"},
        "pamSafeAttributes": {"safeName": "safe-finance", "description": "Finance creds", "managingCPM": "PasswordManager"}
    }"#;

    #[test]
    fn test_parses_queue_payload() {
        let request = ProvisioningRequest::from_json(BODY).unwrap();

        assert_eq!(request.correlation_id, "123");
        assert_eq!(request.group_attributes.name, "grp-finance");
        assert_eq!(request.group_attributes.owner, "jdoe");
        assert_eq!(request.safe_attributes.name, "safe-finance");
        assert_eq!(request.safe_attributes.managing_entity, "PasswordManager");
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = ProvisioningRequest::from_json("{not json").unwrap_err();
        assert!(matches!(err, ProvisionError::MalformedInput(_)));
    }

    #[test]
    fn test_rejects_missing_section() {
        let err = ProvisioningRequest::from_json(r#"{"correlationId": "1"}"#).unwrap_err();
        assert!(matches!(err, ProvisionError::MalformedInput(_)));
    }

    #[test]
    fn test_rejects_blank_correlation_id() {
        let body = BODY.replace(r#""correlationId": "123""#, r#""correlationId": "  ""#);
        let err = ProvisioningRequest::from_json(&body).unwrap_err();
        assert!(matches!(err, ProvisionError::Validation(_)));
    }

    #[test]
    fn test_dead_letter_payload_keeps_request_fields() {
        let request = ProvisioningRequest::from_json(BODY).unwrap();
        let payload = DeadLetterPayload::new(request, "Safe creation failed");

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["correlationId"], "123");
        assert_eq!(value["adGroupAttributes"]["groupName"], "grp-finance");
        assert_eq!(value["pamSafeAttributes"]["managingCPM"], "PasswordManager");
        assert_eq!(value["errorMessage"], "Safe creation failed");
        let failed_at = value["failedAt"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(failed_at).is_ok());
    }
}
