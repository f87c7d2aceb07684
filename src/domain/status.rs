use super::outcome::CallOutcome;
use serde::{Deserialize, Serialize};

/// Lifecycle state reported by the identity-governance system for a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GroupState {
    Created,
    Pending,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupStatus {
    pub exists: bool,
    pub status: GroupState,
    #[serde(rename = "groupId", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl GroupStatus {
    /// Status reported for a group the directory has never heard of.
    pub fn absent() -> Self {
        Self {
            exists: false,
            status: GroupState::Pending,
            id: None,
        }
    }

    pub fn created(id: impl Into<String>) -> Self {
        Self {
            exists: true,
            status: GroupState::Created,
            id: Some(id.into()),
        }
    }

    /// A missing or still pending group gets a creation attempt.
    pub fn needs_creation(&self) -> bool {
        !self.exists || self.status == GroupState::Pending
    }

    /// Whether the group was usable when queried, so the safe can follow.
    pub fn is_present(&self) -> bool {
        self.exists || self.status == GroupState::Created
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CreationState {
    Success,
    Failed,
    Pending,
}

/// Response body of a group or safe creation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreationResponse {
    pub status: CreationState,
    #[serde(
        default,
        alias = "groupId",
        alias = "safeId",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A creation the downstream accepted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Created {
    pub id: Option<String>,
    pub message: Option<String>,
}

impl Created {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            message: None,
        }
    }
}

impl CreationResponse {
    /// Only an explicit `FAILED` is a business failure; `PENDING` means the
    /// downstream accepted the request.
    pub fn into_outcome(self, what: &str) -> CallOutcome<Created> {
        match self.status {
            CreationState::Failed => CallOutcome::BusinessFailure(
                self.message
                    .unwrap_or_else(|| format!("{what} creation failed")),
            ),
            CreationState::Success | CreationState::Pending => CallOutcome::Success(Created {
                id: self.id,
                message: self.message,
            }),
        }
    }
}
