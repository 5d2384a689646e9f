use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// Identifiers
// =============================================================================

/// Opaque identifier of a chat user, as assigned by the transport.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

/// Stable identifier of a plan (the "plan number" column of the catalog).
///
/// Stored in its stringified form so that numeric cells (`3.0`) and text
/// cells (`"3"`) from different sheets compare equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanId(String);

impl PlanId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Session state
// =============================================================================

/// Where a user's conversation currently stands.
///
/// Each variant carries exactly the data valid in that state, so a session
/// can never hold a pending question without a selected plan.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    /// Waiting for the user to pick a plan title.
    #[default]
    AwaitingPlan,
    /// A plan is selected; waiting for one of its question prompts.
    AwaitingQuestion { plan_id: PlanId },
    /// An identity-requiring question is pending; waiting for a personnel code.
    AwaitingPersonnelCode { plan_id: PlanId, question: String },
}

impl SessionState {
    /// Short label for logs and summaries.
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::AwaitingPlan => "awaiting_plan",
            SessionState::AwaitingQuestion { .. } => "awaiting_question",
            SessionState::AwaitingPersonnelCode { .. } => "awaiting_personnel_code",
        }
    }

    pub fn plan_id(&self) -> Option<&PlanId> {
        match self {
            SessionState::AwaitingPlan => None,
            SessionState::AwaitingQuestion { plan_id }
            | SessionState::AwaitingPersonnelCode { plan_id, .. } => Some(plan_id),
        }
    }

    pub fn pending_question(&self) -> Option<&str> {
        match self {
            SessionState::AwaitingPersonnelCode { question, .. } => Some(question),
            _ => None,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
