//! Per-user conversation session.

use chrono::{DateTime, Local, TimeZone};
use serde::Serialize;

use liga_core::{PlanId, SessionState, UserId};

/// One user's conversation: current state plus bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
    pub state: SessionState,
    /// Epoch seconds of first contact.
    pub started_at: i64,
    /// Epoch seconds of the latest message.
    pub last_message_at: i64,
    pub message_count: u64,
}

impl Session {
    /// A fresh session waiting for a plan.
    pub fn new(user_id: UserId) -> Self {
        let now = Local::now().timestamp();
        Self {
            user_id,
            state: SessionState::AwaitingPlan,
            started_at: now,
            last_message_at: now,
            message_count: 0,
        }
    }

    pub fn selected_plan_id(&self) -> Option<&PlanId> {
        self.state.plan_id()
    }

    pub fn pending_question(&self) -> Option<&str> {
        self.state.pending_question()
    }

    /// Record an incoming message.
    pub fn touch(&mut self) {
        self.last_message_at = Local::now().timestamp();
        self.message_count += 1;
    }

    /// Back to plan selection, keeping identity and counters.
    pub fn reset(&mut self) {
        self.state = SessionState::AwaitingPlan;
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            user_id: self.user_id.clone(),
            state: self.state.name().to_string(),
            plan_id: self.selected_plan_id().cloned(),
            pending_question: self.pending_question().map(str::to_string),
            started_at: format_epoch(self.started_at),
            last_message_at: format_epoch(self.last_message_at),
            message_count: self.message_count,
        }
    }
}

/// Serializable view of a session for inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub user_id: UserId,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<PlanId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_question: Option<String>,
    pub started_at: String,
    pub last_message_at: String,
    pub message_count: u64,
}

/// Format epoch seconds as an RFC 3339 string.
fn format_epoch(epoch: i64) -> String {
    Local
        .timestamp_opt(epoch, 0)
        .single()
        .map(|dt: DateTime<Local>| dt.to_rfc3339())
        .unwrap_or_else(|| epoch.to_string())
}
