//! Session store and message entry point.
//!
//! Sessions for different users advance in parallel; each user's messages
//! are serialized by a per-user lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::{error, info};

use liga_core::{LigaConfig, UserId};
use liga_table::TableSource;

use crate::analyzer::QueryAnalyzer;
use crate::catalog::PlanCatalog;
use crate::machine::SessionStateMachine;
use crate::response::{OutboundMessage, ResponseFormatter};
use crate::session::{Session, SessionSummary};

type SessionSlot = Arc<Mutex<Session>>;

/// Owns every user's session and routes messages through the state machine.
pub struct ChatEngine {
    machine: SessionStateMachine,
    sessions: Mutex<HashMap<UserId, SessionSlot>>,
    timeout: Option<Duration>,
}

impl ChatEngine {
    /// A zero `timeout` disables the per-message deadline.
    pub fn new(machine: SessionStateMachine, timeout: Duration) -> Self {
        Self {
            machine,
            sessions: Mutex::new(HashMap::new()),
            timeout: (!timeout.is_zero()).then_some(timeout),
        }
    }

    /// Wire an engine from loaded configuration.
    pub fn from_config(
        config: &LigaConfig,
        catalog: PlanCatalog,
        source: Arc<dyn TableSource>,
    ) -> Self {
        let machine = SessionStateMachine::new(
            Arc::new(catalog),
            source,
            QueryAnalyzer::new(config.query.clone(), config.schema.clone()),
            ResponseFormatter::new(config.messages.clone()),
            config.session.restart_commands.clone(),
        );
        info!(
            plans = machine.catalog().plans().len(),
            timeout_ms = config.query.timeout_ms,
            "Chat engine ready"
        );
        Self::new(machine, Duration::from_millis(config.query.timeout_ms))
    }

    /// Process one message from `user_id` and return the reply.
    ///
    /// Never fails: every problem is rendered as a reply.
    pub fn handle_message(&self, user_id: &UserId, text: &str) -> OutboundMessage {
        let slot = self.slot(user_id);
        let mut guard = lock_session(&slot, user_id);

        let session = std::mem::replace(&mut *guard, Session::new(user_id.clone()));
        let (session, message) = match self.timeout {
            Some(timeout) => {
                self.machine
                    .advance_with_deadline(session, text, Instant::now() + timeout)
            }
            None => self.machine.advance(session, text),
        };
        *guard = session;
        message
    }

    /// Snapshot of one user's session, if it exists.
    pub fn session(&self, user_id: &UserId) -> Option<SessionSummary> {
        let slot = self.sessions().get(user_id).cloned()?;
        let guard = lock_session(&slot, user_id);
        Some(guard.summary())
    }

    /// Summaries of every session, ordered by user id.
    pub fn list_sessions(&self) -> Vec<SessionSummary> {
        let mut slots: Vec<(UserId, SessionSlot)> = self
            .sessions()
            .iter()
            .map(|(id, slot)| (id.clone(), Arc::clone(slot)))
            .collect();
        slots.sort_by(|a, b| a.0.cmp(&b.0));
        slots
            .iter()
            .map(|(id, slot)| lock_session(slot, id).summary())
            .collect()
    }

    pub fn session_count(&self) -> usize {
        self.sessions().len()
    }

    /// Forget every session.
    pub fn clear_sessions(&self) {
        let mut sessions = self.sessions();
        let count = sessions.len();
        sessions.clear();
        info!(count = count, "Cleared sessions");
    }

    fn slot(&self, user_id: &UserId) -> SessionSlot {
        let mut sessions = self.sessions();
        Arc::clone(
            sessions
                .entry(user_id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(Session::new(user_id.clone())))),
        )
    }

    /// The map lock is only held for lookups, so a poisoned map is still consistent.
    fn sessions(&self) -> MutexGuard<'_, HashMap<UserId, SessionSlot>> {
        self.sessions.lock().unwrap_or_else(|poisoned| {
            error!("Session map lock poisoned, recovering");
            self.sessions.clear_poison();
            poisoned.into_inner()
        })
    }
}

/// Lock a user's session. A poisoned lock means a previous message panicked
/// mid-transition, so the session is reset to plan selection.
fn lock_session<'a>(slot: &'a Mutex<Session>, user_id: &UserId) -> MutexGuard<'a, Session> {
    match slot.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            error!(user = %user_id, "Session lock poisoned, resetting session");
            let mut guard = poisoned.into_inner();
            guard.reset();
            slot.clear_poison();
            guard
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    use liga_core::config::MessagesConfig;
    use liga_core::PlanId;
    use liga_table::{InMemorySource, Table, Value};

    use crate::catalog::{Plan, QuestionPrompt};

    fn engine() -> ChatEngine {
        let table = Table::new(
            "T1",
            vec!["رتبه".to_string(), "نام".to_string(), "نام خانوادگی".to_string()],
            vec![
                vec![Value::from(1_i64), Value::from("Ali"), Value::from("Rezai")],
                vec![Value::from(2_i64), Value::from("Sara"), Value::from("Karimi")],
            ],
        )
        .unwrap();
        let catalog = PlanCatalog::new(
            vec![Plan {
                id: PlanId::new("1"),
                title: "Plan A".to_string(),
                table_name: "T1".to_string(),
            }],
            vec![QuestionPrompt {
                plan_id: PlanId::new("1"),
                text: "رتبه ۱ کیه".to_string(),
            }],
        )
        .unwrap();
        ChatEngine::from_config(
            &LigaConfig::default(),
            catalog,
            Arc::new(InMemorySource::new().with_table(table)),
        )
    }

    #[test]
    fn test_first_message_creates_session() {
        let engine = engine();
        let user = UserId::from("u1");
        assert!(engine.session(&user).is_none());

        let msg = engine.handle_message(&user, "hello");
        assert!(msg.text.starts_with(&MessagesConfig::default().plan_not_found));
        assert_eq!(engine.session_count(), 1);
        let summary = engine.session(&user).unwrap();
        assert_eq!(summary.state, "awaiting_plan");
        assert_eq!(summary.message_count, 1);
    }

    #[test]
    fn test_conversation_keeps_state_between_messages() {
        let engine = engine();
        let user = UserId::from("u1");
        engine.handle_message(&user, "Plan A");
        assert_eq!(engine.session(&user).unwrap().state, "awaiting_question");

        let msg = engine.handle_message(&user, "رتبه ۱ کیه");
        assert!(msg.text.contains("Ali Rezai"));
        assert_eq!(msg.choices, vec!["Plan A"]);
        assert_eq!(engine.session(&user).unwrap().message_count, 2);
    }

    #[test]
    fn test_list_and_clear_sessions() {
        let engine = engine();
        engine.handle_message(&UserId::from("b"), "Plan A");
        engine.handle_message(&UserId::from("a"), "Plan A");

        let users: Vec<String> = engine
            .list_sessions()
            .iter()
            .map(|s| s.user_id.to_string())
            .collect();
        assert_eq!(users, vec!["a", "b"]);

        engine.clear_sessions();
        assert_eq!(engine.session_count(), 0);
        assert!(engine.list_sessions().is_empty());
    }

    #[test]
    fn test_zero_timeout_disables_deadline() {
        let mut config = LigaConfig::default();
        config.query.timeout_ms = 0;
        let engine = ChatEngine::from_config(
            &config,
            PlanCatalog::new(
                vec![Plan {
                    id: PlanId::new("1"),
                    title: "Plan A".to_string(),
                    table_name: "T1".to_string(),
                }],
                vec![],
            )
            .unwrap(),
            Arc::new(InMemorySource::new()),
        );
        assert!(engine.timeout.is_none());
    }

    #[test]
    fn test_poisoned_session_is_reset() {
        let engine = engine();
        let user = UserId::from("u1");
        engine.handle_message(&user, "Plan A");

        let slot = engine.slot(&user);
        let handle = {
            let slot = Arc::clone(&slot);
            thread::spawn(move || {
                let _guard = slot.lock().unwrap();
                panic!("boom");
            })
        };
        assert!(handle.join().is_err());
        assert!(slot.is_poisoned());

        let summary = engine.session(&user).unwrap();
        assert_eq!(summary.state, "awaiting_plan");
        assert!(!slot.is_poisoned());

        let msg = engine.handle_message(&user, "Plan A");
        assert_eq!(msg.choices, vec!["رتبه ۱ کیه"]);
    }

    #[test]
    fn test_concurrent_users() {
        let engine = Arc::new(engine());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let engine = Arc::clone(&engine);
                thread::spawn(move || {
                    let user = UserId::from(format!("user-{}", i));
                    engine.handle_message(&user, "Plan A");
                    engine.handle_message(&user, "رتبه ۱ کیه")
                })
            })
            .collect();

        for handle in handles {
            let msg = handle.join().unwrap();
            assert!(msg.text.contains("Ali Rezai"));
        }
        assert_eq!(engine.session_count(), 8);
    }
}
