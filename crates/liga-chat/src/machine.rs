//! Per-user conversation state machine.
//!
//! Every (state, text) pair has exactly one transition. Failures while
//! answering never escape: they become a [`Reply::Failed`] and the session
//! goes back to plan selection.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use liga_core::config::SessionConfig;
use liga_core::text;
use liga_core::{PlanId, SessionState};
use liga_table::{load_before, Table, TableSource};

use crate::analyzer::{QueryAnalyzer, QueryKind, QueryOutcome};
use crate::catalog::{Plan, PlanCatalog};
use crate::error::ChatError;
use crate::response::{ChoiceSet, OutboundMessage, Outcome, Reply, ResponseFormatter};
use crate::session::Session;

/// Drives one session forward per incoming message.
///
/// Holds only shared, immutable parts; sessions are passed in and handed
/// back, so one machine serves every user.
pub struct SessionStateMachine {
    catalog: Arc<PlanCatalog>,
    source: Arc<dyn TableSource>,
    analyzer: QueryAnalyzer,
    formatter: ResponseFormatter,
    restart_commands: Vec<String>,
}

impl SessionStateMachine {
    pub fn new(
        catalog: Arc<PlanCatalog>,
        source: Arc<dyn TableSource>,
        analyzer: QueryAnalyzer,
        formatter: ResponseFormatter,
        restart_commands: Vec<String>,
    ) -> Self {
        let mut restart_commands: Vec<String> = restart_commands
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        // The personnel-code prompt must always offer a way out
        if restart_commands.is_empty() {
            restart_commands = SessionConfig::default().restart_commands;
            warn!(commands = ?restart_commands, "No restart commands configured, using defaults");
        }
        Self {
            catalog,
            source,
            analyzer,
            formatter,
            restart_commands,
        }
    }

    pub fn catalog(&self) -> &PlanCatalog {
        &self.catalog
    }

    /// Advance `session` by one message.
    pub fn advance(&self, session: Session, text: &str) -> (Session, OutboundMessage) {
        self.step(session, text, None)
    }

    /// Like [`advance`](Self::advance), but table lookups that run past
    /// `deadline` fail with a timeout reply.
    pub fn advance_with_deadline(
        &self,
        session: Session,
        text: &str,
        deadline: Instant,
    ) -> (Session, OutboundMessage) {
        self.step(session, text, Some(deadline))
    }

    fn step(
        &self,
        mut session: Session,
        text: &str,
        deadline: Option<Instant>,
    ) -> (Session, OutboundMessage) {
        session.touch();
        let from = session.state.name();
        let (state, outcome) = self.transition(&session.state, text, deadline);
        debug!(
            user = %session.user_id,
            from = from,
            to = state.name(),
            reply = ?outcome.reply,
            "Session advanced"
        );
        session.state = state;
        let message = self.formatter.format(&outcome);
        (session, message)
    }

    fn transition(
        &self,
        state: &SessionState,
        text: &str,
        deadline: Option<Instant>,
    ) -> (SessionState, Outcome) {
        if self.is_restart(text) {
            return (SessionState::AwaitingPlan, self.plans_outcome(Reply::Welcome));
        }

        match state {
            SessionState::AwaitingPlan => self.select_plan(text),
            SessionState::AwaitingQuestion { plan_id } => {
                self.ask_question(plan_id, text, deadline)
            }
            SessionState::AwaitingPersonnelCode { plan_id, question } => {
                self.answer_with_code(plan_id, question, text, deadline)
            }
        }
    }

    // -----------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------

    fn select_plan(&self, text: &str) -> (SessionState, Outcome) {
        let Some(plan) = self.catalog.resolve_plan(text) else {
            return (SessionState::AwaitingPlan, self.plans_outcome(Reply::PlanNotFound));
        };

        let questions = self.question_texts(&plan.id);
        if questions.is_empty() {
            let reply = Reply::NoQuestions {
                title: plan.title.clone(),
            };
            return (SessionState::AwaitingPlan, self.plans_outcome(reply));
        }

        (
            SessionState::AwaitingQuestion {
                plan_id: plan.id.clone(),
            },
            Outcome::new(
                Reply::PlanSelected {
                    title: plan.title.clone(),
                },
                ChoiceSet::Questions(questions),
            ),
        )
    }

    fn ask_question(
        &self,
        plan_id: &PlanId,
        text: &str,
        deadline: Option<Instant>,
    ) -> (SessionState, Outcome) {
        let Some(plan) = self.catalog.plan(plan_id) else {
            return self.stale(plan_id);
        };
        let Some(prompt) = self.catalog.prompt(plan_id, text) else {
            return (SessionState::AwaitingPlan, self.plans_outcome(Reply::Unclassified));
        };

        let kind = self.analyzer.classify(&prompt.text);
        if kind.requires_identity() {
            return (
                SessionState::AwaitingPersonnelCode {
                    plan_id: plan_id.clone(),
                    question: prompt.text.clone(),
                },
                Outcome::new(
                    Reply::AskPersonnelCode,
                    ChoiceSet::Commands(self.restart_commands.clone()),
                ),
            );
        }

        match self.run(plan, kind, &prompt.text, None, deadline) {
            Ok(result) => (
                SessionState::AwaitingPlan,
                self.plans_outcome(Reply::Answered(result)),
            ),
            Err(err) => self.fail(plan, err),
        }
    }

    fn answer_with_code(
        &self,
        plan_id: &PlanId,
        question: &str,
        code: &str,
        deadline: Option<Instant>,
    ) -> (SessionState, Outcome) {
        let Some(plan) = self.catalog.plan(plan_id) else {
            return self.stale(plan_id);
        };

        let kind = self.analyzer.classify(question);
        match self.run(plan, kind, question, Some(code.trim()), deadline) {
            Ok(result) => (
                SessionState::AwaitingQuestion {
                    plan_id: plan_id.clone(),
                },
                Outcome::new(
                    Reply::Answered(result),
                    ChoiceSet::Questions(self.question_texts(plan_id)),
                ),
            ),
            Err(err) => self.fail(plan, err),
        }
    }

    // -----------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------

    fn run(
        &self,
        plan: &Plan,
        kind: QueryKind,
        question: &str,
        identifier: Option<&str>,
        deadline: Option<Instant>,
    ) -> Result<QueryOutcome, ChatError> {
        let table: Arc<Table> = match deadline {
            Some(deadline) => load_before(&self.source, &plan.table_name, deadline)?,
            None => self.source.load_table(&plan.table_name)?,
        };
        self.analyzer.answer(kind, question, &table, identifier)
    }

    fn fail(&self, plan: &Plan, err: ChatError) -> (SessionState, Outcome) {
        warn!(plan = %plan.id, table = %plan.table_name, error = %err, "Query failed, resetting session");
        (SessionState::AwaitingPlan, self.plans_outcome(Reply::Failed(err)))
    }

    fn stale(&self, plan_id: &PlanId) -> (SessionState, Outcome) {
        warn!(plan = %plan_id, "Session refers to an unknown plan, resetting");
        (SessionState::AwaitingPlan, self.plans_outcome(Reply::Reset))
    }

    fn plans_outcome(&self, reply: Reply) -> Outcome {
        Outcome::new(reply, ChoiceSet::Plans(self.catalog.titles()))
    }

    fn question_texts(&self, plan_id: &PlanId) -> Vec<String> {
        self.catalog
            .questions_for(plan_id)
            .iter()
            .map(|q| q.text.clone())
            .collect()
    }

    fn is_restart(&self, text: &str) -> bool {
        let normalized = text::normalize(text);
        self.restart_commands
            .iter()
            .any(|c| text::normalize(c) == normalized)
    }
}
