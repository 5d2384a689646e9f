//! Conversational layer of the Liga query bot.
//!
//! A user picks a plan, then one of its question prompts; the prompt is
//! classified, evaluated against the plan's table and rendered as a reply
//! with the next set of choices.

pub mod analyzer;
pub mod catalog;
pub mod engine;
pub mod error;
pub mod machine;
pub mod response;
pub mod session;

pub use analyzer::{Answer, NotFoundReason, QueryAnalyzer, QueryKind, QueryOutcome, RankedEntry};
pub use catalog::{Plan, PlanCatalog, QuestionPrompt};
pub use engine::ChatEngine;
pub use error::ChatError;
pub use machine::SessionStateMachine;
pub use response::{ChoiceSet, OutboundMessage, Outcome, Reply, ResponseFormatter};
pub use session::{Session, SessionSummary};
