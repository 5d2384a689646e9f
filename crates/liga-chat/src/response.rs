//! Rendering of state-machine outcomes into user-facing replies.
//!
//! Pure: no I/O, no session access. Every reply carries the next valid
//! set of choices, so a transport always has something to offer.

use serde::Serialize;

use liga_core::config::MessagesConfig;
use liga_core::text;
use liga_table::TableError;

use crate::analyzer::{Answer, NotFoundReason, QueryOutcome, RankedEntry};
use crate::error::ChatError;

// =============================================================================
// Outcome
// =============================================================================

/// The buttons offered with a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChoiceSet {
    /// Plan titles; followed by the "choose a plan" prompt.
    Plans(Vec<String>),
    /// Question prompts of the active plan; followed by "choose a question".
    Questions(Vec<String>),
    /// Only the restart commands, while free text is expected.
    Commands(Vec<String>),
}

impl ChoiceSet {
    pub fn items(&self) -> &[String] {
        match self {
            ChoiceSet::Plans(items) | ChoiceSet::Questions(items) | ChoiceSet::Commands(items) => {
                items
            }
        }
    }
}

/// What happened in one step of a conversation.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Restart command, or first contact.
    Welcome,
    PlanSelected { title: String },
    PlanNotFound,
    NoQuestions { title: String },
    AskPersonnelCode,
    Answered(QueryOutcome),
    /// Text matched none of the active plan's prompts.
    Unclassified,
    /// Session state referred to something that no longer exists.
    Reset,
    Failed(ChatError),
}

/// A reply plus the choices that follow it.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub reply: Reply,
    pub choices: ChoiceSet,
}

impl Outcome {
    pub fn new(reply: Reply, choices: ChoiceSet) -> Self {
        Self { reply, choices }
    }
}

/// A rendered reply, ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    pub text: String,
    pub choices: Vec<String>,
}

// =============================================================================
// ResponseFormatter
// =============================================================================

/// Turns outcomes into text using the configured message templates.
#[derive(Debug, Clone, Default)]
pub struct ResponseFormatter {
    messages: MessagesConfig,
}

impl ResponseFormatter {
    pub fn new(messages: MessagesConfig) -> Self {
        Self { messages }
    }

    pub fn format(&self, outcome: &Outcome) -> OutboundMessage {
        let m = &self.messages;
        let body = match &outcome.reply {
            Reply::Welcome => m.welcome.clone(),
            Reply::PlanSelected { .. } => String::new(),
            Reply::PlanNotFound => m.plan_not_found.clone(),
            Reply::NoQuestions { .. } => m.no_questions.clone(),
            Reply::AskPersonnelCode => m.ask_personnel_code.clone(),
            Reply::Answered(result) => self.render_outcome(result),
            Reply::Unclassified => m.unrecognized.clone(),
            Reply::Reset => m.reset.clone(),
            Reply::Failed(err) => self.render_error(err),
        };

        let prompt = match &outcome.choices {
            ChoiceSet::Plans(_) => m.choose_plan.as_str(),
            ChoiceSet::Questions(_) => m.choose_question.as_str(),
            // Asking for the code is itself the prompt
            ChoiceSet::Commands(_) => "",
        };
        let text = [body.as_str(), prompt]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");

        OutboundMessage {
            text,
            choices: outcome.choices.items().to_vec(),
        }
    }

    fn render_outcome(&self, outcome: &QueryOutcome) -> String {
        let m = &self.messages;
        match outcome {
            QueryOutcome::Found(answer) => self.render_answer(answer),
            QueryOutcome::NotFound(reason) => match reason {
                NotFoundReason::Rank(rank) => fill(&m.rank_not_found, &[("rank", rank.to_string().as_str())]),
                NotFoundReason::PersonnelCode(_) => m.personnel_code_not_found.clone(),
                NotFoundReason::Answer => m.answer_not_found.clone(),
                NotFoundReason::MissingMetric { .. } => m.missing_columns.clone(),
                NotFoundReason::EmptyTable => m.empty_table.clone(),
            },
            QueryOutcome::Unrecognized => m.unrecognized.clone(),
        }
    }

    fn render_answer(&self, answer: &Answer) -> String {
        let m = &self.messages;
        match answer {
            Answer::Person { rank, name } => {
                fill(&m.rank_answer, &[("rank", rank.to_string().as_str()), ("name", name.as_str())])
            }
            Answer::Ranking(entries) => {
                let mut lines = vec![fill(&m.top_header, &[("count", entries.len().to_string().as_str())])];
                lines.extend(entries.iter().map(ranking_line));
                lines.join("\n")
            }
            Answer::SelfRank { rank } => fill(&m.self_rank_answer, &[("rank", rank.as_str())]),
            Answer::Distance {
                target_rank,
                metric,
                value,
            } => fill(
                &m.distance_answer,
                &[
                    ("target", target_rank.to_string().as_str()),
                    ("metric", metric.as_str()),
                    ("value", text::format_number(*value).as_str()),
                ],
            ),
            Answer::Literal(answer) => fill(&m.literal_answer, &[("answer", answer.as_str())]),
        }
    }

    fn render_error(&self, err: &ChatError) -> String {
        let m = &self.messages;
        match err {
            ChatError::Table(TableError::TableNotFound(table)) => {
                fill(&m.table_not_found, &[("table", table.as_str())])
            }
            ChatError::Table(TableError::Timeout(_)) => m.timeout.clone(),
            ChatError::Schema(_) => m.missing_columns.clone(),
            other => fill(&m.error, &[("error", other.to_string().as_str())]),
        }
    }
}

fn ranking_line(entry: &RankedEntry) -> String {
    match entry.score {
        Some(score) => format!("{}. {} ({})", entry.rank, entry.name, text::format_number(score)),
        None => format!("{}. {}", entry.rank, entry.name),
    }
}

/// Substitute `{key}` placeholders.
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    values
        .iter()
        .fold(template.to_string(), |acc, (key, value)| {
            acc.replace(&format!("{{{}}}", key), value)
        })
}
