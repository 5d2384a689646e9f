//! Question classification and answering over a table.
//!
//! Classification looks only at the normalized question text and runs a
//! fixed precedence of rules: rank-by-position, top-N, self-rank or
//! distance (both need a personnel code), then literal lookup. Answering
//! resolves the table's [`Schema`] and computes a typed [`QueryOutcome`].

use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use liga_core::config::{QueryConfig, SchemaAliases};
use liga_core::text;
use liga_table::{Role, Schema, Table};

use crate::error::ChatError;

// =============================================================================
// Patterns (compiled once, matched against normalized text)
// =============================================================================

struct Patterns {
    who: Regex,
    rank_keyword: Regex,
    top: Vec<Regex>,
    self_rank: Regex,
    distance: Regex,
    number: Regex,
    ordinal: Regex,
}

static PATTERNS: LazyLock<Patterns> = LazyLock::new(|| {
    let re = |p: &str| Regex::new(p).expect("Invalid analyzer regex");
    Patterns {
        who: re(r"(?:کیه|کیست|کی است|چه کسی|\bwho\b)"),
        rank_keyword: re(r"(?:رتبه|\brank|\bplace\b|\bposition\b)"),
        top: vec![
            re(r"\btop\b\s*(\d+)?"),
            re(r"(\d+)\s*(?:نفر|تا|تای)\s*(?:اول|برتر)"),
            re(r"(?:نفرات|افراد)\s*(?:اول|برتر)"),
            re(r"برترین\s*ها"),
        ],
        self_rank: re(r"(?:رتبه\s*(?:ی\s*)?(?:من|خودم|خودش)\b|رتبم|\bmy\s+(?:rank|position)\b)"),
        distance: re(r"(?:فاصله|اختلاف|\bdistance\b|\bgap\b)"),
        number: re(r"\d+"),
        ordinal: re(concat!(
            r"\b(اول|یکم|دوم|سوم|چهارم|پنجم|ششم|هفتم|هشتم|نهم|دهم",
            r"|first|second|third|fourth|fifth|sixth|seventh|eighth|ninth|tenth)(?:ین)?\b"
        )),
    }
});

fn ordinal_value(word: &str) -> Option<i64> {
    let n = match word {
        "اول" | "یکم" | "first" => 1,
        "دوم" | "second" => 2,
        "سوم" | "third" => 3,
        "چهارم" | "fourth" => 4,
        "پنجم" | "fifth" => 5,
        "ششم" | "sixth" => 6,
        "هفتم" | "seventh" => 7,
        "هشتم" | "eighth" => 8,
        "نهم" | "ninth" => 9,
        "دهم" | "tenth" => 10,
        _ => return None,
    };
    Some(n)
}

/// First rank mentioned in normalized text: digits win over ordinal words.
fn mentioned_rank(normalized: &str) -> Option<i64> {
    let pats = &*PATTERNS;
    if let Some(m) = pats.number.find(normalized) {
        if let Ok(n) = m.as_str().parse::<i64>() {
            return Some(n);
        }
    }
    pats.ordinal
        .captures(normalized)
        .and_then(|c| c.get(1))
        .and_then(|m| ordinal_value(m.as_str()))
}

// =============================================================================
// Types
// =============================================================================

/// What a question asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// Who holds the given rank.
    RankAt(i64),
    /// The best N rows.
    TopN(usize),
    /// The asking user's own rank.
    SelfRank,
    /// Metric gap between the user and the holder of `target_rank`.
    Distance { target_rank: i64 },
    /// Exact lookup of the question text in the table's question column.
    Literal,
}

impl QueryKind {
    /// True when answering needs the user's personnel code.
    pub fn requires_identity(&self) -> bool {
        matches!(self, QueryKind::SelfRank | QueryKind::Distance { .. })
    }
}

/// One line of a top-N answer.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedEntry {
    /// Rank from the table, or the 1-based position when ranked by metric.
    pub rank: i64,
    pub name: String,
    /// Metric value when the table has no rank column.
    pub score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    Person { rank: i64, name: String },
    Ranking(Vec<RankedEntry>),
    SelfRank { rank: String },
    Distance { target_rank: i64, metric: String, value: f64 },
    Literal(String),
}

/// Why a well-formed question had no answer in the table.
#[derive(Debug, Clone, PartialEq)]
pub enum NotFoundReason {
    Rank(i64),
    PersonnelCode(String),
    Answer,
    MissingMetric { metric: String },
    EmptyTable,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Found(Answer),
    NotFound(NotFoundReason),
    Unrecognized,
}

// =============================================================================
// QueryAnalyzer
// =============================================================================

/// Rule-based classifier and evaluator for plan questions.
#[derive(Debug, Clone, Default)]
pub struct QueryAnalyzer {
    config: QueryConfig,
    aliases: SchemaAliases,
}

impl QueryAnalyzer {
    pub fn new(config: QueryConfig, aliases: SchemaAliases) -> Self {
        Self { config, aliases }
    }

    // -----------------------------------------------------------------
    // Classification
    // -----------------------------------------------------------------

    /// Classify a question. The first matching rule wins.
    pub fn classify(&self, question: &str) -> QueryKind {
        let normalized = text::normalize(question);
        let pats = &*PATTERNS;

        let kind = if pats.who.is_match(&normalized) && pats.rank_keyword.is_match(&normalized) {
            QueryKind::RankAt(mentioned_rank(&normalized).unwrap_or(1))
        } else if let Some(n) = self.top_count(&normalized) {
            QueryKind::TopN(n)
        } else if pats.distance.is_match(&normalized) {
            QueryKind::Distance {
                target_rank: mentioned_rank(&normalized).unwrap_or(self.config.leader_rank),
            }
        } else if pats.self_rank.is_match(&normalized) {
            QueryKind::SelfRank
        } else {
            QueryKind::Literal
        };

        debug!(question = %question, kind = ?kind, "Classified question");
        kind
    }

    fn top_count(&self, normalized: &str) -> Option<usize> {
        PATTERNS.top.iter().find_map(|re| {
            re.captures(normalized).map(|caps| {
                caps.get(1)
                    .and_then(|m| m.as_str().parse::<usize>().ok())
                    .filter(|&n| n > 0)
                    .unwrap_or(self.config.top_n)
            })
        })
    }

    // -----------------------------------------------------------------
    // Answering
    // -----------------------------------------------------------------

    /// Answer a classified question against a table.
    ///
    /// Identity-requiring kinds fail with [`ChatError::MissingIdentifier`]
    /// when `identifier` is `None`. Missing columns are schema errors;
    /// absent rows are [`QueryOutcome::NotFound`].
    pub fn answer(
        &self,
        kind: QueryKind,
        question: &str,
        table: &Table,
        identifier: Option<&str>,
    ) -> Result<QueryOutcome, ChatError> {
        let schema = Schema::resolve(table, &self.aliases)?;
        let outcome = match kind {
            QueryKind::RankAt(rank) => rank_at(rank, table, &schema)?,
            QueryKind::TopN(n) => self.top_n(n, table, &schema)?,
            QueryKind::SelfRank => {
                let id = identifier.ok_or(ChatError::MissingIdentifier)?;
                self_rank(id, table, &schema)?
            }
            QueryKind::Distance { target_rank } => {
                let id = identifier.ok_or(ChatError::MissingIdentifier)?;
                self.distance(id, target_rank, table, &schema)?
            }
            QueryKind::Literal => literal(question, table, &schema),
        };
        debug!(table = %table.name(), kind = ?kind, outcome = ?outcome, "Answered question");
        Ok(outcome)
    }

    fn top_n(&self, n: usize, table: &Table, schema: &Schema) -> Result<QueryOutcome, ChatError> {
        let entries: Vec<RankedEntry> = if let Some(rank_col) = schema.get(Role::Rank) {
            let mut ranked: Vec<(i64, usize)> = (0..table.len())
                .filter_map(|row| table.value(row, rank_col).as_integer().map(|r| (r, row)))
                .collect();
            // Stable: tied ranks keep table order
            ranked.sort_by_key(|&(rank, _)| rank);
            ranked
                .into_iter()
                .take(n)
                .map(|(rank, row)| RankedEntry {
                    rank,
                    name: display_name(table, schema, row),
                    score: None,
                })
                .collect()
        } else {
            let metric = schema.metric_column(table, self.config.distance_metric.as_deref())?;
            let mut scored: Vec<(f64, usize)> = (0..table.len())
                .filter_map(|row| table.value(row, metric).as_number().map(|v| (v, row)))
                .collect();
            scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
            scored
                .into_iter()
                .take(n)
                .enumerate()
                .map(|(i, (value, row))| RankedEntry {
                    rank: i as i64 + 1,
                    name: display_name(table, schema, row),
                    score: Some(value),
                })
                .collect()
        };

        if entries.is_empty() {
            return Ok(QueryOutcome::NotFound(NotFoundReason::EmptyTable));
        }
        Ok(QueryOutcome::Found(Answer::Ranking(entries)))
    }

    fn distance(
        &self,
        identifier: &str,
        target_rank: i64,
        table: &Table,
        schema: &Schema,
    ) -> Result<QueryOutcome, ChatError> {
        let code_col = schema.require(Role::PersonnelCode)?;
        let rank_col = schema.require(Role::Rank)?;
        let metric_col = schema.metric_column(table, self.config.distance_metric.as_deref())?;
        let metric = table.columns()[metric_col].clone();

        let Some(user_row) = find_by_code(table, code_col, identifier) else {
            return Ok(not_found_code(identifier));
        };
        let Some(target_row) = find_by_rank(table, rank_col, target_rank) else {
            return Ok(QueryOutcome::NotFound(NotFoundReason::Rank(target_rank)));
        };

        let user_value = table.value(user_row, metric_col).as_number();
        let target_value = table.value(target_row, metric_col).as_number();
        match (user_value, target_value) {
            (Some(user), Some(target)) => Ok(QueryOutcome::Found(Answer::Distance {
                target_rank,
                metric,
                value: target - user,
            })),
            _ => Ok(QueryOutcome::NotFound(NotFoundReason::MissingMetric { metric })),
        }
    }
}

fn rank_at(rank: i64, table: &Table, schema: &Schema) -> Result<QueryOutcome, ChatError> {
    let rank_col = schema.require(Role::Rank)?;
    schema.require(Role::FirstName)?;
    schema.require(Role::LastName)?;

    Ok(match find_by_rank(table, rank_col, rank) {
        Some(row) => QueryOutcome::Found(Answer::Person {
            rank,
            name: display_name(table, schema, row),
        }),
        None => QueryOutcome::NotFound(NotFoundReason::Rank(rank)),
    })
}

fn self_rank(identifier: &str, table: &Table, schema: &Schema) -> Result<QueryOutcome, ChatError> {
    let code_col = schema.require(Role::PersonnelCode)?;
    let rank_col = schema.require(Role::Rank)?;

    Ok(match find_by_code(table, code_col, identifier) {
        Some(row) => QueryOutcome::Found(Answer::SelfRank {
            rank: table.value(row, rank_col).to_text(),
        }),
        None => not_found_code(identifier),
    })
}

fn literal(question: &str, table: &Table, schema: &Schema) -> QueryOutcome {
    let Some((question_col, answer_col)) = schema.literal_columns(table) else {
        return QueryOutcome::Unrecognized;
    };
    let wanted = question.trim();
    let row = (0..table.len()).find(|&row| table.value(row, question_col).to_text().trim() == wanted);
    match row.map(|row| table.value(row, answer_col)) {
        Some(answer) if !answer.is_blank() => QueryOutcome::Found(Answer::Literal(answer.to_text())),
        _ => QueryOutcome::NotFound(NotFoundReason::Answer),
    }
}

fn not_found_code(identifier: &str) -> QueryOutcome {
    QueryOutcome::NotFound(NotFoundReason::PersonnelCode(identifier.trim().to_string()))
}

/// First row whose rank parses to `rank`; ties resolve to table order.
fn find_by_rank(table: &Table, rank_col: usize, rank: i64) -> Option<usize> {
    (0..table.len()).find(|&row| table.value(row, rank_col).as_integer() == Some(rank))
}

/// First row whose stringified code equals the identifier exactly.
///
/// Persian digits in the identifier are read as ASCII; letters stay
/// case-sensitive.
fn find_by_code(table: &Table, code_col: usize, identifier: &str) -> Option<usize> {
    let wanted = text::ascii_digits(identifier.trim());
    if wanted.is_empty() {
        return None;
    }
    // Sheets may store codes with Persian digits too
    (0..table.len()).find(|&row| {
        text::ascii_digits(table.value(row, code_col).to_text().trim()) == wanted
    })
}

/// "first last", else the personnel code, else the first cell.
fn display_name(table: &Table, schema: &Schema, row: usize) -> String {
    let part = |role: Role| {
        schema
            .get(role)
            .map(|col| table.value(row, col).to_text().trim().to_string())
            .unwrap_or_default()
    };
    let name = [part(Role::FirstName), part(Role::LastName)]
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if !name.is_empty() {
        return name;
    }
    let code = part(Role::PersonnelCode);
    if !code.is_empty() {
        return code;
    }
    table.value(row, 0).to_text()
}
