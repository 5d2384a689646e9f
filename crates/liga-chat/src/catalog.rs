//! Plan catalog: which plans exist, which table backs each, and which
//! question prompts each plan offers.
//!
//! Built once at startup from a plans table and a questions table. Every
//! structural problem is reported as a single [`ChatError::Configuration`]
//! so a broken catalog never reaches the message loop.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{info, warn};

use liga_core::config::CatalogColumns;
use liga_core::{text, PlanId};
use liga_table::schema::{matching_columns, prefixed_columns};
use liga_table::{Table, Value};

use crate::error::ChatError;

/// A selectable category of data backed by one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub id: PlanId,
    pub title: String,
    pub table_name: String,
}

/// One question button offered for a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionPrompt {
    pub plan_id: PlanId,
    pub text: String,
}

/// Immutable lookup of plans and their question prompts.
#[derive(Debug, Clone, Default)]
pub struct PlanCatalog {
    plans: Vec<Plan>,
    by_title: HashMap<String, usize>,
    by_id: HashMap<PlanId, usize>,
    questions: HashMap<PlanId, Vec<QuestionPrompt>>,
}

impl PlanCatalog {
    /// Build a catalog from already-parsed plans and prompts.
    ///
    /// Titles and ids must be unique, every plan needs a table name, and at
    /// least one plan must exist. Prompts are kept in the given order with
    /// blanks and repeats dropped; prompts naming an unknown plan are
    /// skipped with a warning.
    pub fn new(plans: Vec<Plan>, prompts: Vec<QuestionPrompt>) -> Result<Self, ChatError> {
        if plans.is_empty() {
            return Err(ChatError::Configuration("no plans are defined".to_string()));
        }

        let mut catalog = PlanCatalog::default();
        for mut plan in plans {
            plan.title = plan.title.trim().to_string();
            plan.table_name = plan.table_name.trim().to_string();
            if plan.id.as_str().is_empty() || plan.title.is_empty() {
                return Err(ChatError::Configuration(format!(
                    "plan '{}' needs both a number and a title",
                    if plan.title.is_empty() { plan.id.as_str() } else { plan.title.as_str() }
                )));
            }
            if plan.table_name.is_empty() {
                return Err(ChatError::Configuration(format!(
                    "plan '{}' has no table name",
                    plan.title
                )));
            }
            if catalog.by_title.contains_key(&plan.title) {
                return Err(ChatError::Configuration(format!(
                    "duplicate plan title '{}'",
                    plan.title
                )));
            }
            if catalog.by_id.contains_key(&plan.id) {
                return Err(ChatError::Configuration(format!(
                    "duplicate plan number '{}'",
                    plan.id
                )));
            }
            let index = catalog.plans.len();
            catalog.by_title.insert(plan.title.clone(), index);
            catalog.by_id.insert(plan.id.clone(), index);
            catalog.plans.push(plan);
        }

        let mut seen: HashSet<(PlanId, String)> = HashSet::new();
        for prompt in prompts {
            let text = prompt.text.trim();
            if text.is_empty() {
                continue;
            }
            if !catalog.by_id.contains_key(&prompt.plan_id) {
                warn!(plan_id = %prompt.plan_id, question = %text, "Question refers to unknown plan, skipping");
                continue;
            }
            if !seen.insert((prompt.plan_id.clone(), text.to_string())) {
                continue;
            }
            catalog
                .questions
                .entry(prompt.plan_id.clone())
                .or_default()
                .push(QuestionPrompt {
                    plan_id: prompt.plan_id,
                    text: text.to_string(),
                });
        }

        info!(
            plans = catalog.plans.len(),
            questions = catalog.questions.values().map(Vec::len).sum::<usize>(),
            "Plan catalog built"
        );
        Ok(catalog)
    }

    /// Build a catalog from the plans and questions sheets.
    ///
    /// Question columns are merged column by column, each column read top to
    /// bottom. Plan rows whose number and title are both blank are ignored.
    pub fn from_tables(
        plans: &Table,
        questions: &Table,
        columns: &CatalogColumns,
    ) -> Result<Self, ChatError> {
        let number_col = required_column(plans, &columns.plan_number, "plan number")?;
        let title_col = required_column(plans, &columns.plan_title, "plan title")?;
        let table_col = required_column(plans, &columns.table_name, "table name")?;

        let mut parsed = Vec::new();
        for row in 0..plans.len() {
            let number = plans.value(row, number_col);
            let title = plans.value(row, title_col);
            if number.is_blank() && title.is_blank() {
                continue;
            }
            parsed.push(Plan {
                id: plan_id(number),
                title: title.to_text(),
                table_name: plans.value(row, table_col).to_text(),
            });
        }

        let question_number_col =
            required_column(questions, &columns.plan_number, "plan number")?;
        let question_cols: Vec<usize> = prefixed_columns(questions, &columns.question)
            .into_iter()
            .filter(|&c| c != question_number_col)
            .collect();
        if question_cols.is_empty() {
            return Err(ChatError::Configuration(format!(
                "sheet '{}' has no question column (expected a header starting with one of {:?})",
                questions.name(),
                columns.question
            )));
        }

        let mut prompts = Vec::new();
        for &col in &question_cols {
            for row in 0..questions.len() {
                let cell = questions.value(row, col);
                let number = questions.value(row, question_number_col);
                if cell.is_blank() || number.is_blank() {
                    continue;
                }
                prompts.push(QuestionPrompt {
                    plan_id: plan_id(number),
                    text: cell.to_text(),
                });
            }
        }

        Self::new(parsed, prompts)
    }

    /// Plan whose title equals `title` after trimming.
    pub fn resolve_plan(&self, title: &str) -> Option<&Plan> {
        self.by_title.get(title.trim()).map(|&i| &self.plans[i])
    }

    pub fn plan(&self, id: &PlanId) -> Option<&Plan> {
        self.by_id.get(id).map(|&i| &self.plans[i])
    }

    /// All plans in sheet order.
    pub fn plans(&self) -> &[Plan] {
        &self.plans
    }

    /// Plan titles in sheet order, as offered on the plan keyboard.
    pub fn titles(&self) -> Vec<String> {
        self.plans.iter().map(|p| p.title.clone()).collect()
    }

    /// Ordered, deduplicated prompts of a plan; empty for unknown plans.
    pub fn questions_for(&self, id: &PlanId) -> &[QuestionPrompt] {
        self.questions.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The prompt of `id` whose text equals `text` after trimming.
    pub fn prompt(&self, id: &PlanId, text: &str) -> Option<&QuestionPrompt> {
        let text = text.trim();
        self.questions_for(id).iter().find(|q| q.text == text)
    }
}

/// Plan numbers read as `1.0` in one sheet and `"1"` or `"۱"` in another
/// must compare equal.
fn plan_id(value: &Value) -> PlanId {
    PlanId::new(text::ascii_digits(&value.to_text()))
}

fn required_column(table: &Table, aliases: &[String], label: &str) -> Result<usize, ChatError> {
    match matching_columns(table, aliases).as_slice() {
        [index] => Ok(*index),
        [] => Err(ChatError::Configuration(format!(
            "sheet '{}' is missing required column '{}' (accepted headers: {:?})",
            table.name(),
            label,
            aliases
        ))),
        many => Err(ChatError::Configuration(format!(
            "sheet '{}' has {} columns matching '{}'",
            table.name(),
            many.len(),
            label
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(name: &str, headers: &[&str], rows: Vec<Vec<Value>>) -> Table {
        Table::new(name, headers.iter().map(|s| s.to_string()).collect(), rows).unwrap()
    }

    fn plans_sheet() -> Table {
        table(
            "طرح‌ها",
            &["شماره طرح", "عنوان طرح", "نام جدول"],
            vec![
                vec![Value::from(1.0), Value::from("Plan A"), Value::from("T1")],
                vec![Value::from(2.0), Value::from(" Plan B "), Value::from("T2")],
                vec![Value::Null, Value::Null, Value::from("ignored")],
            ],
        )
    }

    fn questions_sheet() -> Table {
        table(
            "سوالات",
            &["شماره طرح", "سوال ۱", "سوال ۲"],
            vec![
                vec![Value::from("1"), Value::from("رتبه ۱ کیه"), Value::from("رتبه من چنده")],
                vec![Value::from("۱"), Value::from("۵ نفر اول"), Value::from("رتبه ۱ کیه")],
                vec![Value::from(2_i64), Value::from("   "), Value::from("فاصله من تا نفر اول")],
                vec![Value::from(9_i64), Value::from("orphan"), Value::Null],
            ],
        )
    }

    fn catalog() -> PlanCatalog {
        PlanCatalog::from_tables(&plans_sheet(), &questions_sheet(), &CatalogColumns::default())
            .unwrap()
    }

    // ---- Construction from sheets ----

    #[test]
    fn test_from_tables_reads_plans() {
        let catalog = catalog();
        assert_eq!(catalog.plans().len(), 2);
        assert_eq!(catalog.titles(), vec!["Plan A", "Plan B"]);
        let plan = catalog.resolve_plan("Plan A").unwrap();
        assert_eq!(plan.id, PlanId::new("1"));
        assert_eq!(plan.table_name, "T1");
    }

    #[test]
    fn test_questions_merged_column_then_row_order() {
        let catalog = catalog();
        let texts: Vec<&str> = catalog
            .questions_for(&PlanId::new("1"))
            .iter()
            .map(|q| q.text.as_str())
            .collect();
        assert_eq!(texts, vec!["رتبه ۱ کیه", "۵ نفر اول", "رتبه من چنده"]);
    }

    #[test]
    fn test_blank_questions_dropped() {
        let catalog = catalog();
        let texts: Vec<&str> = catalog
            .questions_for(&PlanId::new("2"))
            .iter()
            .map(|q| q.text.as_str())
            .collect();
        assert_eq!(texts, vec!["فاصله من تا نفر اول"]);
    }

    #[test]
    fn test_unknown_plan_questions_skipped() {
        let catalog = catalog();
        assert!(catalog.questions_for(&PlanId::new("9")).is_empty());
    }

    #[test]
    fn test_missing_required_column() {
        let plans = table("طرح‌ها", &["شماره طرح", "عنوان طرح"], vec![]);
        let err = PlanCatalog::from_tables(&plans, &questions_sheet(), &CatalogColumns::default())
            .unwrap_err();
        assert!(matches!(err, ChatError::Configuration(ref m) if m.contains("table name")));
    }

    #[test]
    fn test_missing_question_columns() {
        let questions = table("سوالات", &["شماره طرح", "توضیح"], vec![]);
        let err = PlanCatalog::from_tables(&plans_sheet(), &questions, &CatalogColumns::default())
            .unwrap_err();
        assert!(matches!(err, ChatError::Configuration(ref m) if m.contains("question column")));
    }

    #[test]
    fn test_blank_table_name_rejected() {
        let plans = table(
            "طرح‌ها",
            &["شماره طرح", "عنوان طرح", "نام جدول"],
            vec![vec![Value::from(1_i64), Value::from("Plan A"), Value::Null]],
        );
        let err = PlanCatalog::from_tables(&plans, &questions_sheet(), &CatalogColumns::default())
            .unwrap_err();
        assert!(matches!(err, ChatError::Configuration(ref m) if m.contains("no table name")));
    }

    #[test]
    fn test_duplicate_title_rejected() {
        let plans = table(
            "طرح‌ها",
            &["شماره طرح", "عنوان طرح", "نام جدول"],
            vec![
                vec![Value::from(1_i64), Value::from("Plan A"), Value::from("T1")],
                vec![Value::from(2_i64), Value::from("Plan A "), Value::from("T2")],
            ],
        );
        let err = PlanCatalog::from_tables(&plans, &questions_sheet(), &CatalogColumns::default())
            .unwrap_err();
        assert!(matches!(err, ChatError::Configuration(ref m) if m.contains("duplicate plan title")));
    }

    #[test]
    fn test_no_plans_rejected() {
        let plans = table("طرح‌ها", &["شماره طرح", "عنوان طرح", "نام جدول"], vec![]);
        let err = PlanCatalog::from_tables(&plans, &questions_sheet(), &CatalogColumns::default())
            .unwrap_err();
        assert_eq!(err, ChatError::Configuration("no plans are defined".to_string()));
    }

    // ---- Lookups ----

    #[test]
    fn test_resolve_plan_trims_but_is_exact() {
        let catalog = catalog();
        assert!(catalog.resolve_plan("  Plan B\n").is_some());
        assert!(catalog.resolve_plan("plan b").is_none());
        assert!(catalog.resolve_plan("Plan").is_none());
    }

    #[test]
    fn test_every_plan_has_a_table() {
        let catalog = catalog();
        for title in catalog.titles() {
            let plan = catalog.resolve_plan(&title).unwrap();
            assert!(!plan.table_name.is_empty());
            assert_eq!(catalog.plan(&plan.id), Some(plan));
        }
    }

    #[test]
    fn test_prompt_lookup() {
        let catalog = catalog();
        let id = PlanId::new("1");
        assert!(catalog.prompt(&id, " رتبه من چنده ").is_some());
        assert!(catalog.prompt(&id, "something else").is_none());
        assert!(catalog.prompt(&PlanId::new("2"), "رتبه من چنده").is_none());
    }

    #[test]
    fn test_new_deduplicates_prompts() {
        let id = PlanId::new("1");
        let plans = vec![Plan {
            id: id.clone(),
            title: "Plan A".to_string(),
            table_name: "T1".to_string(),
        }];
        let prompts = vec![
            QuestionPrompt { plan_id: id.clone(), text: "q1".to_string() },
            QuestionPrompt { plan_id: id.clone(), text: " q1 ".to_string() },
            QuestionPrompt { plan_id: id.clone(), text: "q2".to_string() },
        ];
        let catalog = PlanCatalog::new(plans, prompts).unwrap();
        assert_eq!(catalog.questions_for(&id).len(), 2);
    }
}
