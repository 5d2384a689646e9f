use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{LigaError, Result};

/// Top-level configuration for the Liga query bot.
///
/// Loaded from `~/.liga/config.toml` by default. Each section corresponds
/// to one component of the conversation engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LigaConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub workbook: WorkbookConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub schema: SchemaAliases,
    #[serde(default)]
    pub catalog: CatalogColumns,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub messages: MessagesConfig,
}

impl LigaConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: LigaConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Check load-time invariants that serde defaults cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.session.restart_commands.iter().all(|c| c.trim().is_empty()) {
            return Err(LigaError::Config(
                "session.restart_commands must contain at least one command".to_string(),
            ));
        }
        if self.query.top_n == 0 {
            return Err(LigaError::Config("query.top_n must be at least 1".to_string()));
        }
        if self.workbook.data_sheet.trim().is_empty() {
            return Err(LigaError::Config("workbook.data_sheet must not be empty".to_string()));
        }
        let roles = [
            ("schema.rank", &self.schema.rank),
            ("schema.personnel_code", &self.schema.personnel_code),
            ("schema.first_name", &self.schema.first_name),
            ("schema.last_name", &self.schema.last_name),
            ("schema.question", &self.schema.question),
            ("schema.answer", &self.schema.answer),
            ("catalog.plan_number", &self.catalog.plan_number),
            ("catalog.plan_title", &self.catalog.plan_title),
            ("catalog.table_name", &self.catalog.table_name),
            ("catalog.question", &self.catalog.question),
        ];
        for (name, aliases) in roles {
            if aliases.is_empty() {
                return Err(LigaError::Config(format!("{} needs at least one alias", name)));
            }
        }
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Where the data and catalog workbooks live.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkbookConfig {
    /// Workbook holding the named data tables.
    pub path: String,
    /// Sheet whose named tables back the plans.
    pub data_sheet: String,
    /// Workbook holding the plan and question sheets. Defaults to `path`.
    pub catalog_path: Option<String>,
    /// Sheet listing plan number, title, and table name.
    pub plans_sheet: String,
    /// Sheet listing plan number and question texts.
    pub questions_sheet: String,
    /// Keep loaded tables in memory until restart.
    pub cache_tables: bool,
}

impl WorkbookConfig {
    /// Path of the data workbook, with `~/` expanded.
    pub fn data_path(&self) -> PathBuf {
        expand_home(&self.path)
    }

    /// Path of the catalog workbook, falling back to the data workbook.
    pub fn catalog_path(&self) -> PathBuf {
        expand_home(self.catalog_path.as_deref().unwrap_or(&self.path))
    }
}

/// Expand a leading `~/` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        if let Some(home) = home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// The current user's home directory, if known.
pub fn home_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    let home = std::env::var("USERPROFILE");
    #[cfg(not(target_os = "windows"))]
    let home = std::env::var("HOME");
    home.ok().map(PathBuf::from)
}

impl Default for WorkbookConfig {
    fn default() -> Self {
        Self {
            path: "liga.xlsx".to_string(),
            data_sheet: "فروشنده".to_string(),
            catalog_path: None,
            plans_sheet: "طرح‌ها".to_string(),
            questions_sheet: "سوالات".to_string(),
            cache_tables: false,
        }
    }
}

/// Query analyzer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Rows returned by a top-N question that names no count.
    pub top_n: usize,
    /// Rank treated as "the leader" by distance questions.
    pub leader_rank: i64,
    /// Header of the column distance questions diff. When unset, the first
    /// numeric column that is not rank, code, or name is used.
    pub distance_metric: Option<String>,
    /// Upper bound for one table lookup in milliseconds. 0 disables it.
    pub timeout_ms: u64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            top_n: 5,
            leader_rank: 1,
            distance_metric: None,
            timeout_ms: 10_000,
        }
    }
}

/// Accepted header spellings for each semantic column role of a data table.
///
/// Matching is done on normalized text, so case, ZWNJ, and Arabic letter
/// variants do not need their own entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaAliases {
    pub rank: Vec<String>,
    pub personnel_code: Vec<String>,
    pub first_name: Vec<String>,
    pub last_name: Vec<String>,
    pub question: Vec<String>,
    pub answer: Vec<String>,
}

impl Default for SchemaAliases {
    fn default() -> Self {
        Self {
            rank: strings(&["رتبه", "rank", "ranking"]),
            personnel_code: strings(&[
                "کد پرسنلی",
                "کدپرسنلی",
                "personnel code",
                "personnel-code",
                "employee id",
            ]),
            first_name: strings(&["نام", "first name", "first-name", "firstname"]),
            last_name: strings(&[
                "نام خانوادگی",
                "last name",
                "last-name",
                "lastname",
                "surname",
            ]),
            question: strings(&["سوال", "سؤال", "question"]),
            answer: strings(&["پاسخ", "جواب", "answer"]),
        }
    }
}

/// Accepted header spellings for the plan and question catalog sheets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogColumns {
    pub plan_number: Vec<String>,
    pub plan_title: Vec<String>,
    pub table_name: Vec<String>,
    /// Prefixes of question columns; `سوال ۲` and `question 3` both match.
    pub question: Vec<String>,
}

impl Default for CatalogColumns {
    fn default() -> Self {
        Self {
            plan_number: strings(&["شماره طرح", "plan number", "plan-number", "plan id"]),
            plan_title: strings(&["عنوان طرح", "نام طرح", "plan title", "plan-title", "title"]),
            table_name: strings(&["نام جدول", "جدول", "table name", "table-name", "table"]),
            question: strings(&["سوال", "سؤال", "question"]),
        }
    }
}

/// Session behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Inputs that reset a session to plan selection from any state.
    pub restart_commands: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            restart_commands: strings(&["/start", "/cancel"]),
        }
    }
}

/// User-facing message templates. `{name}` placeholders are substituted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagesConfig {
    pub welcome: String,
    pub choose_plan: String,
    pub plan_not_found: String,
    pub no_questions: String,
    pub choose_question: String,
    pub ask_personnel_code: String,
    /// `{rank}`, `{name}`
    pub rank_answer: String,
    /// `{count}`
    pub top_header: String,
    /// `{rank}`
    pub self_rank_answer: String,
    /// `{target}`, `{metric}`, `{value}`
    pub distance_answer: String,
    /// `{answer}`
    pub literal_answer: String,
    /// `{rank}`
    pub rank_not_found: String,
    pub personnel_code_not_found: String,
    pub answer_not_found: String,
    pub empty_table: String,
    pub unrecognized: String,
    /// `{table}`
    pub table_not_found: String,
    pub missing_columns: String,
    pub timeout: String,
    /// `{error}`
    pub error: String,
    pub reset: String,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            welcome: "👋 خوش آمدید!".to_string(),
            choose_plan: "📋 لطفاً طرح مورد نظر خود را انتخاب کنید:".to_string(),
            plan_not_found: "❌ طرح یافت نشد، لطفاً دوباره انتخاب کنید.".to_string(),
            no_questions: "❌ سوالی برای این طرح موجود نیست.".to_string(),
            choose_question: "📋 لطفاً سوال خود را انتخاب کنید:".to_string(),
            ask_personnel_code: "لطفاً کد پرسنلی خود را وارد کنید:".to_string(),
            rank_answer: "💡 رتبه {rank}: {name}".to_string(),
            top_header: "🏆 {count} نفر برتر:".to_string(),
            self_rank_answer: "💡 رتبه شما: {rank}".to_string(),
            distance_answer: "📏 فاصله شما تا رتبه {target} ({metric}): {value}".to_string(),
            literal_answer: "💡 جواب تحلیل شده:\n{answer}".to_string(),
            rank_not_found: "❌ هیچ فردی با رتبه {rank} یافت نشد.".to_string(),
            personnel_code_not_found: "❌ کد پرسنلی یافت نشد.".to_string(),
            answer_not_found: "💡 اطلاعات بر اساس جدول تحلیل شد: اما جواب دقیق یافت نشد."
                .to_string(),
            empty_table: "❌ جدول این طرح هیچ ردیفی ندارد.".to_string(),
            unrecognized: "❌ متوجه سوال نشدم.".to_string(),
            table_not_found: "❌ جدول با نام '{table}' یافت نشد.".to_string(),
            missing_columns: "❌ ستون‌های لازم برای پاسخ یافت نشد.".to_string(),
            timeout: "⏳ پاسخ‌گویی بیش از حد طول کشید، لطفاً دوباره تلاش کنید.".to_string(),
            error: "❌ خطا در پردازش پیام: {error}".to_string(),
            reset: "🔄 گفتگو از ابتدا شروع شد.".to_string(),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
