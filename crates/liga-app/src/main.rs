//! Liga application binary - composition root.
//!
//! 1. Load configuration from TOML
//! 2. Build the plan catalog from the plans and questions sheets
//! 3. Open the data workbook as a table source
//! 4. Run a console loop standing in for a chat transport

mod cli;

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use liga_chat::{ChatEngine, OutboundMessage, PlanCatalog};
use liga_core::{LigaConfig, UserId};
use liga_table::source::table_key;
use liga_table::{load_sheet, CachedSource, TableSource, WorkbookSource};

use cli::CliArgs;

/// Build the catalog from the plan and question sheets of `path`.
fn load_catalog(path: &Path, config: &LigaConfig) -> Result<PlanCatalog, Box<dyn std::error::Error>> {
    let plans = load_sheet(path, &config.workbook.plans_sheet)?;
    let questions = load_sheet(path, &config.workbook.questions_sheet)?;
    Ok(PlanCatalog::from_tables(&plans, &questions, &config.catalog)?)
}

/// Plan tables the catalog names but the data sheet does not define.
fn missing_tables<'a>(catalog: &'a PlanCatalog, available: &[String]) -> Vec<&'a str> {
    let keys: Vec<String> = available.iter().map(|name| table_key(name)).collect();
    catalog
        .plans()
        .iter()
        .map(|plan| plan.table_name.as_str())
        .filter(|name| !keys.contains(&table_key(name)))
        .collect()
}

/// Warn about plans whose table is absent; they will answer with a table-not-found reply.
fn check_plan_tables(catalog: &PlanCatalog, workbook: &WorkbookSource) {
    match workbook.table_names() {
        Ok(available) => {
            tracing::debug!(tables = ?available, "Tables on data sheet");
            for name in missing_tables(catalog, &available) {
                tracing::warn!(table = %name, "Plan table not found on data sheet");
            }
        }
        Err(e) => tracing::warn!(error = %e, "Could not list tables on data sheet"),
    }
}

/// Split a console line into sender and message text.
fn split_line<'a>(line: &'a str, fixed_user: Option<&str>) -> Option<(UserId, &'a str)> {
    match fixed_user {
        Some(user) => Some((UserId::from(user), line)),
        None => line
            .split_once(char::is_whitespace)
            .map(|(user, text)| (UserId::from(user), text.trim())),
    }
}

fn print_reply(user: &UserId, reply: &OutboundMessage, json: bool) {
    if json {
        match serde_json::to_string(reply) {
            Ok(line) => println!("{}", line),
            Err(e) => tracing::error!(error = %e, "Failed to serialize reply"),
        }
        return;
    }
    println!("[{}] {}", user, reply.text);
    for (i, choice) in reply.choices.iter().enumerate() {
        println!("  {}) {}", i + 1, choice);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config is read before tracing starts so its log level can apply.
    let config_file = args.resolve_config_path();
    let loaded = LigaConfig::load(&config_file);
    let config_level = loaded
        .as_ref()
        .map(|c| c.general.log_level.clone())
        .unwrap_or_else(|_| "info".to_string());

    // Tracing. RUST_LOG wins over --log-level and the config file.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(args.resolve_log_level(&config_level))
            }),
        )
        .init();

    tracing::info!("Starting Liga v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match loaded {
        Ok(config) => {
            tracing::info!(path = %config_file.display(), "Configuration loaded");
            config
        }
        Err(e) => {
            tracing::warn!(path = %config_file.display(), error = %e, "Using default configuration");
            LigaConfig::default()
        }
    };

    if let Some(path) = args.resolve_workbook() {
        config.workbook.path = path.to_string_lossy().into_owned();
    }

    // Catalog.
    let data_path = config.workbook.data_path();
    let catalog_path = config.workbook.catalog_path();

    let catalog = match load_catalog(&catalog_path, &config) {
        Ok(catalog) => catalog,
        Err(e) => {
            tracing::error!(path = %catalog_path.display(), error = %e, "Failed to build plan catalog");
            return Err(e);
        }
    };
    tracing::info!(path = %catalog_path.display(), plans = catalog.plans().len(), "Plan catalog loaded");

    // Table source.
    let workbook = WorkbookSource::new(&data_path, config.workbook.data_sheet.clone());
    check_plan_tables(&catalog, &workbook);
    let source: Arc<dyn TableSource> = if config.workbook.cache_tables {
        tracing::info!("Table cache enabled");
        Arc::new(CachedSource::new(workbook))
    } else {
        Arc::new(workbook)
    };
    tracing::info!(path = %data_path.display(), sheet = %config.workbook.data_sheet, "Table source ready");

    let engine = Arc::new(ChatEngine::from_config(&config, catalog, source));

    // === Console loop ===

    if args.user.is_none() {
        eprintln!("Type \"<user-id> <message>\"; :sessions lists sessions, :quit exits.");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => continue,
            ":quit" => break,
            ":sessions" => {
                println!("{}", serde_json::to_string_pretty(&engine.list_sessions())?);
                continue;
            }
            _ => {}
        }

        let Some((user, text)) = split_line(line, args.user.as_deref()) else {
            eprintln!("Expected \"<user-id> <message>\"");
            continue;
        };

        let worker = Arc::clone(&engine);
        let text = text.to_string();
        let sender = user.clone();
        let reply = tokio::task::spawn_blocking(move || worker.handle_message(&sender, &text)).await?;
        print_reply(&user, &reply, args.json);
    }

    tracing::info!(sessions = engine.session_count(), "Shutting down");
    Ok(())
}
