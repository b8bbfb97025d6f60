use address_lib::collaborator::{ClaudeClient, ExtractionCollaborator};
use address_lib::config::AppConfig;
use address_lib::consolidation::Scenario;
use address_lib::matching::fuzzy::discover_mapping;
use address_lib::models::AddressRecord;
use address_lib::pipeline::writeback::records_from_json;
use address_lib::pipeline::{
    consolidate, push_updates, resolve_address, time_saved_hours, write_golden_to_internal,
    MatchOutcome, ResolutionContext,
};
use address_lib::store::postgres::PostgresStore;
use address_lib::store::TableRef;
use address_lib::utils::db_connect::{connect, get_pool_status};
use address_lib::utils::env::load_env;
use address_lib::Outcome;
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a free-form address against the golden source
    Match {
        /// Address text; multiple words are joined with spaces
        #[arg(required = true)]
        address: Vec<String>,
        /// Similarity threshold (raised to the engine floor when lower)
        #[arg(long)]
        threshold: Option<f64>,
        /// Print the raw outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the address columns discovered on a table
    Columns { table: String },
    /// Consolidate internal matches read from a JSON file
    Consolidate {
        #[arg(long)]
        input: PathBuf,
        /// Insert the consolidated record into the updates table
        #[arg(long)]
        push: bool,
    },
    /// Write a golden source record into the updates table
    WriteGolden {
        #[arg(long)]
        input: PathBuf,
    },
    /// Report hours saved by pushed updates
    TimeSaved,
}

#[derive(Deserialize)]
struct ConsolidateRequest {
    #[serde(default)]
    internal_matches: Vec<Value>,
    #[serde(default)]
    golden_source_address: Option<Value>,
    #[serde(default)]
    scenario: Option<u8>,
}

#[derive(Deserialize)]
struct WriteGoldenRequest {
    #[serde(default)]
    golden_source_record: Option<Value>,
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &PathBuf) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

fn golden_from(value: Option<Value>) -> Result<Option<AddressRecord>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => AddressRecord::from_external(v)
            .map(Some)
            .ok_or_else(|| anyhow!("golden source record must be a JSON object")),
    }
}

fn print_report(outcome: &MatchOutcome) {
    println!("\n📍 Input: {}", outcome.input_address);
    println!(
        "   Candidates searched: {} | threshold: {:.1} | method: {:?}",
        outcome.candidates_searched, outcome.similarity_threshold, outcome.search_method
    );
    match &outcome.best_match {
        Some(best) => {
            println!("✅ Match found ({})", best.metadata.source_table);
            for (column, value) in best.record.iter() {
                println!("   {:<14} {}", column, value);
            }
            println!(
                "   Similarity: {:.2} | Confidence: {}",
                best.metadata.similarity_score,
                outcome
                    .confidence
                    .map_or_else(|| "n/a".to_string(), |c| format!("{:.0}", c))
            );
            if outcome.business_rule_exception {
                println!(
                    "⚠️  Business rule exception: confidence below {:.0}",
                    outcome.confidence_threshold
                );
            }
        }
        None => println!("❌ No match found"),
    }
    println!("   Reasoning: {}", outcome.reasoning);

    if !outcome.internal_matches.is_empty() {
        println!("\n🔎 Internal matches: {}", outcome.internal_matches.len());
        for (idx, candidate) in outcome.internal_matches.iter().enumerate() {
            let summary: Vec<String> = candidate
                .record
                .iter()
                .take(4)
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            println!(
                "   {}. [{:.2}] {} ({})",
                idx + 1,
                candidate.metadata.similarity_score,
                summary.join(", "),
                candidate.metadata.source_table
            );
        }
    }
    if let Some(scenario) = outcome.suggested_scenario {
        println!(
            "\n📝 Suggested scenario {}: {}",
            scenario.id(),
            scenario.action_label()
        );
    }
}

/// Prints an outcome envelope and reports whether it succeeded.
fn emit<T: serde::Serialize>(outcome: &Outcome<T>, key: &str) -> Result<bool> {
    println!(
        "{}",
        serde_json::to_string_pretty(&outcome.to_response(key))
            .context("Failed to render response")?
    );
    Ok(outcome.is_success())
}

async fn run(cli: Cli) -> Result<bool> {
    let config = AppConfig::from_env()?;
    let pool = connect(&config.database)
        .await
        .context("Failed to connect to database")?;
    let (connections, idle) = get_pool_status(&pool);
    info!("Pool ready: {} connections, {} idle", connections, idle);

    let store = PostgresStore::new(pool);
    let claude = match &config.claude {
        Some(claude_config) => Some(ClaudeClient::new(claude_config.clone())?),
        None => {
            info!("CLAUDE_API_KEY not set; matching with the fuzzy engine only");
            None
        }
    };
    let mut ctx = ResolutionContext::new(&store, &config.engine);
    if let Some(client) = &claude {
        ctx = ctx.with_collaborator(client as &dyn ExtractionCollaborator);
    }

    match cli.command {
        Command::Match {
            address,
            threshold,
            json,
        } => {
            let outcome = resolve_address(&ctx, &address.join(" "), threshold).await;
            if json {
                return emit(&outcome, "result");
            }
            match &outcome {
                Outcome::Success(report) => print_report(report),
                _ => println!(
                    "❌ {}",
                    outcome.error_message().unwrap_or_default()
                ),
            }
            Ok(outcome.is_success())
        }
        Command::Columns { table } => {
            let table = TableRef::parse(&table);
            match discover_mapping(&store, &table).await? {
                Some(mapping) => println!("{}", mapping),
                None => println!("❌ {} has no usable address/state columns", table),
            }
            Ok(true)
        }
        Command::Consolidate { input, push } => {
            let request: ConsolidateRequest = read_json(&input)?;
            let records = records_from_json(request.internal_matches)?;
            let golden = golden_from(request.golden_source_address)?;
            let scenario = Scenario::from_id(request.scenario.unwrap_or(1));
            if push {
                let outcome = push_updates(&ctx, &records, golden.as_ref(), scenario).await;
                emit(&outcome, "result")
            } else {
                let outcome = consolidate(&records, golden.as_ref(), scenario);
                emit(&outcome.map(|c| c.record), "consolidated_record")
            }
        }
        Command::WriteGolden { input } => {
            let request: WriteGoldenRequest = read_json(&input)?;
            let golden = golden_from(request.golden_source_record)?
                .ok_or_else(|| anyhow!("golden_source_record is required"))?;
            let outcome = write_golden_to_internal(&ctx, &golden).await;
            emit(&outcome, "result")
        }
        Command::TimeSaved => {
            let outcome = time_saved_hours(&ctx).await;
            emit(&outcome, "hours_saved")
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    load_env();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
