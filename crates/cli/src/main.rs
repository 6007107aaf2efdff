//! Stinger CLI - operator commands over the data-access repository

mod args;
mod config;
mod handlers;
mod models;
mod quiz;
mod telemetry;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use stinger_core::application::{cancel_channel, CancellationToken, Repository};
use stinger_core::domain::{Arg, SqlValue};
use stinger_core::port::OrmContext;
use stinger_infra_sqlite::SqliteOrmContext;
use tabled::{Table, Tabled};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Settings;
use crate::models::Question;
use crate::quiz::{AnswerInput, QuizService};

#[derive(Parser)]
#[command(name = "stinger")]
#[command(about = "Stinger Data CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (default: ./stinger.toml when present)
    #[arg(long, env = "STINGER_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the procedures this instance can call
    Procedures,

    /// Call a procedure, commit, and print its output values
    Call {
        /// Exact procedure name
        name: String,

        /// Argument: <kind>:<value>, out:<kind> or null (repeatable, in order)
        #[arg(short, long = "arg")]
        args: Vec<String>,
    },

    /// Print the quiz questions with their options as JSON
    Questions,

    /// List active questions through the mapped handler
    ActiveQuestions,

    /// Register quiz answers for a user
    Answer {
        /// User ID
        #[arg(short, long)]
        user: i32,

        /// open:<question>:<text> or close:<question>:<option> (repeatable)
        #[arg(short, long = "answer", required = true)]
        answers: Vec<String>,
    },
}

#[derive(Tabled)]
struct ProcedureEntry {
    name: String,
    path: &'static str,
}

#[derive(Tabled)]
struct OutputEntry {
    position: usize,
    name: String,
    value: String,
}

#[derive(Tabled)]
struct QuestionEntry {
    id: i32,
    text: String,
    #[tabled(rename = "type")]
    kind: String,
    closed: bool,
}

fn init_logging(configured_format: &str) -> Result<()> {
    let log_format =
        std::env::var("STINGER_LOG_FORMAT").unwrap_or_else(|_| configured_format.to_string());

    let env_filter = EnvFilter::try_from_env("STINGER_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .or_else(|_| EnvFilter::try_new("stinger=info"))?;
    let telemetry = telemetry::layer()?;

    match log_format.as_str() {
        "json" => {
            // Production: JSON structured logging
            tracing_subscriber::registry()
                .with(telemetry)
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init()?;
        }
        _ => {
            // Development: Pretty formatting with colors
            tracing_subscriber::registry()
                .with(telemetry)
                .with(env_filter)
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .try_init()?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Configuration, then logging
    let settings = Settings::load(cli.config.as_deref())?;
    init_logging(&settings.log_format)?;
    info!("Stinger Data v{} starting...", stinger_core::VERSION);

    // 2. Store and repository (DI wiring)
    let context = SqliteOrmContext::connect(
        &settings.database_url,
        &settings.pool,
        settings.procedures.clone(),
    )
    .await
    .with_context(|| format!("Failed to open {}", settings.database_url))?;
    let context: Arc<dyn OrmContext> = Arc::new(context);
    let repository = Arc::new(Repository::with_procedures(
        context,
        Arc::new(handlers::registry()),
    ));

    // 3. Ctrl-C cancels the running operation
    let (handle, cancel) = cancel_channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            handle.cancel();
        }
    });

    let result = run(cli.command, &settings, repository, &cancel).await;
    telemetry::shutdown();
    result
}

async fn run(
    command: Commands,
    settings: &Settings,
    repository: Arc<Repository>,
    cancel: &CancellationToken,
) -> Result<()> {
    match command {
        Commands::Procedures => {
            let mut entries: Vec<ProcedureEntry> = repository
                .procedures()
                .names()
                .map(|name| ProcedureEntry {
                    name: name.to_string(),
                    path: "mapped",
                })
                .collect();
            entries.extend(settings.procedures.names().into_iter().map(|name| ProcedureEntry {
                name: name.to_string(),
                path: "raw",
            }));
            entries.sort_by(|a, b| a.name.cmp(&b.name));
            println!("{}", Table::new(entries));
        }

        Commands::Call { name, args } => {
            let args = args
                .iter()
                .map(|raw| args::parse_arg(raw))
                .collect::<Result<Vec<Arg>>>()?;

            let outcome = match repository.call_procedure(&name, args, cancel).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    // The token may be the one that just fired
                    repository.rollback(&CancellationToken::none()).await?;
                    return Err(e.into());
                }
            };
            repository.commit(cancel).await?;

            println!(
                "{}",
                format!("✓ {} completed ({} path)", name, outcome.path).green().bold()
            );
            if !outcome.outputs.is_empty() {
                let entries: Vec<OutputEntry> = outcome
                    .outputs
                    .iter()
                    .map(|(slot, value)| OutputEntry {
                        position: slot.position,
                        name: format!("@{}", slot.name),
                        value: value.map(SqlValue::to_string).unwrap_or_else(|| "NULL".to_string()),
                    })
                    .collect();
                println!("{}", Table::new(entries));
            }
        }

        Commands::Questions => {
            let questions = QuizService::new(repository.clone()).questions(cancel).await?;
            repository.rollback(cancel).await?;
            println!("{}", serde_json::to_string_pretty(&questions)?);
        }

        Commands::ActiveQuestions => {
            let questions: Vec<Question> = repository
                .get_data_by_procedure(handlers::GET_ACTIVE_QUESTIONS, Vec::new(), cancel)
                .await?;
            let entries: Vec<QuestionEntry> = questions
                .into_iter()
                .map(|q| QuestionEntry {
                    id: q.question_id,
                    text: q.question_text,
                    kind: q.question_type,
                    closed: q.is_closed,
                })
                .collect();
            println!("{}", Table::new(entries));
        }

        Commands::Answer { user, answers } => {
            let answers = answers
                .iter()
                .map(|raw| AnswerInput::parse(raw))
                .collect::<Result<Vec<_>>>()?;
            let summary = QuizService::new(repository)
                .register_answers(user, answers, cancel)
                .await?;
            println!("{}", format!("✓ {}", summary.message).green().bold());
        }
    }
    Ok(())
}
