use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

mod analysis;
mod config;
mod csv_source;
mod db;
mod error;
mod export;
mod models;
mod server;
mod source;
#[cfg(test)]
mod test_support;

use source::RowSource;

#[derive(Parser)]
#[command(name = "survey-analytics")]
#[command(about = "Survey response analysis and spreadsheet export", long_about = None)]
struct Cli {
    /// trace, debug, info, warn or error
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// Read answers from a CSV file instead of Postgres
    #[arg(long)]
    answers_csv: Option<PathBuf>,
    /// Canonical question list for the CSV source
    #[arg(long, requires = "answers_csv")]
    questions_csv: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the analysis and download endpoints
    Serve {
        #[arg(long, default_value = config::DEFAULT_BIND)]
        bind: String,
        #[arg(long)]
        cors_origin: Option<String>,
        #[arg(long, default_value_t = config::DEFAULT_MAX_CONNECTIONS)]
        max_connections: u32,
    },
    /// Print the per-respondent-type analysis of an event as JSON
    Analyze {
        #[arg(long)]
        event_id: i64,
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Write the survey results of an event to an xlsx workbook
    Export {
        #[arg(long)]
        event_id: i64,
        #[arg(long)]
        out: Option<PathBuf>,
        #[command(flatten)]
        source: SourceArgs,
    },
}

fn setup_logging(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sqlx=warn,{}", log_level.to_lowercase())));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn open_source(args: SourceArgs) -> anyhow::Result<Arc<dyn RowSource>> {
    if let Some(answers) = args.answers_csv {
        return Ok(Arc::new(csv_source::CsvRowSource::new(
            answers,
            args.questions_csv,
        )));
    }

    let database_url = config::database_url()?;
    let pool = PgPoolOptions::new()
        .max_connections(config::DEFAULT_MAX_CONNECTIONS)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;
    Ok(Arc::new(db::PgRowSource::new(pool)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    match cli.command {
        Commands::Serve {
            bind,
            cors_origin,
            max_connections,
        } => {
            let config = config::ServerConfig::resolve(&bind, cors_origin, max_connections)?;
            server::start_server(config).await?;
        }
        Commands::Analyze { event_id, source } => {
            let source = open_source(source).await?;
            let rows = source.answer_rows(event_id).await?;

            match analysis::analyze(event_id, &rows) {
                Ok(result) => println!("{}", serde_json::to_string_pretty(&result)?),
                Err(err) if err.is_no_data() => println!("{err}"),
                Err(err) => return Err(err.into()),
            }
        }
        Commands::Export {
            event_id,
            out,
            source,
        } => {
            let source = open_source(source).await?;
            let rows = source.answer_rows(event_id).await?;
            let columns = source.question_columns(event_id).await?;

            let bytes = match export::export_workbook(event_id, &rows, &columns) {
                Ok(bytes) => bytes,
                Err(err) if err.is_no_data() => {
                    println!("{err}");
                    return Ok(());
                }
                Err(err) => return Err(err.into()),
            };

            let out = out.unwrap_or_else(|| PathBuf::from(export::export_file_name(event_id)));
            std::fs::write(&out, bytes)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Workbook written to {}.", out.display());
        }
    }

    Ok(())
}
