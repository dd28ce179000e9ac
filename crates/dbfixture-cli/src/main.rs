//! dbfixture CLI - load, dump and compare JSON database fixtures.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use dbfixture::error::ResultExt;
use dbfixture::{
    compare, Config, ConfigOverrides, DriverImpl, FixtureError, Orchestrator, Outcome, TableRows,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::instrument::WithSubscriber;
use tracing::{dispatcher, info, Dispatch, Level};

#[derive(Parser)]
#[command(name = "dbfixture")]
#[command(about = "Load, dump and compare JSON database fixtures")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, env = "DBFIXTURE_CONFIG")]
    config: Option<PathBuf>,

    /// Database driver: mysql, postgres, sqlite or spanner
    #[arg(long, env = "DBFIXTURE_DRIVER")]
    driver: Option<String>,

    /// Connection URL
    #[arg(long, env = "DBFIXTURE_URL", hide_env_values = true)]
    url: Option<String>,

    /// TLS mode: disable, require, verify-ca or verify-full
    #[arg(long)]
    ssl_mode: Option<String>,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "warn")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Dump tables as JSON. Reads a JSON array of table names.
    Dump {
        /// Read the table list from a file instead of stdin
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Write the dump to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Indent the output
        #[arg(long)]
        pretty: bool,
    },

    /// Replace table contents with fixture rows. Reads a JSON array of
    /// {"name": <table>, "rows": [...]} entries.
    Init {
        /// Read the fixture from a file instead of stdin
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Load referenced tables before the tables that reference them
        #[arg(long)]
        sort_by_references: bool,
    },

    /// Compare two JSON documents
    Compare {
        /// Expected document
        expected: PathBuf,

        /// Actual document
        actual: PathBuf,

        /// Treat a superset match as a mismatch
        #[arg(long)]
        strict: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<ExitCode, FixtureError> {
    let cli = Cli::parse();
    let dispatch = setup_logging(&cli.verbosity, &cli.log_format)?;

    if let Commands::Compare {
        expected,
        actual,
        strict,
    } = &cli.command
    {
        return run_compare(expected, actual, *strict).await;
    }

    let config = Config::resolve(cli.config.as_deref(), overrides(&cli)?)?;
    dispatcher::with_default(&dispatch, || {
        info!(driver = %config.driver, url = %config.redacted_url(), ssl_mode = %config.ssl_mode, "resolved configuration");
    });

    let db = DriverImpl::connect(config.driver, &config.url, config.ssl_mode)
        .with_subscriber(dispatch.clone())
        .await?;
    let mut orchestrator = Orchestrator::new(db).with_dispatch(dispatch);

    match cli.command {
        Commands::Dump {
            input,
            output,
            pretty,
        } => {
            let bytes = read_input(input.as_deref()).await?;
            let tables: Vec<String> =
                serde_json::from_slice(&bytes).context("input", "table name array")?;
            let dumped = orchestrator.dump(&tables).await?;

            let mut text = if pretty {
                serde_json::to_vec_pretty(&dumped)?
            } else {
                serde_json::to_vec(&dumped)?
            };
            text.push(b'\n');
            write_output(output.as_deref(), &text).await?;
        }

        Commands::Init {
            input,
            sort_by_references,
        } => {
            let bytes = read_input(input.as_deref()).await?;
            let entries: Vec<TableRows> =
                serde_json::from_slice(&bytes).context("input", "fixture array")?;
            orchestrator.init(&entries, sort_by_references).await?;
        }

        Commands::Compare { .. } => unreachable!(), // Handled above
    }

    Ok(ExitCode::SUCCESS)
}

fn overrides(cli: &Cli) -> Result<ConfigOverrides, FixtureError> {
    Ok(ConfigOverrides {
        driver: cli.driver.as_deref().map(str::parse).transpose()?,
        url: cli.url.clone(),
        ssl_mode: cli.ssl_mode.as_deref().map(str::parse).transpose()?,
    })
}

async fn run_compare(expected: &Path, actual: &Path, strict: bool) -> Result<ExitCode, FixtureError> {
    let expected_bytes = tokio::fs::read(expected)
        .await
        .context("file", expected.display())?;
    let actual_bytes = tokio::fs::read(actual)
        .await
        .context("file", actual.display())?;

    let result = compare(&expected_bytes, &actual_bytes);
    if result.outcome == Outcome::Error {
        return Err(FixtureError::BadArgs(result.diff));
    }

    println!("{}", result.outcome);
    if !result.diff.is_empty() {
        println!("{}", result.diff);
    }

    if result.is_match(strict) {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(1))
    }
}

async fn read_input(path: Option<&Path>) -> Result<Vec<u8>, FixtureError> {
    match path {
        Some(path) => Ok(tokio::fs::read(path).await.context("file", path.display())?),
        None => {
            let mut bytes = Vec::new();
            tokio::io::stdin().read_to_end(&mut bytes).await?;
            Ok(bytes)
        }
    }
}

async fn write_output(path: Option<&Path>, bytes: &[u8]) -> Result<(), FixtureError> {
    match path {
        Some(path) => tokio::fs::write(path, bytes)
            .await
            .context("file", path.display()),
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(bytes).await?;
            stdout.flush().await?;
            Ok(())
        }
    }
}

/// Build the log subscriber. Logs go to stderr so stdout stays machine-readable.
fn setup_logging(verbosity: &str, format: &str) -> Result<Dispatch, FixtureError> {
    let level = match verbosity.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        "json" => Ok(Dispatch::new(subscriber.json().finish())),
        "text" => Ok(Dispatch::new(subscriber.finish())),
        other => Err(FixtureError::BadArgs(format!(
            "invalid log format '{}'; expected text or json",
            other
        ))),
    }
}
