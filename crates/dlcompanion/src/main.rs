//! dlcompanion - inspect and reset the device lock app's private data
//! through an elevated shell.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dlc_core::{BackupPolicy, ClearStrategy, Companion, CompanionConfig, InterpreterConfig};
use dlc_report_schema::ActivityLog;
use serde::Serialize;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "dlcompanion")]
#[command(
    author,
    version,
    about = "Inspect and reset the device lock app's private data through an elevated shell"
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (json, text)
    #[arg(long, global = true, default_value = "text")]
    format: String,

    /// Emit diagnostics as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Print the activity log after the command
    #[arg(long, global = true)]
    show_log: bool,

    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Elevated interpreter program (default: su)
    #[arg(long, global = true)]
    interpreter: Option<String>,

    /// Argument passed to the interpreter (repeatable)
    #[arg(long = "interpreter-arg", global = true, allow_hyphen_values = true)]
    interpreter_args: Vec<String>,

    /// Vendor package name
    #[arg(long, global = true)]
    package: Option<String>,

    /// Parent directory of app data directories
    #[arg(long, global = true)]
    data_root: Option<String>,

    /// Directory under which backups are created
    #[arg(long, global = true)]
    backup_root: Option<String>,

    /// Per-command timeout in milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether an elevated interpreter is available
    Probe,

    /// Show root availability and whether the package is installed
    Status,

    /// Dump the app's shared preference files
    DumpPrefs,

    /// Dump the table schemas of the app's databases
    DumpDbs,

    /// Back up and then wipe the app's registration data
    Wipe {
        /// Skip the interactive confirmation
        #[arg(long)]
        yes: bool,

        /// Clear strategy (rm, pm-clear)
        #[arg(long)]
        strategy: Option<String>,

        /// Clear even if a backup copy failed
        #[arg(long)]
        best_effort: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    if cli.log_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_target(false).with_writer(std::io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .with(filter)
            .init();
    }

    let json = match cli.format.as_str() {
        "json" => true,
        "text" => false,
        other => anyhow::bail!("Invalid output format: {}", other),
    };

    let log = Arc::new(ActivityLog::new());
    let outcome = match build_config(&cli) {
        Ok(config) => run(&cli.command, config, log.clone(), json).await,
        Err(e) => Err(e),
    };

    if cli.show_log {
        if json {
            eprintln!("{}", log.to_jsonl());
        } else {
            eprintln!("--- activity log ---");
            for entry in log.entries() {
                eprintln!("{}", entry);
            }
        }
    }

    match outcome {
        Err(e) if json => {
            eprintln!("{}", serde_json::to_string_pretty(&error_payload(&e))?);
            std::process::exit(1);
        }
        other => other,
    }
}

async fn run(
    command: &Commands,
    config: CompanionConfig,
    log: Arc<ActivityLog>,
    json: bool,
) -> Result<()> {
    let companion = Arc::new(Companion::new(config, log).context("Invalid configuration")?);

    match command {
        Commands::Probe => {
            let has_root = blocking(&companion, |c| c.check_access()).await?;
            if json {
                print_json(&serde_json::json!({ "root_available": has_root }))?;
            } else if has_root {
                println!("Root access available");
            } else {
                println!("Root access not available");
            }
            if !has_root {
                anyhow::bail!("No elevated interpreter");
            }
        }

        Commands::Status => {
            let status = blocking(&companion, |c| c.package_status())
                .await?
                .context("Failed to check package status")?;
            if json {
                print_json(&status)?;
            } else {
                print!("{}", status.render());
            }
        }

        Commands::DumpPrefs => {
            let report = blocking(&companion, |c| c.dump_shared_preferences())
                .await?
                .context("Failed to read shared preferences")?;
            if json {
                print_json(&report)?;
            } else {
                print!("{}", report.render());
            }
        }

        Commands::DumpDbs => {
            let report = blocking(&companion, |c| c.dump_database_schemas())
                .await?
                .context("Failed to read databases")?;
            if json {
                print_json(&report)?;
            } else {
                print!("{}", report.render());
            }
        }

        Commands::Wipe { yes, .. } => {
            if !yes && !confirm_wipe(&companion.config().package)? {
                println!("Aborted");
                return Ok(());
            }

            info!("Wipe confirmed for {}", companion.config().package);
            let transcript = blocking(&companion, |c| c.wipe()).await?;
            if json {
                print_json(&transcript)?;
            } else {
                print!("{}", transcript.render());
            }
            if !transcript.overall_succeeded {
                anyhow::bail!("Wipe did not complete");
            }
        }
    }

    Ok(())
}

/// Run a blocking companion operation off the async runtime threads.
async fn blocking<T, F>(companion: &Arc<Companion>, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&Companion) -> T + Send + 'static,
{
    let companion = Arc::clone(companion);
    tokio::task::spawn_blocking(move || f(&companion))
        .await
        .context("Companion task panicked")
}

fn build_config(cli: &Cli) -> Result<CompanionConfig> {
    let mut config = match &cli.config {
        Some(path) => CompanionConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {:?}", path))?,
        None => CompanionConfig::default(),
    };

    if let Some(program) = &cli.interpreter {
        config.interpreter = InterpreterConfig::new(program, cli.interpreter_args.clone());
    } else if !cli.interpreter_args.is_empty() {
        config.interpreter.args = cli.interpreter_args.clone();
    }
    if let Some(package) = &cli.package {
        config.package = package.clone();
    }
    if let Some(data_root) = &cli.data_root {
        config.data_root = data_root.clone();
    }
    if let Some(backup_root) = &cli.backup_root {
        config.backup_root = backup_root.clone();
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.command_timeout_ms = timeout_ms;
    }

    if let Commands::Wipe {
        strategy,
        best_effort,
        ..
    } = &cli.command
    {
        if let Some(strategy) = strategy {
            config.clear_strategy = strategy.parse::<ClearStrategy>()?;
        }
        if *best_effort {
            config.backup_policy = BackupPolicy::BestEffort;
        }
    }

    Ok(config)
}

fn confirm_wipe(package: &str) -> Result<bool> {
    eprint!(
        "This backs up and then DELETES the data of {}.\nType WIPE to continue: ",
        package
    );
    std::io::stderr().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim() == "WIPE")
}

/// JSON form of a failed command, keyed by the library error code when there is one.
fn error_payload(err: &anyhow::Error) -> serde_json::Value {
    let code = err
        .downcast_ref::<dlc_common::Error>()
        .map(|e| e.code())
        .unwrap_or("failed");
    serde_json::json!({
        "error": {
            "code": code,
            "message": format!("{:#}", err),
        }
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
