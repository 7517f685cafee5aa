use std::io::{BufRead, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;

use sqlcheck::config::Config;
use sqlcheck::coordinator::{Coordinator, CoordinatorSnapshot};
use sqlcheck::input::{parse_command, read_source, Command, FileWatcher};
use sqlcheck::model::{is_known_dialect, ValidationRequest, ValidationResult, KNOWN_DIALECTS};
use sqlcheck::projector::project;
use sqlcheck::render::{Frame, TerminalRenderer};
use sqlcheck::service::{HttpValidationService, ValidationService};
use sqlcheck::{logging, shutdown};

const WATCH_HELP: &str = "Commands: :dialect <name>  switch dialect | :quit  exit";

#[derive(Debug, Parser)]
#[command(name = "sqlcheck", version, about = "Validate SQL against a validation service")]
struct Cli {
    /// Config file (default: ~/.config/sqlcheck/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override the validation service base URL
    #[arg(long, global = true, value_name = "URL")]
    url: Option<String>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Validate a file (or stdin) once
    Check {
        /// SQL file; reads stdin when omitted
        file: Option<PathBuf>,

        /// SQL dialect (mysql, postgres, oracle, ansi)
        #[arg(long)]
        dialect: Option<String>,

        /// Print the normalized result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Watch a file and validate it on every change
    Watch {
        /// SQL file to watch
        file: PathBuf,

        /// SQL dialect (mysql, postgres, oracle, ansi)
        #[arg(long)]
        dialect: Option<String>,

        /// Quiet period after the last change, in milliseconds
        #[arg(long, value_name = "MS")]
        debounce_ms: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    logging::init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(url) = cli.url {
        config.service.base_url = url;
    }

    match cli.command {
        CliCommand::Check {
            file,
            dialect,
            json,
        } => {
            if let Some(dialect) = dialect {
                config.editor.dialect = dialect;
            }
            config.validate()?;
            check(&config, file.as_deref(), json).await
        }
        CliCommand::Watch {
            file,
            dialect,
            debounce_ms,
        } => {
            if let Some(dialect) = dialect {
                config.editor.dialect = dialect;
            }
            if let Some(debounce_ms) = debounce_ms {
                config.editor.debounce_ms = debounce_ms;
            }
            config.validate()?;
            watch(&config, &file).await
        }
    }
}

async fn check(config: &Config, file: Option<&Path>, json: bool) -> Result<ExitCode> {
    let text = match file {
        Some(path) => read_source(path)?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read SQL from stdin")?;
            buffer
        }
    };
    if text.trim().is_empty() {
        bail!("Nothing to validate: input is empty");
    }

    let service = HttpValidationService::new(&config.service)?;
    let request = ValidationRequest {
        text,
        dialect: config.editor.dialect.clone(),
        request_id: 1,
    };
    let result = service.validate(&request).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        let projection = project(Some(&result));
        let stdout = std::io::stdout();
        let color = stdout.is_terminal();
        let mut renderer = TerminalRenderer::new(stdout).with_color(color);
        renderer.render(&Frame {
            source: Some(request.text.as_str()),
            dialect: &request.dialect,
            is_loading: false,
            projection: &projection,
        })?;
    }

    let code = match &result {
        ValidationResult::Success(report) if report.valid => ExitCode::SUCCESS,
        ValidationResult::Success(_) => ExitCode::from(1),
        ValidationResult::Failure(_) => ExitCode::from(2),
    };
    Ok(code)
}

async fn watch(config: &Config, file: &Path) -> Result<ExitCode> {
    let service: Arc<dyn ValidationService> = Arc::new(HttpValidationService::new(&config.service)?);
    let handle = Coordinator::spawn(service, Duration::from_millis(config.editor.debounce_ms));

    let (change_tx, mut change_rx) = mpsc::unbounded_channel();
    let _watcher = FileWatcher::start(file, change_tx)?;

    let interactive = std::io::stdout().is_terminal();
    let mut renderer = TerminalRenderer::new(std::io::stdout())
        .with_color(interactive)
        .with_clear(interactive);

    let mut dialect = config.editor.dialect.clone();
    let mut source = read_source(file)?;
    let mut notice = Some(WATCH_HELP.to_string());
    handle.edit(source.clone(), dialect.clone());

    let mut snapshots = handle.subscribe();
    let mut commands = spawn_stdin_reader()?;
    let mut stdin_open = true;

    let signal = shutdown::wait_for_signal();
    tokio::pin!(signal);

    loop {
        draw(&mut renderer, &handle.snapshot(), &source, &dialect, notice.as_deref())?;

        tokio::select! {
            result = &mut signal => {
                if let Err(err) = result {
                    tracing::warn!(error = %err, "Signal handler failed");
                }
                break;
            }

            Some(()) = change_rx.recv() => match read_source(file) {
                Ok(text) if text != source => {
                    source = text;
                    handle.edit(source.clone(), dialect.clone());
                }
                Ok(_) => {}
                Err(err) => tracing::warn!(error = %err, "Failed to re-read watched file"),
            },

            line = commands.recv(), if stdin_open => match line {
                Some(line) => match parse_command(&line) {
                    Some(Command::Quit) => break,
                    Some(Command::Dialect(name)) => {
                        notice = if is_known_dialect(&name) {
                            None
                        } else {
                            Some(format!(
                                "Unknown dialect '{}' (known: {}), sending it anyway",
                                name,
                                KNOWN_DIALECTS.join(", ")
                            ))
                        };
                        dialect = name;
                        handle.edit(source.clone(), dialect.clone());
                    }
                    Some(Command::Help) => notice = Some(WATCH_HELP.to_string()),
                    Some(Command::Unknown(input)) => {
                        notice = Some(format!("Unknown command '{}'. {}", input, WATCH_HELP));
                    }
                    None => {}
                },
                None => stdin_open = false,
            },

            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    handle.dispose().await;
    Ok(ExitCode::SUCCESS)
}

/// Forward stdin lines from a plain thread.
///
/// A blocking read on a runtime thread would hold up shutdown until the
/// next newline; a detached thread does not.
fn spawn_stdin_reader() -> Result<mpsc::UnboundedReceiver<String>> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::Builder::new()
        .name("stdin-commands".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "Failed to read stdin");
                        break;
                    }
                }
            }
        })
        .context("Failed to spawn stdin reader")?;
    Ok(rx)
}

fn draw<W: Write>(
    renderer: &mut TerminalRenderer<W>,
    snapshot: &CoordinatorSnapshot,
    source: &str,
    dialect: &str,
    notice: Option<&str>,
) -> Result<()> {
    let projection = project(snapshot.last_result.as_ref());
    renderer.render(&Frame {
        source: Some(source),
        dialect,
        is_loading: snapshot.is_loading,
        projection: &projection,
    })?;
    if let Some(notice) = notice {
        println!("{}", notice);
    }
    Ok(())
}
