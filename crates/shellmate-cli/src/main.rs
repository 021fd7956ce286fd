use std::io;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use clap::Subcommand;
use shellmate_core::actions::UserAction;
use shellmate_core::state::OutputLevel;
use shellmate_core::state::Stage;
use shellmate_exec::gateway::GatewaySettings;
use shellmate_exec::gateway::GeminiGateway;
use shellmate_exec::runner::ShellRunner;
use tracing::info;

mod logging;
mod runtime;
mod settings;
mod ui;

use logging::LogTarget;
use runtime::Session;
use settings::Settings;

/// Slack on top of the HTTP timeout before a headless wait gives up.
const WAIT_SLACK: Duration = Duration::from_secs(5);

type LiveSession = Session<GeminiGateway, ShellRunner>;

#[derive(Parser)]
#[command(name = "shellmate")]
#[command(version)]
#[command(about = "Turn plain-language requests into shell commands")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (defaults to <config dir>/shellmate/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive terminal UI (default)
    Tui,
    /// Generate one command and print it
    Ask {
        /// Request in plain language; read from stdin when omitted
        query: Vec<String>,
        /// Run the command after confirmation
        #[arg(long)]
        execute: bool,
        /// Copy the command to the clipboard
        #[arg(long)]
        copy: bool,
        /// Print the final workflow snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Explain an existing command
    Explain {
        #[arg(required = true)]
        command: Vec<String>,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Tui);

    let target = match command {
        Commands::Tui => LogTarget::File,
        _ => LogTarget::Stderr,
    };
    if let Some(path) = logging::init(target, cli.debug)? {
        eprintln!("shellmate: logging to {}", path.display());
    }

    let settings = settings::load(cli.config.as_deref())?;
    if let Some(source) = &settings.source {
        info!(path = %source.display(), "using config file");
    }
    let wait_limit = Some(Duration::from_secs(settings.config.model.timeout_secs) + WAIT_SLACK);
    let mut session = build_session(&settings)?;

    match command {
        Commands::Tui => {
            ui::run(&mut session)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Ask {
            query,
            execute,
            copy,
            json,
        } => {
            let query = if query.is_empty() {
                read_query()?
            } else {
                query.join(" ")
            };
            ask(&mut session, query, execute, copy, json, wait_limit)
        }
        Commands::Explain { command } => explain(&mut session, command.join(" "), wait_limit),
    }
}

fn build_session(settings: &Settings) -> anyhow::Result<LiveSession> {
    let gateway = GeminiGateway::new(GatewaySettings::from_config(
        &settings.config.model,
        settings.api_key.clone(),
    ))
    .context("failed to set up request gateway")?;
    let runner = match &settings.config.shell.program {
        Some(program) => ShellRunner::with_program(program.clone()),
        None => ShellRunner::new(),
    };
    Ok(Session::new(Arc::new(gateway), Arc::new(runner)))
}

fn read_query() -> anyhow::Result<String> {
    print!("Enter your request: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("failed to read request from stdin")?;
    Ok(line.trim().to_string())
}

fn prompt_approval(command: &str) -> io::Result<bool> {
    print!("Run `{command}`? [y/N]: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes" | "YES"))
}

/// Prints output lines after `mark`; Error lines go to stderr.
fn print_output_since(session: &LiveSession, mark: u64) {
    for entry in session.output_since(mark) {
        match entry.level {
            OutputLevel::Info => println!("{}", entry.message),
            OutputLevel::Error => eprintln!("{}", entry.message),
        }
    }
}

fn ask(
    session: &mut LiveSession,
    query: String,
    execute: bool,
    copy: bool,
    json: bool,
    wait_limit: Option<Duration>,
) -> anyhow::Result<ExitCode> {
    session.submit(UserAction::Submit(query));
    if !session.wait_idle(wait_limit) {
        anyhow::bail!("timed out waiting for the generation service");
    }

    let snapshot = session.snapshot();
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&snapshot).context("failed to encode snapshot")?
        );
    }

    match snapshot.stage {
        Stage::Ready => {}
        Stage::Error => {
            if let Some(error) = &snapshot.last_error {
                eprintln!("{}: {}", error.kind.label(), error.message);
            }
            return Ok(ExitCode::FAILURE);
        }
        _ => {
            // Quick scan and rejected queries leave their message in the output log.
            print_output_since(session, 0);
            return Ok(if snapshot.stage == Stage::Idle && snapshot.query.is_some() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            });
        }
    }

    let Some(command) = snapshot.command else {
        return Ok(ExitCode::FAILURE);
    };
    if !json {
        println!("{command}");
    }

    if copy {
        let mark = session.last_output_seq();
        session.submit(UserAction::Copy);
        print_output_since(session, mark);
    }

    if execute {
        if !prompt_approval(&command)? {
            println!("Aborted.");
            return Ok(ExitCode::SUCCESS);
        }
        let mark = session.last_output_seq();
        session.submit(UserAction::Execute);
        session.wait_idle(None);
        print_output_since(session, mark);
    }

    Ok(ExitCode::SUCCESS)
}

fn explain(
    session: &mut LiveSession,
    command: String,
    wait_limit: Option<Duration>,
) -> anyhow::Result<ExitCode> {
    let mark = session.last_output_seq();
    session.submit(UserAction::SelectFromHistory(command));
    session.submit(UserAction::Explain);
    if !session.wait_idle(wait_limit) {
        anyhow::bail!("timed out waiting for the generation service");
    }
    print_output_since(session, mark);

    let failed = session
        .output_since(mark)
        .iter()
        .any(|entry| entry.level == OutputLevel::Error);
    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
