//! Planet prison bot.
//!
//! # Usage
//!
//! ```bash
//! # Run with a config file, reading console commands from stdin
//! cargo run -p prison_bot -- run --config config/bot.ron
//!
//! # Override the login and planet from the command line
//! cargo run -p prison_bot -- run --recovery-code 123456 --planet mars --start
//!
//! # Validate a config file
//! cargo run -p prison_bot -- check-config config/bot.ron
//!
//! # Compute a challenge token
//! cargo run -p prison_bot -- token 5f2a9c --algorithm sha256
//! ```
//!
//! # Console
//!
//! Input (stdin): `start`, `stop`, `travel <planet>`, `connect [code]`,
//! `disconnect`, `targets`, `quit`, one per line
//! Output (stdout): JSON updates, one per line
//! Logs (stderr): tracing output

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use prison_bot::config::BotConfig;
use prison_bot::console::ConsoleCommand;
use prison_bot::handle::BotHandle;
use prison_client::transport::WsConnector;
use prison_client::TokenAlgorithm;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "prison_bot")]
#[command(about = "Planet prison bot")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect and run the bot
    Run {
        /// Config file (RON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Recovery code, overrides the config
        #[arg(short, long)]
        recovery_code: Option<String>,

        /// Planet to join, overrides the config
        #[arg(short, long)]
        planet: Option<String>,

        /// Arm the bot immediately
        #[arg(long)]
        start: bool,
    },

    /// Parse a config file and print it back
    CheckConfig {
        /// Config file (RON)
        config: PathBuf,
    },

    /// Compute the challenge token for a seed
    Token {
        /// Challenge seed
        seed: String,

        /// Token algorithm (rolling, sha256)
        #[arg(short, long, default_value = "rolling")]
        algorithm: TokenAlgorithm,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries updates.
    let fallback = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)))
        .init();

    match cli.command {
        Commands::Run {
            config,
            recovery_code,
            planet,
            start,
        } => {
            let mut config = match config.map(BotConfig::load).transpose() {
                Ok(config) => config.unwrap_or_default(),
                Err(e) => {
                    error!("{e}");
                    return ExitCode::FAILURE;
                }
            };
            if recovery_code.is_some() {
                config.recovery_code = recovery_code;
            }
            if planet.is_some() {
                config.planet = planet;
            }
            config.auto_start |= start;
            cmd_run(config).await
        }
        Commands::CheckConfig { config } => cmd_check_config(&config),
        Commands::Token { seed, algorithm } => {
            println!("{}", algorithm.token(&seed));
            ExitCode::SUCCESS
        }
    }
}

async fn cmd_run(config: BotConfig) -> ExitCode {
    let mut last_code = config.recovery_code.clone();
    info!(endpoint = %config.endpoint, planet = ?config.planet, "starting bot");

    let (handle, mut updates, task) = prison_bot::spawn(config, WsConnector);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Some(update) => emit(&update),
                None => break,
            },
            line = lines.next_line() => match line {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => match line.parse::<ConsoleCommand>() {
                    Ok(ConsoleCommand::Quit) => break,
                    Ok(command) => {
                        if !run_command(&handle, command, &mut last_code).await {
                            break;
                        }
                    }
                    Err(e) => warn!("{e}"),
                },
                Ok(None) => break,
                Err(e) => {
                    error!(error = %e, "stdin");
                    break;
                }
            },
        }
    }

    if handle.shutdown().is_ok() {
        // Flush whatever the worker reports while closing.
        while let Some(update) = updates.recv().await {
            emit(&update);
        }
    }
    match task.await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "worker task failed");
            ExitCode::FAILURE
        }
    }
}

// Returns `false` once the worker is gone.
async fn run_command(
    handle: &BotHandle,
    command: ConsoleCommand,
    last_code: &mut Option<String>,
) -> bool {
    let sent = match command {
        ConsoleCommand::Start => handle.start(),
        ConsoleCommand::Stop => handle.stop(),
        ConsoleCommand::Travel(planet) => handle.join_planet(planet),
        ConsoleCommand::Connect(code) => {
            if code.is_some() {
                *last_code = code;
            }
            match last_code.clone() {
                Some(code) => handle.connect(code),
                None => {
                    warn!("no recovery code, use `connect <code>`");
                    Ok(())
                }
            }
        }
        ConsoleCommand::Disconnect => handle.disconnect(),
        ConsoleCommand::Targets => handle.targets().await.map(|report| emit(&report)),
        ConsoleCommand::Quit => Ok(()),
    };
    sent.is_ok()
}

fn cmd_check_config(path: &Path) -> ExitCode {
    match BotConfig::load(path).and_then(|config| config.to_ron_string()) {
        Ok(text) => {
            println!("{text}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn emit<T: Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(json) => println!("{json}"),
        Err(e) => error!(error = %e, "failed to encode output"),
    }
}
