#![forbid(unsafe_code)]

//! # Popup CLI
//!
//! Runs a popup document on the console and prints how it closed.
//!
//! ## Usage
//!
//! ```bash
//! popup signup.toml          # Ask on stderr, print the result on stdout
//! popup --check signup.json  # Only validate the document
//! popup -vv signup.toml      # With debug logging
//! ```
//!
//! The result is one JSON object on stdout:
//!
//! ```json
//! {"button":0,"timed_out":false,"values":{"0":"Ada","email":"ada@example.com"}}
//! ```
//!
//! The exit status is 2 when the popup timed out with invalid fields and
//! therefore closed without a result.

mod console;
mod prompt;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc;
use std::thread;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use popup::{Popup, PopupDocument};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use console::ConsoleBridge;

/// Exit status when the popup closed without reporting a result.
const NO_RESULT: u8 = 2;

/// Run a popup document on the console.
#[derive(Parser, Debug)]
#[command(name = "popup", author, version, about = "Run a popup document on the console")]
struct Cli {
    /// Popup document (JSON if the extension is `.json`, TOML otherwise)
    file: PathBuf,

    /// Only load and check the document, then print `ok`
    #[arg(long)]
    check: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("popup: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr. `RUST_LOG` applies unless `-v` is given.
fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let document = PopupDocument::from_path(&cli.file)
        .with_context(|| format!("failed to load {}", cli.file.display()))?;
    let config = document
        .into_config()
        .context("invalid popup document")?;

    if cli.check {
        config.check().context("invalid popup document")?;
        println!("ok");
        return Ok(ExitCode::SUCCESS);
    }

    let (tx, rx) = mpsc::channel();
    let config = config.on_done(move |event| {
        let _ = tx.send(event);
    });
    let popup = Popup::open(config, ConsoleBridge::new(io::stderr()))
        .context("failed to open popup")?;

    let driver = popup.clone();
    thread::Builder::new()
        .name("popup-input".to_string())
        .spawn(move || {
            if let Err(err) = prompt::drive(&driver, io::stdin().lock(), io::stderr()) {
                warn!(error = %err, "console input failed");
            }
        })
        .context("failed to start the input thread")?;

    // The sender lives in the completion callback, which the session drops
    // unused when it closes without a result.
    match rx.recv() {
        Ok(event) => {
            debug!(button = ?event.button_index(), "popup reported");
            println!("{}", serde_json::to_string(&event)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(_) => {
            eprintln!("popup: closed without a result");
            Ok(ExitCode::from(NO_RESULT))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_flags() {
        let cli = Cli::try_parse_from(["popup", "--check", "-vv", "doc.toml"]).unwrap();
        assert!(cli.check);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.file, PathBuf::from("doc.toml"));
    }

    #[test]
    fn test_file_is_required() {
        assert!(Cli::try_parse_from(["popup"]).is_err());
    }
}
