//! Consent console — interactive host for the consent core.
//!
//! Wires the bridge to stdin/stdout against the simulated platform so the
//! full request → broadcast → validate → prompt → event round-trip can be
//! exercised from a terminal.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config
//!   3. Resolve effective log level (CLI `-v` flags > env > config)
//!   4. Init logger once
//!   5. Build the bridge and the simulated platform
//!   6. Spawn Ctrl-C → shutdown signal watcher
//!   7. Spawn the consent service loop
//!   8. Read commands from stdin until EOF or `quit`
//!   9. Cancel token + join service

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::info;

use sms_consent::bootstrap::logger;
use sms_consent::bridge::{self, ConsentEvent};
use sms_consent::consent::ConsentService;
use sms_consent::core::{config, error::AppError};
use sms_consent::platform::sim::SimPlatform;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Load .env if present — ignore errors (file is optional).
    let _ = dotenvy::dotenv();

    let args = parse_cli_args();

    let config = config::load(args.config_path.as_deref())?;

    let effective_log_level = args.log_level.unwrap_or(config.log_level.as_str());
    let force_cli_level = args.log_level.is_some();

    logger::init(effective_log_level, force_cli_level, config.log_file.as_deref())?;

    info!(
        service = %config.service_name,
        configured_log_level = %config.log_level,
        effective_log_level = %effective_log_level,
        scenario = ?config.sim.scenario,
        "config loaded"
    );

    // Shared shutdown token — Ctrl-C cancels it, all tasks watch it.
    let shutdown = CancellationToken::new();

    let ctrlc_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received — initiating shutdown");
            ctrlc_token.cancel();
        }
    });

    let (bus, handle, mut events) = bridge::channel(&config.bridge);

    let platform = SimPlatform::new(config.sim.clone());
    let service = ConsentService::new(
        platform.clone(),
        platform.clone(),
        platform,
        bus,
        &config.broker,
    );
    let service_handle = tokio::spawn(service.run(shutdown.clone()));

    // Event printer — runs until the service drops its event sender.
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                ConsentEvent::SelectedPhoneNumber(value) => {
                    println!("selectedPhoneNumber: {}", value.as_deref().unwrap_or("null"));
                }
                ConsentEvent::ReceivedSms(value) => {
                    println!("receivedSms: {}", value.as_deref().unwrap_or("null"));
                }
            }
        }
    });

    println!("─────────────────────────────────────");
    println!(" {} console  (Ctrl-C to quit)", config.service_name);
    println!("─────────────────────────────────────");
    print_usage();

    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();

    loop {
        print!("> ");
        use std::io::Write as _;
        let _ = std::io::stdout().flush();

        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                println!("\n[console] shutdown signal received");
                break;
            }

            line = lines.next_line() => {
                let input = match line {
                    Err(e) => {
                        eprintln!("stdin read error: {e}");
                        break;
                    }
                    Ok(None) => {
                        info!("stdin closed");
                        break;
                    }
                    Ok(Some(l)) => l.trim().to_string(),
                };

                if input.is_empty() {
                    continue;
                }

                let mut parts = input.split_whitespace();
                match parts.next() {
                    Some("phone") => {
                        handle
                            .request_phone_number()
                            .await
                            .map_err(|e| AppError::Bridge(e.to_string()))?;
                        println!("(requested — result arrives as an event)");
                    }
                    Some("sms") => {
                        let sender = parts.next().map(str::to_string);
                        handle
                            .request_sms(sender)
                            .await
                            .map_err(|e| AppError::Bridge(e.to_string()))?;
                        println!("(requested — result arrives as an event)");
                    }
                    Some("help") => print_usage(),
                    Some("quit") | Some("exit") => break,
                    Some(other) => println!("unknown command: {other} (try `help`)"),
                    None => {}
                }
            }
        }
    }

    shutdown.cancel();
    service_handle.await.ok();
    printer.await.ok();

    Ok(())
}

fn print_usage() {
    println!("commands:");
    println!("  phone            request a phone-number hint");
    println!("  sms [sender]     request an SMS consent session, optionally sender-scoped");
    println!("  help             show this help");
    println!("  quit             exit");
}

struct CliArgs {
    log_level: Option<&'static str>,
    config_path: Option<String>,
}

fn parse_cli_args() -> CliArgs {
    let mut verbosity = 0u8;
    let mut config_path = None;

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--" {
            break;
        }

        match arg.as_str() {
            "-h" | "--help" => {
                println!("Usage: consent-console [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -h, --help                 Print help");
                println!("  -f, --config <PATH>        Path to configuration file (default: config/default.toml)");
                println!("  -v, -vv, -vvv, -vvvv       Increase logging verbosity");
                std::process::exit(0);
            }
            "-f" | "--config" => {
                if let Some(path) = iter.next() {
                    config_path = Some(path);
                } else {
                    eprintln!("error: -f/--config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--verbose" => verbosity = verbosity.saturating_add(1),
            a if a.starts_with('-') && a.len() > 1 && a.chars().skip(1).all(|c| c == 'v') => {
                verbosity = verbosity.saturating_add((a.len() - 1) as u8);
            }
            _ => {}
        }
    }

    // Each -v raises verbosity one tier from the config default:
    //   -v      → warn   (suppress info noise, show warnings+errors only)
    //   -vv     → info   (normal operational output)
    //   -vvv    → debug  (flow-level diagnostics: sessions, signal handling)
    //   -vvvv+  → trace  (per-broadcast detail, very verbose)
    let log_level = match verbosity {
        0 => None,
        1 => Some("warn"),
        2 => Some("info"),
        3 => Some("debug"),
        _ => Some("trace"),
    };

    CliArgs {
        log_level,
        config_path,
    }
}
