//! filecast entry point: interactive command loop over the connection
//! registry.

mod commands;
mod config;

use std::io::{BufRead, Write};

use tracing_subscriber::EnvFilter;

use filecast_client::ConnectionRegistry;

use crate::commands::Command;
use crate::config::CliConfig;

const HELP_TEXT: &str = "\
Command List:
connect <ws uri>
send <connection id> <file path>
close <connection id> [<close code:default=1000>] [<close reason>]
show <connection id>
list: List known connections
help: Display this help text
quit: Exit the program
";

fn main() {
    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting filecast");

    // Load configuration.
    let cli_config = match CliConfig::load() {
        Ok(c) => {
            tracing::info!(trust_bundle = %c.trust_bundle.display(), "configuration loaded");
            c
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to load config, using defaults");
            CliConfig::default()
        }
    };

    let tls = match filecast_tls::build_tls_config(&cli_config.trust_bundle) {
        Ok(tls) => tls,
        Err(e) => {
            eprintln!("> TLS setup error: {e}");
            return;
        }
    };

    let registry = match ConnectionRegistry::new(tls) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("> {e}");
            return;
        }
    };

    run_loop(&registry, &cli_config);

    registry.shutdown();
}

fn run_loop(registry: &ConnectionRegistry, config: &CliConfig) {
    let stdin = std::io::stdin();
    let mut line = String::new();

    loop {
        print!("Enter Command: ");
        let _ = std::io::stdout().flush();

        line.clear();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("> Input error: {e}");
                break;
            }
        }

        let command = match commands::parse(&line) {
            None => continue,
            Some(Err(message)) => {
                println!("> {message}");
                continue;
            }
            Some(Ok(command)) => command,
        };

        match command {
            Command::Connect { uri } => match registry.connect(&uri) {
                Ok(id) => println!("> Created connection with id {id}"),
                Err(e) => println!("> Connect initialization error: {e}"),
            },
            Command::Send { id, path } => match registry.send(id, &path) {
                Ok(bytes) => println!("> Sent {} ({bytes} bytes)", path.display()),
                Err(e) => println!("> Error sending message: {e}"),
            },
            Command::Close { id, code, reason } => {
                let code = code.unwrap_or(config.default_close_code);
                if let Err(e) = registry.close(id, code, &reason) {
                    println!("> Error initiating close: {e}");
                }
            }
            Command::Show { id } => match registry.snapshot(id) {
                Some(record) => print!("{record}"),
                None => println!("> Unknown connection id {id}"),
            },
            Command::List => {
                let ids = registry.ids();
                if ids.is_empty() {
                    println!("> No connections");
                }
                for id in ids {
                    if let Some(record) = registry.snapshot(id) {
                        println!("> {id}: {} {}", record.status(), record.uri());
                    }
                }
            }
            Command::Help => print!("{HELP_TEXT}"),
            Command::Quit => break,
        }
    }
}
