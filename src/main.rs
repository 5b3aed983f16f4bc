//! `dns-gateway` command line.
//!
//! ```bash
//! # Gateway for your own TLD, records in records.json
//! dns-gateway authoritative --records records.json
//!
//! # Entry point resolving through the registry
//! dns-gateway -c gateway.toml recursive --listen 127.0.0.1:5354
//!
//! # One-off lookup
//! dns-gateway resolve example.owndomain
//! ```

use clap::{Parser, Subcommand};
use dns_gateway::server::{self, authoritative, recursive};
use dns_gateway::{Config, RecordStore, ResolutionEngine, ResolutionError, Resolver};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Custom TLD resolution through a community gateway registry.
#[derive(Parser, Debug)]
#[command(name = "dns-gateway", author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, global = true, env = "DNS_GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve a local record table over the query protocol
    Authoritative {
        /// Listen address, overrides the config file
        #[arg(short, long)]
        listen: Option<String>,

        /// JSON records file, overrides the config file
        #[arg(short, long)]
        records: Option<PathBuf>,
    },
    /// Serve the query protocol by resolving through the registry
    Recursive {
        /// Listen address, overrides the config file
        #[arg(short, long)]
        listen: Option<String>,
    },
    /// Resolve one hostname and print the address
    Resolve {
        /// Hostname to resolve
        hostname: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("dns-gateway: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => Config::default(),
    };

    if let Err(e) = dns_gateway::logging::init_logging(&config.logging, args.verbose) {
        eprintln!("dns-gateway: failed to initialize logging: {e}");
    }

    match run(args.command, config).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "dns-gateway failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, config: Config) -> dns_gateway::Result<ExitCode> {
    match command {
        Command::Authoritative { listen, records } => {
            let listen = listen.unwrap_or(config.authoritative.listen);
            let store = match records.or(config.authoritative.records_path) {
                Some(path) => RecordStore::load(path),
                None => RecordStore::in_memory(dns_gateway::records::default_records()),
            };
            tracing::info!(
                entries = store.snapshot().len(),
                patterns = ?store.snapshot().patterns(),
                "Starting authoritative server"
            );
            let listener = TcpListener::bind(listen.as_str()).await?;
            let router = authoritative::router(Arc::new(store), config.authoritative.ttl);
            server::serve(listener, router).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Recursive { listen } => {
            let listen = listen.unwrap_or(config.recursive.listen);
            let engine = Arc::new(ResolutionEngine::new(config.engine)?);
            if engine.config().refresh_mode.background() {
                engine.registry().spawn_refresh_task();
            }
            if config.recursive.cache_sweep_interval_ms > 0 {
                engine.cache().spawn_sweeper(Duration::from_millis(
                    config.recursive.cache_sweep_interval_ms,
                ));
            }
            tracing::info!(
                registry = %engine.registry().url(),
                fallbacks = ?engine.config().fallback_resolvers,
                "Starting recursive server"
            );
            let listener = TcpListener::bind(listen.as_str()).await?;
            let resolver: Arc<dyn Resolver> = engine;
            server::serve(listener, recursive::router(resolver)).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Resolve { hostname } => {
            let engine = ResolutionEngine::new(config.engine)?;
            match engine.resolve(&hostname).await {
                Ok(resolved) => {
                    println!("{}\t{}\t{}", resolved.hostname, resolved.address, resolved.ttl);
                    Ok(ExitCode::SUCCESS)
                }
                Err(e @ ResolutionError::NotFound { .. }) => {
                    eprintln!("{e}");
                    Ok(ExitCode::from(3))
                }
                Err(e @ ResolutionError::UpstreamUnavailable { .. }) => {
                    eprintln!("{e}");
                    Ok(ExitCode::from(2))
                }
            }
        }
    }
}
