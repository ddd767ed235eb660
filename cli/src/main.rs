// vitalble desktop CLI
//
// Sends payloads as chunked BLE notifications through a peripheral provider
// and manages the persistent configuration used to do so.

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use vitalble_core::{
    chunk_plan, ChunkedTransport, PeripheralSession, Provider, ProviderKind, SessionConfiguration,
};

#[derive(Parser)]
#[command(name = "vitalble")]
#[command(about = "VitalBLE: chunked BLE notifications", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a message (or a file) as notifications
    Send {
        /// Text to send
        message: Option<String>,
        /// Read the payload from a file instead
        #[arg(short, long, conflicts_with = "message")]
        file: Option<PathBuf>,
        /// Override the configured service UUID
        #[arg(long)]
        service: Option<String>,
        /// Override the configured characteristic UUID
        #[arg(long)]
        characteristic: Option<String>,
        /// Override the configured provider (dry-run, loopback)
        #[arg(short, long)]
        provider: Option<ProviderKind>,
        /// Abort if the whole payload is not out within this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Show the session configuration
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Show how a payload would be chunked
    Plan {
        /// Payload length in bytes
        #[arg(required_unless_present = "text")]
        length: Option<usize>,
        /// Use the UTF-8 length of this text
        #[arg(short, long, conflicts_with = "length")]
        text: Option<String>,
    },
    /// Configure settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Set { key: String, value: String },
    Get { key: String },
    List,
    /// Print the config file location
    Path,
    /// Restore defaults
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Send {
            message,
            file,
            service,
            characteristic,
            provider,
            timeout_ms,
        } => cmd_send(message, file, service, characteristic, provider, timeout_ms).await,
        Commands::Status { json } => cmd_status(json).await,
        Commands::Plan { length, text } => cmd_plan(length, text),
        Commands::Config { action } => cmd_config(action),
    }
}

/// Build a session from the saved config, applying any overrides
async fn open_session(
    config: &config::Config,
    provider: Option<ProviderKind>,
    service: Option<&str>,
    characteristic: Option<&str>,
) -> Result<(Provider, PeripheralSession)> {
    let transport = ChunkedTransport::new(config.transport_config()?)?;
    let provider = provider
        .unwrap_or(config.provider)
        .build(config.native_status());
    let session = PeripheralSession::with_transport(provider.peripheral(), transport);

    session
        .configure(Some(&config.service_uuid), Some(&config.characteristic_uuid))
        .await?;
    session.configure(service, characteristic).await?;

    info!(
        "Session ready: provider={} chunk_size={}",
        provider.kind(),
        session.transport().config().chunk_size
    );
    Ok((provider, session))
}

async fn cmd_send(
    message: Option<String>,
    file: Option<PathBuf>,
    service: Option<String>,
    characteristic: Option<String>,
    provider: Option<ProviderKind>,
    timeout_ms: Option<u64>,
) -> Result<()> {
    let payload = match (message, file) {
        (Some(message), _) => message.into_bytes(),
        (None, Some(path)) => std::fs::read(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (None, None) => anyhow::bail!("Nothing to send: pass a message or --file"),
    };

    let config = config::Config::load()?;
    let (provider, session) =
        open_session(&config, provider, service.as_deref(), characteristic.as_deref()).await?;

    let chunks = session.transport().chunk_count(payload.len());
    println!(
        "{} {} bytes in {} chunk(s) via {}",
        "Sending".bold(),
        payload.len(),
        chunks,
        provider.kind().to_string().bright_cyan()
    );

    let result = match timeout_ms {
        Some(ms) => {
            session
                .try_send_until(Some(payload.as_slice()), tokio::time::sleep(Duration::from_millis(ms)))
                .await
        }
        None => session.try_send(Some(payload.as_slice())).await,
    };
    session.shutdown().await;

    if let Provider::Loopback(loopback) = &provider {
        for (i, frame) in loopback.delivered_frames().iter().enumerate() {
            println!("  {} frame {:>3}: {} bytes", "•".bright_green(), i + 1, frame.len());
        }
    }

    match result {
        Ok(report) => {
            println!(
                "{} Delivered {} bytes in {} notification(s)",
                "✓".green(),
                report.bytes,
                report.chunks
            );
            Ok(())
        }
        Err(e) => {
            println!("{} {}", "✗".red(), e);
            anyhow::bail!("Send failed")
        }
    }
}

async fn cmd_status(json: bool) -> Result<()> {
    let config = config::Config::load()?;
    let (_provider, session) = open_session(&config, None, None, None).await?;
    let snapshot = session.configuration().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    println!("{}", "Session".bold());
    for line in snapshot.to_string().lines() {
        println!("  {}", line);
    }
    print_uuid_warnings(&snapshot);
    println!();
    println!("{}", "Transport".bold());
    println!("  Provider:   {}", config.provider.to_string().bright_cyan());
    println!("  Chunk size: {} bytes", config.transport.chunk_size);
    println!("  Pacing:     {}ms", config.transport.pacing_ms);

    Ok(())
}

/// Identifiers are passed through verbatim; flag ones a native stack will likely refuse
fn print_uuid_warnings(snapshot: &SessionConfiguration) {
    for (label, value) in [
        ("service", &snapshot.service_id),
        ("characteristic", &snapshot.characteristic_id),
    ] {
        if uuid::Uuid::parse_str(value).is_err() {
            println!(
                "  {} {} identifier is not a UUID: {}",
                "⚠".yellow(),
                label,
                value.yellow()
            );
        }
    }
}

fn cmd_plan(length: Option<usize>, text: Option<String>) -> Result<()> {
    let config = config::Config::load()?;
    let chunk_size = config.transport_config()?.chunk_size;
    let length = match (length, text) {
        (Some(length), _) => length,
        (None, Some(text)) => text.len(),
        (None, None) => anyhow::bail!("Pass a length or --text"),
    };

    let plan = chunk_plan(length, chunk_size);
    if plan.is_empty() {
        println!("{}", "Empty payload: nothing would be sent (send fails).".dimmed());
        return Ok(());
    }

    println!(
        "{} {} bytes → {} chunk(s) of ≤{} bytes",
        "Plan".bold(),
        length,
        plan.len(),
        chunk_size
    );
    for (i, size) in plan.iter().enumerate() {
        println!("  {} chunk {:>3}: {} bytes", "•".bright_green(), i + 1, size);
    }
    Ok(())
}

fn cmd_config(action: ConfigAction) -> Result<()> {
    let mut config = config::Config::load()?;

    match action {
        ConfigAction::Set { key, value } => {
            config.set(&key, &value)?;
            config.save()?;
            println!("{} {} = {}", "✓".green(), key, value.trim());
        }
        ConfigAction::Get { key } => match config.get(&key) {
            Some(value) => println!("{}", value),
            None => anyhow::bail!("Unknown config key: {}", key),
        },
        ConfigAction::List => {
            println!("{}", "Configuration".bold());
            for (key, value) in config.list() {
                println!("  {:<20} {}", key, value.bright_cyan());
            }
        }
        ConfigAction::Path => {
            println!("{}", config::Config::config_file()?.display());
        }
        ConfigAction::Reset => {
            config::Config::default().save()?;
            println!("{} Configuration reset to defaults", "✓".green());
        }
    }

    Ok(())
}
