//! portwait: block until TCP ports accept connections.
//!
//! Two subcommands:
//! - `portwait wait`: poll a single host/port given on the command line
//! - `portwait check`: poll every enabled target in portwait.toml, in order

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use portwait::{PollRequest, PollResult, PortWaitConfig, PortWaiter};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Exit status when a poll finished with `available = false`.
const EXIT_UNAVAILABLE: u8 = 2;

/// portwait: block until TCP ports accept connections.
#[derive(Parser)]
#[command(
    name = "portwait",
    version,
    about = "portwait: block until TCP ports accept connections"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Wait for a single host/port to accept a TCP connection
    Wait {
        /// Hostname, domain name, IP address
        #[arg(long)]
        host: String,
        /// TCP port
        #[arg(short, long)]
        port: u16,
        /// Seconds to wait before timing out; 0 waits forever
        #[arg(short, long, default_value = "0")]
        timeout_sec: u64,
        /// Milliseconds between attempts, 0 to not wait [default: 500]
        #[arg(long)]
        cooldown_ms: Option<u64>,
        /// Exit with an error on timeout instead of reporting unavailable
        #[arg(long)]
        error_on_timeout: bool,
        /// Print results as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Wait for every enabled target in the config file, one after another
    Check {
        /// Path to portwait.toml [default: ./portwait.toml or ~/.config/portwait/portwait.toml]
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Print results as JSON lines
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Initialize tracing with env filter (RUST_LOG controls verbosity)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cancel = CancellationToken::new();

    // Ctrl-C handler cancels the root token so the in-flight poll is dropped
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("interrupted, abandoning wait");
        cancel_for_signal.cancel();
    });

    let all_available = match cli.command {
        Commands::Wait {
            host,
            port,
            timeout_sec,
            cooldown_ms,
            error_on_timeout,
            json,
        } => {
            let request = PollRequest {
                host,
                port,
                timeout_sec,
                cooldown_ms,
                error_on_timeout,
            };
            run_wait(request, json, cancel).await?
        }
        Commands::Check { config, json } => {
            let config = resolve_config(config)?;
            run_check(&config, json, cancel).await?
        }
    };

    Ok(ExitCode::from(exit_status(all_available)))
}

/// Process exit status for a run that finished without a reported failure.
fn exit_status(all_available: bool) -> u8 {
    if all_available { 0 } else { EXIT_UNAVAILABLE }
}

/// Poll one ad-hoc request and print its result.
async fn run_wait(request: PollRequest, json: bool, cancel: CancellationToken) -> Result<bool> {
    request.validate("command line")?;
    let waiter = PortWaiter::new();
    let result = poll_until_cancelled(&waiter, &request, &cancel).await?;
    println!("{}", render_result(None, &result, json)?);
    Ok(result.available)
}

/// Poll every enabled target from the config file in name order.
///
/// Stops at the first reported failure; unavailable targets are printed and
/// polling continues.
async fn run_check(config_path: &Path, json: bool, cancel: CancellationToken) -> Result<bool> {
    let config = PortWaitConfig::load(config_path)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load config {:?}: {}", config_path, e))?;

    let requests = config.requests();
    if requests.is_empty() {
        tracing::warn!(path = %config_path.display(), "no enabled targets in config");
    }

    let waiter = PortWaiter::new();
    let mut all_available = true;
    for (name, request) in &requests {
        tracing::info!(target_name = %name, address = %request.address(), "waiting for target");
        let result = poll_until_cancelled(&waiter, request, &cancel)
            .await
            .map_err(|e| anyhow::anyhow!("target '{}' failed: {}", name, e))?;
        println!("{}", render_result(Some(name.as_str()), &result, json)?);
        all_available &= result.available;
    }

    Ok(all_available)
}

/// Run a poll, abandoning it if the root token is cancelled first.
async fn poll_until_cancelled(
    waiter: &PortWaiter,
    request: &PollRequest,
    cancel: &CancellationToken,
) -> Result<PollResult> {
    tokio::select! {
        result = waiter.poll(request) => result.map_err(|e| {
            if e.is_timeout() {
                tracing::error!(address = %request.address(), "gave up waiting for port");
            }
            anyhow::anyhow!("{}: {}", e.summary(), e.detail())
        }),
        _ = cancel.cancelled() => Err(anyhow::anyhow!(
            "cancelled while waiting for {}",
            request.address()
        )),
    }
}

/// Format a result as a human-readable line or a JSON object.
fn render_result(target: Option<&str>, result: &PollResult, json: bool) -> Result<String> {
    if json {
        let mut value = serde_json::to_value(result)?;
        if let Some(name) = target {
            value["target"] = serde_json::Value::String(name.to_string());
        }
        return Ok(value.to_string());
    }

    let status = if result.available {
        "available"
    } else {
        "unavailable"
    };
    Ok(match target {
        Some(name) => format!("{}: {} {}", name, result.identifier, status),
        None => format!("{} {}", result.identifier, status),
    })
}

/// Pick the config file for `check`.
///
/// An explicit `--config` is used as given, even if it does not exist yet.
/// Otherwise the working directory is searched before the user config dir.
fn resolve_config(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path);
    }

    let local = Path::new("portwait.toml");
    if local.exists() {
        return Ok(local.to_path_buf());
    }

    if let Some(config_dir) = dirs::config_dir() {
        let xdg = config_dir.join("portwait").join("portwait.toml");
        if xdg.exists() {
            return Ok(xdg);
        }
    }

    Err(anyhow::anyhow!(
        "No portwait.toml found. Searched ./portwait.toml and ~/.config/portwait/portwait.toml. \
         Use --config to specify a path."
    ))
}
