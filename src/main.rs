//! Binary analysis MCP server
//!
//! This binary runs an MCP server over stdin/stdout that exposes an analysis
//! database loaded from a snapshot file.

use anyhow::Context;
use binja_mcp::{
    dispatch::{effective_timeout, MAX_TIMEOUT_SECS},
    expand_path,
    tools::parse_address,
    BinjaMcpServer, Dispatcher, InMemorySource, Snapshot, ToolRequest,
};
use clap::{Args, Parser, Subcommand};
use rmcp::transport::stdio;
use rmcp::ServiceExt;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "binja-mcp", version, about = "Binary analysis MCP bridge")]
struct Cli {
    /// Analysis snapshot (JSON) to serve
    #[arg(long, global = true, env = "BINJA_MCP_SNAPSHOT")]
    snapshot: Option<String>,
    /// Initial cursor address (hex 0x... or decimal); selects the current function
    #[arg(long, global = true, env = "BINJA_MCP_CURSOR")]
    cursor: Option<String>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the MCP server over stdio (default)
    Serve(ServeArgs),
    /// Dispatch a single tool call and print the result as JSON
    Probe(ProbeArgs),
}

#[derive(Args)]
struct ServeArgs {
    /// Per-call timeout in seconds (max 600)
    #[arg(long, default_value_t = 120)]
    timeout_secs: u64,
    /// Write mutations back to the snapshot file on exit
    #[arg(long)]
    save_on_exit: bool,
}

#[derive(Args)]
struct ProbeArgs {
    /// Tool name, e.g. get_function_assembly
    #[arg(long)]
    tool: String,
    /// Tool arguments as a JSON object
    #[arg(long, default_value = "{}")]
    args: String,
}

fn main() -> anyhow::Result<()> {
    // Initialize logging to stderr (stdout is used for MCP protocol)
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("binja_mcp=info")))
        .init();

    let cli = Cli::parse();
    let snapshot_path = cli
        .snapshot
        .as_deref()
        .map(expand_path)
        .context("no analysis snapshot given (use --snapshot or BINJA_MCP_SNAPSHOT)")?;
    let (source, dispatcher) = open_snapshot(&snapshot_path, cli.cursor.as_deref())?;

    match cli.command.unwrap_or(Command::Serve(ServeArgs {
        timeout_secs: 120,
        save_on_exit: false,
    })) {
        Command::Serve(args) => run_server(args, &snapshot_path, source, dispatcher),
        Command::Probe(args) => run_probe(args, dispatcher),
    }
}

fn open_snapshot(
    path: &Path,
    cursor: Option<&str>,
) -> anyhow::Result<(Arc<InMemorySource>, Arc<Dispatcher>)> {
    info!(path = %path.display(), "Loading analysis snapshot");
    let source = Arc::new(Snapshot::load(path)?.into_source());
    let dispatcher = Arc::new(Dispatcher::new(source.clone()));

    let cursor = match cursor {
        Some(text) => Some(parse_address(text).map_err(|e| anyhow::anyhow!("--cursor: {e}"))?),
        None => source.recorded_cursor(),
    };
    if let Some(address) = cursor {
        match dispatcher.move_cursor(address) {
            Some(func) => info!(function = %func.name, "Current function selected"),
            None => warn!(address = %format!("{address:#x}"), "Cursor is outside any function"),
        }
    }
    Ok((source, dispatcher))
}

async fn wait_for_shutdown_signal() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigquit = signal(SignalKind::quit())?;
        tokio::select! {
            _ = sigterm.recv() => {},
            _ = sigint.recv() => {},
            _ = sigquit.recv() => {},
            _ = tokio::signal::ctrl_c() => {},
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
    }

    Ok(())
}

fn build_runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to create tokio runtime")
}

fn run_server(
    args: ServeArgs,
    snapshot_path: &Path,
    source: Arc<InMemorySource>,
    dispatcher: Arc<Dispatcher>,
) -> anyhow::Result<()> {
    if args.timeout_secs > MAX_TIMEOUT_SECS {
        warn!(
            requested = args.timeout_secs,
            max = MAX_TIMEOUT_SECS,
            "Timeout clamped to maximum"
        );
    }
    let timeout = effective_timeout(Some(args.timeout_secs));
    let rt = build_runtime()?;

    let result = rt.block_on(serve_stdio(dispatcher, timeout));
    if let Err(e) = &result {
        error!("MCP server error: {e:#}");
    }

    if args.save_on_exit {
        info!(path = %snapshot_path.display(), "Saving analysis snapshot");
        source.snapshot().save(snapshot_path)?;
    }

    info!("Server stopped");
    result
}

async fn serve_stdio(dispatcher: Arc<Dispatcher>, timeout: Duration) -> anyhow::Result<()> {
    info!("MCP server listening on stdio");
    let server = BinjaMcpServer::new(dispatcher, timeout);
    let mut service = Some(server.serve(stdio()).await?);
    let shutdown_notify = Arc::new(Notify::new());
    let shutdown_signal = shutdown_notify.clone();

    tokio::spawn(async move {
        if wait_for_shutdown_signal().await.is_ok() {
            info!("Shutdown signal received");
            shutdown_signal.notify_one();
        } else {
            info!("Shutdown signal handler failed; server will continue running");
        }
    });

    loop {
        tokio::select! {
            _ = shutdown_notify.notified() => {
                if let Some(mut running) = service.take() {
                    let _ = running.close().await?;
                }
                break;
            }
            _ = tokio::time::sleep(Duration::from_millis(200)) => {
                if let Some(running) = service.as_ref() {
                    if running.is_transport_closed() {
                        if let Some(running) = service.take() {
                            let _ = running.waiting().await?;
                        }
                        break;
                    }
                }
            }
        }
    }
    info!("MCP server shutting down");
    Ok(())
}

fn run_probe(args: ProbeArgs, dispatcher: Arc<Dispatcher>) -> anyhow::Result<()> {
    info!(tool = %args.tool, "Probe");
    let arguments: Map<String, Value> = match serde_json::from_str::<Value>(&args.args)
        .with_context(|| format!("--args is not valid JSON: {}", args.args))?
    {
        Value::Object(map) => map,
        other => anyhow::bail!("--args must be a JSON object, got {other}"),
    };

    let rt = build_runtime()?;
    let result = rt.block_on(dispatcher.call(
        ToolRequest::new(args.tool, arguments),
        effective_timeout(None),
    ));
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
