mod config;
mod host;
mod responder;

use std::path::PathBuf;
use clap::{Parser, ValueEnum};
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use anyhow::{Context, Result};
use shared::protocol::MDNS_PORT;
use shared::transport;
use shared::wire::ResponseOptions;
use shared::ServiceRegistry;
use crate::config::Config;
use crate::responder::Responder;

/// Multicast DNS responder for this host and its configured services
#[derive(Parser, Debug)]
#[command(name = "mdnsd", version, about, long_about = None)]
struct Args {
    /// Network interface to answer on (overrides responder.interface)
    #[arg(short, long)]
    interface: Option<String>,

    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log verbosity, ignored when RUST_LOG is set
    #[arg(short, long, value_enum, ignore_case = true, default_value_t = Verbosity::Warn)]
    verbosity: Verbosity,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Hostname to answer for instead of the system hostname
    #[arg(long)]
    hostname: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Verbosity {
    Error,
    #[value(alias = "warning")]
    Warn,
    Info,
    Debug,
    Trace,
}

impl Verbosity {
    fn as_str(self) -> &'static str {
        match self {
            Verbosity::Error => "error",
            Verbosity::Warn => "warn",
            Verbosity::Info => "info",
            Verbosity::Debug => "debug",
            Verbosity::Trace => "trace",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn init_tracing(verbosity: Verbosity, format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("mdnsd={0},shared={0}", verbosity.as_str()))
    });

    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbosity, args.log_format);

    tracing::info!("Starting mdnsd");

    let config = match &args.config {
        Some(path) => {
            let config = Config::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            tracing::info!("Loaded config from {}", path.display());
            config
        }
        None => Config::default(),
    };

    let interface = args
        .interface
        .clone()
        .or_else(|| config.responder.interface.clone())
        .context("No interface given (use --interface or responder.interface)")?;

    let ifindex = transport::interface_index(&interface)
        .with_context(|| format!("Failed to resolve interface {}", interface))?;

    let hostname = args.hostname.as_deref().or(config.responder.hostname.as_deref());
    let host = host::discover(hostname, &interface, config.responder.ttl)?;

    let mut registry = ServiceRegistry::new();
    let loaded = config.register_services(&mut registry);
    tracing::info!("Loaded {} of {} configured service(s)", loaded, config.services.len());

    let socket = transport::open_multicast_socket(ifindex, MDNS_PORT)
        .with_context(|| format!("Failed to open mDNS socket on {}", interface))?;
    let socket = UdpSocket::from_std(socket).context("Failed to register mDNS socket")?;

    tracing::info!("Answering for {} on {} (index {})", host.hostname(), interface, ifindex);

    let options = ResponseOptions {
        cache_flush: config.responder.cache_flush,
    };
    let responder = Responder::new(host, registry, options);

    // Create cancellation token for graceful shutdown
    let cancel = CancellationToken::new();

    let task_cancel = cancel.clone();
    let reply = config.responder.reply;
    let responder_handle = tokio::spawn(async move {
        if let Err(e) = responder::run(responder, socket, reply, ifindex, task_cancel).await {
            tracing::error!("Responder error: {}", e);
        }
    });

    shutdown_signal().await?;
    tracing::info!("Shutdown signal received");

    cancel.cancel();
    let _ = responder_handle.await;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Resolves on SIGINT, or SIGTERM on unix.
async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut terminate = signal(SignalKind::terminate()).context("Failed to listen for SIGTERM")?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result.context("Failed to listen for ctrl-c")?,
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    Ok(())
}
