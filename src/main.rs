//! Automation server
//!
//! Runs the automation API against an in-memory library, optionally seeded
//! from a JSON file of paper records.
//!
//! ```text
//!     local client ──▶ 127.0.0.1:<port> ──▶ net ──▶ http ──▶ routing ──▶ api ──▶ library
//!
//!     SIGHUP / config file change ──▶ reconfigure()
//!     SIGINT / SIGTERM            ──▶ stop() and exit
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use tokio::sync::mpsc;

use automation_server::config::{load_config, validate_config, AutomationConfig, ConfigError, ConfigWatcher};
use automation_server::library::{InMemoryLibrary, PaperRecord};
use automation_server::lifecycle::{SignalEvent, Signals};
use automation_server::observability::{logging, metrics};
use automation_server::AutomationServer;

#[derive(Parser)]
#[command(name = "automation-server")]
#[command(about = "Local automation API for a publication library", long_about = None)]
struct Cli {
    /// TOML configuration file; watched for changes.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the log level.
    #[arg(long)]
    log_level: Option<String>,

    /// Open the automation gate regardless of configuration.
    #[arg(long)]
    enable: bool,

    /// JSON array of paper records to preload.
    #[arg(long)]
    seed: Option<PathBuf>,
}

impl Cli {
    fn load(&self) -> Result<AutomationConfig, Box<dyn std::error::Error>> {
        let config = match &self.config {
            Some(path) => load_config(path)?,
            None => AutomationConfig::default(),
        };
        Ok(self.apply_overrides(config)?)
    }

    /// Command-line values win over the file; the merged result is validated.
    fn apply_overrides(&self, mut config: AutomationConfig) -> Result<AutomationConfig, ConfigError> {
        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }
        if self.enable {
            config.automation.enabled = true;
        }
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

fn load_seed(path: &Path) -> Result<Vec<PaperRecord>, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

async fn next_update(rx: &mut Option<mpsc::UnboundedReceiver<AutomationConfig>>) -> Option<AutomationConfig> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn apply(server: &AutomationServer, cli: &Cli, config: AutomationConfig) {
    let config = match cli.apply_overrides(config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Reload rejected, keeping current configuration");
            return;
        }
    };
    if let Err(e) = server.reconfigure(config).await {
        tracing::error!(error = %e, "Failed to apply configuration");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = cli.load()?;

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "automation-server starting");

    tracing::info!(
        port = config.listener.port,
        max_connections = config.listener.max_connections,
        automation_enabled = config.automation.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let library = match &cli.seed {
        Some(path) => {
            let records = load_seed(path)?;
            tracing::info!(papers = records.len(), path = ?path, "Library seeded");
            InMemoryLibrary::with_papers(records)
        }
        None => InMemoryLibrary::new(),
    };

    let server = AutomationServer::new(config, Arc::new(library));
    if let Err(e) = server.start().await {
        tracing::error!(error = %e, "Automation server did not start");
    }

    let mut updates = None;
    let _watcher = match &cli.config {
        Some(path) => {
            let (watcher, rx) = ConfigWatcher::new(path);
            updates = Some(rx);
            match watcher.run() {
                Ok(w) => Some(w),
                Err(e) => {
                    tracing::warn!(error = %e, "Config watcher unavailable, reload with SIGHUP");
                    None
                }
            }
        }
        None => None,
    };

    let mut signals = Signals::install()?;
    loop {
        tokio::select! {
            event = signals.next() => match event {
                SignalEvent::Shutdown => break,
                SignalEvent::Reload => match &cli.config {
                    Some(path) => match load_config(path) {
                        Ok(config) => apply(&server, &cli, config).await,
                        Err(e) => tracing::error!(error = %e, "Reload failed, keeping current configuration"),
                    },
                    None => tracing::info!("No config file to reload"),
                },
            },
            Some(config) = next_update(&mut updates) => apply(&server, &cli, config).await,
        }
    }

    tracing::info!("Shutting down");
    server.stop().await;
    tracing::info!("Shutdown complete");
    Ok(())
}
