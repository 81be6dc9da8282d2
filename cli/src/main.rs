//! Tether core process.
//!
//! Speaks the bus protocol to the editor host, over stdin/stdout by default
//! or over one TCP connection in development mode:
//!
//! ```text
//! main() -> config + tracing -> transport (ipc | tcp) -> Core::new -> start -> closed
//! ```
//!
//! stdout carries the IPC channel, so logs only ever go to a file.

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use tether_bus::Connection;
use tether_bus::codec::DEFAULT_MAX_FRAME_BYTES;
use tether_bus::transport::{Attached, ipc, tcp};
use tether_config::{TetherConfig, TransportMode, TransportSettings, log_dir, prompt_log_path};
use tether_core::{
    CommandGenerator, CompletionSettings, Core, Generator, PromptLog, UnconfiguredGenerator,
};

const LOG_FILE_NAME: &str = "core.log";

fn init_tracing(config_filter: Option<&str>) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config_filter.unwrap_or("info")))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let (log_file, init_warnings) = open_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // No log file: stay silent rather than write into the IPC stream.
    tracing_subscriber::registry().with(env_filter).init();
}

fn open_log_file() -> (Option<(PathBuf, fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&candidate)
        {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates() -> Vec<PathBuf> {
    vec![
        log_dir().join(LOG_FILE_NAME),
        PathBuf::from(".tether").join("logs").join(LOG_FILE_NAME),
    ]
}

async fn attach(settings: &TransportSettings) -> Result<Attached> {
    let max_frame_bytes = settings.max_frame_bytes.unwrap_or(DEFAULT_MAX_FRAME_BYTES);
    match settings.mode {
        TransportMode::Ipc => {
            tracing::info!("speaking IPC over stdin/stdout");
            Ok(ipc::stdio(max_frame_bytes))
        }
        TransportMode::Tcp => {
            let listener = tcp::TcpTransportListener::bind(&settings.tcp_addr, max_frame_bytes)
                .await
                .with_context(|| format!("binding {}", settings.tcp_addr))?;
            tracing::info!(addr = %listener.local_addr()?, "waiting for a TCP connection");
            listener
                .await_connection()
                .await
                .context("accepting the host connection")
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let (config, config_error) = match TetherConfig::load() {
        Ok(config) => (config.unwrap_or_default(), None),
        Err(e) => (TetherConfig::default(), Some(e)),
    };
    init_tracing(config.log_filter());
    if let Some(e) = config_error {
        tracing::warn!(path = %e.path().display(), "ignoring config: {e}");
    }

    let generator: Arc<dyn Generator> = match &config.generator {
        Some(generator) => Arc::new(CommandGenerator::from_config(generator)),
        None => Arc::new(UnconfiguredGenerator),
    };

    let attached = attach(&config.transport_settings()).await?;
    let prompt_log = config.log_prompts().then(|| PromptLog::new(prompt_log_path()));
    let core = Core::with_prompt_log(
        Connection::new("core", attached),
        generator,
        CompletionSettings::from_config(&config),
        prompt_log,
    )?;
    core.start()?;
    tracing::info!("core started");

    tokio::select! {
        () = core.closed() => tracing::info!("host disconnected"),
        signal = tokio::signal::ctrl_c() => {
            signal.context("waiting for ctrl-c")?;
            tracing::info!("interrupted");
            core.messenger().connection().close();
        }
    }

    Ok(())
}
