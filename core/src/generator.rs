//! Completion sources.

use std::process::Stdio;

use anyhow::Context;
use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use tether_config::GeneratorConfig;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::sync::mpsc;

/// Chunks buffered between the generator process and the pipeline.
const CHUNK_CHANNEL_CAPACITY: usize = 32;
const READ_BUFFER_BYTES: usize = 4096;

/// Produces generated text for a prompt as a stream of chunks.
///
/// Dropping the returned stream stops the generation.
pub trait Generator: Send + Sync + 'static {
    fn generate(&self, prompt: &str) -> anyhow::Result<BoxStream<'static, String>>;
}

/// Runs a command per prompt, writes the prompt to its stdin and streams its
/// stdout.
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    command: String,
    args: Vec<String>,
}

impl CommandGenerator {
    #[must_use]
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    #[must_use]
    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self::new(config.command.clone(), config.expanded_args())
    }
}

impl Generator for CommandGenerator {
    fn generate(&self, prompt: &str) -> anyhow::Result<BoxStream<'static, String>> {
        let program = which::which(&self.command)
            .with_context(|| format!("{} not found in PATH", self.command))?;
        let mut child = Command::new(&program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("spawning {}", self.command))?;

        let mut stdin = child.stdin.take().context("no stdin from generator")?;
        let mut stdout = child.stdout.take().context("no stdout from generator")?;

        let prompt = prompt.to_string();
        tokio::spawn(async move {
            if let Err(e) = stdin.write_all(prompt.as_bytes()).await {
                tracing::warn!("generator stdin write failed: {e}");
            }
        });

        let (tx, mut rx) = mpsc::channel(CHUNK_CHANNEL_CAPACITY);
        let command = self.command.clone();
        tokio::spawn(async move {
            let mut buf = vec![0u8; READ_BUFFER_BYTES];
            let mut pending = Vec::new();
            loop {
                match stdout.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => {
                        pending.extend_from_slice(&buf[..n]);
                        let text = take_utf8(&mut pending);
                        if !text.is_empty() && tx.send(text).await.is_err() {
                            tracing::debug!(%command, "generation dropped by consumer");
                            return;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(%command, "generator read failed: {e}");
                        break;
                    }
                }
            }
            if !pending.is_empty() {
                let _ = tx.send(String::from_utf8_lossy(&pending).into_owned()).await;
            }
            match child.wait().await {
                Ok(status) if !status.success() => {
                    tracing::warn!(%command, %status, "generator exited with failure");
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(%command, "generator wait failed: {e}"),
            }
        });

        Ok(stream::poll_fn(move |cx| rx.poll_recv(cx)).boxed())
    }
}

/// Used when no `[generator]` section is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredGenerator;

impl Generator for UnconfiguredGenerator {
    fn generate(&self, _prompt: &str) -> anyhow::Result<BoxStream<'static, String>> {
        anyhow::bail!("no generator configured; add a [generator] section to the config")
    }
}

/// Drain decodable text from `pending`, keeping a split trailing sequence
/// for the next read. Invalid bytes are replaced.
fn take_utf8(pending: &mut Vec<u8>) -> String {
    let mut text = String::new();
    let mut start = 0;
    loop {
        match std::str::from_utf8(&pending[start..]) {
            Ok(valid) => {
                text.push_str(valid);
                start = pending.len();
                break;
            }
            Err(err) => {
                let valid_up_to = start + err.valid_up_to();
                text.push_str(&String::from_utf8_lossy(&pending[start..valid_up_to]));
                let Some(invalid_len) = err.error_len() else {
                    start = valid_up_to;
                    break;
                };
                text.push(char::REPLACEMENT_CHARACTER);
                start = valid_up_to + invalid_len;
            }
        }
    }
    pending.drain(..start);
    text
}
