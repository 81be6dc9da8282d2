//! Parent/child transport over the child's stdin and stdout.
//!
//! The parent spawns the core with [`spawn_child`]; the core attaches to its
//! own standard streams with [`stdio`]. Stdout carries frames only, so the
//! child must never print to it.

use std::ffi::OsStr;
use std::io;
use std::process::Stdio;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::Command;

use super::{Attached, TransportKind, framed};

/// Spawn `program` and attach to its stdin/stdout.
///
/// The child is killed when the transport is closed or dropped.
pub fn spawn_child<I, S>(program: &str, args: I, max_frame_bytes: usize) -> io::Result<Attached>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let resolved = which::which(program)
        .map_err(|e| io::Error::new(io::ErrorKind::NotFound, format!("{program}: {e}")))?;

    let mut command = Command::new(&resolved);
    command.args(args);
    spawn_command(command, max_frame_bytes)
}

/// Spawn a prepared command and attach to its stdin/stdout.
///
/// Stdio and `kill_on_drop` are overridden; environment and working
/// directory are kept as the caller set them.
pub fn spawn_command(mut command: Command, max_frame_bytes: usize) -> io::Result<Attached> {
    let mut child = command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()?;

    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| io::Error::other("no stdin from child"))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::other("no stdout from child"))?;

    tracing::info!(
        program = ?command.as_std().get_program(),
        pid = ?child.id(),
        "spawned child"
    );
    Ok(framed::attach(
        TransportKind::Ipc,
        stdout,
        stdin,
        max_frame_bytes,
        Some(child),
    ))
}

/// Attach to this process's own stdin/stdout.
#[must_use]
pub fn stdio(max_frame_bytes: usize) -> Attached {
    framed::attach(
        TransportKind::Ipc,
        tokio::io::stdin(),
        tokio::io::stdout(),
        max_frame_bytes,
        None,
    )
}

/// Attach to an arbitrary byte-stream pair with IPC framing.
pub fn from_streams<R, W>(reader: R, writer: W, max_frame_bytes: usize) -> Attached
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    framed::attach(TransportKind::Ipc, reader, writer, max_frame_bytes, None)
}
