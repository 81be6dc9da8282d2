//! `Content-Length` framing for the IPC and TCP transports.
//!
//! Each record is `Content-Length: N\r\n\r\n{json}`, the same framing LSP
//! uses over stdin/stdout. [`FrameReader`] reassembles records from partial
//! reads; [`FrameWriter`] emits one header plus body per record.

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// Default maximum frame size (16 MiB).
pub const DEFAULT_MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// Longest header line accepted, terminator included.
pub const MAX_HEADER_LINE_BYTES: usize = 8 * 1024;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed frame: {0}")]
    Malformed(String),
    #[error("Content-Length {len} exceeds maximum {max}")]
    Oversized { len: usize, max: usize },
    #[error("invalid frame body: {0}")]
    Body(#[from] serde_json::Error),
}

impl FrameError {
    /// Whether the error came from the underlying byte stream rather than
    /// from the bytes themselves.
    #[must_use]
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

/// Reads framed JSON records from an async reader.
pub struct FrameReader<R> {
    reader: BufReader<R>,
    max_frame_bytes: usize,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self::with_limit(reader, DEFAULT_MAX_FRAME_BYTES)
    }

    pub fn with_limit(reader: R, max_frame_bytes: usize) -> Self {
        Self {
            reader: BufReader::new(reader),
            max_frame_bytes,
        }
    }

    /// Read the next record.
    ///
    /// Returns `Ok(None)` on EOF between records. EOF inside a record is an error.
    pub async fn read_frame<T: DeserializeOwned>(&mut self) -> Result<Option<T>, FrameError> {
        let Some(content_length) = self.read_headers().await? else {
            return Ok(None);
        };

        if content_length > self.max_frame_bytes {
            return Err(FrameError::Oversized {
                len: content_length,
                max: self.max_frame_bytes,
            });
        }

        let mut body = vec![0u8; content_length];
        self.reader.read_exact(&mut body).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                FrameError::Malformed(format!("truncated body, expected {content_length} bytes"))
            } else {
                FrameError::Io(e)
            }
        })?;

        Ok(Some(serde_json::from_slice(&body)?))
    }

    async fn read_headers(&mut self) -> Result<Option<usize>, FrameError> {
        let mut content_length: Option<usize> = None;
        let mut line = Vec::new();
        let mut saw_any_header_bytes = false;

        loop {
            line.clear();
            let limit = (MAX_HEADER_LINE_BYTES + 1) as u64;
            let bytes_read = (&mut self.reader)
                .take(limit)
                .read_until(b'\n', &mut line)
                .await?;

            if bytes_read == 0 {
                if !saw_any_header_bytes {
                    return Ok(None);
                }
                return Err(FrameError::Malformed(
                    "unexpected EOF while reading headers".to_string(),
                ));
            }
            saw_any_header_bytes = true;
            if line.len() > MAX_HEADER_LINE_BYTES {
                return Err(FrameError::Malformed(format!(
                    "header line exceeds {MAX_HEADER_LINE_BYTES} bytes"
                )));
            }

            let line = std::str::from_utf8(&line)
                .map_err(|_| FrameError::Malformed("header is not valid UTF-8".to_string()))?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                break;
            }

            if let Some((key, value)) = trimmed.split_once(':')
                && key.trim().eq_ignore_ascii_case("Content-Length")
            {
                let value = value.trim();
                let len = value.parse::<usize>().map_err(|_| {
                    FrameError::Malformed(format!("invalid Content-Length value {value:?}"))
                })?;
                content_length = Some(len);
            }
        }

        content_length
            .map(Some)
            .ok_or_else(|| FrameError::Malformed("missing Content-Length header".to_string()))
    }
}

/// Writes framed JSON records to an async writer.
pub struct FrameWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub async fn write_frame<T: Serialize>(&mut self, record: &T) -> Result<(), FrameError> {
        let body = serde_json::to_vec(record)?;
        let header = format!("Content-Length: {}\r\n\r\n", body.len());

        self.writer.write_all(header.as_bytes()).await?;
        self.writer.write_all(&body).await?;
        self.writer.flush().await?;
        Ok(())
    }
}
