use std::path::{Path, PathBuf};

use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

/// Appends each prompt handed to the generator to a file, separated by a
/// blank line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptLog {
    path: PathBuf,
}

impl PromptLog {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Failures are logged and never reach the request.
    pub async fn record(&self, prompt: &str) {
        if let Err(e) = self.append(prompt).await {
            tracing::warn!(path = %self.path.display(), "prompt log write failed: {e}");
        }
    }

    async fn append(&self, prompt: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(format!("{prompt}\n\n").as_bytes()).await?;
        file.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn prompts_are_appended_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let log = PromptLog::new(dir.path().join("logs").join("prompts.log"));

        log.record("first").await;
        log.record("second\nline").await;

        let written = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(written, "first\n\nsecond\nline\n\n");
    }

    #[tokio::test]
    async fn unwritable_path_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "").unwrap();

        let log = PromptLog::new(blocker.join("prompts.log"));
        log.record("lost").await;
        assert!(!log.path().exists());
    }
}
