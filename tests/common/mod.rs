//! Shared test utilities and fixtures
//!
//! Builds the whole system in one process: a [`Core`] on one in-process
//! pair, a [`Router`] in the middle, and a bare webview messenger standing
//! in for the UI.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use tether_bus::transport::InProcessTransport;
use tether_bus::{Connection, Messenger};
use tether_core::{CompletionSettings, Core, Generator};
use tether_router::{Ide, Router, SurfaceManager};
use tether_types::SurfaceId;
use tether_types::protocol::{FromWebview, ToWebview};

/// Editor double backed by a path -> contents map.
#[derive(Default)]
pub struct MemoryIde {
    pub files: Mutex<HashMap<String, String>>,
    pub opened: Mutex<Vec<String>>,
    pub commands: Mutex<Vec<String>>,
    pub popups: Mutex<Vec<String>>,
    pub workspace: Vec<String>,
}

impl MemoryIde {
    pub fn with_files(files: &[(&str, &str)]) -> Self {
        Self {
            files: Mutex::new(
                files
                    .iter()
                    .map(|(path, contents)| ((*path).to_string(), (*contents).to_string()))
                    .collect(),
            ),
            workspace: vec!["/w".to_string()],
            ..Self::default()
        }
    }
}

impl Ide for MemoryIde {
    async fn read_file(&self, filepath: &str) -> anyhow::Result<String> {
        self.files
            .lock()
            .unwrap()
            .get(filepath)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("{filepath} is not open"))
    }

    async fn write_file(&self, path: &str, contents: &str) -> anyhow::Result<()> {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), contents.to_string());
        Ok(())
    }

    async fn open_file(&self, path: &str) -> anyhow::Result<()> {
        self.opened.lock().unwrap().push(path.to_string());
        Ok(())
    }

    async fn show_diff(
        &self,
        filepath: &str,
        new_contents: &str,
        _step: u32,
    ) -> anyhow::Result<()> {
        self.write_file(filepath, new_contents).await
    }

    async fn get_open_files(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.opened.lock().unwrap().clone())
    }

    async fn get_workspace_dirs(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.workspace.clone())
    }

    async fn run_command(&self, command: &str) -> anyhow::Result<()> {
        self.commands.lock().unwrap().push(command.to_string());
        Ok(())
    }

    async fn get_search_results(&self, query: &str) -> anyhow::Result<String> {
        let files = self.files.lock().unwrap();
        let mut hits: Vec<&str> = files
            .iter()
            .filter(|(_, contents)| contents.contains(query))
            .map(|(path, _)| path.as_str())
            .collect();
        hits.sort_unstable();
        Ok(hits.join("\n"))
    }

    async fn subprocess(&self, command: &str) -> anyhow::Result<(String, String)> {
        Ok((format!("ran {command}"), String::new()))
    }

    async fn show_error_popup(&self, message: &str) -> anyhow::Result<()> {
        self.popups.lock().unwrap().push(format!("error: {message}"));
        Ok(())
    }

    async fn show_info_popup(&self, message: &str) -> anyhow::Result<()> {
        self.popups.lock().unwrap().push(format!("info: {message}"));
        Ok(())
    }
}

/// Replays fixed chunks and records every prompt.
pub struct ScriptedGenerator {
    chunks: Vec<String>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(chunks: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            chunks: chunks.iter().map(|c| (*c).to_string()).collect(),
            prompts: Mutex::new(Vec::new()),
        })
    }
}

impl Generator for ScriptedGenerator {
    fn generate(&self, prompt: &str) -> anyhow::Result<BoxStream<'static, String>> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(stream::iter(self.chunks.clone()).boxed())
    }
}

/// Core, router and a fake UI surface, all started.
pub struct Stack {
    pub core: Core,
    pub router: Router<MemoryIde>,
    pub ide: Arc<MemoryIde>,
    pub surfaces: Arc<SurfaceManager>,
    pub webview: Messenger<ToWebview, FromWebview>,
}

pub fn stack(ide: MemoryIde, generator: Arc<dyn Generator>, settings: CompletionSettings) -> Stack {
    let (host_core_end, core_end) = InProcessTransport::pair();
    let (host_webview_end, webview_end) = InProcessTransport::pair();

    let core = Core::new(Connection::new("core", core_end), generator, settings).unwrap();
    let ide = Arc::new(ide);
    let surfaces = Arc::new(SurfaceManager::new());
    let router = Router::wire(
        Connection::new("host->core", host_core_end),
        Connection::new("host->webview", host_webview_end),
        Arc::clone(&ide),
        Arc::clone(&surfaces),
        SurfaceId::new("panel"),
    )
    .unwrap();
    let webview = Messenger::new(Connection::new("webview", webview_end));

    core.start().unwrap();
    router.start().unwrap();
    webview.connection().start().unwrap();

    Stack {
        core,
        router,
        ide,
        surfaces,
        webview,
    }
}
