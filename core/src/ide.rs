use tether_bus::Messenger;
use tether_router::Ide;
use tether_types::protocol::{
    ErrorPopup, FromCore, GetOpenFiles, GetSearchResults, GetWorkspaceDirs, InfoPopup, OpenFile,
    OpenFileInput, PopupInput, ReadFile, ReadFileInput, RunCommand, RunCommandInput, SearchInput,
    ShowDiff, ShowDiffInput, Subprocess, SubprocessInput, ToCore, WriteFile, WriteFileInput,
};

/// The host's editor, reached over the core's own connection.
#[derive(Debug, Clone)]
pub struct MessengerIde {
    messenger: Messenger<ToCore, FromCore>,
}

impl MessengerIde {
    #[must_use]
    pub fn new(messenger: Messenger<ToCore, FromCore>) -> Self {
        Self { messenger }
    }
}

impl Ide for MessengerIde {
    async fn read_file(&self, filepath: &str) -> anyhow::Result<String> {
        let input = ReadFileInput {
            filepath: filepath.to_string(),
        };
        Ok(self.messenger.request::<ReadFile>(input).await?)
    }

    async fn write_file(&self, path: &str, contents: &str) -> anyhow::Result<()> {
        let input = WriteFileInput {
            path: path.to_string(),
            contents: contents.to_string(),
        };
        Ok(self.messenger.request::<WriteFile>(input).await?)
    }

    async fn open_file(&self, path: &str) -> anyhow::Result<()> {
        let input = OpenFileInput {
            path: path.to_string(),
        };
        Ok(self.messenger.request::<OpenFile>(input).await?)
    }

    async fn show_diff(
        &self,
        filepath: &str,
        new_contents: &str,
        step_index: u32,
    ) -> anyhow::Result<()> {
        let input = ShowDiffInput {
            filepath: filepath.to_string(),
            new_contents: new_contents.to_string(),
            step_index,
        };
        Ok(self.messenger.request::<ShowDiff>(input).await?)
    }

    async fn get_open_files(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.messenger.request::<GetOpenFiles>(()).await?)
    }

    async fn get_workspace_dirs(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.messenger.request::<GetWorkspaceDirs>(()).await?)
    }

    async fn run_command(&self, command: &str) -> anyhow::Result<()> {
        let input = RunCommandInput {
            command: command.to_string(),
        };
        Ok(self.messenger.request::<RunCommand>(input).await?)
    }

    async fn get_search_results(&self, query: &str) -> anyhow::Result<String> {
        let input = SearchInput {
            query: query.to_string(),
        };
        Ok(self.messenger.request::<GetSearchResults>(input).await?)
    }

    async fn subprocess(&self, command: &str) -> anyhow::Result<(String, String)> {
        let input = SubprocessInput {
            command: command.to_string(),
        };
        Ok(self.messenger.request::<Subprocess>(input).await?)
    }

    async fn show_error_popup(&self, message: &str) -> anyhow::Result<()> {
        let input = PopupInput {
            message: message.to_string(),
        };
        Ok(self.messenger.request::<ErrorPopup>(input).await?)
    }

    async fn show_info_popup(&self, message: &str) -> anyhow::Result<()> {
        let input = PopupInput {
            message: message.to_string(),
        };
        Ok(self.messenger.request::<InfoPopup>(input).await?)
    }
}
