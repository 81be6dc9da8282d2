use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::StreamExt;
use futures_util::stream::{AbortHandle, Abortable, BoxStream};
use tether_bus::{BusError, ChunkSink, Connection, Messenger};
use tether_config::TetherConfig;
use tether_router::Ide;
use tether_stream::{CompletionStreamExt, Pipeline, PipelineOptions};
use tether_types::protocol::{
    AutocompleteComplete, AutocompleteInput, AutocompleteOutcome, FilesChanged, FromCore,
    LlmStreamComplete, MessageType, Ping, StreamCompleteInput, ToCore,
};

use crate::{Generator, MessengerIde, PromptLog};

/// Completion defaults, overridable per request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionSettings {
    /// Applied to every completion, before the request's own tokens.
    pub stop_tokens: Vec<String>,
    pub multiline: bool,
}

impl CompletionSettings {
    #[must_use]
    pub fn from_config(config: &TetherConfig) -> Self {
        Self {
            stop_tokens: config.stop_tokens().to_vec(),
            multiline: config.multiline(),
        }
    }

    fn merged_tokens(&self, extra: &[String]) -> Vec<String> {
        let mut tokens = self.stop_tokens.clone();
        for token in extra {
            if !tokens.contains(token) {
                tokens.push(token.clone());
            }
        }
        tokens
    }
}

/// The core side of one host connection.
#[derive(Debug, Clone)]
pub struct Core {
    messenger: Messenger<ToCore, FromCore>,
    ide: MessengerIde,
}

impl Core {
    /// Install the core's handlers on `connection`. Call [`Core::start`] to
    /// begin serving.
    pub fn new(
        connection: Connection,
        generator: Arc<dyn Generator>,
        settings: CompletionSettings,
    ) -> Result<Self, BusError> {
        Self::with_prompt_log(connection, generator, settings, None)
    }

    /// Like [`Core::new`], also recording every prompt in `prompt_log`.
    pub fn with_prompt_log(
        connection: Connection,
        generator: Arc<dyn Generator>,
        settings: CompletionSettings,
        prompt_log: Option<PromptLog>,
    ) -> Result<Self, BusError> {
        let messenger = Messenger::new(connection);
        let ide = MessengerIde::new(messenger.clone());
        let settings = Arc::new(settings);
        let prompt_log = prompt_log.map(Arc::new);

        messenger.on::<Ping, _, _>(|message| async move { Ok(message) })?;

        {
            let connection = messenger.connection().downgrade();
            let generator = Arc::clone(&generator);
            let settings = Arc::clone(&settings);
            let prompt_log = prompt_log.clone();
            messenger.on::<AutocompleteComplete, _, _>(move |input| {
                let connection = connection.upgrade();
                let generator = Arc::clone(&generator);
                let settings = Arc::clone(&settings);
                let prompt_log = prompt_log.clone();
                async move {
                    let connection = connection.ok_or_else(|| {
                        BusError::TransportDisconnected("core connection dropped".to_string())
                    })?;
                    let ide = MessengerIde::new(Messenger::new(connection));
                    let context = Generation {
                        generator: generator.as_ref(),
                        settings: &settings,
                        prompt_log: prompt_log.as_deref(),
                    };
                    autocomplete(&ide, context, input).await
                }
            })?;
        }

        {
            let generator = Arc::clone(&generator);
            let settings = Arc::clone(&settings);
            let prompt_log = prompt_log.clone();
            messenger.on_stream::<LlmStreamComplete, _, _>(move |input, sink| {
                let generator = Arc::clone(&generator);
                let settings = Arc::clone(&settings);
                let prompt_log = prompt_log.clone();
                async move {
                    let context = Generation {
                        generator: generator.as_ref(),
                        settings: &settings,
                        prompt_log: prompt_log.as_deref(),
                    };
                    stream_complete(context, input, sink).await
                }
            })?;
        }

        messenger.on::<FilesChanged, _, _>(|input| async move {
            tracing::info!(count = input.uris.len(), "files changed");
            for uri in &input.uris {
                tracing::debug!(%uri, "changed");
            }
            Ok(())
        })?;

        Ok(Self { messenger, ide })
    }

    pub fn start(&self) -> Result<(), BusError> {
        self.messenger.connection().start()
    }

    pub async fn closed(&self) {
        self.messenger.connection().closed().await;
    }

    #[must_use]
    pub fn messenger(&self) -> &Messenger<ToCore, FromCore> {
        &self.messenger
    }

    /// Editor operations on the connected host.
    #[must_use]
    pub fn ide(&self) -> &MessengerIde {
        &self.ide
    }
}

fn generation_failed(message_type: &str, err: &anyhow::Error) -> BusError {
    BusError::CollaboratorFailure(format!("{message_type}: {err:#}"))
}

/// What one request needs to run the generator.
#[derive(Clone, Copy)]
struct Generation<'a> {
    generator: &'a dyn Generator,
    settings: &'a CompletionSettings,
    prompt_log: Option<&'a PromptLog>,
}

impl Generation<'_> {
    async fn generate(
        self,
        message_type: &str,
        prompt: &str,
    ) -> Result<BoxStream<'static, String>, BusError> {
        if let Some(log) = self.prompt_log {
            log.record(prompt).await;
        }
        self.generator
            .generate(prompt)
            .map_err(|e| generation_failed(message_type, &e))
    }
}

async fn autocomplete<I: Ide>(
    ide: &I,
    context: Generation<'_>,
    input: AutocompleteInput,
) -> Result<AutocompleteOutcome, BusError> {
    let settings = context.settings;
    let name = AutocompleteComplete::NAME;
    let contents = ide
        .read_file(&input.filepath)
        .await
        .map_err(|e| generation_failed(name, &e))?;
    let prompt = prompt_prefix(&contents, input.line, input.character);

    let source = context.generate(name, prompt).await?;
    let (abort, registration) = AbortHandle::new_pair();
    let generated = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&generated);
    let source = Abortable::new(source, registration).inspect(move |chunk| {
        counter.fetch_add(chunk.len(), Ordering::Relaxed);
    });

    let pipeline = Pipeline::new(PipelineOptions {
        stop_tokens: settings.merged_tokens(&input.stop_tokens),
        multiline: input.multiline.unwrap_or(settings.multiline),
        ..PipelineOptions::default()
    });
    let completion = pipeline
        .apply(source, move || abort.abort())
        .collect::<Vec<_>>()
        .await
        .concat();

    let truncated = completion.len() < generated.load(Ordering::Relaxed);
    tracing::debug!(
        filepath = %input.filepath,
        len = completion.len(),
        truncated,
        "completion"
    );
    Ok(AutocompleteOutcome {
        completion,
        truncated,
    })
}

async fn stream_complete(
    context: Generation<'_>,
    input: StreamCompleteInput,
    sink: ChunkSink<LlmStreamComplete>,
) -> Result<(), BusError> {
    let mut chunks = context
        .generate(LlmStreamComplete::NAME, &input.prompt)
        .await?
        .stop_at_stop_tokens(context.settings.merged_tokens(&input.stop_tokens));
    while let Some(chunk) = chunks.next().await {
        sink.send(chunk)?;
    }
    Ok(())
}

/// The document text before the cursor. Positions past the end clamp to it.
#[must_use]
pub fn prompt_prefix(contents: &str, line: u32, character: u32) -> &str {
    let mut offset = 0;
    for (index, text) in contents.split_inclusive('\n').enumerate() {
        if index == line as usize {
            let end = text
                .char_indices()
                .nth(character as usize)
                .map_or(text.len(), |(i, _)| i);
            return &contents[..offset + end];
        }
        offset += text.len();
    }
    contents
}
