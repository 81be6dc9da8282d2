use std::fmt;
use std::path::Path;
use std::sync::Arc;

use futures_util::StreamExt;
use serde_json::Value;
use tether_bus::{BusError, Connection, ConnectionState, Messenger, WeakConnection};
use tether_types::SurfaceId;
use tether_types::protocol::{
    CreateFile, FromCore, FromCoreType, FromWebview, FromWebviewType, Member, MessageType,
    ShowFile, ToCore, ToWebview, ToggleFullScreen,
};

use crate::ide::collaborator_failure;
use crate::routes::{CoreRoute, LocalOp, WebviewRoute, route_from_core, route_from_webview};
use crate::{Ide, IdeOp, SurfaceManager, dispatch_ide};

/// Bridges one UI surface to the core.
///
/// Built with [`Router::wire`], which installs a handler for every inbound
/// type of both connections. Nothing flows until [`Router::start`].
pub struct Router<I> {
    core: Messenger<FromCore, ToCore>,
    webview: Messenger<FromWebview, ToWebview>,
    ide: Arc<I>,
    surfaces: Arc<SurfaceManager>,
    surface: SurfaceId,
}

impl<I> fmt::Debug for Router<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("surface", &self.surface)
            .field("core", &self.core)
            .field("webview", &self.webview)
            .finish_non_exhaustive()
    }
}

impl<I: Ide> Router<I> {
    pub fn wire(
        core: Connection,
        webview: Connection,
        ide: Arc<I>,
        surfaces: Arc<SurfaceManager>,
        surface: SurfaceId,
    ) -> Result<Self, BusError> {
        surfaces.register(surface.clone());
        let router = Self {
            core: Messenger::new(core),
            webview: Messenger::new(webview),
            ide,
            surfaces,
            surface,
        };

        for &tag in FromWebviewType::ALL {
            router.install_webview(tag)?;
        }
        for &tag in FromCoreType::ALL {
            router.install_core(tag)?;
        }
        router.verify_coverage()?;

        tracing::debug!(surface = %router.surface, "router wired");
        Ok(router)
    }

    fn install_webview(&self, tag: FromWebviewType) -> Result<(), BusError> {
        let name = tag.as_str();
        let webview = self.webview.connection();
        match route_from_webview(tag) {
            WebviewRoute::ForwardToCore(target) if target.is_streaming() => {
                forward_stream(webview, self.core.connection().downgrade(), name)
            }
            WebviewRoute::ForwardToCore(_) => {
                forward(webview, self.core.connection().downgrade(), name)
            }
            WebviewRoute::Ide(op) => install_ide(webview, Arc::clone(&self.ide), op),
            WebviewRoute::Local(op) => self.install_local(op),
        }
    }

    fn install_core(&self, tag: FromCoreType) -> Result<(), BusError> {
        let core = self.core.connection();
        match route_from_core(tag) {
            CoreRoute::ForwardToWebview(_) => {
                forward(core, self.webview.connection().downgrade(), tag.as_str())
            }
            CoreRoute::Ide(op) => install_ide(core, Arc::clone(&self.ide), op),
        }
    }

    fn install_local(&self, op: LocalOp) -> Result<(), BusError> {
        match op {
            LocalOp::ShowFile => {
                let ide = Arc::clone(&self.ide);
                self.webview.on::<ShowFile, _, _>(move |input| {
                    let ide = Arc::clone(&ide);
                    async move {
                        ide.open_file(&input.filepath)
                            .await
                            .map_err(|e| collaborator_failure(ShowFile::NAME, &e))
                    }
                })
            }
            LocalOp::CreateFile => {
                let ide = Arc::clone(&self.ide);
                self.webview.on::<CreateFile, _, _>(move |input| {
                    let ide = Arc::clone(&ide);
                    async move { create_file(&*ide, &input.path).await }
                })
            }
            LocalOp::ToggleFullScreen => {
                let surfaces = Arc::clone(&self.surfaces);
                let surface = self.surface.clone();
                self.webview.on::<ToggleFullScreen, _, _>(move |()| {
                    let full_screen = surfaces.toggle_full_screen(&surface);
                    tracing::debug!(%surface, full_screen, "toggled full screen");
                    async move { Ok(full_screen) }
                })
            }
        }
    }

    /// Check that every inbound type of both tables has a handler.
    pub fn verify_coverage(&self) -> Result<(), BusError> {
        let webview = self.webview.connection();
        let core = self.core.connection();
        let missing = FromWebviewType::ALL
            .iter()
            .map(|tag| tag.as_str())
            .filter(|name| !webview.has_handler(name))
            .chain(
                FromCoreType::ALL
                    .iter()
                    .map(|tag| tag.as_str())
                    .filter(|name| !core.has_handler(name)),
            )
            .next();
        match missing {
            Some(name) => Err(BusError::UnknownMessageType(name.to_string())),
            None => Ok(()),
        }
    }

    pub fn start(&self) -> Result<(), BusError> {
        self.core.connection().start()?;
        self.webview.connection().start()?;
        tracing::info!(surface = %self.surface, "router started");
        Ok(())
    }

    /// Close both connections and forget the surface.
    pub fn shutdown(&self) {
        self.webview.connection().close();
        self.core.connection().close();
        self.surfaces.remove(&self.surface);
        tracing::info!(surface = %self.surface, "router shut down");
    }

    #[must_use]
    pub fn surface(&self) -> &SurfaceId {
        &self.surface
    }

    /// `(core, webview)` connection states.
    #[must_use]
    pub fn states(&self) -> (ConnectionState, ConnectionState) {
        (
            self.core.connection().state(),
            self.webview.connection().state(),
        )
    }

    pub async fn request_core<M: Member<ToCore>>(
        &self,
        payload: M::Request,
    ) -> Result<M::Response, BusError> {
        self.core.request::<M>(payload).await
    }

    pub fn notify_core<M: Member<ToCore>>(&self, payload: M::Request) {
        self.core.notify::<M>(payload);
    }

    pub async fn request_webview<M: Member<ToWebview>>(
        &self,
        payload: M::Request,
    ) -> Result<M::Response, BusError> {
        self.webview.request::<M>(payload).await
    }

    pub fn notify_webview<M: Member<ToWebview>>(&self, payload: M::Request) {
        self.webview.notify::<M>(payload);
    }
}

fn peer_gone(name: &str) -> BusError {
    BusError::TransportDisconnected(format!("{name}: peer connection dropped"))
}

/// Reissue the request on `target` under the same id and return its answer
/// unchanged, errors included.
fn forward(from: &Connection, target: WeakConnection, name: &'static str) -> Result<(), BusError> {
    from.on_request(name, move |id, data| {
        let target = target.upgrade();
        async move {
            let target = target.ok_or_else(|| peer_gone(name))?;
            tracing::trace!(to = %target.label(), %id, message_type = name, "forward");
            target.request_with_id(id, name, data).await
        }
    })
}

fn forward_stream(
    from: &Connection,
    target: WeakConnection,
    name: &'static str,
) -> Result<(), BusError> {
    from.on_stream(name, move |id, data, sink| {
        let target = target.upgrade();
        async move {
            let target = target.ok_or_else(|| peer_gone(name))?;
            tracing::trace!(to = %target.label(), %id, message_type = name, "forward stream");
            let mut chunks = target.request_stream_with_id(id, name, data)?;
            while let Some(chunk) = chunks.next().await {
                sink.send(chunk?)?;
            }
            Ok(Value::Null)
        }
    })
}

fn install_ide<I: Ide>(on: &Connection, ide: Arc<I>, op: IdeOp) -> Result<(), BusError> {
    on.on_request(op.as_str(), move |_id, data| {
        let ide = Arc::clone(&ide);
        async move { dispatch_ide(&*ide, op, data).await }
    })
}

async fn create_file<I: Ide>(ide: &I, path: &str) -> Result<(), BusError> {
    let fail = |e: &anyhow::Error| collaborator_failure(CreateFile::NAME, e);
    let dirs = ide.get_workspace_dirs().await.map_err(|e| fail(&e))?;
    let Some(root) = dirs.first() else {
        return Err(fail(&anyhow::anyhow!("no workspace directory is open")));
    };

    let target = Path::new(root).join(path.trim_start_matches('/'));
    let exists = tokio::fs::try_exists(&target)
        .await
        .map_err(|e| fail(&anyhow::Error::from(e)))?;
    let target = target.to_string_lossy();
    if !exists {
        ide.write_file(&target, "").await.map_err(|e| fail(&e))?;
    }
    ide.open_file(&target).await.map_err(|e| fail(&e))
}
