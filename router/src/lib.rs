//! Host-side router.
//!
//! The editor host owns one [`Router`] per UI surface. It holds the
//! connection to the core and the connection to the surface, forwards the
//! pass-through types between them unchanged, and answers the rest through
//! the host's [`Ide`] collaborator.

mod ide;
mod router;
mod routes;
mod surfaces;

pub use ide::{Ide, IdeOp, dispatch_ide};
pub use router::Router;
pub use routes::{
    CORE_TO_WEBVIEW_PASS_THROUGH, CoreRoute, LocalOp, WEBVIEW_TO_CORE_PASS_THROUGH, WebviewRoute,
    route_from_core, route_from_webview,
};
pub use surfaces::{SurfaceManager, SurfaceState};
