//! Server-side rendering.
//!
//! [`Renderer`] is the render contract; [`SsrGateway`] applies it to live
//! requests in front of static or dev serving, and [`verify`] runs it once.

mod context;
mod gateway;
mod render;
mod verify;

pub use context::{extract_access_token, RequestContext};
pub use gateway::{public_message, ssr_middleware, RenderDecision, SharedGateway, SsrGateway};
pub use render::{init_render_environment, NodeRenderer, Renderer};
pub use verify::verify;
