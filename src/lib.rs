//! Security-header gateway for the playlist generator web application.
//!
//! Every response, for every path, leaves through a fixed header policy:
//! Content-Security-Policy, framing and sniffing restrictions, referrer
//! control, HSTS and a Permissions-Policy. The application itself (Spotify
//! OAuth, LLM prompting, playlist creation, UI) runs behind the gateway as
//! an upstream.
//!
//! ```text
//!   Client ──▶ request id ──▶ trace ──▶ security headers ──▶ timeout ──▶ upstream app
//!          ◀──────────────────────────── (policy applied) ◀──────────────────────┘
//! ```

// Core subsystems
pub mod config;
pub mod http;
pub mod policy;
pub mod security;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use policy::{default_table, PolicyTable};
