//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Outgoing response (upstream or gateway-generated):
//!     → headers.rs (select policy sets by request path, insert headers)
//!     → Send to client
//! ```
//!
//! # Design Decisions
//! - Uniform policy: same headers regardless of status, user or upstream
//! - Gateway headers always win over upstream-provided ones

pub mod headers;

pub use headers::{build_security_layer, SecurityHeadersLayer, SecurityHeadersService};
