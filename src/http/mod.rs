//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (assign request ID)
//!     → forward.rs (upstream application, or built-in 404)
//!     → security::headers (policy headers on the way out)
//!     → Send to client
//! ```

pub mod forward;
pub mod request;
pub mod server;

pub use forward::Forwarder;
pub use request::{RequestIdExt, X_REQUEST_ID};
pub use server::{HttpServer, ServerError};
