//! Security header policy.
//!
//! # Data Flow
//! ```text
//! Built-in provider (provider.rs) or [[security.policies]] in config
//!     → rule.rs (known header + validated value)
//!     → matcher.rs (compile path glob)
//!     → set.rs (PolicySet per matcher, PolicyTable in order)
//!     → shared via Arc with the response pipeline (security::headers)
//! ```
//!
//! # Design Decisions
//! - The table is a value, built once at startup and never mutated
//! - No request-time inputs other than the path
//! - Structured values (CSP, HSTS, Permissions-Policy) are built from
//!   typed pieces and rendered to the exact wire strings

pub mod csp;
pub mod matcher;
pub mod provider;
pub mod rule;
pub mod set;
pub mod values;

pub use csp::{ContentSecurityPolicy, CspDirective};
pub use matcher::RouteMatcher;
pub use provider::default_table;
pub use rule::{HeaderRule, KnownHeader};
pub use set::{PolicySet, PolicyTable};
pub use values::{Hsts, PermissionsPolicy};

/// Errors building policy values from untrusted text (config files).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    #[error("unknown response header '{0}'")]
    UnknownHeader(String),

    #[error("invalid value for {header}: {value:?}")]
    InvalidValue { header: &'static str, value: String },

    #[error("invalid route pattern '{pattern}': {reason}")]
    InvalidPattern {
        pattern: String,
        reason: &'static str,
    },

    #[error("duplicate CSP directive '{0}'")]
    DuplicateDirective(String),

    #[error("CSP value has no directives")]
    EmptyPolicy,
}
