//! Built-in header policy for the playlist application.
//!
//! One set, matching every path, with seven rules. The browser needs to
//! reach the Spotify Web API and accounts service, the Spotify image CDNs
//! for cover art, and the LLM providers that turn prompts into track lists.

use crate::policy::csp::ContentSecurityPolicy;
use crate::policy::matcher::RouteMatcher;
use crate::policy::rule::{HeaderRule, KnownHeader};
use crate::policy::set::{PolicySet, PolicyTable};
use crate::policy::values::{Hsts, PermissionsPolicy};

/// Image origins serving album and playlist artwork.
pub const SPOTIFY_IMAGE_ORIGINS: [&str; 3] = [
    "https://i.scdn.co",
    "https://image-cdn-ak.spotifycdn.com",
    "https://image-cdn-fa.spotifycdn.com",
];

/// Origins the frontend talks to directly.
pub const API_ORIGINS: [&str; 4] = [
    "https://api.spotify.com",
    "https://accounts.spotify.com",
    "https://api.anthropic.com",
    "https://api.openai.com",
];

/// Browser features the application never uses.
pub const DISABLED_FEATURES: [&str; 4] = ["camera", "microphone", "geolocation", "payment"];

/// Number of headers the built-in policy sets.
pub const BUILTIN_RULE_COUNT: usize = 7;

pub fn content_security_policy() -> ContentSecurityPolicy {
    let mut img_sources = vec!["'self'"];
    img_sources.extend(SPOTIFY_IMAGE_ORIGINS);
    img_sources.extend(["data:", "blob:"]);

    ContentSecurityPolicy::new()
        .directive("default-src", ["'self'"])
        .directive("script-src", ["'self'", "'unsafe-inline'", "'unsafe-eval'"])
        .directive("style-src", ["'self'", "'unsafe-inline'"])
        .directive("img-src", img_sources)
        .directive("font-src", ["'self'"])
        .directive("connect-src", std::iter::once("'self'").chain(API_ORIGINS))
        .directive("form-action", ["'self'"])
        .directive("frame-ancestors", ["'none'"])
        .directive("base-uri", ["'self'"])
}

/// The Header Policy Provider: entries the response pipeline merges into
/// every matching response.
pub fn default_table() -> PolicyTable {
    let rules = [
        (KnownHeader::ContentSecurityPolicy, content_security_policy().render()),
        (KnownHeader::XFrameOptions, "DENY".to_string()),
        (KnownHeader::XContentTypeOptions, "nosniff".to_string()),
        (KnownHeader::XXssProtection, "1; mode=block".to_string()),
        (KnownHeader::ReferrerPolicy, "strict-origin-when-cross-origin".to_string()),
        (KnownHeader::StrictTransportSecurity, Hsts::default().to_string()),
        (
            KnownHeader::PermissionsPolicy,
            PermissionsPolicy::disable(DISABLED_FEATURES).to_string(),
        ),
    ]
    .into_iter()
    .filter_map(|(name, value)| match HeaderRule::new(name, value) {
        Ok(rule) => Some(rule),
        Err(e) => {
            tracing::error!(header = %name, error = %e, "Built-in header rule rejected");
            None
        }
    })
    .collect::<Vec<_>>();
    debug_assert_eq!(rules.len(), BUILTIN_RULE_COUNT, "built-in header rule rejected");

    PolicyTable::new(vec![PolicySet::new(RouteMatcher::all(), rules)])
}
