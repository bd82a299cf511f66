//! Route matching for policy sets.
//!
//! # Responsibilities
//! - Parse path-glob patterns at configuration time
//! - Match request paths against compiled patterns
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - `*` and `?` never cross a `/`; only `**` spans segments
//! - `/(.*)` is accepted as an alias of `/**` so framework-style configs
//!   can be pasted in unchanged
//! - No regex: patterns are compiled to segment lists
//! - Matching backtracks only to the most recent wildcard, so a request
//!   path costs at most O(path x pattern) regardless of how many
//!   wildcards an operator writes

use std::fmt;

use serde::Serialize;

use crate::policy::PolicyError;

/// Pattern text that matches every path.
pub const MATCH_ALL: &str = "/**";

const MATCH_ALL_ALIAS: &str = "/(.*)";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(char),
    /// Any run of characters within one segment.
    Star,
    /// Exactly one character.
    Question,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// `**`: zero or more whole segments.
    AnyDepth,
    Glob(Vec<Token>),
}

/// A compiled path-glob pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatcher {
    source: String,
    segments: Vec<Segment>,
}

impl RouteMatcher {
    /// Matcher for every request path.
    pub fn all() -> Self {
        Self {
            source: MATCH_ALL.to_string(),
            segments: vec![Segment::AnyDepth],
        }
    }

    /// Compile a pattern such as `/api/**` or `/assets/*.js`.
    pub fn parse(pattern: &str) -> Result<Self, PolicyError> {
        let invalid = |reason: &'static str| PolicyError::InvalidPattern {
            pattern: pattern.to_string(),
            reason,
        };

        if pattern.is_empty() {
            return Err(invalid("pattern is empty"));
        }
        if pattern == MATCH_ALL_ALIAS {
            return Ok(Self::all());
        }
        let Some(rest) = pattern.strip_prefix('/') else {
            return Err(invalid("pattern must start with '/'"));
        };

        let mut segments = Vec::new();
        for raw in rest.split('/') {
            if raw == "**" {
                // Consecutive `**` collapse into one.
                if segments.last() != Some(&Segment::AnyDepth) {
                    segments.push(Segment::AnyDepth);
                }
                continue;
            }
            if raw.contains("**") {
                return Err(invalid("'**' must be a whole path segment"));
            }
            let tokens = raw
                .chars()
                .map(|c| match c {
                    '*' => Token::Star,
                    '?' => Token::Question,
                    other => Token::Literal(other),
                })
                .collect();
            segments.push(Segment::Glob(tokens));
        }

        Ok(Self {
            source: pattern.to_string(),
            segments,
        })
    }

    /// The pattern as written in configuration.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn matches_all(&self) -> bool {
        self.segments == [Segment::AnyDepth]
    }

    /// Returns true if the request path matches this pattern.
    ///
    /// `path` is the URI path only; a missing leading `/` is tolerated.
    pub fn matches(&self, path: &str) -> bool {
        let path = path.strip_prefix('/').unwrap_or(path);
        let parts: Vec<Vec<char>> = path.split('/').map(|p| p.chars().collect()).collect();
        wildcard_match(
            &self.segments,
            &parts,
            |segment| *segment == Segment::AnyDepth,
            |segment, part| match segment {
                Segment::Glob(tokens) => match_tokens(tokens, part),
                Segment::AnyDepth => false,
            },
        )
    }
}

impl fmt::Display for RouteMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn match_tokens(tokens: &[Token], chars: &[char]) -> bool {
    wildcard_match(
        tokens,
        chars,
        |token| *token == Token::Star,
        |token, c| match token {
            Token::Literal(expected) => expected == c,
            Token::Question => true,
            Token::Star => false,
        },
    )
}

/// Greedy wildcard matching over any element type.
///
/// `is_star` elements match any run of input (including none); every other
/// element must satisfy `matches_one` against exactly one input item. On a
/// mismatch only the most recent star is retried, one item further along.
fn wildcard_match<P, T>(
    pattern: &[P],
    input: &[T],
    is_star: impl Fn(&P) -> bool,
    matches_one: impl Fn(&P, &T) -> bool,
) -> bool {
    let (mut p, mut i) = (0, 0);
    // (pattern index after the star, input index the star currently ends at)
    let mut resume: Option<(usize, usize)> = None;

    while i < input.len() {
        if p < pattern.len() && is_star(&pattern[p]) {
            p += 1;
            resume = Some((p, i));
        } else if p < pattern.len() && matches_one(&pattern[p], &input[i]) {
            p += 1;
            i += 1;
        } else if let Some((after_star, star_end)) = resume {
            p = after_star;
            i = star_end + 1;
            resume = Some((after_star, i));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(is_star)
}

impl Serialize for RouteMatcher {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}
