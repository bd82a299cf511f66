//! Content-Security-Policy values.
//!
//! A CSP value is an ordered list of directives, each a name followed by
//! space-separated sources. Rendering joins directives with `"; "` and never
//! emits a trailing semicolon. Directive order carries no meaning to the
//! browser but is preserved so rendered values are stable.

use std::fmt;

use crate::policy::PolicyError;

/// One CSP clause, e.g. `img-src 'self' data:`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CspDirective {
    name: String,
    sources: Vec<String>,
}

impl CspDirective {
    pub fn new<I, S>(name: impl Into<String>, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into().to_ascii_lowercase(),
            sources: sources.into_iter().map(Into::into).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Sources that are not quoted keywords (`'self'`, `'none'`, nonces...).
    ///
    /// Scheme sources such as `data:` and `blob:` are included.
    pub fn external_sources(&self) -> impl Iterator<Item = &str> {
        self.sources
            .iter()
            .map(String::as_str)
            .filter(|s| !(s.starts_with('\'') && s.ends_with('\'')))
    }
}

impl fmt::Display for CspDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for source in &self.sources {
            write!(f, " {}", source)?;
        }
        Ok(())
    }
}

/// Ordered set of CSP directives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentSecurityPolicy {
    directives: Vec<CspDirective>,
}

impl ContentSecurityPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a directive (builder style). A repeated name replaces the
    /// earlier directive in place.
    pub fn directive<I, S>(mut self, name: &str, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let directive = CspDirective::new(name, sources);
        match self.directives.iter_mut().find(|d| d.name == directive.name) {
            Some(existing) => *existing = directive,
            None => self.directives.push(directive),
        }
        self
    }

    /// Parse a rendered CSP value.
    ///
    /// Empty clauses (from `;;` or a trailing `;`) are skipped; the
    /// validation layer reports trailing semicolons separately.
    pub fn parse(value: &str) -> Result<Self, PolicyError> {
        let mut directives: Vec<CspDirective> = Vec::new();

        for clause in value.split(';') {
            let mut tokens = clause.split_ascii_whitespace();
            let Some(name) = tokens.next() else {
                continue;
            };
            let directive = CspDirective::new(name, tokens);
            if directives.iter().any(|d| d.name == directive.name) {
                return Err(PolicyError::DuplicateDirective(directive.name));
            }
            directives.push(directive);
        }

        if directives.is_empty() {
            return Err(PolicyError::EmptyPolicy);
        }
        Ok(Self { directives })
    }

    pub fn get(&self, name: &str) -> Option<&CspDirective> {
        self.directives
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(name))
    }

    pub fn directives(&self) -> &[CspDirective] {
        &self.directives
    }

    pub fn len(&self) -> usize {
        self.directives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    /// Render as a header value.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ContentSecurityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, directive) in self.directives.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", directive)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_has_no_trailing_semicolon() {
        let csp = ContentSecurityPolicy::new()
            .directive("default-src", ["'self'"])
            .directive("frame-ancestors", ["'none'"]);
        assert_eq!(csp.render(), "default-src 'self'; frame-ancestors 'none'");
    }

    #[test]
    fn test_builder_replaces_repeated_directive() {
        let csp = ContentSecurityPolicy::new()
            .directive("img-src", ["'self'"])
            .directive("font-src", ["'self'"])
            .directive("img-src", ["'self'", "data:"]);
        assert_eq!(csp.render(), "img-src 'self' data:; font-src 'self'");
    }

    #[test]
    fn test_parse_tolerates_extra_whitespace() {
        let csp = ContentSecurityPolicy::parse("  default-src   'self' ;img-src data: ;").unwrap();
        assert_eq!(csp.len(), 2);
        assert_eq!(csp.get("IMG-SRC").unwrap().sources(), ["data:"]);
        assert_eq!(csp.render(), "default-src 'self'; img-src data:");
    }

    #[test]
    fn test_parse_rejects_duplicates_and_empty() {
        assert!(matches!(
            ContentSecurityPolicy::parse("img-src a; img-src b"),
            Err(PolicyError::DuplicateDirective(ref n)) if n == "img-src"
        ));
        assert!(matches!(
            ContentSecurityPolicy::parse(" ; ;"),
            Err(PolicyError::EmptyPolicy)
        ));
    }

    #[test]
    fn test_external_sources_skip_keywords() {
        let directive = CspDirective::new(
            "script-src",
            ["'self'", "'unsafe-inline'", "https://cdn.example", "blob:"],
        );
        let external: Vec<_> = directive.external_sources().collect();
        assert_eq!(external, ["https://cdn.example", "blob:"]);
    }
}
