//! Typed builders for structured header values other than CSP.

use std::fmt;

/// One year, the HSTS max-age browsers expect for preload-grade policies.
pub const ONE_YEAR_SECS: u64 = 31_536_000;

/// `Strict-Transport-Security` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hsts {
    pub max_age: u64,
    pub include_subdomains: bool,
    pub preload: bool,
}

impl Default for Hsts {
    fn default() -> Self {
        Self {
            max_age: ONE_YEAR_SECS,
            include_subdomains: true,
            preload: false,
        }
    }
}

impl fmt::Display for Hsts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "max-age={}", self.max_age)?;
        if self.include_subdomains {
            f.write_str("; includeSubDomains")?;
        }
        if self.preload {
            f.write_str("; preload")?;
        }
        Ok(())
    }
}

/// `Permissions-Policy` value that disables the listed features for every
/// origin, e.g. `camera=(), microphone=()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionsPolicy {
    disabled: Vec<String>,
}

impl PermissionsPolicy {
    pub fn disable<I, S>(features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            disabled: features.into_iter().map(Into::into).collect(),
        }
    }

    pub fn disabled(&self) -> &[String] {
        &self.disabled
    }
}

impl fmt::Display for PermissionsPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, feature) in self.disabled.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}=()", feature)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hsts_rendering() {
        assert_eq!(Hsts::default().to_string(), "max-age=31536000; includeSubDomains");

        let hsts = Hsts {
            max_age: 600,
            include_subdomains: false,
            preload: true,
        };
        assert_eq!(hsts.to_string(), "max-age=600; preload");
    }

    #[test]
    fn test_permissions_policy_rendering() {
        let policy = PermissionsPolicy::disable(["camera", "microphone"]);
        assert_eq!(policy.to_string(), "camera=(), microphone=()");
        assert_eq!(PermissionsPolicy::default().to_string(), "");
    }
}
