// src/pkgspec.rs

//! Package specs: `@scope/name` or bare `name`
//!
//! A bare name lives in the default scope. The canonical textual form drops
//! the default scope, so `@user/left-pad` and `left-pad` are the same key in
//! the dependency list and the module index.

use crate::error::{Error, Result};
use crate::filesystem::is_plain_segment;
use std::fmt;
use std::str::FromStr;

/// Scope assigned to bare package names
pub const DEFAULT_SCOPE: &str = "user";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageSpec {
    pub scope: String,
    pub name: String,
}

impl PackageSpec {
    pub fn new(scope: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        let scope = scope.into();
        let name = name.into();
        let spec = format!("@{scope}/{name}");
        check_segment(&spec, "scope", &scope)?;
        check_segment(&spec, "name", &name)?;
        Ok(Self { scope, name })
    }

    /// Parse `@scope/name` or `name`
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let invalid = |reason: &str| Error::InvalidSpec {
            spec: input.to_string(),
            reason: reason.to_string(),
        };

        if trimmed.is_empty() {
            return Err(invalid("empty package spec"));
        }

        match trimmed.strip_prefix('@') {
            Some(rest) => {
                let (scope, name) = rest
                    .split_once('/')
                    .ok_or_else(|| invalid("expected @scope/name"))?;
                Self::new(scope, name)
                    .map_err(|_| invalid("scope and name must be plain, non-empty segments"))
            }
            None => Self::new(DEFAULT_SCOPE, trimmed)
                .map_err(|_| invalid("name must be a plain, non-empty segment")),
        }
    }

    pub fn is_default_scope(&self) -> bool {
        self.scope == DEFAULT_SCOPE
    }

    /// Always-qualified form, `@scope/name`
    pub fn qualified(&self) -> String {
        format!("@{}/{}", self.scope, self.name)
    }
}

fn check_segment(spec: &str, what: &str, value: &str) -> Result<()> {
    if is_plain_segment(value) && !value.contains('@') {
        Ok(())
    } else {
        Err(Error::InvalidSpec {
            spec: spec.to_string(),
            reason: format!("invalid {what} '{value}'"),
        })
    }
}

impl fmt::Display for PackageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_default_scope() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "@{}/{}", self.scope, self.name)
        }
    }
}

impl FromStr for PackageSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scoped() {
        let spec = PackageSpec::parse("@acme/widget").unwrap();
        assert_eq!(spec.scope, "acme");
        assert_eq!(spec.name, "widget");
        assert_eq!(spec.to_string(), "@acme/widget");
    }

    #[test]
    fn test_bare_name_uses_default_scope() {
        let spec = PackageSpec::parse("left-pad").unwrap();
        assert_eq!(spec.scope, DEFAULT_SCOPE);
        assert_eq!(spec.qualified(), "@user/left-pad");
        assert_eq!(spec.to_string(), "left-pad");
    }

    #[test]
    fn test_default_scope_canonicalizes() {
        let explicit: PackageSpec = "@user/left-pad".parse().unwrap();
        let bare: PackageSpec = "left-pad".parse().unwrap();
        assert_eq!(explicit, bare);
        assert_eq!(explicit.to_string(), "left-pad");
    }

    #[test]
    fn test_invalid_specs() {
        for bad in ["", "@acme", "@/widget", "@acme/", "@acme/a/b", "a b", "@ac me/x", "@a/@b"] {
            let err = PackageSpec::parse(bad).unwrap_err();
            assert!(
                matches!(err, Error::InvalidSpec { .. }),
                "expected InvalidSpec for {bad:?}, got {err:?}"
            );
        }
    }
}
