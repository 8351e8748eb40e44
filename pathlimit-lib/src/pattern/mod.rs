//! Route patterns for rate limit rules.
//!
//! A pattern is an optional HTTP method followed by a path:
//!
//! ```text
//! GET /accounts/{id}/orders
//! /files/{path...}
//! ```
//!
//! Each `/`-delimited component is either a literal, a single-segment identifier
//! (`{name}`), or a trailing multi-segment identifier (`{name...}`) that matches one
//! or more remaining segments.
//!
//! Patterns form a partial order by specificity (see [`Relationship`]); the rate
//! limit manager uses it to reject ambiguous configurations and to evaluate the
//! most specific pattern first.

mod matcher;
mod relationship;

pub use matcher::split_path;
pub use relationship::Relationship;

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Pattern syntax errors. All of them are terminal for the configuration that
/// carried the pattern.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("pattern is empty")]
    Empty,

    #[error("path must start with '/'")]
    MissingLeadingSlash,

    #[error("unknown method {0:?}")]
    UnknownMethod(String),

    #[error("malformed identifier {0:?}")]
    MalformedIdentifier(String),

    #[error("multi-segment identifier {0:?} must be the last segment")]
    MultiNotLast(String),

    #[error("identifier name is empty")]
    EmptyIdentifier,

    #[error("duplicate identifier {0:?}")]
    DuplicateIdentifier(String),
}

/// HTTP methods a pattern may be restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
            Method::Options => "OPTIONS",
        }
    }
}

impl FromStr for Method {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            "PATCH" => Ok(Method::Patch),
            "OPTIONS" => Ok(Method::Options),
            other => Err(PatternError::UnknownMethod(other.to_string())),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `/`-delimited component of a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Matches exactly this text.
    Literal(String),
    /// Matches any single segment.
    Identifier(String),
    /// Matches one or more trailing segments.
    MultiIdentifier(String),
}

impl Segment {
    pub fn is_multi(&self) -> bool {
        matches!(self, Segment::MultiIdentifier(_))
    }

    fn identifier_name(&self) -> Option<&str> {
        match self {
            Segment::Literal(_) => None,
            Segment::Identifier(name) | Segment::MultiIdentifier(name) => Some(name),
        }
    }

    fn parse(component: &str) -> Result<Self, PatternError> {
        let Some(inner) = component.strip_prefix('{') else {
            return Ok(Segment::Literal(component.to_string()));
        };
        let inner = inner
            .strip_suffix('}')
            .ok_or_else(|| PatternError::MalformedIdentifier(component.to_string()))?;

        let (name, multi) = match inner.strip_suffix("...") {
            Some(name) => (name, true),
            None => (inner, false),
        };
        if name.is_empty() {
            return Err(PatternError::EmptyIdentifier);
        }
        if name.contains(['{', '}']) {
            return Err(PatternError::MalformedIdentifier(component.to_string()));
        }

        if multi {
            Ok(Segment::MultiIdentifier(name.to_string()))
        } else {
            Ok(Segment::Identifier(name.to_string()))
        }
    }
}

/// A parsed rate limit rule path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    source: String,
    method: Option<Method>,
    segments: Vec<Segment>,
}

impl Pattern {
    /// Parse a pattern such as `"GET /foo/{id}"` or `"/files/{path...}"`.
    pub fn parse(text: &str) -> Result<Self, PatternError> {
        if text.is_empty() {
            return Err(PatternError::Empty);
        }

        let (method, path) = if text.starts_with('/') {
            (None, text)
        } else {
            let (method, path) = text
                .split_once(' ')
                .ok_or(PatternError::MissingLeadingSlash)?;
            (Some(method.parse::<Method>()?), path)
        };

        if !path.starts_with('/') {
            return Err(PatternError::MissingLeadingSlash);
        }

        let segments = path
            .split('/')
            .filter(|component| !component.is_empty())
            .map(Segment::parse)
            .collect::<Result<Vec<_>, _>>()?;

        let mut names = HashSet::new();
        for (i, segment) in segments.iter().enumerate() {
            if segment.is_multi() && i + 1 != segments.len() {
                let name = segment.identifier_name().unwrap_or_default();
                return Err(PatternError::MultiNotLast(name.to_string()));
            }
            if let Some(name) = segment.identifier_name() {
                if !names.insert(name) {
                    return Err(PatternError::DuplicateIdentifier(name.to_string()));
                }
            }
        }

        Ok(Self { source: text.to_string(), method, segments })
    }

    /// The text this pattern was parsed from.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn method(&self) -> Option<Method> {
        self.method
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    fn ends_with_multi(&self) -> bool {
        self.segments.last().is_some_and(Segment::is_multi)
    }
}

impl FromStr for Pattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pattern::parse(s)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_method_and_segments() -> Result<(), PatternError> {
        let pattern = Pattern::parse("GET /foo/{id}/{rest...}")?;
        assert_eq!(pattern.method(), Some(Method::Get));
        assert_eq!(
            pattern.segments(),
            &[
                Segment::Literal("foo".into()),
                Segment::Identifier("id".into()),
                Segment::MultiIdentifier("rest".into()),
            ]
        );
        assert_eq!(pattern.as_str(), "GET /foo/{id}/{rest...}");
        Ok(())
    }

    #[test]
    fn trailing_slash_is_ignored() -> Result<(), PatternError> {
        let with = Pattern::parse("/foo/bar/")?;
        let without = Pattern::parse("/foo/bar")?;
        assert_eq!(with.segments(), without.segments());
        Ok(())
    }

    #[test]
    fn root_has_no_segments() -> Result<(), PatternError> {
        assert!(Pattern::parse("/")?.segments().is_empty());
        Ok(())
    }

    #[test]
    fn rejects_invalid_patterns() {
        let cases = [
            ("", PatternError::Empty),
            ("foo/bar", PatternError::MissingLeadingSlash),
            ("GET foo", PatternError::MissingLeadingSlash),
            ("FETCH /foo", PatternError::UnknownMethod("FETCH".into())),
            ("get /foo", PatternError::UnknownMethod("get".into())),
            ("/foo/{id", PatternError::MalformedIdentifier("{id".into())),
            ("/foo/{a...}/bar", PatternError::MultiNotLast("a".into())),
            ("/foo/{}", PatternError::EmptyIdentifier),
            ("/foo/{...}", PatternError::EmptyIdentifier),
            ("/{id}/{id}", PatternError::DuplicateIdentifier("id".into())),
            ("/{id}/{id...}", PatternError::DuplicateIdentifier("id".into())),
        ];
        for (text, expected) in cases {
            assert_eq!(Pattern::parse(text), Err(expected), "pattern {text:?}");
        }
    }
}
