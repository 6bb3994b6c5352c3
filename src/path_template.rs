//! Route path compilation and matching.
//!
//! A template such as `/api/{version}/user/{id}` is split on `/` into literal
//! and parameter segments and compiled into an anchored pattern where every
//! parameter captures a non-empty run of characters other than `/`. Matching
//! additionally requires the candidate path to have exactly as many segments
//! as the template, so `/users/{id}` never matches `/users/123/profile`.
//!
//! A single trailing `/` is ignored on both templates and request paths.

use regex::Regex;

use crate::error::CompileError;
use crate::params::Params;

const SEPARATOR: char = '/';

/// Pattern substituted for each `{name}` segment.
const PARAMETER_PATTERN: &str = "[^/]+";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Parameter(String),
}

/// A compiled route path. Immutable once built.
#[derive(Debug, Clone)]
pub struct PathTemplate {
    segments: Vec<Segment>,
    depth: usize,
    pattern: Regex,
}

impl PathTemplate {
    /// Compile a route path into a matcher.
    ///
    /// Rejects templates that do not start with `/`, segments with stray or
    /// unbalanced braces, empty or non-word parameter names, and parameter
    /// names used more than once.
    pub fn compile(template: &str) -> Result<Self, CompileError> {
        if !template.starts_with(SEPARATOR) {
            return Err(CompileError::template(template, "path must start with '/'"));
        }

        let normalized = trim_trailing_separator(template);
        let mut segments = Vec::new();
        let mut pattern = String::from("^");

        // skip the empty part in front of the leading '/'
        for part in normalized.split(SEPARATOR).skip(1) {
            let segment = parse_segment(template, part)?;
            pattern.push(SEPARATOR);
            match &segment {
                Segment::Literal(text) => pattern.push_str(&regex::escape(text)),
                Segment::Parameter(name) => {
                    if segments.contains(&segment) {
                        return Err(CompileError::template(
                            template,
                            format!("duplicate parameter name '{}'", name),
                        ));
                    }
                    pattern.push_str(&format!("(?P<{}>{})", name, PARAMETER_PATTERN));
                }
            }
            segments.push(segment);
        }
        pattern.push('$');

        let pattern = Regex::new(&pattern).map_err(|source| CompileError::Pattern {
            template: template.to_string(),
            source,
        })?;

        Ok(Self {
            depth: segments.len(),
            segments,
            pattern,
        })
    }

    /// Returns true if `path` has the template's depth and every segment matches.
    pub fn is_match(&self, path: &str) -> bool {
        let path = trim_trailing_separator(path);
        depth_of(path) == self.depth && self.pattern.is_match(path)
    }

    /// Captures every declared parameter from `path`, or `None` if it does not match.
    pub fn extract_params(&self, path: &str) -> Option<Params> {
        if !self.is_match(path) {
            return None;
        }

        let captures = self.pattern.captures(trim_trailing_separator(path))?;
        let params = self
            .parameter_names()
            .filter_map(|name| {
                captures
                    .name(name)
                    .map(|value| (name.to_string(), value.as_str().to_string()))
            })
            .collect();

        Some(params)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of `/`-delimited segments, fixed at compile time.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Parameter(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }
}

fn parse_segment(template: &str, part: &str) -> Result<Segment, CompileError> {
    match part.strip_prefix('{').and_then(|rest| rest.strip_suffix('}')) {
        Some(name) if name.is_empty() => {
            Err(CompileError::template(template, "empty parameter name"))
        }
        Some(name) if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') => {
            Err(CompileError::template(
                template,
                format!("invalid parameter name '{}'", name),
            ))
        }
        Some(name) => Ok(Segment::Parameter(name.to_string())),
        None if part.contains(['{', '}']) => Err(CompileError::template(
            template,
            format!("unbalanced braces in segment '{}'", part),
        )),
        None => Ok(Segment::Literal(part.to_string())),
    }
}

fn trim_trailing_separator(path: &str) -> &str {
    path.strip_suffix(SEPARATOR).unwrap_or(path)
}

fn depth_of(path: &str) -> usize {
    path.matches(SEPARATOR).count()
}
