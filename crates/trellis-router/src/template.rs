//! URI templates such as `users/{userId}/devices`.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use trellis_core::ResourcePath;

/// Errors produced while parsing a URI template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// A `{` without a matching `}` or a brace in the middle of a segment.
    #[error("malformed template segment '{segment}' in '{template}'")]
    MalformedSegment { template: String, segment: String },

    /// `{}` with no variable name.
    #[error("empty variable name in '{0}'")]
    EmptyVariable(String),

    /// The same variable bound twice.
    #[error("variable '{variable}' appears more than once in '{template}'")]
    DuplicateVariable { template: String, variable: String },
}

/// One segment of a URI template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemplateSegment {
    /// Must equal the path segment exactly.
    Literal(String),
    /// Matches any single path segment and binds it to a name.
    Variable(String),
}

/// A parsed URI template.
///
/// Templates use the same `/`-delimited syntax as resource paths. A segment of
/// the form `{name}` binds the corresponding path segment to `name`; any other
/// segment must match literally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct UriTemplate {
    source: String,
    segments: Vec<TemplateSegment>,
}

impl UriTemplate {
    /// Parses a template.
    pub fn parse(template: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut seen = HashSet::new();

        for raw in template.split('/').filter(|s| !s.is_empty()) {
            let segment = match raw.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some("") => return Err(TemplateError::EmptyVariable(template.to_string())),
                Some(name) if !name.contains(['{', '}']) => {
                    if !seen.insert(name.to_string()) {
                        return Err(TemplateError::DuplicateVariable {
                            template: template.to_string(),
                            variable: name.to_string(),
                        });
                    }
                    TemplateSegment::Variable(name.to_string())
                }
                None if !raw.contains(['{', '}']) => TemplateSegment::Literal(raw.to_string()),
                _ => {
                    return Err(TemplateError::MalformedSegment {
                        template: template.to_string(),
                        segment: raw.to_string(),
                    });
                }
            };
            segments.push(segment);
        }

        Ok(Self {
            source: template.to_string(),
            segments,
        })
    }

    /// A template made of a single variable segment, such as `{id}`.
    pub(crate) fn variable(name: &str) -> Self {
        Self {
            source: format!("{{{name}}}"),
            segments: vec![TemplateSegment::Variable(name.to_string())],
        }
    }

    /// The parsed segments.
    pub fn segments(&self) -> &[TemplateSegment] {
        &self.segments
    }

    /// The number of segments a path must have at least to match.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns `true` for the empty template, which matches the empty path.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The number of literal segments.
    pub fn literal_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, TemplateSegment::Literal(_)))
            .count()
    }

    /// Matches the leading segments of `path`, returning the bound variables.
    ///
    /// Only the first [`len`](Self::len) segments are examined; the caller
    /// decides whether trailing segments are acceptable.
    pub fn match_prefix(&self, path: &ResourcePath) -> Option<BTreeMap<String, String>> {
        if path.len() < self.segments.len() {
            return None;
        }

        let mut variables = BTreeMap::new();
        for (template, actual) in self.segments.iter().zip(path.segments()) {
            match template {
                TemplateSegment::Literal(literal) if literal == actual => {}
                TemplateSegment::Literal(_) => return None,
                TemplateSegment::Variable(name) => {
                    variables.insert(name.clone(), actual.clone());
                }
            }
        }
        Some(variables)
    }
}

impl fmt::Display for UriTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for UriTemplate {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
