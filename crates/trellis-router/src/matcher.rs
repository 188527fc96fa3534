//! Route matchers.
//!
//! A [`RouteMatcher`] inspects an incoming request and, if it accepts it,
//! produces a [`RouteMatch`]. The router evaluates every registered matcher
//! and dispatches to the route whose match is best.
//!
//! # Ranking
//!
//! [`UriRouteMatch`] ranks matches by, in order:
//!
//! 1. the number of path segments consumed
//! 2. [`RoutingMode::Equals`] before [`RoutingMode::StartsWith`]
//! 3. the number of literal (non-variable) template segments
//!
//! Matches produced by different matcher types have no common ranking;
//! comparing them yields [`IncomparableRouteMatch`], which the router reports
//! as an internal error.
//!
//! # Example
//!
//! ```rust,ignore
//! use trellis_router::{RoutingMode, UriRouteMatcher};
//!
//! let users = UriRouteMatcher::new(RoutingMode::StartsWith, "users/{userId}")?;
//! ```

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use trellis_core::{Context, Request, ResourcePath};

use crate::template::{TemplateError, UriTemplate};

/// Returned when two matches cannot be ranked against each other.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot compare route match {first} with {second}")]
pub struct IncomparableRouteMatch {
    pub first: String,
    pub second: String,
}

impl IncomparableRouteMatch {
    pub fn new(first: &dyn RouteMatch, second: &dyn RouteMatch) -> Self {
        Self {
            first: format!("{first:?}"),
            second: format!("{second:?}"),
        }
    }
}

/// The outcome of a successful [`RouteMatcher::evaluate`].
pub trait RouteMatch: fmt::Debug + Send + Sync {
    /// Returns `true` if this match should win over `other`.
    ///
    /// Equal matches return `false`, so the router keeps the route registered
    /// first.
    fn is_better_than(&self, other: &dyn RouteMatch) -> Result<bool, IncomparableRouteMatch>;

    /// Records the routing decision on top of `context`.
    fn decorate_context(&self, context: &Context) -> Context;

    /// The path the selected handler should see, or `None` to forward the
    /// request unchanged.
    fn remaining_path(&self) -> Option<&ResourcePath> {
        None
    }

    /// Used by implementations of [`is_better_than`](Self::is_better_than) to
    /// recognise matches of their own type.
    fn as_any(&self) -> &dyn Any;
}

/// Decides whether a route accepts a request.
pub trait RouteMatcher: fmt::Debug + Send + Sync {
    /// Evaluates `request`, returning a match if the route accepts it.
    fn evaluate(&self, context: &Context, request: &dyn Request) -> Option<Box<dyn RouteMatch>>;
}

// ============================================================================
// URI template matching
// ============================================================================

/// How a URI template is compared against the request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoutingMode {
    /// The template must consume the whole path.
    #[default]
    Equals,
    /// The template must consume a leading part of the path; the rest is
    /// forwarded to the route's handler.
    StartsWith,
}

impl fmt::Display for RoutingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equals => f.write_str("equals"),
            Self::StartsWith => f.write_str("starts-with"),
        }
    }
}

/// Matches requests whose resource path fits a [`UriTemplate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriRouteMatcher {
    mode: RoutingMode,
    template: UriTemplate,
}

impl UriRouteMatcher {
    /// Parses `template` and builds a matcher for it.
    pub fn new(mode: RoutingMode, template: &str) -> Result<Self, TemplateError> {
        Ok(Self::from_template(mode, UriTemplate::parse(template)?))
    }

    pub fn from_template(mode: RoutingMode, template: UriTemplate) -> Self {
        Self { mode, template }
    }

    pub fn mode(&self) -> RoutingMode {
        self.mode
    }

    pub fn template(&self) -> &UriTemplate {
        &self.template
    }
}

impl RouteMatcher for UriRouteMatcher {
    fn evaluate(&self, _context: &Context, request: &dyn Request) -> Option<Box<dyn RouteMatch>> {
        let path = request.resource_path();
        if self.mode == RoutingMode::Equals && path.len() != self.template.len() {
            return None;
        }

        let variables = self.template.match_prefix(path)?;
        let consumed = self.template.len();

        Some(Box::new(UriRouteMatch {
            mode: self.mode,
            matched: path.head(consumed),
            remaining: path.tail(consumed),
            literals: self.template.literal_count(),
            variables,
        }))
    }
}

/// A match produced by [`UriRouteMatcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriRouteMatch {
    mode: RoutingMode,
    matched: ResourcePath,
    remaining: ResourcePath,
    literals: usize,
    variables: BTreeMap<String, String>,
}

impl UriRouteMatch {
    pub fn mode(&self) -> RoutingMode {
        self.mode
    }

    pub fn matched(&self) -> &ResourcePath {
        &self.matched
    }

    pub fn remaining(&self) -> &ResourcePath {
        &self.remaining
    }

    pub fn variables(&self) -> &BTreeMap<String, String> {
        &self.variables
    }

    fn rank(&self) -> (usize, bool, usize) {
        (
            self.matched.len(),
            self.mode == RoutingMode::Equals,
            self.literals,
        )
    }
}

impl RouteMatch for UriRouteMatch {
    fn is_better_than(&self, other: &dyn RouteMatch) -> Result<bool, IncomparableRouteMatch> {
        match other.as_any().downcast_ref::<UriRouteMatch>() {
            Some(other) => Ok(self.rank() > other.rank()),
            None => Err(IncomparableRouteMatch::new(self, other)),
        }
    }

    fn decorate_context(&self, context: &Context) -> Context {
        context.router(
            self.matched.clone(),
            self.remaining.clone(),
            self.variables.clone(),
        )
    }

    /// Exact matches forward the request as is; the remainder is only
    /// recorded in the router context.
    fn remaining_path(&self) -> Option<&ResourcePath> {
        match self.mode {
            RoutingMode::Equals => None,
            RoutingMode::StartsWith => Some(&self.remaining),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::ReadRequest;

    fn evaluate(mode: RoutingMode, template: &str, path: &str) -> Option<Box<dyn RouteMatch>> {
        UriRouteMatcher::new(mode, template)
            .unwrap()
            .evaluate(&Context::root(), &ReadRequest::new(path))
    }

    fn uri_match(m: &dyn RouteMatch) -> &UriRouteMatch {
        m.as_any().downcast_ref().unwrap()
    }

    #[test]
    fn test_equals_requires_whole_path() {
        assert!(evaluate(RoutingMode::Equals, "users", "users").is_some());
        assert!(evaluate(RoutingMode::Equals, "users", "users/42").is_none());
        assert!(evaluate(RoutingMode::Equals, "", "").is_some());
    }

    #[test]
    fn test_starts_with_splits_path() {
        let m = evaluate(RoutingMode::StartsWith, "users/{id}", "users/42/devices/7").unwrap();
        let m = uri_match(&*m);
        assert_eq!(m.matched().to_string(), "users/42");
        assert_eq!(m.remaining().to_string(), "devices/7");
        assert_eq!(m.variables().get("id").map(String::as_str), Some("42"));
    }

    #[test]
    fn test_ranking() {
        let exact = evaluate(RoutingMode::Equals, "users", "users").unwrap();
        let prefix = evaluate(RoutingMode::StartsWith, "users", "users").unwrap();
        assert!(exact.is_better_than(&*prefix).unwrap());
        assert!(!prefix.is_better_than(&*exact).unwrap());

        let long = evaluate(RoutingMode::StartsWith, "users/{id}", "users/42/x").unwrap();
        let short = evaluate(RoutingMode::StartsWith, "users", "users/42/x").unwrap();
        assert!(long.is_better_than(&*short).unwrap());

        let literal = evaluate(RoutingMode::Equals, "users/me", "users/me").unwrap();
        let variable = evaluate(RoutingMode::Equals, "users/{id}", "users/me").unwrap();
        assert!(literal.is_better_than(&*variable).unwrap());

        let same = evaluate(RoutingMode::Equals, "users", "users").unwrap();
        assert!(!exact.is_better_than(&*same).unwrap());
    }

    #[test]
    fn test_only_prefix_matches_rewrite_the_request() {
        let exact = evaluate(RoutingMode::Equals, "users", "users").unwrap();
        assert!(exact.remaining_path().is_none());
        assert!(uri_match(&*exact).remaining().is_empty());

        let prefix = evaluate(RoutingMode::StartsWith, "users", "users/42").unwrap();
        assert_eq!(prefix.remaining_path().map(|p| p.to_string()).as_deref(), Some("42"));
    }

    #[test]
    fn test_decorate_context_pushes_router_node() {
        let root = Context::root();
        let m = evaluate(RoutingMode::StartsWith, "users/{id}", "users/42").unwrap();
        let ctx = m.decorate_context(&root);

        let router = ctx.as_router().unwrap();
        assert!(router.remaining_path().is_empty());
        assert_eq!(ctx.uri_template_variable("id"), Some("42"));
        assert!(ctx.parent().unwrap().ptr_eq(&root));
    }
}
