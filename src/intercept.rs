//! Interception policy.
//!
//! Compiles the configured [`InterceptRule`]s into matchers consulted by the
//! protocol handler's decision step. No rules means every request is claimed,
//! which is the default policy.

use crate::config::{HostRule, InterceptRule, PathRule};
use crate::request::StubRequest;
use regex::Regex;

/// Compiled form of the configured interception rules.
pub struct InterceptPolicy {
    rules: Vec<CompiledRule>,
}

struct CompiledRule {
    methods: Vec<String>,
    host: Option<CompiledHostRule>,
    path: Option<CompiledPathRule>,
}

enum CompiledHostRule {
    Exact(String),
    Suffix(String),
    Regex(Regex),
}

enum CompiledPathRule {
    Exact(String),
    Prefix(String),
    Regex(Regex),
    Glob(globset::GlobMatcher),
}

impl InterceptPolicy {
    /// Compile a policy from configured rules. Patterns are expected to have
    /// passed config validation; compilation failures still surface as errors.
    pub fn new(rules: &[InterceptRule]) -> anyhow::Result<Self> {
        let rules = rules
            .iter()
            .map(|rule| {
                let host = match &rule.host {
                    Some(HostRule::Exact { value }) => {
                        Some(CompiledHostRule::Exact(value.to_lowercase()))
                    }
                    Some(HostRule::Suffix { value }) => {
                        Some(CompiledHostRule::Suffix(value.to_lowercase()))
                    }
                    Some(HostRule::Regex { pattern }) => {
                        Some(CompiledHostRule::Regex(Regex::new(pattern)?))
                    }
                    None => None,
                };
                let path = match &rule.path {
                    Some(PathRule::Exact { value }) => Some(CompiledPathRule::Exact(value.clone())),
                    Some(PathRule::Prefix { value }) => {
                        Some(CompiledPathRule::Prefix(value.clone()))
                    }
                    Some(PathRule::Regex { pattern }) => {
                        Some(CompiledPathRule::Regex(Regex::new(pattern)?))
                    }
                    Some(PathRule::Glob { pattern }) => Some(CompiledPathRule::Glob(
                        globset::Glob::new(pattern)?.compile_matcher(),
                    )),
                    None => None,
                };
                Ok(CompiledRule {
                    methods: rule.method.iter().map(|m| m.to_uppercase()).collect(),
                    host,
                    path,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Self { rules })
    }

    /// A policy that claims every request.
    pub fn intercept_all() -> Self {
        Self { rules: Vec::new() }
    }

    /// Whether the policy claims `request`.
    pub fn allows(&self, request: &StubRequest) -> bool {
        if self.rules.is_empty() {
            return true;
        }
        self.rules.iter().any(|rule| rule.matches(request))
    }
}

impl CompiledRule {
    fn matches(&self, request: &StubRequest) -> bool {
        if !self.methods.is_empty() {
            let method = request.method.to_uppercase();
            if !self.methods.iter().any(|m| *m == method) {
                return false;
            }
        }

        if let Some(host_rule) = &self.host {
            let Some(host) = request.host() else {
                return false;
            };
            let matched = match host_rule {
                CompiledHostRule::Exact(value) => host == *value,
                CompiledHostRule::Suffix(value) => host.ends_with(value.as_str()),
                CompiledHostRule::Regex(regex) => regex.is_match(&host),
            };
            if !matched {
                return false;
            }
        }

        if let Some(path_rule) = &self.path {
            let path = request.path();
            let matched = match path_rule {
                CompiledPathRule::Exact(value) => path == *value,
                CompiledPathRule::Prefix(value) => path.starts_with(value.as_str()),
                CompiledPathRule::Regex(regex) => regex.is_match(&path),
                CompiledPathRule::Glob(glob) => glob.is_match(&path),
            };
            if !matched {
                return false;
            }
        }

        true
    }
}
