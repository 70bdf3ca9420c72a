//! Configuration for a stubbing session.
//!
//! Defines the fixture directory layout, inline fixtures, interception rules,
//! and session settings.

use crate::provider::ProviderRole;
use crate::request::ResourceKey;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration for a stubbing session.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct StubConfig {
    /// Fixture directory layout
    #[serde(default)]
    pub fixtures: FixtureLayout,

    /// Inline fixtures registered alongside directory discovery
    #[serde(default)]
    pub inline: Vec<InlineFixture>,

    /// Interception rules (empty = intercept every request)
    #[serde(default)]
    pub intercept: Vec<InterceptRule>,

    /// Session settings
    #[serde(default)]
    pub settings: Settings,
}

impl StubConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (i, fixture) in self.inline.iter().enumerate() {
            fixture
                .validate()
                .map_err(|e| anyhow::anyhow!("Inline fixture {}: {}", i, e))?;
        }
        for (i, rule) in self.intercept.iter().enumerate() {
            rule.validate()
                .map_err(|e| anyhow::anyhow!("Intercept rule {}: {}", i, e))?;
        }
        Ok(())
    }
}

/// Where fixtures live on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixtureLayout {
    /// Root directory of the fixture tree
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Bucket holding request fixtures
    #[serde(default = "default_request_bucket")]
    pub request_bucket: String,

    /// Bucket holding response fixtures
    #[serde(default = "default_response_bucket")]
    pub response_bucket: String,
}

impl Default for FixtureLayout {
    fn default() -> Self {
        Self {
            root: default_root(),
            request_bucket: default_request_bucket(),
            response_bucket: default_response_bucket(),
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from("fixtures")
}

fn default_request_bucket() -> String {
    "Requests".to_string()
}

fn default_response_bucket() -> String {
    "Responses".to_string()
}

/// A fixture declared directly in configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InlineFixture {
    /// Resource key the payload is registered under
    pub key: ResourceKey,

    /// Which store receives the payload
    #[serde(default = "default_role")]
    pub role: ProviderRole,

    /// Payload definition
    pub body: FixtureBody,
}

fn default_role() -> ProviderRole {
    ProviderRole::Response
}

impl InlineFixture {
    /// Validate the fixture entry.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.key.as_str().is_empty() {
            anyhow::bail!("Fixture key cannot be empty");
        }
        Ok(())
    }
}

/// Fixture payload definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FixtureBody {
    /// Plain text payload
    Text { content: String },
    /// JSON payload
    Json { content: serde_json::Value },
    /// Base64 encoded binary
    Base64 { content: String },
    /// Load from file
    File { path: String },
}

impl FixtureBody {
    /// Get the payload as bytes.
    pub fn to_bytes(&self) -> anyhow::Result<Vec<u8>> {
        match self {
            FixtureBody::Text { content } => Ok(content.as_bytes().to_vec()),
            FixtureBody::Json { content } => Ok(serde_json::to_string(content)?.into_bytes()),
            FixtureBody::Base64 { content } => {
                use base64::Engine;
                base64::engine::general_purpose::STANDARD
                    .decode(content)
                    .map_err(|e| anyhow::anyhow!("Invalid base64: {}", e))
            }
            FixtureBody::File { path } => std::fs::read(path)
                .map_err(|e| anyhow::anyhow!("Failed to read file {}: {}", path, e)),
        }
    }

    /// Get the content type for this payload.
    pub fn content_type(&self) -> &'static str {
        match self {
            FixtureBody::Text { .. } => "text/plain",
            FixtureBody::Json { .. } => "application/json",
            FixtureBody::Base64 { .. } => "application/octet-stream",
            FixtureBody::File { .. } => "application/octet-stream",
        }
    }
}

/// A single interception rule. A request is intercepted when any rule matches
/// it in full; with no rules configured, every request is intercepted.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct InterceptRule {
    /// HTTP method(s) to match (empty = any)
    #[serde(default)]
    pub method: Vec<String>,

    /// Host matching
    #[serde(default)]
    pub host: Option<HostRule>,

    /// Path matching
    #[serde(default)]
    pub path: Option<PathRule>,
}

impl InterceptRule {
    /// Validate the rule.
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(HostRule::Regex { pattern }) = &self.host {
            regex::Regex::new(pattern).map_err(|e| anyhow::anyhow!("Invalid host regex: {}", e))?;
        }
        match &self.path {
            Some(PathRule::Regex { pattern }) => {
                regex::Regex::new(pattern).map_err(|e| anyhow::anyhow!("Invalid path regex: {}", e))?;
            }
            Some(PathRule::Glob { pattern }) => {
                globset::Glob::new(pattern).map_err(|e| anyhow::anyhow!("Invalid path glob: {}", e))?;
            }
            _ => {}
        }
        Ok(())
    }
}

/// Host matching configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostRule {
    /// Exact host match
    Exact { value: String },
    /// Domain suffix match (e.g. ".example.com")
    Suffix { value: String },
    /// Regex pattern match
    Regex { pattern: String },
}

/// Path matching configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PathRule {
    /// Exact path match
    Exact { value: String },
    /// Path prefix match
    Prefix { value: String },
    /// Regex pattern match
    Regex { pattern: String },
    /// Glob pattern match
    Glob { pattern: String },
}

/// Session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Log resolved (matched) requests
    #[serde(default = "default_true")]
    pub log_matches: bool,

    /// Log requests with no resolvable fixture
    #[serde(default = "default_true")]
    pub log_unmatched: bool,

    /// Honor runtime writes to the request store
    #[serde(default = "default_true")]
    pub writable_request_store: bool,

    /// Honor runtime writes to the response store. Off by default: response
    /// fixtures are registered from the fixture source and never mutated.
    #[serde(default)]
    pub writable_response_store: bool,
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_matches: true,
            log_unmatched: true,
            writable_request_store: true,
            writable_response_store: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let config = StubConfig::from_yaml("{}").unwrap();
        assert_eq!(config.fixtures.root, PathBuf::from("fixtures"));
        assert_eq!(config.fixtures.request_bucket, "Requests");
        assert_eq!(config.fixtures.response_bucket, "Responses");
        assert!(config.inline.is_empty());
        assert!(config.intercept.is_empty());
        assert!(config.settings.log_matches);
        assert!(!config.settings.writable_response_store);
    }

    #[test]
    fn test_parse_inline_fixture() {
        let yaml = r#"
inline:
  - key: "GET /posts/1"
    body:
      type: json
      content:
        id: 1
"#;
        let config = StubConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.inline.len(), 1);
        assert_eq!(config.inline[0].key.as_str(), "GET /posts/1");
        assert_eq!(config.inline[0].role, ProviderRole::Response);

        if let FixtureBody::Json { content } = &config.inline[0].body {
            assert_eq!(content["id"], 1);
        } else {
            panic!("Expected JSON body");
        }
    }

    #[test]
    fn test_parse_request_side_fixture() {
        let yaml = r#"
inline:
  - key: "POST /posts"
    role: request
    body:
      type: text
      content: "payload"
"#;
        let config = StubConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.inline[0].role, ProviderRole::Request);
    }

    #[test]
    fn test_parse_intercept_rules() {
        let yaml = r#"
intercept:
  - method: [GET]
    host:
      type: exact
      value: jsonplaceholder.typicode.com
    path:
      type: prefix
      value: /posts
"#;
        let config = StubConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.intercept.len(), 1);
        assert_eq!(config.intercept[0].method, vec!["GET"]);
    }

    #[test]
    fn test_empty_key_is_rejected() {
        let yaml = r#"
inline:
  - key: ""
    body:
      type: text
      content: "x"
"#;
        assert!(StubConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_invalid_path_regex_is_rejected() {
        let yaml = r#"
intercept:
  - path:
      type: regex
      pattern: "["
"#;
        assert!(StubConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_fixture_body_to_bytes() {
        let text = FixtureBody::Text {
            content: "hello".to_string(),
        };
        assert_eq!(text.to_bytes().unwrap(), b"hello");

        let json = FixtureBody::Json {
            content: serde_json::json!({"id": 1}),
        };
        assert_eq!(json.to_bytes().unwrap(), br#"{"id":1}"#.to_vec());

        let b64 = FixtureBody::Base64 {
            content: "aGVsbG8=".to_string(),
        };
        assert_eq!(b64.to_bytes().unwrap(), b"hello");

        let bad = FixtureBody::Base64 {
            content: "!!".to_string(),
        };
        assert!(bad.to_bytes().is_err());
    }

    #[test]
    fn test_content_type_follows_body_kind() {
        let json = FixtureBody::Json {
            content: serde_json::json!({}),
        };
        assert_eq!(json.content_type(), "application/json");

        let text = FixtureBody::Text {
            content: String::new(),
        };
        assert_eq!(text.content_type(), "text/plain");
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        assert!(StubConfig::from_yaml("stubs: []").is_err());
    }
}
