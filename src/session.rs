//! Stubbing session.
//!
//! A [`StubSession`] is the explicit context object a protocol handler is
//! constructed with. It owns the coordinator, the fixture source, and the
//! compiled interception policy, and performs the one-time lazy fixture
//! registration. Sessions are independent of each other, so parallel test
//! runs can each hold their own.

use crate::config::{Settings, StubConfig};
use crate::coordinator::{Coordinator, ResolveError};
use crate::intercept::InterceptPolicy;
use crate::provider::{DataProvider, DirFixtureSource, FixtureSource, ProviderRole};
use crate::request::{ResourceKey, StubRequest};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, info, warn};

/// Initialization state of a session's providers and fixture registration.
///
/// Deliberately decoupled from presence-of-provider checks: a provider
/// installed ahead of time does not mark the session ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InitState {
    Uninitialized,
    Initializing,
    Ready,
}

/// Context object owning the coordinator and both data providers for the life
/// of a stubbing session.
pub struct StubSession {
    config: StubConfig,
    policy: InterceptPolicy,
    source: Arc<dyn FixtureSource>,
    coordinator: RwLock<Coordinator>,
    init: Mutex<InitState>,
}

impl StubSession {
    /// Create a session backed by a filesystem fixture source rooted at the
    /// configured fixture directory.
    pub fn new(config: StubConfig) -> anyhow::Result<Self> {
        let source = Arc::new(DirFixtureSource::new(config.fixtures.root.clone()));
        Self::with_source(config, source)
    }

    /// Create a session over an explicit fixture source.
    pub fn with_source(
        config: StubConfig,
        source: Arc<dyn FixtureSource>,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        let policy = InterceptPolicy::new(&config.intercept)?;

        info!(
            inline_fixtures = config.inline.len(),
            intercept_rules = config.intercept.len(),
            fixture_root = %config.fixtures.root.display(),
            "Stub session created"
        );

        Ok(Self {
            policy,
            source,
            config,
            coordinator: RwLock::new(Coordinator::new()),
            init: Mutex::new(InitState::Uninitialized),
        })
    }

    /// Session settings.
    pub fn settings(&self) -> &Settings {
        &self.config.settings
    }

    /// Whether the interception policy claims `request`.
    pub fn policy_allows(&self, request: &StubRequest) -> bool {
        self.policy.allows(request)
    }

    /// Lazily construct the providers and register fixtures, exactly once.
    ///
    /// Discovered locators from the request and response buckets are
    /// registered against `key`, the identifier of the request that triggered
    /// initialization; inline fixtures are registered under their declared
    /// keys. Repeated calls never re-read the fixture source.
    pub fn ensure_ready(&self, key: &ResourceKey) {
        let mut init = self
            .init
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *init == InitState::Ready {
            return;
        }
        *init = InitState::Initializing;

        let mut coordinator = self.coordinator_mut();
        self.ensure_providers(&mut coordinator);

        let buckets = [
            (
                self.config.fixtures.request_bucket.as_str(),
                ProviderRole::Request,
            ),
            (
                self.config.fixtures.response_bucket.as_str(),
                ProviderRole::Response,
            ),
        ];
        for (bucket, role) in buckets {
            match self.source.list(bucket) {
                Ok(locators) => {
                    for locator in &locators {
                        coordinator.register_resource(self.source.as_ref(), locator, key, role);
                    }
                    debug!(bucket, count = locators.len(), "Registered discovered fixtures");
                }
                Err(err) => {
                    debug!(bucket, error = %err, "Fixture bucket not listable, skipping");
                }
            }
        }

        for fixture in &self.config.inline {
            match fixture.body.to_bytes() {
                Ok(payload) => {
                    coordinator.register_payload(fixture.key.clone(), payload, fixture.role);
                }
                Err(err) => {
                    warn!(
                        key = %fixture.key,
                        error = %err,
                        "Inline fixture unreadable, skipping registration"
                    );
                }
            }
        }
        drop(coordinator);

        *init = InitState::Ready;
    }

    /// Register the fixture at `locator` under `key` in the request store.
    pub fn register_request_fixture(&self, locator: &str, key: &ResourceKey) {
        let mut coordinator = self.coordinator_mut();
        self.ensure_providers(&mut coordinator);
        coordinator.register_resource(self.source.as_ref(), locator, key, ProviderRole::Request);
    }

    /// Register the fixture at `locator` under `key` in the response store.
    pub fn register_response_fixture(&self, locator: &str, key: &ResourceKey) {
        let mut coordinator = self.coordinator_mut();
        self.ensure_providers(&mut coordinator);
        coordinator.register_resource(self.source.as_ref(), locator, key, ProviderRole::Response);
    }

    /// Register `payload` directly under `key` in the request store.
    pub fn register_request_payload(&self, key: ResourceKey, payload: Vec<u8>) {
        let mut coordinator = self.coordinator_mut();
        self.ensure_providers(&mut coordinator);
        coordinator.register_payload(key, payload, ProviderRole::Request);
    }

    /// Register `payload` directly under `key` in the response store.
    pub fn register_response_payload(&self, key: ResourceKey, payload: Vec<u8>) {
        let mut coordinator = self.coordinator_mut();
        self.ensure_providers(&mut coordinator);
        coordinator.register_payload(key, payload, ProviderRole::Response);
    }

    /// Runtime write to the request store, subject to its writability.
    pub fn set_request_content(&self, key: ResourceKey, payload: Vec<u8>) {
        self.coordinator_mut()
            .set_content(key, payload, ProviderRole::Request);
    }

    /// Runtime write to the response store, subject to its writability.
    pub fn set_response_content(&self, key: ResourceKey, payload: Vec<u8>) {
        self.coordinator_mut()
            .set_content(key, payload, ProviderRole::Response);
    }

    /// Resolve the response payload for `key`.
    pub fn resolve_response(&self, key: &ResourceKey) -> Result<Vec<u8>, ResolveError> {
        self.coordinator_read().resolve_response_data(key)
    }

    /// Resolve the request payload for `key` (diagnostic/echo use).
    pub fn resolve_request(&self, key: &ResourceKey) -> Result<Vec<u8>, ResolveError> {
        self.coordinator_read().resolve_request_data(key)
    }

    /// Byte length of the request payload for `key`.
    pub fn request_content_size(&self, key: &ResourceKey) -> usize {
        self.coordinator_read().request_content_size(key)
    }

    /// Byte length of the response payload for `key`.
    pub fn response_content_size(&self, key: &ResourceKey) -> usize {
        self.coordinator_read().response_content_size(key)
    }

    fn ensure_providers(&self, coordinator: &mut Coordinator) {
        if !coordinator.has_request_provider() {
            coordinator.register_request_provider(DataProvider::new(
                ProviderRole::Request,
                self.config.settings.writable_request_store,
            ));
        }
        if !coordinator.has_response_provider() {
            coordinator.register_response_provider(DataProvider::new(
                ProviderRole::Response,
                self.config.settings.writable_response_store,
            ));
        }
    }

    fn coordinator_read(&self) -> std::sync::RwLockReadGuard<'_, Coordinator> {
        self.coordinator
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn coordinator_mut(&self) -> std::sync::RwLockWriteGuard<'_, Coordinator> {
        self.coordinator
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn key(raw: &str) -> ResourceKey {
        ResourceKey::new(raw)
    }

    /// Fixture source over an in-memory map, counting bucket listings.
    struct MapSource {
        files: HashMap<String, Vec<u8>>,
        buckets: HashMap<String, Vec<String>>,
        list_calls: AtomicUsize,
    }

    impl MapSource {
        fn new() -> Self {
            Self {
                files: HashMap::new(),
                buckets: HashMap::new(),
                list_calls: AtomicUsize::new(0),
            }
        }

        fn with_file(mut self, bucket: &str, locator: &str, content: &[u8]) -> Self {
            self.files.insert(locator.to_string(), content.to_vec());
            self.buckets
                .entry(bucket.to_string())
                .or_default()
                .push(locator.to_string());
            self
        }
    }

    impl FixtureSource for MapSource {
        fn read(&self, locator: &str) -> io::Result<Vec<u8>> {
            self.files
                .get(locator)
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, locator.to_string()))
        }

        fn list(&self, bucket: &str) -> io::Result<Vec<String>> {
            self.list_calls.fetch_add(1, Ordering::Relaxed);
            self.buckets
                .get(bucket)
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, bucket.to_string()))
        }
    }

    fn session_with(source: MapSource, yaml: &str) -> (Arc<MapSource>, StubSession) {
        let source = Arc::new(source);
        let config = StubConfig::from_yaml(yaml).unwrap();
        let session = StubSession::with_source(config, source.clone()).unwrap();
        (source, session)
    }

    #[test]
    fn test_ensure_ready_registers_discovered_fixtures() {
        let source = MapSource::new().with_file("Responses", "Responses/posts_1.json", br#"{"id":1}"#);
        let (_source, session) = session_with(source, "{}");

        session.ensure_ready(&key("GET /posts/1"));

        assert_eq!(
            session.resolve_response(&key("GET /posts/1")),
            Ok(br#"{"id":1}"#.to_vec())
        );
    }

    #[test]
    fn test_ensure_ready_reads_source_once() {
        let source = MapSource::new().with_file("Responses", "Responses/a.json", b"a");
        let (source, session) = session_with(source, "{}");

        session.ensure_ready(&key("GET /a"));
        session.ensure_ready(&key("GET /b"));
        session.ensure_ready(&key("GET /c"));

        // One listing per bucket, never repeated
        assert_eq!(source.list_calls.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_inline_fixtures_use_their_declared_keys() {
        let yaml = r#"
inline:
  - key: "GET /posts/1"
    body:
      type: json
      content:
        id: 1
  - key: "POST /posts"
    role: request
    body:
      type: text
      content: "outgoing"
"#;
        let (_source, session) = session_with(MapSource::new(), yaml);
        session.ensure_ready(&key("GET /anything"));

        assert_eq!(
            session.resolve_response(&key("GET /posts/1")),
            Ok(br#"{"id":1}"#.to_vec())
        );
        assert_eq!(
            session.resolve_request(&key("POST /posts")),
            Ok(b"outgoing".to_vec())
        );
    }

    #[test]
    fn test_missing_buckets_are_tolerated() {
        let (_source, session) = session_with(MapSource::new(), "{}");
        session.ensure_ready(&key("GET /posts/1"));

        assert!(matches!(
            session.resolve_response(&key("GET /posts/1")),
            Err(ResolveError::NotFound(_))
        ));
    }

    #[test]
    fn test_unresolved_before_init() {
        let (_source, session) = session_with(MapSource::new(), "{}");

        assert!(matches!(
            session.resolve_response(&key("GET /p")),
            Err(ResolveError::NoProvider(_))
        ));
    }

    #[test]
    fn test_programmatic_payload_registration() {
        let (_source, session) = session_with(MapSource::new(), "{}");

        session.register_response_payload(key("GET /posts/1"), br#"{"id":1}"#.to_vec());

        assert_eq!(
            session.resolve_response(&key("GET /posts/1")),
            Ok(br#"{"id":1}"#.to_vec())
        );
        assert_eq!(session.response_content_size(&key("GET /posts/1")), 8);
    }

    #[test]
    fn test_registration_bypasses_response_writability() {
        // writable_response_store defaults to false
        let (_source, session) = session_with(MapSource::new(), "{}");

        session.register_response_payload(key("GET /p"), b"registered".to_vec());
        session.set_response_content(key("GET /q"), b"runtime".to_vec());

        assert_eq!(session.resolve_response(&key("GET /p")), Ok(b"registered".to_vec()));
        assert!(matches!(
            session.resolve_response(&key("GET /q")),
            Err(ResolveError::NotFound(_))
        ));
    }

    #[test]
    fn test_writable_request_store_accepts_runtime_writes() {
        let (_source, session) = session_with(MapSource::new(), "{}");
        session.register_request_payload(key("POST /seed"), b"seed".to_vec());

        session.set_request_content(key("POST /posts"), b"runtime".to_vec());
        assert_eq!(session.resolve_request(&key("POST /posts")), Ok(b"runtime".to_vec()));
    }

    #[test]
    fn test_locator_registration_via_source() {
        let source = MapSource::new().with_file("Responses", "Responses/posts_2.json", b"two");
        let (_source, session) = session_with(source, "{}");

        session.register_response_fixture("Responses/posts_2.json", &key("GET /posts/2"));
        assert_eq!(session.resolve_response(&key("GET /posts/2")), Ok(b"two".to_vec()));

        // Unreadable locator leaves the store untouched
        session.register_response_fixture("Responses/absent.json", &key("GET /posts/3"));
        assert!(matches!(
            session.resolve_response(&key("GET /posts/3")),
            Err(ResolveError::NotFound(_))
        ));
    }
}
