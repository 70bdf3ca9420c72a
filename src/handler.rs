//! Protocol handler: the interception point.
//!
//! A [`StubHandler`] sits beneath the host HTTP client stack. The host asks
//! it whether it wants a request via [`UrlInterceptor::should_intercept`],
//! then drives the load via [`UrlInterceptor::start_loading`], which emits a
//! synthetic success (status descriptor, payload, completion) or a single
//! failure signal to the [`ProtocolClient`].
//!
//! This module also hosts the process-global interceptor registry
//! ([`enable`] / [`disable`] / [`dispatch`]).

use crate::request::{ResourceKey, StubRequest};
use crate::session::StubSession;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use tracing::{info, warn};

/// Error domain carried by the fixed failure signal.
pub const ERROR_DOMAIN: &str = "com.mockurlprotocol.error.domain";

/// Code of the stub-resolution-failure signal. The value is informational;
/// consumers should match on the domain/code pair, not interpret the number.
pub const STUB_RESOLUTION_FAILURE: i32 = 99999;

const STUB_STATUS: u16 = 200;
const STUB_PROTOCOL: &str = "HTTP/1.1";

/// Cache storage policy attached to a synthetic response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Response may be cached anywhere
    Allowed,
    /// Response must never be cached
    NotAllowed,
    /// Response may be cached in memory only
    AllowedInMemoryOnly,
}

/// Synthetic response status descriptor emitted to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseDescriptor {
    /// HTTP status code
    pub status: u16,
    /// Protocol label (e.g. "HTTP/1.1")
    pub protocol: String,
    /// Header mapping, possibly empty
    pub headers: HashMap<String, String>,
    /// Cache storage policy
    pub cache_policy: CachePolicy,
}

impl ResponseDescriptor {
    /// The descriptor every stubbed success carries: status 200, HTTP/1.1,
    /// no headers, never cached.
    pub fn stub_success() -> Self {
        Self {
            status: STUB_STATUS,
            protocol: STUB_PROTOCOL.to_string(),
            headers: HashMap::new(),
            cache_policy: CachePolicy::NotAllowed,
        }
    }
}

/// Error signal emitted to the host when no fixture resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorSignal {
    /// Error domain identifier
    pub domain: String,
    /// Error code
    pub code: i32,
    /// Detail mapping, empty for the fixed failure
    pub detail: HashMap<String, String>,
}

impl ErrorSignal {
    /// The single defined failure: no fixture resolvable for the target.
    pub fn stub_resolution_failure() -> Self {
        Self {
            domain: ERROR_DOMAIN.to_string(),
            code: STUB_RESOLUTION_FAILURE,
            detail: HashMap::new(),
        }
    }
}

/// Signal sink the host transport layer hands to the handler.
///
/// Consumers expect status before body before completion, with no
/// interleaving and no signal repeated; a failed load receives only
/// [`failed`](Self::failed).
pub trait ProtocolClient: Send + Sync {
    /// A synthetic response descriptor arrived.
    fn received_response(&self, response: ResponseDescriptor);

    /// A chunk of response payload arrived.
    fn loaded_data(&self, data: &[u8]);

    /// The load completed successfully.
    fn finished_loading(&self);

    /// The load failed.
    fn failed(&self, error: ErrorSignal);
}

/// The interception seam the host HTTP stack drives.
#[async_trait]
pub trait UrlInterceptor: Send + Sync {
    /// Whether this interceptor claims `request`.
    fn should_intercept(&self, request: &StubRequest) -> bool;

    /// Load the stubbed outcome for `request`, emitting signals to `client`.
    async fn start_loading(&self, request: &StubRequest, client: &dyn ProtocolClient);

    /// Stop an in-flight load.
    fn stop_loading(&self, request: &StubRequest);
}

/// Protocol handler serving canned fixtures from a [`StubSession`].
pub struct StubHandler {
    session: Arc<StubSession>,
}

impl StubHandler {
    /// Create a handler over `session`.
    pub fn new(session: Arc<StubSession>) -> Self {
        Self { session }
    }

    /// The session this handler serves from.
    pub fn session(&self) -> &Arc<StubSession> {
        &self.session
    }
}

#[async_trait]
impl UrlInterceptor for StubHandler {
    fn should_intercept(&self, request: &StubRequest) -> bool {
        if !self.session.policy_allows(request) {
            return false;
        }
        // Registration is a side effect of the decision step: the first
        // affirmative decision of a session constructs the providers and
        // reads the fixture source, exactly once.
        self.session.ensure_ready(&ResourceKey::for_request(request));
        true
    }

    async fn start_loading(&self, request: &StubRequest, client: &dyn ProtocolClient) {
        let key = ResourceKey::for_request(request);
        match self.session.resolve_response(&key) {
            Ok(payload) => {
                if self.session.settings().log_matches {
                    info!(
                        key = %key,
                        bytes = payload.len(),
                        "Serving stubbed response"
                    );
                }
                client.received_response(ResponseDescriptor::stub_success());
                client.loaded_data(&payload);
                client.finished_loading();
            }
            Err(err) => {
                if self.session.settings().log_unmatched {
                    warn!(key = %key, error = %err, "No fixture resolvable");
                }
                client.failed(ErrorSignal::stub_resolution_failure());
            }
        }
    }

    fn stop_loading(&self, _request: &StubRequest) {
        // Nothing is held across a load; the session outlives the request.
    }
}

static INTERCEPTORS: OnceLock<RwLock<Vec<Arc<dyn UrlInterceptor>>>> = OnceLock::new();

fn registry() -> &'static RwLock<Vec<Arc<dyn UrlInterceptor>>> {
    INTERCEPTORS.get_or_init(|| RwLock::new(Vec::new()))
}

/// Register `interceptor` with the process-global registry. Idempotent:
/// enabling the same instance twice registers it once.
pub fn enable(interceptor: Arc<dyn UrlInterceptor>) {
    let mut interceptors = registry().write().unwrap_or_else(PoisonError::into_inner);
    if interceptors.iter().any(|i| Arc::ptr_eq(i, &interceptor)) {
        return;
    }
    interceptors.push(interceptor);
}

/// Deregister `interceptor`. Idempotent: disabling an absent instance is a
/// no-op.
pub fn disable(interceptor: &Arc<dyn UrlInterceptor>) {
    registry()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .retain(|i| !Arc::ptr_eq(i, interceptor));
}

/// Whether `interceptor` is currently registered.
pub fn is_enabled(interceptor: &Arc<dyn UrlInterceptor>) -> bool {
    registry()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .iter()
        .any(|i| Arc::ptr_eq(i, interceptor))
}

/// Offer `request` to the registered interceptors, first claimant wins.
///
/// Runs the claimant's load and returns true, or returns false when no
/// interceptor claims the request (the host should perform real I/O).
pub async fn dispatch(request: &StubRequest, client: &dyn ProtocolClient) -> bool {
    let claimant = {
        let interceptors = registry().read().unwrap_or_else(PoisonError::into_inner);
        interceptors
            .iter()
            .find(|i| i.should_intercept(request))
            .cloned()
    };

    match claimant {
        Some(interceptor) => {
            interceptor.start_loading(request, client).await;
            true
        }
        None => false,
    }
}
