//! Stubgate
//!
//! A client-side HTTP interception and stubbing engine. Stubgate sits beneath
//! the host HTTP client stack, claims outgoing requests, and serves canned
//! fixture payloads instead of performing network I/O, so tests run
//! deterministically against pre-recorded responses.
//!
//! # Features
//!
//! - **Transparent Interception**: a protocol handler the host stack consults
//!   per request, with a process-global enable/disable registry
//! - **Fixture Stores**: request- and response-side content stores keyed by a
//!   normalized resource identifier
//! - **Directory Discovery**: fixtures loaded lazily from "Requests" and
//!   "Responses" buckets of a fixture source
//! - **Inline Fixtures**: text, JSON, base64, or file payloads declared in
//!   configuration
//! - **Interception Rules**: host/path/method allow-list; with no rules every
//!   request is claimed
//! - **Isolated Sessions**: each session owns its own coordinator and
//!   providers, so parallel test runs never share state
//!
//! # Example Configuration
//!
//! ```yaml
//! fixtures:
//!   root: tests/fixtures
//! inline:
//!   - key: "GET /posts/1"
//!     body:
//!       type: json
//!       content:
//!         id: 1
//! intercept:
//!   - host:
//!       type: exact
//!       value: jsonplaceholder.typicode.com
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use stubgate::{handler, StubConfig, StubHandler, StubSession};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = StubConfig::from_yaml(r#"
//! inline:
//!   - key: "GET /posts/1"
//!     body:
//!       type: json
//!       content:
//!         id: 1
//! "#)?;
//!
//! let session = Arc::new(StubSession::new(config)?);
//! let interceptor: Arc<dyn handler::UrlInterceptor> =
//!     Arc::new(StubHandler::new(session));
//! handler::enable(interceptor.clone());
//! // ... run the code under test ...
//! handler::disable(&interceptor);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod coordinator;
pub mod handler;
pub mod intercept;
pub mod provider;
pub mod request;
pub mod session;
pub mod store;

pub use config::{FixtureBody, StubConfig};
pub use coordinator::{Coordinator, ResolveError};
pub use handler::{
    CachePolicy, ErrorSignal, ProtocolClient, ResponseDescriptor, StubHandler, UrlInterceptor,
    ERROR_DOMAIN, STUB_RESOLUTION_FAILURE,
};
pub use provider::{DataProvider, DirFixtureSource, FixtureSource, ProviderRole};
pub use request::{ResourceKey, StubRequest};
pub use session::StubSession;
pub use store::ContentStore;
