//! Interception coordinator.
//!
//! Owns the two data providers for the life of a stubbing session and
//! mediates registration and payload resolution. Resolution propagates
//! presence/absence: an unregistered key is [`ResolveError::NotFound`], never
//! empty bytes, so the protocol handler can distinguish "no fixture" from an
//! empty-but-present fixture.

use crate::provider::{DataProvider, FixtureSource, ProviderRole};
use crate::request::ResourceKey;
use thiserror::Error;
use tracing::debug;

/// Why a payload could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// No fixture is registered under the key.
    #[error("no fixture registered for {0}")]
    NotFound(ResourceKey),

    /// No provider is installed for the requested side.
    #[error("no {} provider installed", .0.label())]
    NoProvider(ProviderRole),
}

/// Mediator between the protocol handler and the two data providers.
#[derive(Debug, Default)]
pub struct Coordinator {
    request_provider: Option<DataProvider>,
    response_provider: Option<DataProvider>,
}

impl Coordinator {
    /// Create a coordinator with no providers installed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the request-side provider, replacing any prior instance.
    pub fn register_request_provider(&mut self, provider: DataProvider) {
        if self.request_provider.is_some() {
            debug!("Replacing request provider");
        }
        self.request_provider = Some(provider);
    }

    /// Install the response-side provider, replacing any prior instance.
    pub fn register_response_provider(&mut self, provider: DataProvider) {
        if self.response_provider.is_some() {
            debug!("Replacing response provider");
        }
        self.response_provider = Some(provider);
    }

    /// Whether a request-side provider is installed.
    pub fn has_request_provider(&self) -> bool {
        self.request_provider.is_some()
    }

    /// Whether a response-side provider is installed.
    pub fn has_response_provider(&self) -> bool {
        self.response_provider.is_some()
    }

    /// Resolve the response payload for `key`.
    pub fn resolve_response_data(&self, key: &ResourceKey) -> Result<Vec<u8>, ResolveError> {
        let provider = self
            .response_provider
            .as_ref()
            .ok_or(ResolveError::NoProvider(ProviderRole::Response))?;
        provider
            .lookup(key)
            .ok_or_else(|| ResolveError::NotFound(key.clone()))
    }

    /// Resolve the request payload for `key` (diagnostic/echo use).
    pub fn resolve_request_data(&self, key: &ResourceKey) -> Result<Vec<u8>, ResolveError> {
        let provider = self
            .request_provider
            .as_ref()
            .ok_or(ResolveError::NoProvider(ProviderRole::Request))?;
        provider
            .lookup(key)
            .ok_or_else(|| ResolveError::NotFound(key.clone()))
    }

    /// Register `locator` under `key` with the provider for `role`.
    ///
    /// Skipped silently when that provider is absent; the providers belong to
    /// the session, and a missing one is surfaced at resolution time instead.
    pub fn register_resource(
        &mut self,
        source: &dyn FixtureSource,
        locator: &str,
        key: &ResourceKey,
        role: ProviderRole,
    ) {
        let provider = match role {
            ProviderRole::Request => self.request_provider.as_mut(),
            ProviderRole::Response => self.response_provider.as_mut(),
        };
        if let Some(provider) = provider {
            provider.register_resource(source, locator, key);
        }
    }

    /// Register `payload` directly under `key` with the provider for `role`.
    /// Registration bypasses the provider's writability gate.
    pub fn register_payload(&mut self, key: ResourceKey, payload: Vec<u8>, role: ProviderRole) {
        let provider = match role {
            ProviderRole::Request => self.request_provider.as_mut(),
            ProviderRole::Response => self.response_provider.as_mut(),
        };
        if let Some(provider) = provider {
            provider.register_payload(key, payload);
        }
    }

    /// Store `payload` under `key` with the provider for `role`, subject to
    /// that provider's writability.
    pub fn set_content(&mut self, key: ResourceKey, payload: Vec<u8>, role: ProviderRole) {
        let provider = match role {
            ProviderRole::Request => self.request_provider.as_mut(),
            ProviderRole::Response => self.response_provider.as_mut(),
        };
        if let Some(provider) = provider {
            provider.set_content(key, payload);
        }
    }

    /// Byte length of the request payload for `key`, 0 when absent or no
    /// provider is installed.
    pub fn request_content_size(&self, key: &ResourceKey) -> usize {
        self.request_provider
            .as_ref()
            .map(|p| p.content_size(key))
            .unwrap_or(0)
    }

    /// Byte length of the response payload for `key`, 0 when absent or no
    /// provider is installed.
    pub fn response_content_size(&self, key: &ResourceKey) -> usize {
        self.response_provider
            .as_ref()
            .map(|p| p.content_size(key))
            .unwrap_or(0)
    }
}
