//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::DeskConfig;
use crate::gateway::{Gateway, GatewayError, SupabaseGateway};
use crate::services::DeskService;
use crate::store::DeskStore;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: DeskConfig,
    gateway: Option<Arc<dyn Gateway>>,
    desks: DeskStore,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.inner.config)
            .field("gateway", &self.inner.gateway.is_some())
            .field("desks", &self.inner.desks)
            .finish()
    }
}

impl AppState {
    /// Create the state, connecting to the backend if it is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: DeskConfig) -> Result<Self, GatewayError> {
        let gateway = match &config.gateway {
            Some(gateway) => Some(Arc::new(SupabaseGateway::new(gateway)?) as Arc<dyn Gateway>),
            None => None,
        };
        Ok(Self::with_gateway(config, gateway))
    }

    /// Create the state around an existing gateway (or none).
    #[must_use]
    pub fn with_gateway(config: DeskConfig, gateway: Option<Arc<dyn Gateway>>) -> Self {
        let desks = DeskStore::new(config.desk_idle);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                gateway,
                desks,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &DeskConfig {
        &self.inner.config
    }

    /// The backend, if configured.
    #[must_use]
    pub fn gateway(&self) -> Option<&dyn Gateway> {
        self.inner.gateway.as_deref()
    }

    #[must_use]
    pub fn desks(&self) -> &DeskStore {
        &self.inner.desks
    }

    /// Service bound to this state's gateway.
    #[must_use]
    pub fn service(&self) -> DeskService<'_> {
        DeskService::new(self.gateway())
    }
}
