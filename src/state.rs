//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the backend behind its three traits (one `BaasClient` in
//! production, a fake in tests) and the server-side session registry.

use std::sync::Arc;

use crate::backend::{AuthApi, BaasClient, MarketplaceStore, ProfileStore};
use crate::services::session::SessionRegistry;

/// Clone is required by Axum; every field is an `Arc` or shares one.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<dyn AuthApi>,
    pub profiles: Arc<dyn ProfileStore>,
    pub market: Arc<dyn MarketplaceStore>,
    pub sessions: SessionRegistry,
    pub cookie_secure: bool,
}

impl AppState {
    #[must_use]
    pub fn new(backend: BaasClient, cookie_secure: bool) -> Self {
        let backend = Arc::new(backend);
        Self {
            auth: backend.clone(),
            profiles: backend.clone(),
            market: backend,
            sessions: SessionRegistry::new(),
            cookie_secure,
        }
    }
}
