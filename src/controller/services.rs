use std::sync::Arc;

use crate::auth::{CsrfTokens, JwtValidator, TokenValidator};
use crate::components::ComponentCache;
use crate::config::AppConfig;
use crate::observer::NotificationBus;
use crate::store::{FileStore, UserDirectory};

/// Process-wide collaborators shared by every request
#[derive(Clone)]
pub struct Services {
    pub config: Arc<AppConfig>,
    pub bus: Arc<NotificationBus>,
    pub components: Arc<ComponentCache>,
    /// `None` when token validation is not configured
    pub tokens: Option<Arc<dyn TokenValidator>>,
    pub users: Arc<dyn UserDirectory>,
    pub files: Arc<dyn FileStore>,
    pub csrf: CsrfTokens,
}

impl Services {
    /// Token validation and CSRF signing come from the security config
    pub fn new(config: AppConfig, users: Arc<dyn UserDirectory>, files: Arc<dyn FileStore>) -> Self {
        let tokens = JwtValidator::new(&config.security.jwt_secret)
            .ok()
            .map(|v| Arc::new(v) as Arc<dyn TokenValidator>);
        if tokens.is_none() {
            tracing::warn!("No JWT secret configured - authenticated actions will fail");
        }
        let csrf = CsrfTokens::new(config.security.csrf_secret.clone());

        Self {
            config: Arc::new(config),
            bus: Arc::new(NotificationBus::new()),
            components: Arc::new(ComponentCache::new()),
            tokens,
            users,
            files,
            csrf,
        }
    }

    pub fn with_bus(mut self, bus: NotificationBus) -> Self {
        self.bus = Arc::new(bus);
        self
    }

    pub fn with_components(mut self, components: ComponentCache) -> Self {
        self.components = Arc::new(components);
        self
    }

    pub fn with_tokens(mut self, tokens: Option<Arc<dyn TokenValidator>>) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn legacy_status_codes(&self) -> bool {
        self.config.api.legacy_status_codes
    }
}
