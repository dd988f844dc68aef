use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

use crate::attachment::ClearPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub pagination: PaginationConfig,
    pub filter: FilterConfig,
    pub attachments: AttachmentConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Page size used by `index` when the controller does not override it
    pub items_per_page: usize,
    /// Upper bound for a request-level `per_page` override
    pub max_per_page: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    pub debug_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentConfig {
    pub max_upload_bytes: usize,
    pub clear_policy: ClearPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Report every auth/permission/not-found failure as 403
    pub legacy_status_codes: bool,
    pub enable_request_logging: bool,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub backend_header: String,
    pub backend_value: String,
    pub csrf_secret: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Pagination overrides
        if let Ok(v) = env::var("PAGINATION_ITEMS_PER_PAGE") {
            self.pagination.items_per_page = v.parse().unwrap_or(self.pagination.items_per_page);
        }
        if let Ok(v) = env::var("PAGINATION_MAX_PER_PAGE") {
            self.pagination.max_per_page = v.parse().ok();
        }

        // Filter overrides
        if let Ok(v) = env::var("FILTER_DEBUG_LOGGING") {
            self.filter.debug_logging = v.parse().unwrap_or(self.filter.debug_logging);
        }

        // Attachment overrides
        if let Ok(v) = env::var("ATTACHMENTS_MAX_UPLOAD_BYTES") {
            self.attachments.max_upload_bytes = v.parse().unwrap_or(self.attachments.max_upload_bytes);
        }
        if let Ok(v) = env::var("ATTACHMENTS_CLEAR_POLICY") {
            self.attachments.clear_policy = v.parse().unwrap_or(self.attachments.clear_policy);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // API overrides
        if let Ok(v) = env::var("API_LEGACY_STATUS_CODES") {
            self.api.legacy_status_codes = v.parse().unwrap_or(self.api.legacy_status_codes);
        }
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_BACKEND_HEADER") {
            self.security.backend_header = v;
        }
        if let Ok(v) = env::var("SECURITY_CSRF_SECRET") {
            self.security.csrf_secret = v;
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            pagination: PaginationConfig {
                items_per_page: 10,
                max_per_page: Some(1000),
            },
            filter: FilterConfig { debug_logging: true },
            attachments: AttachmentConfig {
                max_upload_bytes: 10 * 1024 * 1024, // 10MB
                clear_policy: ClearPolicy::OnMissing,
            },
            database: DatabaseConfig {
                max_connections: 10,
                connection_timeout: 30,
            },
            api: ApiConfig {
                legacy_status_codes: true,
                enable_request_logging: true,
                max_request_size_bytes: 20 * 1024 * 1024,
            },
            security: SecurityConfig {
                enable_cors: true,
                jwt_secret: "development-secret".to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
                backend_header: "X-ENV".to_string(),
                backend_value: "backend".to_string(),
                csrf_secret: "development-csrf".to_string(),
            },
        }
    }

    pub fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            pagination: PaginationConfig {
                items_per_page: 10,
                max_per_page: Some(500),
            },
            filter: FilterConfig { debug_logging: false },
            attachments: AttachmentConfig {
                max_upload_bytes: 5 * 1024 * 1024,
                clear_policy: ClearPolicy::OnMissing,
            },
            database: DatabaseConfig {
                max_connections: 20,
                connection_timeout: 10,
            },
            api: ApiConfig {
                legacy_status_codes: true,
                enable_request_logging: true,
                max_request_size_bytes: 10 * 1024 * 1024,
            },
            security: SecurityConfig {
                enable_cors: true,
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                backend_header: "X-ENV".to_string(),
                backend_value: "backend".to_string(),
                csrf_secret: String::new(),
            },
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            pagination: PaginationConfig {
                items_per_page: 10,
                max_per_page: Some(100),
            },
            filter: FilterConfig { debug_logging: false },
            attachments: AttachmentConfig {
                max_upload_bytes: 2 * 1024 * 1024,
                clear_policy: ClearPolicy::OnMissing,
            },
            database: DatabaseConfig {
                max_connections: 50,
                connection_timeout: 5,
            },
            api: ApiConfig {
                legacy_status_codes: true,
                enable_request_logging: false,
                max_request_size_bytes: 4 * 1024 * 1024,
            },
            security: SecurityConfig {
                enable_cors: true,
                jwt_secret: String::new(),
                jwt_expiry_hours: 4,
                backend_header: "X-ENV".to_string(),
                backend_value: "backend".to_string(),
                csrf_secret: String::new(),
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}
