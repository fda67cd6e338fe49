//! API configuration

use serde::Deserialize;

use core_kernel::{Currency, Timezone};
use domain_reimbursement::{BudgetPolicy, LifecycleConfig};

/// Where records are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    /// Process-local store, lost on restart
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// JWT secret for authentication
    pub jwt_secret: String,
    /// Database URL, used when `store_backend` is postgres
    pub database_url: String,
    pub store_backend: StoreBackend,
    /// Log level
    pub log_level: String,
    pub log_format: LogFormat,
    /// Currency every claim is filed in
    pub currency: Currency,
    /// Timezone for date filters and month buckets
    pub timezone: Timezone,
    pub budget_policy: BudgetPolicy,
    /// Email of the admin created when the directory is empty
    #[serde(default)]
    pub bootstrap_admin_email: Option<String>,
    #[serde(default)]
    pub bootstrap_admin_name: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: "change-me-in-production".to_string(),
            database_url: "postgres://localhost/reimbursement".to_string(),
            store_backend: StoreBackend::Memory,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            currency: Currency::IDR,
            timezone: Timezone::jakarta(),
            budget_policy: BudgetPolicy::Enforce,
            bootstrap_admin_email: None,
            bootstrap_admin_name: None,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from `API_`-prefixed environment variables
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", 8080)?
            .set_default("database_url", "postgres://localhost/reimbursement")?
            .set_default("store_backend", "postgres")?
            .set_default("log_level", "info")?
            .set_default("log_format", "pretty")?
            .set_default("currency", "IDR")?
            .set_default("timezone", "Asia/Jakarta")?
            .set_default("budget_policy", "enforce")?
            .add_source(config::Environment::with_prefix("API"))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn lifecycle(&self) -> LifecycleConfig {
        LifecycleConfig {
            currency: self.currency,
            budget_policy: self.budget_policy,
        }
    }
}
