//! Configuration module
//!
//! Process-wide settings loaded once at startup from the environment (a `.env`
//! file is honoured in development). Nothing here changes after startup.

use std::env;

use crate::storage_types::StorageBackend;

const SERVER_PORT: u16 = 8081;
const JWKS_CACHE_TTL_SECS: i64 = 3600;
const UPSTREAM_TIMEOUT_SECS: u64 = 10;
const GCS_ENDPOINT: &str = "https://storage.googleapis.com";
const IAM_ENDPOINT: &str = "https://iamcredentials.googleapis.com";
const METADATA_ENDPOINT: &str = "http://metadata.google.internal";
const IDENTITY_TOOLKIT_ENDPOINT: &str = "https://identitytoolkit.googleapis.com";
const FIREBASE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
    pub log_format: String,
    // Storage
    pub storage_backend: StorageBackend,
    pub bucket_name: String,
    pub service_account_email: Option<String>,
    pub gcs_endpoint: String,
    pub iam_endpoint: String,
    pub metadata_endpoint: String,
    /// Static OAuth access token; when unset the metadata server is used
    pub gcs_access_token: Option<String>,
    /// Base of the public object URLs returned in listings
    pub public_base_url: String,
    pub memory_storage_base_url: String,
    // Identity
    pub firebase_project_id: String,
    pub firebase_jwks_url: String,
    pub jwks_cache_ttl_secs: i64,
    pub check_revoked: bool,
    pub identity_toolkit_endpoint: String,
    pub allowed_emails: Vec<String>,
    /// Timeout applied to every call to the identity provider and storage backend
    pub upstream_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins: Vec<String> = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let storage_backend = env::var("STORAGE_BACKEND")
            .ok()
            .map(|s| s.parse::<StorageBackend>())
            .transpose()?
            .unwrap_or(StorageBackend::Gcs);

        let allowed_emails = parse_list(&env::var("ALLOWED_EMAILS").unwrap_or_default());

        let gcs_endpoint = env::var("GCS_ENDPOINT").unwrap_or_else(|_| GCS_ENDPOINT.to_string());

        let config = Config {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            environment,
            cors_origins,
            log_format: env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "compact".to_string())
                .to_lowercase(),
            storage_backend,
            bucket_name: env::var("BUCKET_NAME").unwrap_or_default(),
            service_account_email: env::var("SERVICE_ACCOUNT_EMAIL")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            public_base_url: env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| gcs_endpoint.clone()),
            gcs_endpoint,
            iam_endpoint: env::var("IAM_ENDPOINT").unwrap_or_else(|_| IAM_ENDPOINT.to_string()),
            metadata_endpoint: env::var("METADATA_ENDPOINT")
                .unwrap_or_else(|_| METADATA_ENDPOINT.to_string()),
            gcs_access_token: env::var("GCS_ACCESS_TOKEN")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            memory_storage_base_url: env::var("MEMORY_STORAGE_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8081/storage".to_string()),
            firebase_project_id: env::var("FIREBASE_PROJECT_ID").unwrap_or_default(),
            firebase_jwks_url: env::var("FIREBASE_JWKS_URL")
                .unwrap_or_else(|_| FIREBASE_JWKS_URL.to_string()),
            jwks_cache_ttl_secs: env::var("JWKS_CACHE_TTL_SECS")
                .unwrap_or_else(|_| JWKS_CACHE_TTL_SECS.to_string())
                .parse()
                .unwrap_or(JWKS_CACHE_TTL_SECS),
            check_revoked: env::var("CHECK_REVOKED")
                .unwrap_or_else(|_| "false".to_string())
                .to_lowercase()
                .parse()
                .unwrap_or(false),
            identity_toolkit_endpoint: env::var("IDENTITY_TOOLKIT_ENDPOINT")
                .unwrap_or_else(|_| IDENTITY_TOOLKIT_ENDPOINT.to_string()),
            allowed_emails,
            upstream_timeout_secs: env::var("UPSTREAM_TIMEOUT_SECS")
                .unwrap_or_else(|_| UPSTREAM_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(UPSTREAM_TIMEOUT_SECS),
        };

        Ok(config)
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    /// Fail fast on settings the service cannot run without.
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.bucket_name.trim().is_empty() {
            return Err(anyhow::anyhow!("BUCKET_NAME must be set"));
        }
        if self.firebase_project_id.trim().is_empty() {
            return Err(anyhow::anyhow!(
                "FIREBASE_PROJECT_ID must be set to verify identity tokens"
            ));
        }
        if self.storage_backend == StorageBackend::Gcs && self.service_account_email.is_none() {
            return Err(anyhow::anyhow!(
                "SERVICE_ACCOUNT_EMAIL must be set when STORAGE_BACKEND is gcs"
            ));
        }
        if self.is_production() && self.cors_origins.iter().any(|o| o == "*") {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }
        if self.upstream_timeout_secs == 0 {
            return Err(anyhow::anyhow!("UPSTREAM_TIMEOUT_SECS must be greater than 0"));
        }
        if !matches!(self.log_format.as_str(), "compact" | "json") {
            return Err(anyhow::anyhow!(
                "LOG_FORMAT must be 'compact' or 'json', got '{}'",
                self.log_format
            ));
        }
        Ok(())
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            server_port: SERVER_PORT,
            environment: "development".to_string(),
            cors_origins: vec!["*".to_string()],
            log_format: "compact".to_string(),
            storage_backend: StorageBackend::Memory,
            bucket_name: "uploads-bucket".to_string(),
            service_account_email: None,
            gcs_endpoint: GCS_ENDPOINT.to_string(),
            iam_endpoint: IAM_ENDPOINT.to_string(),
            metadata_endpoint: METADATA_ENDPOINT.to_string(),
            gcs_access_token: None,
            public_base_url: GCS_ENDPOINT.to_string(),
            memory_storage_base_url: "http://localhost/storage".to_string(),
            firebase_project_id: "demo-project".to_string(),
            firebase_jwks_url: FIREBASE_JWKS_URL.to_string(),
            jwks_cache_ttl_secs: JWKS_CACHE_TTL_SECS,
            check_revoked: false,
            identity_toolkit_endpoint: IDENTITY_TOOLKIT_ENDPOINT.to_string(),
            allowed_emails: vec!["owner@example.com".to_string()],
            upstream_timeout_secs: UPSTREAM_TIMEOUT_SECS,
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_bucket_required() {
        let mut config = base_config();
        config.bucket_name = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_gcs_requires_service_account() {
        let mut config = base_config();
        config.storage_backend = StorageBackend::Gcs;
        assert!(config.validate().is_err());
        config.service_account_email = Some("signer@demo.iam.gserviceaccount.com".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_wildcard_cors_rejected_in_production() {
        let mut config = base_config();
        config.environment = "Production".to_string();
        assert!(config.validate().is_err());
        config.cors_origins = vec!["https://app.example.com".to_string()];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_list_trims_and_drops_empty() {
        assert_eq!(
            parse_list(" a@x.com, ,B@y.com,"),
            vec!["a@x.com".to_string(), "B@y.com".to_string()]
        );
    }
}
