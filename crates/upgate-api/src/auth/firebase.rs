//! Firebase Authentication ID-token verification
//!
//! ID tokens are RS256 JWTs signed by the `securetoken` service account. Public
//! keys are fetched from its JWKS endpoint and cached by key id; an unknown key
//! id forces a refresh (at most one per 30 s) so rotations are picked up
//! without a restart.

use crate::auth::verifier::{Claims, IdentityVerifier, VerificationError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use upgate_storage::TokenSource;

const ISSUER_PREFIX: &str = "https://securetoken.google.com/";

/// Unknown key ids trigger at most one key-set refresh per this many seconds.
const MIN_REFRESH_INTERVAL_SECS: i64 = 30;

/// JWKS (JSON Web Key Set) structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}

/// JSON Web Key structure (RSA only; Firebase signs with RS256)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwk {
    #[serde(rename = "kty")]
    pub key_type: String,
    #[serde(rename = "kid")]
    pub key_id: Option<String>,
    #[serde(rename = "alg")]
    pub algorithm: Option<String>,
    #[serde(rename = "n")]
    pub modulus: Option<String>,
    #[serde(rename = "e")]
    pub exponent: Option<String>,
}

/// Cached public key with expiration
#[derive(Clone)]
struct CachedKey {
    key: DecodingKey,
    expires_at: DateTime<Utc>,
}

/// Verifier for Firebase ID tokens of one project.
pub struct FirebaseVerifier {
    project_id: String,
    issuer: String,
    jwks_url: String,
    client: reqwest::Client,
    cache: Arc<RwLock<HashMap<String, CachedKey>>>,
    cache_ttl_seconds: i64,
    last_refresh: Arc<RwLock<Option<DateTime<Utc>>>>,
    revocation: Option<RevocationCheck>,
}

impl FirebaseVerifier {
    /// Create a new verifier
    ///
    /// # Arguments
    /// * `project_id` - Firebase project; required `aud` and the suffix of `iss`
    /// * `jwks_url` - securetoken JWKS endpoint
    /// * `client` - shared HTTP client (its timeout bounds the JWKS fetch)
    /// * `cache_ttl_seconds` - How long to cache keys (default: 3600 = 1 hour)
    pub fn new(
        project_id: impl Into<String>,
        jwks_url: impl Into<String>,
        client: reqwest::Client,
        cache_ttl_seconds: Option<i64>,
    ) -> Self {
        let project_id = project_id.into();
        Self {
            issuer: format!("{}{}", ISSUER_PREFIX, project_id),
            project_id,
            jwks_url: jwks_url.into(),
            client,
            cache: Arc::new(RwLock::new(HashMap::new())),
            cache_ttl_seconds: cache_ttl_seconds.unwrap_or(3600),
            last_refresh: Arc::new(RwLock::new(None)),
            revocation: None,
        }
    }

    /// Also reject tokens of disabled accounts or issued before the account's
    /// tokens were revoked.
    pub fn with_revocation_check(mut self, revocation: RevocationCheck) -> Self {
        self.revocation = Some(revocation);
        self
    }

    /// Fetch JWKS from the configured URL
    async fn fetch_jwks(&self) -> Result<Jwks, VerificationError> {
        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| VerificationError::unknown(format!("Failed to fetch JWKS: {}", e)))?;

        if !response.status().is_success() {
            return Err(VerificationError::unknown(format!(
                "JWKS endpoint returned error: {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| VerificationError::unknown(format!("Failed to parse JWKS: {}", e)))
    }

    fn jwk_to_decoding_key(jwk: &Jwk) -> Result<DecodingKey, VerificationError> {
        if jwk.key_type != "RSA" {
            return Err(VerificationError::unknown(format!(
                "Unsupported key type: {}",
                jwk.key_type
            )));
        }
        let n = jwk
            .modulus
            .as_ref()
            .ok_or_else(|| VerificationError::unknown("RSA key missing modulus"))?;
        let e = jwk
            .exponent
            .as_ref()
            .ok_or_else(|| VerificationError::unknown("RSA key missing exponent"))?;

        DecodingKey::from_rsa_components(n, e)
            .map_err(|e| VerificationError::unknown(format!("Failed to create RSA key: {}", e)))
    }

    /// Get decoding key for a given key ID, with caching
    async fn get_decoding_key(&self, kid: &str) -> Result<DecodingKey, VerificationError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.get(kid) {
                if cached.expires_at > Utc::now() {
                    return Ok(cached.key.clone());
                }
            }
        }

        let not_found = || VerificationError::unknown(format!("Key ID {} not found in JWKS", kid));

        // Cache miss or expired: refresh the whole key set, unless that just happened
        let min_interval =
            chrono::Duration::seconds(MIN_REFRESH_INTERVAL_SECS.min(self.cache_ttl_seconds));
        if let Some(at) = *self.last_refresh.read().await {
            if Utc::now() - at < min_interval {
                tracing::debug!(kid = %kid, "Unknown key id within refresh interval");
                return Err(not_found());
            }
        }

        let jwks = self.fetch_jwks().await?;
        *self.last_refresh.write().await = Some(Utc::now());
        let expires_at = Utc::now() + chrono::Duration::seconds(self.cache_ttl_seconds);

        let mut found = None;
        {
            let mut cache = self.cache.write().await;
            cache.retain(|_, cached| cached.expires_at > Utc::now());
            for jwk in &jwks.keys {
                let Some(key_id) = jwk.key_id.as_deref() else {
                    continue;
                };
                let key = match Self::jwk_to_decoding_key(jwk) {
                    Ok(key) => key,
                    Err(e) => {
                        tracing::warn!(kid = %key_id, error = %e, "Skipping unusable JWKS key");
                        continue;
                    }
                };
                if key_id == kid {
                    found = Some(key.clone());
                }
                cache.insert(key_id.to_string(), CachedKey { key, expires_at });
            }
        }
        tracing::debug!(keys = jwks.keys.len(), "Refreshed identity provider JWKS");

        found.ok_or_else(not_found)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.project_id]);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "sub", "aud", "iss"]);
        validation.validate_exp = true;
        validation.validate_nbf = false;
        validation.leeway = 0;
        validation
    }
}

/// Map token decoding failures onto the verification outcomes clients see.
fn classify(err: &jsonwebtoken::errors::Error) -> VerificationError {
    match err.kind() {
        ErrorKind::ExpiredSignature => VerificationError::expired("Token has expired"),
        ErrorKind::InvalidRsaKey(_) | ErrorKind::InvalidKeyFormat | ErrorKind::Crypto(_) => {
            VerificationError::unknown(format!("Could not verify token signature: {}", err))
        }
        _ => VerificationError::malformed(err.to_string()),
    }
}

#[async_trait]
impl IdentityVerifier for FirebaseVerifier {
    async fn verify(&self, token: &str) -> Result<Claims, VerificationError> {
        let header = jsonwebtoken::decode_header(token)
            .map_err(|e| VerificationError::malformed(format!("Invalid token header: {}", e)))?;

        if header.alg != Algorithm::RS256 {
            return Err(VerificationError::malformed(format!(
                "Unsupported algorithm: {:?}. Expected RS256",
                header.alg
            )));
        }
        let kid = header
            .kid
            .as_deref()
            .ok_or_else(|| VerificationError::malformed("Token header has no \"kid\" claim"))?;

        let decoding_key = self.get_decoding_key(kid).await?;

        let token_data = decode::<Map<String, Value>>(token, &decoding_key, &self.validation())
            .map_err(|e| {
                tracing::debug!("ID token validation failed: {}", e);
                classify(&e)
            })?;

        let issued_at = token_data
            .claims
            .get("iat")
            .and_then(Value::as_i64)
            .ok_or_else(|| VerificationError::malformed("Token has no \"iat\" claim"))?;
        if issued_at > Utc::now().timestamp() {
            return Err(VerificationError::malformed("Token issued in the future"));
        }

        let claims = Claims::from_raw(token_data.claims);
        if claims.uid.is_empty() {
            return Err(VerificationError::malformed("Token has an empty \"sub\" claim"));
        }

        if let Some(revocation) = &self.revocation {
            revocation.ensure_not_revoked(&claims).await?;
        }

        Ok(claims)
    }
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<AccountInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountInfo {
    #[serde(default)]
    disabled: bool,
    /// Seconds since epoch, as a string
    #[serde(default)]
    valid_since: Option<String>,
}

/// Account state lookup through the Identity Toolkit `accounts:lookup` API.
pub struct RevocationCheck {
    client: reqwest::Client,
    endpoint: String,
    project_id: String,
    tokens: Arc<dyn TokenSource>,
}

impl RevocationCheck {
    pub fn new(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        project_id: impl Into<String>,
        tokens: Arc<dyn TokenSource>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            project_id: project_id.into(),
            tokens,
        }
    }

    async fn ensure_not_revoked(&self, claims: &Claims) -> Result<(), VerificationError> {
        let access_token = self
            .tokens
            .access_token()
            .await
            .map_err(|e| VerificationError::unknown(e.to_string()))?;
        let url = format!(
            "{}/v1/projects/{}/accounts:lookup",
            self.endpoint, self.project_id
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(access_token)
            .json(&json!({ "localId": [claims.uid] }))
            .send()
            .await
            .map_err(|e| VerificationError::unknown(format!("Account lookup failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(VerificationError::unknown(format!(
                "Account lookup returned {}",
                response.status()
            )));
        }

        let body: LookupResponse = response.json().await.map_err(|e| {
            VerificationError::unknown(format!("Invalid account lookup response: {}", e))
        })?;
        let account = body.users.into_iter().next().ok_or_else(|| {
            VerificationError::unknown("No user record found for the provided user ID")
        })?;

        if account.disabled {
            return Err(VerificationError::revoked("The user record is disabled"));
        }

        let valid_since = account
            .valid_since
            .as_deref()
            .and_then(|s| s.parse::<i64>().ok());
        if let Some(valid_since) = valid_since {
            let auth_time = claims.auth_time.ok_or_else(|| {
                VerificationError::malformed("Token has no \"auth_time\" claim")
            })?;
            if auth_time < valid_since {
                return Err(VerificationError::revoked("The ID token has been revoked"));
            }
        }

        Ok(())
    }
}
