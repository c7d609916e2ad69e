//! Google Cloud Storage V4 signing inputs.
//!
//! Builds canonical requests, strings-to-sign and POST policy documents for
//! [query string authentication]. Producing the RSA signature itself is left to
//! the IAM `signBlob` API.
//!
//! [query string authentication]: https://cloud.google.com/storage/docs/authentication/signatures

use crate::traits::{PolicyCondition, StorageError, StorageResult};
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

pub(crate) const ALGORITHM: &str = "GOOG4-RSA-SHA256";

/// Longest validity V4 signatures allow (7 days).
pub(crate) const MAX_EXPIRES_SECS: u64 = 604_800;

/// RFC 3986 unreserved characters stay literal; everything else is encoded.
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Date, scope and credential shared by every signature made at one instant.
#[derive(Debug, Clone)]
pub(crate) struct SigningScope {
    pub datetime: String,
    pub scope: String,
    pub credential: String,
}

impl SigningScope {
    pub fn new(service_account_email: &str, now: DateTime<Utc>) -> Self {
        let datetime = now.format("%Y%m%dT%H%M%SZ").to_string();
        let scope = format!("{}/auto/storage/goog4_request", &datetime[0..8]);
        let credential = format!("{}/{}", service_account_email, scope);
        Self {
            datetime,
            scope,
            credential,
        }
    }
}

/// `host[:port]` of an endpoint URL, as it must appear in the `host` header.
pub(crate) fn endpoint_host(endpoint: &str) -> StorageResult<String> {
    let url = reqwest::Url::parse(endpoint)
        .map_err(|e| StorageError::ConfigError(format!("invalid endpoint '{}': {}", endpoint, e)))?;
    let hostname = url
        .host_str()
        .ok_or_else(|| StorageError::ConfigError(format!("endpoint '{}' has no host", endpoint)))?;
    Ok(match url.port() {
        Some(port) => format!("{}:{}", hostname, port),
        None => hostname.to_string(),
    })
}

pub(crate) fn encode(value: &str) -> String {
    utf8_percent_encode(value, UNRESERVED).to_string()
}

/// Path-style resource path with each key segment encoded and slashes kept.
pub(crate) fn resource_path(bucket: &str, key: &str) -> String {
    let encoded_key = key.split('/').map(encode).collect::<Vec<_>>().join("/");
    format!("/{}/{}", encode(bucket), encoded_key)
}

/// Canonical request and its query string for a signed `method` on `resource`,
/// signing `host` and any extra headers (which the client must then send verbatim).
pub(crate) struct CanonicalRequest {
    pub canonical: String,
    pub query: String,
}

pub(crate) fn canonical_request(
    method: &str,
    resource: &str,
    host: &str,
    extra_headers: &[(&str, &str)],
    scope: &SigningScope,
    expires_secs: u64,
) -> CanonicalRequest {
    let mut headers: Vec<(String, String)> = extra_headers
        .iter()
        .map(|(k, v)| (k.to_lowercase(), v.trim().to_string()))
        .collect();
    headers.push(("host".to_string(), host.to_string()));
    headers.sort_by(|a, b| a.0.cmp(&b.0));

    let signed_headers = headers
        .iter()
        .map(|(k, _)| k.as_str())
        .collect::<Vec<_>>()
        .join(";");

    let mut params = vec![
        ("X-Goog-Algorithm".to_string(), ALGORITHM.to_string()),
        ("X-Goog-Credential".to_string(), scope.credential.clone()),
        ("X-Goog-Date".to_string(), scope.datetime.clone()),
        ("X-Goog-Expires".to_string(), expires_secs.to_string()),
        ("X-Goog-SignedHeaders".to_string(), signed_headers.clone()),
    ];
    params.sort_by(|a, b| a.0.cmp(&b.0));

    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    let canonical_headers = headers
        .iter()
        .map(|(k, v)| format!("{}:{}", k, v))
        .collect::<Vec<_>>()
        .join("\n");

    let canonical = format!(
        "{}\n{}\n{}\n{}\n\n{}\nUNSIGNED-PAYLOAD",
        method, resource, query, canonical_headers, signed_headers
    );

    CanonicalRequest { canonical, query }
}

pub(crate) fn string_to_sign(scope: &SigningScope, canonical_request: &str) -> String {
    let digest = Sha256::digest(canonical_request.as_bytes());
    format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        scope.datetime,
        scope.scope,
        hex::encode(digest)
    )
}

/// Base64 policy document for a V4 POST upload of `key`.
pub(crate) fn policy_document(
    bucket: &str,
    key: &str,
    scope: &SigningScope,
    conditions: &[PolicyCondition],
    expiration: DateTime<Utc>,
) -> String {
    let mut all: Vec<Value> = conditions.iter().map(PolicyCondition::to_json).collect();
    all.push(json!({ "bucket": bucket }));
    all.push(json!({ "key": key }));
    all.push(json!({ "x-goog-date": scope.datetime }));
    all.push(json!({ "x-goog-credential": scope.credential }));
    all.push(json!({ "x-goog-algorithm": ALGORITHM }));

    let document = json!({
        "conditions": all,
        "expiration": expiration.to_rfc3339_opts(SecondsFormat::Secs, true),
    });

    base64::engine::general_purpose::STANDARD.encode(document.to_string())
}
