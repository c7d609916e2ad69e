use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use upgate_api::auth::{Claims, IdentityVerifier, VerificationError};

pub const PROJECT_ID: &str = "upgate-test";
pub const KEY_ID: &str = "test-key-1";
pub const ALLOWED_EMAIL: &str = "alice@example.com";

pub const JWKS: &str = include_str!("../fixtures/jwks.json");
const PRIVATE_KEY_PEM: &[u8] = include_bytes!("../fixtures/test_rsa_private.pem");

/// Verifier answering from a fixed token table. Unlisted tokens are malformed.
pub struct ScriptedVerifier {
    answers: HashMap<String, Result<Claims, VerificationError>>,
}

impl ScriptedVerifier {
    pub fn new() -> Self {
        Self {
            answers: HashMap::new(),
        }
    }

    pub fn with(mut self, token: &str, answer: Result<Claims, VerificationError>) -> Self {
        self.answers.insert(token.to_string(), answer);
        self
    }

    /// Tokens used across the integration tests:
    ///
    /// - `alice`, `bob`: allow-listed users `user-a` and `user-b`
    /// - `alice-shouting`: `user-a` with an upper-cased email
    /// - `outsider`: verified but not allow-listed
    /// - `no-email`: verified, no email claim
    /// - `slashed`, `dot-dot`: subjects that are not a single path segment
    /// - `expired`, `revoked`, `broken`, `jwks-down`: each verification failure
    pub fn standard() -> Self {
        Self::new()
            .with("alice", Ok(claims("user-a", Some(ALLOWED_EMAIL))))
            .with("bob", Ok(claims("user-b", Some("second@example.com"))))
            .with("alice-shouting", Ok(claims("user-a", Some("ALICE@Example.COM"))))
            .with("outsider", Ok(claims("user-x", Some("outsider@evil.com"))))
            .with("no-email", Ok(claims("user-n", None)))
            .with("slashed", Ok(claims("user/../b", Some(ALLOWED_EMAIL))))
            .with("dot-dot", Ok(claims("..", Some(ALLOWED_EMAIL))))
            .with("expired", Err(VerificationError::expired("exp is in the past")))
            .with("revoked", Err(VerificationError::revoked("session revoked")))
            .with("broken", Err(VerificationError::malformed("not a JWT")))
            .with("jwks-down", Err(VerificationError::unknown("key set unreachable")))
    }
}

#[async_trait]
impl IdentityVerifier for ScriptedVerifier {
    async fn verify(&self, token: &str) -> Result<Claims, VerificationError> {
        self.answers
            .get(token)
            .cloned()
            .unwrap_or_else(|| Err(VerificationError::malformed("unrecognised token")))
    }
}

pub fn claims(uid: &str, email: Option<&str>) -> Claims {
    let mut raw = Map::new();
    raw.insert("sub".to_string(), Value::from(uid));
    if let Some(email) = email {
        raw.insert("email".to_string(), Value::from(email));
    }
    Claims::from_raw(raw)
}

/// Claims of a well-formed ID token for `PROJECT_ID`, valid for an hour.
pub fn id_token_claims(uid: &str, email: &str) -> Value {
    let now = Utc::now().timestamp();
    json!({
        "iss": format!("https://securetoken.google.com/{}", PROJECT_ID),
        "aud": PROJECT_ID,
        "sub": uid,
        "email": email,
        "auth_time": now - 60,
        "iat": now - 30,
        "exp": now + 3600,
    })
}

/// Sign `claims` with the fixture key under `kid`.
pub fn sign_token(claims: &Value, kid: &str) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    let key = EncodingKey::from_rsa_pem(PRIVATE_KEY_PEM).expect("fixture key should parse");
    encode(&header, claims, &key).expect("token should sign")
}

pub fn mint_id_token(uid: &str, email: &str) -> String {
    sign_token(&id_token_claims(uid, email), KEY_ID)
}
