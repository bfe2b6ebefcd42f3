use std::collections::HashMap;
use std::time::{Duration, Instant};

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::AuthError;

/// Google publishes the public keys for Firebase ID tokens as a JWK set.
const JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

/// Fallback cache lifetime when the JWKS response carries no max-age.
const DEFAULT_KEY_TTL: Duration = Duration::from_secs(300);

/// What the identity provider asserts about the caller.
#[derive(Debug, Clone)]
pub struct IdentityClaims {
    pub uid: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FirebaseClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Jwk {
    kid: String,
    n: String,
    e: String,
}

#[derive(Debug, Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

struct KeyCache {
    keys: HashMap<String, Jwk>,
    fresh_until: Instant,
}

/// Verifies Firebase ID tokens against Google's published signing keys.
/// Keys are cached per kid and refreshed when the cache goes stale.
pub struct FirebaseVerifier {
    project_id: String,
    http: reqwest::Client,
    cache: RwLock<KeyCache>,
}

impl FirebaseVerifier {
    pub fn new(project_id: String) -> Self {
        Self {
            project_id,
            http: reqwest::Client::new(),
            cache: RwLock::new(KeyCache {
                keys: HashMap::new(),
                fresh_until: Instant::now(),
            }),
        }
    }

    pub async fn verify(&self, token: &str) -> Result<IdentityClaims, AuthError> {
        let header = decode_header(token).map_err(|_| AuthError::InvalidToken)?;
        let kid = header.kid.ok_or(AuthError::InvalidToken)?;

        let jwk = self.key_for(&kid).await?;
        let key =
            DecodingKey::from_rsa_components(&jwk.n, &jwk.e).map_err(|_| AuthError::InvalidToken)?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.project_id.as_str()]);
        validation.set_issuer(&[format!(
            "https://securetoken.google.com/{}",
            self.project_id
        )]);

        let data = decode::<FirebaseClaims>(token, &key, &validation).map_err(|e| {
            debug!("token verification failed: {e}");
            AuthError::InvalidToken
        })?;

        Ok(IdentityClaims {
            uid: data.claims.sub,
            email: data.claims.email.filter(|e| !e.is_empty()),
            name: data.claims.name.filter(|n| !n.is_empty()),
        })
    }

    async fn key_for(&self, kid: &str) -> Result<Jwk, AuthError> {
        {
            let cache = self.cache.read().await;
            if cache.fresh_until > Instant::now() {
                if let Some(jwk) = cache.keys.get(kid) {
                    return Ok(jwk.clone());
                }
            }
        }

        let mut cache = self.cache.write().await;
        // Another task may have refreshed while we waited for the write lock
        if cache.fresh_until <= Instant::now() || !cache.keys.contains_key(kid) {
            let resp = self.http.get(JWKS_URL).send().await.map_err(|e| {
                warn!("JWKS fetch failed: {e}");
                AuthError::InvalidToken
            })?;

            let ttl = resp
                .headers()
                .get(reqwest::header::CACHE_CONTROL)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_max_age)
                .unwrap_or(DEFAULT_KEY_TTL);

            let set: JwkSet = resp.json().await.map_err(|e| {
                warn!("JWKS parse failed: {e}");
                AuthError::InvalidToken
            })?;

            cache.keys = set.keys.into_iter().map(|k| (k.kid.clone(), k)).collect();
            cache.fresh_until = Instant::now() + ttl;
            debug!("refreshed {} Firebase signing keys", cache.keys.len());
        }

        cache.keys.get(kid).cloned().ok_or(AuthError::InvalidToken)
    }
}

fn parse_max_age(cache_control: &str) -> Option<Duration> {
    cache_control
        .split(',')
        .map(str::trim)
        .find_map(|d| d.strip_prefix("max-age="))
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_age_parsing() {
        assert_eq!(
            parse_max_age("public, max-age=19302, must-revalidate, no-transform"),
            Some(Duration::from_secs(19302))
        );
        assert_eq!(parse_max_age("no-cache"), None);
        assert_eq!(parse_max_age("max-age=bogus"), None);
    }

    #[tokio::test]
    async fn garbage_token_is_rejected_before_any_network_call() {
        let verifier = FirebaseVerifier::new("demo-project".into());
        let err = verifier.verify("not-a-jwt").await.unwrap_err();
        assert_eq!(err, AuthError::InvalidToken);
    }
}
