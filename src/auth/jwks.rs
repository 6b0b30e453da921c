use jsonwebtoken::{Algorithm, DecodingKey, TokenData, Validation, decode, decode_header};
use moka::future::Cache;
use std::sync::Arc;
use tracing::debug;

use super::jwt::Claims;

const JWKS_URL_TEMPLATE: &str = "https://{}.supabase.co/auth/v1/.well-known/jwks.json";

/// Public key material for one `kid`.
#[derive(Clone)]
enum JwkMaterial {
    Ec { x: String, y: String },
    Rsa { n: String, e: String },
}

#[derive(Clone)]
struct JwksKeyData {
    material: JwkMaterial,
    algorithm: Algorithm,
}

impl JwksKeyData {
    fn from_jwk(jwk: &serde_json::Value) -> Result<Self, String> {
        let field = |name: &str| {
            jwk[name]
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| format!("Missing '{name}' in JWK"))
        };

        match jwk["kty"].as_str().unwrap_or("EC") {
            "RSA" => Ok(Self {
                material: JwkMaterial::Rsa {
                    n: field("n")?,
                    e: field("e")?,
                },
                algorithm: Algorithm::RS256,
            }),
            "EC" => {
                let algorithm = match jwk["alg"].as_str().unwrap_or("ES256") {
                    "ES384" => Algorithm::ES384,
                    _ => Algorithm::ES256,
                };
                Ok(Self {
                    material: JwkMaterial::Ec {
                        x: field("x")?,
                        y: field("y")?,
                    },
                    algorithm,
                })
            }
            other => Err(format!("Unsupported JWK key type {other}")),
        }
    }

    fn decoding_key(&self) -> Result<DecodingKey, String> {
        match &self.material {
            JwkMaterial::Ec { x, y } => DecodingKey::from_ec_components(x, y),
            JwkMaterial::Rsa { n, e } => DecodingKey::from_rsa_components(n, e),
        }
        .map_err(|e| format!("Failed to create decoding key: {e}"))
    }
}

/// Supabase signing keys, fetched on demand and cached per `kid` for an hour.
#[derive(Clone)]
pub struct JwksCache {
    cache: Arc<Cache<String, JwksKeyData>>,
    jwks_url: String,
    client: reqwest::Client,
    anon_key: String,
}

impl JwksCache {
    pub fn new(project_ref: &str, anon_key: &str) -> Self {
        let cache = Arc::new(
            Cache::builder()
                .time_to_live(std::time::Duration::from_secs(3600))
                .max_capacity(10)
                .build(),
        );

        Self {
            cache,
            jwks_url: JWKS_URL_TEMPLATE.replace("{}", project_ref),
            client: reqwest::Client::new(),
            anon_key: anon_key.to_string(),
        }
    }

    async fn fetch_jwks(&self) -> Result<serde_json::Value, String> {
        debug!(url = %self.jwks_url, "Fetching JWKS");

        let response = self
            .client
            .get(&self.jwks_url)
            .header("apikey", &self.anon_key)
            .send()
            .await
            .map_err(|e| format!("Failed to fetch JWKS: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("Failed to fetch JWKS: HTTP {status}"));
        }

        response
            .json()
            .await
            .map_err(|e| format!("Failed to parse JWKS JSON: {e}"))
    }

    async fn get_key_data(&self, kid: &str) -> Result<JwksKeyData, String> {
        if let Some(cached) = self.cache.get(kid).await {
            return Ok(cached);
        }

        let jwks = self.fetch_jwks().await?;
        let keys = jwks["keys"].as_array().ok_or("No keys in JWKS")?;

        let jwk = keys
            .iter()
            .find(|k| k["kid"].as_str() == Some(kid))
            .ok_or(format!("Key with kid={kid} not found in JWKS"))?;

        let key_data = JwksKeyData::from_jwk(jwk)?;
        self.cache.insert(kid.to_string(), key_data.clone()).await;
        Ok(key_data)
    }

    pub async fn validate_token(&self, token: &str) -> Result<TokenData<Claims>, String> {
        let header = decode_header(token).map_err(|e| format!("Failed to decode header: {e}"))?;
        let kid = header.kid.ok_or("No 'kid' in token header")?;

        let key_data = self.get_key_data(&kid).await?;
        let decoding_key = key_data.decoding_key()?;

        let mut validation = Validation::new(key_data.algorithm);
        validation.validate_aud = false;

        decode::<Claims>(token, &decoding_key, &validation)
            .map_err(|e| format!("Token validation failed: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ec_and_rsa_keys() {
        let ec = JwksKeyData::from_jwk(&serde_json::json!({
            "kty": "EC", "alg": "ES384", "x": "abc", "y": "def"
        }))
        .unwrap();
        assert_eq!(ec.algorithm, Algorithm::ES384);

        let rsa = JwksKeyData::from_jwk(&serde_json::json!({
            "kty": "RSA", "n": "abc", "e": "AQAB"
        }))
        .unwrap();
        assert_eq!(rsa.algorithm, Algorithm::RS256);
    }

    #[test]
    fn rejects_incomplete_keys() {
        assert!(JwksKeyData::from_jwk(&serde_json::json!({ "kty": "EC", "x": "abc" })).is_err());
        assert!(JwksKeyData::from_jwk(&serde_json::json!({ "kty": "oct" })).is_err());
    }
}
