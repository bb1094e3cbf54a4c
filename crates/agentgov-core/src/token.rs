// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 agentgov contributors

//! Token exchange: RFC 8693-style narrowing of a broad parent token into a
//! signed, tool-scoped, short-lived [`ScopedToken`].
//!
//! Lifecycle (capacity/cleanup/revocation) is grounded on
//! `TokenExchangeService` (`agent_platform/gateway/token_exchange.py`);
//! cryptographic signing is a supplement that service never did — spec
//! §4.6/§6 requires a real signed compact token, so every issued token is
//! also encoded as a JWT via [`jsonwebtoken`] and can be verified
//! statelessly through [`TokenExchange::validate_signed`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{GovernorError, Result};

const MAX_ACTIVE_TOKENS: usize = 10_000;

/// Claims carried by the signed representation — the RFC 8693 actor claim
/// (`act.sub`) records the parent token that was narrowed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorClaim {
    pub sub: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub jti: String,
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    pub org_id: String,
    pub tool_name: String,
    pub scopes: Vec<String>,
    pub act: ActorClaim,
}

#[derive(Debug, Clone)]
pub struct ScopedToken {
    pub token_id: String,
    pub parent_token_id: String,
    pub agent_id: String,
    pub org_id: String,
    pub tool_name: String,
    pub scopes: Vec<String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub claims: TokenClaims,
    pub signed_bytes: String,
}

/// Wraps either a symmetric secret (HS256) or a startup-generated Ed25519
/// keypair (EdDSA). The signed representation's `alg` header always
/// matches the configured algorithm (spec §6).
pub enum TokenSigner {
    Hmac {
        encoding_key: EncodingKey,
        decoding_key: DecodingKey,
    },
    Ed25519 {
        encoding_key: EncodingKey,
        decoding_key: DecodingKey,
    },
}

impl TokenSigner {
    pub fn hmac(secret: &str) -> Self {
        TokenSigner::Hmac {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Generate a fresh Ed25519 keypair for the lifetime of this process.
    /// Used when no symmetric secret (`AP_TOKEN_SECRET`) is configured.
    pub fn generate_ed25519() -> Result<Self> {
        use ring::signature::{Ed25519KeyPair, KeyPair};

        let rng = ring::rand::SystemRandom::new();
        let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng)
            .map_err(|e| GovernorError::Configuration(format!("failed to generate signing key: {:?}", e)))?;
        let keypair = Ed25519KeyPair::from_pkcs8(pkcs8.as_ref())
            .map_err(|e| GovernorError::Configuration(format!("failed to load signing key: {:?}", e)))?;
        let public_key = keypair.public_key().as_ref().to_vec();

        Ok(TokenSigner::Ed25519 {
            encoding_key: EncodingKey::from_ed_der(pkcs8.as_ref()),
            decoding_key: DecodingKey::from_ed_der(&public_key),
        })
    }

    fn algorithm(&self) -> Algorithm {
        match self {
            TokenSigner::Hmac { .. } => Algorithm::HS256,
            TokenSigner::Ed25519 { .. } => Algorithm::EdDSA,
        }
    }

    fn encoding_key(&self) -> &EncodingKey {
        match self {
            TokenSigner::Hmac { encoding_key, .. } => encoding_key,
            TokenSigner::Ed25519 { encoding_key, .. } => encoding_key,
        }
    }

    fn decoding_key(&self) -> &DecodingKey {
        match self {
            TokenSigner::Hmac { decoding_key, .. } => decoding_key,
            TokenSigner::Ed25519 { decoding_key, .. } => decoding_key,
        }
    }
}

pub struct TokenExchange {
    issuer: String,
    default_ttl_seconds: i64,
    signer: TokenSigner,
    active: Mutex<HashMap<String, ScopedToken>>,
}

impl TokenExchange {
    pub fn new(issuer: impl Into<String>, default_ttl_seconds: i64, signer: TokenSigner) -> Self {
        Self {
            issuer: issuer.into(),
            default_ttl_seconds,
            signer,
            active: Mutex::new(HashMap::new()),
        }
    }

    pub fn exchange(
        &self,
        parent_token_id: &str,
        agent_id: &str,
        org_id: &str,
        tool_name: &str,
        scopes: Option<Vec<String>>,
        ttl_seconds: Option<i64>,
    ) -> Result<ScopedToken> {
        let mut guard = self.active.lock().expect("token exchange mutex poisoned");
        if guard.len() >= MAX_ACTIVE_TOKENS {
            drop(guard);
            self.cleanup_expired();
            guard = self.active.lock().expect("token exchange mutex poisoned");
            if guard.len() >= MAX_ACTIVE_TOKENS {
                return Err(GovernorError::TokenCapacity);
            }
        }

        let ttl = ttl_seconds.unwrap_or(self.default_ttl_seconds);
        // `issued_at`/`expires_at` keep full DateTime<Utc> precision; the
        // expiry check below compares against these, not the whole-second
        // JWT `exp` claim.
        let issued_at = Utc::now();
        let expires_at = issued_at + Duration::seconds(ttl);
        let token_id = uuid::Uuid::new_v4().to_string();
        let scopes = scopes.unwrap_or_else(|| vec![format!("tool:{}:execute", tool_name)]);

        let claims = TokenClaims {
            jti: token_id.clone(),
            iss: self.issuer.clone(),
            sub: agent_id.to_string(),
            aud: format!("tool:{}", tool_name),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            org_id: org_id.to_string(),
            tool_name: tool_name.to_string(),
            scopes: scopes.clone(),
            act: ActorClaim {
                sub: parent_token_id.to_string(),
            },
        };

        let header = Header::new(self.signer.algorithm());
        let signed_bytes = encode(&header, &claims, self.signer.encoding_key())
            .map_err(|e| GovernorError::Configuration(format!("failed to sign token: {}", e)))?;

        let token = ScopedToken {
            token_id: token_id.clone(),
            parent_token_id: parent_token_id.to_string(),
            agent_id: agent_id.to_string(),
            org_id: org_id.to_string(),
            tool_name: tool_name.to_string(),
            scopes,
            issued_at,
            expires_at,
            claims,
            signed_bytes,
        };

        guard.insert(token_id.clone(), token.clone());
        tracing::info!(token_id = %token_id, parent_token_id = %parent_token_id, agent_id = %agent_id, tool_name = %tool_name, ttl_seconds = ttl, "token exchanged");
        Ok(token)
    }

    /// Look up by id; expired entries are evicted and treated as absent,
    /// then the signature/issuer/audience are verified against the live
    /// record's own claims.
    pub fn validate(&self, token_id: &str) -> Option<ScopedToken> {
        let mut guard = self.active.lock().expect("token exchange mutex poisoned");
        let token = guard.get(token_id)?.clone();
        if Utc::now() > token.expires_at {
            guard.remove(token_id);
            return None;
        }
        let expected_audience = format!("tool:{}", token.tool_name);
        if self
            .validate_signed(&token.signed_bytes, Some(&expected_audience))
            .is_none()
        {
            guard.remove(token_id);
            return None;
        }
        Some(token)
    }

    /// Stateless verification by signature alone — does not require the
    /// token to be present in this issuer's live index.
    pub fn validate_signed(&self, signed_bytes: &str, audience: Option<&str>) -> Option<TokenClaims> {
        let mut validation = Validation::new(self.signer.algorithm());
        validation.set_issuer(&[self.issuer.clone()]);
        match audience {
            Some(aud) => validation.set_audience(&[aud.to_string()]),
            None => validation.validate_aud = false,
        }
        decode::<TokenClaims>(signed_bytes, self.signer.decoding_key(), &validation)
            .ok()
            .map(|data| data.claims)
    }

    pub fn revoke(&self, token_id: &str) -> bool {
        let mut guard = self.active.lock().expect("token exchange mutex poisoned");
        let removed = guard.remove(token_id).is_some();
        if removed {
            tracing::info!(token_id = %token_id, "token revoked");
        }
        removed
    }

    pub fn revoke_all_for_agent(&self, agent_id: &str) -> usize {
        let mut guard = self.active.lock().expect("token exchange mutex poisoned");
        let to_revoke: Vec<String> = guard
            .iter()
            .filter(|(_, t)| t.agent_id == agent_id)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &to_revoke {
            guard.remove(id);
        }
        if !to_revoke.is_empty() {
            tracing::info!(agent_id = %agent_id, count = to_revoke.len(), "tokens revoked for agent");
        }
        to_revoke.len()
    }

    pub fn cleanup_expired(&self) -> usize {
        let mut guard = self.active.lock().expect("token exchange mutex poisoned");
        let now = Utc::now();
        let expired: Vec<String> = guard
            .iter()
            .filter(|(_, t)| now > t.expires_at)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            guard.remove(id);
        }
        expired.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    fn exchange() -> TokenExchange {
        TokenExchange::new("agent-platform", 300, TokenSigner::hmac("test-secret"))
    }

    #[test]
    fn exchange_then_validate_round_trip() {
        let ex = exchange();
        let token = ex.exchange("parent-1", "a1", "o1", "search", None, Some(60)).unwrap();
        let validated = ex.validate(&token.token_id).unwrap();
        assert_eq!(validated.agent_id, "a1");
        assert_eq!(validated.claims.act.sub, "parent-1");
        assert_eq!(validated.claims.aud, "tool:search");
    }

    #[test]
    fn revoke_makes_validate_return_none() {
        let ex = exchange();
        let token = ex.exchange("parent-1", "a1", "o1", "search", None, Some(60)).unwrap();
        assert!(ex.revoke(&token.token_id));
        assert!(ex.validate(&token.token_id).is_none());
    }

    #[test]
    fn revoke_all_for_agent() {
        let ex = exchange();
        let t1 = ex.exchange("p1", "a1", "o1", "search", None, Some(60)).unwrap();
        let t2 = ex.exchange("p1", "a1", "o1", "calculator", None, Some(60)).unwrap();
        let t3 = ex.exchange("p1", "a2", "o1", "search", None, Some(60)).unwrap();
        let count = ex.revoke_all_for_agent("a1");
        assert_eq!(count, 2);
        assert!(ex.validate(&t1.token_id).is_none());
        assert!(ex.validate(&t2.token_id).is_none());
        assert!(ex.validate(&t3.token_id).is_some());
    }

    #[test]
    fn zero_ttl_expires_after_ten_millis() {
        let ex = exchange();
        let token = ex.exchange("p1", "a1", "o1", "search", None, Some(0)).unwrap();
        sleep(Duration::from_millis(10));
        assert!(ex.validate(&token.token_id).is_none());
    }

    #[test]
    fn stateless_validation_does_not_require_live_index() {
        let ex = exchange();
        let token = ex.exchange("p1", "a1", "o1", "search", None, Some(60)).unwrap();
        ex.revoke(&token.token_id);
        let claims = ex.validate_signed(&token.signed_bytes, Some("tool:search"));
        assert!(claims.is_some());
    }
}