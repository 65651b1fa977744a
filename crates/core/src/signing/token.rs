//! Per-request bearer token construction
//!
//! A token is `b64url(header) "." b64url(claims) "." b64url(signature)`. The
//! `sig` claim binds the token to one request: it is the SHA-256 of the
//! canonical request string
//!
//! ```text
//! METHOD \n path_and_query \n hex(sha256(body))
//! ```
//!
//! and the signature itself covers the canonical request followed by the
//! encoded header and claims segments.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use http::Method;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use signway_domain::constants::{BEARER_PREFIX, DEFAULT_TOKEN_HORIZON_SECS, TOKEN_TYPE};
use signway_domain::{Credential, SigningError};

use super::ports::{KeyResolver, ResolvedKey};

/// JOSE header of a signed token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHeader {
    pub alg: String,
    pub typ: String,
}

/// Claims carried by every signed token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// User id
    pub uid: String,
    /// Session id
    pub sid: String,
    /// Issued at, seconds since the epoch
    pub iat: i64,
    /// Expiry, `iat` plus the signing horizon
    pub exp: i64,
    /// Hex SHA-256 of the canonical request
    pub sig: String,
}

/// Encoded bearer token for exactly one request
#[derive(Clone, PartialEq, Eq)]
pub struct SignedToken {
    value: String,
    claims: TokenClaims,
}

impl SignedToken {
    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub const fn claims(&self) -> &TokenClaims {
        &self.claims
    }

    /// `Bearer <token>` for the Authorization header.
    pub fn authorization_value(&self) -> String {
        format!("{BEARER_PREFIX}{}", self.value)
    }

    pub fn into_string(self) -> String {
        self.value
    }
}

impl fmt::Debug for SignedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedToken")
            .field("claims", &self.claims)
            .field("value", &signway_domain::constants::REDACTED)
            .finish()
    }
}

/// `METHOD\npath_and_query\nhex(sha256(body))`
pub fn canonical_request(method: &Method, path_and_query: &str, body: &[u8]) -> String {
    format!("{}\n{}\n{}", method.as_str(), path_and_query, hex::encode(Sha256::digest(body)))
}

/// Hex SHA-256 of the canonical request; the `sig` claim.
pub fn request_digest(canonical: &str) -> String {
    hex::encode(Sha256::digest(canonical.as_bytes()))
}

/// Produces signed bearer tokens
///
/// Signing is pure apart from the `now` argument: identical inputs yield an
/// identical token. Nothing is cached between calls.
#[derive(Clone)]
pub struct TokenSigner {
    resolver: Arc<dyn KeyResolver>,
    horizon_secs: i64,
}

impl fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSigner").field("horizon_secs", &self.horizon_secs).finish()
    }
}

impl TokenSigner {
    pub fn new(resolver: Arc<dyn KeyResolver>) -> Self {
        Self { resolver, horizon_secs: DEFAULT_TOKEN_HORIZON_SECS as i64 }
    }

    /// Override the signing horizon. Sub-second precision is dropped.
    #[must_use]
    pub fn with_horizon(mut self, horizon: Duration) -> Self {
        self.horizon_secs = i64::try_from(horizon.as_secs()).unwrap_or(i64::MAX);
        self
    }

    pub fn horizon(&self) -> Duration {
        Duration::from_secs(self.horizon_secs.unsigned_abs())
    }

    /// Sign one request.
    ///
    /// `path_and_query` must be absolute (leading `/`), exactly as it will
    /// appear on the wire.
    ///
    /// # Errors
    /// `SigningError::Key` when the key material cannot be resolved,
    /// `SigningError::Encoding` for a relative path or claims that fail to
    /// serialize, `SigningError::Primitive` when the signature primitive
    /// rejects the input.
    pub fn sign(
        &self,
        credential: &Credential,
        method: &Method,
        path_and_query: &str,
        body: &[u8],
        now: i64,
    ) -> Result<SignedToken, SigningError> {
        if !path_and_query.starts_with('/') {
            return Err(SigningError::Encoding(format!(
                "request path must be absolute, got '{path_and_query}'"
            )));
        }

        let key = self.resolver.resolve(credential)?;

        let canonical = canonical_request(method, path_and_query, body);
        let header = TokenHeader {
            alg: key.algorithm().jws_name().to_string(),
            typ: TOKEN_TYPE.to_string(),
        };
        let claims = TokenClaims {
            uid: credential.user_id().to_string(),
            sid: credential.session_id().to_string(),
            iat: now,
            exp: now.saturating_add(self.horizon_secs),
            sig: request_digest(&canonical),
        };

        let header_segment = encode_segment(&header)?;
        let claims_segment = encode_segment(&claims)?;
        let unsigned = format!("{header_segment}.{claims_segment}");
        let signing_input = format!("{canonical}\n{unsigned}");

        let signature = sign_bytes(&key, signing_input.as_bytes())?;
        let value = format!("{unsigned}.{}", URL_SAFE_NO_PAD.encode(signature));

        Ok(SignedToken { value, claims })
    }
}

fn encode_segment<T: Serialize>(value: &T) -> Result<String, SigningError> {
    let json = serde_json::to_vec(value).map_err(|e| SigningError::Encoding(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn sign_bytes(key: &ResolvedKey, message: &[u8]) -> Result<Vec<u8>, SigningError> {
    match key {
        ResolvedKey::Rsa(signing_key) => {
            use rsa::signature::{SignatureEncoding, Signer};
            signing_key
                .try_sign(message)
                .map(|sig| sig.to_vec())
                .map_err(|e| SigningError::Primitive(format!("RS256: {e}")))
        }
        ResolvedKey::Ed25519(signing_key) => {
            use ed25519_dalek::Signer;
            signing_key
                .try_sign(message)
                .map(|sig| sig.to_bytes().to_vec())
                .map_err(|e| SigningError::Primitive(format!("EdDSA: {e}")))
        }
    }
}
