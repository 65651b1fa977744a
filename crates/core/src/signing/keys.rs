//! Default key resolver for PEM-encoded RSA keys and Ed25519 seeds

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey as RsaSigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::RsaPrivateKey;
use signway_domain::constants::ED25519_SEED_LEN;
use signway_domain::{Credential, KeyMaterial, KeyResolutionError};

use super::ports::{KeyResolver, ResolvedKey};

const PKCS1_MARKER: &str = "BEGIN RSA PRIVATE KEY";

/// Resolves key material straight from the credential
///
/// RSA keys are accepted as PKCS#8 or PKCS#1 PEM. Ed25519 seeds are accepted
/// as 64 hex characters or as standard base64 of 32 bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaterialKeyResolver;

impl KeyResolver for MaterialKeyResolver {
    fn resolve(&self, credential: &Credential) -> Result<ResolvedKey, KeyResolutionError> {
        match credential.key_material() {
            KeyMaterial::Rsa { private_key_pem } => parse_rsa_pem(private_key_pem)
                .map(|key| ResolvedKey::Rsa(Box::new(RsaSigningKey::new(key)))),
            KeyMaterial::Ed25519 { seed } => parse_ed25519_seed(seed).map(ResolvedKey::Ed25519),
        }
    }
}

fn parse_rsa_pem(pem: &str) -> Result<RsaPrivateKey, KeyResolutionError> {
    let pem = pem.trim();
    if pem.contains(PKCS1_MARKER) {
        RsaPrivateKey::from_pkcs1_pem(pem)
            .map_err(|e| KeyResolutionError::InvalidRsaKey(format!("PKCS#1: {e}")))
    } else {
        RsaPrivateKey::from_pkcs8_pem(pem)
            .map_err(|e| KeyResolutionError::InvalidRsaKey(format!("PKCS#8: {e}")))
    }
}

fn parse_ed25519_seed(seed: &str) -> Result<ed25519_dalek::SigningKey, KeyResolutionError> {
    let seed = seed.trim();
    let bytes = if seed.len() == ED25519_SEED_LEN * 2
        && seed.bytes().all(|b| b.is_ascii_hexdigit())
    {
        hex::decode(seed).map_err(|e| KeyResolutionError::InvalidSeed(format!("hex: {e}")))?
    } else {
        STANDARD
            .decode(seed)
            .map_err(|e| KeyResolutionError::InvalidSeed(format!("not hex or base64: {e}")))?
    };

    let bytes: [u8; ED25519_SEED_LEN] = bytes.as_slice().try_into().map_err(|_| {
        KeyResolutionError::InvalidSeed(format!(
            "expected {ED25519_SEED_LEN} bytes, got {}",
            bytes.len()
        ))
    })?;

    Ok(ed25519_dalek::SigningKey::from_bytes(&bytes))
}
