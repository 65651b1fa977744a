//! Port interface for turning key material into a usable private key

use std::fmt;

use rsa::pkcs1v15::SigningKey as RsaSigningKey;
use sha2::Sha256;
use signway_domain::{Credential, KeyAlgorithm, KeyResolutionError};

/// Private key ready to sign, one variant per supported algorithm
#[derive(Clone)]
pub enum ResolvedKey {
    /// RSASSA-PKCS1-v1_5 key bound to SHA-256
    Rsa(Box<RsaSigningKey<Sha256>>),
    /// Ed25519 key derived from a 32-byte seed
    Ed25519(ed25519_dalek::SigningKey),
}

impl ResolvedKey {
    pub const fn algorithm(&self) -> KeyAlgorithm {
        match self {
            Self::Rsa(_) => KeyAlgorithm::Rs256,
            Self::Ed25519(_) => KeyAlgorithm::EdDsa,
        }
    }
}

impl fmt::Debug for ResolvedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ResolvedKey").field(&self.algorithm()).finish_non_exhaustive()
    }
}

/// Trait for resolving a credential's key material
///
/// Resolution must be a pure function of the credential. Failing inputs are
/// caller bugs and are never retried.
pub trait KeyResolver: Send + Sync {
    fn resolve(&self, credential: &Credential) -> Result<ResolvedKey, KeyResolutionError>;
}
