//! Deterministic key material for tests
//!
//! The RSA keys are fixed 2048-bit test keys; never use them outside tests.

use signway_domain::Credential;

/// 2048-bit RSA test key, PKCS#8 PEM
pub const RSA_PKCS8_PEM: &str = include_str!("fixtures/rsa_pkcs8.pem");

/// Same kind of key in traditional PKCS#1 PEM
pub const RSA_PKCS1_PEM: &str = include_str!("fixtures/rsa_pkcs1.pem");

/// Ed25519 seed bytes `0x01..=0x20`, hex encoded
pub const ED25519_SEED_HEX: &str =
    "0102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f20";

/// The seed of [`ED25519_SEED_HEX`], standard base64
pub const ED25519_SEED_BASE64: &str = "AQIDBAUGBwgJCgsMDQ4PEBESExQVFhcYGRobHB0eHyA=";

/// A second, distinct Ed25519 seed (32 bytes of `0x9d`)
pub const ALT_ED25519_SEED_HEX: &str =
    "9d9d9d9d9d9d9d9d9d9d9d9d9d9d9d9d9d9d9d9d9d9d9d9d9d9d9d9d9d9d9d9d";

pub fn ed25519_credential() -> Credential {
    Credential::ed25519("client-user", "client-session", ED25519_SEED_HEX)
}

pub fn user_credential() -> Credential {
    Credential::ed25519("end-user", "end-user-session", ALT_ED25519_SEED_HEX)
}

pub fn rsa_credential() -> Credential {
    Credential::rsa("rsa-user", "rsa-session", RSA_PKCS8_PEM)
}
