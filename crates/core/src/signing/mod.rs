//! Token signer and key resolution

pub mod keys;
pub mod ports;
pub mod token;

pub use keys::MaterialKeyResolver;
pub use ports::{KeyResolver, ResolvedKey};
pub use token::{
    canonical_request, request_digest, SignedToken, TokenClaims, TokenHeader, TokenSigner,
};
