//! The seam between certificate handling and cryptographic primitives.
//!
//! Nothing outside this module hashes, signs or verifies. A [`CryptoProvider`]
//! may compute in-process, out-of-process or on dedicated hardware; every
//! operation is `async` so callers never depend on which.

pub mod rust_crypto;

use std::fmt;
use std::str::FromStr;

use const_oid::ObjectIdentifier;

use crate::error::{PkiKitError, Result};
use crate::structures::{AlgorithmIdentifier, BitString, SubjectPublicKeyInfo};

pub use rust_crypto::{RustCryptoProvider, SignatureScheme};

/// Digest algorithms a signature or key hash can be computed with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Sha1,
    #[default]
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            HashAlgorithm::Sha1 => const_oid::db::rfc5912::ID_SHA_1,
            HashAlgorithm::Sha256 => const_oid::db::rfc5912::ID_SHA_256,
            HashAlgorithm::Sha384 => const_oid::db::rfc5912::ID_SHA_384,
            HashAlgorithm::Sha512 => const_oid::db::rfc5912::ID_SHA_512,
        }
    }

    pub fn output_len(&self) -> usize {
        match self {
            HashAlgorithm::Sha1 => 20,
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HashAlgorithm::Sha1 => "SHA-1",
            HashAlgorithm::Sha256 => "SHA-256",
            HashAlgorithm::Sha384 => "SHA-384",
            HashAlgorithm::Sha512 => "SHA-512",
        };
        f.write_str(name)
    }
}

impl FromStr for HashAlgorithm {
    type Err = PkiKitError;

    /// Accepts `SHA-256`, `sha256` and the like.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().replace('-', "").as_str() {
            "SHA1" => Ok(HashAlgorithm::Sha1),
            "SHA256" => Ok(HashAlgorithm::Sha256),
            "SHA384" => Ok(HashAlgorithm::Sha384),
            "SHA512" => Ok(HashAlgorithm::Sha512),
            _ => Err(PkiKitError::InvalidInput(format!(
                "unsupported hash algorithm '{s}'"
            ))),
        }
    }
}

/// What a provider hands back when asked how a key signs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignatureParameters<P> {
    /// Goes into both `tbsCertificate.signature` and `signatureAlgorithm`.
    pub signature_algorithm: AlgorithmIdentifier,
    /// Opaque to the caller; passed back to [`CryptoProvider::sign_with_private_key`].
    pub parameters: P,
}

/// External cryptographic collaborator.
///
/// Errors from a provider are reported as [`PkiKitError::ProviderFailure`]
/// and are never retried by the callers in this crate.
#[allow(async_fn_in_trait)]
pub trait CryptoProvider {
    /// Handle to a signing key.
    type PrivateKey;
    /// Handle to a verification key.
    type PublicKey;
    /// Per-signature parameter block.
    type Parameters: Clone;

    async fn digest(&self, algorithm: HashAlgorithm, data: &[u8]) -> Result<Vec<u8>>;

    /// Picks the signature algorithm for `key` combined with `hash`.
    async fn signature_parameters(
        &self,
        key: &Self::PrivateKey,
        hash: HashAlgorithm,
    ) -> Result<SignatureParameters<Self::Parameters>>;

    async fn sign_with_private_key(
        &self,
        data: &[u8],
        key: &Self::PrivateKey,
        parameters: &Self::Parameters,
    ) -> Result<Vec<u8>>;

    /// `Ok(false)` for a signature that does not verify; `Err` only when the
    /// check could not be carried out at all.
    async fn verify_with_public_key(
        &self,
        data: &[u8],
        signature: &BitString,
        public_key_info: &SubjectPublicKeyInfo,
        signature_algorithm: &AlgorithmIdentifier,
    ) -> Result<bool>;

    async fn public_key(
        &self,
        public_key_info: &SubjectPublicKeyInfo,
        signature_algorithm: Option<&AlgorithmIdentifier>,
    ) -> Result<Self::PublicKey>;
}
