//! use pkikit::error::PkiKitError;

use thiserror::Error;

/// Represents errors that can occur in the PkiKit library.
///
/// Decode-time structural problems surface as [`PkiKitError::SchemaMismatch`];
/// nothing in the crate falls back to a default value or a partially
/// populated structure when one of these is returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PkiKitError {
    /// The parsed tree does not conform to the declared layout.
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// `sign` was called without a usable private key.
    #[error("A private key is required for signing")]
    MissingKey,

    /// `verify` could not resolve a verification key.
    #[error("An issuer certificate is required to verify a certificate that is not self-signed")]
    MissingIssuer,

    /// Opaque failure reported by the cryptographic provider.
    #[error("Cryptographic provider failure: {0}")]
    ProviderFailure(String),

    /// Error during data encoding.
    #[error("Failed to encode data: {0}")]
    EncodingError(String),

    /// Error during data decoding.
    #[error("Failed to decode data: {0}")]
    DecodingError(String),

    /// Error due to invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Error during key generation.
    #[error("Key generation error: {0}")]
    KeyGenerationError(String),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, PkiKitError>;

impl From<der::Error> for PkiKitError {
    /// Converts a `der::Error` into a `PkiKitError`.
    fn from(err: der::Error) -> Self {
        PkiKitError::DecodingError(err.to_string())
    }
}

impl From<rsa::Error> for PkiKitError {
    fn from(err: rsa::Error) -> Self {
        PkiKitError::ProviderFailure(err.to_string())
    }
}

impl From<pkcs8::Error> for PkiKitError {
    fn from(err: pkcs8::Error) -> Self {
        PkiKitError::DecodingError(err.to_string())
    }
}

impl From<pkcs8::spki::Error> for PkiKitError {
    fn from(err: pkcs8::spki::Error) -> Self {
        PkiKitError::DecodingError(err.to_string())
    }
}

impl From<pem::PemError> for PkiKitError {
    fn from(err: pem::PemError) -> Self {
        PkiKitError::DecodingError(err.to_string())
    }
}
