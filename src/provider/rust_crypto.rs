use std::fmt::Display;

use const_oid::{AssociatedOid, ObjectIdentifier};
use ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::Digest;

use super::{CryptoProvider, HashAlgorithm, SignatureParameters};
use crate::asn1::Asn1Node;
use crate::error::{PkiKitError, Result};
use crate::key::{KeyPair, PublicKey};
use crate::structures::{AlgorithmIdentifier, BitString, SubjectPublicKeyInfo};

const ECDSA_WITH_SHA_1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.1");

fn provider_failure(err: impl Display) -> PkiKitError {
    PkiKitError::ProviderFailure(err.to_string())
}

/// A concrete signature algorithm: key family plus digest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignatureScheme {
    /// RSASSA-PKCS1-v1_5.
    RsaPkcs1v15(HashAlgorithm),
    /// ECDSA over the digest, DER `Ecdsa-Sig-Value` on the wire.
    Ecdsa(HashAlgorithm),
    /// Pure Ed25519; the message is not pre-hashed.
    Ed25519,
}

impl SignatureScheme {
    pub fn oid(&self) -> ObjectIdentifier {
        use const_oid::db::rfc5912;
        match self {
            SignatureScheme::RsaPkcs1v15(HashAlgorithm::Sha1) => rfc5912::SHA_1_WITH_RSA_ENCRYPTION,
            SignatureScheme::RsaPkcs1v15(HashAlgorithm::Sha256) => rfc5912::SHA_256_WITH_RSA_ENCRYPTION,
            SignatureScheme::RsaPkcs1v15(HashAlgorithm::Sha384) => rfc5912::SHA_384_WITH_RSA_ENCRYPTION,
            SignatureScheme::RsaPkcs1v15(HashAlgorithm::Sha512) => rfc5912::SHA_512_WITH_RSA_ENCRYPTION,
            SignatureScheme::Ecdsa(HashAlgorithm::Sha1) => ECDSA_WITH_SHA_1,
            SignatureScheme::Ecdsa(HashAlgorithm::Sha256) => rfc5912::ECDSA_WITH_SHA_256,
            SignatureScheme::Ecdsa(HashAlgorithm::Sha384) => rfc5912::ECDSA_WITH_SHA_384,
            SignatureScheme::Ecdsa(HashAlgorithm::Sha512) => rfc5912::ECDSA_WITH_SHA_512,
            SignatureScheme::Ed25519 => const_oid::db::rfc8410::ID_ED_25519,
        }
    }

    /// RSA identifiers carry explicit NULL parameters, the others none.
    pub fn to_algorithm_identifier(&self) -> Result<AlgorithmIdentifier> {
        let params = match self {
            SignatureScheme::RsaPkcs1v15(_) => Some(Asn1Node::from_encodable(&der::asn1::Null)?),
            _ => None,
        };
        Ok(AlgorithmIdentifier::new(self.oid(), params))
    }

    pub fn from_algorithm_identifier(algorithm: &AlgorithmIdentifier) -> Result<Self> {
        use const_oid::db::rfc5912;
        let oid = algorithm
            .algorithm_id
            .ok_or_else(|| provider_failure("signature algorithm is not set"))?;
        Ok(match oid {
            rfc5912::SHA_1_WITH_RSA_ENCRYPTION => SignatureScheme::RsaPkcs1v15(HashAlgorithm::Sha1),
            rfc5912::SHA_256_WITH_RSA_ENCRYPTION => SignatureScheme::RsaPkcs1v15(HashAlgorithm::Sha256),
            rfc5912::SHA_384_WITH_RSA_ENCRYPTION => SignatureScheme::RsaPkcs1v15(HashAlgorithm::Sha384),
            rfc5912::SHA_512_WITH_RSA_ENCRYPTION => SignatureScheme::RsaPkcs1v15(HashAlgorithm::Sha512),
            ECDSA_WITH_SHA_1 => SignatureScheme::Ecdsa(HashAlgorithm::Sha1),
            rfc5912::ECDSA_WITH_SHA_256 => SignatureScheme::Ecdsa(HashAlgorithm::Sha256),
            rfc5912::ECDSA_WITH_SHA_384 => SignatureScheme::Ecdsa(HashAlgorithm::Sha384),
            rfc5912::ECDSA_WITH_SHA_512 => SignatureScheme::Ecdsa(HashAlgorithm::Sha512),
            const_oid::db::rfc8410::ID_ED_25519 => SignatureScheme::Ed25519,
            other => {
                return Err(provider_failure(format!(
                    "unsupported signature algorithm {other}"
                )));
            }
        })
    }
}

/// [`CryptoProvider`] backed by the RustCrypto crates, computing in-process.
#[derive(Clone, Copy, Debug, Default)]
pub struct RustCryptoProvider;

fn digest(algorithm: HashAlgorithm, data: &[u8]) -> Vec<u8> {
    match algorithm {
        HashAlgorithm::Sha1 => sha1::Sha1::digest(data).to_vec(),
        HashAlgorithm::Sha256 => sha2::Sha256::digest(data).to_vec(),
        HashAlgorithm::Sha384 => sha2::Sha384::digest(data).to_vec(),
        HashAlgorithm::Sha512 => sha2::Sha512::digest(data).to_vec(),
    }
}

fn rsa_sign<D>(key: &RsaPrivateKey, data: &[u8]) -> Result<Vec<u8>>
where
    D: Digest + AssociatedOid,
{
    let signing_key = rsa::pkcs1v15::SigningKey::<D>::new(key.clone());
    let signature = signing_key.try_sign(data).map_err(provider_failure)?;
    Ok(signature.to_vec())
}

fn rsa_verify<D>(key: &RsaPublicKey, data: &[u8], signature: &[u8]) -> bool
where
    D: Digest + AssociatedOid,
{
    let verifying_key = rsa::pkcs1v15::VerifyingKey::<D>::new(key.clone());
    rsa::pkcs1v15::Signature::try_from(signature)
        .map(|signature| verifying_key.verify(data, &signature).is_ok())
        .unwrap_or(false)
}

fn rsa_sign_with(hash: HashAlgorithm, key: &RsaPrivateKey, data: &[u8]) -> Result<Vec<u8>> {
    match hash {
        HashAlgorithm::Sha1 => rsa_sign::<sha1::Sha1>(key, data),
        HashAlgorithm::Sha256 => rsa_sign::<sha2::Sha256>(key, data),
        HashAlgorithm::Sha384 => rsa_sign::<sha2::Sha384>(key, data),
        HashAlgorithm::Sha512 => rsa_sign::<sha2::Sha512>(key, data),
    }
}

fn rsa_verify_with(hash: HashAlgorithm, key: &RsaPublicKey, data: &[u8], signature: &[u8]) -> bool {
    match hash {
        HashAlgorithm::Sha1 => rsa_verify::<sha1::Sha1>(key, data, signature),
        HashAlgorithm::Sha256 => rsa_verify::<sha2::Sha256>(key, data, signature),
        HashAlgorithm::Sha384 => rsa_verify::<sha2::Sha384>(key, data, signature),
        HashAlgorithm::Sha512 => rsa_verify::<sha2::Sha512>(key, data, signature),
    }
}

impl CryptoProvider for RustCryptoProvider {
    type PrivateKey = KeyPair;
    type PublicKey = PublicKey;
    type Parameters = SignatureScheme;

    async fn digest(&self, algorithm: HashAlgorithm, data: &[u8]) -> Result<Vec<u8>> {
        Ok(digest(algorithm, data))
    }

    async fn signature_parameters(
        &self,
        key: &KeyPair,
        hash: HashAlgorithm,
    ) -> Result<SignatureParameters<SignatureScheme>> {
        let scheme = match key {
            KeyPair::Rsa { .. } => SignatureScheme::RsaPkcs1v15(hash),
            KeyPair::EcdsaP256 { .. } | KeyPair::EcdsaP384 { .. } => SignatureScheme::Ecdsa(hash),
            KeyPair::Ed25519 { .. } => SignatureScheme::Ed25519,
        };
        Ok(SignatureParameters {
            signature_algorithm: scheme.to_algorithm_identifier()?,
            parameters: scheme,
        })
    }

    async fn sign_with_private_key(
        &self,
        data: &[u8],
        key: &KeyPair,
        parameters: &SignatureScheme,
    ) -> Result<Vec<u8>> {
        tracing::trace!(scheme = ?parameters, len = data.len(), "signing");
        match (key, *parameters) {
            (KeyPair::Rsa { private, .. }, SignatureScheme::RsaPkcs1v15(hash)) => {
                rsa_sign_with(hash, private, data)
            }
            (KeyPair::EcdsaP256 { signing_key, .. }, SignatureScheme::Ecdsa(hash)) => {
                let signature: p256::ecdsa::Signature = signing_key
                    .sign_prehash(&digest(hash, data))
                    .map_err(provider_failure)?;
                Ok(signature.to_der().as_bytes().to_vec())
            }
            (KeyPair::EcdsaP384 { signing_key, .. }, SignatureScheme::Ecdsa(hash)) => {
                let signature: p384::ecdsa::Signature = signing_key
                    .sign_prehash(&digest(hash, data))
                    .map_err(provider_failure)?;
                Ok(signature.to_der().as_bytes().to_vec())
            }
            (KeyPair::Ed25519 { signing_key }, SignatureScheme::Ed25519) => {
                Ok(signing_key.sign(data).to_bytes().to_vec())
            }
            (_, scheme) => Err(provider_failure(format!(
                "{scheme:?} cannot be used with this key"
            ))),
        }
    }

    async fn verify_with_public_key(
        &self,
        data: &[u8],
        signature: &BitString,
        public_key_info: &SubjectPublicKeyInfo,
        signature_algorithm: &AlgorithmIdentifier,
    ) -> Result<bool> {
        let scheme = SignatureScheme::from_algorithm_identifier(signature_algorithm)?;
        let key = PublicKey::from_spki(public_key_info).map_err(provider_failure)?;
        if signature.unused_bits != 0 {
            return Ok(false);
        }
        let signature = signature.raw_bytes();

        let verified = match (&key, scheme) {
            (PublicKey::Rsa(key), SignatureScheme::RsaPkcs1v15(hash)) => {
                rsa_verify_with(hash, key, data, signature)
            }
            (PublicKey::EcdsaP256(key), SignatureScheme::Ecdsa(hash)) => {
                p256::ecdsa::Signature::from_der(signature)
                    .map(|signature| key.verify_prehash(&digest(hash, data), &signature).is_ok())
                    .unwrap_or(false)
            }
            (PublicKey::EcdsaP384(key), SignatureScheme::Ecdsa(hash)) => {
                p384::ecdsa::Signature::from_der(signature)
                    .map(|signature| key.verify_prehash(&digest(hash, data), &signature).is_ok())
                    .unwrap_or(false)
            }
            (PublicKey::Ed25519(key), SignatureScheme::Ed25519) => {
                ed25519_dalek::Signature::from_slice(signature)
                    .map(|signature| key.verify(data, &signature).is_ok())
                    .unwrap_or(false)
            }
            _ => false,
        };
        tracing::trace!(?scheme, verified, "verified signature");
        Ok(verified)
    }

    async fn public_key(
        &self,
        public_key_info: &SubjectPublicKeyInfo,
        signature_algorithm: Option<&AlgorithmIdentifier>,
    ) -> Result<PublicKey> {
        let key = PublicKey::from_spki(public_key_info).map_err(provider_failure)?;
        let compatible = match signature_algorithm
            .map(SignatureScheme::from_algorithm_identifier)
            .transpose()?
        {
            None => true,
            Some(SignatureScheme::RsaPkcs1v15(_)) => matches!(key, PublicKey::Rsa(_)),
            Some(SignatureScheme::Ecdsa(_)) => {
                matches!(key, PublicKey::EcdsaP256(_) | PublicKey::EcdsaP384(_))
            }
            Some(SignatureScheme::Ed25519) => matches!(key, PublicKey::Ed25519(_)),
        };
        if !compatible {
            return Err(provider_failure(
                "public key does not match the signature algorithm",
            ));
        }
        Ok(key)
    }
}
