use const_oid::ObjectIdentifier;
use der::Decode;
use ed25519_dalek::{SigningKey as Ed25519SigningKey, VerifyingKey as Ed25519VerifyingKey};
use p256::ecdsa::{SigningKey as P256SigningKey, VerifyingKey as P256VerifyingKey};
use p384::ecdsa::{SigningKey as P384SigningKey, VerifyingKey as P384VerifyingKey};
use pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::error::{PkiKitError, Result};
use crate::structure::PkiStructure;
use crate::structures::SubjectPublicKeyInfo;

const RSA_ENCRYPTION: ObjectIdentifier = const_oid::db::rfc5912::RSA_ENCRYPTION;
const ID_EC_PUBLIC_KEY: ObjectIdentifier = const_oid::db::rfc5912::ID_EC_PUBLIC_KEY;
const SECP_256_R_1: ObjectIdentifier = const_oid::db::rfc5912::SECP_256_R_1;
const SECP_384_R_1: ObjectIdentifier = const_oid::db::rfc5912::SECP_384_R_1;
const ID_ED_25519: ObjectIdentifier = const_oid::db::rfc8410::ID_ED_25519;

/// Supported key types for certificate operations.
#[derive(Clone, Debug)]
pub enum KeyPair {
    Rsa {
        private: Box<RsaPrivateKey>,
        public: RsaPublicKey,
    },
    EcdsaP256 {
        signing_key: P256SigningKey,
        verifying_key: P256VerifyingKey,
    },
    EcdsaP384 {
        signing_key: P384SigningKey,
        verifying_key: P384VerifyingKey,
    },
    Ed25519 {
        signing_key: Ed25519SigningKey,
    },
}

impl KeyPair {
    /// Generate an RSA key pair with the specified number of bits.
    pub fn generate_rsa(bits: usize) -> Result<Self> {
        let mut rng = rand_core::OsRng;
        let private = RsaPrivateKey::new(&mut rng, bits)
            .map_err(|e| PkiKitError::KeyGenerationError(e.to_string()))?;
        let public = RsaPublicKey::from(&private);
        Ok(KeyPair::Rsa {
            private: Box::new(private),
            public,
        })
    }

    /// Generate an ECDSA P-256 key pair.
    pub fn generate_ecdsa_p256() -> Self {
        let mut rng = rand_core::OsRng;
        let signing_key = P256SigningKey::random(&mut rng);
        let verifying_key = *signing_key.verifying_key();
        KeyPair::EcdsaP256 {
            signing_key,
            verifying_key,
        }
    }

    /// Generate an ECDSA P-384 key pair.
    pub fn generate_ecdsa_p384() -> Self {
        let mut rng = rand_core::OsRng;
        let signing_key = P384SigningKey::random(&mut rng);
        let verifying_key = *signing_key.verifying_key();
        KeyPair::EcdsaP384 {
            signing_key,
            verifying_key,
        }
    }

    /// Generate an Ed25519 key pair.
    pub fn generate_ed25519() -> Self {
        let mut rng = rand_core::OsRng;
        let signing_key: Ed25519SigningKey = Ed25519SigningKey::generate(&mut rng);
        KeyPair::Ed25519 { signing_key }
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_key_pair(self)
    }

    pub fn subject_public_key_info(&self) -> Result<SubjectPublicKeyInfo> {
        self.public_key().to_spki()
    }

    /// Import a private key from a PKCS#8 PEM document (`PRIVATE KEY`).
    pub fn import_from_pkcs8_pem(pem: &str) -> Result<Self> {
        let document = pem::parse(pem)?;
        if document.tag() != "PRIVATE KEY" {
            return Err(PkiKitError::InvalidInput(format!(
                "expected a PRIVATE KEY document, found {}",
                document.tag()
            )));
        }
        Self::import_from_pkcs8_der(document.contents())
    }

    pub fn import_from_pkcs8_der(der: &[u8]) -> Result<Self> {
        let info = pkcs8::PrivateKeyInfo::from_der(der)?;
        match info.algorithm.oid {
            RSA_ENCRYPTION => {
                let private = RsaPrivateKey::from_pkcs8_der(der)?;
                let public = RsaPublicKey::from(&private);
                Ok(KeyPair::Rsa {
                    private: Box::new(private),
                    public,
                })
            }
            ID_EC_PUBLIC_KEY => match info.algorithm.parameters_oid().ok() {
                Some(SECP_256_R_1) => {
                    let signing_key = P256SigningKey::from_pkcs8_der(der)?;
                    let verifying_key = *signing_key.verifying_key();
                    Ok(KeyPair::EcdsaP256 {
                        signing_key,
                        verifying_key,
                    })
                }
                Some(SECP_384_R_1) => {
                    let signing_key = P384SigningKey::from_pkcs8_der(der)?;
                    let verifying_key = *signing_key.verifying_key();
                    Ok(KeyPair::EcdsaP384 {
                        signing_key,
                        verifying_key,
                    })
                }
                other => Err(PkiKitError::InvalidInput(format!(
                    "unsupported EC curve {other:?}"
                ))),
            },
            ID_ED_25519 => Ok(KeyPair::Ed25519 {
                signing_key: Ed25519SigningKey::from_pkcs8_der(der)?,
            }),
            other => Err(PkiKitError::InvalidInput(format!(
                "unsupported private key algorithm {other}"
            ))),
        }
    }

    /// Export the private key as a PKCS#8 PEM document.
    pub fn export_pkcs8_pem(&self) -> Result<String> {
        let pem = match self {
            KeyPair::Rsa { private, .. } => private.to_pkcs8_pem(LineEnding::LF),
            KeyPair::EcdsaP256 { signing_key, .. } => signing_key.to_pkcs8_pem(LineEnding::LF),
            KeyPair::EcdsaP384 { signing_key, .. } => signing_key.to_pkcs8_pem(LineEnding::LF),
            KeyPair::Ed25519 { signing_key } => signing_key.to_pkcs8_pem(LineEnding::LF),
        }
        .map_err(|e| PkiKitError::EncodingError(e.to_string()))?;
        Ok(pem.to_string())
    }
}

/// Public half of a [`KeyPair`], or a key read from a certificate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PublicKey {
    Rsa(RsaPublicKey),
    EcdsaP256(P256VerifyingKey),
    EcdsaP384(P384VerifyingKey),
    Ed25519(Ed25519VerifyingKey),
}

impl PublicKey {
    pub fn from_key_pair(key_pair: &KeyPair) -> Self {
        match key_pair {
            KeyPair::Rsa { public, .. } => PublicKey::Rsa(public.clone()),
            KeyPair::EcdsaP256 { verifying_key, .. } => PublicKey::EcdsaP256(*verifying_key),
            KeyPair::EcdsaP384 { verifying_key, .. } => PublicKey::EcdsaP384(*verifying_key),
            KeyPair::Ed25519 { signing_key } => PublicKey::Ed25519(signing_key.verifying_key()),
        }
    }

    pub fn to_spki(&self) -> Result<SubjectPublicKeyInfo> {
        let document = match self {
            PublicKey::Rsa(key) => key.to_public_key_der(),
            PublicKey::EcdsaP256(key) => key.to_public_key_der(),
            PublicKey::EcdsaP384(key) => key.to_public_key_der(),
            PublicKey::Ed25519(key) => key.to_public_key_der(),
        }
        .map_err(|e| PkiKitError::EncodingError(e.to_string()))?;
        SubjectPublicKeyInfo::from_der(document.as_bytes())
    }

    /// Reads the key out of a SubjectPublicKeyInfo.
    pub fn from_spki(spki: &SubjectPublicKeyInfo) -> Result<Self> {
        let der = spki.to_der()?;
        let algorithm = spki.algorithm.algorithm_id.ok_or_else(|| {
            PkiKitError::InvalidInput("public key algorithm is not set".to_string())
        })?;
        match algorithm {
            RSA_ENCRYPTION => Ok(PublicKey::Rsa(RsaPublicKey::from_public_key_der(&der)?)),
            ID_EC_PUBLIC_KEY => match spki.algorithm.parameters_oid() {
                Some(SECP_256_R_1) => Ok(PublicKey::EcdsaP256(
                    P256VerifyingKey::from_public_key_der(&der)?,
                )),
                Some(SECP_384_R_1) => Ok(PublicKey::EcdsaP384(
                    P384VerifyingKey::from_public_key_der(&der)?,
                )),
                other => Err(PkiKitError::InvalidInput(format!(
                    "unsupported EC curve {other:?}"
                ))),
            },
            ID_ED_25519 => Ok(PublicKey::Ed25519(Ed25519VerifyingKey::from_public_key_der(
                &der,
            )?)),
            other => Err(PkiKitError::InvalidInput(format!(
                "unsupported public key algorithm {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spki_round_trip_for_each_key_type() {
        for key in [
            KeyPair::generate_ecdsa_p256(),
            KeyPair::generate_ecdsa_p384(),
            KeyPair::generate_ed25519(),
        ] {
            let spki = key.subject_public_key_info().unwrap();
            assert_eq!(PublicKey::from_spki(&spki).unwrap(), key.public_key());
        }
    }

    #[test]
    fn test_ec_spki_names_its_curve() {
        let spki = KeyPair::generate_ecdsa_p384().subject_public_key_info().unwrap();
        assert_eq!(spki.algorithm.algorithm_id, Some(ID_EC_PUBLIC_KEY));
        assert_eq!(spki.algorithm.parameters_oid(), Some(SECP_384_R_1));
    }

    #[test]
    fn test_pkcs8_pem_round_trip() {
        let key = KeyPair::generate_ecdsa_p256();
        let pem = key.export_pkcs8_pem().unwrap();
        let imported = KeyPair::import_from_pkcs8_pem(&pem).unwrap();
        assert_eq!(imported.public_key(), key.public_key());

        let ed = KeyPair::generate_ed25519();
        let imported = KeyPair::import_from_pkcs8_pem(&ed.export_pkcs8_pem().unwrap()).unwrap();
        assert_eq!(imported.public_key(), ed.public_key());
    }

    #[test]
    fn test_import_rejects_garbage() {
        assert!(KeyPair::import_from_pkcs8_pem("invalid pem data").is_err());
    }
}
