pub mod extensions;
pub mod factory;
pub mod params;
pub mod trust;

use bon::Builder;
use const_oid::ObjectIdentifier;
use der::Tag;
use serde_json::json;

use crate::asn1::Asn1Node;
use crate::error::{PkiKitError, Result};
use crate::issuer::Issuer;
use crate::key::KeyPair;
use crate::pem_utils;
use crate::provider::{CryptoProvider, HashAlgorithm};
use crate::schema::{Captures, SchemaNode};
use crate::structure::PkiStructure;
use crate::structures::{
    AlgorithmIdentifier, AlgorithmIdentifierNames, BitString, Extension, Name, SerialNumber,
    SubjectPublicKeyInfo,
};
use crate::tbs_certificate::{TbsCertificate, TbsCertificateNames, Version};
use extensions::{BasicConstraints, ToAndFromX509Extension};
use params::{CertificationRequestInfo, Validity};

const PEM_LABEL: &str = "CERTIFICATE";

/// Capture labels for [`Certificate`].
#[derive(Clone, Debug, Builder)]
pub struct CertificateNames {
    #[builder(default, into)]
    pub block_name: String,
    #[builder(default)]
    pub tbs_certificate: TbsCertificateNames,
    #[builder(default = AlgorithmIdentifierNames::builder().block_name("signatureAlgorithm").build())]
    pub signature_algorithm: AlgorithmIdentifierNames,
    #[builder(default = "signatureValue".to_string(), into)]
    pub signature_value: String,
}

impl Default for CertificateNames {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Represents an X.509 certificate.
///
/// `tbs` holds the exact bytes the signature covers. It is filled when the
/// certificate is decoded or signed and is never re-derived from
/// `tbs_certificate` behind the caller's back: after a field is changed the
/// certificate keeps serializing and verifying the committed bytes until it is
/// signed again or re-assembled explicitly with [`Certificate::to_node_with`].
///
/// # Fields
/// * `tbs` - Committed TBS bytes; empty for a certificate that was never signed or decoded.
/// * `tbs_certificate` - The decoded or caller-set TBS fields.
/// * `signature_algorithm` - Outer algorithm identifier; agrees with `tbs_certificate.signature`.
/// * `signature_value` - The signature over `tbs`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Builder)]
pub struct Certificate {
    #[builder(default)]
    pub tbs: Vec<u8>,
    #[builder(default)]
    pub tbs_certificate: TbsCertificate,
    #[builder(default)]
    pub signature_algorithm: AlgorithmIdentifier,
    #[builder(default)]
    pub signature_value: BitString,
}

impl Certificate {
    pub fn serial_number(&self) -> &SerialNumber {
        &self.tbs_certificate.serial_number
    }

    pub fn issuer(&self) -> &Name {
        &self.tbs_certificate.issuer
    }

    pub fn subject(&self) -> &Name {
        &self.tbs_certificate.subject
    }

    pub fn subject_public_key_info(&self) -> &SubjectPublicKeyInfo {
        &self.tbs_certificate.subject_public_key_info
    }

    pub fn extensions(&self) -> &[Extension] {
        self.tbs_certificate.extensions.as_deref().unwrap_or_default()
    }

    /// First extension with the given OID.
    pub fn extension(&self, oid: &ObjectIdentifier) -> Option<&Extension> {
        self.extensions().iter().find(|ext| &ext.extn_id == oid)
    }

    /// Parsed BasicConstraints, if the certificate carries a decodable one.
    pub fn basic_constraints(&self) -> Option<&BasicConstraints> {
        self.extension(&BasicConstraints::OID)
            .and_then(|ext| ext.parsed_value.as_ref())
            .and_then(|parsed| parsed.basic_constraints())
    }

    /// Assembles DER for the TBS part from the current field values.
    pub fn encode_tbs(&self) -> Result<Vec<u8>> {
        self.tbs_certificate.to_der()
    }

    /// Encodes the certificate, reusing the committed TBS bytes unless
    /// `reassemble` is set or none exist.
    pub fn to_node_with(&self, reassemble: bool) -> Result<Asn1Node> {
        let tbs = if reassemble || self.tbs.is_empty() {
            self.tbs_certificate.to_node()?
        } else {
            Asn1Node::from_der(&self.tbs).map_err(|e| {
                PkiKitError::EncodingError(format!("stored TBS bytes are malformed: {e}"))
            })?
        };
        Asn1Node::sequence(vec![
            tbs,
            self.signature_algorithm.to_node()?,
            self.signature_value.to_node()?,
        ])
    }

    pub fn to_pem(&self) -> Result<String> {
        Ok(pem_utils::der_to_pem(&self.to_der()?, PEM_LABEL))
    }

    pub fn from_pem(pem: &str) -> Result<Self> {
        let der = pem_utils::pem_to_der_with_label(pem, PEM_LABEL)?;
        Self::from_der(&der)
    }

    /// Whether issuer and subject are the same name, judged on the committed
    /// TBS bytes when there are any.
    pub fn is_self_issued(&self) -> Result<bool> {
        if self.tbs.is_empty() {
            return Ok(self.tbs_certificate.is_self_issued());
        }
        let committed = TbsCertificate::from_der(&self.tbs).map_err(|e| {
            PkiKitError::EncodingError(format!("stored TBS bytes are malformed: {e}"))
        })?;
        Ok(committed.is_self_issued())
    }

    /// Signs the current fields with `key`.
    ///
    /// The provider picks the signature algorithm for the key and `hash`; it
    /// is written to both `tbs_certificate.signature` and
    /// `signature_algorithm`. The TBS is always assembled afresh. Nothing is
    /// modified unless every provider call succeeds.
    pub async fn sign<P>(
        &mut self,
        provider: &P,
        key: Option<&P::PrivateKey>,
        hash: HashAlgorithm,
    ) -> Result<()>
    where
        P: CryptoProvider,
    {
        let key = key.ok_or(PkiKitError::MissingKey)?;
        let parameters = provider.signature_parameters(key, hash).await?;

        let mut tbs_certificate = self.tbs_certificate.clone();
        tbs_certificate.signature = parameters.signature_algorithm.clone();
        let tbs = tbs_certificate.to_der()?;

        let signature = provider
            .sign_with_private_key(&tbs, key, &parameters.parameters)
            .await?;
        tracing::debug!(
            %hash,
            tbs_len = tbs.len(),
            signature_len = signature.len(),
            "signed certificate"
        );

        self.tbs_certificate.signature = parameters.signature_algorithm.clone();
        self.signature_algorithm = parameters.signature_algorithm;
        self.signature_value = BitString::from_bytes(signature);
        self.tbs = tbs;
        Ok(())
    }

    /// Checks `signature_value` over the committed TBS bytes.
    ///
    /// The key comes from `issuer` when given. Without one, a self-issued
    /// certificate is checked against its own key; anything else fails with
    /// [`PkiKitError::MissingIssuer`]. A certificate with no committed bytes
    /// verifies as `false`; the TBS is never rebuilt here. Validity period,
    /// revocation and policy are not looked at.
    pub async fn verify<P>(&self, provider: &P, issuer: Option<&Certificate>) -> Result<bool>
    where
        P: CryptoProvider,
    {
        let public_key_info = match issuer {
            Some(issuer) => issuer.subject_public_key_info(),
            None if self.is_self_issued()? => self.subject_public_key_info(),
            None => return Err(PkiKitError::MissingIssuer),
        };
        if self.tbs.is_empty() {
            tracing::debug!("no committed TBS bytes, nothing to verify");
            return Ok(false);
        }

        let verified = provider
            .verify_with_public_key(
                &self.tbs,
                &self.signature_value,
                public_key_info,
                &self.signature_algorithm,
            )
            .await?;
        tracing::debug!(
            serial = %hex::encode(self.serial_number().as_bytes()),
            self_signed = issuer.is_none(),
            verified,
            "verified certificate signature"
        );
        Ok(verified)
    }

    /// Imports the subject public key through `provider`, checked against
    /// `signature_algorithm` once one is set.
    pub async fn public_key<P: CryptoProvider>(&self, provider: &P) -> Result<P::PublicKey> {
        let algorithm = self
            .signature_algorithm
            .algorithm_id
            .is_some()
            .then_some(&self.signature_algorithm);
        provider
            .public_key(self.subject_public_key_info(), algorithm)
            .await
    }

    /// SHA-1 over the subject public key bits, the customary key identifier.
    ///
    /// SHA-1 is kept for compatibility with existing key identifiers; use
    /// [`Certificate::key_hash_with`] for anything else.
    pub async fn key_hash<P: CryptoProvider>(&self, provider: &P) -> Result<Vec<u8>> {
        self.key_hash_with(provider, HashAlgorithm::Sha1).await
    }

    pub async fn key_hash_with<P: CryptoProvider>(
        &self,
        provider: &P,
        algorithm: HashAlgorithm,
    ) -> Result<Vec<u8>> {
        provider
            .digest(
                algorithm,
                self.subject_public_key_info().subject_public_key.raw_bytes(),
            )
            .await
    }

    /// Creates a new self-signed certificate with a random serial number,
    /// valid for a year from now.
    pub async fn new_self_signed<P>(
        provider: &P,
        cert_info: &CertificationRequestInfo,
        key: &KeyPair,
    ) -> Result<Self>
    where
        P: CryptoProvider<PrivateKey = KeyPair>,
    {
        // For self-signed certificates, the issuer is the same as the subject
        let self_issuer = SelfIssuer {
            name: cert_info.subject.clone(),
            key,
        };
        self_issuer
            .issue(
                provider,
                cert_info,
                Validity::for_days(365),
                SerialNumber::random(),
            )
            .await
    }
}

impl PkiStructure for Certificate {
    type Names = CertificateNames;

    fn schema(names: &Self::Names) -> SchemaNode {
        SchemaNode::sequence(vec![
            TbsCertificate::schema(&names.tbs_certificate),
            AlgorithmIdentifier::schema(&names.signature_algorithm),
            SchemaNode::primitive(Tag::BitString).labeled(&names.signature_value),
        ])
        .labeled(&names.block_name)
    }

    fn from_captures(captures: &Captures<'_>, names: &Self::Names) -> Result<Self> {
        // The signed bytes are taken before anything inside them is decoded.
        let tbs = captures
            .require(&names.tbs_certificate.block_name)?
            .to_der();
        let certificate = Self {
            tbs,
            tbs_certificate: TbsCertificate::from_captures(captures, &names.tbs_certificate)?,
            signature_algorithm: AlgorithmIdentifier::from_node(
                captures.require(&names.signature_algorithm.block_name)?,
            )?,
            signature_value: BitString::from_node(captures.require(&names.signature_value)?)?,
        };
        tracing::debug!(
            serial = %hex::encode(certificate.serial_number().as_bytes()),
            tbs_len = certificate.tbs.len(),
            "decoded certificate"
        );
        Ok(certificate)
    }

    fn to_node(&self) -> Result<Asn1Node> {
        self.to_node_with(false)
    }

    fn to_json(&self) -> serde_json::Value {
        let mut object = json!({
            "tbs": hex::encode(&self.tbs),
            "tbsCertificate": self.tbs_certificate.to_json(),
            "signatureAlgorithm": self.signature_algorithm.to_json(),
            "signatureValue": self.signature_value.to_json(),
        });
        if self.tbs_certificate.version != Version::V1 {
            object["version"] = json!(self.tbs_certificate.version as u8);
        }
        object
    }
}

// Helper struct for self-signed certificates
struct SelfIssuer<'a> {
    name: Name,
    key: &'a KeyPair,
}

impl Issuer for SelfIssuer<'_> {
    fn issuer_name(&self) -> Name {
        self.name.clone()
    }

    fn signing_key(&self) -> &KeyPair {
        self.key
    }

    fn issuer_certificate(&self) -> Option<&Certificate> {
        None
    }
}

/// A certificate together with the private key for its subject public key.
#[derive(Debug, Clone)]
pub struct CertificateWithPrivateKey {
    pub cert: Certificate,
    pub key: KeyPair,
}

impl Issuer for CertificateWithPrivateKey {
    fn issuer_name(&self) -> Name {
        // The name of the issuer is the subject of the certificate
        self.cert.subject().clone()
    }

    fn signing_key(&self) -> &KeyPair {
        &self.key
    }

    fn issuer_certificate(&self) -> Option<&Certificate> {
        Some(&self.cert)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::RustCryptoProvider;

    fn unsigned(key: &KeyPair) -> Certificate {
        let name: Name = "CN=Unit".parse().unwrap();
        Certificate::builder()
            .tbs_certificate(
                TbsCertificate::builder()
                    .version(Version::V3)
                    .serial_number(SerialNumber::from(7))
                    .issuer(name.clone())
                    .subject(name)
                    .subject_public_key_info(key.subject_public_key_info().unwrap())
                    .extensions(Vec::new())
                    .build(),
            )
            .build()
    }

    #[tokio::test]
    async fn test_sign_commits_tbs_and_algorithms() {
        let key = KeyPair::generate_ecdsa_p256();
        let mut cert = unsigned(&key);
        cert.sign(&RustCryptoProvider, Some(&key), HashAlgorithm::Sha256)
            .await
            .unwrap();

        assert_eq!(cert.tbs, cert.encode_tbs().unwrap());
        assert_eq!(cert.signature_algorithm, cert.tbs_certificate.signature);
        assert_eq!(
            cert.signature_algorithm.algorithm_id,
            Some(const_oid::db::rfc5912::ECDSA_WITH_SHA_256)
        );
        assert!(cert.verify(&RustCryptoProvider, None).await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_sign_leaves_certificate_untouched() {
        let key = KeyPair::generate_ed25519();
        let mut cert = unsigned(&key);
        let before = cert.clone();
        let err = cert
            .sign(&RustCryptoProvider, None, HashAlgorithm::Sha256)
            .await
            .unwrap_err();
        assert_eq!(err, PkiKitError::MissingKey);
        assert_eq!(cert, before);
    }

    #[tokio::test]
    async fn test_serialization_reuses_committed_bytes() {
        let key = KeyPair::generate_ed25519();
        let mut cert = unsigned(&key);
        cert.sign(&RustCryptoProvider, Some(&key), HashAlgorithm::Sha256)
            .await
            .unwrap();
        let signed_der = cert.to_der().unwrap();

        cert.tbs_certificate.serial_number = SerialNumber::from(8);
        assert_eq!(cert.to_der().unwrap(), signed_der);
        assert_ne!(cert.to_node_with(true).unwrap().to_der(), signed_der);
    }

    #[tokio::test]
    async fn test_verify_uses_only_committed_bytes() {
        let key = KeyPair::generate_ecdsa_p256();
        let unsigned_cert = unsigned(&key);
        assert!(!unsigned_cert.verify(&RustCryptoProvider, None).await.unwrap());

        let mut cert = unsigned_cert.clone();
        cert.sign(&RustCryptoProvider, Some(&key), HashAlgorithm::Sha256)
            .await
            .unwrap();
        assert!(cert.verify(&RustCryptoProvider, None).await.unwrap());

        cert.tbs.clear();
        assert!(!cert.verify(&RustCryptoProvider, None).await.unwrap());
    }

    #[tokio::test]
    async fn test_public_key_follows_signature_algorithm() {
        let key = KeyPair::generate_ecdsa_p256();
        let mut cert = unsigned(&key);
        assert_eq!(cert.public_key(&RustCryptoProvider).await.unwrap(), key.public_key());

        cert.sign(&RustCryptoProvider, Some(&key), HashAlgorithm::Sha256)
            .await
            .unwrap();
        assert_eq!(cert.public_key(&RustCryptoProvider).await.unwrap(), key.public_key());

        cert.signature_algorithm =
            AlgorithmIdentifier::new(const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION, None);
        assert!(matches!(
            cert.public_key(&RustCryptoProvider).await,
            Err(PkiKitError::ProviderFailure(_))
        ));
    }

    #[tokio::test]
    async fn test_projection_carries_tbs_and_version() {
        let key = KeyPair::generate_ed25519();
        let mut cert = unsigned(&key);
        let json = cert.to_json();
        assert_eq!(json["tbs"].as_str(), Some(""));
        assert_eq!(json["version"].as_u64(), Some(2));

        cert.sign(&RustCryptoProvider, Some(&key), HashAlgorithm::Sha256)
            .await
            .unwrap();
        let json = cert.to_json();
        assert_eq!(json["tbs"].as_str(), Some(hex::encode(&cert.tbs).as_str()));

        cert.tbs_certificate.version = Version::V1;
        assert!(cert.to_json().get("version").is_none());
    }

    #[test]
    fn test_malformed_committed_bytes_fail_encoding() {
        let cert = Certificate {
            tbs: vec![0x30, 0x05, 0x02],
            ..Default::default()
        };
        assert!(matches!(
            cert.to_node(),
            Err(PkiKitError::EncodingError(_))
        ));
    }

    #[tokio::test]
    async fn test_key_hash_defaults_to_sha1() {
        let key = KeyPair::generate_ecdsa_p256();
        let cert = unsigned(&key);
        let sha1 = cert.key_hash(&RustCryptoProvider).await.unwrap();
        let sha256 = cert
            .key_hash_with(&RustCryptoProvider, HashAlgorithm::Sha256)
            .await
            .unwrap();
        assert_eq!(sha1.len(), 20);
        assert_eq!(sha256.len(), 32);
    }
}
