use der::flagset::FlagSet;

use crate::cert::Certificate;
use crate::cert::extensions::{
    AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, ExtendedKeyUsageOption, KeyUsage,
    KeyUsages, SubjectKeyIdentifier,
};
use crate::cert::params::{CertificationRequestInfo, Validity};
use crate::error::Result;
use crate::key::KeyPair;
use crate::provider::{CryptoProvider, HashAlgorithm};
use crate::structures::{Extension, Name, SerialNumber, Time};
use crate::tbs_certificate::{TbsCertificate, Version};

/// Represents an entity capable of issuing certificates.
///
/// This trait provides methods to retrieve issuer details and issue certificates.
#[allow(async_fn_in_trait)]
pub trait Issuer {
    /// Returns the distinguished name of the issuer.
    fn issuer_name(&self) -> Name;

    /// Returns the signing key of the issuer.
    fn signing_key(&self) -> &KeyPair;

    /// The issuer's own certificate; `None` while self-signing.
    fn issuer_certificate(&self) -> Option<&Certificate>;

    /// Issues a v3 certificate based on the provided certification request information.
    ///
    /// The certificate carries BasicConstraints from the request, key
    /// identifiers computed with SHA-1 over the public keys, and KeyUsage /
    /// ExtendedKeyUsage derived from the requested usages. It is signed with
    /// SHA-256.
    ///
    /// # Arguments
    /// * `provider` - Computes key identifiers and the signature.
    /// * `cert_request` - The certification request information containing details about the certificate to be issued.
    /// * `validity` - The validity period.
    /// * `serial_number` - Serial number of the new certificate.
    async fn issue<P>(
        &self,
        provider: &P,
        cert_request: &CertificationRequestInfo,
        validity: Validity,
        serial_number: SerialNumber,
    ) -> Result<Certificate>
    where
        P: CryptoProvider<PrivateKey = KeyPair>,
    {
        let issuer_key_info = self.signing_key().subject_public_key_info()?;
        let subject_key_info = cert_request.subject_public_key.to_spki()?;

        let authority_key_id = provider
            .digest(HashAlgorithm::Sha1, issuer_key_info.subject_public_key.raw_bytes())
            .await?;
        let subject_key_id = provider
            .digest(HashAlgorithm::Sha1, subject_key_info.subject_public_key.raw_bytes())
            .await?;

        let issuer_cert = self.issuer_certificate();
        let authority_key_identifier = AuthorityKeyIdentifier {
            key_identifier: Some(authority_key_id),
            authority_cert_issuer: issuer_cert.map(|cert| cert.issuer().clone()),
            authority_cert_serial_number: issuer_cert.map(|cert| cert.serial_number().clone()),
        };

        let basic_constraints = BasicConstraints {
            is_ca: cert_request.is_ca,
            max_path_length: None,
        };

        let mut extensions: Vec<Extension> = vec![
            Extension::from_typed(&basic_constraints, true)?,
            Extension::from_typed(&SubjectKeyIdentifier(subject_key_id), false)?,
            Extension::from_typed(&authority_key_identifier, false)?,
        ];

        let mut key_usage_flags: FlagSet<KeyUsages> = FlagSet::empty();

        if cert_request.is_ca {
            key_usage_flags |= KeyUsages::KeyCertSign;
            key_usage_flags |= KeyUsages::CRLSign;
        }

        for usage in &cert_request.usages {
            match usage {
                ExtendedKeyUsageOption::ClientAuth
                | ExtendedKeyUsageOption::ServerAuth
                | ExtendedKeyUsageOption::EmailProtection => {
                    key_usage_flags |= KeyUsages::DigitalSignature;
                    key_usage_flags |= KeyUsages::KeyEncipherment;
                }
                ExtendedKeyUsageOption::CodeSigning
                | ExtendedKeyUsageOption::TimeStamping
                | ExtendedKeyUsageOption::OcspSigning => {
                    key_usage_flags |= KeyUsages::DigitalSignature;
                }
                ExtendedKeyUsageOption::Other(_) => {}
            }
        }

        if !key_usage_flags.is_empty() {
            extensions.push(Extension::from_typed(&KeyUsage(key_usage_flags), true)?);
        }

        if !cert_request.usages.is_empty() {
            let extended_key_usage = ExtendedKeyUsage {
                usage: cert_request.usages.clone(),
            };
            extensions.push(Extension::from_typed(&extended_key_usage, false)?);
        }

        let combined_extensions = cert_request
            .extensions
            .iter()
            .cloned()
            .chain(extensions)
            .collect();

        let tbs_certificate = TbsCertificate::builder()
            .version(Version::V3)
            .serial_number(serial_number)
            .issuer(self.issuer_name())
            .not_before(Time::new(validity.not_before))
            .not_after(Time::new(validity.not_after))
            .subject(cert_request.subject.clone())
            .subject_public_key_info(subject_key_info)
            .extensions(combined_extensions)
            .build();

        let mut certificate = Certificate::builder()
            .tbs_certificate(tbs_certificate)
            .build();
        certificate
            .sign(provider, Some(self.signing_key()), HashAlgorithm::Sha256)
            .await?;
        Ok(certificate)
    }
}
