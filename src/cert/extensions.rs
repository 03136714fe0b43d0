use std::net::IpAddr;

use const_oid::AssociatedOid;
use der::{
    Decode, Encode, Tag,
    asn1::{Ia5String, OctetString},
    oid::ObjectIdentifier,
};
use serde_json::json;
use x509_cert::ext::pkix::name::GeneralName;

use crate::asn1::{Asn1Node, boolean_value};
use crate::error::{PkiKitError, Result};
use crate::schema::{self, SchemaNode};
use crate::structure::PkiStructure;
use crate::structures::{Name, SerialNumber};

/// Trait for converting to and from X.509 extension values.
///
/// This trait provides methods to encode and decode the DER payload carried
/// in the `extnValue` OCTET STRING of an extension.
///
/// # Example
/// ```
/// use pkikit::cert::extensions::{AltName, SubjectAltName, ToAndFromX509Extension};
/// let san = SubjectAltName { names: vec![AltName::Dns("example.com".to_string())] };
/// let encoded = san.to_x509_extension_value().unwrap();
/// let decoded = SubjectAltName::from_x509_extension_value(&encoded).unwrap();
/// assert_eq!(san.names, decoded.names);
/// ```
pub trait ToAndFromX509Extension {
    /// The Object Identifier (OID) for the extension.
    const OID: ObjectIdentifier;

    /// Encodes the extension into a DER-encoded byte vector.
    fn to_x509_extension_value(&self) -> Result<Vec<u8>>;

    /// Decodes the extension from a DER-encoded byte slice.
    fn from_x509_extension_value(extension: &[u8]) -> Result<Self>
    where
        Self: Sized;

    /// Diagnostic projection of the decoded value.
    fn to_json(&self) -> serde_json::Value;
}

/// One entry of a Subject Alternative Name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AltName {
    Dns(String),
    Email(String),
    Uri(String),
    Ip(IpAddr),
    /// Any other `GeneralName`, kept as its DER encoding.
    Other(Vec<u8>),
}

impl AltName {
    fn to_general_name(&self) -> Result<GeneralName> {
        let ia5 = |value: &String| {
            Ia5String::try_from(value.clone()).map_err(|e| PkiKitError::InvalidInput(e.to_string()))
        };
        Ok(match self {
            AltName::Dns(name) => GeneralName::DnsName(ia5(name)?),
            AltName::Email(email) => GeneralName::Rfc822Name(ia5(email)?),
            AltName::Uri(uri) => GeneralName::UniformResourceIdentifier(ia5(uri)?),
            AltName::Ip(IpAddr::V4(ip)) => GeneralName::IpAddress(OctetString::new(ip.octets())?),
            AltName::Ip(IpAddr::V6(ip)) => GeneralName::IpAddress(OctetString::new(ip.octets())?),
            AltName::Other(der) => GeneralName::from_der(der)?,
        })
    }

    fn from_general_name(name: &GeneralName) -> Result<Self> {
        Ok(match name {
            GeneralName::DnsName(dns) => AltName::Dns(dns.to_string()),
            GeneralName::Rfc822Name(email) => AltName::Email(email.to_string()),
            GeneralName::UniformResourceIdentifier(uri) => AltName::Uri(uri.to_string()),
            GeneralName::IpAddress(ip) => match ip.as_bytes().len() {
                4 => {
                    let mut octets = [0u8; 4];
                    octets.copy_from_slice(ip.as_bytes());
                    AltName::Ip(IpAddr::from(octets))
                }
                16 => {
                    let mut octets = [0u8; 16];
                    octets.copy_from_slice(ip.as_bytes());
                    AltName::Ip(IpAddr::from(octets))
                }
                _ => AltName::Other(name.to_der()?),
            },
            other => AltName::Other(other.to_der()?),
        })
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            AltName::Dns(name) => json!({ "type": 2, "value": name }),
            AltName::Email(email) => json!({ "type": 1, "value": email }),
            AltName::Uri(uri) => json!({ "type": 6, "value": uri }),
            AltName::Ip(ip) => json!({ "type": 7, "value": ip.to_string() }),
            AltName::Other(der) => json!({ "valueHex": hex::encode(der) }),
        }
    }
}

/// Represents the Subject Alternative Name (SAN) extension.
///
/// This extension specifies additional identities for the subject of the certificate.
///
/// # Fields
/// * `names` - DNS names, email addresses, URIs and IP addresses, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectAltName {
    pub names: Vec<AltName>,
}

impl SubjectAltName {
    /// A SAN made only of DNS names.
    pub fn dns<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(|name| AltName::Dns(name.into())).collect(),
        }
    }
}

impl ToAndFromX509Extension for SubjectAltName {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::SubjectAltName::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        let san = x509_cert::ext::pkix::SubjectAltName(
            self.names
                .iter()
                .map(AltName::to_general_name)
                .collect::<Result<Vec<_>>>()?,
        );

        Ok(san.to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self> {
        let san = x509_cert::ext::pkix::SubjectAltName::from_der(extension)?;
        let names = san
            .0
            .iter()
            .map(AltName::from_general_name)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { names })
    }

    fn to_json(&self) -> serde_json::Value {
        json!({ "altNames": self.names.iter().map(AltName::to_json).collect::<Vec<_>>() })
    }
}

/// Represents the Basic Constraints extension.
///
/// This extension indicates whether the certificate is a CA certificate and its path length.
///
/// # Fields
/// * `is_ca` - Indicates if the certificate is a CA.
/// * `max_path_length` - The maximum number of intermediate CAs allowed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BasicConstraints {
    pub is_ca: bool,
    pub max_path_length: Option<u32>,
}

impl ToAndFromX509Extension for BasicConstraints {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::BasicConstraints::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        let path_len_constraint = self
            .max_path_length
            .map(u8::try_from)
            .transpose()
            .map_err(|_| PkiKitError::InvalidInput("path length must fit in 0..=255".to_string()))?;
        let bc = x509_cert::ext::pkix::BasicConstraints {
            ca: self.is_ca,
            path_len_constraint,
        };

        Ok(bc.to_der()?)
    }

    /// Read through the schema layer; any non-zero BOOLEAN octet is TRUE.
    fn from_x509_extension_value(der_bytes: &[u8]) -> Result<Self> {
        let node = Asn1Node::from_der(der_bytes)?;
        let layout = SchemaNode::sequence(vec![
            SchemaNode::primitive(Tag::Boolean).optional().labeled("cA"),
            SchemaNode::primitive(Tag::Integer)
                .optional()
                .labeled("pathLenConstraint"),
        ]);
        let captures = schema::verify(&node, &layout)?;
        Ok(Self {
            is_ca: captures
                .get("cA")
                .map(boolean_value)
                .transpose()?
                .unwrap_or(false),
            max_path_length: captures
                .get("pathLenConstraint")
                .map(|node| node.decode_as::<u32>())
                .transpose()?,
        })
    }

    fn to_json(&self) -> serde_json::Value {
        let mut object = json!({ "cA": self.is_ca });
        if let Some(path_length) = self.max_path_length {
            object["pathLenConstraint"] = json!(path_length);
        }
        object
    }
}

pub use der::flagset::FlagSet;
use x509_cert::ext::pkix::KeyUsage as X509KeyUsage;
pub use x509_cert::ext::pkix::KeyUsages;

/// Represents the Key Usage extension.
///
/// This extension defines the purpose of the key contained in the certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyUsage(pub FlagSet<KeyUsages>);

impl ToAndFromX509Extension for KeyUsage {
    const OID: ObjectIdentifier = <X509KeyUsage as AssociatedOid>::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        let ku = X509KeyUsage(self.0);
        Ok(ku.to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self> {
        let ku = X509KeyUsage::from_der(extension)?;
        Ok(Self(ku.0))
    }

    fn to_json(&self) -> serde_json::Value {
        let usages: Vec<String> = self.0.into_iter().map(|usage| format!("{usage:?}")).collect();
        json!({ "usages": usages })
    }
}

/// Represents the Extended Key Usage extension.
///
/// This extension indicates purposes for which the public key may be used.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtendedKeyUsage {
    pub usage: Vec<ExtendedKeyUsageOption>,
}

impl ToAndFromX509Extension for ExtendedKeyUsage {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::ExtendedKeyUsage::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        let oids: Vec<ObjectIdentifier> = self.usage.iter().map(|v| (*v).into()).collect();
        let eku = x509_cert::ext::pkix::ExtendedKeyUsage(oids);
        Ok(eku.to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self> {
        let eku = x509_cert::ext::pkix::ExtendedKeyUsage::from_der(extension)?;
        let usage = eku.0.into_iter().map(ExtendedKeyUsageOption::from).collect();
        Ok(Self { usage })
    }

    fn to_json(&self) -> serde_json::Value {
        let purposes: Vec<String> = self
            .usage
            .iter()
            .map(|usage| ObjectIdentifier::from(*usage).to_string())
            .collect();
        json!({ "keyPurposes": purposes })
    }
}

/// Represents an option for the Extended Key Usage extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtendedKeyUsageOption {
    ServerAuth,
    ClientAuth,
    CodeSigning,
    EmailProtection,
    TimeStamping,
    OcspSigning,
    /// A key purpose without a dedicated variant.
    Other(ObjectIdentifier),
}

impl From<ExtendedKeyUsageOption> for ObjectIdentifier {
    fn from(value: ExtendedKeyUsageOption) -> Self {
        match value {
            ExtendedKeyUsageOption::OcspSigning => const_oid::db::rfc5912::ID_KP_OCSP_SIGNING,
            ExtendedKeyUsageOption::ServerAuth => const_oid::db::rfc5912::ID_KP_SERVER_AUTH,
            ExtendedKeyUsageOption::ClientAuth => const_oid::db::rfc5912::ID_KP_CLIENT_AUTH,
            ExtendedKeyUsageOption::CodeSigning => const_oid::db::rfc5912::ID_KP_CODE_SIGNING,
            ExtendedKeyUsageOption::EmailProtection => {
                const_oid::db::rfc5912::ID_KP_EMAIL_PROTECTION
            }
            ExtendedKeyUsageOption::TimeStamping => const_oid::db::rfc5912::ID_KP_TIME_STAMPING,
            ExtendedKeyUsageOption::Other(oid) => oid,
        }
    }
}

impl From<ObjectIdentifier> for ExtendedKeyUsageOption {
    fn from(value: ObjectIdentifier) -> Self {
        match value {
            const_oid::db::rfc5912::ID_KP_OCSP_SIGNING => ExtendedKeyUsageOption::OcspSigning,
            const_oid::db::rfc5912::ID_KP_SERVER_AUTH => ExtendedKeyUsageOption::ServerAuth,
            const_oid::db::rfc5912::ID_KP_CLIENT_AUTH => ExtendedKeyUsageOption::ClientAuth,
            const_oid::db::rfc5912::ID_KP_CODE_SIGNING => ExtendedKeyUsageOption::CodeSigning,
            const_oid::db::rfc5912::ID_KP_EMAIL_PROTECTION => {
                ExtendedKeyUsageOption::EmailProtection
            }
            const_oid::db::rfc5912::ID_KP_TIME_STAMPING => ExtendedKeyUsageOption::TimeStamping,
            other => ExtendedKeyUsageOption::Other(other),
        }
    }
}

/// Represents the Subject Key Identifier extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectKeyIdentifier(pub Vec<u8>);

impl ToAndFromX509Extension for SubjectKeyIdentifier {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::SubjectKeyIdentifier::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        let ski = x509_cert::ext::pkix::SubjectKeyIdentifier(OctetString::new(self.0.as_slice())?);
        Ok(ski.to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self> {
        let ski = x509_cert::ext::pkix::SubjectKeyIdentifier::from_der(extension)?;
        Ok(Self(ski.0.as_bytes().to_vec()))
    }

    fn to_json(&self) -> serde_json::Value {
        json!({ "keyIdentifier": hex::encode(&self.0) })
    }
}

/// Represents the Authority Key Identifier (AKI) extension.
///
/// This extension identifies the public key corresponding to the private key used to sign the certificate.
///
/// # Fields
/// * `key_identifier` - The key identifier.
/// * `authority_cert_issuer` - The issuer's distinguished name.
/// * `authority_cert_serial_number` - The issuer's certificate serial number.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorityKeyIdentifier {
    pub key_identifier: Option<Vec<u8>>,
    pub authority_cert_issuer: Option<Name>,
    pub authority_cert_serial_number: Option<SerialNumber>,
}

impl ToAndFromX509Extension for AuthorityKeyIdentifier {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::AuthorityKeyIdentifier::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        let authority_cert_issuer = self
            .authority_cert_issuer
            .as_ref()
            .map(|name| name.to_x509_name().map(|dn| vec![GeneralName::DirectoryName(dn)]))
            .transpose()?;

        let aki = x509_cert::ext::pkix::AuthorityKeyIdentifier {
            key_identifier: self
                .key_identifier
                .as_deref()
                .map(OctetString::new)
                .transpose()?,
            authority_cert_issuer,
            authority_cert_serial_number: self
                .authority_cert_serial_number
                .as_ref()
                .map(|serial| x509_cert::serial_number::SerialNumber::new(serial.as_bytes()))
                .transpose()?,
        };

        Ok(aki.to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self> {
        let aki = x509_cert::ext::pkix::AuthorityKeyIdentifier::from_der(extension)?;

        let authority_cert_issuer = aki
            .authority_cert_issuer
            .as_ref()
            .and_then(|names| {
                names.iter().find_map(|name| match name {
                    GeneralName::DirectoryName(dn) => Some(Name::from_x509_name(dn)),
                    _ => None,
                })
            })
            .transpose()?;

        Ok(Self {
            key_identifier: aki.key_identifier.map(|id| id.as_bytes().to_vec()),
            authority_cert_issuer,
            authority_cert_serial_number: aki
                .authority_cert_serial_number
                .map(|sn| SerialNumber::new(sn.as_bytes()))
                .transpose()?,
        })
    }

    fn to_json(&self) -> serde_json::Value {
        let mut object = json!({});
        if let Some(key_identifier) = &self.key_identifier {
            object["keyIdentifier"] = json!(hex::encode(key_identifier));
        }
        if let Some(issuer) = &self.authority_cert_issuer {
            object["authorityCertIssuer"] = issuer.to_json();
        }
        if let Some(serial) = &self.authority_cert_serial_number {
            object["authorityCertSerialNumber"] = serial.to_json();
        }
        object
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_constraints_encoding_decoding() {
        let original = BasicConstraints {
            is_ca: true,
            max_path_length: Some(3),
        };
        let encoded = original.to_x509_extension_value().unwrap();
        let decoded = BasicConstraints::from_x509_extension_value(&encoded).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_basic_constraints_accepts_ber_true() {
        // SEQUENCE { BOOLEAN 0x01 }
        let decoded = BasicConstraints::from_x509_extension_value(&[0x30, 0x03, 0x01, 0x01, 0x01]).unwrap();
        assert!(decoded.is_ca);
        assert_eq!(decoded.max_path_length, None);

        // SEQUENCE { INTEGER 2 } with the CA flag left to its default
        let decoded = BasicConstraints::from_x509_extension_value(&[0x30, 0x03, 0x02, 0x01, 0x02]).unwrap();
        assert!(!decoded.is_ca);
        assert_eq!(decoded.max_path_length, Some(2));

        let empty = BasicConstraints::from_x509_extension_value(&[0x30, 0x00]).unwrap();
        assert_eq!(empty, BasicConstraints::default());
        assert!(BasicConstraints::from_x509_extension_value(&[0x04, 0x00]).is_err());
    }

    #[test]
    fn test_basic_constraints_path_length_out_of_range() {
        let original = BasicConstraints {
            is_ca: true,
            max_path_length: Some(256),
        };
        assert!(matches!(
            original.to_x509_extension_value(),
            Err(PkiKitError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_authority_key_identifier_encoding_decoding() {
        let original = AuthorityKeyIdentifier {
            key_identifier: Some(vec![1, 2, 3, 4, 5]),
            authority_cert_issuer: Some("CN=Test CA,O=Test Org,C=US".parse().unwrap()),
            authority_cert_serial_number: Some(SerialNumber::new(vec![6, 7, 8, 9, 10]).unwrap()),
        };
        let encoded = original.to_x509_extension_value().unwrap();
        let decoded = AuthorityKeyIdentifier::from_x509_extension_value(&encoded).unwrap();
        assert_eq!(original.key_identifier, decoded.key_identifier);
        assert_eq!(
            decoded
                .authority_cert_issuer
                .as_ref()
                .and_then(Name::common_name)
                .as_deref(),
            Some("Test CA")
        );
        assert_eq!(
            original.authority_cert_serial_number,
            decoded.authority_cert_serial_number
        );
    }

    #[test]
    fn test_authority_key_identifier_with_key_only() {
        let original = AuthorityKeyIdentifier {
            key_identifier: Some(vec![0xaa; 20]),
            ..Default::default()
        };
        let encoded = original.to_x509_extension_value().unwrap();
        let decoded = AuthorityKeyIdentifier::from_x509_extension_value(&encoded).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_key_usage_encoding_decoding() {
        let original = KeyUsage(KeyUsages::DigitalSignature | KeyUsages::KeyEncipherment);
        let encoded = original.to_x509_extension_value().unwrap();
        let decoded = KeyUsage::from_x509_extension_value(&encoded).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_extended_key_usage_encoding_decoding() {
        let custom = ObjectIdentifier::new_unwrap("1.3.6.1.4.1.311.10.3.4");
        let original = ExtendedKeyUsage {
            usage: vec![
                ExtendedKeyUsageOption::ServerAuth,
                ExtendedKeyUsageOption::ClientAuth,
                ExtendedKeyUsageOption::Other(custom),
            ],
        };
        let encoded = original.to_x509_extension_value().unwrap();
        let decoded = ExtendedKeyUsage::from_x509_extension_value(&encoded).unwrap();
        assert_eq!(original.usage, decoded.usage);
    }

    #[test]
    fn test_subject_alt_name_mixed_entries() {
        let original = SubjectAltName {
            names: vec![
                AltName::Dns("example.com".to_string()),
                AltName::Email("admin@example.com".to_string()),
                AltName::Uri("https://example.com/".to_string()),
                AltName::Ip("127.0.0.1".parse().unwrap()),
                AltName::Ip("::1".parse().unwrap()),
            ],
        };
        let encoded = original.to_x509_extension_value().unwrap();
        let decoded = SubjectAltName::from_x509_extension_value(&encoded).unwrap();
        assert_eq!(original, decoded);
        assert_eq!(decoded.to_json()["altNames"][0]["value"], "example.com");
    }

    #[test]
    fn test_subject_key_identifier_encoding_decoding() {
        let original = SubjectKeyIdentifier(vec![0x01, 0x02, 0x03]);
        let encoded = original.to_x509_extension_value().unwrap();
        assert_eq!(encoded, vec![0x04, 0x03, 0x01, 0x02, 0x03]);
        assert_eq!(
            SubjectKeyIdentifier::from_x509_extension_value(&encoded).unwrap(),
            original
        );
    }
}
