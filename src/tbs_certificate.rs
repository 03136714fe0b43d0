use bon::Builder;
use der::{Tag, TagNumber};
use serde_json::json;

use crate::asn1::Asn1Node;
use crate::error::{PkiKitError, Result};
use crate::schema::{Captures, SchemaNode};
use crate::structure::PkiStructure;
use crate::structures::{
    AlgorithmIdentifier, AlgorithmIdentifierNames, BitString, Extension, Extensions,
    ExtensionsNames, Name, NameNames, SerialNumber, SubjectPublicKeyInfo,
    SubjectPublicKeyInfoNames, Time, TimeNames,
};

/// Certificate format version.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Version {
    #[default]
    V1 = 0,
    V2 = 1,
    V3 = 2,
}

impl TryFrom<u8> for Version {
    type Error = PkiKitError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Version::V1),
            1 => Ok(Version::V2),
            2 => Ok(Version::V3),
            other => Err(PkiKitError::SchemaMismatch(format!(
                "unsupported certificate version {other}"
            ))),
        }
    }
}

/// Capture labels for [`TbsCertificate`].
#[derive(Clone, Debug, Builder)]
pub struct TbsCertificateNames {
    #[builder(default = "tbsCertificate".to_string(), into)]
    pub block_name: String,
    #[builder(default = "tbsCertificate.version".to_string(), into)]
    pub version: String,
    #[builder(default = "tbsCertificate.serialNumber".to_string(), into)]
    pub serial_number: String,
    #[builder(default = AlgorithmIdentifierNames::builder().block_name("tbsCertificate.signature").build())]
    pub signature: AlgorithmIdentifierNames,
    #[builder(default = NameNames::builder().block_name("tbsCertificate.issuer").build())]
    pub issuer: NameNames,
    #[builder(default = "tbsCertificate.validity".to_string(), into)]
    pub validity: String,
    #[builder(default = TimeNames::builder()
        .utc_time_name("tbsCertificate.notBefore")
        .general_time_name("tbsCertificate.notBefore")
        .build())]
    pub not_before: TimeNames,
    #[builder(default = TimeNames::builder()
        .utc_time_name("tbsCertificate.notAfter")
        .general_time_name("tbsCertificate.notAfter")
        .build())]
    pub not_after: TimeNames,
    #[builder(default = NameNames::builder().block_name("tbsCertificate.subject").build())]
    pub subject: NameNames,
    #[builder(default = SubjectPublicKeyInfoNames::builder()
        .block_name("tbsCertificate.subjectPublicKeyInfo")
        .build())]
    pub subject_public_key_info: SubjectPublicKeyInfoNames,
    #[builder(default = "tbsCertificate.issuerUniqueID".to_string(), into)]
    pub issuer_unique_id: String,
    #[builder(default = "tbsCertificate.subjectUniqueID".to_string(), into)]
    pub subject_unique_id: String,
    #[builder(default = ExtensionsNames::builder().block_name("tbsCertificate.extensions").build())]
    pub extensions: ExtensionsNames,
}

impl Default for TbsCertificateNames {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Represents the "To Be Signed" (TBS) portion of an X.509 certificate.
///
/// # Fields
/// * `version` - Format version; `V1` is left out of the encoding.
/// * `serial_number` - The unique identifier for the certificate.
/// * `signature` - The algorithm used to sign the certificate.
/// * `issuer` - The distinguished name of the certificate issuer.
/// * `not_before` - The start of the certificate's validity period.
/// * `not_after` - The end of the certificate's validity period.
/// * `subject` - The distinguished name of the certificate subject.
/// * `subject_public_key_info` - The public key of the certificate subject.
/// * `issuer_unique_id` / `subject_unique_id` - Legacy `[1]`/`[2]` identifiers.
/// * `extensions` - `None` leaves `[3]` out; `Some` of an empty list still encodes it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Builder)]
pub struct TbsCertificate {
    #[builder(default)]
    pub version: Version,
    #[builder(default)]
    pub serial_number: SerialNumber,
    #[builder(default)]
    pub signature: AlgorithmIdentifier,
    #[builder(default)]
    pub issuer: Name,
    #[builder(default)]
    pub not_before: Time,
    #[builder(default)]
    pub not_after: Time,
    #[builder(default)]
    pub subject: Name,
    #[builder(default)]
    pub subject_public_key_info: SubjectPublicKeyInfo,
    pub issuer_unique_id: Option<BitString>,
    pub subject_unique_id: Option<BitString>,
    pub extensions: Option<Vec<Extension>>,
}

impl TbsCertificate {
    /// Whether issuer and subject name the same entity.
    pub fn is_self_issued(&self) -> bool {
        self.issuer == self.subject
    }
}

impl PkiStructure for TbsCertificate {
    type Names = TbsCertificateNames;

    fn schema(names: &Self::Names) -> SchemaNode {
        SchemaNode::sequence(vec![
            SchemaNode::explicit(
                TagNumber::N0,
                SchemaNode::primitive(Tag::Integer).labeled(&names.version),
            )
            .optional(),
            SchemaNode::primitive(Tag::Integer).labeled(&names.serial_number),
            AlgorithmIdentifier::schema(&names.signature),
            Name::schema(&names.issuer),
            SchemaNode::sequence(vec![
                Time::schema(&names.not_before),
                Time::schema(&names.not_after),
            ])
            .labeled(&names.validity),
            Name::schema(&names.subject),
            SubjectPublicKeyInfo::schema(&names.subject_public_key_info),
            SchemaNode::implicit_primitive(TagNumber::N1)
                .optional()
                .labeled(&names.issuer_unique_id),
            SchemaNode::implicit_primitive(TagNumber::N2)
                .optional()
                .labeled(&names.subject_unique_id),
            SchemaNode::explicit(TagNumber::N3, Extensions::schema(&names.extensions)).optional(),
        ])
        .labeled(&names.block_name)
    }

    fn from_captures(captures: &Captures<'_>, names: &Self::Names) -> Result<Self> {
        let version = match captures.get(&names.version) {
            Some(node) => Version::try_from(node.decode_as::<u8>()?)?,
            None => Version::V1,
        };
        let unique_id = |label: &str| {
            captures
                .get(label)
                .and_then(Asn1Node::content)
                .map(BitString::from_content)
                .transpose()
        };
        let extensions = if captures.contains(&names.extensions.block_name) {
            Some(Extensions::from_captures(captures, &names.extensions)?.0)
        } else {
            None
        };

        Ok(Self {
            version,
            serial_number: SerialNumber::from_node(captures.require(&names.serial_number)?)?,
            signature: AlgorithmIdentifier::from_node(
                captures.require(&names.signature.block_name)?,
            )?,
            issuer: Name::from_node(captures.require(&names.issuer.block_name)?)?,
            not_before: Time::from_captures(captures, &names.not_before)?,
            not_after: Time::from_captures(captures, &names.not_after)?,
            subject: Name::from_node(captures.require(&names.subject.block_name)?)?,
            subject_public_key_info: SubjectPublicKeyInfo::from_node(
                captures.require(&names.subject_public_key_info.block_name)?,
            )?,
            issuer_unique_id: unique_id(&names.issuer_unique_id)?,
            subject_unique_id: unique_id(&names.subject_unique_id)?,
            extensions,
        })
    }

    fn to_node(&self) -> Result<Asn1Node> {
        let mut children = Vec::with_capacity(10);
        if self.version != Version::V1 {
            let version = Asn1Node::from_encodable(&(self.version as u8))?;
            children.push(Asn1Node::explicit(TagNumber::N0, version)?);
        }
        children.push(self.serial_number.to_node()?);
        children.push(self.signature.to_node()?);
        children.push(self.issuer.to_node()?);
        children.push(Asn1Node::sequence(vec![
            self.not_before.to_node()?,
            self.not_after.to_node()?,
        ])?);
        children.push(self.subject.to_node()?);
        children.push(self.subject_public_key_info.to_node()?);
        if let Some(id) = &self.issuer_unique_id {
            children.push(Asn1Node::implicit_primitive(TagNumber::N1, id.to_content())?);
        }
        if let Some(id) = &self.subject_unique_id {
            children.push(Asn1Node::implicit_primitive(TagNumber::N2, id.to_content())?);
        }
        if let Some(extensions) = &self.extensions {
            let list = Extensions(extensions.clone()).to_node()?;
            children.push(Asn1Node::explicit(TagNumber::N3, list)?);
        }
        Asn1Node::sequence(children)
    }

    fn to_json(&self) -> serde_json::Value {
        let mut object = json!({
            "serialNumber": self.serial_number.to_json(),
            "signature": self.signature.to_json(),
            "issuer": self.issuer.to_json(),
            "notBefore": self.not_before.to_json(),
            "notAfter": self.not_after.to_json(),
            "subject": self.subject.to_json(),
            "subjectPublicKeyInfo": self.subject_public_key_info.to_json(),
        });
        if self.version != Version::V1 {
            object["version"] = json!(self.version as u8);
        }
        if let Some(id) = &self.issuer_unique_id {
            object["issuerUniqueID"] = id.to_json();
        }
        if let Some(id) = &self.subject_unique_id {
            object["subjectUniqueID"] = id.to_json();
        }
        if let Some(extensions) = &self.extensions {
            object["extensions"] = json!(extensions.iter().map(PkiStructure::to_json).collect::<Vec<_>>());
        }
        object
    }
}
