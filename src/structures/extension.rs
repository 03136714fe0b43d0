use bon::Builder;
use const_oid::ObjectIdentifier;
use der::Tag;
use serde_json::json;

use crate::asn1::{Asn1Node, boolean_value};
use crate::cert::extensions::ToAndFromX509Extension;
use crate::cert::factory::{ExtensionValueFactory, ParsedExtension};
use crate::error::Result;
use crate::schema::{Captures, SchemaNode};
use crate::structure::{PkiStructure, block};

/// Capture labels for [`Extension`].
#[derive(Clone, Debug, Builder)]
pub struct ExtensionNames {
    #[builder(default, into)]
    pub block_name: String,
    #[builder(default = "extnID".to_string(), into)]
    pub extn_id: String,
    #[builder(default = "critical".to_string(), into)]
    pub critical: String,
    #[builder(default = "extnValue".to_string(), into)]
    pub extn_value: String,
}

impl Default for ExtensionNames {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// `Extension ::= SEQUENCE { extnID OBJECT IDENTIFIER, critical BOOLEAN DEFAULT FALSE, extnValue OCTET STRING }`
///
/// `parsed_value` is filled from the global [`ExtensionValueFactory`] whenever
/// the extension is decoded or created through [`Extension::new`]. It is a
/// view of `extn_value` and takes no part in equality or encoding.
#[derive(Clone, Debug)]
pub struct Extension {
    pub extn_id: ObjectIdentifier,
    pub critical: bool,
    pub extn_value: Vec<u8>,
    pub parsed_value: Option<ParsedExtension>,
}

impl Extension {
    pub fn new(extn_id: ObjectIdentifier, critical: bool, extn_value: Vec<u8>) -> Self {
        let parsed_value = ExtensionValueFactory::global().decode(&extn_id, &extn_value);
        Self {
            extn_id,
            critical,
            extn_value,
            parsed_value,
        }
    }

    /// Encodes a typed extension value.
    pub fn from_typed<E: ToAndFromX509Extension>(extension: &E, critical: bool) -> Result<Self> {
        Ok(Self::new(E::OID, critical, extension.to_x509_extension_value()?))
    }

    /// Re-runs the global factory, e.g. after a decoder was registered.
    pub fn reparse(&mut self) {
        self.parsed_value = ExtensionValueFactory::global().decode(&self.extn_id, &self.extn_value);
    }
}

impl PartialEq for Extension {
    fn eq(&self, other: &Self) -> bool {
        self.extn_id == other.extn_id
            && self.critical == other.critical
            && self.extn_value == other.extn_value
    }
}

impl Eq for Extension {}

impl PkiStructure for Extension {
    type Names = ExtensionNames;

    fn schema(names: &Self::Names) -> SchemaNode {
        SchemaNode::sequence(vec![
            SchemaNode::primitive(Tag::ObjectIdentifier).labeled(&names.extn_id),
            SchemaNode::primitive(Tag::Boolean).optional().labeled(&names.critical),
            SchemaNode::primitive(Tag::OctetString).labeled(&names.extn_value),
        ])
        .labeled(&names.block_name)
    }

    fn from_captures(captures: &Captures<'_>, names: &Self::Names) -> Result<Self> {
        let extn_id = captures.require(&names.extn_id)?.decode_as()?;
        let critical = captures
            .get(&names.critical)
            .map(boolean_value)
            .transpose()?
            .unwrap_or(false);
        let extn_value = captures
            .require(&names.extn_value)?
            .content()
            .unwrap_or_default()
            .to_vec();
        Ok(Self::new(extn_id, critical, extn_value))
    }

    fn to_node(&self) -> Result<Asn1Node> {
        let mut children = vec![Asn1Node::from_encodable(&self.extn_id)?];
        if self.critical {
            children.push(Asn1Node::from_encodable(&true)?);
        }
        children.push(Asn1Node::primitive(Tag::OctetString, self.extn_value.clone())?);
        Asn1Node::sequence(children)
    }

    fn to_json(&self) -> serde_json::Value {
        let mut object = json!({
            "extnID": self.extn_id.to_string(),
            "extnValue": hex::encode(&self.extn_value),
        });
        if self.critical {
            object["critical"] = json!(true);
        }
        if let Some(parsed) = &self.parsed_value {
            object["parsedValue"] = parsed.to_json();
        }
        object
    }
}

/// Capture labels for [`Extensions`].
#[derive(Clone, Debug, Builder)]
pub struct ExtensionsNames {
    #[builder(default, into)]
    pub block_name: String,
    #[builder(default = "extensions".to_string(), into)]
    pub extensions: String,
}

impl Default for ExtensionsNames {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// `Extensions ::= SEQUENCE SIZE (1..MAX) OF Extension`
///
/// An empty list is accepted on both sides.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Extensions(pub Vec<Extension>);

impl PkiStructure for Extensions {
    type Names = ExtensionsNames;

    fn schema(names: &Self::Names) -> SchemaNode {
        SchemaNode::sequence_of(Extension::schema(&Default::default()).labeled(&names.extensions))
            .labeled(&names.block_name)
    }

    fn from_captures(captures: &Captures<'_>, names: &Self::Names) -> Result<Self> {
        block(captures, &names.block_name)?
            .children()
            .iter()
            .map(Extension::from_node)
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }

    fn to_node(&self) -> Result<Asn1Node> {
        let children = self
            .0
            .iter()
            .map(Extension::to_node)
            .collect::<Result<Vec<_>>>()?;
        Asn1Node::sequence(children)
    }

    fn to_json(&self) -> serde_json::Value {
        json!(self.0.iter().map(PkiStructure::to_json).collect::<Vec<_>>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::extensions::BasicConstraints;

    #[test]
    fn test_known_extension_is_parsed_on_decode() {
        let original = Extension::from_typed(
            &BasicConstraints {
                is_ca: true,
                max_path_length: Some(1),
            },
            true,
        )
        .unwrap();
        let decoded = Extension::from_der(&original.to_der().unwrap()).unwrap();
        assert_eq!(decoded, original);
        assert!(decoded.critical);
        let parsed = decoded.parsed_value.as_ref().and_then(ParsedExtension::basic_constraints);
        assert_eq!(parsed.map(|bc| bc.is_ca), Some(true));
        assert_eq!(parsed.and_then(|bc| bc.max_path_length), Some(1));
    }

    #[test]
    fn test_non_critical_omits_boolean() {
        let extension = Extension::new(ObjectIdentifier::new_unwrap("1.2.3.4"), false, vec![0x05, 0x00]);
        let der = extension.to_der().unwrap();
        // SEQUENCE { OID 1.2.3.4, OCTET STRING { 05 00 } }
        assert_eq!(der, [0x30, 0x09, 0x06, 0x03, 0x2a, 0x03, 0x04, 0x04, 0x02, 0x05, 0x00]);
        assert!(extension.parsed_value.is_none());
    }

    #[test]
    fn test_rejected_payload_is_kept_opaque() {
        let extension = Extension::new(
            const_oid::db::rfc5280::ID_CE_BASIC_CONSTRAINTS,
            false,
            vec![0xde, 0xad],
        );
        assert!(matches!(extension.parsed_value, Some(ParsedExtension::Opaque(_))));
    }

    #[test]
    fn test_extension_list_round_trip() {
        let list = Extensions(vec![
            Extension::new(ObjectIdentifier::new_unwrap("1.2.3.4"), false, vec![0x05, 0x00]),
            Extension::new(ObjectIdentifier::new_unwrap("1.2.3.5"), true, vec![0x01, 0x01, 0xff]),
        ]);
        let decoded = Extensions::from_der(&list.to_der().unwrap()).unwrap();
        assert_eq!(decoded, list);
        assert_eq!(decoded.to_json().as_array().map(Vec::len), Some(2));
    }
}
