use std::fmt;
use std::str::FromStr;

use bon::Builder;
use const_oid::ObjectIdentifier;
use der::{Decode, Encode, Tag};
use serde_json::json;

use crate::asn1::Asn1Node;
use crate::error::{PkiKitError, Result};
use crate::schema::{Captures, SchemaNode};
use crate::structure::{PkiStructure, block};

pub const COMMON_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");
pub const COUNTRY_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.6");
pub const LOCALITY_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.7");
pub const STATE_OR_PROVINCE_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.8");
pub const ORGANIZATION_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.10");
pub const ORGANIZATIONAL_UNIT_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.11");

/// Capture labels for [`AttributeTypeAndValue`].
#[derive(Clone, Debug, Builder)]
pub struct AttributeTypeAndValueNames {
    #[builder(default, into)]
    pub block_name: String,
    #[builder(default = "type".to_string(), into)]
    pub attr_type: String,
    #[builder(default = "typeValue".to_string(), into)]
    pub value: String,
}

impl Default for AttributeTypeAndValueNames {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// `AttributeTypeAndValue ::= SEQUENCE { type OBJECT IDENTIFIER, value ANY }`
#[derive(Clone, Debug)]
pub struct AttributeTypeAndValue {
    pub attr_type: ObjectIdentifier,
    pub value: Asn1Node,
}

impl AttributeTypeAndValue {
    /// An attribute carrying a UTF8String value.
    pub fn utf8(attr_type: ObjectIdentifier, value: &str) -> Result<Self> {
        Ok(Self {
            attr_type,
            value: Asn1Node::primitive(Tag::Utf8String, value.as_bytes())?,
        })
    }

    /// An attribute carrying a PrintableString value.
    pub fn printable(attr_type: ObjectIdentifier, value: &str) -> Result<Self> {
        der::asn1::PrintableStringRef::new(value)
            .map_err(|e| PkiKitError::InvalidInput(e.to_string()))?;
        Ok(Self {
            attr_type,
            value: Asn1Node::primitive(Tag::PrintableString, value.as_bytes())?,
        })
    }

    /// The value as text, for the directory string types.
    pub fn value_as_string(&self) -> Option<String> {
        let content = self.value.content()?;
        match self.value.tag() {
            Tag::Utf8String
            | Tag::PrintableString
            | Tag::Ia5String
            | Tag::VisibleString
            | Tag::NumericString
            | Tag::TeletexString => String::from_utf8(content.to_vec()).ok(),
            Tag::BmpString => {
                if content.len() % 2 != 0 {
                    return None;
                }
                let units: Vec<u16> = content
                    .chunks_exact(2)
                    .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                    .collect();
                String::from_utf16(&units).ok()
            }
            _ => None,
        }
    }

    /// Case-folded value with surrounding and repeated inner whitespace removed.
    fn prepared_value(&self) -> Option<String> {
        self.value_as_string()
            .map(|value| value.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase())
    }
}

impl PartialEq for AttributeTypeAndValue {
    fn eq(&self, other: &Self) -> bool {
        if self.attr_type != other.attr_type {
            return false;
        }
        match (self.prepared_value(), other.prepared_value()) {
            (Some(left), Some(right)) => left == right,
            _ => self.value.as_der() == other.value.as_der(),
        }
    }
}

impl Eq for AttributeTypeAndValue {}

impl PkiStructure for AttributeTypeAndValue {
    type Names = AttributeTypeAndValueNames;

    fn schema(names: &Self::Names) -> SchemaNode {
        SchemaNode::sequence(vec![
            SchemaNode::primitive(Tag::ObjectIdentifier).labeled(&names.attr_type),
            SchemaNode::any().labeled(&names.value),
        ])
        .labeled(&names.block_name)
    }

    fn from_captures(captures: &Captures<'_>, names: &Self::Names) -> Result<Self> {
        Ok(Self {
            attr_type: captures.require(&names.attr_type)?.decode_as()?,
            value: captures.require(&names.value)?.clone(),
        })
    }

    fn to_node(&self) -> Result<Asn1Node> {
        Asn1Node::sequence(vec![
            Asn1Node::from_encodable(&self.attr_type)?,
            self.value.clone(),
        ])
    }

    fn to_json(&self) -> serde_json::Value {
        let value = match self.value_as_string() {
            Some(text) => json!(text),
            None => json!(self.value.to_hex()),
        };
        json!({ "type": self.attr_type.to_string(), "value": value })
    }
}

/// `RelativeDistinguishedName ::= SET OF AttributeTypeAndValue`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RelativeDistinguishedName(pub Vec<AttributeTypeAndValue>);

/// Capture labels for [`Name`].
#[derive(Clone, Debug, Builder)]
pub struct NameNames {
    #[builder(default, into)]
    pub block_name: String,
    #[builder(default = "RDN".to_string(), into)]
    pub relative_distinguished_name: String,
}

impl Default for NameNames {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// `Name ::= SEQUENCE OF RelativeDistinguishedName`
///
/// Equality follows X.520 matching in a simplified form: the same number of
/// RDNs with the same attribute types in order, string values compared
/// case-insensitively with whitespace collapsed, anything else bytewise.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Name {
    pub rdns: Vec<RelativeDistinguishedName>,
}

impl Name {
    /// Appends a single-valued RDN.
    pub fn push(&mut self, attribute: AttributeTypeAndValue) {
        self.rdns.push(RelativeDistinguishedName(vec![attribute]));
    }

    pub fn attributes(&self) -> impl Iterator<Item = &AttributeTypeAndValue> {
        self.rdns.iter().flat_map(|rdn| rdn.0.iter())
    }

    /// First value of the given attribute type.
    pub fn attribute(&self, attr_type: ObjectIdentifier) -> Option<String> {
        self.attributes()
            .find(|attribute| attribute.attr_type == attr_type)
            .and_then(AttributeTypeAndValue::value_as_string)
    }

    pub fn common_name(&self) -> Option<String> {
        self.attribute(COMMON_NAME)
    }

    pub fn is_empty(&self) -> bool {
        self.rdns.is_empty()
    }

    /// Converts to the `x509-cert` representation.
    pub fn to_x509_name(&self) -> Result<x509_cert::name::Name> {
        Ok(x509_cert::name::Name::from_der(&self.to_der()?)?)
    }

    pub fn from_x509_name(name: &x509_cert::name::Name) -> Result<Self> {
        let der = name
            .to_der()
            .map_err(|e| PkiKitError::EncodingError(e.to_string()))?;
        Self::from_der(&der)
    }
}

impl PkiStructure for Name {
    type Names = NameNames;

    fn schema(names: &Self::Names) -> SchemaNode {
        SchemaNode::sequence_of(
            SchemaNode::set_of(AttributeTypeAndValue::schema(&Default::default()))
                .labeled(&names.relative_distinguished_name),
        )
        .labeled(&names.block_name)
    }

    fn from_captures(captures: &Captures<'_>, names: &Self::Names) -> Result<Self> {
        let rdns = block(captures, &names.block_name)?
            .children()
            .iter()
            .map(|set| {
                set.children()
                    .iter()
                    .map(AttributeTypeAndValue::from_node)
                    .collect::<Result<Vec<_>>>()
                    .map(RelativeDistinguishedName)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rdns })
    }

    fn to_node(&self) -> Result<Asn1Node> {
        let sets = self
            .rdns
            .iter()
            .map(|rdn| {
                let attributes = rdn
                    .0
                    .iter()
                    .map(AttributeTypeAndValue::to_node)
                    .collect::<Result<Vec<_>>>()?;
                Asn1Node::set(attributes)
            })
            .collect::<Result<Vec<_>>>()?;
        Asn1Node::sequence(sets)
    }

    fn to_json(&self) -> serde_json::Value {
        let rdns: Vec<serde_json::Value> = self
            .rdns
            .iter()
            .map(|rdn| json!(rdn.0.iter().map(PkiStructure::to_json).collect::<Vec<_>>()))
            .collect();
        json!({ "typesAndValues": rdns })
    }
}

impl FromStr for Name {
    type Err = PkiKitError;

    /// Parses an RFC 4514 string such as `CN=Test,O=Example`.
    fn from_str(s: &str) -> Result<Self> {
        let rdns = x509_cert::name::RdnSequence::from_str(s)
            .map_err(|e| PkiKitError::InvalidInput(e.to_string()))?;
        Self::from_x509_name(&rdns)
    }
}

const SHORT_KEYS: [(ObjectIdentifier, &str); 6] = [
    (COMMON_NAME, "CN"),
    (COUNTRY_NAME, "C"),
    (LOCALITY_NAME, "L"),
    (STATE_OR_PROVINCE_NAME, "ST"),
    (ORGANIZATION_NAME, "O"),
    (ORGANIZATIONAL_UNIT_NAME, "OU"),
];

/// Short RFC 4514 key for an attribute type, or the dotted OID.
fn attribute_key(attr_type: &ObjectIdentifier) -> String {
    SHORT_KEYS
        .iter()
        .find(|(oid, _)| oid == attr_type)
        .map_or_else(|| attr_type.to_string(), |(_, key)| key.to_string())
}

fn escape_value(value: &str) -> String {
    let last = value.chars().count().saturating_sub(1);
    let mut escaped = String::with_capacity(value.len());
    for (i, c) in value.chars().enumerate() {
        match c {
            ',' | '+' | '"' | '\\' | '<' | '>' | ';' => escaped.push('\\'),
            '#' | ' ' if i == 0 => escaped.push('\\'),
            ' ' if i == last => escaped.push('\\'),
            '\x00'..='\x1f' | '\x7f' => {
                escaped.push_str(&format!("\\{:02x}", c as u8));
                continue;
            }
            _ => {}
        }
        escaped.push(c);
    }
    escaped
}

impl fmt::Display for AttributeTypeAndValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = attribute_key(&self.attr_type);
        match self.value_as_string() {
            Some(text) => write!(f, "{key}={}", escape_value(&text)),
            None => write!(f, "{key}=#{}", self.value.to_hex()),
        }
    }
}

/// RFC 4514 rendering, most significant RDN last. Names that `x509-cert`
/// refuses, such as an RDN repeating an attribute, are rendered locally.
impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Ok(name) = self.to_x509_name() {
            return write!(f, "{name}");
        }
        for (i, rdn) in self.rdns.iter().rev().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            for (j, attribute) in rdn.0.iter().enumerate() {
                if j > 0 {
                    f.write_str("+")?;
                }
                write!(f, "{attribute}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rfc4514_string() {
        let name: Name = "CN=Test,O=Example Org".parse().unwrap();
        assert_eq!(name.rdns.len(), 2);
        assert_eq!(name.common_name().as_deref(), Some("Test"));
        assert_eq!(name.attribute(ORGANIZATION_NAME).as_deref(), Some("Example Org"));
    }

    #[test]
    fn test_equality_ignores_case_and_whitespace() {
        let mut left = Name::default();
        left.push(AttributeTypeAndValue::utf8(COMMON_NAME, "Example   CA").unwrap());
        let mut right = Name::default();
        right.push(AttributeTypeAndValue::printable(COMMON_NAME, " example ca ").unwrap());
        assert_eq!(left, right);

        let mut other = Name::default();
        other.push(AttributeTypeAndValue::utf8(ORGANIZATION_NAME, "Example CA").unwrap());
        assert_ne!(left, other);
    }

    #[test]
    fn test_der_round_trip_keeps_structure() {
        let name: Name = "CN=Round Trip,OU=Unit,C=US".parse().unwrap();
        let decoded = Name::from_der(&name.to_der().unwrap()).unwrap();
        assert_eq!(decoded, name);
        assert_eq!(decoded.to_json(), name.to_json());
    }

    #[test]
    fn test_display_renders_names_x509_cert_refuses() {
        // A SET OF holding the same attribute twice is not valid DER.
        let name = Name {
            rdns: vec![
                RelativeDistinguishedName(vec![
                    AttributeTypeAndValue::utf8(COMMON_NAME, "Zed").unwrap(),
                    AttributeTypeAndValue::utf8(COMMON_NAME, "Zed").unwrap(),
                ]),
                RelativeDistinguishedName(vec![AttributeTypeAndValue {
                    attr_type: ObjectIdentifier::new_unwrap("2.5.4.45"),
                    value: Asn1Node::primitive(Tag::BitString, vec![0x00, 0x01]).unwrap(),
                }]),
                RelativeDistinguishedName(vec![
                    AttributeTypeAndValue::utf8(ORGANIZATION_NAME, "A, B\n").unwrap(),
                ]),
            ],
        };
        assert!(name.to_x509_name().is_err());
        assert_eq!(
            name.to_string(),
            "O=A\\, B\\0a,2.5.4.45=#03020001,CN=Zed+CN=Zed"
        );
    }

    #[test]
    fn test_display_matches_parsed_form() {
        let name: Name = "CN=Test,O=Example Org".parse().unwrap();
        assert_eq!(name.to_string(), "CN=Test,O=Example Org");
    }

    #[test]
    fn test_bmp_string_values_are_readable() {
        let attribute = AttributeTypeAndValue {
            attr_type: COMMON_NAME,
            value: Asn1Node::primitive(Tag::BmpString, vec![0x00, 0x54, 0x00, 0x65]).unwrap(),
        };
        assert_eq!(attribute.value_as_string().as_deref(), Some("Te"));
    }
}
