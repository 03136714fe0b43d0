use der::Tag;
use serde_json::json;

use crate::asn1::Asn1Node;
use crate::error::{PkiKitError, Result};

/// Content octets of an ASN.1 INTEGER used as a certificate serial number.
///
/// The bytes are kept exactly as decoded so that equality and re-encoding
/// never depend on a numeric round trip.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SerialNumber(Vec<u8>);

impl Default for SerialNumber {
    fn default() -> Self {
        Self(vec![0])
    }
}

impl SerialNumber {
    /// Wraps two's complement INTEGER content octets.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(PkiKitError::InvalidInput(
                "serial number must have at least one octet".to_string(),
            ));
        }
        Ok(Self(bytes))
    }

    /// A positive 128-bit random serial number.
    pub fn random() -> Self {
        let mut bytes: [u8; 16] = rand::random();
        bytes[0] &= 0x7f;
        if bytes[0] == 0 {
            bytes[0] = 0x01;
        }
        Self(bytes.to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn from_node(node: &Asn1Node) -> Result<Self> {
        match node.content() {
            Some(content) if node.tag() == Tag::Integer && !content.is_empty() => {
                Ok(Self(content.to_vec()))
            }
            _ => Err(PkiKitError::SchemaMismatch(format!(
                "expected a non-empty INTEGER, found {}",
                node.tag()
            ))),
        }
    }

    pub fn to_node(&self) -> Result<Asn1Node> {
        Asn1Node::primitive(Tag::Integer, self.0.clone())
    }

    pub fn to_json(&self) -> serde_json::Value {
        json!({ "valueHex": hex::encode(&self.0) })
    }
}

impl From<u64> for SerialNumber {
    fn from(value: u64) -> Self {
        let bytes = value.to_be_bytes();
        let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len() - 1);
        let mut content = Vec::with_capacity(9);
        if bytes[first] & 0x80 != 0 {
            content.push(0);
        }
        content.extend_from_slice(&bytes[first..]);
        Self(content)
    }
}

/// An ASN.1 BIT STRING: the count of unused trailing bits plus the octets.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BitString {
    pub unused_bits: u8,
    pub bytes: Vec<u8>,
}

impl BitString {
    /// A bit string made of whole octets.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            unused_bits: 0,
            bytes: bytes.into(),
        }
    }

    pub fn raw_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Parses BIT STRING content octets (leading unused-bits octet included).
    pub fn from_content(content: &[u8]) -> Result<Self> {
        let (&unused_bits, bytes) = content.split_first().ok_or_else(|| {
            PkiKitError::SchemaMismatch("BIT STRING without unused-bits octet".to_string())
        })?;
        if unused_bits > 7 || (bytes.is_empty() && unused_bits != 0) {
            return Err(PkiKitError::SchemaMismatch(format!(
                "invalid BIT STRING unused-bits count {unused_bits}"
            )));
        }
        Ok(Self {
            unused_bits,
            bytes: bytes.to_vec(),
        })
    }

    /// Content octets as they appear on the wire.
    pub fn to_content(&self) -> Vec<u8> {
        let mut content = Vec::with_capacity(self.bytes.len() + 1);
        content.push(self.unused_bits);
        content.extend_from_slice(&self.bytes);
        content
    }

    /// Reads a primitive element; the tag is checked by the caller's schema.
    pub fn from_node(node: &Asn1Node) -> Result<Self> {
        let content = node.content().ok_or_else(|| {
            PkiKitError::SchemaMismatch(format!("expected primitive BIT STRING, found {}", node.tag()))
        })?;
        Self::from_content(content)
    }

    pub fn to_node(&self) -> Result<Asn1Node> {
        Asn1Node::primitive(Tag::BitString, self.to_content())
    }

    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "unusedBits": self.unused_bits,
            "valueHex": hex::encode(&self.bytes),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_number_from_u64_is_minimal_and_positive() {
        assert_eq!(SerialNumber::from(0).as_bytes(), &[0x00]);
        assert_eq!(SerialNumber::from(1).as_bytes(), &[0x01]);
        assert_eq!(SerialNumber::from(0x80).as_bytes(), &[0x00, 0x80]);
        assert_eq!(SerialNumber::from(0x0102).as_bytes(), &[0x01, 0x02]);
    }

    #[test]
    fn test_random_serial_is_positive() {
        for _ in 0..16 {
            let serial = SerialNumber::random();
            assert_eq!(serial.as_bytes().len(), 16);
            assert_eq!(serial.as_bytes()[0] & 0x80, 0);
            assert_ne!(serial.as_bytes()[0], 0);
        }
    }

    #[test]
    fn test_bit_string_rejects_bad_unused_bits() {
        assert!(BitString::from_content(&[]).is_err());
        assert!(BitString::from_content(&[8, 0xff]).is_err());
        assert!(BitString::from_content(&[1]).is_err());
        let bits = BitString::from_content(&[3, 0xf8]).unwrap();
        assert_eq!(bits.unused_bits, 3);
        assert_eq!(bits.to_content(), vec![3, 0xf8]);
    }
}
