//! Generic ASN.1 tree produced by the low-level codec.
//!
//! Identifier and length octets are read here so that BER input (long-form
//! lengths of any width, indefinite lengths) is accepted as well as DER. Typed
//! leaf values are still decoded by the [`der`] crate, from a canonical
//! re-encoding of the element. Every node remembers the exact bytes it was
//! read from, which is what makes signature verification over non-canonical
//! (but valid) input possible.

use der::{Decode, Encode, Header, Length, Tag, TagNumber};

use crate::error::{PkiKitError, Result};

/// Content of an [`Asn1Node`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeValue {
    /// Content octets of a primitive encoding.
    Primitive(Vec<u8>),
    /// Child nodes of a constructed encoding, in input order.
    Constructed(Vec<Asn1Node>),
}

/// A parsed (or locally built) ASN.1 element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Asn1Node {
    tag: Tag,
    value: NodeValue,
    /// Identifier, length and content octets exactly as read.
    raw: Vec<u8>,
}

pub(crate) fn encoding_error(err: der::Error) -> PkiKitError {
    PkiKitError::EncodingError(err.to_string())
}

fn truncated(at: usize) -> PkiKitError {
    PkiKitError::DecodingError(format!("input ends inside the element at offset {at}"))
}

/// Value of a BOOLEAN element: one content octet, any non-zero value is TRUE.
pub(crate) fn boolean_value(node: &Asn1Node) -> Result<bool> {
    match node.content() {
        Some([octet]) => Ok(*octet != 0),
        _ => Err(PkiKitError::SchemaMismatch(
            "BOOLEAN must carry exactly one content octet".to_string(),
        )),
    }
}

/// Reads the length octets at `pos`. `None` is the indefinite form.
fn read_length(input: &[u8], pos: usize) -> Result<(Option<usize>, usize)> {
    let first = *input.get(pos).ok_or_else(|| truncated(pos))?;
    match first {
        0x80 => Ok((None, pos + 1)),
        0xff => Err(PkiKitError::DecodingError(format!(
            "reserved length octet 0xff at offset {pos}"
        ))),
        short if short < 0x80 => Ok((Some(usize::from(short)), pos + 1)),
        long => {
            let count = usize::from(long & 0x7f);
            let octets = input
                .get(pos + 1..pos + 1 + count)
                .ok_or_else(|| truncated(pos))?;
            let mut length = 0usize;
            for octet in octets {
                length = length
                    .checked_mul(256)
                    .and_then(|l| l.checked_add(usize::from(*octet)))
                    .ok_or_else(|| {
                        PkiKitError::DecodingError(format!("length at offset {pos} is too large"))
                    })?;
            }
            Ok((Some(length), pos + 1 + count))
        }
    }
}

impl Asn1Node {
    /// Parses a single DER or BER element. Trailing bytes are rejected.
    pub fn from_der(bytes: &[u8]) -> Result<Self> {
        let (node, end) = Self::read(bytes, 0)?;
        if end != bytes.len() {
            return Err(PkiKitError::DecodingError(format!(
                "{} trailing bytes after the element",
                bytes.len() - end
            )));
        }
        Ok(node)
    }

    /// Reads the element starting at `start`, returning it and the offset
    /// just past it.
    fn read(input: &[u8], start: usize) -> Result<(Self, usize)> {
        let identifier = *input.get(start).ok_or_else(|| truncated(start))?;
        if identifier & 0x1f == 0x1f {
            return Err(PkiKitError::DecodingError(format!(
                "multi-octet tag numbers are not supported (offset {start})"
            )));
        }
        let tag = Tag::try_from(identifier)?;
        let (length, mut pos) = read_length(input, start + 1)?;

        let value = match length {
            Some(length) => {
                let content = pos
                    .checked_add(length)
                    .and_then(|end| input.get(pos..end))
                    .ok_or_else(|| truncated(start))?;
                pos += length;
                if tag.is_constructed() {
                    let mut children = Vec::new();
                    let mut cursor = 0;
                    while cursor < content.len() {
                        let (child, next) = Self::read(content, cursor)?;
                        children.push(child);
                        cursor = next;
                    }
                    NodeValue::Constructed(children)
                } else {
                    NodeValue::Primitive(content.to_vec())
                }
            }
            None => {
                if !tag.is_constructed() {
                    return Err(PkiKitError::DecodingError(format!(
                        "indefinite length on primitive {tag} at offset {start}"
                    )));
                }
                let mut children = Vec::new();
                loop {
                    match input.get(pos..pos + 2) {
                        Some([0x00, 0x00]) => {
                            pos += 2;
                            break;
                        }
                        Some(_) => {
                            let (child, next) = Self::read(input, pos)?;
                            children.push(child);
                            pos = next;
                        }
                        None => return Err(truncated(start)),
                    }
                }
                NodeValue::Constructed(children)
            }
        };

        let raw = input
            .get(start..pos)
            .ok_or_else(|| truncated(start))?
            .to_vec();
        Ok((Self { tag, value, raw }, pos))
    }

    /// DER encoding rebuilt from tag and content, ignoring how the input
    /// spelled the lengths.
    fn canonical_der(&self) -> Result<Vec<u8>> {
        let content = match &self.value {
            NodeValue::Primitive(bytes) => bytes.clone(),
            NodeValue::Constructed(children) => {
                let mut content = Vec::new();
                for child in children {
                    content.extend(child.canonical_der()?);
                }
                content
            }
        };
        let mut der = Header::new(self.tag, Length::try_from(content.len())?)?.to_der()?;
        der.extend(content);
        Ok(der)
    }

    fn with_content(tag: Tag, value: NodeValue, content: &[u8]) -> Result<Self> {
        let length = Length::try_from(content.len()).map_err(encoding_error)?;
        let header = Header::new(tag, length).map_err(encoding_error)?;
        let mut raw = header.to_der().map_err(encoding_error)?;
        raw.extend_from_slice(content);
        Ok(Self { tag, value, raw })
    }

    /// Builds a primitive element from its content octets.
    pub fn primitive(tag: Tag, content: impl Into<Vec<u8>>) -> Result<Self> {
        if tag.is_constructed() {
            return Err(PkiKitError::EncodingError(format!(
                "{tag} cannot carry primitive content"
            )));
        }
        let content = content.into();
        Self::with_content(tag, NodeValue::Primitive(content.clone()), &content)
    }

    /// Builds a constructed element around already encoded children.
    pub fn constructed(tag: Tag, children: Vec<Asn1Node>) -> Result<Self> {
        if !tag.is_constructed() {
            return Err(PkiKitError::EncodingError(format!(
                "{tag} cannot carry child elements"
            )));
        }
        let content: Vec<u8> = children.iter().flat_map(|c| c.raw.iter().copied()).collect();
        Self::with_content(tag, NodeValue::Constructed(children), &content)
    }

    pub fn sequence(children: Vec<Asn1Node>) -> Result<Self> {
        Self::constructed(Tag::Sequence, children)
    }

    pub fn set(children: Vec<Asn1Node>) -> Result<Self> {
        Self::constructed(Tag::Set, children)
    }

    /// `[number] EXPLICIT` wrapper around `child`.
    pub fn explicit(number: TagNumber, child: Asn1Node) -> Result<Self> {
        Self::constructed(
            Tag::ContextSpecific {
                constructed: true,
                number,
            },
            vec![child],
        )
    }

    /// `[number] IMPLICIT` primitive element.
    pub fn implicit_primitive(number: TagNumber, content: impl Into<Vec<u8>>) -> Result<Self> {
        Self::primitive(
            Tag::ContextSpecific {
                constructed: false,
                number,
            },
            content,
        )
    }

    /// Encodes a `der` value and re-reads it as a tree.
    pub fn from_encodable<T: Encode>(value: &T) -> Result<Self> {
        let bytes = value.to_der().map_err(encoding_error)?;
        Self::from_der(&bytes)
    }

    /// Decodes this element as a typed `der` value.
    ///
    /// Non-minimal lengths anywhere inside the element are tolerated.
    pub fn decode_as<T>(&self) -> Result<T>
    where
        T: for<'a> Decode<'a>,
    {
        Ok(T::from_der(&self.canonical_der()?)?)
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn value(&self) -> &NodeValue {
        &self.value
    }

    pub fn is_constructed(&self) -> bool {
        matches!(self.value, NodeValue::Constructed(_))
    }

    /// Content octets for primitive elements.
    pub fn content(&self) -> Option<&[u8]> {
        match &self.value {
            NodeValue::Primitive(bytes) => Some(bytes),
            NodeValue::Constructed(_) => None,
        }
    }

    /// Children of a constructed element; empty for primitives.
    pub fn children(&self) -> &[Asn1Node] {
        match &self.value {
            NodeValue::Primitive(_) => &[],
            NodeValue::Constructed(children) => children,
        }
    }

    /// The bytes this element was read from (or encoded to).
    pub fn as_der(&self) -> &[u8] {
        &self.raw
    }

    pub fn to_der(&self) -> Vec<u8> {
        self.raw.clone()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.raw)
    }
}
