//! The contract every PKI structure implements.

use crate::asn1::Asn1Node;
use crate::error::Result;
use crate::schema::{self, Captures, SchemaNode};

/// A typed entity mapped onto an ASN.1 layout.
///
/// * `Default::default()` gives the canonical zero-value instance.
/// * [`PkiStructure::from_node`] matches a parsed tree against
///   [`PkiStructure::schema`] and maps the captures onto typed fields. A
///   mismatch is returned as an error, never defaulted.
/// * [`PkiStructure::to_node`] encodes strictly from current field values.
/// * [`PkiStructure::to_json`] projects the entity for diagnostics, with
///   binary fields as lowercase hex.
pub trait PkiStructure: Sized {
    /// Capture labels used when this layout is embedded into a parent.
    type Names: Default;

    /// Layout of this structure under the given labels.
    fn schema(names: &Self::Names) -> SchemaNode;

    /// Builds the entity from a successful match made with `names`.
    fn from_captures(captures: &Captures<'_>, names: &Self::Names) -> Result<Self>;

    fn to_node(&self) -> Result<Asn1Node>;

    fn to_json(&self) -> serde_json::Value;

    fn from_node(node: &Asn1Node) -> Result<Self> {
        let names = Self::Names::default();
        let captures = schema::verify(node, &Self::schema(&names))?;
        Self::from_captures(&captures, &names)
    }

    fn from_der(der: &[u8]) -> Result<Self> {
        Self::from_node(&Asn1Node::from_der(der)?)
    }

    fn to_der(&self) -> Result<Vec<u8>> {
        Ok(self.to_node()?.to_der())
    }
}

/// The element a structure was matched on: the root when `block_name` is
/// empty, otherwise the element captured under it.
pub(crate) fn block<'a>(captures: &Captures<'a>, block_name: &str) -> Result<&'a Asn1Node> {
    match block_name {
        "" => Ok(captures.root()),
        label => captures.require(label),
    }
}
