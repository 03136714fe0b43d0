use bon::Builder;
use der::Tag;
use serde_json::json;

use crate::asn1::Asn1Node;
use crate::error::Result;
use crate::schema::{Captures, SchemaNode};
use crate::structure::PkiStructure;
use crate::structures::{AlgorithmIdentifier, AlgorithmIdentifierNames, BitString};

/// Capture labels for [`SubjectPublicKeyInfo`].
#[derive(Clone, Debug, Builder)]
pub struct SubjectPublicKeyInfoNames {
    #[builder(default, into)]
    pub block_name: String,
    #[builder(default = AlgorithmIdentifierNames::builder().block_name("algorithm").build())]
    pub algorithm: AlgorithmIdentifierNames,
    #[builder(default = "subjectPublicKey".to_string(), into)]
    pub subject_public_key: String,
}

impl Default for SubjectPublicKeyInfoNames {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// `SubjectPublicKeyInfo ::= SEQUENCE { algorithm AlgorithmIdentifier, subjectPublicKey BIT STRING }`
///
/// Nested structures are captured as whole blocks and decoded on their own, so
/// their inner labels never collide with the parent's.
#[derive(Clone, Debug, Default, PartialEq, Eq, Builder)]
pub struct SubjectPublicKeyInfo {
    pub algorithm: AlgorithmIdentifier,
    pub subject_public_key: BitString,
}

impl PkiStructure for SubjectPublicKeyInfo {
    type Names = SubjectPublicKeyInfoNames;

    fn schema(names: &Self::Names) -> SchemaNode {
        SchemaNode::sequence(vec![
            AlgorithmIdentifier::schema(&names.algorithm),
            SchemaNode::primitive(Tag::BitString).labeled(&names.subject_public_key),
        ])
        .labeled(&names.block_name)
    }

    fn from_captures(captures: &Captures<'_>, names: &Self::Names) -> Result<Self> {
        Ok(Self {
            algorithm: AlgorithmIdentifier::from_node(
                captures.require(&names.algorithm.block_name)?,
            )?,
            subject_public_key: BitString::from_node(
                captures.require(&names.subject_public_key)?,
            )?,
        })
    }

    fn to_node(&self) -> Result<Asn1Node> {
        Asn1Node::sequence(vec![
            self.algorithm.to_node()?,
            self.subject_public_key.to_node()?,
        ])
    }

    fn to_json(&self) -> serde_json::Value {
        json!({
            "algorithm": self.algorithm.to_json(),
            "subjectPublicKey": self.subject_public_key.to_json(),
        })
    }
}
