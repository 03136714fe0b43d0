use bon::Builder;
use const_oid::ObjectIdentifier;
use der::Tag;
use serde_json::json;

use crate::asn1::Asn1Node;
use crate::error::{PkiKitError, Result};
use crate::schema::{Captures, SchemaNode};
use crate::structure::PkiStructure;

/// Capture labels for [`AlgorithmIdentifier`].
#[derive(Clone, Debug, Builder)]
pub struct AlgorithmIdentifierNames {
    #[builder(default, into)]
    pub block_name: String,
    #[builder(default = "algorithmId".to_string(), into)]
    pub algorithm_identifier: String,
    #[builder(default = "algorithmParams".to_string(), into)]
    pub algorithm_params: String,
}

impl Default for AlgorithmIdentifierNames {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// `AlgorithmIdentifier ::= SEQUENCE { algorithm OBJECT IDENTIFIER, parameters ANY OPTIONAL }`
///
/// The default value has no algorithm set; encoding it fails.
#[derive(Clone, Debug, Default, PartialEq, Eq, Builder)]
pub struct AlgorithmIdentifier {
    pub algorithm_id: Option<ObjectIdentifier>,
    pub algorithm_params: Option<Asn1Node>,
}

impl AlgorithmIdentifier {
    pub fn new(algorithm_id: ObjectIdentifier, algorithm_params: Option<Asn1Node>) -> Self {
        Self {
            algorithm_id: Some(algorithm_id),
            algorithm_params,
        }
    }

    /// Parameters interpreted as an OBJECT IDENTIFIER (e.g. an EC named curve).
    pub fn parameters_oid(&self) -> Option<ObjectIdentifier> {
        self.algorithm_params
            .as_ref()
            .filter(|params| params.tag() == Tag::ObjectIdentifier)
            .and_then(|params| params.decode_as().ok())
    }
}

impl PkiStructure for AlgorithmIdentifier {
    type Names = AlgorithmIdentifierNames;

    fn schema(names: &Self::Names) -> SchemaNode {
        SchemaNode::sequence(vec![
            SchemaNode::primitive(Tag::ObjectIdentifier).labeled(&names.algorithm_identifier),
            SchemaNode::any().optional().labeled(&names.algorithm_params),
        ])
        .labeled(&names.block_name)
    }

    fn from_captures(captures: &Captures<'_>, names: &Self::Names) -> Result<Self> {
        let algorithm_id = captures
            .require(&names.algorithm_identifier)?
            .decode_as::<ObjectIdentifier>()?;
        Ok(Self {
            algorithm_id: Some(algorithm_id),
            algorithm_params: captures.get(&names.algorithm_params).cloned(),
        })
    }

    fn to_node(&self) -> Result<Asn1Node> {
        let algorithm_id = self.algorithm_id.ok_or_else(|| {
            PkiKitError::EncodingError("algorithm identifier is not set".to_string())
        })?;
        let mut children = vec![Asn1Node::from_encodable(&algorithm_id)?];
        children.extend(self.algorithm_params.clone());
        Asn1Node::sequence(children)
    }

    fn to_json(&self) -> serde_json::Value {
        let mut object = json!({
            "algorithmId": self.algorithm_id.map(|oid| oid.to_string()).unwrap_or_default(),
        });
        if let Some(params) = &self.algorithm_params {
            object["algorithmParams"] = json!(params.to_hex());
        }
        object
    }
}
