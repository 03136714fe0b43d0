//! Declarative layout descriptors and the structural matcher.
//!
//! A [`SchemaNode`] describes what a structure looks like on the wire: tag,
//! primitive or constructed, ordered children, optionality and an optional
//! capture label. [`verify`] walks a parsed [`Asn1Node`] tree against such a
//! description and returns every labeled element it met as [`Captures`].
//!
//! Matching never consumes or mutates the input tree, so running it twice on
//! the same tree yields the same captures.

use std::collections::BTreeMap;

use der::Tag;

use crate::asn1::Asn1Node;
use crate::error::{PkiKitError, Result};

/// Shape of a [`SchemaNode`].
#[derive(Clone, Debug)]
pub enum SchemaKind {
    /// Matches any single element.
    Any,
    /// A primitive element with the given tag.
    Primitive(Tag),
    /// A constructed element whose children match `children` in order.
    Constructed { tag: Tag, children: Vec<SchemaNode> },
    /// A constructed element whose children all match `element`
    /// (`SEQUENCE OF` / `SET OF`); zero children are accepted.
    Repeated { tag: Tag, element: Box<SchemaNode> },
    /// The first alternative that matches wins.
    Choice(Vec<SchemaNode>),
}

/// Layout description of one element.
#[derive(Clone, Debug)]
pub struct SchemaNode {
    pub kind: SchemaKind,
    pub optional: bool,
    pub label: Option<String>,
}

impl SchemaNode {
    fn new(kind: SchemaKind) -> Self {
        Self {
            kind,
            optional: false,
            label: None,
        }
    }

    pub fn any() -> Self {
        Self::new(SchemaKind::Any)
    }

    pub fn primitive(tag: Tag) -> Self {
        Self::new(SchemaKind::Primitive(tag))
    }

    pub fn constructed(tag: Tag, children: Vec<SchemaNode>) -> Self {
        Self::new(SchemaKind::Constructed { tag, children })
    }

    pub fn sequence(children: Vec<SchemaNode>) -> Self {
        Self::constructed(Tag::Sequence, children)
    }

    pub fn sequence_of(element: SchemaNode) -> Self {
        Self::new(SchemaKind::Repeated {
            tag: Tag::Sequence,
            element: Box::new(element),
        })
    }

    pub fn set_of(element: SchemaNode) -> Self {
        Self::new(SchemaKind::Repeated {
            tag: Tag::Set,
            element: Box::new(element),
        })
    }

    pub fn choice(alternatives: Vec<SchemaNode>) -> Self {
        Self::new(SchemaKind::Choice(alternatives))
    }

    /// `[number] EXPLICIT` wrapper around `inner`.
    pub fn explicit(number: der::TagNumber, inner: SchemaNode) -> Self {
        Self::constructed(
            Tag::ContextSpecific {
                constructed: true,
                number,
            },
            vec![inner],
        )
    }

    /// `[number] IMPLICIT` primitive.
    pub fn implicit_primitive(number: der::TagNumber) -> Self {
        Self::primitive(Tag::ContextSpecific {
            constructed: false,
            number,
        })
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Sets the capture label. An empty label leaves the node uncaptured.
    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        let label = label.into();
        self.label = (!label.is_empty()).then_some(label);
        self
    }

    fn describe(&self) -> String {
        let shape = match &self.kind {
            SchemaKind::Any => "ANY".to_string(),
            SchemaKind::Primitive(tag) => tag.to_string(),
            SchemaKind::Constructed { tag, .. } => tag.to_string(),
            SchemaKind::Repeated { tag, .. } => format!("{tag} OF"),
            SchemaKind::Choice(_) => "CHOICE".to_string(),
        };
        match &self.label {
            Some(label) => format!("{shape} ({label})"),
            None => shape,
        }
    }
}

/// Labeled elements collected while matching.
///
/// Labels met more than once (repeated elements, or the same label reused by
/// two embedded structures) keep every element in input order.
#[derive(Clone, Debug)]
pub struct Captures<'a> {
    root: &'a Asn1Node,
    entries: BTreeMap<String, Vec<&'a Asn1Node>>,
}

impl<'a> Captures<'a> {
    fn new(root: &'a Asn1Node) -> Self {
        Self {
            root,
            entries: BTreeMap::new(),
        }
    }

    fn push(&mut self, label: &str, node: &'a Asn1Node) {
        self.entries.entry(label.to_string()).or_default().push(node);
    }

    fn merge(&mut self, other: Captures<'a>) {
        for (label, nodes) in other.entries {
            self.entries.entry(label).or_default().extend(nodes);
        }
    }

    /// The element the schema was matched against.
    pub fn root(&self) -> &'a Asn1Node {
        self.root
    }

    pub fn contains(&self, label: &str) -> bool {
        self.entries.contains_key(label)
    }

    /// First element captured under `label`.
    pub fn get(&self, label: &str) -> Option<&'a Asn1Node> {
        self.entries.get(label).and_then(|nodes| nodes.first().copied())
    }

    /// Every element captured under `label`.
    pub fn get_all(&self, label: &str) -> &[&'a Asn1Node] {
        self.entries.get(label).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Like [`Captures::get`], failing with `SchemaMismatch` when absent.
    pub fn require(&self, label: &str) -> Result<&'a Asn1Node> {
        self.get(label)
            .ok_or_else(|| PkiKitError::SchemaMismatch(format!("missing element '{label}'")))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

/// Matches `node` against `schema`, returning the captured elements.
pub fn verify<'a>(node: &'a Asn1Node, schema: &SchemaNode) -> Result<Captures<'a>> {
    let mut captures = Captures::new(node);
    match_node(node, schema, &mut captures)?;
    Ok(captures)
}

fn mismatch(schema: &SchemaNode, node: &Asn1Node) -> PkiKitError {
    PkiKitError::SchemaMismatch(format!(
        "expected {}, found {}",
        schema.describe(),
        node.tag()
    ))
}

fn match_node<'a>(node: &'a Asn1Node, schema: &SchemaNode, captures: &mut Captures<'a>) -> Result<()> {
    match &schema.kind {
        SchemaKind::Any => {}
        SchemaKind::Primitive(tag) => {
            if node.tag() != *tag || node.is_constructed() {
                return Err(mismatch(schema, node));
            }
        }
        SchemaKind::Constructed { tag, children } => {
            if node.tag() != *tag || !node.is_constructed() {
                return Err(mismatch(schema, node));
            }
            match_fields(node.children(), children, captures)?;
        }
        SchemaKind::Repeated { tag, element } => {
            if node.tag() != *tag || !node.is_constructed() {
                return Err(mismatch(schema, node));
            }
            for child in node.children() {
                match_node(child, element, captures)?;
            }
        }
        SchemaKind::Choice(alternatives) => {
            let matched = alternatives.iter().find_map(|alternative| {
                let mut scratch = Captures::new(captures.root);
                match_node(node, alternative, &mut scratch).ok().map(|()| scratch)
            });
            match matched {
                Some(scratch) => captures.merge(scratch),
                None => return Err(mismatch(schema, node)),
            }
        }
    }

    if let Some(label) = &schema.label {
        captures.push(label, node);
    }
    Ok(())
}

/// Ordered field matching for constructed elements.
fn match_fields<'a>(
    input: &'a [Asn1Node],
    fields: &[SchemaNode],
    captures: &mut Captures<'a>,
) -> Result<()> {
    let mut input = input.iter().peekable();

    for field in fields {
        let Some(&node) = input.peek() else {
            if field.optional {
                continue;
            }
            return Err(PkiKitError::SchemaMismatch(format!(
                "missing {}",
                field.describe()
            )));
        };

        let mut scratch = Captures::new(captures.root);
        match match_node(node, field, &mut scratch) {
            Ok(()) => {
                captures.merge(scratch);
                input.next();
            }
            Err(_) if field.optional => continue,
            Err(err) => return Err(err),
        }
    }

    match input.next() {
        Some(extra) => Err(PkiKitError::SchemaMismatch(format!(
            "unexpected trailing {}",
            extra.tag()
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use der::TagNumber;

    fn node(der: &[u8]) -> Asn1Node {
        Asn1Node::from_der(der).unwrap()
    }

    fn layout() -> SchemaNode {
        SchemaNode::sequence(vec![
            SchemaNode::explicit(
                TagNumber::N0,
                SchemaNode::primitive(Tag::Integer).labeled("version"),
            )
            .optional(),
            SchemaNode::primitive(Tag::Integer).labeled("serial"),
            SchemaNode::primitive(Tag::Boolean).optional().labeled("flag"),
            SchemaNode::primitive(Tag::Null).labeled("null"),
        ])
    }

    #[test]
    fn test_optional_fields_may_be_absent() {
        // SEQUENCE { INTEGER 7, NULL }
        let tree = node(&[0x30, 0x05, 0x02, 0x01, 0x07, 0x05, 0x00]);
        let captures = verify(&tree, &layout()).unwrap();
        assert!(!captures.contains("version"));
        assert!(!captures.contains("flag"));
        assert_eq!(captures.get("serial").unwrap().content(), Some(&[0x07][..]));
        assert!(captures.contains("null"));
    }

    #[test]
    fn test_optional_fields_are_captured_when_present() {
        // SEQUENCE { [0] { INTEGER 2 }, INTEGER 7, BOOLEAN TRUE, NULL }
        let tree = node(&[
            0x30, 0x0d, 0xa0, 0x03, 0x02, 0x01, 0x02, 0x02, 0x01, 0x07, 0x01, 0x01, 0xff, 0x05,
            0x00,
        ]);
        let captures = verify(&tree, &layout()).unwrap();
        assert_eq!(captures.get("version").unwrap().content(), Some(&[0x02][..]));
        assert!(captures.contains("flag"));
    }

    #[test]
    fn test_required_field_mismatch_fails() {
        // SEQUENCE { NULL, NULL }
        let tree = node(&[0x30, 0x04, 0x05, 0x00, 0x05, 0x00]);
        let err = verify(&tree, &layout()).unwrap_err();
        assert!(matches!(err, PkiKitError::SchemaMismatch(_)));
    }

    #[test]
    fn test_trailing_elements_fail() {
        // SEQUENCE { INTEGER 7, NULL, NULL }
        let tree = node(&[0x30, 0x07, 0x02, 0x01, 0x07, 0x05, 0x00, 0x05, 0x00]);
        assert!(verify(&tree, &layout()).is_err());
    }

    #[test]
    fn test_repeated_and_choice() {
        let schema = SchemaNode::sequence_of(
            SchemaNode::choice(vec![
                SchemaNode::primitive(Tag::Integer).labeled("item"),
                SchemaNode::primitive(Tag::Null).labeled("item"),
            ]),
        )
        .labeled("list");
        // SEQUENCE { INTEGER 1, NULL, INTEGER 2 }
        let tree = node(&[0x30, 0x08, 0x02, 0x01, 0x01, 0x05, 0x00, 0x02, 0x01, 0x02]);
        let captures = verify(&tree, &schema).unwrap();
        assert_eq!(captures.get_all("item").len(), 3);
        assert_eq!(captures.get_all("item")[1].tag(), Tag::Null);
        assert_eq!(captures.get("list").unwrap(), &tree);
    }

    #[test]
    fn test_matching_is_repeatable() {
        let tree = node(&[0x30, 0x05, 0x02, 0x01, 0x07, 0x05, 0x00]);
        let schema = layout();
        let first: Vec<String> = verify(&tree, &schema).unwrap().labels().map(str::to_string).collect();
        let second: Vec<String> = verify(&tree, &schema).unwrap().labels().map(str::to_string).collect();
        assert_eq!(first, second);
    }
}
