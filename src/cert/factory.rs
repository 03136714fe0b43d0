//! Maps extension OIDs to decoders for their `extnValue` payload.
//!
//! [`Extension`](crate::structures::Extension) consults the process-wide
//! [`ExtensionValueFactory::global`] registry whenever it is decoded or built.
//! The registry starts with the RFC 5280 extensions this crate understands
//! and can be extended at runtime; registration is visible to every thread.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use const_oid::ObjectIdentifier;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use serde_json::json;

use super::extensions::{
    AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, KeyUsage, SubjectAltName,
    SubjectKeyIdentifier, ToAndFromX509Extension,
};
use crate::error::Result;

/// A decoded extension value supplied by a custom decoder.
pub trait ExtensionValue: fmt::Debug + Send + Sync + Any {
    fn to_json(&self) -> serde_json::Value;

    fn as_any(&self) -> &dyn Any;
}

/// The decoded form of an extension payload.
#[derive(Debug, Clone)]
pub enum ParsedExtension {
    BasicConstraints(BasicConstraints),
    KeyUsage(KeyUsage),
    ExtendedKeyUsage(ExtendedKeyUsage),
    SubjectAltName(SubjectAltName),
    SubjectKeyIdentifier(SubjectKeyIdentifier),
    AuthorityKeyIdentifier(AuthorityKeyIdentifier),
    Custom(Arc<dyn ExtensionValue>),
    /// The OID is registered but its decoder rejected the payload.
    Opaque(Vec<u8>),
}

impl ParsedExtension {
    pub fn basic_constraints(&self) -> Option<&BasicConstraints> {
        match self {
            ParsedExtension::BasicConstraints(value) => Some(value),
            _ => None,
        }
    }

    pub fn key_usage(&self) -> Option<&KeyUsage> {
        match self {
            ParsedExtension::KeyUsage(value) => Some(value),
            _ => None,
        }
    }

    pub fn extended_key_usage(&self) -> Option<&ExtendedKeyUsage> {
        match self {
            ParsedExtension::ExtendedKeyUsage(value) => Some(value),
            _ => None,
        }
    }

    pub fn subject_alt_name(&self) -> Option<&SubjectAltName> {
        match self {
            ParsedExtension::SubjectAltName(value) => Some(value),
            _ => None,
        }
    }

    pub fn subject_key_identifier(&self) -> Option<&SubjectKeyIdentifier> {
        match self {
            ParsedExtension::SubjectKeyIdentifier(value) => Some(value),
            _ => None,
        }
    }

    pub fn authority_key_identifier(&self) -> Option<&AuthorityKeyIdentifier> {
        match self {
            ParsedExtension::AuthorityKeyIdentifier(value) => Some(value),
            _ => None,
        }
    }

    /// Downcasts a custom value.
    pub fn custom<T: ExtensionValue>(&self) -> Option<&T> {
        match self {
            ParsedExtension::Custom(value) => value.as_any().downcast_ref::<T>(),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ParsedExtension::BasicConstraints(value) => value.to_json(),
            ParsedExtension::KeyUsage(value) => value.to_json(),
            ParsedExtension::ExtendedKeyUsage(value) => value.to_json(),
            ParsedExtension::SubjectAltName(value) => value.to_json(),
            ParsedExtension::SubjectKeyIdentifier(value) => value.to_json(),
            ParsedExtension::AuthorityKeyIdentifier(value) => value.to_json(),
            ParsedExtension::Custom(value) => value.to_json(),
            ParsedExtension::Opaque(bytes) => json!({ "valueHex": hex::encode(bytes) }),
        }
    }
}

/// Decoder for one extension payload.
pub type ExtensionDecoder = Arc<dyn Fn(&[u8]) -> Result<ParsedExtension> + Send + Sync>;

/// Registry of extension decoders keyed by OID.
pub struct ExtensionValueFactory {
    decoders: DashMap<ObjectIdentifier, ExtensionDecoder>,
}

static GLOBAL: Lazy<ExtensionValueFactory> = Lazy::new(ExtensionValueFactory::with_defaults);

impl fmt::Debug for ExtensionValueFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let oids: Vec<String> = self.decoders.iter().map(|entry| entry.key().to_string()).collect();
        f.debug_struct("ExtensionValueFactory")
            .field("decoders", &oids)
            .finish()
    }
}

impl Default for ExtensionValueFactory {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ExtensionValueFactory {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            decoders: DashMap::new(),
        }
    }

    /// A registry preloaded with the built-in extension types.
    pub fn with_defaults() -> Self {
        let factory = Self::new();
        factory.register_typed::<BasicConstraints>(ParsedExtension::BasicConstraints);
        factory.register_typed::<KeyUsage>(ParsedExtension::KeyUsage);
        factory.register_typed::<ExtendedKeyUsage>(ParsedExtension::ExtendedKeyUsage);
        factory.register_typed::<SubjectAltName>(ParsedExtension::SubjectAltName);
        factory.register_typed::<SubjectKeyIdentifier>(ParsedExtension::SubjectKeyIdentifier);
        factory.register_typed::<AuthorityKeyIdentifier>(ParsedExtension::AuthorityKeyIdentifier);
        factory
    }

    /// The process-wide registry used by [`crate::structures::Extension`].
    pub fn global() -> &'static ExtensionValueFactory {
        &GLOBAL
    }

    /// Registers `decoder` for `oid`, replacing any previous one.
    pub fn register<F>(&self, oid: ObjectIdentifier, decoder: F)
    where
        F: Fn(&[u8]) -> Result<ParsedExtension> + Send + Sync + 'static,
    {
        tracing::debug!(%oid, "registering extension decoder");
        self.decoders.insert(oid, Arc::new(decoder));
    }

    /// Registers a [`ToAndFromX509Extension`] type under its own OID.
    pub fn register_typed<E>(&self, wrap: fn(E) -> ParsedExtension)
    where
        E: ToAndFromX509Extension + 'static,
    {
        self.register(E::OID, move |payload| {
            E::from_x509_extension_value(payload).map(wrap)
        });
    }

    pub fn unregister(&self, oid: &ObjectIdentifier) -> bool {
        self.decoders.remove(oid).is_some()
    }

    pub fn is_registered(&self, oid: &ObjectIdentifier) -> bool {
        self.decoders.contains_key(oid)
    }

    /// Decodes `payload` with the decoder registered for `oid`.
    ///
    /// Unregistered OIDs give `None`. A payload the decoder rejects is kept as
    /// [`ParsedExtension::Opaque`].
    pub fn decode(&self, oid: &ObjectIdentifier, payload: &[u8]) -> Option<ParsedExtension> {
        // Release the shard lock before running the decoder.
        let decoder = self.decoders.get(oid).map(|entry| Arc::clone(entry.value()))?;
        match decoder(payload) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                tracing::warn!(%oid, error = %err, "extension payload could not be decoded");
                Some(ParsedExtension::Opaque(payload.to_vec()))
            }
        }
    }
}
