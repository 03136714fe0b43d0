//! Entities of the X.509 certificate layout that are shared between
//! certificates and other PKI structures.

mod algorithm_identifier;
mod extension;
mod name;
mod primitives;
mod public_key_info;
mod time;

pub use algorithm_identifier::{AlgorithmIdentifier, AlgorithmIdentifierNames};
pub use extension::{Extension, ExtensionNames, Extensions, ExtensionsNames};
pub use name::{
    AttributeTypeAndValue, AttributeTypeAndValueNames, COMMON_NAME, COUNTRY_NAME, LOCALITY_NAME,
    Name, NameNames, ORGANIZATION_NAME, ORGANIZATIONAL_UNIT_NAME, RelativeDistinguishedName,
    STATE_OR_PROVINCE_NAME,
};
pub use primitives::{BitString, SerialNumber};
pub use public_key_info::{SubjectPublicKeyInfo, SubjectPublicKeyInfoNames};
pub use self::time::{Time, TimeKind, TimeNames};
