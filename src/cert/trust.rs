//! CA predicate consumed by chain building.

use super::Certificate;
use super::extensions::{BasicConstraints, ToAndFromX509Extension};

/// Returns `cert` when it may act as a CA, `None` otherwise.
///
/// A `signer` with the same issuer name and serial number as `cert` is the
/// same certificate, which never counts as its own CA. Otherwise the first
/// BasicConstraints extension whose parsed value has the CA flag set decides.
pub fn check_ca<'a>(cert: &'a Certificate, signer: Option<&Certificate>) -> Option<&'a Certificate> {
    if let Some(signer) = signer {
        if signer.issuer() == cert.issuer() && signer.serial_number() == cert.serial_number() {
            return None;
        }
    }

    cert.extensions()
        .iter()
        .filter(|ext| ext.extn_id == BasicConstraints::OID)
        .filter_map(|ext| ext.parsed_value.as_ref())
        .filter_map(|parsed| parsed.basic_constraints())
        .any(|constraints| constraints.is_ca)
        .then_some(cert)
}
