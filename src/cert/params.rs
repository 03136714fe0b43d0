use bon::Builder;
use time::Duration;
use time::OffsetDateTime;

pub use crate::cert::extensions::ExtendedKeyUsage;
pub use crate::cert::extensions::ExtendedKeyUsageOption;
use crate::error::Result;
use crate::key::PublicKey;
use crate::structures::{
    AttributeTypeAndValue, COMMON_NAME, COUNTRY_NAME, Extension, LOCALITY_NAME, Name,
    ORGANIZATION_NAME, ORGANIZATIONAL_UNIT_NAME, STATE_OR_PROVINCE_NAME,
};

/// Parameters for building an X.509 certificate.
///
/// This struct contains the subject, public key, and optional extensions for the certificate.
///
/// # Fields
/// * `subject` - The distinguished name of the certificate subject.
/// * `subject_public_key` - The public key of the certificate subject.
/// * `usages` - A list of extended key usage options.
/// * `is_ca` - Indicates if the certificate is a CA.
/// * `extensions` - Additional X.509 extensions, placed before the generated ones.
#[derive(Clone, Debug, Builder)]
pub struct CertificationRequestInfo {
    pub subject: Name,
    pub subject_public_key: PublicKey,
    #[builder(default)]
    pub usages: Vec<ExtendedKeyUsageOption>,
    #[builder(default)]
    pub is_ca: bool,
    #[builder(default)]
    pub extensions: Vec<Extension>,
}

/// Distinguished name parameters for building an X.509 certificate.
///
/// # Fields
/// * `common_name` - The common name (CN).
/// * `country` - The country (C).
/// * `state` - The state or province (ST).
/// * `locality` - The locality or city (L).
/// * `organization` - The organization (O).
/// * `organization_unit` - The organizational unit (OU).
#[derive(Clone, Debug, Builder, Default)]
pub struct DistinguishedName {
    #[builder(into)]
    pub common_name: String,
    #[builder(into)]
    pub country: Option<String>,
    #[builder(into)]
    pub state: Option<String>,
    #[builder(into)]
    pub locality: Option<String>,
    #[builder(into)]
    pub organization: Option<String>,
    #[builder(into)]
    pub organization_unit: Option<String>,
}

impl DistinguishedName {
    /// Builds a [`Name`] with one RDN per present attribute, from country
    /// down to common name. The country is a PrintableString, everything else
    /// UTF8String.
    pub fn to_name(&self) -> Result<Name> {
        let mut name = Name::default();
        if let Some(country) = &self.country {
            name.push(AttributeTypeAndValue::printable(COUNTRY_NAME, country)?);
        }
        let attributes = [
            (STATE_OR_PROVINCE_NAME, &self.state),
            (LOCALITY_NAME, &self.locality),
            (ORGANIZATION_NAME, &self.organization),
            (ORGANIZATIONAL_UNIT_NAME, &self.organization_unit),
        ];
        for (attr_type, value) in attributes {
            if let Some(value) = value {
                name.push(AttributeTypeAndValue::utf8(attr_type, value)?);
            }
        }
        name.push(AttributeTypeAndValue::utf8(COMMON_NAME, &self.common_name)?);
        Ok(name)
    }

    /// Reads the known attributes back out of a [`Name`].
    pub fn from_name(name: &Name) -> Self {
        Self {
            common_name: name.common_name().unwrap_or_default(),
            country: name.attribute(COUNTRY_NAME),
            state: name.attribute(STATE_OR_PROVINCE_NAME),
            locality: name.attribute(LOCALITY_NAME),
            organization: name.attribute(ORGANIZATION_NAME),
            organization_unit: name.attribute(ORGANIZATIONAL_UNIT_NAME),
        }
    }
}

/// Certificate validity period.
///
/// This struct represents the `notBefore` and `notAfter` fields in a certificate.
///
/// # Fields
/// * `not_before` - The start of the validity period.
/// * `not_after` - The end of the validity period.
#[derive(Clone, Debug)]
pub struct Validity {
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
}

impl Validity {
    /// Creates a validity period starting now for the given number of days.
    ///
    /// # Arguments
    /// * `days` - The number of days for the validity period.
    ///
    /// # Returns
    /// A `Validity` object.
    pub fn for_days(days: i64) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            not_before: now,
            not_after: now + Duration::days(days),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distinguished_name_order_and_types() {
        let dn = DistinguishedName::builder()
            .common_name("example.com")
            .organization("Example Corp")
            .country("US")
            .build();
        let name = dn.to_name().unwrap();
        let types: Vec<_> = name.attributes().map(|a| a.attr_type).collect();
        assert_eq!(types, vec![COUNTRY_NAME, ORGANIZATION_NAME, COMMON_NAME]);
        assert_eq!(
            name.attributes().next().map(|a| a.value.tag()),
            Some(der::Tag::PrintableString)
        );

        let back = DistinguishedName::from_name(&name);
        assert_eq!(back.common_name, "example.com");
        assert_eq!(back.organization.as_deref(), Some("Example Corp"));
        assert!(back.locality.is_none());
    }

    #[test]
    fn test_validity_for_days() {
        let validity = Validity::for_days(30);
        assert_eq!(validity.not_after - validity.not_before, Duration::days(30));
    }
}
