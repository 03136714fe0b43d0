use pkikit::cert::extensions::ExtendedKeyUsageOption;
use pkikit::cert::params::{CertificationRequestInfo, DistinguishedName};
use pkikit::cert::{Certificate, CertificateWithPrivateKey};
use pkikit::key::{KeyPair, PublicKey};
use pkikit::provider::RustCryptoProvider;

pub async fn generate_ca_cert() -> CertificateWithPrivateKey {
    let ca_key = KeyPair::generate_ecdsa_p256();

    let subject_dn = DistinguishedName::builder()
        .common_name("myca.local")
        .build();

    let subject_public_key = PublicKey::from_key_pair(&ca_key);

    let ca_cert_info = CertificationRequestInfo::builder()
        .subject(subject_dn.to_name().unwrap())
        .subject_public_key(subject_public_key)
        .usages(vec![
            ExtendedKeyUsageOption::ServerAuth,
            ExtendedKeyUsageOption::ClientAuth,
        ])
        .is_ca(true)
        .extensions(vec![])
        .build();

    CertificateWithPrivateKey {
        cert: Certificate::new_self_signed(&RustCryptoProvider, &ca_cert_info, &ca_key)
            .await
            .unwrap(),
        key: ca_key,
    }
}

pub fn server_request(common_name: &str, key: &KeyPair) -> CertificationRequestInfo {
    let server_dn = DistinguishedName::builder()
        .common_name(common_name)
        .build();

    CertificationRequestInfo::builder()
        .subject(server_dn.to_name().unwrap())
        .subject_public_key(PublicKey::from_key_pair(key))
        .usages(vec![ExtendedKeyUsageOption::ServerAuth])
        .build()
}
