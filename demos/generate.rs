use pkikit::cert::extensions::{ExtendedKeyUsageOption, SubjectAltName};
use pkikit::cert::params::{CertificationRequestInfo, DistinguishedName, Validity};
use pkikit::cert::trust::check_ca;
use pkikit::cert::{Certificate, CertificateWithPrivateKey};
use pkikit::error::Result;
use pkikit::issuer::Issuer;
use pkikit::key::{KeyPair, PublicKey};
use pkikit::provider::RustCryptoProvider;
use pkikit::structure::PkiStructure;
use pkikit::structures::{Extension, SerialNumber};

#[tokio::main]
async fn main() -> Result<()> {
    let provider = RustCryptoProvider;

    // Generate a key pair for the CA using ECDSA (or choose RSA/Ed25519)
    let ca_key = KeyPair::generate_ecdsa_p256();
    let ca_info = CertificationRequestInfo::builder()
        .subject(
            DistinguishedName::builder()
                .common_name("My Test CA")
                .organization("PkiKit")
                .country("US")
                .build()
                .to_name()?,
        )
        .subject_public_key(PublicKey::from_key_pair(&ca_key))
        .is_ca(true)
        .build();

    let ca = CertificateWithPrivateKey {
        cert: Certificate::new_self_signed(&provider, &ca_info, &ca_key).await?,
        key: ca_key,
    };
    println!("CA Certificate PEM:\n{}", ca.cert.to_pem()?);

    // Generate a key pair for the server
    let server_key = KeyPair::generate_ed25519();
    let server_info = CertificationRequestInfo::builder()
        .subject("CN=myserver.local".parse()?)
        .subject_public_key(PublicKey::from_key_pair(&server_key))
        .usages(vec![ExtendedKeyUsageOption::ServerAuth])
        .extensions(vec![Extension::from_typed(
            &SubjectAltName::dns(["myserver.local", "localhost"]),
            false,
        )?])
        .build();

    let server_cert = ca
        .issue(
            &provider,
            &server_info,
            Validity::for_days(825),
            SerialNumber::random(),
        )
        .await?;
    println!("Server Certificate PEM:\n{}", server_cert.to_pem()?);

    println!(
        "Server signature valid: {}",
        server_cert.verify(&provider, Some(&ca.cert)).await?
    );
    println!("CA qualifies: {}", check_ca(&ca.cert, Some(&server_cert)).is_some());
    println!(
        "Server structure:\n{}",
        serde_json::to_string_pretty(&server_cert.to_json()).unwrap_or_default()
    );

    Ok(())
}
