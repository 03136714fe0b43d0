mod util;

use openssl::x509::X509;
use pkikit::cert::params::Validity;
use pkikit::issuer::Issuer;
use pkikit::key::KeyPair;
use pkikit::provider::RustCryptoProvider;
use pkikit::structures::SerialNumber;
use regex::Regex;
use std::fs;
use std::process::Command;

#[tokio::test]
async fn test_openssl_validate_cert() {
    // Generate a CA certificate
    let ca_cert_with_key = util::generate_ca_cert().await;

    // Generate a server certificate signed by the CA
    let server_key = KeyPair::generate_ecdsa_p256();
    let server_cert_info = util::server_request("server.myca.local", &server_key);
    let server_cert = ca_cert_with_key
        .issue(
            &RustCryptoProvider,
            &server_cert_info,
            Validity::for_days(365),
            SerialNumber::from(1),
        )
        .await
        .unwrap();
    let server_cert_pem = server_cert.to_pem().unwrap();

    // Save the certificate to a temporary file
    let cert_path = std::env::temp_dir().join("pkikit_test_server_cert.pem");
    fs::write(&cert_path, server_cert_pem).expect("Failed to write server certificate");

    // Use OpenSSL CLI to validate the generated certificate
    let output = Command::new("openssl")
        .arg("x509")
        .arg("-in")
        .arg(&cert_path)
        .arg("-noout")
        .arg("-text")
        .output()
        .expect("Failed to execute OpenSSL command");

    assert!(
        output.status.success(),
        "OpenSSL command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let output_text = String::from_utf8_lossy(&output.stdout);

    assert!(
        output_text.contains("Issuer: CN=myca.local")
            || output_text.contains("Issuer: CN = myca.local"),
        "Issuer field is incorrect"
    );
    assert!(
        output_text.contains("Subject: CN=server.myca.local")
            || output_text.contains("Subject: CN = server.myca.local"),
        "Subject field is incorrect"
    );
    assert!(
        output_text.contains("Version: 3 (0x2)"),
        "Version field is incorrect"
    );
    assert!(
        output_text.contains("Serial Number: 1 (0x1)"),
        "Serial Number field is incorrect"
    );

    // Validate dynamic fields with regex
    let not_before_regex = Regex::new(r"Not Before: .+").unwrap();
    let not_after_regex = Regex::new(r"Not After : .+").unwrap();

    assert!(
        not_before_regex.is_match(&output_text),
        "Missing or incorrect Not Before field"
    );
    assert!(
        not_after_regex.is_match(&output_text),
        "Missing or incorrect Not After field"
    );
    assert!(
        output_text.contains("Signature Algorithm: ecdsa-with-SHA256"),
        "Signature Algorithm field is incorrect"
    );
    assert!(
        output_text.contains("CA:FALSE"),
        "Basic Constraints are missing"
    );

    fs::remove_file(&cert_path).expect("Failed to remove test certificate");
}

#[tokio::test]
async fn test_openssl_crate_validate_cert() {
    let ca_cert_with_key = util::generate_ca_cert().await;

    let server_key = KeyPair::generate_ecdsa_p256();
    let server_cert_info = util::server_request("server.myca.local", &server_key);
    let server_cert = ca_cert_with_key
        .issue(
            &RustCryptoProvider,
            &server_cert_info,
            Validity::for_days(365),
            SerialNumber::from(1),
        )
        .await
        .unwrap();

    // Use the openssl crate to parse and validate the certificate
    let x509 = X509::from_pem(server_cert.to_pem().unwrap().as_bytes()).expect("Failed to parse PEM");
    let ca_x509 =
        X509::from_pem(ca_cert_with_key.cert.to_pem().unwrap().as_bytes()).expect("Failed to parse CA PEM");

    let subject = x509
        .subject_name()
        .entries_by_nid(openssl::nid::Nid::COMMONNAME)
        .next()
        .unwrap()
        .data()
        .as_utf8()
        .unwrap();
    assert_eq!(
        subject.to_string(),
        "server.myca.local",
        "Subject CN mismatch"
    );

    let issuer = x509
        .issuer_name()
        .entries_by_nid(openssl::nid::Nid::COMMONNAME)
        .next()
        .unwrap()
        .data()
        .as_utf8()
        .unwrap();
    assert_eq!(issuer.to_string(), "myca.local", "Issuer CN mismatch");

    assert_eq!(
        x509.version(),
        2,
        "X509 version should be 3 (0-based index)"
    );

    let serial = x509.serial_number().to_bn().unwrap().to_dec_str().unwrap();
    assert_eq!(serial.to_string(), "1", "Serial number should be 1");

    assert_eq!(
        x509.signature_algorithm().object().nid(),
        openssl::nid::Nid::ECDSA_WITH_SHA256,
        "Signature algorithm should be ecdsa-with-SHA256"
    );

    // The signature must check out under the CA key, and the CA must be self-signed.
    let ca_public_key = ca_x509.public_key().unwrap();
    assert!(x509.verify(&ca_public_key).unwrap(), "Server signature rejected");
    assert!(ca_x509.verify(&ca_public_key).unwrap(), "CA signature rejected");
}

#[tokio::test]
async fn test_openssl_issued_cert_decodes() {
    use openssl::asn1::Asn1Time;
    use openssl::bn::{BigNum, MsbOption};
    use openssl::ec::{EcGroup, EcKey};
    use openssl::hash::MessageDigest;
    use openssl::nid::Nid;
    use openssl::pkey::PKey;
    use openssl::x509::{X509NameBuilder, extension::BasicConstraints};
    use pkikit::cert::Certificate;
    use pkikit::cert::trust::check_ca;

    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    let key = PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap();

    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_nid(Nid::COMMONNAME, "openssl.local").unwrap();
    let name = name.build();

    let mut serial = BigNum::new().unwrap();
    serial.rand(64, MsbOption::MAYBE_ZERO, false).unwrap();

    let mut builder = X509::builder().unwrap();
    builder.set_version(2).unwrap();
    builder.set_serial_number(&serial.to_asn1_integer().unwrap()).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(&key).unwrap();
    builder.set_not_before(&Asn1Time::days_from_now(0).unwrap()).unwrap();
    builder.set_not_after(&Asn1Time::days_from_now(30).unwrap()).unwrap();
    builder
        .append_extension(BasicConstraints::new().critical().ca().build().unwrap())
        .unwrap();
    builder.sign(&key, MessageDigest::sha256()).unwrap();
    let der = builder.build().to_der().unwrap();

    use pkikit::structure::PkiStructure;
    let cert = Certificate::from_der(&der).expect("Failed to decode OpenSSL certificate");
    assert_eq!(cert.subject().common_name().as_deref(), Some("openssl.local"));
    assert!(check_ca(&cert, None).is_some());
    assert!(cert.verify(&RustCryptoProvider, None).await.unwrap());
    assert_eq!(cert.to_der().unwrap(), der);
}
