//! # PkiKit - Schema-Driven X.509 Structures in Pure Rust
//!
//! PkiKit decodes, builds, signs and verifies X.509 certificates. Every
//! structure declares its ASN.1 layout as data ([`schema::SchemaNode`]); a
//! small structural matcher checks parsed input against that layout and hands
//! the captured elements to the typed entity. Cryptography is delegated to a
//! [`provider::CryptoProvider`], with [`provider::RustCryptoProvider`] as the
//! in-process default built on the RustCrypto crates.
//!
//! ## Supported Key Types
//!
//! - **RSA**: PKCS#1 v1.5 signatures with SHA-1/256/384/512
//! - **ECDSA**: P-256 and P-384 curves
//! - **Ed25519**: Edwards curve digital signature algorithm
//!
//! ## Quick Start
//!
//! ### Building, Signing and Verifying a Certificate
//!
//! ```rust,no_run
//! use pkikit::{
//!     cert::Certificate,
//!     key::KeyPair,
//!     provider::{HashAlgorithm, RustCryptoProvider},
//!     structures::{SerialNumber, Time},
//!     tbs_certificate::{TbsCertificate, Version},
//! };
//!
//! # async fn run() -> Result<(), pkikit::error::PkiKitError> {
//! let key = KeyPair::generate_ecdsa_p256();
//! let name: pkikit::structures::Name = "CN=Test".parse()?;
//! let now = time::OffsetDateTime::now_utc();
//!
//! let mut cert = Certificate::builder()
//!     .tbs_certificate(
//!         TbsCertificate::builder()
//!             .version(Version::V3)
//!             .serial_number(SerialNumber::from(1))
//!             .issuer(name.clone())
//!             .subject(name)
//!             .not_before(Time::new(now))
//!             .not_after(Time::new(now + time::Duration::days(365)))
//!             .subject_public_key_info(key.subject_public_key_info()?)
//!             .build(),
//!     )
//!     .build();
//!
//! let provider = RustCryptoProvider;
//! cert.sign(&provider, Some(&key), "SHA-256".parse::<HashAlgorithm>()?).await?;
//! assert!(cert.verify(&provider, None).await?);
//! println!("{}", cert.to_pem()?);
//! # Ok(())
//! # }
//! ```
//!
//! ### Creating a Certificate Chain
//!
//! ```rust,no_run
//! use pkikit::{
//!     cert::{Certificate, CertificateWithPrivateKey, params::{CertificationRequestInfo, DistinguishedName, Validity}},
//!     issuer::Issuer,
//!     key::KeyPair,
//!     provider::RustCryptoProvider,
//!     structures::SerialNumber,
//! };
//!
//! # async fn run() -> Result<(), pkikit::error::PkiKitError> {
//! let provider = RustCryptoProvider;
//! let ca_key = KeyPair::generate_ecdsa_p256();
//! let ca_info = CertificationRequestInfo::builder()
//!     .subject(DistinguishedName::builder().common_name("Example CA").build().to_name()?)
//!     .subject_public_key(ca_key.public_key())
//!     .is_ca(true)
//!     .build();
//! let ca = CertificateWithPrivateKey {
//!     cert: Certificate::new_self_signed(&provider, &ca_info, &ca_key).await?,
//!     key: ca_key,
//! };
//!
//! let server_key = KeyPair::generate_ed25519();
//! let server_info = CertificationRequestInfo::builder()
//!     .subject("CN=server.example.com".parse()?)
//!     .subject_public_key(server_key.public_key())
//!     .build();
//! let server = ca
//!     .issue(&provider, &server_info, Validity::for_days(90), SerialNumber::random())
//!     .await?;
//! assert!(server.verify(&provider, Some(&ca.cert)).await?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use pkikit::{cert::Certificate, error::PkiKitError, structure::PkiStructure};
//!
//! match Certificate::from_der(&[0x30, 0x00]) {
//!     Ok(_) => unreachable!(),
//!     Err(PkiKitError::SchemaMismatch(msg)) => println!("Not a certificate: {}", msg),
//!     Err(e) => println!("Other error: {}", e),
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`asn1`]: Generic parsed ASN.1 tree over the `der` codec
//! - [`schema`]: Layout descriptors and the structural matcher
//! - [`structure`]: The decode/encode/project contract shared by all entities
//! - [`structures`]: Names, times, algorithm identifiers, keys and extensions
//! - [`cert`]: The certificate entity, extension payloads and the CA predicate
//! - [`tbs_certificate`]: The signed part of a certificate
//! - [`provider`]: The cryptographic provider seam
//! - [`key`]: Key generation and PKCS#8 import/export
//! - [`issuer`]: Certificate issuing helpers
//! - [`error`]: Error types

pub mod asn1;
pub mod cert;
pub mod error;
pub mod issuer;
pub mod key;
pub mod pem_utils;
pub mod provider;
pub mod schema;
pub mod structure;
pub mod structures;
pub mod tbs_certificate;
