//! # tessera
//!
//! X.509 certificates, certification requests, revocation lists and SPKAC: loading, editing,
//! saving and signature validation, on top of the `tessera-asn1-der` codec.
//!
//! ```
//! use tessera::x509::Cert;
//!
//! let cert = Cert::from_pem_str(tessera_test_data::LEAF).unwrap();
//! assert!(cert.validate_url("https://www.tessera.test/"));
//! assert_eq!(cert.subject().unwrap().hash().unwrap(), "fba76c85");
//! ```

pub mod hash;
pub mod key;
pub mod pem;
pub mod signature;
pub mod x509;

pub use tessera_asn1_x509::{oids, ExtensionRegistry};
