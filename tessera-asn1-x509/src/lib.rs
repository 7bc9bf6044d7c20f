//! Schemas for X.509 certificates and the related PKIX structures
//!
//! Every structure is described as a [`Schema`](tessera_asn1::Schema) built by a plain
//! function, named after the ASN.1 type it mirrors. Values are decoded and encoded with
//! `tessera-asn1-der`:
//!
//! ```
//! use tessera_asn1_der::from_der;
//! use tessera_asn1_x509::extension::basic_constraints;
//!
//! let value = from_der(&[0x30, 0x03, 0x01, 0x01, 0xFF], &basic_constraints()).unwrap();
//! assert_eq!(value.pointer("cA").and_then(|v| v.as_bool()), Some(true));
//! ```
//!
//! The [`ExtensionRegistry`] maps extension ids to the schema of their `extnValue`.

pub mod algorithm_identifier;
pub mod attribute;
pub mod certificate;
pub mod certification_request;
pub mod crl;
pub mod extension;
pub mod name;
pub mod oids;
pub mod registry;
pub mod spkac;

pub use algorithm_identifier::{algorithm_identifier, subject_public_key_info};
pub use certificate::{certificate, tbs_certificate};
pub use certification_request::certification_request;
pub use crl::certificate_list;
pub use registry::{ExtensionRegistry, RegistryError};
pub use spkac::signed_public_key_and_challenge;
