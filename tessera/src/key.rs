//! Public keys, as carried by a `SubjectPublicKeyInfo`.

use crate::pem::{parse_pem, Pem, PemError};
use crate::x509::utils::any_to_der;
use num_bigint_dig::{BigInt, BigUint, Sign};
use rsa::RsaPublicKey;
use tessera_asn1::{BitString, Value};
use tessera_asn1_der::{from_der, to_der, Asn1DerError};
use tessera_asn1_x509::algorithm_identifier::{dss_parms, rsa_public_key};
use tessera_asn1_x509::{oids, subject_public_key_info};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeyError {
    /// ASN1 serialization error
    #[error("(ASN1) couldn't serialize {element}: {source}")]
    Asn1Serialization {
        element: &'static str,
        source: Asn1DerError,
    },

    /// ASN1 deserialization error
    #[error("(ASN1) couldn't deserialize {element}: {source}")]
    Asn1Deserialization {
        element: &'static str,
        source: Asn1DerError,
    },

    /// RSA error
    #[error("RSA error: {context}")]
    Rsa { context: String },

    /// DSA error
    #[error("DSA error: {context}")]
    Dsa { context: String },

    /// EC error
    #[error("EC error: {context}")]
    EC { context: String },

    /// invalid PEM label error
    #[error("invalid PEM label: {label}")]
    InvalidPemLabel { label: String },

    /// unsupported algorithm
    #[error("unsupported algorithm: {algorithm}")]
    UnsupportedAlgorithm { algorithm: String },

    /// invalid PEM provided
    #[error("invalid PEM provided: {source}")]
    Pem { source: PemError },
}

impl From<rsa::Error> for KeyError {
    fn from(e: rsa::Error) -> Self {
        Self::Rsa { context: e.to_string() }
    }
}

impl From<PemError> for KeyError {
    fn from(e: PemError) -> Self {
        Self::Pem { source: e }
    }
}

/// Elliptic curves with verification support.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EcCurve {
    /// NIST P-256 curve (secp256r1)
    NistP256,
    /// NIST P-384 curve (secp384r1)
    NistP384,
}

impl EcCurve {
    pub fn from_oid(oid: &str) -> Option<Self> {
        match oid {
            oids::PRIME256V1 => Some(Self::NistP256),
            oids::SECP384R1 => Some(Self::NistP384),
            _ => None,
        }
    }

    pub fn oid(self) -> &'static str {
        match self {
            Self::NistP256 => oids::PRIME256V1,
            Self::NistP384 => oids::SECP384R1,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EdAlgorithm {
    Ed25519,
    Ed448,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DsaPublicKey {
    pub p: BigUint,
    pub q: BigUint,
    pub g: BigUint,
    pub y: BigUint,
}

impl DsaPublicKey {
    /// Range checks on the domain parameters and the public value.
    pub fn check(&self) -> Result<(), KeyError> {
        let zero = BigUint::from(0u8);
        let one = BigUint::from(1u8);
        let fail = |context: &str| {
            Err(KeyError::Dsa {
                context: context.to_owned(),
            })
        };

        if self.p <= one {
            return fail("p must be greater than one");
        }
        if self.q <= one {
            return fail("q must be greater than one");
        }
        if self.g <= one || self.g >= self.p {
            return fail("g is out of range");
        }
        if self.y == zero || self.y >= self.p {
            return fail("y is out of range");
        }
        if (&self.p - &one) % &self.q != zero {
            return fail("q doesn't divide p - 1");
        }
        Ok(())
    }
}

/// Key material extracted from a [`PublicKey`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PublicKeyKind {
    /// `rsaEncryption` key
    Rsa(RsaPublicKey),
    /// `id-RSASSA-PSS` key, restricted to PSS signatures
    RsaPss(RsaPublicKey),
    Dsa(DsaPublicKey),
    /// SEC1 encoded point on the curve named by `curve` (dotted)
    Ec { curve: String, point: Vec<u8> },
    Ed { algorithm: EdAlgorithm, key: Vec<u8> },
}

const PUBLIC_KEY_PEM_LABEL: &str = "PUBLIC KEY";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey(Value);

impl From<Value> for PublicKey {
    #[inline]
    fn from(spki: Value) -> Self {
        Self(spki)
    }
}

impl From<PublicKey> for Value {
    #[inline]
    fn from(key: PublicKey) -> Self {
        key.0
    }
}

impl AsRef<Value> for PublicKey {
    #[inline]
    fn as_ref(&self) -> &Value {
        &self.0
    }
}

impl TryFrom<&'_ PublicKey> for RsaPublicKey {
    type Error = KeyError;

    fn try_from(v: &PublicKey) -> Result<Self, Self::Error> {
        match v.kind()? {
            PublicKeyKind::Rsa(key) | PublicKeyKind::RsaPss(key) => Ok(key),
            PublicKeyKind::Dsa(_) => Err(KeyError::UnsupportedAlgorithm {
                algorithm: "dsa".to_owned(),
            }),
            PublicKeyKind::Ec { .. } => Err(KeyError::UnsupportedAlgorithm {
                algorithm: "elliptic curves".to_owned(),
            }),
            PublicKeyKind::Ed { .. } => Err(KeyError::UnsupportedAlgorithm {
                algorithm: "edwards curves".to_owned(),
            }),
        }
    }
}

impl PublicKey {
    pub fn from_rsa_components(modulus: &BigUint, public_exponent: &BigUint) -> Result<Self, KeyError> {
        let key = Value::sequence([
            ("modulus", Value::integer(BigInt::from_biguint(Sign::Plus, modulus.clone()))),
            (
                "publicExponent",
                Value::integer(BigInt::from_biguint(Sign::Plus, public_exponent.clone())),
            ),
        ]);
        let key = to_der(&key, &rsa_public_key()).map_err(|source| KeyError::Asn1Serialization {
            element: "rsa public key",
            source,
        })?;
        Ok(Self::from_parts(
            oids::RSA_ENCRYPTION,
            Some(Value::resolved(tessera_asn1::Tag::NULL, Value::Null)),
            key,
        ))
    }

    /// `point` is SEC1 encoded point data
    pub fn from_ec_encoded_components(curve: &str, point: &[u8]) -> Self {
        Self::from_parts(
            oids::ID_EC_PUBLIC_KEY,
            Some(Value::resolved(tessera_asn1::Tag::OID, Value::oid(curve))),
            point.to_vec(),
        )
    }

    /// `public_key` is raw edwards curve public key
    pub fn from_ed_encoded_components(algorithm: EdAlgorithm, public_key: &[u8]) -> Self {
        let oid = match algorithm {
            EdAlgorithm::Ed25519 => oids::ID_ED25519,
            EdAlgorithm::Ed448 => oids::ID_ED448,
        };
        Self::from_parts(oid, None, public_key.to_vec())
    }

    fn from_parts(algorithm: &str, parameters: Option<Value>, key: Vec<u8>) -> Self {
        let mut algorithm_identifier = Value::sequence([("algorithm", Value::oid(algorithm))]);
        if let (Some(parameters), Some(fields)) = (parameters, algorithm_identifier.as_fields_mut()) {
            fields.insert("parameters", parameters);
        }
        Self(Value::sequence([
            ("algorithm", algorithm_identifier),
            ("subjectPublicKey", Value::BitString(BitString::from_bytes(key))),
        ]))
    }

    pub fn to_der(&self) -> Result<Vec<u8>, KeyError> {
        to_der(&self.0, &subject_public_key_info()).map_err(|source| KeyError::Asn1Serialization {
            element: "subject public key info",
            source,
        })
    }

    pub fn to_pem(&self) -> Result<Pem<'static>, KeyError> {
        let der = self.to_der()?;
        Ok(Pem::new(PUBLIC_KEY_PEM_LABEL, der))
    }

    pub fn to_pem_str(&self) -> Result<String, KeyError> {
        self.to_pem().map(|pem| pem.to_string())
    }

    pub fn from_pem(pem: &Pem) -> Result<Self, KeyError> {
        match pem.label() {
            PUBLIC_KEY_PEM_LABEL => Self::from_der(pem.data()),
            _ => Err(KeyError::InvalidPemLabel {
                label: pem.label().to_owned(),
            }),
        }
    }

    pub fn from_pem_str(pem_str: &str) -> Result<Self, KeyError> {
        let pem = parse_pem(pem_str)?;
        Self::from_pem(&pem)
    }

    pub fn from_der<T: ?Sized + AsRef<[u8]>>(der: &T) -> Result<Self, KeyError> {
        from_der(der.as_ref(), &subject_public_key_info())
            .map(Self)
            .map_err(|source| KeyError::Asn1Deserialization {
                element: "subject public key info",
                source,
            })
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Dotted identifier of the key algorithm.
    pub fn algorithm(&self) -> Option<&str> {
        self.0.pointer("algorithm/algorithm").and_then(Value::as_oid)
    }

    /// Content of the `subjectPublicKey` BIT STRING.
    pub fn subject_public_key(&self) -> Option<&[u8]> {
        self.0
            .pointer("subjectPublicKey")
            .and_then(Value::as_bit_string)
            .map(BitString::payload)
    }

    /// Parses the key material for the algorithms tessera can verify with.
    pub fn kind(&self) -> Result<PublicKeyKind, KeyError> {
        let algorithm = self.algorithm().ok_or_else(|| KeyError::UnsupportedAlgorithm {
            algorithm: "<missing>".to_owned(),
        })?;
        let key = self.subject_public_key().ok_or_else(|| KeyError::UnsupportedAlgorithm {
            algorithm: algorithm.to_owned(),
        })?;

        match algorithm {
            oids::RSA_ENCRYPTION => Ok(PublicKeyKind::Rsa(parse_rsa(key)?)),
            oids::ID_RSASSA_PSS => Ok(PublicKeyKind::RsaPss(parse_rsa(key)?)),
            oids::ID_DSA => {
                let parameters = self
                    .0
                    .pointer("algorithm/parameters")
                    .ok_or_else(|| KeyError::Dsa {
                        context: "domain parameters are missing".to_owned(),
                    })?;
                Ok(PublicKeyKind::Dsa(parse_dsa(parameters, key)?))
            }
            oids::ID_EC_PUBLIC_KEY => {
                let curve = self
                    .0
                    .pointer("algorithm/parameters")
                    .map(Value::unwrap_any)
                    .and_then(Value::as_oid)
                    .ok_or_else(|| KeyError::EC {
                        context: "only named curves are supported".to_owned(),
                    })?;
                Ok(PublicKeyKind::Ec {
                    curve: curve.to_owned(),
                    point: key.to_vec(),
                })
            }
            oids::ID_ED25519 => Ok(PublicKeyKind::Ed {
                algorithm: EdAlgorithm::Ed25519,
                key: key.to_vec(),
            }),
            oids::ID_ED448 => Ok(PublicKeyKind::Ed {
                algorithm: EdAlgorithm::Ed448,
                key: key.to_vec(),
            }),
            unsupported => Err(KeyError::UnsupportedAlgorithm {
                algorithm: oids::display_name(unsupported),
            }),
        }
    }
}

fn unsigned(value: Option<&Value>, context: &str) -> Result<BigUint, String> {
    match value.and_then(Value::as_integer).map(BigInt::to_bytes_be) {
        Some((Sign::Minus, _)) => Err(format!("{context} is negative")),
        Some((_, bytes)) => Ok(BigUint::from_bytes_be(&bytes)),
        None => Err(format!("{context} is missing")),
    }
}

fn parse_rsa(key: &[u8]) -> Result<RsaPublicKey, KeyError> {
    let key = from_der(key, &rsa_public_key()).map_err(|source| KeyError::Asn1Deserialization {
        element: "rsa public key",
        source,
    })?;
    let modulus = unsigned(key.pointer("modulus"), "modulus").map_err(|context| KeyError::Rsa { context })?;
    let exponent =
        unsigned(key.pointer("publicExponent"), "public exponent").map_err(|context| KeyError::Rsa { context })?;
    Ok(RsaPublicKey::new(modulus, exponent)?)
}

fn parse_dsa(parameters: &Value, key: &[u8]) -> Result<DsaPublicKey, KeyError> {
    let parameters = any_to_der(parameters).map_err(|source| KeyError::Asn1Serialization {
        element: "dss parameters",
        source,
    })?;
    let parameters = from_der(&parameters, &dss_parms()).map_err(|source| KeyError::Asn1Deserialization {
        element: "dss parameters",
        source,
    })?;
    let y = from_der(key, &tessera_asn1::Schema::integer()).map_err(|source| KeyError::Asn1Deserialization {
        element: "dsa public key",
        source,
    })?;

    let dsa = |context| KeyError::Dsa { context };
    let key = DsaPublicKey {
        p: unsigned(parameters.pointer("p"), "p").map_err(dsa)?,
        q: unsigned(parameters.pointer("q"), "q").map_err(dsa)?,
        g: unsigned(parameters.pointer("g"), "g").map_err(dsa)?,
        y: unsigned(Some(&y), "y").map_err(dsa)?,
    };
    key.check()?;
    Ok(key)
}
