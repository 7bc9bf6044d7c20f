//! Signature algorithm dispatch.
//!
//! A signature is checked by pairing the algorithm named in a document's
//! `signatureAlgorithm` with the kind of the signer's public key. Pairs tessera has no
//! verifier for end up as [`SignatureError::UnsupportedAlgorithm`], which is never
//! reported as [`SignatureError::BadSignature`].

use crate::hash::HashAlgorithm;
use crate::key::{DsaPublicKey, EcCurve, EdAlgorithm, KeyError, PublicKey, PublicKeyKind};
use crate::x509::utils::any_to_der;
use num_bigint_dig::{BigUint, Sign};
use rsa::{Pkcs1v15Sign, Pss, RsaPublicKey};
use tessera_asn1::{BigInt, Value};
use tessera_asn1_der::{from_der, Asn1DerError};
use tessera_asn1_x509::algorithm_identifier::{algorithm_identifier, dss_sig_value, rsassa_pss_params};
use tessera_asn1_x509::oids;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignatureError {
    /// RSA error
    #[error("RSA error: {context}")]
    Rsa { context: String },

    /// invalid signature
    #[error("invalid signature")]
    BadSignature,

    /// unsupported algorithm
    #[error("unsupported algorithm: {algorithm}")]
    UnsupportedAlgorithm { algorithm: String },

    /// the algorithm identifier parameters couldn't be read
    #[error("invalid parameters for {algorithm}: {source}")]
    InvalidParameters {
        algorithm: &'static str,
        source: Asn1DerError,
    },

    /// the signer's public key is malformed
    #[error("invalid public key: {source}")]
    Key { source: KeyError },
}

impl From<rsa::Error> for SignatureError {
    fn from(e: rsa::Error) -> Self {
        SignatureError::Rsa { context: e.to_string() }
    }
}

impl From<KeyError> for SignatureError {
    fn from(e: KeyError) -> Self {
        match e {
            KeyError::UnsupportedAlgorithm { algorithm } => SignatureError::UnsupportedAlgorithm { algorithm },
            source => SignatureError::Key { source },
        }
    }
}

impl SignatureError {
    pub fn is_unsupported(&self) -> bool {
        matches!(self, SignatureError::UnsupportedAlgorithm { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureAlgorithm {
    /// RSASSA-PKCS1-v1_5
    RsaPkcs1v15(HashAlgorithm),
    /// RSASSA-PSS with MGF1 over the same hash
    RsaPss { hash: HashAlgorithm, salt_len: usize },
    Dsa(HashAlgorithm),
    Ecdsa(HashAlgorithm),
    Ed25519,
    Ed448,
}

macro_rules! with_digest {
    ($hash:expr, $digest:ident => $body:expr) => {
        match $hash {
            HashAlgorithm::MD2 => {
                type $digest = md2::Md2;
                $body
            }
            HashAlgorithm::MD5 => {
                type $digest = md5::Md5;
                $body
            }
            HashAlgorithm::SHA1 => {
                type $digest = sha1::Sha1;
                $body
            }
            HashAlgorithm::SHA2_224 => {
                type $digest = sha2::Sha224;
                $body
            }
            HashAlgorithm::SHA2_256 => {
                type $digest = sha2::Sha256;
                $body
            }
            HashAlgorithm::SHA2_384 => {
                type $digest = sha2::Sha384;
                $body
            }
            HashAlgorithm::SHA2_512 => {
                type $digest = sha2::Sha512;
                $body
            }
        }
    };
}

impl SignatureAlgorithm {
    /// Reads an `AlgorithmIdentifier` value.
    pub fn from_algorithm_identifier(algorithm_identifier: &Value) -> Result<Self, SignatureError> {
        let oid = algorithm_identifier
            .pointer("algorithm")
            .and_then(Value::as_oid)
            .ok_or_else(|| SignatureError::UnsupportedAlgorithm {
                algorithm: "<missing>".to_owned(),
            })?;

        let algorithm = match oid {
            oids::MD2_WITH_RSA_ENCRYPTION => Self::RsaPkcs1v15(HashAlgorithm::MD2),
            oids::MD5_WITH_RSA_ENCRYPTION => Self::RsaPkcs1v15(HashAlgorithm::MD5),
            oids::SHA1_WITH_RSA_ENCRYPTION => Self::RsaPkcs1v15(HashAlgorithm::SHA1),
            oids::SHA224_WITH_RSA_ENCRYPTION => Self::RsaPkcs1v15(HashAlgorithm::SHA2_224),
            oids::SHA256_WITH_RSA_ENCRYPTION => Self::RsaPkcs1v15(HashAlgorithm::SHA2_256),
            oids::SHA384_WITH_RSA_ENCRYPTION => Self::RsaPkcs1v15(HashAlgorithm::SHA2_384),
            oids::SHA512_WITH_RSA_ENCRYPTION => Self::RsaPkcs1v15(HashAlgorithm::SHA2_512),
            oids::ID_RSASSA_PSS => pss_from_parameters(algorithm_identifier.pointer("parameters"))?,
            oids::ID_DSA_WITH_SHA1 => Self::Dsa(HashAlgorithm::SHA1),
            oids::ID_DSA_WITH_SHA224 => Self::Dsa(HashAlgorithm::SHA2_224),
            oids::ID_DSA_WITH_SHA256 => Self::Dsa(HashAlgorithm::SHA2_256),
            oids::ECDSA_WITH_SHA1 => Self::Ecdsa(HashAlgorithm::SHA1),
            oids::ECDSA_WITH_SHA224 => Self::Ecdsa(HashAlgorithm::SHA2_224),
            oids::ECDSA_WITH_SHA256 => Self::Ecdsa(HashAlgorithm::SHA2_256),
            oids::ECDSA_WITH_SHA384 => Self::Ecdsa(HashAlgorithm::SHA2_384),
            oids::ECDSA_WITH_SHA512 => Self::Ecdsa(HashAlgorithm::SHA2_512),
            oids::ID_ED25519 => Self::Ed25519,
            oids::ID_ED448 => Self::Ed448,
            unsupported => {
                return Err(SignatureError::UnsupportedAlgorithm {
                    algorithm: oids::display_name(unsupported),
                })
            }
        };

        Ok(algorithm)
    }

    pub fn hash_algorithm(self) -> Option<HashAlgorithm> {
        match self {
            Self::RsaPkcs1v15(hash) | Self::Dsa(hash) | Self::Ecdsa(hash) => Some(hash),
            Self::RsaPss { hash, .. } => Some(hash),
            Self::Ed25519 | Self::Ed448 => None,
        }
    }

    /// Checks `signature` over `msg` with `public_key`.
    pub fn verify(self, public_key: &PublicKey, msg: &[u8], signature: &[u8]) -> Result<(), SignatureError> {
        match (public_key.kind()?, self) {
            (PublicKeyKind::Rsa(key), Self::RsaPkcs1v15(hash)) => verify_rsa_pkcs1v15(&key, hash, msg, signature),
            (PublicKeyKind::Rsa(key) | PublicKeyKind::RsaPss(key), Self::RsaPss { hash, salt_len }) => {
                verify_rsa_pss(&key, hash, salt_len, msg, signature)
            }
            (PublicKeyKind::Dsa(key), Self::Dsa(hash)) => verify_dsa(&key, hash, msg, signature),
            (PublicKeyKind::Ec { curve, point }, Self::Ecdsa(hash)) => {
                verify_ecdsa(&curve, &point, hash, msg, signature)
            }
            (
                PublicKeyKind::Ed {
                    algorithm: EdAlgorithm::Ed25519,
                    key,
                },
                Self::Ed25519,
            ) => verify_ed25519(&key, msg, signature),
            (
                PublicKeyKind::Ed {
                    algorithm: EdAlgorithm::Ed448,
                    ..
                },
                Self::Ed448,
            ) => Err(SignatureError::UnsupportedAlgorithm {
                algorithm: oids::display_name(oids::ID_ED448),
            }),
            (_, algorithm) => Err(SignatureError::UnsupportedAlgorithm {
                algorithm: format!(
                    "{algorithm:?} with a {} key",
                    public_key.algorithm().map(oids::display_name).unwrap_or_default()
                ),
            }),
        }
    }
}

fn pss_from_parameters(parameters: Option<&Value>) -> Result<SignatureAlgorithm, SignatureError> {
    let invalid = |source| SignatureError::InvalidParameters {
        algorithm: "id-RSASSA-PSS",
        source,
    };

    // absent parameters mean every default
    let der = match parameters {
        Some(parameters) => any_to_der(parameters).map_err(invalid)?,
        None => vec![0x30, 0x00],
    };
    let parameters = from_der(&der, &rsassa_pss_params()).map_err(invalid)?;

    let hash_oid = parameters
        .pointer("hashAlgorithm/algorithm")
        .and_then(Value::as_oid)
        .unwrap_or(oids::ID_SHA1);
    let hash = HashAlgorithm::from_oid(hash_oid).ok_or_else(|| SignatureError::UnsupportedAlgorithm {
        algorithm: oids::display_name(hash_oid),
    })?;

    let mgf = parameters.pointer("maskGenAlgorithm/algorithm").and_then(Value::as_oid);
    if mgf != Some(oids::ID_MGF1) {
        return Err(SignatureError::UnsupportedAlgorithm {
            algorithm: mgf.map(oids::display_name).unwrap_or_default(),
        });
    }
    let mgf_hash = match parameters.pointer("maskGenAlgorithm/parameters") {
        Some(mgf_parameters) => {
            let der = any_to_der(mgf_parameters).map_err(invalid)?;
            let identifier = from_der(&der, &algorithm_identifier()).map_err(invalid)?;
            identifier
                .pointer("algorithm")
                .and_then(Value::as_oid)
                .map(str::to_owned)
                .unwrap_or_default()
        }
        None => oids::ID_SHA1.to_owned(),
    };
    if mgf_hash != hash.oid() {
        return Err(SignatureError::UnsupportedAlgorithm {
            algorithm: format!("mgf1 with {}", oids::display_name(&mgf_hash)),
        });
    }

    let salt_len = parameters
        .pointer("saltLength")
        .and_then(Value::as_integer)
        .and_then(small_unsigned)
        .unwrap_or(20);

    Ok(SignatureAlgorithm::RsaPss { hash, salt_len })
}

fn small_unsigned(value: &BigInt) -> Option<usize> {
    match value.to_bytes_be() {
        (Sign::Minus, _) => None,
        (_, bytes) if bytes.len() > std::mem::size_of::<usize>() => None,
        (_, bytes) => Some(bytes.iter().fold(0, |acc, byte| (acc << 8) | usize::from(*byte))),
    }
}

fn verify_rsa_pkcs1v15(
    key: &RsaPublicKey,
    hash: HashAlgorithm,
    msg: &[u8],
    signature: &[u8],
) -> Result<(), SignatureError> {
    let digest = hash.digest(msg);
    let scheme = with_digest!(hash, D => Pkcs1v15Sign::new::<D>());
    key.verify(scheme, &digest, signature)
        .map_err(|_| SignatureError::BadSignature)
}

fn verify_rsa_pss(
    key: &RsaPublicKey,
    hash: HashAlgorithm,
    salt_len: usize,
    msg: &[u8],
    signature: &[u8],
) -> Result<(), SignatureError> {
    let digest = hash.digest(msg);
    let scheme = with_digest!(hash, D => Pss::new_with_salt::<D>(salt_len));
    key.verify(scheme, &digest, signature)
        .map_err(|_| SignatureError::BadSignature)
}

fn verify_dsa(key: &DsaPublicKey, hash: HashAlgorithm, msg: &[u8], signature: &[u8]) -> Result<(), SignatureError> {
    let signature = from_der(signature, &dss_sig_value()).map_err(|_| SignatureError::BadSignature)?;
    let component = |name| match signature.pointer(name).and_then(Value::as_integer) {
        Some(value) if value.sign() == Sign::Plus => Ok(BigUint::from_bytes_be(&value.to_bytes_be().1)),
        _ => Err(SignatureError::BadSignature),
    };
    let r = component("r")?;
    let s = component("s")?;

    key.check()?;
    let DsaPublicKey { p, q, g, y } = key;
    let zero = BigUint::from(0u8);
    if r == zero || s == zero || &r >= q || &s >= q {
        return Err(SignatureError::BadSignature);
    }

    // leftmost min(N, outlen) bits of the digest
    let digest = hash.digest(msg);
    let mut z = BigUint::from_bytes_be(&digest);
    let digest_bits = digest.len() * 8;
    let n = q.bits();
    if digest_bits > n {
        z >>= digest_bits - n;
    }

    // q is prime, so s^(q-2) is the inverse of s
    let w = s.modpow(&(q - BigUint::from(2u8)), q);
    let u1 = (&z * &w) % q;
    let u2 = (&r * &w) % q;
    let v = ((g.modpow(&u1, p) * y.modpow(&u2, p)) % p) % q;

    if v == r {
        Ok(())
    } else {
        Err(SignatureError::BadSignature)
    }
}

fn verify_ecdsa(
    curve: &str,
    point: &[u8],
    hash: HashAlgorithm,
    msg: &[u8],
    signature: &[u8],
) -> Result<(), SignatureError> {
    use p256::ecdsa::signature::hazmat::PrehashVerifier;

    let curve = EcCurve::from_oid(curve).ok_or_else(|| SignatureError::UnsupportedAlgorithm {
        algorithm: oids::display_name(curve),
    })?;
    let digest = hash.digest(msg);

    let verified = match curve {
        EcCurve::NistP256 => {
            let key = p256::ecdsa::VerifyingKey::from_sec1_bytes(point).map_err(|e| KeyError::EC {
                context: format!("invalid P-256 point: {e}"),
            })?;
            p256::ecdsa::Signature::from_der(signature)
                .and_then(|signature| key.verify_prehash(&digest, &signature))
                .is_ok()
        }
        EcCurve::NistP384 => {
            let key = p384::ecdsa::VerifyingKey::from_sec1_bytes(point).map_err(|e| KeyError::EC {
                context: format!("invalid P-384 point: {e}"),
            })?;
            p384::ecdsa::Signature::from_der(signature)
                .and_then(|signature| key.verify_prehash(&digest, &signature))
                .is_ok()
        }
    };

    if verified {
        Ok(())
    } else {
        Err(SignatureError::BadSignature)
    }
}

fn verify_ed25519(key: &[u8], msg: &[u8], signature: &[u8]) -> Result<(), SignatureError> {
    use ed25519_dalek::Verifier;

    let key: &[u8; 32] = key.try_into().map_err(|_| KeyError::EC {
        context: "Ed25519 public keys are 32 bytes long".to_owned(),
    })?;
    let key = ed25519_dalek::VerifyingKey::from_bytes(key).map_err(|e| KeyError::EC {
        context: format!("invalid Ed25519 public key: {e}"),
    })?;
    let signature = ed25519_dalek::Signature::from_slice(signature).map_err(|_| SignatureError::BadSignature)?;

    key.verify(msg, &signature).map_err(|_| SignatureError::BadSignature)
}
