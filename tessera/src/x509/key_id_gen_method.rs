use crate::hash::HashAlgorithm;
use crate::key::{KeyError, PublicKey};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeyIdGenError {
    /// invalid key
    #[error("invalid key: {source}")]
    InvalidKey { source: KeyError },

    /// the subject public key info has no subjectPublicKey bits
    #[error("public key has no subjectPublicKey")]
    MissingKeyBits,
}

impl From<KeyError> for KeyIdGenError {
    fn from(e: KeyError) -> Self {
        Self::InvalidKey { source: e }
    }
}

/// Describes which method to use to generate key identifiers.
///
/// See [RFC5280 #4](https://tools.ietf.org/html/rfc5280#section-4.2.1.2) and
/// [RFC7093 #2](https://tools.ietf.org/html/rfc7093#section-2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyIdGenMethod {
    /// RFC 5280 method 1: SHA-1 of the value of the BIT STRING subjectPublicKey
    /// (excluding the tag, length, and number of unused bits).
    SPKValueSha1,
    /// RFC 5280 method 2: the four-bit type field `0100` followed by the least
    /// significant 60 bits of the SHA-1 of the subjectPublicKey bits.
    SPKValueSha1Truncated60,
    /// Leftmost 160 bits of the hash of the subjectPublicKey bits.
    SPKValueHashedLeftmost160(HashAlgorithm),
    /// Hash of the DER encoding of the SubjectPublicKeyInfo value.
    SPKFullDER(HashAlgorithm),
}

impl Default for KeyIdGenMethod {
    fn default() -> Self {
        Self::SPKValueSha1
    }
}

impl KeyIdGenMethod {
    pub fn generate_from(self, public_key: &PublicKey) -> Result<Vec<u8>, KeyIdGenError> {
        let key_bits = || public_key.subject_public_key().ok_or(KeyIdGenError::MissingKeyBits);

        match self {
            KeyIdGenMethod::SPKValueSha1 => Ok(HashAlgorithm::SHA1.digest(key_bits()?)),
            KeyIdGenMethod::SPKValueSha1Truncated60 => {
                let digest = HashAlgorithm::SHA1.digest(key_bits()?);
                let mut id = digest[digest.len() - 8..].to_vec();
                id[0] = (id[0] & 0x0F) | 0x40;
                Ok(id)
            }
            KeyIdGenMethod::SPKValueHashedLeftmost160(hash_algo) => {
                let digest = hash_algo.digest(key_bits()?);
                Ok(digest[..digest.len().min(20)].to_vec())
            }
            KeyIdGenMethod::SPKFullDER(hash_algo) => {
                let der = public_key.to_der()?;
                Ok(hash_algo.digest(&der))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::x509::Cert;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(tessera_test_data::ROOT_CA)]
    #[case(tessera_test_data::INTERMEDIATE_CA)]
    #[case(tessera_test_data::LEAF)]
    fn matches_subject_key_identifier(#[case] pem: &str) {
        let cert = Cert::from_pem_str(pem).unwrap();
        let public_key = cert.public_key().unwrap();
        let generated = KeyIdGenMethod::SPKValueSha1.generate_from(&public_key).unwrap();
        assert_eq!(Some(generated.as_slice()), cert.subject_key_identifier());
    }

    #[test]
    fn truncated_method() {
        let cert = Cert::from_pem_str(tessera_test_data::LEAF).unwrap();
        let public_key = cert.public_key().unwrap();

        let full = KeyIdGenMethod::SPKValueSha1.generate_from(&public_key).unwrap();
        let truncated = KeyIdGenMethod::SPKValueSha1Truncated60
            .generate_from(&public_key)
            .unwrap();

        assert_eq!(truncated.len(), 8);
        assert_eq!(truncated[0] >> 4, 0b0100);
        assert_eq!(truncated[0] & 0x0F, full[12] & 0x0F);
        assert_eq!(truncated[1..], full[13..]);
    }

    #[test]
    fn other_hashes() {
        let public_key = Cert::from_pem_str(tessera_test_data::ROOT_CA)
            .unwrap()
            .public_key()
            .unwrap();

        let leftmost = KeyIdGenMethod::SPKValueHashedLeftmost160(HashAlgorithm::SHA2_256)
            .generate_from(&public_key)
            .unwrap();
        assert_eq!(leftmost.len(), 20);

        let full_der = KeyIdGenMethod::SPKFullDER(HashAlgorithm::SHA2_384)
            .generate_from(&public_key)
            .unwrap();
        assert_eq!(full_der, HashAlgorithm::SHA2_384.digest(&public_key.to_der().unwrap()));
    }
}
