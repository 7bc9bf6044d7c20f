//! Hash algorithms supported by tessera

use digest::Digest;
use serde::{Deserialize, Serialize};
use tessera_asn1_x509::oids;

/// Supported hash algorithms
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum HashAlgorithm {
    MD2,
    MD5,
    SHA1,
    SHA2_224,
    SHA2_256,
    SHA2_384,
    SHA2_512,
}

impl HashAlgorithm {
    pub fn digest(self, msg: &[u8]) -> Vec<u8> {
        match self {
            Self::MD2 => md2::Md2::digest(msg).to_vec(),
            Self::MD5 => md5::Md5::digest(msg).to_vec(),
            Self::SHA1 => sha1::Sha1::digest(msg).to_vec(),
            Self::SHA2_224 => sha2::Sha224::digest(msg).to_vec(),
            Self::SHA2_256 => sha2::Sha256::digest(msg).to_vec(),
            Self::SHA2_384 => sha2::Sha384::digest(msg).to_vec(),
            Self::SHA2_512 => sha2::Sha512::digest(msg).to_vec(),
        }
    }

    /// Size of a digest, in bytes.
    pub fn output_size(self) -> usize {
        match self {
            Self::MD2 | Self::MD5 => 16,
            Self::SHA1 => 20,
            Self::SHA2_224 => 28,
            Self::SHA2_256 => 32,
            Self::SHA2_384 => 48,
            Self::SHA2_512 => 64,
        }
    }

    /// Hash named by a bare digest algorithm identifier (`id-sha256`, ...).
    pub fn from_oid(oid: &str) -> Option<Self> {
        match oid {
            oids::MD2 => Some(Self::MD2),
            oids::MD5 => Some(Self::MD5),
            oids::ID_SHA1 => Some(Self::SHA1),
            oids::ID_SHA224 => Some(Self::SHA2_224),
            oids::ID_SHA256 => Some(Self::SHA2_256),
            oids::ID_SHA384 => Some(Self::SHA2_384),
            oids::ID_SHA512 => Some(Self::SHA2_512),
            _ => None,
        }
    }

    pub fn oid(self) -> &'static str {
        match self {
            Self::MD2 => oids::MD2,
            Self::MD5 => oids::MD5,
            Self::SHA1 => oids::ID_SHA1,
            Self::SHA2_224 => oids::ID_SHA224,
            Self::SHA2_256 => oids::ID_SHA256,
            Self::SHA2_384 => oids::ID_SHA384,
            Self::SHA2_512 => oids::ID_SHA512,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(HashAlgorithm::MD2, "8350e5a3e24c153df2275c9f80692773")]
    #[case(HashAlgorithm::MD5, "d41d8cd98f00b204e9800998ecf8427e")]
    #[case(HashAlgorithm::SHA1, "da39a3ee5e6b4b0d3255bfef95601890afd80709")]
    #[case(
        HashAlgorithm::SHA2_256,
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    )]
    fn empty_message(#[case] hash: HashAlgorithm, #[case] expected: &str) {
        let digest = hash.digest(b"");
        assert_eq!(hex::encode(&digest), expected);
        assert_eq!(digest.len(), hash.output_size());
    }

    #[test]
    fn oid_round_trip() {
        for hash in [
            HashAlgorithm::MD2,
            HashAlgorithm::MD5,
            HashAlgorithm::SHA1,
            HashAlgorithm::SHA2_224,
            HashAlgorithm::SHA2_256,
            HashAlgorithm::SHA2_384,
            HashAlgorithm::SHA2_512,
        ] {
            assert_eq!(HashAlgorithm::from_oid(hash.oid()), Some(hash));
        }
    }
}
