use crate::algorithm_identifier::{algorithm_identifier, subject_public_key_info};
use tessera_asn1::{Field, Schema};

/// Netscape `SignedPublicKeyAndChallenge`, as produced by `<keygen>` and `openssl spkac`.
///
/// ```not_rust
/// SignedPublicKeyAndChallenge ::= SEQUENCE {
///      publicKeyAndChallenge PublicKeyAndChallenge,
///      signatureAlgorithm    AlgorithmIdentifier,
///      signature             BIT STRING
/// }
///
/// PublicKeyAndChallenge ::= SEQUENCE {
///      spki      SubjectPublicKeyInfo,
///      challenge IA5STRING
/// }
/// ```
pub fn signed_public_key_and_challenge() -> Schema {
    Schema::sequence([
        Field::new("publicKeyAndChallenge", public_key_and_challenge()),
        Field::new("signatureAlgorithm", algorithm_identifier()),
        Field::new("signature", Schema::bit_string()),
    ])
}

pub fn public_key_and_challenge() -> Schema {
    Schema::sequence([
        Field::new("spki", subject_public_key_info()),
        Field::new("challenge", Schema::ia5_string()),
    ])
}
