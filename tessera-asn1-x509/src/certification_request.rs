use crate::algorithm_identifier::{algorithm_identifier, subject_public_key_info};
use crate::attribute::attributes;
use crate::name::name;
use tessera_asn1::{Field, Schema};

/// [RFC 2986 #4](https://tools.ietf.org/html/rfc2986#section-4)
///
/// ```not_rust
/// CertificationRequest ::= SEQUENCE {
///      certificationRequestInfo CertificationRequestInfo,
///      signatureAlgorithm AlgorithmIdentifier{{ SignatureAlgorithms }},
///      signature          BIT STRING
/// }
/// ```
pub fn certification_request() -> Schema {
    Schema::sequence([
        Field::new("certificationRequestInfo", certification_request_info()),
        Field::new("signatureAlgorithm", algorithm_identifier()),
        Field::new("signature", Schema::bit_string()),
    ])
}

/// ```not_rust
/// CertificationRequestInfo ::= SEQUENCE {
///      version       INTEGER { v1(0) } (v1,...),
///      subject       Name,
///      subjectPKInfo SubjectPublicKeyInfo{{ PKInfoAlgorithms }},
///      attributes    [0] Attributes{{ CRIAttributes }}
/// }
/// ```
pub fn certification_request_info() -> Schema {
    Schema::sequence([
        Field::new("version", Schema::integer().labels([(0, "v1")])),
        Field::new("subject", name()),
        Field::new("subjectPKInfo", subject_public_key_info()),
        Field::new("attributes", attributes().implicit(0)),
    ])
}
