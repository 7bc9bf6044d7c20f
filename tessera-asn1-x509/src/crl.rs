use crate::algorithm_identifier::algorithm_identifier;
use crate::certificate::{extensions, time};
use crate::name::name;
use tessera_asn1::{Field, Schema};

/// [RFC 5280 #5.1](https://tools.ietf.org/html/rfc5280#section-5.1)
///
/// ```not_rust
/// CertificateList  ::=  SEQUENCE  {
///      tbsCertList          TBSCertList,
///      signatureAlgorithm   AlgorithmIdentifier,
///      signatureValue       BIT STRING  }
/// ```
pub fn certificate_list() -> Schema {
    Schema::sequence([
        Field::new("tbsCertList", tbs_cert_list()),
        Field::new("signatureAlgorithm", algorithm_identifier()),
        Field::new("signature", Schema::bit_string()),
    ])
}

/// ```not_rust
/// TBSCertList  ::=  SEQUENCE  {
///      version                 Version OPTIONAL,
///                                   -- if present, MUST be v2
///      signature               AlgorithmIdentifier,
///      issuer                  Name,
///      thisUpdate              Time,
///      nextUpdate              Time OPTIONAL,
///      revokedCertificates     SEQUENCE OF SEQUENCE  { ... }  OPTIONAL,
///      crlExtensions           [0]  EXPLICIT Extensions OPTIONAL }
/// ```
pub fn tbs_cert_list() -> Schema {
    Schema::sequence([
        Field::new("version", crate::certificate::version().optional()),
        Field::new("signature", algorithm_identifier()),
        Field::new("issuer", name()),
        Field::new("thisUpdate", time()),
        Field::new("nextUpdate", time().optional()),
        Field::new(
            "revokedCertificates",
            Schema::sequence_of(revoked_certificate()).optional(),
        ),
        Field::new("crlExtensions", extensions().explicit(0).optional()),
    ])
}

pub fn revoked_certificate() -> Schema {
    Schema::sequence([
        Field::new("userCertificate", Schema::integer()),
        Field::new("revocationDate", time()),
        Field::new("crlEntryExtensions", extensions().optional()),
    ])
}
