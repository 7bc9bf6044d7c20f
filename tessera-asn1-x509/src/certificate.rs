use crate::algorithm_identifier::{algorithm_identifier, subject_public_key_info};
use crate::name::name;
use tessera_asn1::{Asn1Time, Field, Schema, TimeKind, Value};

/// [RFC 5280 #4.1](https://tools.ietf.org/html/rfc5280#section-4.1)
///
/// ```not_rust
/// Certificate  ::=  SEQUENCE  {
///      tbsCertificate       TBSCertificate,
///      signatureAlgorithm   AlgorithmIdentifier,
///      signatureValue       BIT STRING  }
/// ```
pub fn certificate() -> Schema {
    Schema::sequence([
        Field::new("tbsCertificate", tbs_certificate()),
        Field::new("signatureAlgorithm", algorithm_identifier()),
        Field::new("signature", Schema::bit_string()),
    ])
}

/// ```not_rust
/// TBSCertificate  ::=  SEQUENCE  {
///      version         [0]  EXPLICIT Version DEFAULT v1,
///      serialNumber         CertificateSerialNumber,
///      signature            AlgorithmIdentifier,
///      issuer               Name,
///      validity             Validity,
///      subject              Name,
///      subjectPublicKeyInfo SubjectPublicKeyInfo,
///      issuerUniqueID  [1]  IMPLICIT UniqueIdentifier OPTIONAL,
///      subjectUniqueID [2]  IMPLICIT UniqueIdentifier OPTIONAL,
///      extensions      [3]  EXPLICIT Extensions OPTIONAL }
/// ```
pub fn tbs_certificate() -> Schema {
    Schema::sequence([
        Field::new("version", version().explicit(0).default_value(Value::Label("v1".to_owned()))),
        Field::new("serialNumber", Schema::integer()),
        Field::new("signature", algorithm_identifier()),
        Field::new("issuer", name()),
        Field::new("validity", validity()),
        Field::new("subject", name()),
        Field::new("subjectPublicKeyInfo", subject_public_key_info()),
        Field::new("issuerUniqueID", Schema::bit_string().implicit(1).optional()),
        Field::new("subjectUniqueID", Schema::bit_string().implicit(2).optional()),
        Field::new("extensions", extensions().explicit(3).optional()),
    ])
}

/// `Version ::= INTEGER { v1(0), v2(1), v3(2) }`
pub fn version() -> Schema {
    Schema::integer().labels([(0, "v1"), (1, "v2"), (2, "v3")])
}

pub fn validity() -> Schema {
    Schema::sequence([Field::new("notBefore", time()), Field::new("notAfter", time())])
}

/// ```not_rust
/// Time ::= CHOICE {
///      utcTime        UTCTime,
///      generalTime    GeneralizedTime }
/// ```
pub fn time() -> Schema {
    Schema::choice([
        Field::new("utcTime", Schema::utc_time()),
        Field::new("generalTime", Schema::generalized_time()),
    ])
}

/// ```not_rust
/// Extension  ::=  SEQUENCE  {
///      extnID      OBJECT IDENTIFIER,
///      critical    BOOLEAN DEFAULT FALSE,
///      extnValue   OCTET STRING }
/// ```
pub fn extension() -> Schema {
    Schema::sequence([
        Field::new("extnId", Schema::object_identifier()),
        Field::new("critical", Schema::boolean().default_value(Value::Boolean(false))),
        Field::new("extnValue", Schema::octet_string()),
    ])
}

pub fn extensions() -> Schema {
    Schema::sequence_of(extension())
}

/// The `Time` CHOICE alternative a timestamp encodes with, following the 2050 cutoff.
pub fn time_value(time: Asn1Time) -> Value {
    let alternative = match time.kind() {
        TimeKind::UtcTime => "utcTime",
        TimeKind::GeneralizedTime => "generalTime",
    };
    Value::choice(alternative, Value::Time(time))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tessera_asn1_der::to_der;

    #[test]
    fn time_value_cutoff() {
        let before = Asn1Time::from_ymd_hms(2049, 12, 31, 23, 59, 59).unwrap();
        let after = Asn1Time::from_ymd_hms(2050, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(time_value(before).as_choice().unwrap().0, "utcTime");
        assert_eq!(time_value(after).as_choice().unwrap().0, "generalTime");

        let der = to_der(&time_value(after), &time()).unwrap();
        assert_eq!(der[0], 0x18);
        assert_eq!(&der[2..], b"20500101000000Z");
    }
}
