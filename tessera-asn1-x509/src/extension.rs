//! Schemas of the `extnValue` payloads, see [RFC 5280 #4.2](https://tools.ietf.org/html/rfc5280#section-4.2)
//! and [#5.2](https://tools.ietf.org/html/rfc5280#section-5.2) for the CRL ones.

use crate::attribute::attribute;
use crate::name::{general_name, general_names, relative_distinguished_name};
use tessera_asn1::{Field, Schema, Value};

pub fn key_usage() -> Schema {
    Schema::bit_string().named_bits([
        "digitalSignature",
        "nonRepudiation",
        "keyEncipherment",
        "dataEncipherment",
        "keyAgreement",
        "keyCertSign",
        "cRLSign",
        "encipherOnly",
        "decipherOnly",
    ])
}

/// ```not_rust
/// BasicConstraints ::= SEQUENCE {
///      cA                      BOOLEAN DEFAULT FALSE,
///      pathLenConstraint       INTEGER (0..MAX) OPTIONAL }
/// ```
pub fn basic_constraints() -> Schema {
    Schema::sequence([
        Field::new("cA", Schema::boolean().default_value(Value::Boolean(false))),
        Field::new("pathLenConstraint", Schema::integer().optional()),
    ])
}

pub fn key_identifier() -> Schema {
    Schema::octet_string()
}

/// ```not_rust
/// AuthorityKeyIdentifier ::= SEQUENCE {
///     keyIdentifier             [0] KeyIdentifier           OPTIONAL,
///     authorityCertIssuer       [1] GeneralNames            OPTIONAL,
///     authorityCertSerialNumber [2] CertificateSerialNumber OPTIONAL  }
/// ```
pub fn authority_key_identifier() -> Schema {
    Schema::sequence([
        Field::new("keyIdentifier", key_identifier().implicit(0).optional()),
        Field::new("authorityCertIssuer", general_names().implicit(1).optional()),
        Field::new("authorityCertSerialNumber", Schema::integer().implicit(2).optional()),
    ])
}

pub fn crl_distribution_points() -> Schema {
    Schema::sequence_of(distribution_point())
}

/// ```not_rust
/// DistributionPoint ::= SEQUENCE {
///      distributionPoint       [0]     DistributionPointName OPTIONAL,
///      reasons                 [1]     ReasonFlags OPTIONAL,
///      cRLIssuer               [2]     GeneralNames OPTIONAL }
/// ```
pub fn distribution_point() -> Schema {
    Schema::sequence([
        Field::new("distributionPoint", distribution_point_name().explicit(0).optional()),
        Field::new("reasons", reason_flags().implicit(1).optional()),
        Field::new("cRLIssuer", general_names().implicit(2).optional()),
    ])
}

pub fn distribution_point_name() -> Schema {
    Schema::choice([
        Field::new("fullName", general_names().implicit(0)),
        Field::new("nameRelativeToCRLIssuer", relative_distinguished_name().implicit(1)),
    ])
}

pub fn reason_flags() -> Schema {
    Schema::bit_string().named_bits([
        "unused",
        "keyCompromise",
        "cACompromise",
        "affiliationChanged",
        "superseded",
        "cessationOfOperation",
        "certificateHold",
        "privilegeWithdrawn",
        "aACompromise",
    ])
}

/// ```not_rust
/// PolicyInformation ::= SEQUENCE {
///      policyIdentifier   CertPolicyId,
///      policyQualifiers   SEQUENCE SIZE (1..MAX) OF
///                              PolicyQualifierInfo OPTIONAL }
/// ```
pub fn certificate_policies() -> Schema {
    Schema::sequence_of(Schema::sequence([
        Field::new("policyIdentifier", Schema::object_identifier()),
        Field::new(
            "policyQualifiers",
            Schema::sequence_of(policy_qualifier_info()).optional(),
        ),
    ]))
}

pub fn policy_qualifier_info() -> Schema {
    Schema::sequence([
        Field::new("policyQualifierId", Schema::object_identifier()),
        Field::new("qualifier", Schema::any()),
    ])
}

pub fn cps_uri() -> Schema {
    Schema::ia5_string()
}

/// ```not_rust
/// UserNotice ::= SEQUENCE {
///      noticeRef        NoticeReference OPTIONAL,
///      explicitText     DisplayText OPTIONAL }
///
/// NoticeReference ::= SEQUENCE {
///      organization     DisplayText,
///      noticeNumbers    SEQUENCE OF INTEGER }
/// ```
pub fn user_notice() -> Schema {
    Schema::sequence([
        Field::new(
            "noticeRef",
            Schema::sequence([
                Field::new("organization", display_text()),
                Field::new("noticeNumbers", Schema::sequence_of(Schema::integer())),
            ])
            .optional(),
        ),
        Field::new("explicitText", display_text().optional()),
    ])
}

pub fn display_text() -> Schema {
    Schema::choice([
        Field::new("ia5String", Schema::ia5_string()),
        Field::new("visibleString", Schema::visible_string()),
        Field::new("bmpString", Schema::bmp_string()),
        Field::new("utf8String", Schema::utf8_string()),
    ])
}

pub fn policy_mappings() -> Schema {
    Schema::sequence_of(Schema::sequence([
        Field::new("issuerDomainPolicy", Schema::object_identifier()),
        Field::new("subjectDomainPolicy", Schema::object_identifier()),
    ]))
}

pub fn policy_constraints() -> Schema {
    Schema::sequence([
        Field::new("requireExplicitPolicy", Schema::integer().implicit(0).optional()),
        Field::new("inhibitPolicyMapping", Schema::integer().implicit(1).optional()),
    ])
}

pub fn inhibit_any_policy() -> Schema {
    Schema::integer()
}

pub fn ext_key_usage() -> Schema {
    Schema::sequence_of(Schema::object_identifier())
}

/// `AuthorityInfoAccessSyntax` and `SubjectInfoAccessSyntax`
pub fn info_access() -> Schema {
    Schema::sequence_of(Schema::sequence([
        Field::new("accessMethod", Schema::object_identifier()),
        Field::new("accessLocation", general_name()),
    ]))
}

pub fn subject_directory_attributes() -> Schema {
    Schema::sequence_of(attribute())
}

pub fn private_key_usage_period() -> Schema {
    Schema::sequence([
        Field::new("notBefore", Schema::generalized_time().implicit(0).optional()),
        Field::new("notAfter", Schema::generalized_time().implicit(1).optional()),
    ])
}

/// ```not_rust
/// NameConstraints ::= SEQUENCE {
///      permittedSubtrees       [0]     GeneralSubtrees OPTIONAL,
///      excludedSubtrees        [1]     GeneralSubtrees OPTIONAL }
///
/// GeneralSubtree ::= SEQUENCE {
///      base                    GeneralName,
///      minimum         [0]     BaseDistance DEFAULT 0,
///      maximum         [1]     BaseDistance OPTIONAL }
/// ```
pub fn name_constraints() -> Schema {
    let subtrees = || Schema::sequence_of(general_subtree());
    Schema::sequence([
        Field::new("permittedSubtrees", subtrees().implicit(0).optional()),
        Field::new("excludedSubtrees", subtrees().implicit(1).optional()),
    ])
}

pub fn general_subtree() -> Schema {
    Schema::sequence([
        Field::new("base", general_name()),
        Field::new("minimum", Schema::integer().implicit(0).default_value(Value::integer(0))),
        Field::new("maximum", Schema::integer().implicit(1).optional()),
    ])
}

pub fn netscape_cert_type() -> Schema {
    Schema::bit_string().named_bits([
        "SSLClient",
        "SSLServer",
        "Email",
        "ObjectSigning",
        "Reserved",
        "SSLCA",
        "EmailCA",
        "ObjectSigningCA",
    ])
}

pub fn netscape_comment() -> Schema {
    Schema::ia5_string()
}

pub fn netscape_ca_policy_url() -> Schema {
    Schema::ia5_string()
}

/// `cRLNumber` and `deltaCRLIndicator`
pub fn crl_number() -> Schema {
    Schema::integer()
}

/// ```not_rust
/// IssuingDistributionPoint ::= SEQUENCE {
///      distributionPoint          [0] DistributionPointName OPTIONAL,
///      onlyContainsUserCerts      [1] BOOLEAN DEFAULT FALSE,
///      onlyContainsCACerts        [2] BOOLEAN DEFAULT FALSE,
///      onlySomeReasons            [3] ReasonFlags OPTIONAL,
///      indirectCRL                [4] BOOLEAN DEFAULT FALSE,
///      onlyContainsAttributeCerts [5] BOOLEAN DEFAULT FALSE }
/// ```
pub fn issuing_distribution_point() -> Schema {
    let flag = |number| Schema::boolean().implicit(number).default_value(Value::Boolean(false));
    Schema::sequence([
        Field::new("distributionPoint", distribution_point_name().explicit(0).optional()),
        Field::new("onlyContainsUserCerts", flag(1)),
        Field::new("onlyContainsCACerts", flag(2)),
        Field::new("onlySomeReasons", reason_flags().implicit(3).optional()),
        Field::new("indirectCRL", flag(4)),
        Field::new("onlyContainsAttributeCerts", flag(5)),
    ])
}

pub fn crl_reason() -> Schema {
    Schema::enumerated().labels([
        (0, "unspecified"),
        (1, "keyCompromise"),
        (2, "cACompromise"),
        (3, "affiliationChanged"),
        (4, "superseded"),
        (5, "cessationOfOperation"),
        (6, "certificateHold"),
        // 7 is not used
        (8, "removeFromCRL"),
        (9, "privilegeWithdrawn"),
        (10, "aACompromise"),
    ])
}

pub fn invalidity_date() -> Schema {
    Schema::generalized_time()
}

pub fn certificate_issuer() -> Schema {
    general_names()
}

pub fn hold_instruction_code() -> Schema {
    Schema::object_identifier()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tessera_asn1_der::{from_der, to_der, ErrorKind};

    #[test]
    fn key_usage_bits() {
        // digitalSignature, keyCertSign, cRLSign
        let der = [0x03, 0x02, 0x01, 0x86];
        let value = from_der(&der, &key_usage()).unwrap();
        assert_eq!(
            value.as_named_bits().unwrap(),
            ["digitalSignature", "keyCertSign", "cRLSign"]
        );
        assert_eq!(to_der(&value, &key_usage()).unwrap(), der);
    }

    #[test]
    fn decipher_only_needs_a_second_octet() {
        let value = Value::NamedBits(vec!["decipherOnly".to_owned()]);
        assert_eq!(to_der(&value, &key_usage()).unwrap(), [0x03, 0x03, 0x07, 0x00, 0x80]);
    }

    #[test]
    fn crl_reason_labels() {
        let value = from_der(&[0x0A, 0x01, 0x01], &crl_reason()).unwrap();
        assert_eq!(value, Value::Label("keyCompromise".to_owned()));

        let err = from_der(&[0x0A, 0x01, 0x07], &crl_reason()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoMatch);
    }

    #[test]
    fn authority_key_identifier_with_serial() {
        let der = hex::decode("3009800401020304820101").unwrap();
        let value = from_der(&der, &authority_key_identifier()).unwrap();
        assert_eq!(value.pointer("keyIdentifier"), Some(&Value::OctetString(vec![1, 2, 3, 4])));
        assert_eq!(value.pointer("authorityCertSerialNumber"), Some(&Value::integer(1)));
        assert_eq!(value.pointer("authorityCertIssuer"), None);
        assert_eq!(to_der(&value, &authority_key_identifier()).unwrap(), der);
    }

    #[test]
    fn issuing_distribution_point_flags() {
        // onlyContainsCACerts TRUE
        let der = [0x30, 0x03, 0x82, 0x01, 0xFF];
        let value = from_der(&der, &issuing_distribution_point()).unwrap();
        assert_eq!(value.pointer("onlyContainsCACerts"), Some(&Value::Boolean(true)));
        assert_eq!(value.pointer("onlyContainsUserCerts"), Some(&Value::Boolean(false)));
        assert_eq!(to_der(&value, &issuing_distribution_point()).unwrap(), der);
    }

    #[test]
    fn crl_distribution_point_uri() {
        // [0] { fullName [0] { uri [6] "http://x/c.crl" } }
        let uri = b"http://x/c.crl";
        let mut der = vec![0x30, 0x16, 0x30, 0x14, 0xA0, 0x12, 0xA0, 0x10, 0x86, 0x0E];
        der.extend_from_slice(uri);
        let value = from_der(&der, &crl_distribution_points()).unwrap();
        assert_eq!(
            value.pointer("0/distributionPoint/fullName/0/uniformResourceIdentifier"),
            Some(&Value::string("http://x/c.crl"))
        );
        assert_eq!(to_der(&value, &crl_distribution_points()).unwrap(), der);
    }
}
