use crate::oids;
use tessera_asn1::{Field, Schema, Tag, Value};

/// [RFC 5280 #4.1.1.2](https://tools.ietf.org/html/rfc5280#section-4.1.1.2)
///
/// ```not_rust
/// AlgorithmIdentifier  ::=  SEQUENCE  {
///      algorithm               OBJECT IDENTIFIER,
///      parameters              ANY DEFINED BY algorithm OPTIONAL  }
/// ```
pub fn algorithm_identifier() -> Schema {
    Schema::sequence([
        Field::new("algorithm", Schema::object_identifier()),
        Field::new("parameters", Schema::any().optional()),
    ])
}

/// [RFC 5280 #4.1](https://tools.ietf.org/html/rfc5280#section-4.1)
///
/// ```not_rust
/// SubjectPublicKeyInfo  ::=  SEQUENCE  {
///      algorithm            AlgorithmIdentifier,
///      subjectPublicKey     BIT STRING  }
/// ```
pub fn subject_public_key_info() -> Schema {
    Schema::sequence([
        Field::new("algorithm", algorithm_identifier()),
        Field::new("subjectPublicKey", Schema::bit_string()),
    ])
}

/// [RFC 8017 #A.1.1](https://tools.ietf.org/html/rfc8017#appendix-A.1.1)
pub fn rsa_public_key() -> Schema {
    Schema::sequence([
        Field::new("modulus", Schema::integer()),
        Field::new("publicExponent", Schema::integer()),
    ])
}

/// [RFC 3279 #2.3.2](https://tools.ietf.org/html/rfc3279#section-2.3.2)
///
/// ```not_rust
/// Dss-Parms  ::=  SEQUENCE  {
///     p             INTEGER,
///     q             INTEGER,
///     g             INTEGER  }
/// ```
pub fn dss_parms() -> Schema {
    Schema::sequence([
        Field::new("p", Schema::integer()),
        Field::new("q", Schema::integer()),
        Field::new("g", Schema::integer()),
    ])
}

/// `Dss-Sig-Value` and `ECDSA-Sig-Value` share this shape.
pub fn dss_sig_value() -> Schema {
    Schema::sequence([Field::new("r", Schema::integer()), Field::new("s", Schema::integer())])
}

/// [RFC 5480 #2.1.1](https://tools.ietf.org/html/rfc5480#section-2.1.1)
///
/// `specifiedCurve` is kept as an opaque element.
pub fn ec_parameters() -> Schema {
    Schema::choice([
        Field::new("namedCurve", Schema::object_identifier()),
        Field::new("implicitCurve", Schema::null()),
        Field::new("specifiedCurve", Schema::any()),
    ])
}

/// [RFC 4055 #3.1](https://tools.ietf.org/html/rfc4055#section-3.1)
///
/// ```not_rust
/// RSASSA-PSS-params  ::=  SEQUENCE  {
///     hashAlgorithm      [0] HashAlgorithm DEFAULT sha1Identifier,
///     maskGenAlgorithm   [1] MaskGenAlgorithm DEFAULT mgf1SHA1Identifier,
///     saltLength         [2] INTEGER DEFAULT 20,
///     trailerField       [3] INTEGER DEFAULT 1  }
/// ```
pub fn rsassa_pss_params() -> Schema {
    Schema::sequence([
        Field::new(
            "hashAlgorithm",
            algorithm_identifier().explicit(0).default_value(sha1_identifier()),
        ),
        Field::new(
            "maskGenAlgorithm",
            algorithm_identifier().explicit(1).default_value(mgf1_sha1_identifier()),
        ),
        Field::new(
            "saltLength",
            Schema::integer().explicit(2).default_value(Value::integer(20)),
        ),
        Field::new(
            "trailerField",
            Schema::integer().explicit(3).default_value(Value::integer(1)),
        ),
    ])
}

/// `{ id-sha1, NULL }`
pub fn sha1_identifier() -> Value {
    Value::sequence([
        ("algorithm", Value::oid(oids::ID_SHA1)),
        ("parameters", Value::resolved(Tag::NULL, Value::Null)),
    ])
}

/// `{ id-mgf1, sha1Identifier }`, the parameters kept as their DER encoding.
pub fn mgf1_sha1_identifier() -> Value {
    Value::sequence([
        ("algorithm", Value::oid(oids::ID_MGF1)),
        (
            "parameters",
            Value::opaque(vec![0x30, 0x09, 0x06, 0x05, 0x2B, 0x0E, 0x03, 0x02, 0x1A, 0x05, 0x00]),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tessera_asn1_der::{from_der, to_der};

    #[test]
    fn pss_defaults_are_omitted() {
        let params = Value::sequence([
            ("hashAlgorithm", sha1_identifier()),
            ("maskGenAlgorithm", mgf1_sha1_identifier()),
            ("saltLength", Value::integer(20)),
            ("trailerField", Value::integer(1)),
        ]);
        assert_eq!(to_der(&params, &rsassa_pss_params()).unwrap(), [0x30, 0x00]);
    }

    #[test]
    fn pss_sha256() {
        // sha256, mgf1-sha256, salt 32
        let der = hex::decode(
            "3034a00f300d06096086480165030402010500a11c301a06092a864886f70d010108300d06096086480165030402010500a203020120",
        )
        .unwrap();
        let params = from_der(&der, &rsassa_pss_params()).unwrap();
        assert_eq!(
            params.pointer("hashAlgorithm/algorithm"),
            Some(&Value::oid(oids::ID_SHA256))
        );
        assert_eq!(params.pointer("saltLength"), Some(&Value::integer(32)));
        assert_eq!(params.pointer("trailerField"), Some(&Value::integer(1)));
        assert_eq!(to_der(&params, &rsassa_pss_params()).unwrap(), der);
    }
}
