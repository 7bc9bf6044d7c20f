use tessera_asn1::{Field, Schema};

/// [RFC 2986 #4.1](https://tools.ietf.org/html/rfc2986#section-4.1)
///
/// ```not_rust
/// Attribute { ATTRIBUTE:IOSet } ::= SEQUENCE {
///      type   ATTRIBUTE.&id({IOSet}),
///      values SET SIZE(1..MAX) OF ATTRIBUTE.&Type({IOSet}{@type})
/// }
/// ```
pub fn attribute() -> Schema {
    Schema::sequence([
        Field::new("type", Schema::object_identifier()),
        Field::new("value", Schema::set_of(Schema::any())),
    ])
}

/// `Attributes ::= SET OF Attribute`
pub fn attributes() -> Schema {
    Schema::set_of(attribute())
}

/// [RFC 2985 #5.2.6](https://tools.ietf.org/html/rfc2985#section-5.2.6), used by `unstructuredName`.
pub fn pkcs9_string() -> Schema {
    Schema::choice([
        Field::new("ia5String", Schema::ia5_string()),
        Field::new("directoryString", crate::name::directory_string()),
    ])
}
