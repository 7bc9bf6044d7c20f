use tessera_asn1::{Field, Schema, TagClass, Tagging};

/// [RFC 5280 #4.1.2.4](https://tools.ietf.org/html/rfc5280#section-4.1.2.4)
///
/// ```not_rust
/// Name ::= CHOICE { -- only one possibility for now --
///   rdnSequence  RDNSequence }
///
/// RDNSequence ::= SEQUENCE OF RelativeDistinguishedName
///
/// RelativeDistinguishedName ::=
///   SET SIZE (1..MAX) OF AttributeTypeAndValue
///
/// AttributeTypeAndValue ::= SEQUENCE {
///   type     AttributeType,
///   value    AttributeValue }
/// ```
pub fn name() -> Schema {
    Schema::choice([Field::new("rdnSequence", rdn_sequence())])
}

pub fn rdn_sequence() -> Schema {
    Schema::sequence_of(relative_distinguished_name())
}

pub fn relative_distinguished_name() -> Schema {
    Schema::set_of(attribute_type_and_value())
}

pub fn attribute_type_and_value() -> Schema {
    Schema::sequence([
        Field::new("type", Schema::object_identifier()),
        Field::new("value", Schema::any()),
    ])
}

pub fn directory_string() -> Schema {
    Schema::choice([
        Field::new("teletexString", Schema::teletex_string()),
        Field::new("printableString", Schema::printable_string()),
        Field::new("universalString", Schema::universal_string()),
        Field::new("utf8String", Schema::utf8_string()),
        Field::new("bmpString", Schema::bmp_string()),
    ])
}

/// `PostalAddress ::= SEQUENCE SIZE (1..ub-postal-line) OF DirectoryString`
pub fn postal_address() -> Schema {
    Schema::sequence_of(directory_string())
}

/// [RFC 5280 #4.2.1.6](https://tools.ietf.org/html/rfc5280#section-4.2.1.6)
///
/// ```not_rust
/// GeneralName ::= CHOICE {
///      otherName                       [0]     OtherName,
///      rfc822Name                      [1]     IA5String,
///      dNSName                         [2]     IA5String,
///      x400Address                     [3]     ORAddress,
///      directoryName                   [4]     Name,
///      ediPartyName                    [5]     EDIPartyName,
///      uniformResourceIdentifier       [6]     IA5String,
///      iPAddress                       [7]     OCTET STRING,
///      registeredID                    [8]     OBJECT IDENTIFIER }
/// ```
pub fn general_name() -> Schema {
    Schema::choice([
        Field::new("otherName", another_name().implicit(0)),
        Field::new("rfc822Name", Schema::ia5_string().implicit(1)),
        Field::new("dNSName", Schema::ia5_string().implicit(2)),
        Field::new("x400Address", or_address().implicit(3)),
        // Name is a CHOICE, so this one is always explicit
        Field::new("directoryName", name().explicit(4)),
        Field::new("ediPartyName", edi_party_name().implicit(5)),
        Field::new("uniformResourceIdentifier", Schema::ia5_string().implicit(6)),
        Field::new("iPAddress", Schema::octet_string().implicit(7)),
        Field::new("registeredID", Schema::object_identifier().implicit(8)),
    ])
}

pub fn general_names() -> Schema {
    Schema::sequence_of(general_name())
}

/// ```not_rust
/// AnotherName ::= SEQUENCE {
///      type-id    OBJECT IDENTIFIER,
///      value      [0] EXPLICIT ANY DEFINED BY type-id }
/// ```
pub fn another_name() -> Schema {
    Schema::sequence([
        Field::new("type-id", Schema::object_identifier()),
        Field::new("value", Schema::any().explicit(0)),
    ])
}

pub fn edi_party_name() -> Schema {
    Schema::sequence([
        Field::new("nameAssigner", directory_string().implicit(0).optional()),
        Field::new("partyName", directory_string().implicit(1)),
    ])
}

/// [RFC 5280 appendix A.1](https://tools.ietf.org/html/rfc5280#appendix-A.1), `ORAddress`.
pub fn or_address() -> Schema {
    Schema::sequence([
        Field::new("built-in-standard-attributes", built_in_standard_attributes()),
        Field::new(
            "built-in-domain-defined-attributes",
            Schema::sequence_of(Schema::sequence([
                Field::new("type", Schema::printable_string()),
                Field::new("value", Schema::printable_string()),
            ]))
            .optional(),
        ),
        Field::new(
            "extension-attributes",
            Schema::set_of(Schema::sequence([
                Field::new("extension-attribute-type", Schema::integer().implicit(0)),
                Field::new("extension-attribute-value", Schema::any().explicit(1)),
            ]))
            .optional(),
        ),
    ])
}

fn numeric_or_printable(numeric: &str, printable: &str) -> Schema {
    Schema::choice([
        Field::new(numeric, Schema::numeric_string()),
        Field::new(printable, Schema::printable_string()),
    ])
}

fn built_in_standard_attributes() -> Schema {
    Schema::sequence([
        Field::new(
            "country-name",
            numeric_or_printable("x121-dcc-code", "iso-3166-alpha2-code")
                .tagged(Tagging::Explicit, TagClass::Application, 1)
                .optional(),
        ),
        Field::new(
            "administration-domain-name",
            numeric_or_printable("numeric", "printable")
                .tagged(Tagging::Explicit, TagClass::Application, 2)
                .optional(),
        ),
        Field::new("network-address", Schema::numeric_string().implicit(0).optional()),
        Field::new("terminal-identifier", Schema::printable_string().implicit(1).optional()),
        Field::new(
            "private-domain-name",
            numeric_or_printable("numeric", "printable").explicit(2).optional(),
        ),
        Field::new("organization-name", Schema::printable_string().implicit(3).optional()),
        Field::new("numeric-user-identifier", Schema::numeric_string().implicit(4).optional()),
        Field::new(
            "personal-name",
            Schema::set([
                Field::new("surname", Schema::printable_string().implicit(0)),
                Field::new("given-name", Schema::printable_string().implicit(1).optional()),
                Field::new("initials", Schema::printable_string().implicit(2).optional()),
                Field::new("generation-qualifier", Schema::printable_string().implicit(3).optional()),
            ])
            .implicit(5)
            .optional(),
        ),
        Field::new(
            "organizational-unit-names",
            Schema::sequence_of(Schema::printable_string()).implicit(6).optional(),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tessera_asn1::Value;
    use tessera_asn1_der::{from_der, to_der};

    #[test]
    fn general_name_alternatives() {
        let dns = from_der(b"\x82\x0bexample.com", &general_name()).unwrap();
        assert_eq!(dns, Value::choice("dNSName", Value::string("example.com")));

        let ip = from_der(&[0x87, 0x04, 0xC0, 0x00, 0x02, 0x0A], &general_name()).unwrap();
        assert_eq!(ip, Value::choice("iPAddress", Value::OctetString(vec![192, 0, 2, 10])));
    }

    #[test]
    fn directory_name_is_explicit() {
        let value = Value::choice(
            "directoryName",
            Value::choice("rdnSequence", Value::List(Vec::new())),
        );
        let der = to_der(&value, &general_name()).unwrap();
        assert_eq!(der, [0xA4, 0x02, 0x30, 0x00]);
        assert_eq!(from_der(&der, &general_name()).unwrap(), value);
    }

    #[test]
    fn x400_address_with_application_tags() {
        // x400Address: country-name [APPLICATION 1] { printable "FR" }
        let der = [0xA3, 0x08, 0x30, 0x06, 0x61, 0x04, 0x13, 0x02, b'F', b'R'];
        let value = from_der(&der, &general_name()).unwrap();
        assert_eq!(
            value.pointer("x400Address/built-in-standard-attributes/country-name"),
            Some(&Value::choice("iso-3166-alpha2-code", Value::string("FR")))
        );
        assert_eq!(to_der(&value, &general_name()).unwrap(), der);
    }
}
