//! Schema-directed DER encoding of a [`Value`].

use crate::de::decode_tlv;
use crate::hooks::Hooks;
use crate::misc::{der_set_order, Length};
use crate::{string, Asn1DerError, Result};
use std::borrow::Cow;
use tessera_asn1::{encode_oid, Any, Field, Kind, Retag, Schema, Tag, TimeKind, Value};

/// Encodes `value` as DER following `schema`.
pub fn to_der(value: &Value, schema: &Schema) -> Result<Vec<u8>> {
    Encoder::new().encode(value, schema)
}

/// Same as [`to_der`], running `hooks` on the fields they name first.
pub fn to_der_with_hooks(value: &Value, schema: &Schema, hooks: &Hooks) -> Result<Vec<u8>> {
    Encoder::new().with_hooks(hooks).encode(value, schema)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Type used for a bare string placed in an ANY field.
    pub default_any_string: Kind,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            default_any_string: Kind::Utf8String,
        }
    }
}

#[derive(Default)]
pub struct Encoder<'a> {
    options: EncodeOptions,
    hooks: Option<&'a Hooks>,
}

impl<'a> Encoder<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, options: EncodeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_hooks(mut self, hooks: &'a Hooks) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn encode(&self, value: &Value, schema: &Schema) -> Result<Vec<u8>> {
        debug_log!("encode {} as {}", value.type_name(), schema.kind().describe());

        let untagged = self.encode_untagged(value, schema)?;
        match schema.retag() {
            None => Ok(untagged),
            Some(retag) if retag.wraps(schema.kind()) => {
                Ok(tlv(Tag::new(retag.class, true, retag.number), &untagged))
            }
            Some(retag) => implicit(&untagged, retag),
        }
    }

    fn encode_hook<'v>(&self, field: &str, value: &'v Value) -> Result<Cow<'v, Value>> {
        match self.hooks {
            Some(hooks) if hooks.has_encode(field) => Ok(Cow::Owned(hooks.encode(field, value.clone())?)),
            _ => Ok(Cow::Borrowed(value)),
        }
    }

    fn encode_untagged(&self, value: &Value, schema: &Schema) -> Result<Vec<u8>> {
        // an opaque element is already a complete encoding
        if let Value::Any(Any::Opaque(element)) = value {
            return Ok(element.as_bytes().to_vec());
        }

        let kind = schema.kind();
        match kind {
            Kind::Choice(alternatives) => self.encode_choice(value, alternatives),
            Kind::Any => self.encode_any(value),
            Kind::Sequence(fields) => Ok(tlv(Tag::SEQUENCE, &self.encode_fields(value, kind, fields, false)?)),
            Kind::Set(fields) => Ok(tlv(Tag::SET, &self.encode_fields(value, kind, fields, true)?)),
            Kind::SequenceOf(item) => Ok(tlv(Tag::SEQUENCE, &self.encode_items(value, kind, item, false)?)),
            Kind::SetOf(item) => Ok(tlv(Tag::SET, &self.encode_items(value, kind, item, true)?)),
            _ => {
                let value = match value {
                    Value::Any(Any::Resolved(_, inner)) => inner.as_ref(),
                    other => other,
                };
                let tag = kind.universal_tag().ok_or_else(|| unsupported(kind, value))?;
                Ok(tlv(tag, &self.encode_scalar(value, schema)?))
            }
        }
    }

    fn encode_fields(&self, value: &Value, kind: &Kind, fields: &[Field], sort: bool) -> Result<Vec<u8>> {
        let values = value.as_fields().ok_or_else(|| unsupported(kind, value))?;

        let mut members = Vec::with_capacity(fields.len());
        for field in fields {
            let Some(member) = values.get(&field.name) else {
                if field.schema.is_optional() {
                    continue;
                }
                return Err(Asn1DerError::MissingField {
                    field: field.name.clone(),
                });
            };

            let member = self.encode_hook(&field.name, member)?;
            let encoded = self.encode(&member, &field.schema)?;
            if let Some(default) = field.schema.default() {
                if self.encode(default, &field.schema)? == encoded {
                    debug_log!("`{}` equals its default, omitted", field.name);
                    continue;
                }
            }
            members.push(encoded);
        }

        Ok(join(members, sort))
    }

    fn encode_items(&self, value: &Value, kind: &Kind, item: &Schema, sort: bool) -> Result<Vec<u8>> {
        let items = value.as_list().ok_or_else(|| unsupported(kind, value))?;
        let members = items
            .iter()
            .map(|item_value| self.encode(item_value, item))
            .collect::<Result<Vec<_>>>()?;
        Ok(join(members, sort))
    }

    fn encode_choice(&self, value: &Value, alternatives: &[Field]) -> Result<Vec<u8>> {
        let Value::Choice(name, inner) = value else {
            return Err(Asn1DerError::UnsupportedValue {
                expected: "CHOICE".to_owned(),
                found: value.type_name(),
            });
        };

        let alternative = alternatives
            .iter()
            .find(|alternative| alternative.name == *name)
            .ok_or_else(|| Asn1DerError::UnknownAlternative { name: name.clone() })?;

        let inner = self.encode_hook(name, inner)?;
        self.encode(&inner, &alternative.schema)
    }

    fn encode_any(&self, value: &Value) -> Result<Vec<u8>> {
        let kind = match value {
            Value::Any(Any::Resolved(tag, inner)) => {
                let kind = Kind::from_universal(tag.number()).ok_or_else(|| unsupported(&Kind::Any, value))?;
                return self.encode_untagged(inner, &Schema::new(kind));
            }
            Value::Choice(name, inner) => {
                let kind =
                    Kind::from_any_name(name).ok_or_else(|| Asn1DerError::UnknownAlternative { name: name.clone() })?;
                return self.encode_untagged(inner, &Schema::new(kind));
            }
            Value::Null => Kind::Null,
            Value::Boolean(_) => Kind::Boolean,
            Value::Integer(_) => Kind::Integer,
            Value::Oid(_) => Kind::ObjectIdentifier,
            Value::OctetString(_) => Kind::OctetString,
            Value::BitString(_) => Kind::BitString,
            Value::Time(time) => match time.kind() {
                TimeKind::UtcTime if time.encode_utc_time().is_ok() => Kind::UtcTime,
                _ => Kind::GeneralizedTime,
            },
            Value::String(_) => self.options.default_any_string.clone(),
            other => return Err(unsupported(&Kind::Any, other)),
        };

        self.encode_untagged(value, &Schema::new(kind))
    }

    fn encode_scalar(&self, value: &Value, schema: &Schema) -> Result<Vec<u8>> {
        let kind = schema.kind();
        let content = match (kind, value) {
            (Kind::Boolean, Value::Boolean(b)) => vec![if *b { 0xFF } else { 0x00 }],
            (Kind::Integer | Kind::Enumerated, Value::Integer(i)) => signed_bytes(i),
            (Kind::Integer | Kind::Enumerated, Value::Label(label)) => {
                let i = schema
                    .value_of(label)
                    .ok_or_else(|| Asn1DerError::UnknownLabel { label: label.clone() })?;
                signed_bytes(i)
            }
            (Kind::Null, Value::Null) => Vec::new(),
            (Kind::ObjectIdentifier, Value::Oid(oid)) => encode_oid(oid)?,
            (Kind::BitString, Value::BitString(bits)) => {
                let mut content = Vec::with_capacity(bits.payload().len() + 1);
                content.push(bits.unused_bits());
                content.extend_from_slice(bits.payload());
                content
            }
            (Kind::BitString, Value::NamedBits(names)) => named_bits(names, schema)?,
            (Kind::OctetString, Value::OctetString(bytes)) => bytes.clone(),
            (Kind::UtcTime, Value::Time(time)) => time.encode_utc_time()?,
            (Kind::GeneralizedTime, Value::Time(time)) => time.encode_generalized_time(),
            (kind, Value::String(text)) if kind.is_character_string() || *kind == Kind::Utf8String => {
                string::encode(kind, text)?
            }
            (kind, value) => return Err(unsupported(kind, value)),
        };
        Ok(content)
    }
}

fn unsupported(kind: &Kind, value: &Value) -> Asn1DerError {
    Asn1DerError::UnsupportedValue {
        expected: kind.describe(),
        found: value.type_name(),
    }
}

fn tlv(tag: Tag, content: &[u8]) -> Vec<u8> {
    let mut out = tag.identifier_octets();
    Length::serialize(content.len(), &mut out);
    out.extend_from_slice(content);
    out
}

/// Swaps the identifier of a complete encoding, keeping its constructed bit.
fn implicit(encoded: &[u8], retag: Retag) -> Result<Vec<u8>> {
    let node = decode_tlv(encoded, 0)?;
    let content = &encoded[node.start + node.header_len..node.end()];
    let tag = Tag::new(retag.class, node.tag.is_constructed(), retag.number);
    Ok(tlv(tag, content))
}

fn join(mut members: Vec<Vec<u8>>, sort: bool) -> Vec<u8> {
    if sort {
        members.sort_by(|a, b| der_set_order(a, b));
    }
    members.concat()
}

fn signed_bytes(i: &num_bigint_dig::BigInt) -> Vec<u8> {
    let bytes = i.to_signed_bytes_be();
    if bytes.is_empty() {
        vec![0x00]
    } else {
        bytes
    }
}

/// Named bits as a BIT STRING without trailing zero bits, padded to the schema's minimum.
fn named_bits(names: &[String], schema: &Schema) -> Result<Vec<u8>> {
    let table = schema.bit_names();
    let indices = names
        .iter()
        .map(|name| {
            table
                .iter()
                .position(|candidate| candidate == name)
                .ok_or_else(|| Asn1DerError::UnknownBit { name: name.clone() })
        })
        .collect::<Result<Vec<_>>>()?;

    let used = indices.iter().max().map(|highest| highest + 1).unwrap_or(0);
    let bit_count = used.max(schema.min_bit_count());
    if bit_count == 0 {
        return Ok(vec![0x00]);
    }

    let octets = bit_count.div_ceil(8);
    let mut content = vec![0u8; octets + 1];
    content[0] = (octets * 8 - bit_count) as u8;
    for index in indices {
        content[1 + index / 8] |= 0x80 >> (index % 8);
    }
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::de::map::from_der;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use tessera_asn1::Asn1Time;

    #[rstest]
    #[case(127, &[0x04, 0x7F])]
    #[case(128, &[0x04, 0x81, 0x80])]
    #[case(256, &[0x04, 0x82, 0x01, 0x00])]
    fn length_boundaries(#[case] len: usize, #[case] header: &[u8]) {
        let der = to_der(&Value::OctetString(vec![0xAB; len]), &Schema::octet_string()).unwrap();
        assert_eq!(&der[..header.len()], header);
        assert_eq!(der.len(), header.len() + len);
    }

    #[test]
    fn integers_are_minimal_twos_complement() {
        let schema = Schema::integer();
        assert_eq!(to_der(&Value::integer(0), &schema).unwrap(), [0x02, 0x01, 0x00]);
        assert_eq!(to_der(&Value::integer(128), &schema).unwrap(), [0x02, 0x02, 0x00, 0x80]);
        assert_eq!(to_der(&Value::integer(-129), &schema).unwrap(), [0x02, 0x02, 0xFF, 0x7F]);
    }

    #[test]
    fn set_of_members_are_sorted() {
        let schema = Schema::set_of(Schema::integer());
        let value = Value::List(vec![Value::integer(300), Value::integer(5), Value::integer(2)]);
        assert_eq!(
            to_der(&value, &schema).unwrap(),
            [0x31, 0x0A, 0x02, 0x01, 0x02, 0x02, 0x01, 0x05, 0x02, 0x02, 0x01, 0x2C]
        );
    }

    #[test]
    fn defaults_are_omitted() {
        let schema = Schema::sequence([
            Field::new(
                "version",
                Schema::integer()
                    .labels([(0, "v1"), (2, "v3")])
                    .explicit(0)
                    .default_value(Value::Label("v1".to_owned())),
            ),
            Field::new("critical", Schema::boolean().default_value(Value::Boolean(false))),
        ]);

        let defaults = Value::sequence([("version", Value::integer(0)), ("critical", Value::Boolean(false))]);
        assert_eq!(to_der(&defaults, &schema).unwrap(), [0x30, 0x00]);

        let v3 = Value::sequence([("version", Value::Label("v3".to_owned()))]);
        assert_eq!(
            to_der(&v3, &schema).unwrap(),
            [0x30, 0x05, 0xA0, 0x03, 0x02, 0x01, 0x02]
        );
    }

    #[test]
    fn implicit_tag_keeps_constructed_bit() {
        let schema = Schema::sequence([Field::new("a", Schema::null())]).implicit(1);
        let value = Value::sequence([("a", Value::Null)]);
        assert_eq!(to_der(&value, &schema).unwrap(), [0xA1, 0x02, 0x05, 0x00]);

        let schema = Schema::ia5_string().implicit(2);
        assert_eq!(
            to_der(&Value::string("a.b"), &schema).unwrap(),
            [0x82, 0x03, 0x61, 0x2E, 0x62]
        );
    }

    #[test]
    fn tagged_choice_is_explicit() {
        let schema = Schema::choice([
            Field::new("utcTime", Schema::utc_time()),
            Field::new("generalTime", Schema::generalized_time()),
        ])
        .implicit(0);
        let time = Asn1Time::from_ymd_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let der = to_der(&Value::choice("utcTime", Value::Time(time)), &schema).unwrap();
        assert_eq!(&der[..4], &[0xA0, 0x0F, 0x17, 0x0D]);
        assert_eq!(from_der(&der, &schema).unwrap(), Value::choice("utcTime", Value::Time(time)));
    }

    #[test]
    fn unknown_alternative() {
        let schema = Schema::choice([Field::new("dNSName", Schema::ia5_string().implicit(2))]);
        let err = to_der(&Value::choice("nope", Value::Null), &schema).unwrap_err();
        assert_eq!(err, Asn1DerError::UnknownAlternative { name: "nope".to_owned() });
    }

    #[test]
    fn named_bits_drop_trailing_zeros() {
        let schema = Schema::bit_string().named_bits(["digitalSignature", "nonRepudiation", "keyEncipherment"]);
        let value = Value::NamedBits(vec!["keyEncipherment".to_owned(), "digitalSignature".to_owned()]);
        assert_eq!(to_der(&value, &schema).unwrap(), [0x03, 0x02, 0x05, 0xA0]);
        assert_eq!(to_der(&Value::NamedBits(vec![]), &schema).unwrap(), [0x03, 0x01, 0x00]);

        let padded = schema.clone().min_bits(9);
        assert_eq!(
            to_der(&Value::NamedBits(vec!["digitalSignature".to_owned()]), &padded).unwrap(),
            [0x03, 0x03, 0x07, 0x80, 0x00]
        );

        let err = to_der(&Value::NamedBits(vec!["bogus".to_owned()]), &schema).unwrap_err();
        assert_eq!(err, Asn1DerError::UnknownBit { name: "bogus".to_owned() });
    }

    #[test]
    fn any_strings_follow_options() {
        let value = Value::string("hi");
        assert_eq!(to_der(&value, &Schema::any()).unwrap(), [0x0C, 0x02, 0x68, 0x69]);

        let encoder = Encoder::new().with_options(EncodeOptions {
            default_any_string: Kind::PrintableString,
        });
        assert_eq!(
            encoder.encode(&value, &Schema::any()).unwrap(),
            [0x13, 0x02, 0x68, 0x69]
        );

        let typed = Value::choice("ia5String", Value::string("hi"));
        assert_eq!(to_der(&typed, &Schema::any()).unwrap(), [0x16, 0x02, 0x68, 0x69]);
    }

    #[test]
    fn any_time_follows_the_2050_rule() {
        let before = Asn1Time::from_ymd_hms(2049, 12, 31, 23, 59, 59).unwrap();
        let after = Asn1Time::from_ymd_hms(2050, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(to_der(&Value::Time(before), &Schema::any()).unwrap()[0], 0x17);
        assert_eq!(to_der(&Value::Time(after), &Schema::any()).unwrap()[0], 0x18);
    }

    #[test]
    fn opaque_elements_are_written_verbatim() {
        let schema = Schema::sequence([Field::new("parameters", Schema::any())]);
        let value = Value::sequence([("parameters", Value::opaque(vec![0x30, 0x03, 0x02, 0x01, 0x01]))]);
        assert_eq!(
            to_der(&value, &schema).unwrap(),
            [0x30, 0x05, 0x30, 0x03, 0x02, 0x01, 0x01]
        );
    }

    #[test]
    fn missing_required_field() {
        let schema = Schema::sequence([Field::new("serialNumber", Schema::integer())]);
        let err = to_der(&Value::sequence(Vec::<(String, Value)>::new()), &schema).unwrap_err();
        assert_eq!(
            err,
            Asn1DerError::MissingField {
                field: "serialNumber".to_owned()
            }
        );
    }

    #[test]
    fn ascii_only_types_reject_other_text() {
        let err = to_der(&Value::string("é"), &Schema::printable_string()).unwrap_err();
        assert!(matches!(err, Asn1DerError::InvalidString { .. }));
    }
}
