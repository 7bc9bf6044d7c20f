//! Schema-directed mapping of a [`Node`] tree into a typed [`Value`].
//!
//! Inside the mapper, `Ok(None)` means "this element doesn't have the expected shape";
//! that's how optional fields and CHOICE alternatives get skipped. Errors are reserved
//! for content that is broken whatever the schema says (a truncated OID, an empty
//! INTEGER, ...).

use crate::de::node::{Content, Node};
use crate::de::{decode_ber, reassemble};
use crate::hooks::Hooks;
use crate::{string, Asn1DerError, Result};
use num_bigint_dig::BigInt;
use std::borrow::Cow;
use tessera_asn1::schema::is_character_string_number;
use tessera_asn1::{decode_oid, Asn1Time, BitString, Field, Fields, Kind, Schema, Tag, Value};

/// Decodes `buf` and maps it against `schema`.
pub fn from_der(buf: &[u8], schema: &Schema) -> Result<Value> {
    let node = decode_ber(buf)?;
    Mapper::new(buf).map(&node, schema)
}

/// Same as [`from_der`], running `hooks` on the fields they name.
pub fn from_der_with_hooks(buf: &[u8], schema: &Schema, hooks: &Hooks) -> Result<Value> {
    let node = decode_ber(buf)?;
    Mapper::new(buf).with_hooks(hooks).map(&node, schema)
}

/// Maps an already decoded `node` of `buf` against `schema`.
pub fn map(buf: &[u8], node: &Node, schema: &Schema) -> Result<Value> {
    Mapper::new(buf).map(node, schema)
}

pub struct Mapper<'a> {
    buf: &'a [u8],
    hooks: Option<&'a Hooks>,
}

impl<'a> Mapper<'a> {
    /// `buf` is the input the nodes were decoded from; ANY values keep raw slices of it.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, hooks: None }
    }

    pub fn with_hooks(mut self, hooks: &'a Hooks) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn map(&self, node: &Node, schema: &Schema) -> Result<Value> {
        self.map_node(node, schema)?.ok_or_else(|| Asn1DerError::NoMatch {
            expected: schema.kind().describe(),
        })
    }

    /// Maps `node`, returning `None` when it doesn't fit the schema.
    pub fn map_node(&self, node: &Node, schema: &Schema) -> Result<Option<Value>> {
        let kind = schema.kind();

        match schema.retag() {
            Some(retag) if !retag.matches(node.tag) => Ok(None),
            Some(retag) if retag.wraps(kind) => match node.children() {
                [inner] if node.is_constructed() => self.map_untagged(inner, schema),
                _ => Ok(None),
            },
            Some(_) => self.map_content(node, schema),
            None => self.map_untagged(node, schema),
        }
    }

    fn map_untagged(&self, node: &Node, schema: &Schema) -> Result<Option<Value>> {
        match schema.kind() {
            Kind::Choice(alternatives) => self.map_choice(node, alternatives),
            Kind::Any => self.map_any(node).map(Some),
            kind if universal_compatible(node.tag, kind) => self.map_content(node, schema),
            _ => Ok(None),
        }
    }

    fn map_field(&self, node: &Node, field: &Field) -> Result<Option<Value>> {
        match self.map_node(node, &field.schema)? {
            Some(value) => self.decode_hook(&field.name, value).map(Some),
            None => Ok(None),
        }
    }

    fn decode_hook(&self, field: &str, value: Value) -> Result<Value> {
        match self.hooks {
            Some(hooks) => hooks.decode(field, value),
            None => Ok(value),
        }
    }

    fn map_choice(&self, node: &Node, alternatives: &[Field]) -> Result<Option<Value>> {
        for alternative in alternatives {
            let schema = &alternative.schema;
            let candidate = match (schema.retag(), schema.kind()) {
                (Some(retag), _) if retag.matches(node.tag) => self.map_node(node, schema)?,
                (Some(_), _) => None,
                (None, Kind::Choice(_) | Kind::Any) => self.map_node(node, schema)?,
                (None, kind) if node.tag.is_universal() && kind.universal_number() == Some(node.tag.number()) => {
                    self.map_node(node, schema)?
                }
                (None, _) => None,
            };

            if let Some(value) = candidate {
                debug_log!("CHOICE resolved to `{}`", alternative.name);
                let value = self.decode_hook(&alternative.name, value)?;
                return Ok(Some(Value::choice(alternative.name.clone(), value)));
            }
        }

        Ok(None)
    }

    fn map_any(&self, node: &Node) -> Result<Value> {
        let opaque = || Value::opaque(node.raw(self.buf).to_vec());

        if !node.tag.is_universal() || node.tag.is_constructed() {
            return Ok(opaque());
        }

        let Some(kind) = Kind::from_universal(node.tag.number()) else {
            return Ok(opaque());
        };

        Ok(match self.map_content(node, &Schema::new(kind))? {
            Some(value) => Value::resolved(node.tag, value),
            None => opaque(),
        })
    }

    fn map_content(&self, node: &Node, schema: &Schema) -> Result<Option<Value>> {
        let kind = schema.kind();
        debug_log!("map {} as {}", node.tag, kind.describe());

        match kind {
            Kind::Sequence(fields) => self.map_sequence(node, fields),
            Kind::Set(fields) => self.map_set(node, fields),
            Kind::SequenceOf(item) | Kind::SetOf(item) => self.map_list(node, item),
            Kind::Choice(_) | Kind::Any => self.map_untagged(node, schema),
            _ => {
                let Some(bytes) = self.primitive_bytes(node, kind)? else {
                    return Ok(None);
                };
                self.map_scalar(node, schema, &bytes).map(Some)
            }
        }
    }

    fn primitive_bytes<'n>(&self, node: &'n Node, kind: &Kind) -> Result<Option<Cow<'n, [u8]>>> {
        match &node.content {
            Content::Primitive(bytes) => Ok(Some(Cow::Borrowed(bytes.as_slice()))),
            Content::Constructed(fragments) if is_string_kind(kind) => {
                let bytes = reassemble(node.tag, fragments, node.start, *kind == Kind::BitString)?;
                Ok(Some(Cow::Owned(bytes)))
            }
            Content::Constructed(_) => Ok(None),
        }
    }

    fn map_scalar(&self, node: &Node, schema: &Schema, bytes: &[u8]) -> Result<Value> {
        let invalid = |reason: &'static str| Asn1DerError::InvalidContent {
            tag: node.tag.to_string(),
            offset: node.start,
            reason,
        };

        let value = match schema.kind() {
            Kind::Boolean => match bytes {
                [b] => Value::Boolean(*b != 0),
                _ => return Err(invalid("BOOLEAN must be one octet")),
            },
            kind @ (Kind::Integer | Kind::Enumerated) => {
                if bytes.is_empty() {
                    return Err(invalid("empty INTEGER"));
                }
                let number = BigInt::from_signed_bytes_be(bytes);
                match schema.label_of(&number) {
                    Some(label) => Value::Label(label.to_owned()),
                    None if *kind == Kind::Enumerated && schema.has_labels() => {
                        return Err(Asn1DerError::UnknownEnumerated {
                            value: number.to_string(),
                        })
                    }
                    None => Value::Integer(number),
                }
            }
            Kind::Null => {
                if !bytes.is_empty() {
                    return Err(invalid("NULL with content"));
                }
                Value::Null
            }
            Kind::ObjectIdentifier => Value::Oid(decode_oid(bytes)?),
            Kind::BitString => {
                let (unused, payload) = bytes.split_first().ok_or_else(|| invalid("empty BIT STRING"))?;
                if *unused > 7 || (*unused > 0 && payload.is_empty()) {
                    return Err(invalid("bad unused-bits count"));
                }
                let bits = BitString::new(*unused, payload.to_vec());
                if schema.bit_names().is_empty() {
                    Value::BitString(bits)
                } else {
                    Value::NamedBits(
                        schema
                            .bit_names()
                            .iter()
                            .enumerate()
                            .filter(|(index, _)| bits.is_set(*index))
                            .map(|(_, name)| name.clone())
                            .collect(),
                    )
                }
            }
            Kind::OctetString => Value::OctetString(bytes.to_vec()),
            Kind::UtcTime => Value::Time(Asn1Time::decode_utc_time(bytes)?),
            Kind::GeneralizedTime => Value::Time(Asn1Time::decode_generalized_time(bytes)?),
            kind => {
                // a universal tag tells the actual string type even when the schema names another one
                let actual = if node.tag.is_universal() {
                    Kind::from_universal(node.tag.number()).filter(is_string_kind_ref)
                } else {
                    None
                };
                let text = string::decode(actual.as_ref().unwrap_or(kind), bytes).map_err(invalid)?;
                Value::String(text)
            }
        };

        Ok(value)
    }

    fn map_sequence(&self, node: &Node, fields: &[Field]) -> Result<Option<Value>> {
        if !node.is_constructed() {
            return Ok(None);
        }

        let children = node.children();
        let mut out = Fields::new();
        let mut next = 0;

        for field in fields {
            let mapped = match children.get(next) {
                Some(child) if field_may_match(child.tag, &field.schema) => self.map_field(child, field)?,
                _ => None,
            };

            match mapped {
                Some(value) => {
                    out.insert(field.name.clone(), value);
                    next += 1;
                }
                None => match field.schema.default() {
                    Some(default) => {
                        out.insert(field.name.clone(), default.clone());
                    }
                    None if field.schema.is_optional() => {}
                    None => {
                        debug_log!("missing SEQUENCE field `{}`", field.name);
                        return Ok(None);
                    }
                },
            }
        }

        if next != children.len() {
            debug_log!("{} unexpected SEQUENCE elements", children.len() - next);
            return Ok(None);
        }

        Ok(Some(Value::Sequence(out)))
    }

    fn map_set(&self, node: &Node, fields: &[Field]) -> Result<Option<Value>> {
        if !node.is_constructed() {
            return Ok(None);
        }

        let mut assigned: Vec<Option<Value>> = vec![None; fields.len()];
        for child in node.children() {
            let mut matched = false;
            for (slot, field) in assigned.iter_mut().zip(fields) {
                if slot.is_some() || !field_may_match(child.tag, &field.schema) {
                    continue;
                }
                if let Some(value) = self.map_field(child, field)? {
                    *slot = Some(value);
                    matched = true;
                    break;
                }
            }
            if !matched {
                debug_log!("SET element {} matches no field", child.tag);
                return Ok(None);
            }
        }

        let mut out = Fields::new();
        for (slot, field) in assigned.into_iter().zip(fields) {
            match (slot, field.schema.default()) {
                (Some(value), _) => {
                    out.insert(field.name.clone(), value);
                }
                (None, Some(default)) => {
                    out.insert(field.name.clone(), default.clone());
                }
                (None, None) if field.schema.is_optional() => {}
                (None, None) => return Ok(None),
            }
        }

        Ok(Some(Value::Sequence(out)))
    }

    fn map_list(&self, node: &Node, item: &Schema) -> Result<Option<Value>> {
        if !node.is_constructed() {
            return Ok(None);
        }

        let mut items = Vec::with_capacity(node.children().len());
        for child in node.children() {
            match self.map_node(child, item)? {
                Some(value) => items.push(value),
                None => return Ok(None),
            }
        }

        Ok(Some(Value::List(items)))
    }
}

/// Cheap tag-only test whether `schema` could accept an element tagged `tag`.
fn field_may_match(tag: Tag, schema: &Schema) -> bool {
    match (schema.retag(), schema.kind()) {
        (Some(retag), _) => retag.matches(tag),
        (None, Kind::Choice(alternatives)) => alternatives
            .iter()
            .any(|alternative| field_may_match(tag, &alternative.schema)),
        (None, Kind::Any) => true,
        (None, kind) => universal_compatible(tag, kind),
    }
}

/// Universal tag matches the kind, character strings standing in for each other.
fn universal_compatible(tag: Tag, kind: &Kind) -> bool {
    if !tag.is_universal() {
        return false;
    }
    match kind.universal_number() {
        Some(number) if number == tag.number() => true,
        Some(number) => is_character_string_number(number) && is_character_string_number(tag.number()),
        None => false,
    }
}

fn is_string_kind(kind: &Kind) -> bool {
    matches!(kind, Kind::BitString | Kind::OctetString | Kind::Utf8String) || kind.is_character_string()
}

fn is_string_kind_ref(kind: &Kind) -> bool {
    *kind == Kind::Utf8String || kind.is_character_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tessera_asn1::{Any, Element};

    fn algorithm_identifier() -> Schema {
        Schema::sequence([
            Field::new("algorithm", Schema::object_identifier()),
            Field::new("parameters", Schema::any().optional()),
        ])
    }

    #[test]
    fn optional_any_absent_and_present() {
        let absent = from_der(&[0x30, 0x05, 0x06, 0x03, 0x2B, 0x65, 0x70], &algorithm_identifier()).unwrap();
        assert_eq!(absent, Value::sequence([("algorithm", Value::oid("1.3.101.112"))]));

        let present = from_der(
            &[0x30, 0x07, 0x06, 0x03, 0x2B, 0x65, 0x70, 0x05, 0x00],
            &algorithm_identifier(),
        )
        .unwrap();
        assert_eq!(
            present.pointer("parameters"),
            Some(&Value::resolved(Tag::NULL, Value::Null))
        );
    }

    #[test]
    fn any_keeps_constructed_values_opaque() {
        let schema = Schema::any();
        let value = from_der(&[0x30, 0x03, 0x02, 0x01, 0x07], &schema).unwrap();
        assert_eq!(
            value,
            Value::Any(Any::Opaque(Element::new(vec![0x30, 0x03, 0x02, 0x01, 0x07])))
        );
    }

    #[test]
    fn any_reports_broken_primitives() {
        let empty_integer = from_der(&[0x02, 0x00], &Schema::any()).unwrap_err();
        assert!(empty_integer.is_malformed(), "{empty_integer:?}");

        let truncated_oid = from_der(&[0x06, 0x02, 0x2A, 0x86], &Schema::any()).unwrap_err();
        assert!(truncated_oid.is_malformed(), "{truncated_oid:?}");

        let err = from_der(&[0x30, 0x07, 0x06, 0x03, 0x2B, 0x65, 0x70, 0x02, 0x00], &algorithm_identifier()).unwrap_err();
        assert!(err.is_malformed(), "{err:?}");
    }

    #[test]
    fn default_fills_absent_field() {
        let schema = Schema::sequence([
            Field::new(
                "version",
                Schema::integer()
                    .labels([(0, "v1"), (1, "v2"), (2, "v3")])
                    .explicit(0)
                    .default_value(Value::Label("v1".to_owned())),
            ),
            Field::new("serial", Schema::integer()),
        ]);

        let value = from_der(&[0x30, 0x03, 0x02, 0x01, 0x2A], &schema).unwrap();
        assert_eq!(value.pointer("version"), Some(&Value::Label("v1".to_owned())));

        let value = from_der(&[0x30, 0x08, 0xA0, 0x03, 0x02, 0x01, 0x02, 0x02, 0x01, 0x2A], &schema).unwrap();
        assert_eq!(value.pointer("version"), Some(&Value::Label("v3".to_owned())));
        assert_eq!(value.pointer("serial"), Some(&Value::integer(42)));
    }

    #[test]
    fn leftover_elements_do_not_match() {
        let schema = Schema::sequence([Field::new("a", Schema::boolean())]);
        let err = from_der(&[0x30, 0x06, 0x01, 0x01, 0xFF, 0x01, 0x01, 0x00], &schema).unwrap_err();
        assert!(err.is_no_match());
    }

    #[test]
    fn unknown_enumerated_is_an_error() {
        let schema = Schema::enumerated().labels([(0, "unspecified"), (1, "keyCompromise")]);
        let err = from_der(&[0x0A, 0x01, 0x07], &schema).unwrap_err();
        assert_eq!(err, Asn1DerError::UnknownEnumerated { value: "7".to_owned() });
    }

    #[test]
    fn named_bits() {
        let schema = Schema::bit_string().named_bits(["digitalSignature", "nonRepudiation", "keyEncipherment"]);
        let value = from_der(&[0x03, 0x02, 0x05, 0xA0], &schema).unwrap();
        assert_eq!(
            value,
            Value::NamedBits(vec!["digitalSignature".to_owned(), "keyEncipherment".to_owned()])
        );
    }

    #[test]
    fn character_strings_stand_in_for_each_other() {
        let schema = Schema::printable_string();
        let value = from_der(&[0x1E, 0x04, 0x00, 0x68, 0x00, 0x69], &schema).unwrap();
        assert_eq!(value, Value::string("hi"));

        // UTF8String is not part of that family
        assert!(from_der(&[0x0C, 0x02, 0x68, 0x69], &schema).unwrap_err().is_no_match());
    }

    #[test]
    fn set_is_order_independent_but_strict() {
        let schema = Schema::set([
            Field::new("flag", Schema::boolean()),
            Field::new("count", Schema::integer()),
        ]);

        let value = from_der(&[0x31, 0x06, 0x02, 0x01, 0x03, 0x01, 0x01, 0x00], &schema).unwrap();
        assert_eq!(
            value,
            Value::sequence([("flag", Value::Boolean(false)), ("count", Value::integer(3))])
        );

        let err = from_der(&[0x31, 0x08, 0x02, 0x01, 0x03, 0x01, 0x01, 0x00, 0x05, 0x00], &schema).unwrap_err();
        assert!(err.is_no_match());
    }

    #[test]
    fn explicit_tag_needs_exactly_one_child() {
        let schema = Schema::integer().explicit(0);
        assert_eq!(from_der(&[0xA0, 0x03, 0x02, 0x01, 0x05], &schema).unwrap(), Value::integer(5));
        assert!(from_der(&[0xA0, 0x00], &schema).unwrap_err().is_no_match());
    }

    #[test]
    fn implicit_constructed_octet_string() {
        let schema = Schema::octet_string().implicit(0);
        let value = from_der(&[0xA0, 0x06, 0x04, 0x01, 0xAA, 0x04, 0x01, 0xBB], &schema).unwrap();
        assert_eq!(value, Value::OctetString(vec![0xAA, 0xBB]));
    }

    #[test]
    fn hooks_run_on_named_fields() {
        fn upper(value: Value) -> Result<Value> {
            Ok(Value::string(value.as_str().unwrap_or_default().to_uppercase()))
        }

        let schema = Schema::sequence([Field::new("name", Schema::ia5_string())]);
        let hooks = Hooks::new().on_decode("name", upper);
        let value = from_der_with_hooks(&[0x30, 0x04, 0x16, 0x02, 0x6F, 0x6B], &schema, &hooks).unwrap();
        assert_eq!(value.pointer("name"), Some(&Value::string("OK")));
    }

    #[test]
    fn malformed_content_is_not_a_mismatch() {
        let err = from_der(&[0x02, 0x00], &Schema::integer()).unwrap_err();
        assert!(err.is_malformed());
        let err = from_der(&[0x05, 0x01, 0x00], &Schema::null()).unwrap_err();
        assert!(err.is_malformed());
    }
}
