//! Typed values produced by the schema-directed mapper and consumed by the encoder.

use crate::date::Asn1Time;
use crate::tag::Tag;
use num_bigint_dig::BigInt;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::fmt;

/// One node of a typed value tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(BigInt),
    /// INTEGER or ENUMERATED translated through the schema's label table
    Label(String),
    BitString(BitString),
    /// BIT STRING expanded through the schema's named-bit table
    NamedBits(Vec<String>),
    OctetString(#[serde(serialize_with = "as_hex")] Vec<u8>),
    /// dotted-decimal OBJECT IDENTIFIER
    Oid(String),
    String(String),
    Time(Asn1Time),
    Sequence(Fields),
    List(Vec<Value>),
    /// selected CHOICE alternative
    Choice(String, Box<Value>),
    Any(Any),
}

/// Value of an ANY field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Any {
    /// universal primitive resolved to its concrete type
    Resolved(Tag, Box<Value>),
    /// raw encoding kept as-is
    Opaque(Element),
}

/// A complete, already encoded TLV.
#[derive(Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Element(#[serde(serialize_with = "as_hex")] Vec<u8>);

impl Element {
    pub fn new(der: Vec<u8>) -> Self {
        Self(der)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Element(")?;
        for byte in &self.0 {
            write!(f, "{byte:02X}")?;
        }
        write!(f, ")")
    }
}

/// Raw BIT STRING: payload plus the count of unused bits in its last octet.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct BitString {
    unused_bits: u8,
    #[serde(serialize_with = "as_hex")]
    data: Vec<u8>,
}

impl BitString {
    pub fn new(unused_bits: u8, data: Vec<u8>) -> Self {
        Self { unused_bits, data }
    }

    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { unused_bits: 0, data }
    }

    pub fn unused_bits(&self) -> u8 {
        self.unused_bits
    }

    pub fn payload(&self) -> &[u8] {
        &self.data
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.data
    }

    pub fn bit_len(&self) -> usize {
        (self.data.len() * 8).saturating_sub(usize::from(self.unused_bits))
    }

    /// Bit `index` counted from the most significant bit of the first octet.
    pub fn is_set(&self, index: usize) -> bool {
        index < self.bit_len() && self.data[index / 8] & (0x80 >> (index % 8)) != 0
    }
}

/// Ordered name → value pairs of a SEQUENCE or SET.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Fields(Vec<(String, Value)>);

impl Fields {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.iter().find(|(key, _)| key == name).map(|(_, value)| value)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.0.iter_mut().find(|(key, _)| key == name).map(|(_, value)| value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Replaces an existing entry in place or appends a new one.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        let name = name.into();
        match self.get_mut(&name) {
            Some(slot) => Some(std::mem::replace(slot, value)),
            None => {
                self.0.push((name, value));
                None
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let position = self.0.iter().position(|(key, _)| key == name)?;
        Some(self.0.remove(position).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, Value)> for Fields {
    fn from_iter<T: IntoIterator<Item = (S, Value)>>(iter: T) -> Self {
        let mut fields = Fields::new();
        for (name, value) in iter {
            fields.insert(name, value);
        }
        fields
    }
}

impl Serialize for Fields {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

fn as_hex<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut hex = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        hex.push_str(&format!("{byte:02x}"));
    }
    serializer.serialize_str(&hex)
}

impl Value {
    pub fn integer(value: impl Into<BigInt>) -> Self {
        Value::Integer(value.into())
    }

    pub fn string(value: impl Into<String>) -> Self {
        Value::String(value.into())
    }

    pub fn oid(dotted: impl Into<String>) -> Self {
        Value::Oid(dotted.into())
    }

    pub fn choice(alternative: impl Into<String>, value: Value) -> Self {
        Value::Choice(alternative.into(), Box::new(value))
    }

    pub fn sequence<S: Into<String>>(fields: impl IntoIterator<Item = (S, Value)>) -> Self {
        Value::Sequence(fields.into_iter().collect())
    }

    pub fn opaque(der: Vec<u8>) -> Self {
        Value::Any(Any::Opaque(Element::new(der)))
    }

    pub fn resolved(tag: Tag, value: Value) -> Self {
        Value::Any(Any::Resolved(tag, Box::new(value)))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<&BigInt> {
        match self {
            Value::Integer(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_label(&self) -> Option<&str> {
        match self {
            Value::Label(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_oid(&self) -> Option<&str> {
        match self {
            Value::Oid(oid) => Some(oid),
            _ => None,
        }
    }

    pub fn as_octet_string(&self) -> Option<&[u8]> {
        match self {
            Value::OctetString(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_bit_string(&self) -> Option<&BitString> {
        match self {
            Value::BitString(bits) => Some(bits),
            _ => None,
        }
    }

    pub fn as_named_bits(&self) -> Option<&[String]> {
        match self {
            Value::NamedBits(names) => Some(names),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<&Asn1Time> {
        match self {
            Value::Time(time) => Some(time),
            _ => None,
        }
    }

    pub fn as_fields(&self) -> Option<&Fields> {
        match self {
            Value::Sequence(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_fields_mut(&mut self) -> Option<&mut Fields> {
        match self {
            Value::Sequence(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_choice(&self) -> Option<(&str, &Value)> {
        match self {
            Value::Choice(name, value) => Some((name, value)),
            _ => None,
        }
    }

    pub fn as_any(&self) -> Option<&Any> {
        match self {
            Value::Any(any) => Some(any),
            _ => None,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Value::Any(Any::Opaque(element)) => Some(element),
            _ => None,
        }
    }

    /// Looks through a resolved ANY or a CHOICE to the value it carries.
    pub fn unwrap_any(&self) -> &Value {
        match self {
            Value::Any(Any::Resolved(_, inner)) => inner.unwrap_any(),
            Value::Choice(_, inner) => inner.unwrap_any(),
            other => other,
        }
    }

    /// Follows a `/`-separated path of field names, list indices and CHOICE
    /// alternative names, e.g. `tbsCertificate/validity/notBefore/utcTime`.
    pub fn pointer(&self, path: &str) -> Option<&Value> {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .try_fold(self, |current, segment| current.child(segment))
    }

    pub fn pointer_mut(&mut self, path: &str) -> Option<&mut Value> {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .try_fold(self, |current, segment| current.child_mut(segment))
    }

    fn child(&self, segment: &str) -> Option<&Value> {
        match self {
            Value::Sequence(fields) => fields.get(segment),
            Value::List(items) => items.get(segment.parse::<usize>().ok()?),
            Value::Choice(name, inner) if name == segment => Some(inner.as_ref()),
            _ => None,
        }
    }

    fn child_mut(&mut self, segment: &str) -> Option<&mut Value> {
        match self {
            Value::Sequence(fields) => fields.get_mut(segment),
            Value::List(items) => items.get_mut(segment.parse::<usize>().ok()?),
            Value::Choice(name, inner) if name == segment => Some(inner.as_mut()),
            _ => None,
        }
    }

    /// Short type name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Label(_) => "label",
            Value::BitString(_) => "bit string",
            Value::NamedBits(_) => "named bits",
            Value::OctetString(_) => "octet string",
            Value::Oid(_) => "object identifier",
            Value::String(_) => "string",
            Value::Time(_) => "time",
            Value::Sequence(_) => "sequence",
            Value::List(_) => "list",
            Value::Choice(..) => "choice",
            Value::Any(Any::Resolved(..)) => "resolved any",
            Value::Any(Any::Opaque(_)) => "element",
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<BigInt> for Value {
    fn from(i: BigInt) -> Self {
        Value::Integer(i)
    }
}

impl From<Asn1Time> for Value {
    fn from(time: Asn1Time) -> Self {
        Value::Time(time)
    }
}

impl From<Fields> for Value {
    fn from(fields: Fields) -> Self {
        Value::Sequence(fields)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn validity() -> Value {
        Value::sequence([
            (
                "notBefore",
                Value::choice("utcTime", Asn1Time::from_ymd_hms(2024, 1, 1, 0, 0, 0).unwrap().into()),
            ),
            ("notAfter", Value::choice("generalTime", Asn1Time::from_ymd_hms(2055, 1, 1, 0, 0, 0).unwrap().into())),
        ])
    }

    #[test]
    fn pointer_walks_fields_lists_and_choices() {
        let value = Value::sequence([("validity", validity()), ("list", Value::List(vec![Value::Null, true.into()]))]);

        assert_eq!(
            value.pointer("validity/notAfter/generalTime").and_then(Value::as_time).map(Asn1Time::year),
            Some(2055)
        );
        assert_eq!(value.pointer("list/1"), Some(&Value::Boolean(true)));
        assert_eq!(value.pointer("validity/notAfter/utcTime"), None);
        assert_eq!(value.pointer("list/7"), None);
        assert_eq!(value.pointer(""), Some(&value));
    }

    #[test]
    fn pointer_mut_edits_in_place() {
        let mut value = validity();
        *value.pointer_mut("notBefore/utcTime").unwrap() = Value::Null;
        assert_eq!(value.pointer("notBefore/utcTime"), Some(&Value::Null));
    }

    #[test]
    fn fields_keep_insertion_order() {
        let mut fields: Fields = [("b", Value::Null), ("a", Value::Null)].into_iter().collect();
        fields.insert("b", true.into());
        fields.insert("c", false.into());
        assert_eq!(fields.names().collect::<Vec<_>>(), ["b", "a", "c"]);
        assert_eq!(fields.remove("a"), Some(Value::Null));
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn bit_string_bits() {
        let bits = BitString::new(3, vec![0b1010_0000, 0b0010_0000]);
        assert_eq!(bits.bit_len(), 13);
        assert!(bits.is_set(0));
        assert!(!bits.is_set(1));
        assert!(bits.is_set(10));
        assert!(!bits.is_set(13));
    }

    #[test]
    fn serializes_to_json() {
        let value = Value::sequence([
            ("serial", Value::integer(42)),
            ("key", Value::OctetString(vec![0xDE, 0xAD])),
            ("any", Value::opaque(vec![0x05, 0x00])),
        ]);
        let json = serde_json::to_string(&value).unwrap();
        assert!(json.contains("\"dead\""), "{json}");
        assert!(json.contains("\"0500\""), "{json}");
    }
}
