//! Declarative description of an expected ASN.1 shape.
//!
//! A [`Schema`] is plain data: the same value drives decoding (mapping a parse tree
//! into a [`Value`]) and encoding (turning a [`Value`] back into DER).

use crate::tag::{Tag, TagClass};
use crate::value::Value;
use num_bigint_dig::BigInt;

/// Underlying ASN.1 type of a schema node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Kind {
    Boolean,
    Integer,
    BitString,
    OctetString,
    Null,
    ObjectIdentifier,
    Enumerated,
    Utf8String,
    NumericString,
    PrintableString,
    TeletexString,
    VideotexString,
    Ia5String,
    UtcTime,
    GeneralizedTime,
    GraphicString,
    VisibleString,
    GeneralString,
    UniversalString,
    BmpString,
    Sequence(Vec<Field>),
    Set(Vec<Field>),
    SequenceOf(Box<Schema>),
    SetOf(Box<Schema>),
    Choice(Vec<Field>),
    Any,
}

impl Kind {
    /// Universal tag number, `None` for CHOICE and ANY.
    pub fn universal_number(&self) -> Option<u32> {
        let number = match self {
            Kind::Boolean => 0x01,
            Kind::Integer => 0x02,
            Kind::BitString => 0x03,
            Kind::OctetString => 0x04,
            Kind::Null => 0x05,
            Kind::ObjectIdentifier => 0x06,
            Kind::Enumerated => 0x0A,
            Kind::Utf8String => 0x0C,
            Kind::Sequence(_) | Kind::SequenceOf(_) => 0x10,
            Kind::Set(_) | Kind::SetOf(_) => 0x11,
            Kind::NumericString => 0x12,
            Kind::PrintableString => 0x13,
            Kind::TeletexString => 0x14,
            Kind::VideotexString => 0x15,
            Kind::Ia5String => 0x16,
            Kind::UtcTime => 0x17,
            Kind::GeneralizedTime => 0x18,
            Kind::GraphicString => 0x19,
            Kind::VisibleString => 0x1A,
            Kind::GeneralString => 0x1B,
            Kind::UniversalString => 0x1C,
            Kind::BmpString => 0x1E,
            Kind::Choice(_) | Kind::Any => return None,
        };
        Some(number)
    }

    /// Universal tag used when the node isn't re-tagged.
    pub fn universal_tag(&self) -> Option<Tag> {
        let number = self.universal_number()?;
        Some(Tag::universal(number).with_constructed(self.is_constructed()))
    }

    pub fn is_constructed(&self) -> bool {
        matches!(
            self,
            Kind::Sequence(_) | Kind::Set(_) | Kind::SequenceOf(_) | Kind::SetOf(_)
        )
    }

    /// Primitive kinds an ANY value resolves to when it carries their universal tag.
    pub fn from_universal(number: u32) -> Option<Kind> {
        let kind = match number {
            0x01 => Kind::Boolean,
            0x02 => Kind::Integer,
            0x03 => Kind::BitString,
            0x04 => Kind::OctetString,
            0x05 => Kind::Null,
            0x06 => Kind::ObjectIdentifier,
            0x0A => Kind::Enumerated,
            0x0C => Kind::Utf8String,
            0x12 => Kind::NumericString,
            0x13 => Kind::PrintableString,
            0x14 => Kind::TeletexString,
            0x15 => Kind::VideotexString,
            0x16 => Kind::Ia5String,
            0x17 => Kind::UtcTime,
            0x18 => Kind::GeneralizedTime,
            0x19 => Kind::GraphicString,
            0x1A => Kind::VisibleString,
            0x1B => Kind::GeneralString,
            0x1C => Kind::UniversalString,
            0x1E => Kind::BmpString,
            _ => return None,
        };
        Some(kind)
    }

    /// Character string types; those may stand in for each other on decode.
    pub fn is_character_string(&self) -> bool {
        self.universal_number().is_some_and(is_character_string_number)
    }

    /// Name of a primitive kind as used for typed ANY values (`ia5String`, `utcTime`, ...).
    pub fn any_name(&self) -> Option<&'static str> {
        let name = match self {
            Kind::Boolean => "boolean",
            Kind::Integer => "integer",
            Kind::BitString => "bitString",
            Kind::OctetString => "octetString",
            Kind::Null => "null",
            Kind::ObjectIdentifier => "objectIdentifier",
            Kind::Enumerated => "enumerated",
            Kind::Utf8String => "utf8String",
            Kind::NumericString => "numericString",
            Kind::PrintableString => "printableString",
            Kind::TeletexString => "teletexString",
            Kind::VideotexString => "videotexString",
            Kind::Ia5String => "ia5String",
            Kind::UtcTime => "utcTime",
            Kind::GeneralizedTime => "generalTime",
            Kind::GraphicString => "graphicString",
            Kind::VisibleString => "visibleString",
            Kind::GeneralString => "generalString",
            Kind::UniversalString => "universalString",
            Kind::BmpString => "bmpString",
            _ => return None,
        };
        Some(name)
    }

    pub fn from_any_name(name: &str) -> Option<Kind> {
        (0x01..=0x1E)
            .filter_map(Kind::from_universal)
            .find(|kind| kind.any_name() == Some(name))
    }

    /// Human readable name for diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Kind::Choice(_) => "CHOICE".to_owned(),
            Kind::Any => "ANY".to_owned(),
            Kind::SequenceOf(_) => "SEQUENCE OF".to_owned(),
            Kind::SetOf(_) => "SET OF".to_owned(),
            other => other
                .universal_tag()
                .map(|tag| tag.to_string())
                .unwrap_or_else(|| "UNKNOWN".to_owned()),
        }
    }
}

/// NumericString (18) to BMPString (30), without the two time types.
pub fn is_character_string_number(number: u32) -> bool {
    (0x12..=0x1E).contains(&number) && number != 0x17 && number != 0x18
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tagging {
    Implicit,
    Explicit,
}

/// Tag override carried by a schema node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Retag {
    pub mode: Tagging,
    pub class: TagClass,
    pub number: u32,
}

impl Retag {
    /// Whether the tagged encoding wraps the inner TLV instead of replacing its identifier.
    ///
    /// CHOICE and ANY have no identifier of their own, so tagging them is always explicit.
    pub fn wraps(&self, kind: &Kind) -> bool {
        self.mode == Tagging::Explicit || matches!(kind, Kind::Choice(_) | Kind::Any)
    }

    pub fn matches(&self, tag: Tag) -> bool {
        tag.class() == self.class && tag.number() == self.number
    }
}

/// A named member of a SEQUENCE, SET or CHOICE.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub schema: Schema,
}

impl Field {
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Schema {
    kind: Kind,
    retag: Option<Retag>,
    optional: bool,
    default: Option<Value>,
    labels: Vec<(BigInt, String)>,
    named_bits: Vec<String>,
    min_bits: usize,
}

macro_rules! primitive_constructors {
    ( $( $fn_name:ident => $kind:ident, )+ ) => {
        $(
            pub fn $fn_name() -> Self {
                Self::new(Kind::$kind)
            }
        )+
    };
}

impl Schema {
    pub fn new(kind: Kind) -> Self {
        Self {
            kind,
            retag: None,
            optional: false,
            default: None,
            labels: Vec::new(),
            named_bits: Vec::new(),
            min_bits: 0,
        }
    }

    primitive_constructors! {
        boolean => Boolean,
        integer => Integer,
        bit_string => BitString,
        octet_string => OctetString,
        null => Null,
        object_identifier => ObjectIdentifier,
        enumerated => Enumerated,
        utf8_string => Utf8String,
        numeric_string => NumericString,
        printable_string => PrintableString,
        teletex_string => TeletexString,
        videotex_string => VideotexString,
        ia5_string => Ia5String,
        utc_time => UtcTime,
        generalized_time => GeneralizedTime,
        graphic_string => GraphicString,
        visible_string => VisibleString,
        general_string => GeneralString,
        universal_string => UniversalString,
        bmp_string => BmpString,
        any => Any,
    }

    pub fn sequence(fields: impl IntoIterator<Item = Field>) -> Self {
        Self::new(Kind::Sequence(fields.into_iter().collect()))
    }

    pub fn set(fields: impl IntoIterator<Item = Field>) -> Self {
        Self::new(Kind::Set(fields.into_iter().collect()))
    }

    pub fn sequence_of(item: Schema) -> Self {
        Self::new(Kind::SequenceOf(Box::new(item)))
    }

    pub fn set_of(item: Schema) -> Self {
        Self::new(Kind::SetOf(Box::new(item)))
    }

    pub fn choice(alternatives: impl IntoIterator<Item = Field>) -> Self {
        Self::new(Kind::Choice(alternatives.into_iter().collect()))
    }

    /// `[number] EXPLICIT`, context-specific.
    pub fn explicit(self, number: u32) -> Self {
        self.tagged(Tagging::Explicit, TagClass::ContextSpecific, number)
    }

    /// `[number] IMPLICIT`, context-specific.
    pub fn implicit(self, number: u32) -> Self {
        self.tagged(Tagging::Implicit, TagClass::ContextSpecific, number)
    }

    pub fn tagged(mut self, mode: Tagging, class: TagClass, number: u32) -> Self {
        self.retag = Some(Retag { mode, class, number });
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// A DEFAULT value; implies OPTIONAL.
    pub fn default_value(mut self, value: Value) -> Self {
        self.optional = true;
        self.default = Some(value);
        self
    }

    /// Value → label table for INTEGER and ENUMERATED.
    pub fn labels<'a>(mut self, labels: impl IntoIterator<Item = (i64, &'a str)>) -> Self {
        self.labels = labels
            .into_iter()
            .map(|(value, label)| (BigInt::from(value), label.to_owned()))
            .collect();
        self
    }

    /// Bit names for a BIT STRING, most significant bit first.
    pub fn named_bits<'a>(mut self, names: impl IntoIterator<Item = &'a str>) -> Self {
        self.named_bits = names.into_iter().map(str::to_owned).collect();
        self
    }

    /// Minimum number of bits written for a named-bit BIT STRING.
    pub fn min_bits(mut self, min_bits: usize) -> Self {
        self.min_bits = min_bits;
        self
    }

    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    pub fn retag(&self) -> Option<Retag> {
        self.retag
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn label_of(&self, value: &BigInt) -> Option<&str> {
        self.labels
            .iter()
            .find(|(candidate, _)| candidate == value)
            .map(|(_, label)| label.as_str())
    }

    pub fn value_of(&self, label: &str) -> Option<&BigInt> {
        self.labels
            .iter()
            .find(|(_, candidate)| candidate == label)
            .map(|(value, _)| value)
    }

    pub fn has_labels(&self) -> bool {
        !self.labels.is_empty()
    }

    pub fn bit_names(&self) -> &[String] {
        &self.named_bits
    }

    pub fn min_bit_count(&self) -> usize {
        self.min_bits
    }

    /// Named member of a SEQUENCE, SET or CHOICE.
    pub fn field(&self, name: &str) -> Option<&Schema> {
        match &self.kind {
            Kind::Sequence(fields) | Kind::Set(fields) | Kind::Choice(fields) => {
                fields.iter().find(|field| field.name == name).map(|field| &field.schema)
            }
            _ => None,
        }
    }

    /// Item schema of a SEQUENCE OF or SET OF.
    pub fn item(&self) -> Option<&Schema> {
        match &self.kind {
            Kind::SequenceOf(item) | Kind::SetOf(item) => Some(item),
            _ => None,
        }
    }

    /// Identifier the encoding of this node starts with, `None` when it depends on the value.
    pub fn outer_tag(&self) -> Option<Tag> {
        match self.retag {
            Some(retag) if retag.wraps(&self.kind) => Some(Tag::new(retag.class, true, retag.number)),
            Some(retag) => Some(Tag::new(retag.class, self.kind.is_constructed(), retag.number)),
            None => self.kind.universal_tag(),
        }
    }
}
