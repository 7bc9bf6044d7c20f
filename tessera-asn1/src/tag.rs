use serde::Serialize;
use std::fmt;

/// The two high bits of an identifier octet.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
pub enum TagClass {
    Universal,
    Application,
    ContextSpecific,
    Private,
}

impl TagClass {
    #[inline]
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => TagClass::Universal,
            1 => TagClass::Application,
            2 => TagClass::ContextSpecific,
            _ => TagClass::Private,
        }
    }

    #[inline]
    pub const fn bits(self) -> u8 {
        match self {
            TagClass::Universal => 0,
            TagClass::Application => 1,
            TagClass::ContextSpecific => 2,
            TagClass::Private => 3,
        }
    }
}

/// A full ASN.1 identifier: class, constructed flag and tag number.
///
/// Tag numbers above 30 use the high-tag-number form when encoded.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
pub struct Tag {
    class: TagClass,
    constructed: bool,
    number: u32,
}

impl Tag {
    pub const BOOLEAN: Self = Tag::universal(0x01);
    pub const INTEGER: Self = Tag::universal(0x02);
    pub const BIT_STRING: Self = Tag::universal(0x03);
    pub const OCTET_STRING: Self = Tag::universal(0x04);
    pub const NULL: Self = Tag::universal(0x05);
    pub const OID: Self = Tag::universal(0x06);
    pub const REAL: Self = Tag::universal(0x09);
    pub const ENUMERATED: Self = Tag::universal(0x0A);
    pub const UTF8_STRING: Self = Tag::universal(0x0C);
    pub const RELATIVE_OID: Self = Tag::universal(0x0D);
    pub const SEQUENCE: Self = Tag::universal(0x10).constructed();
    pub const SET: Self = Tag::universal(0x11).constructed();
    pub const NUMERIC_STRING: Self = Tag::universal(0x12);
    pub const PRINTABLE_STRING: Self = Tag::universal(0x13);
    pub const TELETEX_STRING: Self = Tag::universal(0x14);
    pub const VIDEOTEX_STRING: Self = Tag::universal(0x15);
    pub const IA5_STRING: Self = Tag::universal(0x16);
    pub const UTC_TIME: Self = Tag::universal(0x17);
    pub const GENERALIZED_TIME: Self = Tag::universal(0x18);
    pub const GRAPHIC_STRING: Self = Tag::universal(0x19);
    pub const VISIBLE_STRING: Self = Tag::universal(0x1A);
    pub const GENERAL_STRING: Self = Tag::universal(0x1B);
    pub const UNIVERSAL_STRING: Self = Tag::universal(0x1C);
    pub const BMP_STRING: Self = Tag::universal(0x1E);

    #[inline]
    pub const fn new(class: TagClass, constructed: bool, number: u32) -> Self {
        Self {
            class,
            constructed,
            number,
        }
    }

    #[inline]
    pub const fn universal(number: u32) -> Self {
        Self::new(TagClass::Universal, false, number)
    }

    #[inline]
    pub const fn application(number: u32) -> Self {
        Self::new(TagClass::Application, false, number)
    }

    #[inline]
    pub const fn context_specific(number: u32) -> Self {
        Self::new(TagClass::ContextSpecific, false, number)
    }

    #[inline]
    pub const fn private(number: u32) -> Self {
        Self::new(TagClass::Private, false, number)
    }

    /// Same tag with the constructed bit set.
    #[inline]
    pub const fn constructed(self) -> Self {
        Self::new(self.class, true, self.number)
    }

    /// Same tag with the constructed bit cleared.
    #[inline]
    pub const fn primitive(self) -> Self {
        Self::new(self.class, false, self.number)
    }

    #[inline]
    pub const fn with_constructed(self, constructed: bool) -> Self {
        Self::new(self.class, constructed, self.number)
    }

    #[inline]
    pub const fn class(self) -> TagClass {
        self.class
    }

    #[inline]
    pub const fn number(self) -> u32 {
        self.number
    }

    #[inline]
    pub const fn is_constructed(self) -> bool {
        self.constructed
    }

    #[inline]
    pub fn is_universal(self) -> bool {
        self.class == TagClass::Universal
    }

    #[inline]
    pub fn is_application(self) -> bool {
        self.class == TagClass::Application
    }

    #[inline]
    pub fn is_context_specific(self) -> bool {
        self.class == TagClass::ContextSpecific
    }

    /// Class and number agree, whatever the constructed bit says.
    #[inline]
    pub fn same_type(self, other: Tag) -> bool {
        self.class == other.class && self.number == other.number
    }

    /// Identifier octets, using the high-tag-number form for numbers above 30.
    pub fn identifier_octets(self) -> Vec<u8> {
        let leading = (self.class.bits() << 6) | if self.constructed { 0x20 } else { 0 };

        if self.number < 0x1F {
            return vec![leading | self.number as u8];
        }

        let mut septets = Vec::with_capacity(5);
        let mut number = self.number;
        loop {
            septets.push((number & 0x7F) as u8);
            number >>= 7;
            if number == 0 {
                break;
            }
        }

        let mut octets = Vec::with_capacity(septets.len() + 1);
        octets.push(leading | 0x1F);
        let last = septets.len() - 1;
        for (i, septet) in septets.iter().rev().enumerate() {
            octets.push(if i == last { *septet } else { septet | 0x80 });
        }
        octets
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Tag({self}")?;
        if self.constructed {
            write!(f, ", constructed")?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.class {
            TagClass::Application => return write!(f, "ApplicationTag{}", self.number),
            TagClass::ContextSpecific => return write!(f, "ContextTag{}", self.number),
            TagClass::Private => return write!(f, "PrivateTag{}", self.number),
            TagClass::Universal => {}
        }

        let name = match self.number {
            0x01 => "BOOLEAN",
            0x02 => "INTEGER",
            0x03 => "BIT STRING",
            0x04 => "OCTET STRING",
            0x05 => "NULL",
            0x06 => "OBJECT IDENTIFIER",
            0x09 => "REAL",
            0x0A => "ENUMERATED",
            0x0C => "UTF8String",
            0x0D => "RELATIVE-OID",
            0x10 => "SEQUENCE",
            0x11 => "SET",
            0x12 => "NumericString",
            0x13 => "PrintableString",
            0x14 => "TeletexString",
            0x15 => "VideotexString",
            0x16 => "IA5String",
            0x17 => "UTCTime",
            0x18 => "GeneralizedTime",
            0x19 => "GraphicString",
            0x1A => "VisibleString",
            0x1B => "GeneralString",
            0x1C => "UniversalString",
            0x1E => "BMPString",
            unknown => return write!(f, "UNKNOWN({unknown})"),
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(Tag::SEQUENCE, &[0x30])]
    #[case(Tag::INTEGER, &[0x02])]
    #[case(Tag::context_specific(3).constructed(), &[0xA3])]
    #[case(Tag::application(30), &[0x5E])]
    #[case(Tag::context_specific(31), &[0x9F, 0x1F])]
    #[case(Tag::private(201), &[0xDF, 0x81, 0x49])]
    fn identifier_octets(#[case] tag: Tag, #[case] expected: &[u8]) {
        assert_eq!(tag.identifier_octets(), expected);
    }

    #[test]
    fn display() {
        assert_eq!(Tag::BIT_STRING.to_string(), "BIT STRING");
        assert_eq!(Tag::context_specific(0).constructed().to_string(), "ContextTag0");
        assert_eq!(Tag::universal(0x1F).to_string(), "UNKNOWN(31)");
    }

    #[test]
    fn same_type_ignores_constructed_bit() {
        assert!(Tag::OCTET_STRING.same_type(Tag::OCTET_STRING.constructed()));
        assert!(!Tag::OCTET_STRING.same_type(Tag::context_specific(4)));
    }
}
