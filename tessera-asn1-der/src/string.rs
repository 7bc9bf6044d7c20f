//! Character string content conversions.
//!
//! UTF8String is kept as-is, BMPString is UTF-16BE and UniversalString UTF-32BE.
//! Every other type is read as Latin-1; on write the IA5 family must be ASCII and
//! the remaining ones must fit in a single octet per character.

use crate::{Asn1DerError, Result};
use tessera_asn1::Kind;
use widestring::{U16String, U32String};

pub(crate) fn decode(kind: &Kind, content: &[u8]) -> std::result::Result<String, &'static str> {
    match kind {
        Kind::Utf8String => String::from_utf8(content.to_vec()).map_err(|_| "invalid UTF-8"),
        Kind::BmpString => {
            if content.len() % 2 != 0 {
                return Err("odd BMPString length");
            }
            let units = content
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect::<Vec<_>>();
            U16String::from_vec(units)
                .to_string()
                .map_err(|_| "invalid UTF-16 in BMPString")
        }
        Kind::UniversalString => {
            if content.len() % 4 != 0 {
                return Err("UniversalString length isn't a multiple of 4");
            }
            let chars = content
                .chunks_exact(4)
                .map(|quad| u32::from_be_bytes([quad[0], quad[1], quad[2], quad[3]]))
                .collect::<Vec<_>>();
            U32String::from_vec(chars)
                .to_string()
                .map_err(|_| "invalid code point in UniversalString")
        }
        _ => Ok(content.iter().map(|b| char::from(*b)).collect()),
    }
}

pub(crate) fn encode(kind: &Kind, text: &str) -> Result<Vec<u8>> {
    let invalid = || Asn1DerError::InvalidString {
        kind: kind.describe(),
        value: text.to_owned(),
    };

    match kind {
        Kind::Utf8String => Ok(text.as_bytes().to_vec()),
        Kind::BmpString => Ok(U16String::from_str(text)
            .into_vec()
            .into_iter()
            .flat_map(u16::to_be_bytes)
            .collect()),
        Kind::UniversalString => Ok(U32String::from_str(text)
            .into_vec()
            .into_iter()
            .flat_map(u32::to_be_bytes)
            .collect()),
        Kind::Ia5String | Kind::PrintableString | Kind::NumericString | Kind::VisibleString => {
            if text.is_ascii() {
                Ok(text.as_bytes().to_vec())
            } else {
                Err(invalid())
            }
        }
        _ => text
            .chars()
            .map(|c| u8::try_from(u32::from(c)).map_err(|_| invalid()))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn bmp_string_is_utf16_big_endian() {
        let encoded = encode(&Kind::BmpString, "Zoé").unwrap();
        assert_eq!(encoded, [0x00, 0x5A, 0x00, 0x6F, 0x00, 0xE9]);
        assert_eq!(decode(&Kind::BmpString, &encoded).unwrap(), "Zoé");
    }

    #[test]
    fn universal_string_is_utf32_big_endian() {
        let encoded = encode(&Kind::UniversalString, "€").unwrap();
        assert_eq!(encoded, [0x00, 0x00, 0x20, 0xAC]);
        assert_eq!(decode(&Kind::UniversalString, &encoded).unwrap(), "€");
    }

    #[test]
    fn latin1_round_trip() {
        let encoded = encode(&Kind::TeletexString, "Müller").unwrap();
        assert_eq!(encoded, b"M\xFCller");
        assert_eq!(decode(&Kind::TeletexString, &encoded).unwrap(), "Müller");
    }

    #[test]
    fn restricted_types_reject_wide_characters() {
        assert!(encode(&Kind::Ia5String, "é").is_err());
        assert!(encode(&Kind::TeletexString, "€").is_err());
        assert!(decode(&Kind::BmpString, &[0x00]).is_err());
        assert!(decode(&Kind::Utf8String, &[0xC3]).is_err());
    }
}
