use crate::{Asn1DerError, Result};
use std::cmp::Ordering;

/// Definite length fields.
pub struct Length;

impl Length {
    /// Longest long-form length field accepted, in octets after the initial one.
    pub const MAX_OCTETS: usize = 4;

    /// Number of octets the length field for `len` occupies.
    pub fn encoded_len(len: usize) -> usize {
        match len {
            0..=0x7F => 1,
            _ => 1 + Self::significant_octets(len),
        }
    }

    /// Appends the minimal DER length field for `len`.
    pub fn serialize(len: usize, out: &mut Vec<u8>) -> usize {
        if len <= 0x7F {
            out.push(len as u8);
            return 1;
        }

        let count = Self::significant_octets(len);
        out.push(0x80 | count as u8);
        let bytes = len.to_be_bytes();
        out.extend_from_slice(&bytes[bytes.len() - count..]);
        count + 1
    }

    /// Reads a length field at `offset`.
    ///
    /// Returns the length (`None` for the indefinite form) and the number of octets consumed.
    pub fn deserialize(buf: &[u8], offset: usize) -> Result<(Option<usize>, usize)> {
        let first = *buf.get(offset).ok_or(Asn1DerError::TruncatedData { offset })?;
        match first {
            0x00..=0x7F => Ok((Some(usize::from(first)), 1)),
            0x80 => Ok((None, 1)),
            _ => {
                let count = usize::from(first & 0x7F);
                if count > Self::MAX_OCTETS {
                    return Err(Asn1DerError::UnsupportedLength { offset, octets: count });
                }

                let octets = buf
                    .get(offset + 1..offset + 1 + count)
                    .ok_or(Asn1DerError::TruncatedData { offset: offset + 1 })?;
                let len = octets.iter().fold(0usize, |acc, b| (acc << 8) | usize::from(*b));
                Ok((Some(len), count + 1))
            }
        }
    }

    fn significant_octets(len: usize) -> usize {
        let bits = usize::BITS - len.leading_zeros();
        bits.div_ceil(8) as usize
    }
}

/// DER ordering of SET and SET OF members: compare as octet strings padded with
/// trailing zeros, shorter first on a tie.
pub fn der_set_order(a: &[u8], b: &[u8]) -> Ordering {
    let width = a.len().max(b.len());
    let padded = |bytes: &[u8], i: usize| bytes.get(i).copied().unwrap_or(0);

    (0..width)
        .map(|i| padded(a, i).cmp(&padded(b, i)))
        .find(|ordering| ordering.is_ne())
        .unwrap_or_else(|| a.len().cmp(&b.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(0, &[0x00])]
    #[case(127, &[0x7F])]
    #[case(128, &[0x81, 0x80])]
    #[case(255, &[0x81, 0xFF])]
    #[case(256, &[0x82, 0x01, 0x00])]
    #[case(0x01_00_00, &[0x83, 0x01, 0x00, 0x00])]
    fn minimal_length_fields(#[case] len: usize, #[case] expected: &[u8]) {
        let mut out = Vec::new();
        assert_eq!(Length::serialize(len, &mut out), expected.len());
        assert_eq!(out, expected);
        assert_eq!(Length::encoded_len(len), expected.len());
        assert_eq!(Length::deserialize(&out, 0).unwrap(), (Some(len), expected.len()));
    }

    #[test]
    fn non_minimal_long_form_is_accepted_on_read() {
        assert_eq!(Length::deserialize(&[0x82, 0x00, 0x05], 0).unwrap(), (Some(5), 3));
    }

    #[test]
    fn indefinite_and_oversized() {
        assert_eq!(Length::deserialize(&[0x80], 0).unwrap(), (None, 1));
        assert_eq!(
            Length::deserialize(&[0x85, 1, 2, 3, 4, 5], 0),
            Err(Asn1DerError::UnsupportedLength { offset: 0, octets: 5 })
        );
        assert_eq!(
            Length::deserialize(&[0x82, 0x01], 0),
            Err(Asn1DerError::TruncatedData { offset: 1 })
        );
    }

    #[test]
    fn set_order_pads_with_zeros() {
        assert_eq!(der_set_order(&[0x02, 0x01], &[0x02, 0x01, 0x00]), Ordering::Less);
        assert_eq!(der_set_order(&[0x04], &[0x02, 0xFF]), Ordering::Greater);
        assert_eq!(der_set_order(&[0x31, 0x00], &[0x31, 0x00]), Ordering::Equal);
    }
}
