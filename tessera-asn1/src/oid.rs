//! Dotted-decimal object identifiers to and from their base-128 content octets.
//!
//! Arcs are arbitrary-precision: `2.25.<uuid>` style identifiers carry 128-bit arcs.

use num_bigint_dig::BigUint;
use thiserror::Error;

/// Content octets longer than this are refused.
pub const MAX_OID_LEN: usize = 4096;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OidError {
    /// an OBJECT IDENTIFIER needs at least one content octet
    #[error("empty object identifier")]
    Empty,

    /// the last content octet still has its continuation bit set
    #[error("object identifier ends in the middle of an arc")]
    Truncated,

    #[error("object identifier content is {len} bytes long, the limit is {MAX_OID_LEN}")]
    TooLong { len: usize },

    /// an arc starts with a 0x80 padding octet
    #[error("non-minimal arc encoding at offset {offset}")]
    NonMinimal { offset: usize },

    #[error("invalid arc `{arc}` in `{oid}`")]
    InvalidArc { oid: String, arc: String },

    #[error("`{oid}` needs at least two arcs")]
    TooFewArcs { oid: String },

    /// first arc above 2, or second arc above 39 under roots 0 and 1
    #[error("`{oid}` has an out-of-range root arc")]
    InvalidRoot { oid: String },
}

/// Decode OBJECT IDENTIFIER content octets into dotted-decimal form.
pub fn decode_oid(content: &[u8]) -> Result<String, OidError> {
    if content.is_empty() {
        return Err(OidError::Empty);
    }
    if content.len() > MAX_OID_LEN {
        return Err(OidError::TooLong { len: content.len() });
    }
    if content[content.len() - 1] & 0x80 != 0 {
        return Err(OidError::Truncated);
    }

    let mut arcs: Vec<BigUint> = Vec::new();
    let mut arc = BigUint::from(0u32);
    let mut arc_start = true;
    for (offset, byte) in content.iter().enumerate() {
        if arc_start && *byte == 0x80 {
            return Err(OidError::NonMinimal { offset });
        }
        arc = (arc << 7usize) + BigUint::from(u32::from(byte & 0x7F));
        arc_start = byte & 0x80 == 0;
        if arc_start {
            arcs.push(std::mem::replace(&mut arc, BigUint::from(0u32)));
        }
    }

    let mut arcs = arcs.into_iter();
    let mut dotted = match arcs.next() {
        Some(first) => {
            let eighty = BigUint::from(80u32);
            if first < eighty {
                let forty = BigUint::from(40u32);
                format!("{}.{}", &first / &forty, &first % &forty)
            } else {
                format!("2.{}", first - eighty)
            }
        }
        None => return Err(OidError::Empty),
    };
    for arc in arcs {
        dotted.push('.');
        dotted.push_str(&arc.to_string());
    }

    Ok(dotted)
}

/// Encode a dotted-decimal object identifier into content octets.
///
/// Only identifiers that decode back to the same text are accepted: no empty or
/// zero-padded arcs, at least two arcs, and a valid root.
pub fn encode_oid(dotted: &str) -> Result<Vec<u8>, OidError> {
    let arcs = dotted
        .split('.')
        .map(|arc| parse_arc(dotted, arc))
        .collect::<Result<Vec<_>, _>>()?;

    if arcs.len() < 2 {
        return Err(OidError::TooFewArcs {
            oid: dotted.to_owned(),
        });
    }

    let first = &arcs[0];
    let second = &arcs[1];
    let forty = BigUint::from(40u32);
    let root = if *first < BigUint::from(2u32) {
        if *second >= forty {
            return Err(OidError::InvalidRoot {
                oid: dotted.to_owned(),
            });
        }
        first * &forty + second
    } else if *first == BigUint::from(2u32) {
        second + &BigUint::from(80u32)
    } else {
        return Err(OidError::InvalidRoot {
            oid: dotted.to_owned(),
        });
    };

    let mut content = Vec::with_capacity(dotted.len());
    push_arc(&mut content, root);
    for arc in arcs.into_iter().skip(2) {
        push_arc(&mut content, arc);
    }

    Ok(content)
}

fn parse_arc(oid: &str, arc: &str) -> Result<BigUint, OidError> {
    let invalid = || OidError::InvalidArc {
        oid: oid.to_owned(),
        arc: arc.to_owned(),
    };

    if arc.is_empty() || !arc.bytes().all(|b| b.is_ascii_digit()) || (arc.len() > 1 && arc.starts_with('0')) {
        return Err(invalid());
    }

    BigUint::parse_bytes(arc.as_bytes(), 10).ok_or_else(invalid)
}

fn push_arc(content: &mut Vec<u8>, mut arc: BigUint) {
    let zero = BigUint::from(0u32);
    if arc == zero {
        content.push(0);
        return;
    }

    let mask = BigUint::from(0x7Fu32);
    let mut septets = Vec::new();
    while arc > zero {
        let low = (&arc & &mask).to_bytes_be();
        septets.push(low.last().copied().unwrap_or(0));
        arc = arc >> 7usize;
    }

    let last = septets.len() - 1;
    content.extend(
        septets
            .iter()
            .rev()
            .enumerate()
            .map(|(i, septet)| if i == last { *septet } else { septet | 0x80 }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("1.2.840.113549.1.1.11", &[0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x01, 0x0B])]
    #[case("2.5.4.3", &[0x55, 0x04, 0x03])]
    #[case("0.9.2342.19200300.100.1.25", &[0x09, 0x92, 0x26, 0x89, 0x93, 0xF2, 0x2C, 0x64, 0x01, 0x19])]
    #[case("2.999.3", &[0x88, 0x37, 0x03])]
    #[case("1.3.6.1.4.1.311.0", &[0x2B, 0x06, 0x01, 0x04, 0x01, 0x82, 0x37, 0x00])]
    fn known_encodings(#[case] dotted: &str, #[case] content: &[u8]) {
        assert_eq!(encode_oid(dotted).unwrap(), content);
        assert_eq!(decode_oid(content).unwrap(), dotted);
    }

    #[rstest]
    #[case("2.25.329800735698586629295641978511506172918")]
    #[case("1.39.18446744073709551616.0")]
    #[case("0.0")]
    #[case("2.100000000000000000000000")]
    fn inverse_law(#[case] dotted: &str) {
        let content = encode_oid(dotted).unwrap();
        assert_eq!(decode_oid(&content).unwrap(), dotted);
    }

    #[test]
    fn first_arc_above_eighty_belongs_to_root_two() {
        assert_eq!(decode_oid(&[0x81, 0x34, 0x03]).unwrap(), "2.100.3");
    }

    #[rstest]
    #[case("1")]
    #[case("1..2")]
    #[case("1.02")]
    #[case("1.40")]
    #[case("3.1")]
    #[case("1.2.x")]
    #[case("")]
    fn rejects_invalid_text(#[case] dotted: &str) {
        assert!(encode_oid(dotted).is_err(), "{dotted} was accepted");
    }

    #[test]
    fn rejects_invalid_content() {
        assert_eq!(decode_oid(&[]), Err(OidError::Empty));
        assert_eq!(decode_oid(&[0x2A, 0x86]), Err(OidError::Truncated));
        assert_eq!(decode_oid(&[0x2A, 0x80, 0x01]), Err(OidError::NonMinimal { offset: 1 }));
        assert_eq!(
            decode_oid(&vec![0x01; MAX_OID_LEN + 1]),
            Err(OidError::TooLong { len: MAX_OID_LEN + 1 })
        );
    }
}
