//! Schema-less BER decoding into a [`Node`] tree.

pub mod map;
pub mod node;

use crate::de::node::{Content, Node};
use crate::misc::Length;
use crate::{Asn1DerError, Result};
use tessera_asn1::{schema::is_character_string_number, Tag, TagClass};

/// Deepest nesting accepted before giving up.
pub const MAX_DEPTH: usize = 100;

/// Decodes exactly one element spanning the whole input.
pub fn decode_ber(buf: &[u8]) -> Result<Node> {
    debug_log!("decode_ber ({} bytes)", buf.len());
    let node = decode_tlv(buf, 0)?;
    if node.end() != buf.len() {
        return Err(Asn1DerError::TrailingData {
            len: buf.len() - node.end(),
        });
    }
    Ok(node)
}

/// Decodes the element starting at `offset`. Bytes after it are left alone.
pub fn decode_tlv(buf: &[u8], offset: usize) -> Result<Node> {
    decode_at(buf, offset, buf.len(), 0)
}

/// Decodes consecutive elements until the input is exhausted.
pub fn decode_all(buf: &[u8]) -> Result<Vec<Node>> {
    let mut nodes = Vec::new();
    let mut offset = 0;
    while offset < buf.len() {
        let node = decode_tlv(buf, offset)?;
        offset = node.end();
        nodes.push(node);
    }
    Ok(nodes)
}

fn decode_at(buf: &[u8], offset: usize, limit: usize, depth: usize) -> Result<Node> {
    if depth > MAX_DEPTH {
        return Err(Asn1DerError::TooDeep { offset });
    }

    let (tag, tag_len) = read_tag(&buf[..limit], offset)?;
    let (length, length_len) = Length::deserialize(&buf[..limit], offset + tag_len)?;
    let header_len = tag_len + length_len;
    let content_start = offset + header_len;

    debug_log!("{} at {} (length {:?})", tag, offset, length);

    let (content, len, indefinite) = match length {
        Some(length) => {
            let remaining = limit - content_start;
            if length > remaining {
                return Err(Asn1DerError::LengthOverflow {
                    offset: offset + tag_len,
                    length,
                    remaining,
                });
            }

            let content_end = content_start + length;
            let content = if tag.is_constructed() {
                let mut children = Vec::new();
                let mut cursor = content_start;
                while cursor < content_end {
                    let child = decode_at(buf, cursor, content_end, depth + 1)?;
                    cursor = child.end();
                    children.push(child);
                }
                Content::Constructed(children)
            } else {
                Content::Primitive(buf[content_start..content_end].to_vec())
            };

            (content, header_len + length, false)
        }
        None => {
            if !tag.is_constructed() {
                return Err(Asn1DerError::IndefinitePrimitive { offset });
            }

            let mut children = Vec::new();
            let mut cursor = content_start;
            loop {
                if cursor + 1 >= limit {
                    return Err(Asn1DerError::MissingEndOfContents { offset });
                }
                if buf[cursor] == 0 && buf[cursor + 1] == 0 {
                    cursor += 2;
                    break;
                }
                let child = decode_at(buf, cursor, limit, depth + 1)?;
                cursor = child.end();
                children.push(child);
            }

            (Content::Constructed(children), cursor - offset, true)
        }
    };

    let content = match content {
        Content::Constructed(children) if is_fragmentable(tag) => {
            Content::Primitive(reassemble(tag, &children, offset, tag.number() == Tag::BIT_STRING.number())?)
        }
        other => other,
    };

    Ok(Node {
        tag,
        start: offset,
        header_len,
        len,
        indefinite,
        content,
    })
}

fn read_tag(buf: &[u8], offset: usize) -> Result<(Tag, usize)> {
    let first = *buf.get(offset).ok_or(Asn1DerError::TruncatedData { offset })?;
    let class = TagClass::from_bits(first >> 6);
    let constructed = first & 0x20 != 0;

    if first & 0x1F != 0x1F {
        return Ok((Tag::new(class, constructed, u32::from(first & 0x1F)), 1));
    }

    let mut number: u32 = 0;
    let mut cursor = offset + 1;
    loop {
        let byte = *buf
            .get(cursor)
            .ok_or(Asn1DerError::TruncatedData { offset: cursor })?;
        if cursor == offset + 1 && byte == 0x80 {
            return Err(Asn1DerError::NonCanonicalTag { offset });
        }
        if number > (u32::MAX >> 7) {
            return Err(Asn1DerError::TagOverflow { offset });
        }
        number = (number << 7) | u32::from(byte & 0x7F);
        cursor += 1;
        if byte & 0x80 == 0 {
            break;
        }
    }

    Ok((Tag::new(class, constructed, number), cursor - offset))
}

/// Universal string types BER allows to be split in constructed fragments.
fn is_fragmentable(tag: Tag) -> bool {
    tag.is_universal()
        && (tag.number() == Tag::BIT_STRING.number()
            || tag.number() == Tag::OCTET_STRING.number()
            || tag.number() == Tag::UTF8_STRING.number()
            || is_character_string_number(tag.number()))
}

/// Joins the fragments of a constructed string.
///
/// For a BIT STRING the result starts with the unused-bits octet of the final fragment;
/// every other fragment must declare zero unused bits.
pub(crate) fn reassemble(tag: Tag, fragments: &[Node], offset: usize, is_bit_string: bool) -> Result<Vec<u8>> {
    let invalid = || Asn1DerError::InvalidFragment { outer: tag, offset };

    let mut data = Vec::new();
    let mut unused_bits = 0;
    let last = fragments.len().saturating_sub(1);
    for (i, fragment) in fragments.iter().enumerate() {
        if tag.is_universal() && !fragment.tag.same_type(tag) {
            return Err(invalid());
        }
        let bytes = fragment.primitive().ok_or_else(invalid)?;
        if is_bit_string {
            let (unused, payload) = bytes.split_first().ok_or_else(invalid)?;
            if *unused > 7 || (i != last && *unused != 0) {
                return Err(invalid());
            }
            unused_bits = *unused;
            data.extend_from_slice(payload);
        } else {
            data.extend_from_slice(bytes);
        }
    }

    if is_bit_string {
        data.insert(0, unused_bits);
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn high_tag_number_form() {
        let node = decode_ber(&[0x9F, 0x81, 0x00, 0x01, 0xAA]).unwrap();
        assert_eq!(node.tag, Tag::context_specific(128));
        assert_eq!(node.header_len, 4);
        assert_eq!(node.primitive(), Some(&[0xAA][..]));
    }

    #[test]
    fn tag_overflow() {
        let err = decode_ber(&[0x1F, 0x90, 0x80, 0x80, 0x80, 0x00, 0x00]).unwrap_err();
        assert_eq!(err, Asn1DerError::TagOverflow { offset: 0 });
    }

    #[test]
    fn indefinite_length_sequence() {
        let node = decode_ber(&[0x30, 0x80, 0x02, 0x01, 0x05, 0x00, 0x00]).unwrap();
        assert!(node.indefinite);
        assert_eq!(node.len, 7);
        assert_eq!(node.children().len(), 1);
        assert_eq!(node.children()[0].primitive(), Some(&[0x05][..]));
    }

    #[test]
    fn constructed_bit_string_uses_final_unused_count() {
        let node = decode_ber(&[0x23, 0x08, 0x03, 0x02, 0x00, 0xAB, 0x03, 0x02, 0x04, 0xC0]).unwrap();
        assert_eq!(node.primitive(), Some(&[0x04, 0xAB, 0xC0][..]));
    }

    #[test]
    fn non_final_fragment_with_unused_bits_is_rejected() {
        let err = decode_ber(&[0x23, 0x08, 0x03, 0x02, 0x01, 0xAA, 0x03, 0x02, 0x00, 0xC0]).unwrap_err();
        assert!(matches!(err, Asn1DerError::InvalidFragment { .. }));
    }

    #[test]
    fn nested_constructed_octet_string() {
        let node = decode_ber(&[0x24, 0x80, 0x04, 0x01, 0x01, 0x24, 0x03, 0x04, 0x01, 0x02, 0x00, 0x00]).unwrap();
        assert_eq!(node.primitive(), Some(&[0x01, 0x02][..]));
    }

    #[test]
    fn decode_all_reads_consecutive_elements() {
        let nodes = decode_all(&[0x05, 0x00, 0x01, 0x01, 0xFF]).unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[1].tag, Tag::BOOLEAN);
    }

    #[test]
    fn too_deep() {
        let mut buf = Vec::new();
        for _ in 0..=MAX_DEPTH + 1 {
            buf.extend_from_slice(&[0x30, 0x80]);
        }
        let err = decode_ber(&buf).unwrap_err();
        assert!(matches!(err, Asn1DerError::TooDeep { .. }));
    }
}
