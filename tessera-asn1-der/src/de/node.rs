use tessera_asn1::Tag;

/// Content of a decoded TLV.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Content {
    /// Primitive content octets, already reassembled when the string was fragmented.
    Primitive(Vec<u8>),
    Constructed(Vec<Node>),
}

/// One element of the BER parse tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    pub tag: Tag,
    /// offset of the identifier octets in the input
    pub start: usize,
    pub header_len: usize,
    /// total encoded length, end-of-contents octets included
    pub len: usize,
    pub indefinite: bool,
    pub content: Content,
}

impl Node {
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    /// The exact input bytes of this element.
    pub fn raw<'a>(&self, buf: &'a [u8]) -> &'a [u8] {
        &buf[self.start..self.end()]
    }

    pub fn is_constructed(&self) -> bool {
        matches!(self.content, Content::Constructed(_))
    }

    pub fn children(&self) -> &[Node] {
        match &self.content {
            Content::Constructed(children) => children,
            Content::Primitive(_) => &[],
        }
    }

    pub fn primitive(&self) -> Option<&[u8]> {
        match &self.content {
            Content::Primitive(bytes) => Some(bytes),
            Content::Constructed(_) => None,
        }
    }
}
