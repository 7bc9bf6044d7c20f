//! Distinguished names: attribute lookup, editing and the usual renderings.

use super::utils::map_in_any;
use super::X509Error;
use digest::Digest;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tessera_asn1::{Any, Kind, Schema, Tag, Value};
use tessera_asn1_der::{from_der, to_der};
use tessera_asn1_x509::name::{name, relative_distinguished_name};
use tessera_asn1_x509::{oids, ExtensionRegistry};

/// Canonical attribute name for one of the many ways users spell it.
///
/// Lookup is case-insensitive and accepts OpenSSL short names (`CN`, `ST`, ...), long
/// names (`commonName`), `id-at-*` names and dotted identifiers of known attributes.
pub fn translate_attribute(prop: &str) -> Option<&'static str> {
    let canonical = match prop.to_ascii_lowercase().as_str() {
        "id-at-businesscategory" | "businesscategory" => "id-at-businessCategory",
        "id-at-countryname" | "countryname" | "c" => "id-at-countryName",
        "id-at-organizationname" | "organizationname" | "o" => "id-at-organizationName",
        "id-at-dnqualifier" | "dnqualifier" => "id-at-dnQualifier",
        "id-at-commonname" | "commonname" | "cn" => "id-at-commonName",
        "id-at-stateorprovincename" | "stateorprovincename" | "state" | "province" | "provincename" | "st" => {
            "id-at-stateOrProvinceName"
        }
        "id-at-localityname" | "localityname" | "l" => "id-at-localityName",
        "id-emailaddress" | "emailaddress" | "pkcs-9-at-emailaddress" => "pkcs-9-at-emailAddress",
        "id-at-serialnumber" | "serialnumber" => "id-at-serialNumber",
        "id-at-postalcode" | "postalcode" => "id-at-postalCode",
        "id-at-streetaddress" | "streetaddress" => "id-at-streetAddress",
        "id-at-name" | "name" => "id-at-name",
        "id-at-givenname" | "givenname" => "id-at-givenName",
        "id-at-surname" | "surname" | "sn" => "id-at-surname",
        "id-at-initials" | "initials" => "id-at-initials",
        "id-at-generationqualifier" | "generationqualifier" => "id-at-generationQualifier",
        "id-at-organizationalunitname" | "organizationalunitname" | "ou" => "id-at-organizationalUnitName",
        "id-at-pseudonym" | "pseudonym" => "id-at-pseudonym",
        "id-at-title" | "title" => "id-at-title",
        "id-at-description" | "description" => "id-at-description",
        "id-at-role" | "role" => "id-at-role",
        "id-at-uniqueidentifier" | "uniqueidentifier" | "x500uniqueidentifier" => "id-at-uniqueIdentifier",
        "id-at-postaladdress" | "postaladdress" => "id-at-postalAddress",
        "id-domaincomponent" | "domaincomponent" | "dc" => "id-domainComponent",
        "id-userid" | "userid" | "uid" => "id-userId",
        dotted => {
            let name = oids::name_of(dotted)?;
            return translate_attribute(name).filter(|translated| *translated == name);
        }
    };
    Some(canonical)
}

/// Dotted identifier of a DN attribute, also accepting dotted identifiers without a name.
fn attribute_oid(prop: &str) -> Result<String, X509Error> {
    let unknown = || X509Error::UnknownAttribute { name: prop.to_owned() };
    match translate_attribute(prop) {
        Some(name) => oids::resolve(name).ok_or_else(unknown),
        None if tessera_asn1::encode_oid(prop).is_ok() => Ok(prop.to_owned()),
        None => Err(unknown()),
    }
}

/// Label used by the `String` and `OpenSsl` renderings.
fn short_label(dotted: &str) -> String {
    let label = match dotted {
        oids::ID_AT_COUNTRY_NAME => "C",
        oids::ID_AT_STATE_OR_PROVINCE_NAME => "ST",
        oids::ID_AT_ORGANIZATION_NAME => "O",
        oids::ID_AT_ORGANIZATIONAL_UNIT_NAME => "OU",
        oids::ID_AT_COMMON_NAME => "CN",
        oids::ID_AT_LOCALITY_NAME => "L",
        oids::ID_AT_SURNAME => "SN",
        oids::ID_AT_UNIQUE_IDENTIFIER => "x500UniqueIdentifier",
        oids::ID_AT_POSTAL_ADDRESS => "postalAddress",
        other => {
            return match oids::name_of(other) {
                Some(name) => name.rsplit('-').next().unwrap_or(name).to_owned(),
                None => other.to_owned(),
            }
        }
    };
    label.to_owned()
}

fn uses_comma(dotted: &str) -> bool {
    matches!(
        dotted,
        oids::ID_AT_COUNTRY_NAME
            | oids::ID_AT_STATE_OR_PROVINCE_NAME
            | oids::ID_AT_ORGANIZATION_NAME
            | oids::ID_AT_ORGANIZATIONAL_UNIT_NAME
            | oids::ID_AT_COMMON_NAME
            | oids::ID_AT_LOCALITY_NAME
            | oids::ID_AT_SURNAME
    )
}

fn is_text_kind(kind: &Kind) -> bool {
    *kind == Kind::Utf8String || kind.is_character_string()
}

/// Text carried by an attribute value, whatever string type wraps it.
fn attribute_text(value: &Value) -> Option<&str> {
    match value {
        Value::String(text) => Some(text),
        Value::Any(Any::Resolved(tag, inner)) if Kind::from_universal(tag.number()).is_some_and(|k| is_text_kind(&k)) => {
            inner.as_str()
        }
        Value::Choice(name, inner) if Kind::from_any_name(name).is_some_and(|k| is_text_kind(&k)) => inner.as_str(),
        _ => None,
    }
}

fn escape_element(der: &[u8]) -> String {
    let mut escaped = String::with_capacity(der.len());
    for byte in der {
        if (0x20..=0x7E).contains(byte) {
            escaped.push(char::from(*byte));
        } else {
            escaped.push_str(&format!("\\x{byte:02x}"));
        }
    }
    escaped.to_uppercase()
}

fn collapse_whitespace(text: &str) -> String {
    text.split(|c: char| c.is_ascii_whitespace() || c == '\x0B')
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase()
}

/// Output formats of [`DistinguishedName::format`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DnFormat {
    /// the typed `Name` value
    Value,
    Der,
    /// concatenated RDN SETs with normalized UTF8String values, as hashed by OpenSSL
    Canonical,
    /// OpenSSL subject hash
    Hash,
    /// short label to values
    OpenSsl,
    /// `C=US, O=Acme, CN=example.com`
    String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormattedDn {
    Value(Value),
    Der(Vec<u8>),
    Canonical(Vec<u8>),
    Hash(String),
    OpenSsl(BTreeMap<String, Vec<String>>),
    String(String),
}

/// How two names are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DnMatch {
    /// same attributes with the same string types
    #[default]
    Exact,
    /// same canonical form
    Canonical,
}

/// An RDN sequence. Each RDN is a list of `AttributeTypeAndValue` sequences whose values are
/// held the way an ANY field holds them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DistinguishedName {
    rdns: Vec<Value>,
}

impl DistinguishedName {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts a `Name` value (`rdnSequence` alternative) or a bare RDN list.
    pub fn from_value(value: &Value) -> Result<Self, X509Error> {
        let rdns = value
            .pointer("rdnSequence")
            .unwrap_or(value)
            .as_list()
            .ok_or(X509Error::Malformed {
                element: "distinguished name",
            })?;

        if rdns.iter().any(|rdn| rdn.as_list().is_none()) {
            return Err(X509Error::Malformed {
                element: "relative distinguished name",
            });
        }

        Ok(Self { rdns: rdns.to_vec() })
    }

    pub fn to_value(&self) -> Value {
        Value::choice("rdnSequence", Value::List(self.rdns.clone()))
    }

    pub fn from_der(der: &[u8]) -> Result<Self, X509Error> {
        let value = from_der(der, &name()).map_err(|source| X509Error::Asn1Deserialization {
            element: "distinguished name",
            source,
        })?;
        Self::from_value(&value)
    }

    pub fn to_der(&self) -> Result<Vec<u8>, X509Error> {
        to_der(&self.to_value(), &name()).map_err(|source| X509Error::Asn1Serialization {
            element: "distinguished name",
            source,
        })
    }

    /// Parses `/C=US/O=Acme/CN=x` or `C=US, O=Acme, CN=x`.
    pub fn parse(input: &str) -> Result<Self, X509Error> {
        let mut dn = Self::new();
        for (key, value) in split_dn(input)? {
            dn.add(key, value)?;
        }
        Ok(dn)
    }

    pub fn rdns(&self) -> &[Value] {
        &self.rdns
    }

    pub fn is_empty(&self) -> bool {
        self.rdns.is_empty()
    }

    /// Values of every RDN whose first attribute is `prop`.
    ///
    /// String values come back as [`Value::String`]. Values registered with a schema are
    /// decoded with it.
    pub fn get(&self, prop: &str) -> Result<Vec<Value>, X509Error> {
        self.get_with(prop, ExtensionRegistry::builtin())
    }

    /// Same as [`get`](Self::get), decoding non-string values with the schemas of `registry`.
    pub fn get_with(&self, prop: &str, registry: &ExtensionRegistry) -> Result<Vec<Value>, X509Error> {
        let oid = attribute_oid(prop)?;

        let values = self
            .first_attributes()
            .filter(|(id, _)| *id == oid)
            .map(|(_, value)| match attribute_text(value) {
                Some(text) => Value::string(text),
                None => {
                    let mut value = value.clone();
                    map_in_any(&mut value, &oid, registry);
                    value.unwrap_any().clone()
                }
            })
            .collect();

        Ok(values)
    }

    /// Appends one RDN holding `value` as a UTF8String.
    pub fn add(&mut self, prop: &str, value: &str) -> Result<(), X509Error> {
        self.add_value(prop, Value::resolved(Tag::UTF8_STRING, Value::string(value)))
    }

    /// Appends one RDN holding `value` as is: a resolved ANY, a typed string such as
    /// `Value::choice("printableString", ..)`, or an opaque element.
    pub fn add_value(&mut self, prop: &str, value: Value) -> Result<(), X509Error> {
        let oid = attribute_oid(prop)?;
        self.rdns.push(Value::List(vec![Value::sequence([
            ("type", Value::oid(oid)),
            ("value", value),
        ])]));
        Ok(())
    }

    /// Removes every RDN whose first attribute is `prop`, returning how many went away.
    pub fn remove(&mut self, prop: &str) -> Result<usize, X509Error> {
        let oid = attribute_oid(prop)?;
        let before = self.rdns.len();
        self.rdns.retain(|rdn| first_attribute(rdn).map(|(id, _)| id) != Some(oid.as_str()));
        Ok(before - self.rdns.len())
    }

    pub fn format(&self, format: DnFormat) -> Result<FormattedDn, X509Error> {
        let formatted = match format {
            DnFormat::Value => FormattedDn::Value(self.to_value()),
            DnFormat::Der => FormattedDn::Der(self.to_der()?),
            DnFormat::Canonical => FormattedDn::Canonical(self.canonical()?),
            DnFormat::Hash => FormattedDn::Hash(self.hash()?),
            DnFormat::OpenSsl => FormattedDn::OpenSsl(self.openssl_map()),
            DnFormat::String => FormattedDn::String(self.to_string()),
        };
        Ok(formatted)
    }

    /// Concatenation of the RDN SETs, every string value turned into a lowercased,
    /// whitespace-collapsed UTF8String. There is no outer SEQUENCE.
    pub fn canonical(&self) -> Result<Vec<u8>, X509Error> {
        let rdn_schema = relative_distinguished_name();
        let mut canonical = Vec::new();

        for rdn in &self.rdns {
            let mut rdn = rdn.clone();
            for attribute in rdn.as_list_mut().into_iter().flatten() {
                let Some(value) = attribute.pointer_mut("value") else {
                    continue;
                };
                if let Some(text) = attribute_text(value) {
                    *value = Value::resolved(Tag::UTF8_STRING, Value::String(collapse_whitespace(text)));
                }
            }

            let der = to_der(&rdn, &rdn_schema).map_err(|source| X509Error::Asn1Serialization {
                element: "relative distinguished name",
                source,
            })?;
            canonical.extend(der);
        }

        Ok(canonical)
    }

    /// OpenSSL subject hash: first four bytes of the SHA-1 of [`Self::canonical`], little-endian.
    pub fn hash(&self) -> Result<String, X509Error> {
        let digest = sha1::Sha1::digest(self.canonical()?);
        let hash = u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]);
        Ok(format!("{hash:08x}"))
    }

    pub fn openssl_map(&self) -> BTreeMap<String, Vec<String>> {
        let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (id, value) in self.first_attributes() {
            map.entry(short_label(id)).or_default().push(render_value(value));
        }
        map
    }

    pub fn matches(&self, other: &DistinguishedName, mode: DnMatch) -> bool {
        match mode {
            DnMatch::Exact => self == other,
            DnMatch::Canonical => match (self.canonical(), other.canonical()) {
                (Ok(ours), Ok(theirs)) => ours == theirs,
                _ => false,
            },
        }
    }

    fn first_attributes(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.rdns.iter().filter_map(first_attribute)
    }
}

fn first_attribute(rdn: &Value) -> Option<(&str, &Value)> {
    let attribute = rdn.as_list()?.first()?;
    let id = attribute.pointer("type")?.as_oid()?;
    let value = attribute.pointer("value")?;
    Some((id, value))
}

fn render_value(value: &Value) -> String {
    if let Some(text) = attribute_text(value) {
        return text.to_owned();
    }
    match value {
        Value::Any(Any::Opaque(element)) => escape_element(element.as_bytes()),
        other => match to_der(other, &Schema::any()) {
            Ok(der) => escape_element(&der),
            Err(_) => String::new(),
        },
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (id, value)) in self.first_attributes().enumerate() {
            if index > 0 {
                f.write_str(if uses_comma(id) { ", " } else { "/" })?;
            }
            write!(f, "{}={}", short_label(id), render_value(value))?;
        }
        Ok(())
    }
}

impl FromStr for DistinguishedName {
    type Err = X509Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

const PARSED_KEYS: &[&str] = &[
    "C",
    "O",
    "OU",
    "CN",
    "L",
    "ST",
    "SN",
    "postalCode",
    "streetAddress",
    "emailAddress",
    "serialNumber",
    "organizationalUnitName",
    "title",
    "description",
    "role",
    "x500UniqueIdentifier",
    "postalAddress",
];

/// Splits on `/KEY=` and `, KEY=` boundaries, a known key being required after the separator.
fn split_dn(input: &str) -> Result<Vec<(&str, &str)>, X509Error> {
    let invalid = |reason| X509Error::InvalidName {
        input: input.to_owned(),
        reason,
    };

    // (separator start, key, value start)
    let mut boundaries = Vec::new();
    for (position, c) in input.char_indices() {
        let key_start = match c {
            '/' => position + 1,
            ',' => position + 1 + input[position + 1..].len() - input[position + 1..].trim_start_matches(' ').len(),
            _ if position == 0 => 0,
            _ => continue,
        };

        let rest = &input[key_start..];
        let key = PARSED_KEYS.iter().find(|key| {
            rest.strip_prefix(**key)
                .is_some_and(|after| after.starts_with('='))
        });
        if let Some(key) = key {
            boundaries.push((position, *key, key_start + key.len() + 1));
        }
    }

    if boundaries.is_empty() {
        return Err(invalid("no KEY=value pair found"));
    }

    let mut pairs = Vec::with_capacity(boundaries.len());
    for (index, (_, key, value_start)) in boundaries.iter().enumerate() {
        let value_end = boundaries.get(index + 1).map(|next| next.0).unwrap_or(input.len());
        if value_start > &value_end {
            return Err(invalid("overlapping attributes"));
        }
        pairs.push((*key, &input[*value_start..value_end]));
    }

    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn attribute_decoded_with_caller_registry() {
        const ATTRIBUTE: &str = "1.3.6.1.4.1.55555.2";
        let mut dn = DistinguishedName::default();
        dn.add_value(ATTRIBUTE, Value::opaque(vec![0x30, 0x03, 0x02, 0x01, 0x07]))
            .unwrap();

        let mut registry = ExtensionRegistry::default();
        registry
            .register(
                ATTRIBUTE,
                tessera_asn1::Schema::sequence([tessera_asn1::Field::new("n", tessera_asn1::Schema::integer())]),
            )
            .unwrap();

        let decoded = Value::sequence([("n", Value::integer(7))]);
        assert_eq!(dn.get_with(ATTRIBUTE, &registry).unwrap(), vec![decoded.clone()]);
        assert_ne!(dn.get(ATTRIBUTE).unwrap(), vec![decoded]);
    }

    #[rstest]
    #[case("CN", Some("id-at-commonName"))]
    #[case("commonName", Some("id-at-commonName"))]
    #[case("id-at-commonname", Some("id-at-commonName"))]
    #[case("st", Some("id-at-stateOrProvinceName"))]
    #[case("Province", Some("id-at-stateOrProvinceName"))]
    #[case("emailAddress", Some("pkcs-9-at-emailAddress"))]
    #[case("x500UniqueIdentifier", Some("id-at-uniqueIdentifier"))]
    #[case("2.5.4.3", Some("id-at-commonName"))]
    #[case("favouriteColour", None)]
    fn attribute_names(#[case] prop: &str, #[case] expected: Option<&str>) {
        assert_eq!(translate_attribute(prop), expected);
    }

    #[test]
    fn parse_slash_form() {
        let dn = DistinguishedName::parse("/C=US/O=Acme, Inc./CN=www.acme.test").unwrap();
        assert_eq!(dn.rdns().len(), 3);
        assert_eq!(dn.get("O").unwrap(), vec![Value::string("Acme, Inc.")]);
        assert_eq!(dn.to_string(), "C=US, O=Acme, Inc., CN=www.acme.test");
    }

    #[test]
    fn parse_comma_form() {
        let dn: DistinguishedName = "C=FR, ST=Paris,L=Paris, CN=a/b".parse().unwrap();
        assert_eq!(dn.get("cn").unwrap(), vec![Value::string("a/b")]);
        assert_eq!(dn.get("ST").unwrap(), vec![Value::string("Paris")]);
        assert_eq!(dn.get("l").unwrap(), vec![Value::string("Paris")]);
    }

    #[test]
    fn parse_without_pairs() {
        assert!(matches!(
            DistinguishedName::parse("just some text"),
            Err(X509Error::InvalidName { .. })
        ));
    }

    #[test]
    fn add_get_remove() {
        let mut dn = DistinguishedName::new();
        dn.add("OU", "one").unwrap();
        dn.add("CN", "name").unwrap();
        dn.add("organizationalUnitName", "two").unwrap();
        dn.add("1.3.6.1.4.1.99999.1", "custom").unwrap();

        assert_eq!(dn.get("ou").unwrap(), vec![Value::string("one"), Value::string("two")]);
        assert_eq!(dn.remove("OU").unwrap(), 2);
        assert_eq!(dn.rdns().len(), 2);
        assert!(dn.get("OU").unwrap().is_empty());
        assert!(matches!(dn.add("nope", "x"), Err(X509Error::UnknownAttribute { .. })));
    }

    #[test]
    fn string_rendering() {
        let mut dn = DistinguishedName::new();
        dn.add("C", "US").unwrap();
        dn.add("emailAddress", "ca@acme.test").unwrap();
        dn.add("CN", "Acme CA").unwrap();
        dn.add_value("2.5.4.99", Value::opaque(vec![0x04, 0x02, 0x61, 0x0A])).unwrap();

        expect![[r#"C=US/emailAddress=ca@acme.test, CN=Acme CA/2.5.4.99=\X04\X02A\X0A"#]].assert_eq(&dn.to_string());
    }

    #[test]
    fn openssl_map_groups_labels() {
        let dn = DistinguishedName::parse("/OU=a/OU=b/CN=c").unwrap();
        let map = dn.openssl_map();
        assert_eq!(map["OU"], vec!["a".to_owned(), "b".to_owned()]);
        assert_eq!(map["CN"], vec!["c".to_owned()]);
    }

    #[test]
    fn canonical_form_ignores_case_spacing_and_string_type() {
        let mut printable = DistinguishedName::new();
        printable
            .add_value("CN", Value::resolved(Tag::PRINTABLE_STRING, Value::string("  Tessera   ROOT ")))
            .unwrap();
        let utf8 = DistinguishedName::parse("CN=tessera root").unwrap();

        assert!(!printable.matches(&utf8, DnMatch::Exact));
        assert!(printable.matches(&utf8, DnMatch::Canonical));

        // SET { SEQUENCE { 2.5.4.3, UTF8String "tessera root" } }
        let expected = hex::decode("3115301306035504030c0c7465737365726120726f6f74").unwrap();
        assert_eq!(printable.canonical().unwrap(), expected);
        assert_eq!(utf8.canonical().unwrap(), expected);
    }

    #[test]
    fn der_round_trip() {
        let dn = DistinguishedName::parse("C=US, O=Tessera Test, CN=Tessera Root CA").unwrap();
        let der = dn.to_der().unwrap();
        assert_eq!(DistinguishedName::from_der(&der).unwrap(), dn);
        assert_eq!(dn.format(DnFormat::Der).unwrap(), FormattedDn::Der(der));
    }
}
