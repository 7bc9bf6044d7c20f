use super::name::{DistinguishedName, DnMatch};
use super::utils::{
    decode_signed, encode, load, map_in_extensions, map_in_name, map_out_extensions, map_out_name, verify_signed,
};
use super::{extension, X509Error};
use crate::key::PublicKey;
use crate::pem::{parse_pem, Pem};
use crate::signature::{SignatureAlgorithm, SignatureError};
use std::fmt;
use std::net::IpAddr;
use tessera_asn1::{Asn1Time, BigInt, Value};
use tessera_asn1_x509::{certificate, oids, ExtensionRegistry};

const CERT_PEM_LABEL: &str = "CERTIFICATE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CertType {
    Root,
    Intermediate,
    Leaf,
    Unknown,
}

/// An X.509 certificate.
///
/// Extension values are held mapped through the registry the certificate was loaded with,
/// and the DER of `tbsCertificate` is kept as read for signature checks.
#[derive(Clone)]
pub struct Cert<'r> {
    value: Value,
    signature_subject: Vec<u8>,
    registry: &'r ExtensionRegistry,
}

impl fmt::Debug for Cert<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cert")
            .field("value", &self.value)
            .field("signature_subject", &hex::encode(&self.signature_subject))
            .finish_non_exhaustive()
    }
}

impl PartialEq for Cert<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value && self.signature_subject == other.signature_subject
    }
}

impl Cert<'static> {
    pub fn from_der<T: ?Sized + AsRef<[u8]>>(der: &T) -> Result<Self, X509Error> {
        Self::from_der_with(der, ExtensionRegistry::builtin())
    }

    pub fn from_pem(pem: &Pem) -> Result<Self, X509Error> {
        Self::from_pem_with(pem, ExtensionRegistry::builtin())
    }

    pub fn from_pem_str(pem_str: &str) -> Result<Self, X509Error> {
        Self::from_pem(&parse_pem(pem_str)?)
    }

    /// DER or PEM, whichever `input` turns out to be.
    pub fn load<T: ?Sized + AsRef<[u8]>>(input: &T) -> Result<Self, X509Error> {
        Self::load_with(input, ExtensionRegistry::builtin())
    }
}

impl<'r> Cert<'r> {
    pub fn from_der_with<T: ?Sized + AsRef<[u8]>>(der: &T, registry: &'r ExtensionRegistry) -> Result<Self, X509Error> {
        let (mut value, signature_subject) = decode_signed(der.as_ref(), &certificate(), "certificate")?;

        if let Some(extensions) = value.pointer_mut("tbsCertificate/extensions") {
            map_in_extensions(extensions, registry);
        }
        for name in ["tbsCertificate/issuer", "tbsCertificate/subject"] {
            if let Some(name) = value.pointer_mut(name) {
                map_in_name(name, registry);
            }
        }

        Ok(Self {
            value,
            signature_subject,
            registry,
        })
    }

    pub fn from_pem_with(pem: &Pem, registry: &'r ExtensionRegistry) -> Result<Self, X509Error> {
        match pem.label() {
            CERT_PEM_LABEL => Self::from_der_with(pem.data(), registry),
            _ => Err(X509Error::InvalidPemLabel {
                label: pem.label().to_owned(),
            }),
        }
    }

    pub fn load_with<T: ?Sized + AsRef<[u8]>>(input: &T, registry: &'r ExtensionRegistry) -> Result<Self, X509Error> {
        load(input.as_ref(), CERT_PEM_LABEL, |der| Self::from_der_with(der, registry))
    }

    pub fn to_der(&self) -> Result<Vec<u8>, X509Error> {
        encode(&self.mapped_out()?, &certificate(), "certificate")
    }

    pub fn to_pem(&self) -> Result<Pem<'static>, X509Error> {
        Ok(Pem::new(CERT_PEM_LABEL, self.to_der()?))
    }

    pub fn to_pem_str(&self) -> Result<String, X509Error> {
        self.to_pem().map(|pem| pem.to_string())
    }

    fn mapped_out(&self) -> Result<Value, X509Error> {
        let mut value = self.value.clone();
        if let Some(extensions) = value.pointer_mut("tbsCertificate/extensions") {
            map_out_extensions(extensions, self.registry)?;
        }
        for name in ["tbsCertificate/issuer", "tbsCertificate/subject"] {
            if let Some(name) = value.pointer_mut(name) {
                map_out_name(name, self.registry)?;
            }
        }
        Ok(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    pub fn registry(&self) -> &'r ExtensionRegistry {
        self.registry
    }

    /// DER of `tbsCertificate` as loaded.
    pub fn signature_subject(&self) -> &[u8] {
        &self.signature_subject
    }

    /// Signature bits, without the unused-bits octet.
    pub fn signature(&self) -> Option<&[u8]> {
        self.value
            .pointer("signature")
            .and_then(Value::as_bit_string)
            .map(|bits| bits.payload())
    }

    pub fn ty(&self) -> CertType {
        match self.basic_constraints_ca() {
            Some(true) if self.issuer().ok() == self.subject().ok() => CertType::Root,
            Some(true) => CertType::Intermediate,
            Some(false) => CertType::Leaf,
            None => CertType::Unknown,
        }
    }

    pub fn serial_number(&self) -> Option<&BigInt> {
        self.value
            .pointer("tbsCertificate/serialNumber")
            .and_then(Value::as_integer)
    }

    pub fn subject(&self) -> Result<DistinguishedName, X509Error> {
        self.name("tbsCertificate/subject")
    }

    pub fn issuer(&self) -> Result<DistinguishedName, X509Error> {
        self.name("tbsCertificate/issuer")
    }

    fn name(&self, path: &str) -> Result<DistinguishedName, X509Error> {
        let mut name = self.value.pointer(path).cloned().ok_or(X509Error::Malformed {
            element: "distinguished name",
        })?;
        map_out_name(&mut name, self.registry)?;
        DistinguishedName::from_value(&name)
    }

    pub fn not_before(&self) -> Option<Asn1Time> {
        self.time("tbsCertificate/validity/notBefore")
    }

    pub fn not_after(&self) -> Option<Asn1Time> {
        self.time("tbsCertificate/validity/notAfter")
    }

    fn time(&self, path: &str) -> Option<Asn1Time> {
        self.value.pointer(path)?.unwrap_any().as_time().copied()
    }

    pub fn public_key(&self) -> Result<PublicKey, X509Error> {
        self.value
            .pointer("tbsCertificate/subjectPublicKeyInfo")
            .cloned()
            .map(PublicKey::from)
            .ok_or(X509Error::Malformed {
                element: "subject public key info",
            })
    }

    pub fn signature_algorithm(&self) -> Result<SignatureAlgorithm, SignatureError> {
        SignatureAlgorithm::from_algorithm_identifier(self.value.pointer("signatureAlgorithm").unwrap_or(&Value::Null))
    }

    fn basic_constraints_ca(&self) -> Option<bool> {
        let constraints = extension::get(self.extensions_value(), oids::ID_CE_BASIC_CONSTRAINTS).ok()??;
        Some(constraints.pointer("cA").and_then(Value::as_bool).unwrap_or(false))
    }

    /// Whether basicConstraints marks the certificate as a CA.
    pub fn is_ca(&self) -> bool {
        self.basic_constraints_ca().unwrap_or(false)
    }

    fn extensions_value(&self) -> Option<&Value> {
        self.value.pointer("tbsCertificate/extensions")
    }

    /// Mapped value of an extension given by name or dotted id.
    pub fn extension(&self, id: &str) -> Result<Option<&Value>, X509Error> {
        extension::get(self.extensions_value(), id)
    }

    pub fn extension_critical(&self, id: &str) -> Result<Option<bool>, X509Error> {
        extension::is_critical(self.extensions_value(), id)
    }

    /// Dotted ids of the extensions, in order.
    pub fn extensions(&self) -> Vec<String> {
        extension::ids(self.extensions_value())
    }

    /// Adds an extension, or overwrites it when `replace` is set. The certificate becomes v3.
    ///
    /// Returns `false` if the extension exists and `replace` isn't set. The value must
    /// follow the schema registered for the id, or be an opaque element.
    pub fn set_extension(&mut self, id: &str, value: Value, critical: bool, replace: bool) -> Result<bool, X509Error> {
        let tbs = self
            .value
            .pointer_mut("tbsCertificate")
            .and_then(Value::as_fields_mut)
            .ok_or(X509Error::Malformed {
                element: "tbsCertificate",
            })?;

        if !tbs.contains("extensions") {
            tbs.insert("extensions", Value::List(Vec::new()));
        }
        let extensions = tbs
            .get_mut("extensions")
            .and_then(Value::as_list_mut)
            .ok_or(X509Error::Malformed { element: "extensions" })?;

        let changed = extension::set(extensions, id, value, critical, replace)?;
        if changed {
            tbs.insert("version", Value::Label("v3".to_owned()));
        }
        Ok(changed)
    }

    pub fn remove_extension(&mut self, id: &str) -> Result<bool, X509Error> {
        match self
            .value
            .pointer_mut("tbsCertificate/extensions")
            .and_then(Value::as_list_mut)
        {
            Some(extensions) => extension::remove(extensions, id),
            None => Ok(false),
        }
    }

    pub fn subject_key_identifier(&self) -> Option<&[u8]> {
        extension::get(self.extensions_value(), oids::ID_CE_SUBJECT_KEY_IDENTIFIER)
            .ok()??
            .as_octet_string()
    }

    /// `keyIdentifier` of the authorityKeyIdentifier extension.
    pub fn authority_key_identifier(&self) -> Option<&[u8]> {
        extension::get(self.extensions_value(), oids::ID_CE_AUTHORITY_KEY_IDENTIFIER)
            .ok()??
            .pointer("keyIdentifier")?
            .as_octet_string()
    }

    pub fn authority_cert_serial_number(&self) -> Option<&BigInt> {
        extension::get(self.extensions_value(), oids::ID_CE_AUTHORITY_KEY_IDENTIFIER)
            .ok()??
            .pointer("authorityCertSerialNumber")?
            .as_integer()
    }

    /// URIs of the caIssuers access descriptions of the authorityInfoAccess extension.
    pub fn ca_issuer_urls(&self) -> Vec<&str> {
        let Ok(Some(descriptions)) = extension::get(self.extensions_value(), oids::ID_PE_AUTHORITY_INFO_ACCESS) else {
            return Vec::new();
        };

        descriptions
            .as_list()
            .into_iter()
            .flatten()
            .filter(|description| {
                description.pointer("accessMethod").and_then(Value::as_oid) == Some(oids::ID_AD_CA_ISSUERS)
            })
            .filter_map(|description| {
                description
                    .pointer("accessLocation/uniformResourceIdentifier")
                    .and_then(Value::as_str)
            })
            .collect()
    }

    /// Matches the host of `url` against the subjectAltName entries, or against the
    /// subject common name when there is no subjectAltName.
    ///
    /// A `*` in a name matches within one label only.
    pub fn validate_url(&self, url: &str) -> bool {
        let Some(host) = url_host(url) else {
            return false;
        };

        if let Ok(Some(names)) = self.extension(oids::ID_CE_SUBJECT_ALT_NAME) {
            let host_ip = host.parse::<IpAddr>().ok();
            return names.as_list().into_iter().flatten().any(|name| match name.as_choice() {
                Some(("dNSName", pattern)) => pattern.as_str().is_some_and(|pattern| wildcard_match(pattern, host)),
                Some(("iPAddress", address)) => match (address.as_str(), host_ip) {
                    (Some(address), Some(host_ip)) => address.parse::<IpAddr>().ok() == Some(host_ip),
                    _ => false,
                },
                _ => false,
            });
        }

        let Ok(subject) = self.subject() else {
            return false;
        };
        match subject.get("CN").ok().and_then(|names| names.into_iter().next()) {
            Some(Value::String(common_name)) => wildcard_match(&common_name, host),
            _ => false,
        }
    }

    /// `notBefore <= at <= notAfter`.
    pub fn validate_date(&self, at: Asn1Time) -> bool {
        match (self.not_before(), self.not_after()) {
            (Some(not_before), Some(not_after)) => not_before <= at && at <= not_after,
            _ => false,
        }
    }

    pub fn verify_signature(&self, public_key: &PublicKey) -> Result<(), SignatureError> {
        verify_signed(&self.value, &self.signature_subject, public_key)
    }

    /// Issuer and subject match, and the key identifiers agree when both are present.
    pub fn is_self_signed_candidate(&self, mode: DnMatch) -> bool {
        let names_match = match (self.issuer(), self.subject()) {
            (Ok(issuer), Ok(subject)) => issuer.matches(&subject, mode),
            _ => false,
        };

        names_match
            && match (self.authority_key_identifier(), self.subject_key_identifier()) {
                (Some(authority), Some(subject)) => authority == subject,
                _ => true,
            }
    }
}

/// Host part of `scheme://[user@]host[:port][/path]`, brackets of IPv6 literals removed.
fn url_host(url: &str) -> Option<&str> {
    let (_, rest) = url.split_once("://")?;
    let authority = rest.split(['/', '?', '#']).next()?;
    let host_port = authority.rsplit('@').next()?;

    let host = if let Some(bracketed) = host_port.strip_prefix('[') {
        bracketed.split(']').next()?
    } else {
        host_port.split(':').next()?
    };

    (!host.is_empty()).then_some(host)
}

fn wildcard_match(pattern: &str, host: &str) -> bool {
    let pattern_labels: Vec<&str> = pattern.split('.').collect();
    let host_labels: Vec<&str> = host.split('.').collect();

    pattern_labels.len() == host_labels.len()
        && pattern_labels
            .iter()
            .zip(&host_labels)
            .all(|(pattern, label)| label_match(pattern, label))
}

fn label_match(pattern: &str, label: &str) -> bool {
    let Some((prefix, rest)) = pattern.split_once('*') else {
        return pattern.eq_ignore_ascii_case(label);
    };

    match label.get(..prefix.len()) {
        Some(head) if head.eq_ignore_ascii_case(prefix) => {
            let tail = &label[prefix.len()..];
            (0..=tail.len())
                .filter(|index| tail.is_char_boundary(*index))
                .any(|index| label_match(rest, &tail[index..]))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("*.tessera.test", "www.tessera.test", true)]
    #[case("*.tessera.test", "tessera.test", false)]
    #[case("*.tessera.test", "a.b.tessera.test", false)]
    #[case("w*.tessera.test", "www.tessera.test", true)]
    #[case("w*w.tessera.test", "www.tessera.test", true)]
    #[case("w*x.tessera.test", "www.tessera.test", false)]
    #[case("WWW.Tessera.test", "www.tessera.TEST", true)]
    fn wildcards(#[case] pattern: &str, #[case] host: &str, #[case] expected: bool) {
        assert_eq!(wildcard_match(pattern, host), expected);
    }

    #[rstest]
    #[case("https://www.tessera.test/index.html", Some("www.tessera.test"))]
    #[case("https://user@www.tessera.test:8443", Some("www.tessera.test"))]
    #[case("https://[2001:db8::1]:443/", Some("2001:db8::1"))]
    #[case("www.tessera.test", None)]
    fn hosts(#[case] url: &str, #[case] expected: Option<&str>) {
        assert_eq!(url_host(url), expected);
    }

    #[test]
    fn root_ca_fields() {
        let cert = Cert::from_pem_str(tessera_test_data::ROOT_CA).unwrap();
        assert_eq!(cert.ty(), CertType::Root);
        assert!(cert.is_ca());
        assert_eq!(cert.subject().unwrap(), cert.issuer().unwrap());
        assert_eq!(cert.not_after().unwrap().year(), 2049);
        assert!(cert.is_self_signed_candidate(DnMatch::Exact));
        assert_eq!(
            cert.signature_algorithm().unwrap(),
            SignatureAlgorithm::RsaPkcs1v15(crate::hash::HashAlgorithm::SHA2_256)
        );
    }

    #[test]
    fn leaf_fields() {
        let cert = Cert::from_pem_str(tessera_test_data::LEAF).unwrap();
        assert_eq!(cert.ty(), CertType::Leaf);
        assert!(!cert.is_self_signed_candidate(DnMatch::Canonical));
        assert_eq!(cert.ca_issuer_urls(), vec!["http://ca.tessera.test/intermediate.crt"]);
        assert_eq!(
            cert.authority_key_identifier().map(hex::encode).as_deref(),
            Some("7ea2e175b635bb613fa36157908751c8fef9d3c5")
        );
    }

    #[test]
    fn der_round_trip() {
        for pem in [
            tessera_test_data::ROOT_CA,
            tessera_test_data::INTERMEDIATE_CA,
            tessera_test_data::LEAF,
        ] {
            let der = crate::pem::parse_pem(pem).unwrap().into_data().into_owned();
            let cert = Cert::load(&der).unwrap();
            assert_eq!(cert.to_der().unwrap(), der);
        }
    }

    #[test]
    fn load_detects_pem() {
        let cert = Cert::load(tessera_test_data::INTERMEDIATE_CA.as_bytes()).unwrap();
        assert_eq!(cert.to_pem_str().unwrap(), tessera_test_data::INTERMEDIATE_CA.trim_end());
    }

    #[test]
    fn wrong_pem_label() {
        let err = Cert::from_pem_str(tessera_test_data::CSR).unwrap_err();
        assert!(matches!(err, X509Error::InvalidPemLabel { label } if label == "CERTIFICATE REQUEST"));
    }
}
