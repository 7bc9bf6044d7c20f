use super::certificate::Cert;
use super::name::DistinguishedName;
use super::utils::{
    decode_signed, encode, load, map_in_extensions, map_in_name, map_out_extensions, map_out_name, verify_signed,
};
use super::{extension, X509Error};
use crate::pem::{parse_pem, Pem};
use crate::signature::{SignatureAlgorithm, SignatureError};
use std::fmt;
use tessera_asn1::{Asn1Time, BigInt, Value};
use tessera_asn1_x509::certificate::time_value;
use tessera_asn1_x509::{certificate_list, oids, ExtensionRegistry};

const CRL_PEM_LABEL: &str = "X509 CRL";

const REVOKED: &str = "tbsCertList/revokedCertificates";
const CRL_EXTENSIONS: &str = "tbsCertList/crlExtensions";

/// A certificate revocation list.
///
/// Revoked entries are looked up by serial number, compared as integers.
#[derive(Clone)]
pub struct Crl<'r> {
    value: Value,
    signature_subject: Vec<u8>,
    registry: &'r ExtensionRegistry,
}

impl fmt::Debug for Crl<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Crl")
            .field("value", &self.value)
            .field("signature_subject", &hex::encode(&self.signature_subject))
            .finish_non_exhaustive()
    }
}

impl PartialEq for Crl<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value && self.signature_subject == other.signature_subject
    }
}

impl Crl<'static> {
    pub fn from_der<T: ?Sized + AsRef<[u8]>>(der: &T) -> Result<Self, X509Error> {
        Self::from_der_with(der, ExtensionRegistry::builtin())
    }

    pub fn from_pem(pem: &Pem) -> Result<Self, X509Error> {
        Self::from_pem_with(pem, ExtensionRegistry::builtin())
    }

    pub fn from_pem_str(pem_str: &str) -> Result<Self, X509Error> {
        Self::from_pem(&parse_pem(pem_str)?)
    }

    pub fn load<T: ?Sized + AsRef<[u8]>>(input: &T) -> Result<Self, X509Error> {
        Self::load_with(input, ExtensionRegistry::builtin())
    }
}

impl<'r> Crl<'r> {
    pub fn from_der_with<T: ?Sized + AsRef<[u8]>>(der: &T, registry: &'r ExtensionRegistry) -> Result<Self, X509Error> {
        let (mut value, signature_subject) = decode_signed(der.as_ref(), &certificate_list(), "certificate list")?;

        if let Some(extensions) = value.pointer_mut(CRL_EXTENSIONS) {
            map_in_extensions(extensions, registry);
        }
        if let Some(entries) = value.pointer_mut(REVOKED).and_then(Value::as_list_mut) {
            for entry in entries {
                if let Some(extensions) = entry.pointer_mut("crlEntryExtensions") {
                    map_in_extensions(extensions, registry);
                }
            }
        }
        if let Some(issuer) = value.pointer_mut("tbsCertList/issuer") {
            map_in_name(issuer, registry);
        }

        Ok(Self {
            value,
            signature_subject,
            registry,
        })
    }

    pub fn from_pem_with(pem: &Pem, registry: &'r ExtensionRegistry) -> Result<Self, X509Error> {
        match pem.label() {
            CRL_PEM_LABEL => Self::from_der_with(pem.data(), registry),
            _ => Err(X509Error::InvalidPemLabel {
                label: pem.label().to_owned(),
            }),
        }
    }

    pub fn load_with<T: ?Sized + AsRef<[u8]>>(input: &T, registry: &'r ExtensionRegistry) -> Result<Self, X509Error> {
        load(input.as_ref(), CRL_PEM_LABEL, |der| Self::from_der_with(der, registry))
    }

    pub fn to_der(&self) -> Result<Vec<u8>, X509Error> {
        let mut value = self.value.clone();
        if let Some(extensions) = value.pointer_mut(CRL_EXTENSIONS) {
            map_out_extensions(extensions, self.registry)?;
        }
        if let Some(entries) = value.pointer_mut(REVOKED).and_then(Value::as_list_mut) {
            for entry in entries {
                if let Some(extensions) = entry.pointer_mut("crlEntryExtensions") {
                    map_out_extensions(extensions, self.registry)?;
                }
            }
        }
        if let Some(issuer) = value.pointer_mut("tbsCertList/issuer") {
            map_out_name(issuer, self.registry)?;
        }
        encode(&value, &certificate_list(), "certificate list")
    }

    pub fn to_pem(&self) -> Result<Pem<'static>, X509Error> {
        Ok(Pem::new(CRL_PEM_LABEL, self.to_der()?))
    }

    pub fn to_pem_str(&self) -> Result<String, X509Error> {
        self.to_pem().map(|pem| pem.to_string())
    }

    pub fn as_value(&self) -> &Value {
        &self.value
    }

    /// DER of `tbsCertList` as loaded.
    pub fn signature_subject(&self) -> &[u8] {
        &self.signature_subject
    }

    pub fn issuer(&self) -> Result<DistinguishedName, X509Error> {
        let mut issuer = self
            .value
            .pointer("tbsCertList/issuer")
            .cloned()
            .ok_or(X509Error::Malformed { element: "issuer" })?;
        map_out_name(&mut issuer, self.registry)?;
        DistinguishedName::from_value(&issuer)
    }

    pub fn this_update(&self) -> Option<Asn1Time> {
        self.value.pointer("tbsCertList/thisUpdate")?.unwrap_any().as_time().copied()
    }

    pub fn next_update(&self) -> Option<Asn1Time> {
        self.value.pointer("tbsCertList/nextUpdate")?.unwrap_any().as_time().copied()
    }

    pub fn signature_algorithm(&self) -> Result<SignatureAlgorithm, SignatureError> {
        SignatureAlgorithm::from_algorithm_identifier(self.value.pointer("signatureAlgorithm").unwrap_or(&Value::Null))
    }

    /// Checks the signature with the key of `ca`.
    pub fn verify_issued_by(&self, ca: &Cert) -> Result<(), SignatureError> {
        let public_key = ca.public_key().map_err(|_| SignatureError::BadSignature)?;
        verify_signed(&self.value, &self.signature_subject, &public_key)
    }

    fn entries(&self) -> &[Value] {
        self.value.pointer(REVOKED).and_then(Value::as_list).unwrap_or_default()
    }

    /// The `revokedCertificates` entry of a serial number.
    pub fn revoked(&self, serial: &BigInt) -> Option<&Value> {
        self.entries().iter().find(|entry| entry_serial(entry) == Some(serial))
    }

    pub fn revoked_serials(&self) -> Vec<BigInt> {
        self.entries().iter().filter_map(entry_serial).cloned().collect()
    }

    /// Reason code of a revoked serial, as its label.
    pub fn revocation_reason(&self, serial: &BigInt) -> Option<&str> {
        let extensions = self.revoked(serial)?.pointer("crlEntryExtensions");
        extension::get(extensions, oids::ID_CE_CRL_REASONS).ok()??.as_label()
    }

    /// Lists `serial` as revoked at `date`, now by default.
    ///
    /// Returns `false` when the serial is already listed, leaving its entry as is.
    pub fn revoke(&mut self, serial: &BigInt, date: Option<Asn1Time>) -> Result<bool, X509Error> {
        if self.revoked(serial).is_some() {
            return Ok(false);
        }

        let date = date.unwrap_or_else(Asn1Time::now);
        let entry = Value::sequence([
            ("userCertificate", Value::Integer(serial.clone())),
            ("revocationDate", time_value(date)),
        ]);
        log::debug!("revoking serial {serial} at {date}");

        let tbs = self
            .value
            .pointer_mut("tbsCertList")
            .and_then(Value::as_fields_mut)
            .ok_or(X509Error::Malformed { element: "tbsCertList" })?;
        if !tbs.contains("revokedCertificates") {
            tbs.insert("revokedCertificates", Value::List(Vec::new()));
        }
        tbs.get_mut("revokedCertificates")
            .and_then(Value::as_list_mut)
            .ok_or(X509Error::Malformed {
                element: "revoked certificates",
            })?
            .push(entry);
        Ok(true)
    }

    /// Drops the entry of `serial`. An emptied list is removed altogether.
    pub fn unrevoke(&mut self, serial: &BigInt) -> bool {
        let Some(tbs) = self.value.pointer_mut("tbsCertList").and_then(Value::as_fields_mut) else {
            return false;
        };
        let Some(entries) = tbs.get_mut("revokedCertificates").and_then(Value::as_list_mut) else {
            return false;
        };

        let before = entries.len();
        entries.retain(|entry| entry_serial(entry) != Some(serial));
        let removed = entries.len() != before;

        if entries.is_empty() {
            tbs.remove("revokedCertificates");
        }
        removed
    }

    fn extensions_value(&self) -> Option<&Value> {
        self.value.pointer(CRL_EXTENSIONS)
    }

    /// Mapped value of a CRL extension.
    pub fn extension(&self, id: &str) -> Result<Option<&Value>, X509Error> {
        extension::get(self.extensions_value(), id)
    }

    pub fn extension_critical(&self, id: &str) -> Result<Option<bool>, X509Error> {
        extension::is_critical(self.extensions_value(), id)
    }

    pub fn extensions(&self) -> Vec<String> {
        extension::ids(self.extensions_value())
    }

    /// Adds a CRL extension, or overwrites it when `replace` is set. The list becomes v2.
    pub fn set_extension(&mut self, id: &str, value: Value, critical: bool, replace: bool) -> Result<bool, X509Error> {
        let tbs = self
            .value
            .pointer_mut("tbsCertList")
            .and_then(Value::as_fields_mut)
            .ok_or(X509Error::Malformed { element: "tbsCertList" })?;

        if !tbs.contains("crlExtensions") {
            tbs.insert("crlExtensions", Value::List(Vec::new()));
        }
        let extensions = tbs
            .get_mut("crlExtensions")
            .and_then(Value::as_list_mut)
            .ok_or(X509Error::Malformed { element: "extensions" })?;

        let changed = extension::set(extensions, id, value, critical, replace)?;
        if changed {
            tbs.insert("version", Value::Label("v2".to_owned()));
        }
        Ok(changed)
    }

    pub fn remove_extension(&mut self, id: &str) -> Result<bool, X509Error> {
        match self.value.pointer_mut(CRL_EXTENSIONS).and_then(Value::as_list_mut) {
            Some(extensions) => extension::remove(extensions, id),
            None => Ok(false),
        }
    }

    /// `cRLNumber` extension.
    pub fn crl_number(&self) -> Option<&BigInt> {
        self.extension(oids::ID_CE_CRL_NUMBER).ok()??.as_integer()
    }

    pub fn entry_extension(&self, serial: &BigInt, id: &str) -> Result<Option<&Value>, X509Error> {
        extension::get(self.revoked(serial).and_then(|entry| entry.pointer("crlEntryExtensions")), id)
    }

    pub fn entry_extensions(&self, serial: &BigInt) -> Vec<String> {
        extension::ids(self.revoked(serial).and_then(|entry| entry.pointer("crlEntryExtensions")))
    }

    /// Adds an extension to the entry of `serial`, revoking it now if it isn't listed yet.
    pub fn set_entry_extension(
        &mut self,
        serial: &BigInt,
        id: &str,
        value: Value,
        critical: bool,
        replace: bool,
    ) -> Result<bool, X509Error> {
        self.revoke(serial, None)?;

        let entry = self
            .value
            .pointer_mut(REVOKED)
            .and_then(Value::as_list_mut)
            .and_then(|entries| entries.iter_mut().find(|entry| entry_serial(entry) == Some(serial)))
            .and_then(Value::as_fields_mut)
            .ok_or(X509Error::Malformed {
                element: "revoked certificate",
            })?;

        if !entry.contains("crlEntryExtensions") {
            entry.insert("crlEntryExtensions", Value::List(Vec::new()));
        }
        let extensions = entry
            .get_mut("crlEntryExtensions")
            .and_then(Value::as_list_mut)
            .ok_or(X509Error::Malformed { element: "extensions" })?;

        let changed = extension::set(extensions, id, value, critical, replace)?;
        if changed {
            if let Some(tbs) = self.value.pointer_mut("tbsCertList").and_then(Value::as_fields_mut) {
                tbs.insert("version", Value::Label("v2".to_owned()));
            }
        }
        Ok(changed)
    }

    pub fn remove_entry_extension(&mut self, serial: &BigInt, id: &str) -> Result<bool, X509Error> {
        let extensions = self
            .value
            .pointer_mut(REVOKED)
            .and_then(Value::as_list_mut)
            .and_then(|entries| entries.iter_mut().find(|entry| entry_serial(entry) == Some(serial)))
            .and_then(|entry| entry.pointer_mut("crlEntryExtensions"))
            .and_then(Value::as_list_mut);

        match extensions {
            Some(extensions) => extension::remove(extensions, id),
            None => Ok(false),
        }
    }
}

fn entry_serial(entry: &Value) -> Option<&BigInt> {
    entry.pointer("userCertificate").and_then(Value::as_integer)
}
