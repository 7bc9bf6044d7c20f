use super::name::DistinguishedName;
use super::utils::{
    decode_signed, encode, load, map_in_attributes, map_in_name, map_out_attributes, map_out_name, resolve_id,
    verify_signed,
};
use super::{extension, X509Error};
use crate::key::PublicKey;
use crate::pem::{parse_pem, Pem};
use crate::signature::{SignatureAlgorithm, SignatureError};
use std::fmt;
use tessera_asn1::Value;
use tessera_asn1_x509::{certification_request, oids, ExtensionRegistry};

const CSR_PEM_LABEL: &str = "CERTIFICATE REQUEST";

const ATTRIBUTES: &str = "certificationRequestInfo/attributes";

/// Which values of a multi-valued attribute an edit applies to.
///
/// Indices run across every occurrence of the attribute, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// add a value to the last occurrence, or a new attribute
    Append,
    /// drop the attribute, then add it back with the single given value
    Replace,
    /// the value at this index
    At(usize),
    /// every value; setting with a [`Value::List`] stores each item as a value
    All,
}

/// A PKCS#10 certification request.
#[derive(Clone)]
pub struct Csr<'r> {
    value: Value,
    signature_subject: Vec<u8>,
    registry: &'r ExtensionRegistry,
}

impl fmt::Debug for Csr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Csr").field("value", &self.value).finish_non_exhaustive()
    }
}

impl PartialEq for Csr<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value && self.signature_subject == other.signature_subject
    }
}

impl Csr<'static> {
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

impl<'r> Csr<'r> {
    pub fn from_der_with<T: ?Sized + AsRef<[u8]>>(der: &T, registry: &'r ExtensionRegistry) -> Result<Self, X509Error> {
        let (mut value, signature_subject) =
            decode_signed(der.as_ref(), &certification_request(), "certification request")?;

        if let Some(attributes) = value.pointer_mut(ATTRIBUTES) {
            map_in_attributes(attributes, registry);
        }
        if let Some(subject) = value.pointer_mut("certificationRequestInfo/subject") {
            map_in_name(subject, registry);
        }

        Ok(Self {
            value,
            signature_subject,
            registry,
        })
    }

    pub fn from_pem_with(pem: &Pem, registry: &'r ExtensionRegistry) -> Result<Self, X509Error> {
        match pem.label() {
            CSR_PEM_LABEL => Self::from_der_with(pem.data(), registry),
            _ => Err(X509Error::InvalidPemLabel {
                label: pem.label().to_owned(),
            }),
        }
    }

    pub fn load_with<T: ?Sized + AsRef<[u8]>>(input: &T, registry: &'r ExtensionRegistry) -> Result<Self, X509Error> {
        load(input.as_ref(), CSR_PEM_LABEL, |der| Self::from_der_with(der, registry))
    }

    pub fn to_der(&self) -> Result<Vec<u8>, X509Error> {
        let mut value = self.value.clone();
        if let Some(attributes) = value.pointer_mut(ATTRIBUTES) {
            map_out_attributes(attributes, self.registry)?;
        }
        if let Some(subject) = value.pointer_mut("certificationRequestInfo/subject") {
            map_out_name(subject, self.registry)?;
        }
        encode(&value, &certification_request(), "certification request")
    }

    pub fn to_pem(&self) -> Result<Pem<'static>, X509Error> {
        Ok(Pem::new(CSR_PEM_LABEL, self.to_der()?))
    }

    pub fn to_pem_str(&self) -> Result<String, X509Error> {
        self.to_pem().map(|pem| pem.to_string())
    }

    pub fn as_value(&self) -> &Value {
        &self.value
    }

    /// DER of `certificationRequestInfo` as loaded.
    pub fn signature_subject(&self) -> &[u8] {
        &self.signature_subject
    }

    pub fn subject(&self) -> Result<DistinguishedName, X509Error> {
        let mut subject = self
            .value
            .pointer("certificationRequestInfo/subject")
            .cloned()
            .ok_or(X509Error::Malformed { element: "subject" })?;
        map_out_name(&mut subject, self.registry)?;
        DistinguishedName::from_value(&subject)
    }

    pub fn public_key(&self) -> Result<PublicKey, X509Error> {
        self.value
            .pointer("certificationRequestInfo/subjectPKInfo")
            .cloned()
            .map(PublicKey::from)
            .ok_or(X509Error::Malformed {
                element: "subject public key info",
            })
    }

    pub fn signature_algorithm(&self) -> Result<SignatureAlgorithm, SignatureError> {
        SignatureAlgorithm::from_algorithm_identifier(self.value.pointer("signatureAlgorithm").unwrap_or(&Value::Null))
    }

    /// Checks the signature with the key the request carries.
    pub fn verify_self(&self) -> Result<(), SignatureError> {
        let public_key = self.public_key().map_err(|_| SignatureError::BadSignature)?;
        verify_signed(&self.value, &self.signature_subject, &public_key)
    }

    fn attribute_list(&self) -> &[Value] {
        self.value.pointer(ATTRIBUTES).and_then(Value::as_list).unwrap_or_default()
    }

    fn attribute_list_mut(&mut self) -> Result<&mut Vec<Value>, X509Error> {
        self.value
            .pointer_mut(ATTRIBUTES)
            .and_then(Value::as_list_mut)
            .ok_or(X509Error::Malformed { element: "attributes" })
    }

    /// Dotted ids of the attributes, in order.
    pub fn attributes(&self) -> Vec<String> {
        self.attribute_list()
            .iter()
            .filter_map(|attribute| attribute.pointer("type").and_then(Value::as_oid))
            .map(str::to_owned)
            .collect()
    }

    /// Every value of an attribute, across all of its occurrences.
    pub fn attribute(&self, id: &str) -> Result<Vec<&Value>, X509Error> {
        let oid = resolve_id(id)?;
        Ok(self
            .attribute_list()
            .iter()
            .filter(|attribute| attribute_type(attribute) == Some(oid.as_str()))
            .filter_map(|attribute| attribute.pointer("value").and_then(Value::as_list))
            .flatten()
            .collect())
    }

    /// The `challengePassword` attribute, as text.
    pub fn challenge_password(&self) -> Option<String> {
        let values = self.attribute(oids::PKCS_9_AT_CHALLENGE_PASSWORD).ok()?;
        values.first()?.unwrap_any().as_str().map(str::to_owned)
    }

    /// Returns `false` when `At(index)` is out of range.
    pub fn set_attribute(&mut self, id: &str, value: Value, disposition: Disposition) -> Result<bool, X509Error> {
        let oid = resolve_id(id)?;
        let attributes = self.attribute_list_mut()?;

        let values = match disposition {
            Disposition::All => {
                attributes.retain(|attribute| attribute_type(attribute) != Some(oid.as_str()));
                match value {
                    Value::List(values) => values,
                    value => vec![value],
                }
            }
            Disposition::Replace => {
                attributes.retain(|attribute| attribute_type(attribute) != Some(oid.as_str()));
                vec![value]
            }
            Disposition::Append => {
                let last = attributes
                    .iter_mut()
                    .rev()
                    .find(|attribute| attribute_type(attribute) == Some(oid.as_str()))
                    .and_then(|attribute| attribute.pointer_mut("value"))
                    .and_then(Value::as_list_mut);
                match last {
                    Some(values) => {
                        values.push(value);
                        return Ok(true);
                    }
                    None => vec![value],
                }
            }
            Disposition::At(index) => {
                let slot = attributes
                    .iter_mut()
                    .filter(|attribute| attribute_type(attribute) == Some(oid.as_str()))
                    .filter_map(|attribute| attribute.pointer_mut("value").and_then(Value::as_list_mut))
                    .flatten()
                    .nth(index);
                return Ok(match slot {
                    Some(slot) => {
                        *slot = value;
                        true
                    }
                    None => false,
                });
            }
        };

        attributes.push(Value::sequence([
            ("type", Value::oid(oid)),
            ("value", Value::List(values)),
        ]));
        Ok(true)
    }

    /// `All` drops the attribute, `At(index)` one of its values. An attribute left without
    /// values is dropped. Returns whether something was removed.
    pub fn remove_attribute(&mut self, id: &str, disposition: Disposition) -> Result<bool, X509Error> {
        let oid = resolve_id(id)?;
        let attributes = self.attribute_list_mut()?;
        let is_target = |attribute: &Value| attribute_type(attribute) == Some(oid.as_str());

        match disposition {
            Disposition::Append | Disposition::Replace => Ok(false),
            Disposition::All => {
                let before = attributes.len();
                attributes.retain(|attribute| !is_target(attribute));
                Ok(attributes.len() != before)
            }
            Disposition::At(index) => {
                let mut remaining = index;
                let mut found = None;
                for (position, attribute) in attributes.iter().enumerate().filter(|(_, attribute)| is_target(attribute)) {
                    let count = attribute.pointer("value").and_then(Value::as_list).map_or(0, <[Value]>::len);
                    if remaining < count {
                        found = Some((position, remaining));
                        break;
                    }
                    remaining -= count;
                }

                let Some((position, index)) = found else {
                    return Ok(false);
                };
                let values = attributes[position]
                    .pointer_mut("value")
                    .and_then(Value::as_list_mut)
                    .ok_or(X509Error::Malformed { element: "attribute" })?;
                values.remove(index);
                if values.is_empty() {
                    attributes.remove(position);
                }
                Ok(true)
            }
        }
    }

    fn requested_extensions(&self) -> Option<&Value> {
        self.attribute(oids::PKCS_9_AT_EXTENSION_REQUEST).ok()?.into_iter().next()
    }

    fn requested_extensions_mut(&mut self, create: bool) -> Result<Option<&mut Vec<Value>>, X509Error> {
        let attributes = self.attribute_list_mut()?;
        let is_request =
            |attribute: &Value| attribute_type(attribute) == Some(oids::PKCS_9_AT_EXTENSION_REQUEST);

        if create && !attributes.iter().any(is_request) {
            attributes.push(Value::sequence([
                ("type", Value::oid(oids::PKCS_9_AT_EXTENSION_REQUEST)),
                ("value", Value::List(vec![Value::List(Vec::new())])),
            ]));
        }

        Ok(attributes
            .iter_mut()
            .find(|attribute| is_request(attribute))
            .and_then(|attribute| attribute.pointer_mut("value/0"))
            .and_then(Value::as_list_mut))
    }

    /// Mapped value of a requested extension.
    pub fn extension(&self, id: &str) -> Result<Option<&Value>, X509Error> {
        extension::get(self.requested_extensions(), id)
    }

    pub fn extension_critical(&self, id: &str) -> Result<Option<bool>, X509Error> {
        extension::is_critical(self.requested_extensions(), id)
    }

    /// Dotted ids of the requested extensions.
    pub fn extensions(&self) -> Vec<String> {
        extension::ids(self.requested_extensions())
    }

    /// Requests an extension, creating the extensionRequest attribute if needed.
    pub fn set_extension(&mut self, id: &str, value: Value, critical: bool, replace: bool) -> Result<bool, X509Error> {
        let extensions = self
            .requested_extensions_mut(true)?
            .ok_or(X509Error::Malformed {
                element: "extension request",
            })?;
        extension::set(extensions, id, value, critical, replace)
    }

    pub fn remove_extension(&mut self, id: &str) -> Result<bool, X509Error> {
        match self.requested_extensions_mut(false)? {
            Some(extensions) => extension::remove(extensions, id),
            None => Ok(false),
        }
    }
}

fn attribute_type(attribute: &Value) -> Option<&str> {
    attribute.pointer("type").and_then(Value::as_oid)
}
