use super::X509Error;
use crate::key::PublicKey;
use crate::pem::{looks_like_pem, parse_pem, Pem};
use crate::signature::{SignatureAlgorithm, SignatureError};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::LazyLock;
use tessera_asn1::{Any, Schema, Value};
use tessera_asn1_der::{decode_ber, from_der_with_hooks, to_der, to_der_with_hooks, Asn1DerError, Hooks, Mapper};
use tessera_asn1_x509::{oids, ExtensionRegistry};

/// DER of a value held by an ANY field.
pub(crate) fn any_to_der(value: &Value) -> Result<Vec<u8>, Asn1DerError> {
    to_der(value, &Schema::any())
}

static IP_HOOKS: LazyLock<Hooks> = LazyLock::new(|| {
    Hooks::new()
        .on_decode("iPAddress", decode_ip_address)
        .on_encode("iPAddress", encode_ip_address)
});

/// Hooks rendering `iPAddress` general names as text.
pub(crate) fn ip_hooks() -> &'static Hooks {
    &IP_HOOKS
}

fn decode_ip_address(value: Value) -> tessera_asn1_der::Result<Value> {
    let Value::OctetString(octets) = &value else {
        return Ok(value);
    };

    let text = match octets.len() {
        4 | 16 => ip_from_octets(octets).map(|ip| ip.to_string()),
        // address and mask, as found in name constraints
        8 | 32 => {
            let (address, mask) = octets.split_at(octets.len() / 2);
            ip_from_octets(address)
                .zip(ip_from_octets(mask))
                .map(|(address, mask)| format!("{address}/{mask}"))
        }
        _ => None,
    };

    Ok(text.map(Value::String).unwrap_or(value))
}

fn encode_ip_address(value: Value) -> tessera_asn1_der::Result<Value> {
    let Value::String(text) = &value else {
        return Ok(value);
    };

    let invalid = || Asn1DerError::Hook {
        field: "iPAddress".to_owned(),
        reason: format!("`{text}` is not an IP address"),
    };

    let mut octets = Vec::with_capacity(32);
    match text.split_once('/') {
        Some((address, mask)) => {
            let address: IpAddr = address.trim().parse().map_err(|_| invalid())?;
            let mask: IpAddr = mask.trim().parse().map_err(|_| invalid())?;
            if address.is_ipv4() != mask.is_ipv4() {
                return Err(invalid());
            }
            octets.extend(ip_octets(address));
            octets.extend(ip_octets(mask));
        }
        None => {
            let address: IpAddr = text.trim().parse().map_err(|_| invalid())?;
            octets.extend(ip_octets(address));
        }
    }

    Ok(Value::OctetString(octets))
}

fn ip_from_octets(octets: &[u8]) -> Option<IpAddr> {
    if let Ok(v4) = <[u8; 4]>::try_from(octets) {
        return Some(IpAddr::V4(Ipv4Addr::from(v4)));
    }
    <[u8; 16]>::try_from(octets).ok().map(|v6| IpAddr::V6(Ipv6Addr::from(v6)))
}

fn ip_octets(ip: IpAddr) -> Vec<u8> {
    match ip {
        IpAddr::V4(v4) => v4.octets().to_vec(),
        IpAddr::V6(v6) => v6.octets().to_vec(),
    }
}

/// Dotted form of an id given by name or already dotted.
pub(crate) fn resolve_id(id: &str) -> Result<String, X509Error> {
    oids::resolve(id).ok_or_else(|| X509Error::UnknownId { name: id.to_owned() })
}

/// Decodes a signed document, keeping a copy of its first inner element (the signed part).
pub(crate) fn decode_signed(der: &[u8], schema: &Schema, element: &'static str) -> Result<(Value, Vec<u8>), X509Error> {
    let deserialization = |source| X509Error::Asn1Deserialization { element, source };

    let node = decode_ber(der).map_err(deserialization)?;
    let value = Mapper::new(der).map(&node, schema).map_err(deserialization)?;
    let signature_subject = node
        .children()
        .first()
        .map(|subject| subject.raw(der).to_vec())
        .ok_or(X509Error::Malformed { element })?;

    Ok((value, signature_subject))
}

pub(crate) fn encode(value: &Value, schema: &Schema, element: &'static str) -> Result<Vec<u8>, X509Error> {
    to_der(value, schema).map_err(|source| X509Error::Asn1Serialization { element, source })
}

/// Parses `input` as DER first, then as PEM with the expected label.
pub(crate) fn load<T>(
    input: &[u8],
    pem_label: &str,
    parse: impl Fn(&[u8]) -> Result<T, X509Error>,
) -> Result<T, X509Error> {
    match parse(input) {
        Ok(document) => Ok(document),
        Err(_) if looks_like_pem(input) => {
            let der = pem_data(parse_pem(input)?, pem_label)?;
            parse(&der)
        }
        Err(e) => Err(e),
    }
}

pub(crate) fn pem_data(pem: Pem, pem_label: &str) -> Result<Vec<u8>, X509Error> {
    if pem.label() != pem_label {
        return Err(X509Error::InvalidPemLabel {
            label: pem.label().to_owned(),
        });
    }
    Ok(pem.into_data().into_owned())
}

/// Checks the signature of a signed document against its kept signature subject.
pub(crate) fn verify_signed(value: &Value, signature_subject: &[u8], public_key: &PublicKey) -> Result<(), SignatureError> {
    let algorithm = SignatureAlgorithm::from_algorithm_identifier(value.pointer("signatureAlgorithm").unwrap_or(&Value::Null))?;
    let signature = value
        .pointer("signature")
        .and_then(Value::as_bit_string)
        .ok_or(SignatureError::BadSignature)?;
    algorithm.verify(public_key, signature_subject, signature.payload())
}

/// Turns every `extnValue` of an `Extensions` list into the value of its registered schema.
///
/// Ids without a schema, deliberately opaque ones and values failing to decode keep their
/// raw bytes as an opaque element.
pub(crate) fn map_in_extensions(extensions: &mut Value, registry: &ExtensionRegistry) {
    let Some(extensions) = extensions.as_list_mut() else {
        return;
    };

    for extension in extensions {
        let Some(id) = extension.pointer("extnId").and_then(Value::as_oid).map(str::to_owned) else {
            continue;
        };
        let Some(extn_value) = extension.pointer_mut("extnValue") else {
            continue;
        };
        let Some(raw) = extn_value.as_octet_string().map(<[u8]>::to_vec) else {
            continue;
        };

        *extn_value = map_in_extension_value(&id, raw, registry);
    }
}

fn map_in_extension_value(id: &str, raw: Vec<u8>, registry: &ExtensionRegistry) -> Value {
    if registry.is_opaque(id) {
        return Value::opaque(raw);
    }
    let Some(schema) = registry.lookup(id) else {
        log::debug!("no schema for extension {}, keeping it opaque", oids::display_name(id));
        return Value::opaque(raw);
    };

    match from_der_with_hooks(&raw, schema, ip_hooks()) {
        Ok(mut value) => {
            if id == oids::ID_CE_CERTIFICATE_POLICIES {
                map_in_policy_qualifiers(&mut value, registry);
            }
            value
        }
        Err(e) => {
            log::warn!("couldn't decode extension {}: {e}", oids::display_name(id));
            Value::opaque(raw)
        }
    }
}

/// Inverse of [`map_in_extensions`].
pub(crate) fn map_out_extensions(extensions: &mut Value, registry: &ExtensionRegistry) -> Result<(), X509Error> {
    let Some(extensions) = extensions.as_list_mut() else {
        return Ok(());
    };

    for extension in extensions {
        let Some(id) = extension.pointer("extnId").and_then(Value::as_oid).map(str::to_owned) else {
            continue;
        };
        let Some(extn_value) = extension.pointer_mut("extnValue") else {
            continue;
        };

        let value = std::mem::replace(extn_value, Value::Null);
        *extn_value = map_out_extension_value(&id, value, registry)?;
    }

    Ok(())
}

fn map_out_extension_value(id: &str, value: Value, registry: &ExtensionRegistry) -> Result<Value, X509Error> {
    if let Value::Any(Any::Opaque(element)) = value {
        return Ok(Value::OctetString(element.into_bytes()));
    }

    let schema = registry
        .lookup(id)
        .ok_or_else(|| X509Error::Unsupported { id: id.to_owned() })?;

    let mut value = value;
    if id == oids::ID_CE_CERTIFICATE_POLICIES {
        map_out_policy_qualifiers(&mut value, registry)?;
    }

    let der = to_der_with_hooks(&value, schema, ip_hooks()).map_err(|source| X509Error::Asn1Serialization {
        element: "extension value",
        source,
    })?;
    Ok(Value::OctetString(der))
}

fn policy_qualifiers_mut(policies: &mut Value) -> impl Iterator<Item = &mut Value> {
    policies
        .as_list_mut()
        .into_iter()
        .flatten()
        .filter_map(|policy| policy.pointer_mut("policyQualifiers").and_then(Value::as_list_mut))
        .flatten()
}

fn map_in_policy_qualifiers(policies: &mut Value, registry: &ExtensionRegistry) {
    for qualifier in policy_qualifiers_mut(policies) {
        let Some(id) = qualifier.pointer("policyQualifierId").and_then(Value::as_oid).map(str::to_owned) else {
            continue;
        };
        if let Some(value) = qualifier.pointer_mut("qualifier") {
            map_in_any(value, &id, registry);
        }
    }
}

fn map_out_policy_qualifiers(policies: &mut Value, registry: &ExtensionRegistry) -> Result<(), X509Error> {
    for qualifier in policy_qualifiers_mut(policies) {
        let Some(id) = qualifier.pointer("policyQualifierId").and_then(Value::as_oid).map(str::to_owned) else {
            continue;
        };
        if let Some(value) = qualifier.pointer_mut("qualifier") {
            map_out_any(value, &id, registry)?;
        }
    }
    Ok(())
}

/// Replaces the content of an ANY field by the value of the schema registered for `id`.
pub(crate) fn map_in_any(value: &mut Value, id: &str, registry: &ExtensionRegistry) {
    let Some(schema) = registry.lookup(id) else {
        return;
    };
    if !matches!(value, Value::Any(_)) {
        return;
    }

    let mapped = any_to_der(value).and_then(|der| from_der_with_hooks(&der, schema, ip_hooks()));
    match mapped {
        Ok(mapped) => *value = mapped,
        Err(e) => log::warn!("couldn't map the value of {}: {e}", oids::display_name(id)),
    }
}

/// Inverse of [`map_in_any`]: the value becomes an opaque element again.
///
/// Values of ids without a schema are left for the ANY encoder.
pub(crate) fn map_out_any(value: &mut Value, id: &str, registry: &ExtensionRegistry) -> Result<(), X509Error> {
    if matches!(value, Value::Any(_)) {
        return Ok(());
    }
    let Some(schema) = registry.lookup(id) else {
        return Ok(());
    };
    let der = to_der_with_hooks(value, schema, ip_hooks()).map_err(|source| X509Error::Asn1Serialization {
        element: "attribute value",
        source,
    })?;
    *value = Value::opaque(der);
    Ok(())
}

fn attribute_type_and_values_mut(name: &mut Value) -> impl Iterator<Item = &mut Value> {
    name.pointer_mut("rdnSequence")
        .and_then(Value::as_list_mut)
        .into_iter()
        .flatten()
        .filter_map(Value::as_list_mut)
        .flatten()
}

/// Maps the DN attribute values that have a registered schema.
pub(crate) fn map_in_name(name: &mut Value, registry: &ExtensionRegistry) {
    for attribute in attribute_type_and_values_mut(name) {
        let Some(id) = attribute.pointer("type").and_then(Value::as_oid).map(str::to_owned) else {
            continue;
        };
        if let Some(value) = attribute.pointer_mut("value") {
            map_in_any(value, &id, registry);
        }
    }
}

pub(crate) fn map_out_name(name: &mut Value, registry: &ExtensionRegistry) -> Result<(), X509Error> {
    for attribute in attribute_type_and_values_mut(name) {
        let Some(id) = attribute.pointer("type").and_then(Value::as_oid).map(str::to_owned) else {
            continue;
        };
        if let Some(value) = attribute.pointer_mut("value") {
            map_out_any(value, &id, registry)?;
        }
    }
    Ok(())
}

/// Maps every value of a PKCS#9 attribute list, descending into requested extensions.
pub(crate) fn map_in_attributes(attributes: &mut Value, registry: &ExtensionRegistry) {
    let Some(attributes) = attributes.as_list_mut() else {
        return;
    };

    for attribute in attributes {
        let Some(id) = attribute.pointer("type").and_then(Value::as_oid).map(str::to_owned) else {
            continue;
        };
        let Some(values) = attribute.pointer_mut("value").and_then(Value::as_list_mut) else {
            continue;
        };
        for value in values {
            map_in_any(value, &id, registry);
            if id == oids::PKCS_9_AT_EXTENSION_REQUEST {
                map_in_extensions(value, registry);
            }
        }
    }
}

pub(crate) fn map_out_attributes(attributes: &mut Value, registry: &ExtensionRegistry) -> Result<(), X509Error> {
    let Some(attributes) = attributes.as_list_mut() else {
        return Ok(());
    };

    for attribute in attributes {
        let Some(id) = attribute.pointer("type").and_then(Value::as_oid).map(str::to_owned) else {
            continue;
        };
        let Some(values) = attribute.pointer_mut("value").and_then(Value::as_list_mut) else {
            continue;
        };
        for value in values {
            if id == oids::PKCS_9_AT_EXTENSION_REQUEST {
                map_out_extensions(value, registry)?;
            }
            map_out_any(value, &id, registry)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tessera_asn1_der::from_der;
    use tessera_asn1_x509::name::general_name;

    #[test]
    fn ip_addresses_as_text() {
        let v4 = decode_ip_address(Value::OctetString(vec![192, 0, 2, 10])).unwrap();
        assert_eq!(v4, Value::string("192.0.2.10"));

        let mut v6 = vec![0x20, 0x01, 0x0d, 0xb8];
        v6.extend([0; 11]);
        v6.push(1);
        assert_eq!(decode_ip_address(Value::OctetString(v6.clone())).unwrap(), Value::string("2001:db8::1"));
        assert_eq!(encode_ip_address(Value::string("2001:db8::1")).unwrap(), Value::OctetString(v6));
    }

    #[test]
    fn name_constraint_subnets() {
        let subnet = Value::OctetString(vec![10, 0, 0, 0, 255, 0, 0, 0]);
        let text = decode_ip_address(subnet.clone()).unwrap();
        assert_eq!(text, Value::string("10.0.0.0/255.0.0.0"));
        assert_eq!(encode_ip_address(text).unwrap(), subnet);
    }

    #[test]
    fn odd_lengths_are_left_alone() {
        let odd = Value::OctetString(vec![1, 2, 3]);
        assert_eq!(decode_ip_address(odd.clone()).unwrap(), odd);
        assert!(encode_ip_address(Value::string("not an address")).is_err());
        assert!(encode_ip_address(Value::string("10.0.0.0/ffff::")).is_err());
    }

    #[test]
    fn hooks_run_on_general_names() {
        let der = [0x87, 0x04, 127, 0, 0, 1];
        let value = from_der_with_hooks(&der, &general_name(), ip_hooks()).unwrap();
        assert_eq!(value, Value::choice("iPAddress", Value::string("127.0.0.1")));
        assert_eq!(to_der_with_hooks(&value, &general_name(), ip_hooks()).unwrap(), der);
        assert_eq!(
            from_der(&der, &general_name()).unwrap(),
            Value::choice("iPAddress", Value::OctetString(vec![127, 0, 0, 1]))
        );
    }

    #[test]
    fn unknown_extensions_stay_opaque() {
        let registry = ExtensionRegistry::builtin();
        let mut extensions = Value::List(vec![Value::sequence([
            ("extnId", Value::oid("1.3.6.1.4.1.99999.7")),
            ("critical", Value::Boolean(false)),
            ("extnValue", Value::OctetString(vec![0x05, 0x00])),
        ])]);
        let original = extensions.clone();

        map_in_extensions(&mut extensions, registry);
        assert_eq!(extensions.pointer("0/extnValue"), Some(&Value::opaque(vec![0x05, 0x00])));

        map_out_extensions(&mut extensions, registry).unwrap();
        assert_eq!(extensions, original);
    }

    #[test]
    fn unregistered_values_cannot_be_saved() {
        let mut extensions = Value::List(vec![Value::sequence([
            ("extnId", Value::oid("1.3.6.1.4.1.99999.7")),
            ("critical", Value::Boolean(false)),
            ("extnValue", Value::integer(3)),
        ])]);
        let err = map_out_extensions(&mut extensions, ExtensionRegistry::builtin()).unwrap_err();
        assert!(matches!(err, X509Error::Unsupported { id } if id == "1.3.6.1.4.1.99999.7"));
    }
}
