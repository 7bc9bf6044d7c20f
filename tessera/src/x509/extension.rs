//! Lookup and editing of `Extensions` lists, shared by certificates, CRLs, CRL entries and
//! certification requests.
//!
//! Extension values are held mapped: the `extnValue` of a registered extension is the
//! value of its schema, anything else an opaque element.

use super::utils::resolve_id;
use super::X509Error;
use tessera_asn1::Value;

fn id_of(extension: &Value) -> Option<&str> {
    extension.pointer("extnId").and_then(Value::as_oid)
}

/// The `Extension` sequence with the given dotted id.
pub(crate) fn find<'v>(extensions: Option<&'v Value>, oid: &str) -> Option<&'v Value> {
    extensions?
        .as_list()?
        .iter()
        .find(|extension| id_of(extension) == Some(oid))
}

/// Mapped `extnValue` of an extension given by name or dotted id.
pub(crate) fn get<'v>(extensions: Option<&'v Value>, id: &str) -> Result<Option<&'v Value>, X509Error> {
    let oid = resolve_id(id)?;
    Ok(find(extensions, &oid).and_then(|extension| extension.pointer("extnValue")))
}

pub(crate) fn is_critical(extensions: Option<&Value>, id: &str) -> Result<Option<bool>, X509Error> {
    let oid = resolve_id(id)?;
    Ok(find(extensions, &oid).map(|extension| {
        extension
            .pointer("critical")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }))
}

/// Dotted ids, in order of appearance.
pub(crate) fn ids(extensions: Option<&Value>) -> Vec<String> {
    extensions
        .and_then(Value::as_list)
        .into_iter()
        .flatten()
        .filter_map(id_of)
        .map(str::to_owned)
        .collect()
}

/// Adds an extension or, when `replace` is set, overwrites an existing one.
///
/// Returns `false` when the extension already exists and `replace` isn't set.
pub(crate) fn set(
    extensions: &mut Vec<Value>,
    id: &str,
    value: Value,
    critical: bool,
    replace: bool,
) -> Result<bool, X509Error> {
    let oid = resolve_id(id)?;
    let extension = Value::sequence([
        ("extnId", Value::oid(oid.as_str())),
        ("critical", Value::Boolean(critical)),
        ("extnValue", value),
    ]);

    match extensions.iter_mut().find(|existing| id_of(existing) == Some(oid.as_str())) {
        Some(_) if !replace => Ok(false),
        Some(existing) => {
            *existing = extension;
            Ok(true)
        }
        None => {
            extensions.push(extension);
            Ok(true)
        }
    }
}

/// Removes every extension with this id, returning whether one was found.
pub(crate) fn remove(extensions: &mut Vec<Value>, id: &str) -> Result<bool, X509Error> {
    let oid = resolve_id(id)?;
    let before = extensions.len();
    extensions.retain(|extension| id_of(extension) != Some(oid.as_str()));
    Ok(extensions.len() != before)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tessera_asn1_x509::oids;

    fn basic_constraints(ca: bool) -> Value {
        Value::sequence([("cA", Value::Boolean(ca))])
    }

    #[test]
    fn set_then_replace() {
        let mut extensions = Vec::new();
        assert!(set(&mut extensions, "id-ce-basicConstraints", basic_constraints(true), true, false).unwrap());
        assert!(!set(&mut extensions, oids::ID_CE_BASIC_CONSTRAINTS, basic_constraints(false), false, false).unwrap());

        let list = Value::List(extensions.clone());
        assert_eq!(get(Some(&list), "id-ce-basicConstraints").unwrap(), Some(&basic_constraints(true)));
        assert_eq!(is_critical(Some(&list), oids::ID_CE_BASIC_CONSTRAINTS).unwrap(), Some(true));

        assert!(set(&mut extensions, oids::ID_CE_BASIC_CONSTRAINTS, basic_constraints(false), false, true).unwrap());
        let list = Value::List(extensions.clone());
        assert_eq!(get(Some(&list), "2.5.29.19").unwrap(), Some(&basic_constraints(false)));
        assert_eq!(is_critical(Some(&list), "2.5.29.19").unwrap(), Some(false));
        assert_eq!(ids(Some(&list)), vec![oids::ID_CE_BASIC_CONSTRAINTS.to_owned()]);
    }

    #[test]
    fn remove_and_unknown_names() {
        let mut extensions = Vec::new();
        set(&mut extensions, "id-ce-keyUsage", Value::NamedBits(vec!["keyCertSign".to_owned()]), true, false).unwrap();

        assert!(matches!(
            remove(&mut extensions, "id-ce-notAThing"),
            Err(X509Error::UnknownId { .. })
        ));
        assert!(!remove(&mut extensions, "id-ce-basicConstraints").unwrap());
        assert!(remove(&mut extensions, "id-ce-keyUsage").unwrap());
        assert!(extensions.is_empty());
        assert_eq!(get(None, "id-ce-keyUsage").unwrap(), None);
    }
}
