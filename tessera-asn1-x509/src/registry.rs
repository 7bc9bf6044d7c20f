//! Extension id to `extnValue` schema table.

use crate::{attribute, extension, name, oids};
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;
use tessera_asn1::Schema;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// a different schema is already registered under this id
    #[error("extension {id} is already registered with a different schema")]
    Conflict { id: String },

    #[error("`{name}` is neither a dotted object identifier nor a known name")]
    UnknownName { name: String },
}

/// Schemas of extension values, policy qualifiers, CSR attributes and the DN attributes
/// that need one, keyed by dotted object identifier.
///
/// Ids that are neither registered nor marked opaque are still loaded (their value stays
/// an opaque element) but can't be saved after being built by hand.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtensionRegistry {
    schemas: HashMap<String, Schema>,
    opaque: HashSet<String>,
}

static BUILTIN: LazyLock<ExtensionRegistry> = LazyLock::new(ExtensionRegistry::default);

impl ExtensionRegistry {
    /// Registry without any entry.
    pub fn empty() -> Self {
        Self {
            schemas: HashMap::new(),
            opaque: HashSet::new(),
        }
    }

    /// The shared, pre-populated registry.
    pub fn builtin() -> &'static ExtensionRegistry {
        &BUILTIN
    }

    /// Registers `schema` for an id given in dotted form or by name.
    ///
    /// Registering the same schema twice is fine.
    pub fn register(&mut self, id: &str, schema: Schema) -> Result<(), RegistryError> {
        let id = resolve(id)?;
        match self.schemas.get(&id) {
            Some(existing) if *existing == schema => Ok(()),
            Some(_) => Err(RegistryError::Conflict { id }),
            None => {
                self.schemas.insert(id, schema);
                Ok(())
            }
        }
    }

    /// Marks an id whose value is kept opaque on purpose.
    pub fn register_opaque(&mut self, id: &str) -> Result<(), RegistryError> {
        let id = resolve(id)?;
        if self.schemas.contains_key(&id) {
            return Err(RegistryError::Conflict { id });
        }
        self.opaque.insert(id);
        Ok(())
    }

    pub fn lookup(&self, id: &str) -> Option<&Schema> {
        match self.schemas.get(id) {
            Some(schema) => Some(schema),
            None => self.schemas.get(&oids::resolve(id)?),
        }
    }

    pub fn is_opaque(&self, id: &str) -> bool {
        self.opaque.contains(id) || oids::resolve(id).is_some_and(|dotted| self.opaque.contains(&dotted))
    }

    /// Either registered or deliberately opaque.
    pub fn is_known(&self, id: &str) -> bool {
        self.lookup(id).is_some() || self.is_opaque(id)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    fn insert_builtin(&mut self, id: &str, schema: Schema) {
        self.schemas.insert(id.to_owned(), schema);
    }
}

fn resolve(id: &str) -> Result<String, RegistryError> {
    oids::resolve(id).ok_or_else(|| RegistryError::UnknownName { name: id.to_owned() })
}

impl Default for ExtensionRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();

        // certificate extensions
        registry.insert_builtin(oids::ID_CE_KEY_USAGE, extension::key_usage());
        registry.insert_builtin(oids::ID_CE_BASIC_CONSTRAINTS, extension::basic_constraints());
        registry.insert_builtin(oids::ID_CE_SUBJECT_KEY_IDENTIFIER, extension::key_identifier());
        registry.insert_builtin(
            oids::ID_CE_AUTHORITY_KEY_IDENTIFIER,
            extension::authority_key_identifier(),
        );
        registry.insert_builtin(oids::ID_CE_CRL_DISTRIBUTION_POINTS, extension::crl_distribution_points());
        registry.insert_builtin(oids::ID_CE_FRESHEST_CRL, extension::crl_distribution_points());
        registry.insert_builtin(oids::ID_CE_CERTIFICATE_POLICIES, extension::certificate_policies());
        registry.insert_builtin(oids::ID_CE_POLICY_MAPPINGS, extension::policy_mappings());
        registry.insert_builtin(oids::ID_CE_POLICY_CONSTRAINTS, extension::policy_constraints());
        registry.insert_builtin(oids::ID_CE_INHIBIT_ANY_POLICY, extension::inhibit_any_policy());
        registry.insert_builtin(oids::ID_CE_EXT_KEY_USAGE, extension::ext_key_usage());
        registry.insert_builtin(oids::ID_PE_AUTHORITY_INFO_ACCESS, extension::info_access());
        registry.insert_builtin(oids::ID_PE_SUBJECT_INFO_ACCESS, extension::info_access());
        registry.insert_builtin(oids::ID_CE_SUBJECT_ALT_NAME, name::general_names());
        registry.insert_builtin(oids::ID_CE_ISSUER_ALT_NAME, name::general_names());
        registry.insert_builtin(
            oids::ID_CE_SUBJECT_DIRECTORY_ATTRIBUTES,
            extension::subject_directory_attributes(),
        );
        registry.insert_builtin(
            oids::ID_CE_PRIVATE_KEY_USAGE_PERIOD,
            extension::private_key_usage_period(),
        );
        registry.insert_builtin(oids::ID_CE_NAME_CONSTRAINTS, extension::name_constraints());
        registry.insert_builtin(oids::NETSCAPE_CERT_TYPE, extension::netscape_cert_type());
        registry.insert_builtin(oids::NETSCAPE_COMMENT, extension::netscape_comment());
        registry.insert_builtin(oids::NETSCAPE_CA_POLICY_URL, extension::netscape_ca_policy_url());

        // CRL and CRL entry extensions
        registry.insert_builtin(oids::ID_CE_CRL_NUMBER, extension::crl_number());
        registry.insert_builtin(oids::ID_CE_DELTA_CRL_INDICATOR, extension::crl_number());
        registry.insert_builtin(
            oids::ID_CE_ISSUING_DISTRIBUTION_POINT,
            extension::issuing_distribution_point(),
        );
        registry.insert_builtin(oids::ID_CE_CRL_REASONS, extension::crl_reason());
        registry.insert_builtin(oids::ID_CE_INVALIDITY_DATE, extension::invalidity_date());
        registry.insert_builtin(oids::ID_CE_CERTIFICATE_ISSUER, extension::certificate_issuer());
        registry.insert_builtin(oids::ID_CE_HOLD_INSTRUCTION_CODE, extension::hold_instruction_code());

        // policy qualifiers
        registry.insert_builtin(oids::ID_QT_CPS, extension::cps_uri());
        registry.insert_builtin(oids::ID_QT_UNOTICE, extension::user_notice());

        // CSR attributes
        registry.insert_builtin(oids::PKCS_9_AT_CHALLENGE_PASSWORD, name::directory_string());
        registry.insert_builtin(oids::PKCS_9_AT_UNSTRUCTURED_NAME, attribute::pkcs9_string());
        registry.insert_builtin(
            oids::PKCS_9_AT_EXTENSION_REQUEST,
            crate::certificate::extensions(),
        );

        // DN attributes
        registry.insert_builtin(oids::ID_AT_POSTAL_ADDRESS, name::postal_address());

        for id in [
            oids::ID_PE_LOGOTYPE,
            oids::ENTRUST_VERS_INFO,
            oids::PKCS_9_AT_SMIME_CAPABILITIES,
            oids::MS_CERTIFICATE_TEMPLATE_NAME,
            oids::MS_CERTIFICATE_TEMPLATE,
            oids::MS_CA_VERSION,
            oids::SIGNED_CERTIFICATE_TIMESTAMP_LIST,
        ] {
            registry.opaque.insert(id.to_owned());
        }

        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builtin_entries() {
        let registry = ExtensionRegistry::builtin();
        assert_eq!(registry.lookup("2.5.29.15"), Some(&extension::key_usage()));
        assert_eq!(registry.lookup("id-ce-basicConstraints"), Some(&extension::basic_constraints()));
        assert!(registry.is_opaque(oids::SIGNED_CERTIFICATE_TIMESTAMP_LIST));
        assert!(registry.is_known("entrustVersInfo"));
        assert!(!registry.is_known("1.2.3.4"));
    }

    #[test]
    fn registering_twice() {
        let mut registry = ExtensionRegistry::default();
        let schema = Schema::utf8_string();

        registry.register("1.3.6.1.4.1.99999.1", schema.clone()).unwrap();
        registry.register("1.3.6.1.4.1.99999.1", schema).unwrap();

        let err = registry
            .register("1.3.6.1.4.1.99999.1", Schema::ia5_string())
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::Conflict {
                id: "1.3.6.1.4.1.99999.1".to_owned()
            }
        );

        // builtin entries take part in the check too
        assert!(registry.register("id-ce-keyUsage", Schema::integer()).is_err());
        assert!(registry.register("id-ce-keyUsage", extension::key_usage()).is_ok());
    }

    #[test]
    fn unknown_name() {
        let mut registry = ExtensionRegistry::empty();
        let err = registry.register("no-such-extension", Schema::null()).unwrap_err();
        assert!(matches!(err, RegistryError::UnknownName { .. }));
    }

    #[test]
    fn custom_registry_leaves_builtin_untouched() {
        let mut registry = ExtensionRegistry::builtin().clone();
        registry.register("1.3.6.1.4.1.99999.2", Schema::integer()).unwrap();
        assert!(registry.lookup("1.3.6.1.4.1.99999.2").is_some());
        assert!(ExtensionRegistry::builtin().lookup("1.3.6.1.4.1.99999.2").is_none());
    }
}
