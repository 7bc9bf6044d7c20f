//! Signature validation of documents against a pool of trusted CA certificates.
//!
//! A certificate is checked with the key of the pool CA whose subject matches its issuer,
//! narrowed by the authorityKeyIdentifier when present. When no pool CA matches, the issuer
//! may be fetched from the caIssuers location of the authorityInfoAccess extension and
//! validated in turn, up to a fixed depth.

use super::certificate::Cert;
use super::crl::Crl;
use super::csr::Csr;
use super::fetch::{check_scheme, FetchError, IssuerFetcher};
use super::name::{DistinguishedName, DnMatch};
use super::spkac::Spkac;
use super::X509Error;
use crate::signature::SignatureError;
use tessera_asn1::{BigInt, Value};
use tessera_asn1_x509::{oids, ExtensionRegistry};
use thiserror::Error;

const DEFAULT_RECURSION_LIMIT: usize = 5;

/// Why a document wasn't validated.
#[derive(Debug, Error)]
pub enum ChainError {
    /// neither the pool nor a fetched certificate issued the document
    #[error("no issuer found for `{issuer}`")]
    NoIssuer { issuer: String },

    /// issuers were fetched this many times without reaching a pool CA
    #[error("recursion limit ({limit}) reached while looking for an issuer")]
    RecursionLimit { limit: usize },

    /// the issuer was found, its key doesn't verify the signature
    #[error("signature of `{subject}` doesn't verify")]
    BadSignature { subject: String },

    #[error("unsupported algorithm: {source}")]
    UnsupportedAlgorithm { source: SignatureError },

    /// signature check failed for a reason other than a mismatch
    #[error("couldn't check the signature of `{subject}`: {source}")]
    Signature { subject: String, source: SignatureError },

    #[error("couldn't fetch issuer: {source}")]
    Fetch { source: FetchError },

    /// fetched bytes aren't a certificate
    #[error("invalid issuer fetched from `{url}`: {source}")]
    InvalidIssuer { url: String, source: X509Error },

    /// the document lacks a name or key needed for the lookup
    #[error("invalid document: {source}")]
    Document { source: X509Error },
}

impl From<FetchError> for ChainError {
    fn from(e: FetchError) -> Self {
        Self::Fetch { source: e }
    }
}

impl From<X509Error> for ChainError {
    fn from(e: X509Error) -> Self {
        Self::Document { source: e }
    }
}

impl ChainError {
    fn from_signature(e: SignatureError, subject: impl Into<String>) -> Self {
        match e {
            SignatureError::BadSignature => Self::BadSignature { subject: subject.into() },
            e if e.is_unsupported() => Self::UnsupportedAlgorithm { source: e },
            e => Self::Signature {
                subject: subject.into(),
                source: e,
            },
        }
    }
}

/// Any of the signed documents.
#[derive(Debug, Clone, Copy)]
pub enum Signed<'a, 'r> {
    Cert(&'a Cert<'r>),
    Csr(&'a Csr<'r>),
    Crl(&'a Crl<'r>),
    Spkac(&'a Spkac),
}

impl<'a, 'r> From<&'a Cert<'r>> for Signed<'a, 'r> {
    fn from(cert: &'a Cert<'r>) -> Self {
        Self::Cert(cert)
    }
}

impl<'a, 'r> From<&'a Csr<'r>> for Signed<'a, 'r> {
    fn from(csr: &'a Csr<'r>) -> Self {
        Self::Csr(csr)
    }
}

impl<'a, 'r> From<&'a Crl<'r>> for Signed<'a, 'r> {
    fn from(crl: &'a Crl<'r>) -> Self {
        Self::Crl(crl)
    }
}

impl<'a, 'r> From<&'a Spkac> for Signed<'a, 'r> {
    fn from(spkac: &'a Spkac) -> Self {
        Self::Spkac(spkac)
    }
}

/// What a document says about its issuer.
struct IssuerRef<'v> {
    name: DistinguishedName,
    key_id: Option<&'v [u8]>,
    serial: Option<&'v BigInt>,
}

impl<'v> IssuerRef<'v> {
    fn new(name: DistinguishedName, authority_key_identifier: Option<&'v Value>) -> Self {
        Self {
            name,
            key_id: authority_key_identifier
                .and_then(|aki| aki.pointer("keyIdentifier"))
                .and_then(Value::as_octet_string),
            serial: authority_key_identifier
                .and_then(|aki| aki.pointer("authorityCertSerialNumber"))
                .and_then(Value::as_integer),
        }
    }

    fn is_issued_by(&self, ca: &Cert, mode: DnMatch) -> bool {
        let Ok(subject) = ca.subject() else {
            return false;
        };
        if !subject.matches(&self.name, mode) {
            return false;
        }
        if let (Some(key_id), Some(subject_key_id)) = (self.key_id, ca.subject_key_identifier()) {
            if key_id != subject_key_id {
                return false;
            }
        }
        match self.serial {
            Some(serial) => ca.serial_number() == Some(serial),
            None => true,
        }
    }
}

/// Validates signatures against a pool of trusted CAs.
///
/// ```
/// use tessera::x509::{Cert, ChainValidator};
/// use tessera::ExtensionRegistry;
///
/// let root = Cert::from_pem_str(tessera_test_data::ROOT_CA).unwrap();
/// let validator = ChainValidator::new(ExtensionRegistry::builtin()).with_ca(root.clone());
///
/// assert!(validator.validate(&root).unwrap());
/// ```
pub struct ChainValidator<'r, 'f> {
    registry: &'r ExtensionRegistry,
    cas: Vec<Cert<'r>>,
    ca_only: bool,
    recursion_limit: usize,
    fetcher: Option<Box<dyn IssuerFetcher + 'f>>,
    url_fetch: bool,
    name_match: DnMatch,
}

impl<'r, 'f> ChainValidator<'r, 'f> {
    pub fn new(registry: &'r ExtensionRegistry) -> Self {
        Self {
            registry,
            cas: Vec::new(),
            ca_only: true,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            fetcher: None,
            url_fetch: true,
            name_match: DnMatch::default(),
        }
    }

    /// Adds a trusted CA to the pool.
    pub fn with_ca(mut self, ca: Cert<'r>) -> Self {
        self.cas.push(ca);
        self
    }

    /// When set (the default), a self-signed certificate is only accepted if it is in the pool.
    pub fn ca_only(mut self, ca_only: bool) -> Self {
        self.ca_only = ca_only;
        self
    }

    pub fn recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit;
        self
    }

    /// Source of issuers named by authorityInfoAccess. Without one nothing is fetched.
    pub fn fetcher(mut self, fetcher: impl IssuerFetcher + 'f) -> Self {
        self.fetcher = Some(Box::new(fetcher));
        self
    }

    /// Enables or disables issuer fetching without dropping the fetcher.
    pub fn url_fetch(mut self, enabled: bool) -> Self {
        self.url_fetch = enabled;
        self
    }

    /// How issuer and subject names are compared.
    pub fn name_match(mut self, mode: DnMatch) -> Self {
        self.name_match = mode;
        self
    }

    pub fn cas(&self) -> &[Cert<'r>] {
        &self.cas
    }

    /// Trust decision for a document.
    ///
    /// Fails only when an algorithm involved isn't supported, every other rejection is
    /// `Ok(false)`. Use [`validate_with_reason`](Self::validate_with_reason) to learn why.
    pub fn validate<'a, D>(&self, document: D) -> Result<bool, SignatureError>
    where
        'r: 'a,
        D: Into<Signed<'a, 'r>>,
    {
        match self.validate_with_reason(document) {
            Ok(()) => Ok(true),
            Err(ChainError::UnsupportedAlgorithm { source }) => Err(source),
            Err(e) => {
                log::debug!("not validated: {e}");
                Ok(false)
            }
        }
    }

    pub fn validate_with_reason<'a, D>(&self, document: D) -> Result<(), ChainError>
    where
        'r: 'a,
        D: Into<Signed<'a, 'r>>,
    {
        let result = match document.into() {
            Signed::Cert(cert) => self.validate_cert(cert, 0),
            Signed::Csr(csr) => csr
                .verify_self()
                .map_err(|e| ChainError::from_signature(e, "certification request")),
            Signed::Spkac(spkac) => spkac
                .verify_self()
                .map_err(|e| ChainError::from_signature(e, "signed public key and challenge")),
            Signed::Crl(crl) => self.validate_crl(crl),
        };

        if let Err(ChainError::UnsupportedAlgorithm { source }) = &result {
            log::warn!("skipped signature check: {source}");
        }
        result
    }

    /// The pool CAs issuing `cert`, then its issuer, up to a self-signed one.
    ///
    /// Every link is signature checked. The certificate itself isn't part of the chain.
    pub fn chain<'a>(&'a self, cert: &Cert) -> Result<Vec<&'a Cert<'r>>, ChainError> {
        let mut chain: Vec<&'a Cert<'r>> = Vec::new();
        let mut current = self.find_in_pool(cert)?.ok_or_else(|| no_issuer(cert))?;
        verify_cert(cert, current)?;

        loop {
            chain.push(current);
            if current.is_self_signed_candidate(self.name_match) {
                return Ok(chain);
            }
            if chain.len() > self.recursion_limit {
                return Err(ChainError::RecursionLimit {
                    limit: self.recursion_limit,
                });
            }

            let issuer = self.find_in_pool(current)?.ok_or_else(|| no_issuer(current))?;
            verify_cert(current, issuer)?;
            current = issuer;
        }
    }

    fn find_in_pool(&self, cert: &Cert) -> Result<Option<&Cert<'r>>, ChainError> {
        let issuer = IssuerRef::new(
            cert.issuer()?,
            cert.extension(oids::ID_CE_AUTHORITY_KEY_IDENTIFIER)?,
        );
        Ok(self.cas.iter().find(|ca| issuer.is_issued_by(ca, self.name_match)))
    }

    fn validate_cert(&self, cert: &Cert, depth: usize) -> Result<(), ChainError> {
        if depth >= self.recursion_limit {
            return Err(ChainError::RecursionLimit {
                limit: self.recursion_limit,
            });
        }

        if let Some(ca) = self.find_in_pool(cert)? {
            log::debug!("issuer of `{}` found in pool: `{}`", display_subject(cert), display_subject(ca));
            return verify_cert(cert, ca);
        }

        if !self.ca_only && cert.is_self_signed_candidate(self.name_match) {
            log::debug!("`{}` checked as self-signed", display_subject(cert));
            return verify_cert(cert, cert);
        }

        let issuer = self.fetch_issuer(cert, depth)?;
        verify_cert(cert, &issuer)
    }

    /// Fetches the caIssuers certificate of `cert` and validates it one level deeper.
    fn fetch_issuer(&self, cert: &Cert, depth: usize) -> Result<Cert<'r>, ChainError> {
        let fetcher = match &self.fetcher {
            Some(fetcher) if self.url_fetch => fetcher,
            _ => return Err(no_issuer(cert)),
        };
        let Some(url) = cert.ca_issuer_urls().into_iter().next() else {
            return Err(no_issuer(cert));
        };

        log::debug!("fetching issuer of `{}` from {url} (depth {depth})", display_subject(cert));
        let bytes = check_scheme(url)
            .and_then(|()| fetcher.fetch(url))
            .inspect_err(|e| log::warn!("issuer fetch failed: {e}"))?;

        let issuer = Cert::load_with(&bytes, self.registry).map_err(|source| ChainError::InvalidIssuer {
            url: url.to_owned(),
            source,
        })?;

        let reference = IssuerRef::new(
            cert.issuer()?,
            cert.extension(oids::ID_CE_AUTHORITY_KEY_IDENTIFIER)?,
        );
        if !reference.is_issued_by(&issuer, self.name_match) {
            log::warn!("certificate fetched from {url} isn't the issuer of `{}`", display_subject(cert));
            return Err(no_issuer(cert));
        }

        self.validate_cert(&issuer, depth + 1)?;
        Ok(issuer)
    }

    fn validate_crl(&self, crl: &Crl) -> Result<(), ChainError> {
        let issuer = IssuerRef::new(
            crl.issuer()?,
            crl.extension(oids::ID_CE_AUTHORITY_KEY_IDENTIFIER)?,
        );
        let ca = self
            .cas
            .iter()
            .find(|ca| issuer.is_issued_by(ca, self.name_match))
            .ok_or_else(|| ChainError::NoIssuer {
                issuer: issuer.name.to_string(),
            })?;

        log::debug!("issuer of CRL found in pool: `{}`", display_subject(ca));
        crl.verify_issued_by(ca)
            .map_err(|e| ChainError::from_signature(e, "certificate list"))
    }
}

fn verify_cert(cert: &Cert, issuer: &Cert) -> Result<(), ChainError> {
    let public_key = issuer.public_key()?;
    cert.verify_signature(&public_key)
        .map_err(|e| ChainError::from_signature(e, display_subject(cert)))
}

fn display_subject(cert: &Cert) -> String {
    cert.subject().map(|subject| subject.to_string()).unwrap_or_default()
}

fn no_issuer(cert: &Cert) -> ChainError {
    ChainError::NoIssuer {
        issuer: cert.issuer().map(|issuer| issuer.to_string()).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn cert(pem: &str) -> Cert<'static> {
        Cert::from_pem_str(pem).unwrap()
    }

    #[test]
    fn pool_issuer() {
        let root = cert(tessera_test_data::ROOT_CA);
        let intermediate = cert(tessera_test_data::INTERMEDIATE_CA);
        let validator = ChainValidator::new(ExtensionRegistry::builtin()).with_ca(root.clone());

        validator.validate_with_reason(&intermediate).unwrap();
        assert_eq!(validator.chain(&intermediate).unwrap(), vec![&root]);
    }

    #[test]
    fn self_signed_needs_pool_unless_allowed() {
        let root = cert(tessera_test_data::ROOT_CA);
        let empty = ChainValidator::new(ExtensionRegistry::builtin());

        assert!(matches!(
            empty.validate_with_reason(&root),
            Err(ChainError::NoIssuer { .. })
        ));
        assert!(!empty.validate(&root).unwrap());
        assert!(ChainValidator::new(ExtensionRegistry::builtin())
            .ca_only(false)
            .validate(&root)
            .unwrap());
    }

    #[test]
    fn fetch_disabled() {
        let root = cert(tessera_test_data::ROOT_CA);
        let leaf = cert(tessera_test_data::LEAF);
        let intermediate_der = cert(tessera_test_data::INTERMEDIATE_CA).to_der().unwrap();

        let mut fetcher = HashMap::new();
        fetcher.insert("http://ca.tessera.test/intermediate.crt".to_owned(), intermediate_der);

        let validator = ChainValidator::new(ExtensionRegistry::builtin())
            .with_ca(root)
            .fetcher(&fetcher)
            .url_fetch(false);
        assert!(matches!(
            validator.validate_with_reason(&leaf),
            Err(ChainError::NoIssuer { .. })
        ));
        assert!(validator.url_fetch(true).validate(&leaf).unwrap());
    }

    #[test]
    fn wrong_certificate_fetched() {
        let root = cert(tessera_test_data::ROOT_CA);
        let leaf = cert(tessera_test_data::LEAF);

        let mut fetcher = HashMap::new();
        fetcher.insert(
            "http://ca.tessera.test/intermediate.crt".to_owned(),
            tessera_test_data::P384_SELF_SIGNED.as_bytes().to_vec(),
        );
        let validator = ChainValidator::new(ExtensionRegistry::builtin())
            .with_ca(root)
            .fetcher(fetcher);

        assert!(matches!(
            validator.validate_with_reason(&leaf),
            Err(ChainError::NoIssuer { .. })
        ));
    }
}
