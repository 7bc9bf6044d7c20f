use super::utils::{decode_signed, encode, verify_signed};
use super::X509Error;
use crate::key::PublicKey;
use crate::pem::PemError;
use crate::signature::{SignatureAlgorithm, SignatureError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::fmt;
use tessera_asn1::Value;
use tessera_asn1_x509::signed_public_key_and_challenge;

const SPKAC_PREFIX: &str = "SPKAC=";

/// A Netscape signed public key and challenge.
///
/// Holds no extensions, so unlike the other documents it isn't tied to a registry.
#[derive(Clone, PartialEq)]
pub struct Spkac {
    value: Value,
    signature_subject: Vec<u8>,
}

impl fmt::Debug for Spkac {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spkac")
            .field("value", &self.value)
            .field("signature_subject", &hex::encode(&self.signature_subject))
            .finish()
    }
}

impl Spkac {
    pub fn from_der<T: ?Sized + AsRef<[u8]>>(der: &T) -> Result<Self, X509Error> {
        let (value, signature_subject) = decode_signed(
            der.as_ref(),
            &signed_public_key_and_challenge(),
            "signed public key and challenge",
        )?;
        Ok(Self {
            value,
            signature_subject,
        })
    }

    /// DER, or the base64 text `openssl spkac` prints, with or without its `SPKAC=` prefix.
    ///
    /// Whitespace and backslashes (line continuations) in the text are skipped.
    pub fn load<T: ?Sized + AsRef<[u8]>>(input: &T) -> Result<Self, X509Error> {
        let input = input.as_ref();
        match Self::from_der(input) {
            Ok(spkac) => Ok(spkac),
            Err(e) => {
                let Ok(text) = std::str::from_utf8(input) else {
                    return Err(e);
                };
                let text = text.trim_start();
                let body = text.strip_prefix(SPKAC_PREFIX).unwrap_or(text);
                let cleaned: String = body
                    .chars()
                    .filter(|c| !c.is_ascii_whitespace() && *c != '\\')
                    .collect();

                let der = STANDARD
                    .decode(cleaned)
                    .map_err(|source| PemError::Base64Decoding { source })?;
                Self::from_der(&der)
            }
        }
    }

    pub fn to_der(&self) -> Result<Vec<u8>, X509Error> {
        encode(
            &self.value,
            &signed_public_key_and_challenge(),
            "signed public key and challenge",
        )
    }

    /// `SPKAC=<base64>`, the form `openssl spkac` reads.
    pub fn to_spkac_string(&self) -> Result<String, X509Error> {
        Ok(format!("{SPKAC_PREFIX}{}", STANDARD.encode(self.to_der()?)))
    }

    pub fn as_value(&self) -> &Value {
        &self.value
    }

    /// DER of `publicKeyAndChallenge` as loaded.
    pub fn signature_subject(&self) -> &[u8] {
        &self.signature_subject
    }

    pub fn challenge(&self) -> Option<&str> {
        self.value
            .pointer("publicKeyAndChallenge/challenge")
            .and_then(Value::as_str)
    }

    pub fn public_key(&self) -> Result<PublicKey, X509Error> {
        self.value
            .pointer("publicKeyAndChallenge/spki")
            .cloned()
            .map(PublicKey::from)
            .ok_or(X509Error::Malformed {
                element: "subject public key info",
            })
    }

    pub fn signature_algorithm(&self) -> Result<SignatureAlgorithm, SignatureError> {
        SignatureAlgorithm::from_algorithm_identifier(self.value.pointer("signatureAlgorithm").unwrap_or(&Value::Null))
    }

    /// Checks the signature with the key the SPKAC carries.
    pub fn verify_self(&self) -> Result<(), SignatureError> {
        let public_key = self.public_key().map_err(|_| SignatureError::BadSignature)?;
        verify_signed(&self.value, &self.signature_subject, &public_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn openssl_text() {
        let spkac = Spkac::load(tessera_test_data::SPKAC).unwrap();
        assert_eq!(spkac.challenge(), Some("tessera-challenge"));
        spkac.verify_self().unwrap();
        assert_eq!(spkac.to_spkac_string().unwrap(), tessera_test_data::SPKAC.trim_end());
    }

    #[test]
    fn continuation_lines_and_bare_der() {
        let text = tessera_test_data::SPKAC.trim_end();
        let (head, tail) = text.split_at(40);
        let wrapped = format!("  {head}\\\n  {tail}\n");

        let spkac = Spkac::load(&wrapped).unwrap();
        let der = spkac.to_der().unwrap();
        assert_eq!(Spkac::load(&der).unwrap(), spkac);
        assert_eq!(Spkac::load(&text[SPKAC_PREFIX.len()..]).unwrap(), spkac);
    }

    #[test]
    fn garbage() {
        assert!(matches!(Spkac::load("SPKAC=***"), Err(X509Error::Pem { .. })));
    }
}
