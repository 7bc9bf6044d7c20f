//! OIDs commonly used with X.509 certificates, and the name table built from them.
//!
//! Names follow the ASN.1 modules they come from (`id-at-commonName`,
//! `sha256WithRSAEncryption`, ...). Anything that takes an identifier also accepts
//! such a name, see [`resolve`].

use std::collections::HashMap;
use std::sync::LazyLock;

macro_rules! define_oid {
    ( $( $uppercase:ident => $name:literal => $str_value:literal, )+ ) => {
        $( pub const $uppercase: &str = $str_value; )+

        /// Every named identifier as `(name, dotted)`.
        pub const NAMED_OIDS: &[(&str, &str)] = &[ $( ($name, $str_value), )+ ];
    };
}

define_oid! {
    // PKIX
    ID_PKIX => "id-pkix" => "1.3.6.1.5.5.7",
    ID_PE => "id-pe" => "1.3.6.1.5.5.7.1",
    ID_QT => "id-qt" => "1.3.6.1.5.5.7.2",
    ID_KP => "id-kp" => "1.3.6.1.5.5.7.3",
    ID_AD => "id-ad" => "1.3.6.1.5.5.7.48",
    ID_QT_CPS => "id-qt-cps" => "1.3.6.1.5.5.7.2.1",
    ID_QT_UNOTICE => "id-qt-unotice" => "1.3.6.1.5.5.7.2.2",
    ID_AD_OCSP => "id-ad-ocsp" => "1.3.6.1.5.5.7.48.1",
    ID_AD_CA_ISSUERS => "id-ad-caIssuers" => "1.3.6.1.5.5.7.48.2",
    ID_AD_TIME_STAMPING => "id-ad-timeStamping" => "1.3.6.1.5.5.7.48.3",
    ID_AD_CA_REPOSITORY => "id-ad-caRepository" => "1.3.6.1.5.5.7.48.5",
    ID_PE_AUTHORITY_INFO_ACCESS => "id-pe-authorityInfoAccess" => "1.3.6.1.5.5.7.1.1",
    ID_PE_SUBJECT_INFO_ACCESS => "id-pe-subjectInfoAccess" => "1.3.6.1.5.5.7.1.11",
    ID_PE_LOGOTYPE => "id-pe-logotype" => "1.3.6.1.5.5.7.1.12",

    // attribute types
    ID_AT => "id-at" => "2.5.4",
    ID_AT_NAME => "id-at-name" => "2.5.4.41",
    ID_AT_SURNAME => "id-at-surname" => "2.5.4.4",
    ID_AT_GIVEN_NAME => "id-at-givenName" => "2.5.4.42",
    ID_AT_INITIALS => "id-at-initials" => "2.5.4.43",
    ID_AT_GENERATION_QUALIFIER => "id-at-generationQualifier" => "2.5.4.44",
    ID_AT_COMMON_NAME => "id-at-commonName" => "2.5.4.3",
    ID_AT_LOCALITY_NAME => "id-at-localityName" => "2.5.4.7",
    ID_AT_STATE_OR_PROVINCE_NAME => "id-at-stateOrProvinceName" => "2.5.4.8",
    ID_AT_ORGANIZATION_NAME => "id-at-organizationName" => "2.5.4.10",
    ID_AT_ORGANIZATIONAL_UNIT_NAME => "id-at-organizationalUnitName" => "2.5.4.11",
    ID_AT_TITLE => "id-at-title" => "2.5.4.12",
    ID_AT_DESCRIPTION => "id-at-description" => "2.5.4.13",
    ID_AT_DN_QUALIFIER => "id-at-dnQualifier" => "2.5.4.46",
    ID_AT_COUNTRY_NAME => "id-at-countryName" => "2.5.4.6",
    ID_AT_SERIAL_NUMBER => "id-at-serialNumber" => "2.5.4.5",
    ID_AT_PSEUDONYM => "id-at-pseudonym" => "2.5.4.65",
    ID_AT_POSTAL_CODE => "id-at-postalCode" => "2.5.4.17",
    ID_AT_STREET_ADDRESS => "id-at-streetAddress" => "2.5.4.9",
    ID_AT_UNIQUE_IDENTIFIER => "id-at-uniqueIdentifier" => "2.5.4.45",
    ID_AT_ROLE => "id-at-role" => "2.5.4.72",
    ID_AT_POSTAL_ADDRESS => "id-at-postalAddress" => "2.5.4.16",
    ID_AT_BUSINESS_CATEGORY => "id-at-businessCategory" => "2.5.4.15",
    ID_DOMAIN_COMPONENT => "id-domainComponent" => "0.9.2342.19200300.100.1.25",
    ID_USER_ID => "id-userId" => "0.9.2342.19200300.100.1.1",

    // PKCS #9
    PKCS_9 => "pkcs-9" => "1.2.840.113549.1.9",
    PKCS_9_AT_EMAIL_ADDRESS => "pkcs-9-at-emailAddress" => "1.2.840.113549.1.9.1",
    PKCS_9_AT_UNSTRUCTURED_NAME => "pkcs-9-at-unstructuredName" => "1.2.840.113549.1.9.2",
    PKCS_9_AT_CONTENT_TYPE => "pkcs-9-at-contentType" => "1.2.840.113549.1.9.3",
    PKCS_9_AT_MESSAGE_DIGEST => "pkcs-9-at-messageDigest" => "1.2.840.113549.1.9.4",
    PKCS_9_AT_SIGNING_TIME => "pkcs-9-at-signingTime" => "1.2.840.113549.1.9.5",
    PKCS_9_AT_CHALLENGE_PASSWORD => "pkcs-9-at-challengePassword" => "1.2.840.113549.1.9.7",
    PKCS_9_AT_UNSTRUCTURED_ADDRESS => "pkcs-9-at-unstructuredAddress" => "1.2.840.113549.1.9.8",
    PKCS_9_AT_EXTENSION_REQUEST => "pkcs-9-at-extensionRequest" => "1.2.840.113549.1.9.14",
    PKCS_9_AT_SMIME_CAPABILITIES => "pkcs-9-at-smimeCapabilities" => "1.2.840.113549.1.9.15",
    PKCS_9_AT_FRIENDLY_NAME => "pkcs-9-at-friendlyName" => "1.2.840.113549.1.9.20",
    PKCS_9_AT_LOCAL_KEY_ID => "pkcs-9-at-localKeyId" => "1.2.840.113549.1.9.21",

    // certificate extensions
    ID_CE => "id-ce" => "2.5.29",
    ID_CE_SUBJECT_DIRECTORY_ATTRIBUTES => "id-ce-subjectDirectoryAttributes" => "2.5.29.9",
    ID_CE_SUBJECT_KEY_IDENTIFIER => "id-ce-subjectKeyIdentifier" => "2.5.29.14",
    ID_CE_KEY_USAGE => "id-ce-keyUsage" => "2.5.29.15",
    ID_CE_PRIVATE_KEY_USAGE_PERIOD => "id-ce-privateKeyUsagePeriod" => "2.5.29.16",
    ID_CE_SUBJECT_ALT_NAME => "id-ce-subjectAltName" => "2.5.29.17",
    ID_CE_ISSUER_ALT_NAME => "id-ce-issuerAltName" => "2.5.29.18",
    ID_CE_BASIC_CONSTRAINTS => "id-ce-basicConstraints" => "2.5.29.19",
    ID_CE_CRL_NUMBER => "id-ce-cRLNumber" => "2.5.29.20",
    ID_CE_CRL_REASONS => "id-ce-cRLReasons" => "2.5.29.21",
    ID_CE_HOLD_INSTRUCTION_CODE => "id-ce-holdInstructionCode" => "2.5.29.23",
    ID_CE_INVALIDITY_DATE => "id-ce-invalidityDate" => "2.5.29.24",
    ID_CE_DELTA_CRL_INDICATOR => "id-ce-deltaCRLIndicator" => "2.5.29.27",
    ID_CE_ISSUING_DISTRIBUTION_POINT => "id-ce-issuingDistributionPoint" => "2.5.29.28",
    ID_CE_CERTIFICATE_ISSUER => "id-ce-certificateIssuer" => "2.5.29.29",
    ID_CE_NAME_CONSTRAINTS => "id-ce-nameConstraints" => "2.5.29.30",
    ID_CE_CRL_DISTRIBUTION_POINTS => "id-ce-cRLDistributionPoints" => "2.5.29.31",
    ID_CE_CERTIFICATE_POLICIES => "id-ce-certificatePolicies" => "2.5.29.32",
    ANY_POLICY => "anyPolicy" => "2.5.29.32.0",
    ID_CE_POLICY_MAPPINGS => "id-ce-policyMappings" => "2.5.29.33",
    ID_CE_AUTHORITY_KEY_IDENTIFIER => "id-ce-authorityKeyIdentifier" => "2.5.29.35",
    ID_CE_POLICY_CONSTRAINTS => "id-ce-policyConstraints" => "2.5.29.36",
    ID_CE_EXT_KEY_USAGE => "id-ce-extKeyUsage" => "2.5.29.37",
    ANY_EXTENDED_KEY_USAGE => "anyExtendedKeyUsage" => "2.5.29.37.0",
    ID_CE_FRESHEST_CRL => "id-ce-freshestCRL" => "2.5.29.46",
    ID_CE_INHIBIT_ANY_POLICY => "id-ce-inhibitAnyPolicy" => "2.5.29.54",

    // hold instructions
    ID_HOLDINSTRUCTION_NONE => "id-holdinstruction-none" => "1.2.840.10040.2.1",
    ID_HOLDINSTRUCTION_CALLISSUER => "id-holdinstruction-callissuer" => "1.2.840.10040.2.2",
    ID_HOLDINSTRUCTION_REJECT => "id-holdinstruction-reject" => "1.2.840.10040.2.3",

    // key purposes
    ID_KP_SERVER_AUTH => "id-kp-serverAuth" => "1.3.6.1.5.5.7.3.1",
    ID_KP_CLIENT_AUTH => "id-kp-clientAuth" => "1.3.6.1.5.5.7.3.2",
    ID_KP_CODE_SIGNING => "id-kp-codeSigning" => "1.3.6.1.5.5.7.3.3",
    ID_KP_EMAIL_PROTECTION => "id-kp-emailProtection" => "1.3.6.1.5.5.7.3.4",
    ID_KP_IPSEC_END_SYSTEM => "id-kp-ipsecEndSystem" => "1.3.6.1.5.5.7.3.5",
    ID_KP_IPSEC_TUNNEL => "id-kp-ipsecTunnel" => "1.3.6.1.5.5.7.3.6",
    ID_KP_IPSEC_USER => "id-kp-ipsecUser" => "1.3.6.1.5.5.7.3.7",
    ID_KP_TIME_STAMPING => "id-kp-timeStamping" => "1.3.6.1.5.5.7.3.8",
    ID_KP_OCSP_SIGNING => "id-kp-OCSPSigning" => "1.3.6.1.5.5.7.3.9",
    ID_MS_KP_SMARTCARD_LOGON => "id-ms-kp-smartcardLogon" => "1.3.6.1.4.1.311.20.2.2",
    ID_PKINIT_KP_KDC => "id-pkinit-KPKdc" => "1.3.6.1.5.2.3.5",

    // hashes
    MD2 => "md2" => "1.2.840.113549.2.2",
    MD5 => "md5" => "1.2.840.113549.2.5",
    ID_SHA1 => "id-sha1" => "1.3.14.3.2.26",
    ID_SHA224 => "id-sha224" => "2.16.840.1.101.3.4.2.4",
    ID_SHA256 => "id-sha256" => "2.16.840.1.101.3.4.2.1",
    ID_SHA384 => "id-sha384" => "2.16.840.1.101.3.4.2.2",
    ID_SHA512 => "id-sha512" => "2.16.840.1.101.3.4.2.3",
    ID_SHA512_224 => "id-sha512-224" => "2.16.840.1.101.3.4.2.5",
    ID_SHA512_256 => "id-sha512-256" => "2.16.840.1.101.3.4.2.6",

    // RSA
    PKCS_1 => "pkcs-1" => "1.2.840.113549.1.1",
    RSA_ENCRYPTION => "rsaEncryption" => "1.2.840.113549.1.1.1",
    MD2_WITH_RSA_ENCRYPTION => "md2WithRSAEncryption" => "1.2.840.113549.1.1.2",
    MD5_WITH_RSA_ENCRYPTION => "md5WithRSAEncryption" => "1.2.840.113549.1.1.4",
    SHA1_WITH_RSA_ENCRYPTION => "sha1WithRSAEncryption" => "1.2.840.113549.1.1.5",
    ID_RSAES_OAEP => "id-RSAES-OAEP" => "1.2.840.113549.1.1.7",
    ID_MGF1 => "id-mgf1" => "1.2.840.113549.1.1.8",
    ID_P_SPECIFIED => "id-pSpecified" => "1.2.840.113549.1.1.9",
    ID_RSASSA_PSS => "id-RSASSA-PSS" => "1.2.840.113549.1.1.10",
    SHA256_WITH_RSA_ENCRYPTION => "sha256WithRSAEncryption" => "1.2.840.113549.1.1.11",
    SHA384_WITH_RSA_ENCRYPTION => "sha384WithRSAEncryption" => "1.2.840.113549.1.1.12",
    SHA512_WITH_RSA_ENCRYPTION => "sha512WithRSAEncryption" => "1.2.840.113549.1.1.13",
    SHA224_WITH_RSA_ENCRYPTION => "sha224WithRSAEncryption" => "1.2.840.113549.1.1.14",

    // DSA
    ID_DSA => "id-dsa" => "1.2.840.10040.4.1",
    ID_DSA_WITH_SHA1 => "id-dsa-with-sha1" => "1.2.840.10040.4.3",
    ID_DSA_WITH_SHA224 => "id-dsa-with-sha224" => "2.16.840.1.101.3.4.3.1",
    ID_DSA_WITH_SHA256 => "id-dsa-with-sha256" => "2.16.840.1.101.3.4.3.2",
    DH_PUBLIC_NUMBER => "dhpublicnumber" => "1.2.840.10046.2.1",
    ID_KEY_EXCHANGE_ALGORITHM => "id-keyExchangeAlgorithm" => "2.16.840.1.101.2.1.1.22",

    // ANSI X9.62
    ANSI_X9_62 => "ansi-X9-62" => "1.2.840.10045",
    ID_FIELD_TYPE => "id-fieldType" => "1.2.840.10045.1",
    PRIME_FIELD => "prime-field" => "1.2.840.10045.1.1",
    CHARACTERISTIC_TWO_FIELD => "characteristic-two-field" => "1.2.840.10045.1.2",
    ID_PUBLIC_KEY_TYPE => "id-publicKeyType" => "1.2.840.10045.2",
    ID_EC_PUBLIC_KEY => "id-ecPublicKey" => "1.2.840.10045.2.1",
    ELLIPTIC_CURVE => "ellipticCurve" => "1.2.840.10045.3",
    PRIME_CURVE => "primeCurve" => "1.2.840.10045.3.1",
    PRIME192V1 => "prime192v1" => "1.2.840.10045.3.1.1",
    PRIME192V2 => "prime192v2" => "1.2.840.10045.3.1.2",
    PRIME192V3 => "prime192v3" => "1.2.840.10045.3.1.3",
    PRIME239V1 => "prime239v1" => "1.2.840.10045.3.1.4",
    PRIME239V2 => "prime239v2" => "1.2.840.10045.3.1.5",
    PRIME239V3 => "prime239v3" => "1.2.840.10045.3.1.6",
    PRIME256V1 => "prime256v1" => "1.2.840.10045.3.1.7",
    ID_EC_SIG_TYPE => "id-ecSigType" => "1.2.840.10045.4",
    ECDSA_WITH_SHA1 => "ecdsa-with-SHA1" => "1.2.840.10045.4.1",
    ECDSA_WITH_SHA224 => "ecdsa-with-SHA224" => "1.2.840.10045.4.3.1",
    ECDSA_WITH_SHA256 => "ecdsa-with-SHA256" => "1.2.840.10045.4.3.2",
    ECDSA_WITH_SHA384 => "ecdsa-with-SHA384" => "1.2.840.10045.4.3.3",
    ECDSA_WITH_SHA512 => "ecdsa-with-SHA512" => "1.2.840.10045.4.3.4",

    // SECG curves
    SECP112R1 => "secp112r1" => "1.3.132.0.6",
    SECP112R2 => "secp112r2" => "1.3.132.0.7",
    SECP128R1 => "secp128r1" => "1.3.132.0.28",
    SECP128R2 => "secp128r2" => "1.3.132.0.29",
    SECP160K1 => "secp160k1" => "1.3.132.0.9",
    SECP160R1 => "secp160r1" => "1.3.132.0.8",
    SECP160R2 => "secp160r2" => "1.3.132.0.30",
    SECP192K1 => "secp192k1" => "1.3.132.0.31",
    SECP224K1 => "secp224k1" => "1.3.132.0.32",
    SECP224R1 => "secp224r1" => "1.3.132.0.33",
    SECP256K1 => "secp256k1" => "1.3.132.0.10",
    SECP384R1 => "secp384r1" => "1.3.132.0.34",
    SECP521R1 => "secp521r1" => "1.3.132.0.35",
    SECT163K1 => "sect163k1" => "1.3.132.0.1",
    SECT163R2 => "sect163r2" => "1.3.132.0.15",
    SECT233K1 => "sect233k1" => "1.3.132.0.26",
    SECT233R1 => "sect233r1" => "1.3.132.0.27",
    SECT283K1 => "sect283k1" => "1.3.132.0.16",
    SECT283R1 => "sect283r1" => "1.3.132.0.17",
    SECT409K1 => "sect409k1" => "1.3.132.0.36",
    SECT409R1 => "sect409r1" => "1.3.132.0.37",
    SECT571K1 => "sect571k1" => "1.3.132.0.38",
    SECT571R1 => "sect571r1" => "1.3.132.0.39",
    BRAINPOOL_P256R1 => "brainpoolP256r1" => "1.3.36.3.3.2.8.1.1.7",
    BRAINPOOL_P384R1 => "brainpoolP384r1" => "1.3.36.3.3.2.8.1.1.11",
    BRAINPOOL_P512R1 => "brainpoolP512r1" => "1.3.36.3.3.2.8.1.1.13",

    // Edwards and Montgomery curves
    ID_X25519 => "id-X25519" => "1.3.101.110",
    ID_X448 => "id-X448" => "1.3.101.111",
    ID_ED25519 => "id-Ed25519" => "1.3.101.112",
    ID_ED448 => "id-Ed448" => "1.3.101.113",

    // GOST
    ID_GOST_R3411_94_WITH_GOST_R3410_94 => "id-GostR3411-94-with-GostR3410-94" => "1.2.643.2.2.4",
    ID_GOST_R3411_94_WITH_GOST_R3410_2001 => "id-GostR3411-94-with-GostR3410-2001" => "1.2.643.2.2.3",
    ID_GOST_R3410_2001 => "id-GostR3410-2001" => "1.2.643.2.2.20",
    ID_GOST_R3410_94 => "id-GostR3410-94" => "1.2.643.2.2.19",

    // Netscape
    NETSCAPE => "netscape" => "2.16.840.1.113730",
    NETSCAPE_CERT_EXTENSION => "netscape-cert-extension" => "2.16.840.1.113730.1",
    NETSCAPE_CERT_TYPE => "netscape-cert-type" => "2.16.840.1.113730.1.1",
    NETSCAPE_BASE_URL => "netscape-base-url" => "2.16.840.1.113730.1.2",
    NETSCAPE_REVOCATION_URL => "netscape-revocation-url" => "2.16.840.1.113730.1.3",
    NETSCAPE_CA_REVOCATION_URL => "netscape-ca-revocation-url" => "2.16.840.1.113730.1.4",
    NETSCAPE_CERT_RENEWAL_URL => "netscape-cert-renewal-url" => "2.16.840.1.113730.1.7",
    NETSCAPE_CA_POLICY_URL => "netscape-ca-policy-url" => "2.16.840.1.113730.1.8",
    NETSCAPE_SSL_SERVER_NAME => "netscape-ssl-server-name" => "2.16.840.1.113730.1.12",
    NETSCAPE_COMMENT => "netscape-comment" => "2.16.840.1.113730.1.13",

    // vendor extensions kept opaque
    ENTRUST_VERS_INFO => "entrustVersInfo" => "1.2.840.113533.7.65.0",
    VERISIGN_PRIVATE => "verisignPrivate" => "2.16.840.1.113733.1.6.9",
    MS_CERTIFICATE_TEMPLATE_NAME => "ms-certificateTemplateName" => "1.3.6.1.4.1.311.20.2",
    MS_CERTIFICATE_TEMPLATE => "ms-certificateTemplate" => "1.3.6.1.4.1.311.21.7",
    MS_APPLICATION_CERT_POLICIES => "ms-applicationCertPolicies" => "1.3.6.1.4.1.311.21.10",
    MS_CA_VERSION => "ms-caVersion" => "1.3.6.1.4.1.311.21.1",
    SIGNED_CERTIFICATE_TIMESTAMP_LIST => "signedCertificateTimestampList" => "1.3.6.1.4.1.11129.2.4.2",
    CT_PRECERT_POISON => "ct-precertPoison" => "1.3.6.1.4.1.11129.2.4.3",
    ID_PE_TLS_FEATURE => "id-pe-tlsfeature" => "1.3.6.1.5.5.7.1.24",

    // CA/Browser forum policies
    CABF_DOMAIN_VALIDATED => "cabf-domain-validated" => "2.23.140.1.2.1",
    CABF_ORGANIZATION_VALIDATED => "cabf-organization-validated" => "2.23.140.1.2.2",
    CABF_INDIVIDUAL_VALIDATED => "cabf-individual-validated" => "2.23.140.1.2.3",
    CABF_EXTENDED_VALIDATION => "cabf-extended-validation" => "2.23.140.1.1",
}

static BY_NAME: LazyLock<HashMap<String, &'static str>> = LazyLock::new(|| {
    NAMED_OIDS
        .iter()
        .map(|(name, dotted)| (name.to_ascii_lowercase(), *dotted))
        .collect()
});

static BY_OID: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| NAMED_OIDS.iter().map(|(name, dotted)| (*dotted, *name)).collect());

/// Name of a dotted identifier, if it has one.
pub fn name_of(dotted: &str) -> Option<&'static str> {
    BY_OID.get(dotted).copied()
}

/// Dotted form of a name (case-insensitive) or of an already dotted identifier.
pub fn resolve(name_or_dotted: &str) -> Option<String> {
    if is_dotted(name_or_dotted) {
        return Some(name_or_dotted.to_owned());
    }
    BY_NAME
        .get(&name_or_dotted.to_ascii_lowercase())
        .map(|dotted| (*dotted).to_owned())
}

/// The name if there is one, the dotted form otherwise.
pub fn display_name(dotted: &str) -> String {
    name_of(dotted).map(str::to_owned).unwrap_or_else(|| dotted.to_owned())
}

fn is_dotted(candidate: &str) -> bool {
    tessera_asn1::encode_oid(candidate).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    #[test]
    fn names_and_values_are_unique() {
        let names: HashSet<_> = NAMED_OIDS.iter().map(|(name, _)| name.to_ascii_lowercase()).collect();
        let values: HashSet<_> = NAMED_OIDS.iter().map(|(_, dotted)| *dotted).collect();
        assert_eq!(names.len(), NAMED_OIDS.len());
        assert_eq!(values.len(), NAMED_OIDS.len());
    }

    #[test]
    fn every_value_is_a_valid_oid() {
        for (name, dotted) in NAMED_OIDS {
            assert!(tessera_asn1::encode_oid(dotted).is_ok(), "{name} => {dotted}");
        }
    }

    #[test]
    fn lookups() {
        assert_eq!(name_of("2.5.4.3"), Some("id-at-commonName"));
        assert_eq!(resolve("id-at-commonName").as_deref(), Some(ID_AT_COMMON_NAME));
        assert_eq!(resolve("ID-CE-KEYUSAGE").as_deref(), Some(ID_CE_KEY_USAGE));
        assert_eq!(resolve("1.2.3.4").as_deref(), Some("1.2.3.4"));
        assert_eq!(resolve("no-such-name"), None);
        assert_eq!(display_name("1.2.3.4"), "1.2.3.4");
    }
}
