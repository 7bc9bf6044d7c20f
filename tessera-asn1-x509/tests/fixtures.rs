use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use pretty_assertions::assert_eq;
use rstest::rstest;
use tessera_asn1::{Any, Schema, Tag, Value};
use tessera_asn1_der::{from_der, to_der};
use tessera_asn1_x509::*;

fn pem_to_der(pem: &str) -> Vec<u8> {
    let body: String = pem
        .lines()
        .filter(|line| !line.starts_with("-----"))
        .map(str::trim)
        .collect();
    STANDARD.decode(body).unwrap()
}

fn spkac_to_der(text: &str) -> Vec<u8> {
    STANDARD.decode(text.trim().trim_start_matches("SPKAC=")).unwrap()
}

fn extension_value<'a>(extensions: &'a Value, id: &str) -> Option<&'a [u8]> {
    extensions
        .as_list()?
        .iter()
        .find(|ext| ext.pointer("extnId").and_then(Value::as_oid) == Some(id))?
        .pointer("extnValue")?
        .as_octet_string()
}

#[rstest]
#[case::root(tessera_test_data::ROOT_CA)]
#[case::intermediate(tessera_test_data::INTERMEDIATE_CA)]
#[case::leaf(tessera_test_data::LEAF)]
#[case::ed25519(tessera_test_data::ED25519_SELF_SIGNED)]
#[case::ed448(tessera_test_data::ED448_SELF_SIGNED)]
#[case::dsa(tessera_test_data::DSA_SELF_SIGNED)]
#[case::rsa_pss(tessera_test_data::RSA_PSS_SELF_SIGNED)]
#[case::p384(tessera_test_data::P384_SELF_SIGNED)]
#[case::rsa_sha1(tessera_test_data::RSA_SHA1_SELF_SIGNED)]
#[case::loop_a(tessera_test_data::LOOP_A)]
fn certificate_round_trip(#[case] pem: &str) {
    let der = pem_to_der(pem);
    let value = from_der(&der, &certificate()).unwrap();
    assert_eq!(to_der(&value, &certificate()).unwrap(), der);
}

#[test]
fn leaf_fields() {
    let value = from_der(&pem_to_der(tessera_test_data::LEAF), &certificate()).unwrap();
    let tbs = value.pointer("tbsCertificate").unwrap();

    assert_eq!(tbs.pointer("version"), Some(&Value::Label("v3".to_owned())));
    assert_eq!(tbs.pointer("serialNumber"), Some(&Value::integer(0x2A3B4C)));
    assert_eq!(
        value.pointer("signatureAlgorithm/algorithm"),
        Some(&Value::oid(oids::ECDSA_WITH_SHA256))
    );
    assert_eq!(
        tbs.pointer("subjectPublicKeyInfo/algorithm/parameters"),
        Some(&Value::resolved(Tag::OID, Value::oid(oids::PRIME256V1)))
    );

    let not_before = tbs.pointer("validity/notBefore/utcTime").and_then(Value::as_time).unwrap();
    assert_eq!(not_before.year(), 2024);

    let subject = tbs.pointer("subject/rdnSequence").and_then(Value::as_list).unwrap();
    assert_eq!(subject.len(), 6);
    assert_eq!(
        subject[5].pointer("0/value"),
        Some(&Value::resolved(Tag::UTF8_STRING, Value::string("www.tessera.test")))
    );
}

#[test]
fn leaf_extension_payloads() {
    let value = from_der(&pem_to_der(tessera_test_data::LEAF), &certificate()).unwrap();
    let extensions = value.pointer("tbsCertificate/extensions").unwrap();
    let registry = ExtensionRegistry::builtin();

    let san = extension_value(extensions, oids::ID_CE_SUBJECT_ALT_NAME).unwrap();
    let san = from_der(san, registry.lookup(oids::ID_CE_SUBJECT_ALT_NAME).unwrap()).unwrap();
    let san = san.as_list().unwrap();
    assert_eq!(san.len(), 4);
    assert_eq!(san[1], Value::choice("dNSName", Value::string("*.api.tessera.test")));
    assert_eq!(san[2], Value::choice("iPAddress", Value::OctetString(vec![192, 0, 2, 10])));

    let aia = extension_value(extensions, oids::ID_PE_AUTHORITY_INFO_ACCESS).unwrap();
    let aia = from_der(aia, registry.lookup(oids::ID_PE_AUTHORITY_INFO_ACCESS).unwrap()).unwrap();
    assert_eq!(aia.pointer("1/accessMethod"), Some(&Value::oid(oids::ID_AD_CA_ISSUERS)));
    assert_eq!(
        aia.pointer("1/accessLocation/uniformResourceIdentifier"),
        Some(&Value::string("http://ca.tessera.test/intermediate.crt"))
    );

    let policies = extension_value(extensions, oids::ID_CE_CERTIFICATE_POLICIES).unwrap();
    let policies = from_der(policies, registry.lookup(oids::ID_CE_CERTIFICATE_POLICIES).unwrap()).unwrap();
    assert_eq!(
        policies.pointer("0/policyIdentifier"),
        Some(&Value::oid(oids::CABF_ORGANIZATION_VALIDATED))
    );
    // CPS is a plain IA5String, the user notice a SEQUENCE kept as an element
    assert_eq!(
        policies.pointer("0/policyQualifiers/0/qualifier"),
        Some(&Value::resolved(Tag::IA5_STRING, Value::string("https://tessera.test/cps")))
    );
    let notice = policies.pointer("0/policyQualifiers/1/qualifier").unwrap();
    assert!(matches!(notice, Value::Any(Any::Opaque(_))));
    let notice = from_der(notice.as_element().unwrap().as_bytes(), &extension::user_notice()).unwrap();
    assert_eq!(
        notice.pointer("explicitText").and_then(|text| text.as_choice()).map(|(_, v)| v),
        Some(&Value::string("Test policy"))
    );
}

#[test]
fn ed25519_not_after_is_generalized_time() {
    let value = from_der(&pem_to_der(tessera_test_data::ED25519_SELF_SIGNED), &certificate()).unwrap();
    let not_after = value.pointer("tbsCertificate/validity/notAfter").unwrap();
    assert_eq!(not_after.as_choice().unwrap().0, "generalTime");
    assert_eq!(not_after.as_choice().unwrap().1.as_time().unwrap().year(), 2055);
}

#[test]
fn certification_request_fixture() {
    let der = pem_to_der(tessera_test_data::CSR);
    let value = from_der(&der, &certification_request()).unwrap();
    assert_eq!(to_der(&value, &certification_request()).unwrap(), der);

    let attributes = value
        .pointer("certificationRequestInfo/attributes")
        .and_then(Value::as_list)
        .unwrap();
    let types: Vec<_> = attributes
        .iter()
        .filter_map(|attribute| attribute.pointer("type").and_then(Value::as_oid))
        .collect();
    assert_eq!(types, [oids::PKCS_9_AT_CHALLENGE_PASSWORD, oids::PKCS_9_AT_EXTENSION_REQUEST]);
}

#[test]
fn crl_fixture() {
    let der = pem_to_der(tessera_test_data::CRL);
    let value = from_der(&der, &certificate_list()).unwrap();
    assert_eq!(to_der(&value, &certificate_list()).unwrap(), der);

    let tbs = value.pointer("tbsCertList").unwrap();
    assert_eq!(tbs.pointer("version"), Some(&Value::Label("v2".to_owned())));
    let revoked = tbs.pointer("revokedCertificates").and_then(Value::as_list).unwrap();
    assert_eq!(revoked.len(), 2);
    assert_eq!(revoked[1].pointer("userCertificate"), Some(&Value::integer(0x1234)));

    let reason = extension_value(revoked[0].pointer("crlEntryExtensions").unwrap(), oids::ID_CE_CRL_REASONS).unwrap();
    assert_eq!(
        from_der(reason, &extension::crl_reason()).unwrap(),
        Value::Label("keyCompromise".to_owned())
    );
}

#[test]
fn spkac_fixture() {
    let der = spkac_to_der(tessera_test_data::SPKAC);
    let value = from_der(&der, &signed_public_key_and_challenge()).unwrap();
    assert_eq!(to_der(&value, &signed_public_key_and_challenge()).unwrap(), der);
    assert_eq!(
        value.pointer("publicKeyAndChallenge/challenge"),
        Some(&Value::string("tessera-challenge"))
    );
}

#[test]
fn registry_schemas_encode() {
    let registry = ExtensionRegistry::builtin();
    let basic = registry.lookup(oids::ID_CE_BASIC_CONSTRAINTS).unwrap();
    let value = Value::sequence([("cA", Value::Boolean(true)), ("pathLenConstraint", Value::integer(0))]);
    assert_eq!(to_der(&value, basic).unwrap(), [0x30, 0x06, 0x01, 0x01, 0xFF, 0x02, 0x01, 0x00]);

    let number: &Schema = registry.lookup("id-ce-cRLNumber").unwrap();
    assert_eq!(to_der(&Value::integer(42), number).unwrap(), [0x02, 0x01, 0x2A]);
}
