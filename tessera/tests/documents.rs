//! Loading, querying, editing and saving of the fixture documents.

use pretty_assertions::assert_eq;
use rstest::rstest;
use tessera::pem::parse_pem;
use tessera::x509::{Cert, Crl, Csr, DistinguishedName, DnFormat, FormattedDn, Spkac};
use tessera::{oids, ExtensionRegistry};
use tessera_asn1::{Asn1Time, BigInt, Value};

#[rstest]
#[case(tessera_test_data::ROOT_CA, "70fba217")]
#[case(tessera_test_data::LEAF, "fba76c85")]
fn subject_hash_matches_openssl(#[case] pem: &str, #[case] expected: &str) {
    let cert = Cert::from_pem_str(pem).unwrap();
    assert_eq!(cert.subject().unwrap().hash().unwrap(), expected);
    assert_eq!(
        cert.subject().unwrap().format(DnFormat::Hash).unwrap(),
        FormattedDn::Hash(expected.to_owned())
    );
}

#[test]
fn leaf_subject_string() {
    let cert = Cert::from_pem_str(tessera_test_data::LEAF).unwrap();
    let subject = cert.subject().unwrap();

    assert_eq!(
        subject.to_string(),
        "C=US, ST=California, L=San Francisco, O=Tessera Test, OU=Engineering, CN=www.tessera.test"
    );
    assert_eq!(subject.get("commonName").unwrap(), vec![Value::string("www.tessera.test")]);

    let parsed: DistinguishedName = "/C=US/O=Tessera Test/CN=Tessera Intermediate CA".parse().unwrap();
    assert_eq!(parsed.canonical().unwrap(), cert.issuer().unwrap().canonical().unwrap());
}

#[rstest]
#[case("https://www.tessera.test/", true)]
#[case("https://WWW.tessera.test:8443/login", true)]
#[case("https://v1.api.tessera.test", true)]
#[case("https://api.tessera.test", false)]
#[case("https://a.b.api.tessera.test", false)]
#[case("https://192.0.2.10/", true)]
#[case("https://192.0.2.11/", false)]
#[case("https://[2001:db8::1]/", true)]
#[case("https://[2001:db8:0:0:0:0:0:1]/", true)]
#[case("https://tessera.test/", false)]
fn leaf_urls(#[case] url: &str, #[case] expected: bool) {
    let cert = Cert::from_pem_str(tessera_test_data::LEAF).unwrap();
    assert_eq!(cert.validate_url(url), expected, "{url}");
}

#[test]
fn common_name_used_without_san() {
    let cert = Cert::from_pem_str(tessera_test_data::ROOT_CA).unwrap();
    assert!(cert.extension(oids::ID_CE_SUBJECT_ALT_NAME).unwrap().is_none());
    assert!(!cert.validate_url("https://www.tessera.test/"));
}

#[test]
fn leaf_validity() {
    let cert = Cert::from_pem_str(tessera_test_data::LEAF).unwrap();
    let at = |year| Asn1Time::from_ymd_hms(year, 1, 1, 0, 0, 0).unwrap();

    assert!(cert.validate_date(at(2025)));
    assert!(cert.validate_date(at(2030)));
    assert!(!cert.validate_date(at(2024)));
    assert!(!cert.validate_date(at(2031)));
}

#[rstest]
#[case(tessera_test_data::ROOT_CA)]
#[case(tessera_test_data::INTERMEDIATE_CA)]
#[case(tessera_test_data::LEAF)]
#[case(tessera_test_data::ED25519_SELF_SIGNED)]
#[case(tessera_test_data::DSA_SELF_SIGNED)]
#[case(tessera_test_data::RSA_PSS_SELF_SIGNED)]
fn certificates_save_as_loaded(#[case] pem: &str) {
    let original = parse_pem(pem).unwrap();
    let cert = Cert::load(pem).unwrap();
    assert_eq!(cert.to_der().unwrap(), original.data());
    assert_eq!(cert.signature_subject(), &original.data()[4..4 + cert.signature_subject().len()]);
}

#[test]
fn documents_save_as_loaded() {
    let csr = parse_pem(tessera_test_data::CSR).unwrap();
    assert_eq!(Csr::load(csr.data()).unwrap().to_der().unwrap(), csr.data());

    let crl = parse_pem(tessera_test_data::CRL).unwrap();
    assert_eq!(Crl::load(tessera_test_data::CRL).unwrap().to_der().unwrap(), crl.data());

    let spkac = Spkac::load(tessera_test_data::SPKAC).unwrap();
    assert_eq!(Spkac::load(&spkac.to_der().unwrap()).unwrap(), spkac);
}

#[test]
fn edited_certificate_keeps_extensions() {
    let mut cert = Cert::from_pem_str(tessera_test_data::LEAF).unwrap();

    assert!(!cert
        .set_extension(
            "id-ce-basicConstraints",
            Value::sequence([("cA", Value::Boolean(true))]),
            true,
            false
        )
        .unwrap());
    assert!(cert
        .set_extension(
            "netscape-comment",
            Value::string("edited"),
            false,
            false
        )
        .unwrap());
    assert!(cert.remove_extension("id-ce-subjectAltName").unwrap());

    let reloaded = Cert::from_der(&cert.to_der().unwrap()).unwrap();
    assert_eq!(
        reloaded.extension("netscape-comment").unwrap().map(Value::unwrap_any),
        Some(&Value::string("edited"))
    );
    assert!(reloaded.extension(oids::ID_CE_SUBJECT_ALT_NAME).unwrap().is_none());
    assert_eq!(reloaded.serial_number(), Some(&BigInt::from(0x2A3B4C)));
}

#[test]
fn unregistered_extension_needs_a_schema() {
    let mut cert = Cert::from_pem_str(tessera_test_data::ROOT_CA).unwrap();
    cert.set_extension("1.3.6.1.4.1.55555.1", Value::Boolean(true), false, false)
        .unwrap();
    assert!(cert.to_der().is_err());

    let mut registry = ExtensionRegistry::default();
    registry
        .register("1.3.6.1.4.1.55555.1", tessera_asn1::Schema::boolean())
        .unwrap();
    let mut cert = Cert::load_with(tessera_test_data::ROOT_CA, &registry).unwrap();
    cert.set_extension("1.3.6.1.4.1.55555.1", Value::Boolean(true), false, false)
        .unwrap();

    let reloaded = Cert::from_der_with(&cert.to_der().unwrap(), &registry).unwrap();
    assert_eq!(
        reloaded.extension("1.3.6.1.4.1.55555.1").unwrap(),
        Some(&Value::Boolean(true))
    );
}
