//! Test data shared between the tessera crates.
//!
//! Fixtures were produced with python `cryptography` (48.0) and OpenSSL 3.0.

// Root CA, RSA 2048, self-signed with sha256WithRSAEncryption.
// C=US, O=Tessera Test, CN=Tessera Root CA, serial 01
// SKI 39f5b30c3792e750af8544f0030b9ed2556ee86e
// openssl x509 -hash => 70fba217
pub const ROOT_CA: &str = include_str!("../test_assets/root_ca.pem");

// Intermediate CA, P-256 key, issued by ROOT_CA, serial 1001, pathlen 0.
// SKI 7ea2e175b635bb613fa36157908751c8fef9d3c5
// AIA caIssuers => http://ca.tessera.test/root.crt
pub const INTERMEDIATE_CA: &str = include_str!("../test_assets/intermediate_ca.pem");

// Leaf, P-256 key, issued by INTERMEDIATE_CA with ecdsa-with-SHA256, serial 2A3B4C.
// C=US, ST=California, L=San Francisco, O=Tessera Test, OU=Engineering, CN=www.tessera.test
// SAN: www.tessera.test, *.api.tessera.test, 192.0.2.10, 2001:db8::1
// AIA caIssuers => http://ca.tessera.test/intermediate.crt
// valid 2024-06-01 .. 2030-01-01, openssl x509 -hash => fba76c85
pub const LEAF: &str = include_str!("../test_assets/leaf.pem");

// Self-signed Ed25519, serial 07, notAfter 2055-01-01 (GeneralizedTime).
pub const ED25519_SELF_SIGNED: &str = include_str!("../test_assets/ed25519.pem");

// Self-signed Ed448, serial 08.
pub const ED448_SELF_SIGNED: &str = include_str!("../test_assets/ed448.pem");

// Self-signed DSA 2048, dsa-with-sha256, serial 09.
pub const DSA_SELF_SIGNED: &str = include_str!("../test_assets/dsa.pem");

// Self-signed RSA 2048 key signed with RSASSA-PSS (sha256, mgf1-sha256, salt 32), serial 0A.
pub const RSA_PSS_SELF_SIGNED: &str = include_str!("../test_assets/rsa_pss.pem");

// Self-signed P-384, ecdsa-with-SHA384, serial 0B.
pub const P384_SELF_SIGNED: &str = include_str!("../test_assets/p384.pem");

// openssl req -x509 -new -key sha1_key.pem -sha1 -subj "/CN=Tessera SHA-1" -days 9000 -set_serial 12
pub const RSA_SHA1_SELF_SIGNED: &str = include_str!("../test_assets/rsa_sha1.pem");

// RSA 2048 request for C=FR, O=Tessera Test, CN=csr.tessera.test
// challengePassword "s3cret", extensionRequest with SAN csr.tessera.test and a critical key usage.
pub const CSR: &str = include_str!("../test_assets/csr.pem");

// v2 CRL signed by ROOT_CA, thisUpdate 2024-07-01, nextUpdate 2024-08-01, cRLNumber 42.
// Revoked: 2A3B4C (2024-06-15, keyCompromise), 1234 (2024-06-20).
pub const CRL: &str = include_str!("../test_assets/crl.pem");

// openssl spkac -key spkac_key.pem -challenge tessera-challenge -digest sha256
pub const SPKAC: &str = include_str!("../test_assets/spkac.txt");

// Two P-256 CAs issued by each other.
// LOOP_A: CN=Loop A issued by CN=Loop B, caIssuers => http://loop.tessera.test/b.crt
// LOOP_B: CN=Loop B issued by CN=Loop A, caIssuers => http://loop.tessera.test/a.crt
pub const LOOP_A: &str = include_str!("../test_assets/loop_a.pem");
pub const LOOP_B: &str = include_str!("../test_assets/loop_b.pem");
