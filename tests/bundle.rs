//! Certificate and CRL bundles against `openssl crl2pkcs7` output.

#![cfg(feature = "pem")]

use hex_literal::hex;
use pkcs7_sign::{
    bundle::{
        bundle_certificates, bundle_crls, bundle_raw_certificates, get_certificates, get_crls,
        get_pem_certificates, get_pem_crls, get_raw_certificates,
    },
    Certificate, Crl, Error, RawCertificate, SignedData,
};

const CHAIN_P7C: &[u8] = include_bytes!("examples/pkcs7/chain.p7c");
const CHAIN_UNSORTED_P7C: &[u8] = include_bytes!("examples/pkcs7/chain_unsorted.p7c");
const CHAIN_P7_PEM: &str = include_str!("examples/pkcs7/chain_p7.pem");
const CRL_P7C: &[u8] = include_bytes!("examples/pkcs7/crl.p7c");
const CRL_P7_PEM: &str = include_str!("examples/pkcs7/crl_p7.pem");

/// The mail.google.com certificate exported from Chrome, through
/// `openssl pkcs7 -outform PEM`.
const MAIL_GOOGLE_P7_PEM: &str = include_str!("examples/pkcs7/mail_google_p7.pem");
/// The Equifax Secure CA CRL, through `openssl crl2pkcs7`.
const EQUIFAX_CRL_P7_PEM: &str = include_str!("examples/pkcs7/equifax_crl_p7.pem");

/// Headers of `ContentInfo`, its `[0]` and the `SignedData` SEQUENCE, all
/// in the two-byte long form.
const OUTER_HEADERS: usize = 23;

fn chain() -> [Certificate; 3] {
    [
        Certificate::from_pem(include_str!("examples/pkcs7/root.pem")).unwrap(),
        Certificate::from_pem(include_str!("examples/pkcs7/int.pem")).unwrap(),
        Certificate::from_pem(include_str!("examples/pkcs7/leaf.pem")).unwrap(),
    ]
}

fn crls() -> [Crl; 2] {
    [
        Crl::from_pem(include_str!("examples/pkcs7/crl1.pem")).unwrap(),
        Crl::from_pem(include_str!("examples/pkcs7/crl2.pem")).unwrap(),
    ]
}

#[test]
fn test_bundle_matches_openssl() {
    let [root, int, leaf] = chain();
    assert_eq!(
        bundle_certificates(&[leaf.clone(), int.clone(), root.clone()]).unwrap(),
        CHAIN_P7C
    );
    assert_eq!(bundle_certificates(&[int, root, leaf]).unwrap(), CHAIN_P7C);
}

#[test]
fn test_parse_canonical_bundle_echoes_input() {
    let (certs, rest) = get_certificates(CHAIN_P7C).unwrap();
    assert!(rest.is_empty());
    assert_eq!(certs, chain());
    assert_eq!(bundle_certificates(&certs).unwrap(), CHAIN_P7C);

    let sd = SignedData::from_der(CHAIN_P7C).unwrap();
    assert_eq!(sd.to_der().unwrap(), CHAIN_P7C);
}

#[test]
fn test_unsorted_bundle_serializes_canonically() {
    assert_ne!(CHAIN_P7C, CHAIN_UNSORTED_P7C);

    let (certs, _) = get_certificates(CHAIN_UNSORTED_P7C).unwrap();
    let [root, int, leaf] = chain();
    assert_eq!(certs, [leaf, int, root]);
    assert_eq!(bundle_certificates(&certs).unwrap(), CHAIN_P7C);

    let sd = SignedData::from_der(CHAIN_UNSORTED_P7C).unwrap();
    assert_eq!(sd.to_der().unwrap(), CHAIN_P7C);
}

#[test]
fn test_rebundling_is_idempotent() {
    let once = bundle_certificates(&chain()).unwrap();
    let (certs, _) = get_certificates(&once).unwrap();
    let twice = bundle_certificates(&certs).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn test_get_certificates_returns_trailing_data() {
    let mut input = CHAIN_P7C.to_vec();
    input.extend_from_slice(CRL_P7C);

    let (certs, rest) = get_certificates(&input).unwrap();
    assert_eq!(certs.len(), 3);
    assert_eq!(rest, CRL_P7C);

    let (crls, rest) = get_crls(rest).unwrap();
    assert_eq!(crls.len(), 1);
    assert!(rest.is_empty());
}

#[test]
fn test_pem_bundle() {
    let certs = get_pem_certificates(CHAIN_P7_PEM).unwrap();
    assert_eq!(certs, chain());

    assert!(matches!(
        get_pem_certificates(include_str!("examples/pkcs7/root.pem")),
        Err(Error::Pem(_))
    ));
}

#[test]
fn test_pem_output_roundtrip() {
    let sd = SignedData::from_der(CHAIN_P7C).unwrap();
    let pem = sd.to_pem(pkcs7_sign::LineEnding::LF).unwrap();
    assert!(pem.starts_with("-----BEGIN PKCS7-----\n"));
    assert_eq!(SignedData::from_pem(&pem).unwrap(), sd);
}

#[test]
fn test_raw_bundle_matches_decoded() {
    let certs = chain();
    let raw: Vec<RawCertificate> = certs.iter().rev().map(RawCertificate::from).collect();
    assert_eq!(bundle_raw_certificates(&raw).unwrap(), CHAIN_P7C);

    let (parsed, rest) = get_raw_certificates(CHAIN_UNSORTED_P7C).unwrap();
    assert!(rest.is_empty());
    assert_eq!(parsed, raw);

    let decoded: Vec<Certificate> = parsed.iter().map(|c| c.decode().unwrap()).collect();
    assert_eq!(decoded, [certs[2].clone(), certs[1].clone(), certs[0].clone()]);
}

#[test]
fn test_crl_bundle_matches_openssl() {
    let [_, crl2] = crls();
    assert_eq!(bundle_crls(&[crl2.clone()]).unwrap(), CRL_P7C);

    let (parsed, rest) = get_crls(CRL_P7C).unwrap();
    assert!(rest.is_empty());
    assert_eq!(parsed, [crl2]);

    let (certs, _) = get_certificates(CRL_P7C).unwrap();
    assert!(certs.is_empty());
}

#[test]
fn test_crls_sorted() {
    let [crl1, crl2] = crls();
    // The two encodings first differ in their length octets.
    assert_eq!(crl1.as_der()[1], 0x81);
    assert_eq!(crl2.as_der()[1], 0x82);

    for order in [[crl1.clone(), crl2.clone()], [crl2.clone(), crl1.clone()]] {
        let der = bundle_crls(&order).unwrap();
        let (parsed, _) = get_crls(&der).unwrap();
        assert_eq!(parsed, [crl1.clone(), crl2.clone()]);
    }
}

#[test]
fn test_pem_crl_bundle() {
    let [crl1, _] = crls();
    assert_eq!(get_pem_crls(CRL_P7_PEM).unwrap(), [crl1]);
}

#[test]
fn test_truncated_bundle() {
    for len in [0, 4, 44, CHAIN_P7C.len() - 1] {
        assert!(matches!(
            get_certificates(&CHAIN_P7C[..len]),
            Err(Error::MalformedEncoding { .. })
        ));
    }
}

/// Re-frame a bundle with the three outer headers in indefinite-length form.
fn indefinite_outer(der: &[u8]) -> Vec<u8> {
    assert_eq!(&der[..2], hex!("3082"));
    let mut ber = hex!("3080 06092a864886f70d010702 a080 3080").to_vec();
    ber.extend_from_slice(&der[OUTER_HEADERS..]);
    ber.extend_from_slice(&[0; 6]);
    ber
}

/// `chain.p7c` framed the way NSS exports bundles: the certificate set is
/// indefinite-length too.
fn nss_style_chain() -> Vec<u8> {
    // version, digestAlgorithms and encapContentInfo precede the certificates.
    let (prefix, certs) = CHAIN_P7C[OUTER_HEADERS..].split_at(3 + 2 + 13);
    assert_eq!(&certs[..2], hex!("a082"));
    assert_eq!(&certs[certs.len() - 2..], hex!("3100"));

    let mut ber = hex!("3080 06092a864886f70d010702 a080 3080").to_vec();
    ber.extend_from_slice(prefix);
    ber.extend_from_slice(&hex!("a080"));
    ber.extend_from_slice(&certs[4..certs.len() - 2]);
    ber.extend_from_slice(&hex!("0000 3100 0000 0000 0000"));
    ber
}

#[test]
fn test_indefinite_length_bundle() {
    for ber in [indefinite_outer(CHAIN_P7C), nss_style_chain()] {
        let (certs, rest) = get_certificates(&ber).unwrap();
        assert!(rest.is_empty());
        assert_eq!(certs, chain());
        assert_eq!(bundle_certificates(&certs).unwrap(), CHAIN_P7C);

        let sd = SignedData::from_der(&ber).unwrap();
        assert_eq!(sd.to_der().unwrap(), CHAIN_P7C);

        let (raw, _) = get_raw_certificates(&ber).unwrap();
        assert_eq!(bundle_raw_certificates(&raw).unwrap(), CHAIN_P7C);
    }
}

#[test]
fn test_indefinite_length_bundle_trailing_data() {
    let mut input = nss_style_chain();
    input.extend_from_slice(CHAIN_P7C);

    let (certs, rest) = get_certificates(&input).unwrap();
    assert_eq!(certs.len(), 3);
    assert_eq!(rest, CHAIN_P7C);
}

#[test]
fn test_indefinite_length_crl_bundle() {
    let indefinite = indefinite_outer(CRL_P7C);
    let (crls, rest) = get_crls(&indefinite).unwrap();
    assert!(rest.is_empty());
    assert_eq!(bundle_crls(&crls).unwrap(), CRL_P7C);
}

#[test]
fn test_indefinite_length_bundle_truncated() {
    let ber = nss_style_chain();
    assert!(matches!(
        get_certificates(&ber[..ber.len() - 1]),
        Err(Error::MalformedEncoding { .. })
    ));
}

#[test]
fn test_reference_pem_certificates() {
    let certs = get_pem_certificates(MAIL_GOOGLE_P7_PEM).unwrap();
    assert_eq!(certs.len(), 1);

    let (_, der) = pem_rfc7468::decode_vec(MAIL_GOOGLE_P7_PEM.as_bytes()).unwrap();
    assert_eq!(bundle_certificates(&certs).unwrap(), der);
}

#[test]
fn test_reference_pem_crls() {
    let crls = get_pem_crls(EQUIFAX_CRL_P7_PEM).unwrap();
    assert_eq!(crls.len(), 1);

    // An empty certificate field is kept as-is.
    let (_, der) = pem_rfc7468::decode_vec(EQUIFAX_CRL_P7_PEM.as_bytes()).unwrap();
    let sd = SignedData::from_der(&der).unwrap();
    assert_eq!(sd.certificates(), Some(&[][..]));
    assert_eq!(sd.to_der().unwrap(), der);
}

#[test]
fn test_reference_crls_sorted() {
    let crl1 = Crl::from_pem(include_str!("examples/pkcs7/sort_crl1.pem")).unwrap();
    let crl2 = Crl::from_pem(include_str!("examples/pkcs7/sort_crl2.pem")).unwrap();
    // Same tag and length form, so the shorter encoding sorts first.
    assert!(crl1.as_der().len() < crl2.as_der().len());

    for order in [[crl1.clone(), crl2.clone()], [crl2.clone(), crl1.clone()]] {
        let bundled = bundle_crls(&order).unwrap();
        let (parsed, rest) = get_crls(&bundled).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed, [crl1.clone(), crl2.clone()]);
    }
}
