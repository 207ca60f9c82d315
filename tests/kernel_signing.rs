//! Detached, attribute-less signatures as used for Linux kernel modules.
//!
//! Fixtures were produced with
//! `openssl cms -sign -binary -nocerts -noattr [-keyid] -md <md> -outform DER`
//! over the 11 bytes `signed data`.

#![cfg(all(feature = "pem", feature = "std"))]

use pkcs7_sign::{
    flags::module_signing, pkcs7_sign, sign, signed_data::SignerIdentifier, traits::SigningKey,
    Certificate, DigestAlgorithm, Error, Flag, Flags, OutputMode, SignedData, SignedDataBuilder,
};
use pkcs8::DecodePrivateKey;
use rsa::RsaPrivateKey;

const CONTENT: &[u8] = b"signed data";

const SHA256_P7S: &[u8] = include_bytes!("examples/pkcs7/sign_sha256.p7s");
const SHA1_P7S: &[u8] = include_bytes!("examples/pkcs7/sign_sha1.p7s");
const SHA256_KEY_ID_P7S: &[u8] = include_bytes!("examples/pkcs7/sign_sha256_key_id.p7s");
const SHA1_KEY_ID_P7S: &[u8] = include_bytes!("examples/pkcs7/sign_sha1_key_id.p7s");

fn signing_cert() -> Certificate {
    Certificate::from_pem(include_str!("examples/pkcs7/sign_cert.pem")).unwrap()
}

fn signing_key() -> RsaPrivateKey {
    RsaPrivateKey::from_pkcs8_pem(include_str!("examples/pkcs7/sign_key.pem")).unwrap()
}

fn kernel_flags() -> Flags {
    Flag::NoCerts | Flag::Binary | Flag::NoSmimeCap | Flag::NoAttributes | Flag::Detached
}

fn sign_with(digest: DigestAlgorithm, extra: Flags) -> Vec<u8> {
    let cert = signing_cert();
    let key = signing_key();
    let flags = kernel_flags() | extra;

    let mut builder = SignedDataBuilder::new(flags);
    builder.add_signer(&cert, &key, digest, flags).unwrap();
    builder.finalize(CONTENT, flags).unwrap();
    builder.to_der().unwrap()
}

#[test]
fn test_sha256_matches_openssl() {
    assert_eq!(sign_with(DigestAlgorithm::Sha256, Flags::default()), SHA256_P7S);
}

#[test]
fn test_sha1_matches_openssl() {
    assert_eq!(sign_with(DigestAlgorithm::Sha1, Flags::default()), SHA1_P7S);
}

#[test]
fn test_key_id_matches_openssl() {
    assert_eq!(
        sign_with(DigestAlgorithm::Sha256, Flag::UseKeyId.into()),
        SHA256_KEY_ID_P7S
    );
    assert_eq!(
        sign_with(DigestAlgorithm::Sha1, Flag::UseKeyId.into()),
        SHA1_KEY_ID_P7S
    );
}

#[test]
fn test_signing_is_deterministic() {
    let first = sign_with(DigestAlgorithm::Sha256, Flags::default());
    let second = sign_with(DigestAlgorithm::Sha256, Flags::default());
    assert_eq!(first, second);
}

#[test]
fn test_cross_api_equivalence() {
    let cert = signing_cert();
    let rsa_key = signing_key();
    let key: &dyn SigningKey = &rsa_key;

    let one_shot = sign(Some((&cert, key)), &[], Some(CONTENT), kernel_flags())
        .unwrap()
        .to_der()
        .unwrap();
    assert_eq!(one_shot, SHA256_P7S);

    let mut partial = sign(None, &[], None, kernel_flags() | Flag::Partial).unwrap();
    partial
        .add_signer(&cert, key, DigestAlgorithm::Sha256, kernel_flags())
        .unwrap();
    partial.finalize(CONTENT, kernel_flags()).unwrap();
    assert_eq!(partial.to_der().unwrap(), SHA256_P7S);

    let mut streaming = sign(Some((&cert, key)), &[], None, kernel_flags() | Flag::Stream).unwrap();
    let mut streamed = Vec::new();
    streaming
        .write_stream(&mut streamed, CONTENT, kernel_flags())
        .unwrap();
    assert_eq!(streamed, SHA256_P7S);

    let sd = partial.into_signed_data().unwrap();
    for mode in [OutputMode::Buffered, OutputMode::Streaming] {
        let mut out = Vec::new();
        sd.write_to(&mut out, mode).unwrap();
        assert_eq!(out, SHA256_P7S);
    }

    let legacy = pkcs7_sign(Some((&cert, key)), &[], Some(CONTENT), module_signing()).unwrap();
    assert_eq!(legacy.to_der().unwrap(), SHA256_P7S);
}

#[test]
fn test_key_id_requires_extension() {
    let cert = Certificate::from_pem(include_str!("examples/pkcs7/sign_cert_no_skid.pem")).unwrap();
    let key = signing_key();
    let flags = kernel_flags() | Flag::UseKeyId;

    let mut builder = SignedDataBuilder::new(flags);
    assert!(matches!(
        builder.add_signer(&cert, &key, DigestAlgorithm::Sha256, flags),
        Err(Error::NoKeyIdentifier)
    ));

    // Nothing was added, so the builder still finalizes to an unsigned structure.
    let sd = builder.finalize(CONTENT, flags).unwrap();
    assert!(sd.signer_infos().is_empty());
    assert!(sd.digest_algorithms().is_empty());
}

#[test]
fn test_pkcs7_sign_flag_matrix() {
    let cert = signing_cert();
    let rsa_key = signing_key();
    let key: &dyn SigningKey = &rsa_key;

    let rejected: [Flags; 4] = [
        Flag::NoAttributes | Flag::Binary | Flag::NoCerts,
        Flag::Binary | Flag::NoCerts | Flag::Detached,
        Flag::NoAttributes | Flag::Text | Flag::NoCerts | Flag::Detached,
        Flag::NoAttributes | Flag::Binary | Flag::Detached,
    ];
    for flags in rejected {
        match pkcs7_sign(Some((&cert, key)), &[], Some(CONTENT), flags) {
            Err(Error::UnsupportedOptionCombination { flags: reported, .. }) => {
                assert_eq!(reported, flags)
            }
            other => panic!("flags {:?} accepted: {:?}", flags, other),
        }
    }

    assert!(pkcs7_sign(Some((&cert, key)), &[], Some(CONTENT), module_signing()).is_ok());
}

#[test]
fn test_pkcs7_sign_rejects_extra_certificates() {
    let cert = signing_cert();
    let rsa_key = signing_key();
    let key: &dyn SigningKey = &rsa_key;
    assert!(matches!(
        pkcs7_sign(
            Some((&cert, key)),
            &[cert.clone()],
            Some(CONTENT),
            module_signing()
        ),
        Err(Error::UnsupportedOptionCombination { .. })
    ));
}

#[test]
fn test_parse_openssl_signatures() {
    let cert = signing_cert();

    let sd = SignedData::from_der(SHA256_P7S).unwrap();
    assert_eq!(sd.version(), 1);
    assert!(sd.is_detached());
    assert!(sd.certificates().is_none());
    let signer = &sd.signer_infos()[0];
    assert_eq!(signer.version(), 1);
    assert!(signer.sid().matches(&cert));
    assert!(signer.signed_attrs().is_none());
    assert_eq!(signer.digest().unwrap(), DigestAlgorithm::Sha256);

    let sd = SignedData::from_der(SHA1_KEY_ID_P7S).unwrap();
    assert_eq!(sd.version(), 3);
    let signer = &sd.signer_infos()[0];
    assert_eq!(
        signer.sid(),
        &SignerIdentifier::SubjectKeyIdentifier(cert.subject_key_identifier().unwrap().to_vec())
    );
    assert_eq!(signer.digest().unwrap(), DigestAlgorithm::Sha1);
}

#[test]
fn test_verify_detached() {
    let cert = signing_cert();
    let public_key = cert.rsa_public_key().unwrap();

    for fixture in [SHA256_P7S, SHA1_P7S, SHA256_KEY_ID_P7S, SHA1_KEY_ID_P7S] {
        let sd = SignedData::from_der(fixture).unwrap();
        let signer = &sd.signer_infos()[0];
        sd.verify_signer(signer, &public_key, Some(CONTENT)).unwrap();

        assert!(matches!(
            sd.verify_signer(signer, &public_key, Some(&b"signed data\n"[..])),
            Err(Error::Verification)
        ));
        assert!(matches!(
            sd.verify_signer(signer, &public_key, None),
            Err(Error::MissingContent)
        ));
    }
}
