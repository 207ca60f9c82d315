//! Property-based tests.

use pkcs7_sign::sort::{der_cmp, encode_set_of, sort_der_elements};
use proptest::prelude::*;

prop_compose! {
    // A short primitive TLV: OCTET STRING with arbitrary contents.
    fn octet_string()(value in proptest::collection::vec(any::<u8>(), 0..40)) -> Vec<u8> {
        let mut tlv = vec![0x04, value.len() as u8];
        tlv.extend_from_slice(&value);
        tlv
    }
}

proptest! {
    #[test]
    fn sort_is_permutation_invariant(
        (elements, shuffled) in proptest::collection::vec(octet_string(), 0..12)
            .prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle()))
    ) {
        let mut a = elements;
        let mut b = shuffled;
        sort_der_elements(&mut a);
        sort_der_elements(&mut b);
        prop_assert_eq!(&a, &b);
        prop_assert!(a.windows(2).all(|w| der_cmp(&w[0], &w[1]).is_le()));
    }

    #[test]
    fn set_of_encoding_ignores_input_order(
        (elements, shuffled) in proptest::collection::vec(octet_string(), 0..6)
            .prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle()))
    ) {
        prop_assert_eq!(
            encode_set_of(der::Tag::Set, &elements).unwrap(),
            encode_set_of(der::Tag::Set, &shuffled).unwrap()
        );
    }
}

#[cfg(feature = "pem")]
mod bundles {
    use pkcs7_sign::{
        bundle::{bundle_certificates, bundle_crls, get_certificates},
        Certificate, Crl,
    };
    use proptest::prelude::*;

    const CHAIN_P7C: &[u8] = include_bytes!("examples/pkcs7/chain.p7c");

    fn chain() -> Vec<Certificate> {
        [
            include_str!("examples/pkcs7/root.pem"),
            include_str!("examples/pkcs7/int.pem"),
            include_str!("examples/pkcs7/leaf.pem"),
            include_str!("examples/pkcs7/sign_cert.pem"),
        ]
        .iter()
        .map(|pem| Certificate::from_pem(pem).unwrap())
        .collect()
    }

    fn crls() -> Vec<Crl> {
        [
            include_str!("examples/pkcs7/crl1.pem"),
            include_str!("examples/pkcs7/crl2.pem"),
        ]
        .iter()
        .map(|pem| Crl::from_pem(pem).unwrap())
        .collect()
    }

    proptest! {
        #[test]
        fn certificate_bundle_is_order_independent(certs in Just(chain()[..3].to_vec()).prop_shuffle()) {
            let der = bundle_certificates(&certs).unwrap();
            prop_assert_eq!(der.as_slice(), CHAIN_P7C);

            let (parsed, _) = get_certificates(&der).unwrap();
            prop_assert_eq!(bundle_certificates(&parsed).unwrap(), der);
        }

        #[test]
        fn certificate_subsets_roundtrip(certs in proptest::sample::subsequence(chain(), 0..=4).prop_shuffle()) {
            let der = bundle_certificates(&certs).unwrap();
            let (parsed, rest) = get_certificates(&der).unwrap();
            prop_assert!(rest.is_empty());
            prop_assert_eq!(parsed.len(), certs.len());
            prop_assert!(certs.iter().all(|c| parsed.contains(c)));
        }

        #[test]
        fn crl_bundle_is_order_independent(shuffled in Just(crls()).prop_shuffle()) {
            prop_assert_eq!(bundle_crls(&shuffled).unwrap(), bundle_crls(&crls()).unwrap());
        }
    }
}
