//! Certificate and CRL bundles.
//!
//! A bundle is a certificates-only SignedData: no content, no signers, and
//! the certificates (or CRLs) in canonical `SET OF` order. This is what
//! `openssl crl2pkcs7` writes, and bundling is insensitive to input order.
//!
//! Parsing functions read a single `ContentInfo` from the front of their
//! input and hand back whatever follows it.

use alloc::vec::Vec;
use der::Tag;

use crate::ber;
use crate::cert::{Certificate, Crl, RawCertificate};
use crate::encoding::{self, split_elements, CONTEXT_0, ID_DATA};
use crate::errors::{Error, Result};
use crate::signed_data::{EncodedParts, SignedData, SignedDataRef};
use crate::sort::encode_set_of;

/// Bundle certificates into a DER-encoded certificates-only SignedData.
pub fn bundle_certificates(certificates: &[Certificate]) -> Result<Vec<u8>> {
    log::debug!("bundling {} certificates", certificates.len());
    SignedData::degenerate(Some(certificates.to_vec()), None).to_der()
}

/// Extract the certificates of the SignedData at the front of `input`.
///
/// An absent certificate field yields an empty vector.
pub fn get_certificates(input: &[u8]) -> Result<(Vec<Certificate>, &[u8])> {
    let (signed_data, rest) = SignedData::decode_prefix(input)?;
    let certificates = signed_data.certificates().unwrap_or_default().to_vec();
    Ok((certificates, rest))
}

/// Bundle opaque certificate buffers without decoding them.
///
/// Produces the same bytes as [`bundle_certificates`] over the same
/// certificates.
pub fn bundle_raw_certificates(certificates: &[RawCertificate]) -> Result<Vec<u8>> {
    log::debug!("bundling {} raw certificates", certificates.len());
    let fields = vec![
        encoding::encode_version(1)?,
        encoding::tlv(Tag::Set, &[])?,
        encoding::constructed(Tag::Sequence, &[encoding::oid_tlv(&ID_DATA)?])?,
        encode_set_of(CONTEXT_0, certificates)?,
        encoding::tlv(Tag::Set, &[])?,
    ];
    Ok(EncodedParts::wrap(fields)?.concat())
}

/// Extract certificate buffers without decoding the certificates.
///
/// Every element must still be a single well-formed DER `SEQUENCE`.
pub fn get_raw_certificates(input: &[u8]) -> Result<(Vec<RawCertificate>, &[u8])> {
    let (der, rest) = ber::normalize(input)?;
    let raw = SignedDataRef::parse(&der)?;
    let certificates = match raw.certificates {
        Some(set) => split_elements(set, "certificates")?
            .iter()
            .map(|tlv| {
                if tlv.tag == Tag::Sequence {
                    RawCertificate::from_der(tlv.encoded)
                } else {
                    Err(Error::structure("certificate"))
                }
            })
            .collect::<Result<Vec<_>>>()?,
        None => Vec::new(),
    };
    Ok((certificates, rest))
}

/// Bundle CRLs into a DER-encoded certificates-only SignedData.
pub fn bundle_crls(crls: &[Crl]) -> Result<Vec<u8>> {
    log::debug!("bundling {} CRLs", crls.len());
    SignedData::degenerate(None, Some(crls.to_vec())).to_der()
}

/// Extract the CRLs of the SignedData at the front of `input`.
///
/// An absent CRL field yields an empty vector.
pub fn get_crls(input: &[u8]) -> Result<(Vec<Crl>, &[u8])> {
    let (signed_data, rest) = SignedData::decode_prefix(input)?;
    let crls = signed_data.crls().unwrap_or_default().to_vec();
    Ok((crls, rest))
}

/// Extract certificates from a PEM-encoded bundle (`-----BEGIN PKCS7-----`).
#[cfg(feature = "pem")]
pub fn get_pem_certificates(pem: &str) -> Result<Vec<Certificate>> {
    let der = crate::cert::decode_pem(pem, crate::signed_data::PKCS7_LABEL)?;
    let (certificates, rest) = get_certificates(&der)?;
    encoding::finish(rest, "PKCS7 PEM")?;
    Ok(certificates)
}

/// Extract CRLs from a PEM-encoded bundle (`-----BEGIN PKCS7-----`).
#[cfg(feature = "pem")]
pub fn get_pem_crls(pem: &str) -> Result<Vec<Crl>> {
    let der = crate::cert::decode_pem(pem, crate::signed_data::PKCS7_LABEL)?;
    let (crls, rest) = get_crls(&der)?;
    encoding::finish(rest, "PKCS7 PEM")?;
    Ok(crls)
}
