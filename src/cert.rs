//! DER-backed certificate and CRL handles.
//!
//! Each handle keeps the exact bytes it was parsed from next to the decoded
//! [`x509_cert`] structure, so bundling never re-encodes a certificate and
//! equality is byte equality. Clones share one allocation.

use alloc::{sync::Arc, vec::Vec};
use const_oid::AssociatedOid;
use der::{Decode, Encode};
use rsa::RsaPublicKey;
use x509_cert::{
    crl::CertificateList, ext::pkix::SubjectKeyIdentifier, name::Name,
    serial_number::SerialNumber,
};

use crate::encoding::split_tlv;
use crate::errors::{Error, Result};

#[cfg(feature = "pem")]
const CERTIFICATE_LABEL: &str = "CERTIFICATE";
#[cfg(feature = "pem")]
const CRL_LABEL: &str = "X509 CRL";

/// X.509 certificate.
#[derive(Clone, Debug)]
pub struct Certificate {
    inner: Arc<CertificateInner>,
}

#[derive(Debug)]
struct CertificateInner {
    der: Vec<u8>,
    decoded: x509_cert::Certificate,
    subject_key_id: Option<Vec<u8>>,
}

impl Certificate {
    /// Parse a DER-encoded certificate.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let decoded =
            x509_cert::Certificate::from_der(der).map_err(|e| Error::malformed("certificate", e))?;
        let subject_key_id = subject_key_id(&decoded)?;

        Ok(Self {
            inner: Arc::new(CertificateInner {
                der: der.to_vec(),
                decoded,
                subject_key_id,
            }),
        })
    }

    /// Parse a PEM-encoded certificate (`-----BEGIN CERTIFICATE-----`).
    #[cfg(feature = "pem")]
    pub fn from_pem(pem: &str) -> Result<Self> {
        Self::from_der(&decode_pem(pem, CERTIFICATE_LABEL)?)
    }

    /// DER encoding exactly as parsed.
    pub fn as_der(&self) -> &[u8] {
        &self.inner.der
    }

    /// Decoded certificate.
    pub fn certificate(&self) -> &x509_cert::Certificate {
        &self.inner.decoded
    }

    /// Issuer name.
    pub fn issuer(&self) -> &Name {
        &self.inner.decoded.tbs_certificate.issuer
    }

    /// Subject name.
    pub fn subject(&self) -> &Name {
        &self.inner.decoded.tbs_certificate.subject
    }

    /// Serial number.
    pub fn serial_number(&self) -> &SerialNumber {
        &self.inner.decoded.tbs_certificate.serial_number
    }

    /// Contents of the subject key identifier extension, if present.
    pub fn subject_key_identifier(&self) -> Option<&[u8]> {
        self.inner.subject_key_id.as_deref()
    }

    /// DER-encoded `SubjectPublicKeyInfo`.
    pub fn public_key_der(&self) -> Result<Vec<u8>> {
        Ok(self
            .inner
            .decoded
            .tbs_certificate
            .subject_public_key_info
            .to_der()?)
    }

    /// RSA public key of the subject.
    pub fn rsa_public_key(&self) -> Result<RsaPublicKey> {
        use pkcs8::DecodePublicKey;
        Ok(RsaPublicKey::from_public_key_der(&self.public_key_der()?)?)
    }
}

impl AsRef<[u8]> for Certificate {
    fn as_ref(&self) -> &[u8] {
        self.as_der()
    }
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.as_der() == other.as_der()
    }
}

impl Eq for Certificate {}

fn subject_key_id(cert: &x509_cert::Certificate) -> Result<Option<Vec<u8>>> {
    let Some(extensions) = &cert.tbs_certificate.extensions else {
        return Ok(None);
    };

    match extensions
        .iter()
        .find(|ext| ext.extn_id == SubjectKeyIdentifier::OID)
    {
        Some(ext) => {
            let skid = SubjectKeyIdentifier::from_der(ext.extn_value.as_bytes())
                .map_err(|e| Error::malformed("subject key identifier", e))?;
            Ok(Some(skid.0.as_bytes().to_vec()))
        }
        None => Ok(None),
    }
}

/// X.509 certificate revocation list.
#[derive(Clone, Debug)]
pub struct Crl {
    inner: Arc<CrlInner>,
}

#[derive(Debug)]
struct CrlInner {
    der: Vec<u8>,
    decoded: CertificateList,
}

impl Crl {
    /// Parse a DER-encoded CRL.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let decoded = CertificateList::from_der(der).map_err(|e| Error::malformed("CRL", e))?;
        Ok(Self {
            inner: Arc::new(CrlInner {
                der: der.to_vec(),
                decoded,
            }),
        })
    }

    /// Parse a PEM-encoded CRL (`-----BEGIN X509 CRL-----`).
    #[cfg(feature = "pem")]
    pub fn from_pem(pem: &str) -> Result<Self> {
        Self::from_der(&decode_pem(pem, CRL_LABEL)?)
    }

    /// DER encoding exactly as parsed.
    pub fn as_der(&self) -> &[u8] {
        &self.inner.der
    }

    /// Decoded CRL.
    pub fn crl(&self) -> &CertificateList {
        &self.inner.decoded
    }

    /// Issuer name.
    pub fn issuer(&self) -> &Name {
        &self.inner.decoded.tbs_cert_list.issuer
    }
}

impl AsRef<[u8]> for Crl {
    fn as_ref(&self) -> &[u8] {
        self.as_der()
    }
}

impl PartialEq for Crl {
    fn eq(&self, other: &Self) -> bool {
        self.as_der() == other.as_der()
    }
}

impl Eq for Crl {}

/// Certificate carried as an opaque DER buffer.
///
/// Only the outer `SEQUENCE` framing is checked; nothing inside is decoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawCertificate(Arc<[u8]>);

impl RawCertificate {
    /// Wrap a buffer holding exactly one DER `SEQUENCE`.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let (tlv, rest) = split_tlv(der, "certificate")?;
        if tlv.tag != der::Tag::Sequence || !rest.is_empty() {
            return Err(Error::structure("certificate"));
        }
        Ok(Self(Arc::from(der)))
    }

    /// DER encoding.
    pub fn as_der(&self) -> &[u8] {
        &self.0
    }

    /// Decode the certificate fields.
    pub fn decode(&self) -> Result<Certificate> {
        Certificate::from_der(&self.0)
    }
}

impl AsRef<[u8]> for RawCertificate {
    fn as_ref(&self) -> &[u8] {
        self.as_der()
    }
}

impl From<&Certificate> for RawCertificate {
    fn from(cert: &Certificate) -> Self {
        Self(Arc::from(cert.as_der()))
    }
}

#[cfg(feature = "pem")]
pub(crate) fn decode_pem(pem: &str, label: &'static str) -> Result<Vec<u8>> {
    let (found, der) = pem_rfc7468::decode_vec(pem.as_bytes())?;
    if found != label {
        return Err(pem_rfc7468::Error::UnexpectedTypeLabel { expected: label }.into());
    }
    Ok(der)
}
