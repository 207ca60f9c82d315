//! PKCS#7 / CMS SignedData as described in [RFC 5652 § 5].
//!
//! ```text
//! ContentInfo ::= SEQUENCE {
//!     contentType ContentType,
//!     content [0] EXPLICIT ANY DEFINED BY contentType }
//!
//! SignedData ::= SEQUENCE {
//!     version CMSVersion,
//!     digestAlgorithms SET OF DigestAlgorithmIdentifier,
//!     encapContentInfo EncapsulatedContentInfo,
//!     certificates [0] IMPLICIT CertificateSet OPTIONAL,
//!     crls [1] IMPLICIT RevocationInfoChoices OPTIONAL,
//!     signerInfos SET OF SignerInfo }
//!
//! EncapsulatedContentInfo ::= SEQUENCE {
//!     eContentType ContentType,
//!     eContent [0] EXPLICIT OCTET STRING OPTIONAL }
//! ```
//!
//! Parsing keeps every `SET OF` in wire order. Encoding always emits them in
//! canonical DER order, so a parsed structure serializes canonically even
//! when its input did not.
//!
//! [RFC 5652 § 5]: https://datatracker.ietf.org/doc/html/rfc5652#section-5

mod attributes;
mod signer_info;

pub use self::{
    attributes::{Attribute, Attributes},
    signer_info::{SignerIdentifier, SignerInfo},
};

use alloc::vec::Vec;
use const_oid::ObjectIdentifier;
use der::{Any, Decode, Encode, Tag, Tagged};
use spki::AlgorithmIdentifierOwned;

use crate::ber;
use crate::cert::{Certificate, Crl};
use crate::encoding::{
    self, decode_oid, decode_version, expect_tlv, finish, optional_tlv, split_elements, split_tlv,
    Tlv, CONTEXT_0, CONTEXT_1, ID_DATA, ID_SIGNED_DATA,
};
use crate::errors::{Error, Result};
use crate::sort::encode_set_of;
use crate::traits::VerifyingKey;

use self::signer_info::decode_algorithm;

#[cfg(feature = "pem")]
pub(crate) const PKCS7_LABEL: &str = "PKCS7";

/// Signed-data content wrapped in its `ContentInfo`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SignedData {
    version: u8,
    digest_algorithms: Vec<AlgorithmIdentifierOwned>,
    content_type: ObjectIdentifier,
    content: Option<Any>,
    certificates: Option<Vec<Certificate>>,
    crls: Option<Vec<Crl>>,
    signer_infos: Vec<SignerInfo>,
}

impl SignedData {
    /// Assemble a new structure, computing its syntax version.
    pub(crate) fn assemble(
        digest_algorithms: Vec<AlgorithmIdentifierOwned>,
        content_type: ObjectIdentifier,
        content: Option<Any>,
        certificates: Option<Vec<Certificate>>,
        crls: Option<Vec<Crl>>,
        signer_infos: Vec<SignerInfo>,
    ) -> Self {
        // RFC 5652 § 5.1, restricted to the choices this crate emits.
        let version = if content_type != ID_DATA || signer_infos.iter().any(|si| si.version() == 3)
        {
            3
        } else {
            1
        };

        Self {
            version,
            digest_algorithms,
            content_type,
            content,
            certificates,
            crls,
            signer_infos,
        }
    }

    /// Certificates-only ("degenerate") structure with no content and no signers.
    pub(crate) fn degenerate(certificates: Option<Vec<Certificate>>, crls: Option<Vec<Crl>>) -> Self {
        Self::assemble(Vec::new(), ID_DATA, None, certificates, crls, Vec::new())
    }

    /// Parse a DER-encoded `ContentInfo` holding signed-data.
    ///
    /// The whole input must be consumed.
    pub fn from_der(input: &[u8]) -> Result<Self> {
        let (signed_data, rest) = Self::decode_prefix(input)?;
        finish(rest, "ContentInfo")?;
        Ok(signed_data)
    }

    /// Parse one `ContentInfo` from the front of `input`, returning the
    /// bytes that follow it.
    ///
    /// BER input, as exported by NSS and Windows, is accepted and normalized
    /// to DER first.
    pub fn decode_prefix(input: &[u8]) -> Result<(Self, &[u8])> {
        let (der, rest) = ber::normalize(input)?;
        let raw = SignedDataRef::parse(&der)?;

        let digest_algorithms = split_elements(raw.digest_algorithms, "digestAlgorithms")?
            .iter()
            .map(decode_algorithm)
            .collect::<Result<Vec<_>>>()?;

        let certificates = raw
            .certificates
            .map(|set| {
                split_elements(set, "certificates")?
                    .iter()
                    .map(|tlv| Certificate::from_der(tlv.encoded))
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()?;

        let crls = raw
            .crls
            .map(|set| {
                split_elements(set, "crls")?
                    .iter()
                    .map(|tlv| Crl::from_der(tlv.encoded))
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()?;

        let signer_infos = split_elements(raw.signer_infos, "signerInfos")?
            .iter()
            .map(SignerInfo::decode)
            .collect::<Result<Vec<_>>>()?;

        let content = raw
            .content
            .map(|tlv| Any::from_der(tlv.encoded).map_err(|e| Error::malformed("eContent", e)))
            .transpose()?;

        log::debug!(
            "parsed SignedData: {} certificates, {} CRLs, {} signers",
            certificates.as_ref().map_or(0, Vec::len),
            crls.as_ref().map_or(0, Vec::len),
            signer_infos.len()
        );

        Ok((
            Self {
                version: decode_version(&raw.version, "SignedData version")?,
                digest_algorithms,
                content_type: raw.content_type,
                content,
                certificates,
                crls,
                signer_infos,
            },
            rest,
        ))
    }

    /// Parse a PEM-encoded structure (`-----BEGIN PKCS7-----`).
    #[cfg(feature = "pem")]
    pub fn from_pem(pem: &str) -> Result<Self> {
        Self::from_der(&crate::cert::decode_pem(pem, PKCS7_LABEL)?)
    }

    /// Syntax version.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Digest algorithms in wire order.
    pub fn digest_algorithms(&self) -> &[AlgorithmIdentifierOwned] {
        &self.digest_algorithms
    }

    /// Type of the encapsulated content.
    pub fn content_type(&self) -> ObjectIdentifier {
        self.content_type
    }

    /// Embedded content as encoded inside `eContent`.
    pub fn econtent(&self) -> Option<&Any> {
        self.content.as_ref()
    }

    /// Embedded content octets; `None` when detached.
    pub fn content(&self) -> Option<&[u8]> {
        self.content
            .as_ref()
            .filter(|any| any.tag() == Tag::OctetString)
            .map(Any::value)
    }

    /// Is the content detached?
    pub fn is_detached(&self) -> bool {
        self.content.is_none()
    }

    /// Certificate set; `None` when the field is absent.
    pub fn certificates(&self) -> Option<&[Certificate]> {
        self.certificates.as_deref()
    }

    /// CRL set; `None` when the field is absent.
    pub fn crls(&self) -> Option<&[Crl]> {
        self.crls.as_deref()
    }

    /// Signer records in wire order.
    pub fn signer_infos(&self) -> &[SignerInfo] {
        &self.signer_infos
    }

    /// Embedded certificate identified by `signer`, if any.
    pub fn signer_certificate(&self, signer: &SignerInfo) -> Option<&Certificate> {
        self.certificates()?
            .iter()
            .find(|cert| signer.sid().matches(cert))
    }

    /// Check one signer's signature.
    ///
    /// The content is taken from `detached` when given and from `eContent`
    /// otherwise. Signed attributes, when present, must carry the
    /// encapsulated content type and the content's digest; the signature
    /// then covers the attributes.
    pub fn verify_signer(
        &self,
        signer: &SignerInfo,
        key: &dyn VerifyingKey,
        detached: Option<&[u8]>,
    ) -> Result<()> {
        let content = detached
            .or_else(|| self.content())
            .ok_or(Error::MissingContent)?;
        let digest = signer.digest()?;
        let message_digest = digest.digest(content);

        match signer.signed_attrs() {
            Some(attrs) => {
                // RFC 5652 § 5.3
                if attrs.content_type() != Some(self.content_type) {
                    return Err(Error::ContentTypeMismatch);
                }
                if attrs.message_digest() != Some(message_digest.as_slice()) {
                    return Err(Error::DigestMismatch);
                }
                let hashed = digest.digest(&attrs.to_set_der()?);
                key.verify_digest(digest, &hashed, signer.signature())
            }
            None => key.verify_digest(digest, &message_digest, signer.signature()),
        }
    }

    /// DER encoding of the full `ContentInfo`.
    ///
    /// The output is identical on every call.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        Ok(self.encode_parts()?.concat())
    }

    /// PEM encoding (`-----BEGIN PKCS7-----`).
    #[cfg(feature = "pem")]
    pub fn to_pem(&self, line_ending: pem_rfc7468::LineEnding) -> Result<alloc::string::String> {
        Ok(pem_rfc7468::encode_string(
            PKCS7_LABEL,
            line_ending,
            &self.to_der()?,
        )?)
    }

    /// Encode the structure as its outer headers followed by one chunk per
    /// SignedData field.
    pub(crate) fn encode_parts(&self) -> Result<EncodedParts> {
        let digest_algorithms = self
            .digest_algorithms
            .iter()
            .map(Encode::to_der)
            .collect::<der::Result<Vec<_>>>()?;

        let mut encap = vec![encoding::oid_tlv(&self.content_type)?];
        if let Some(content) = &self.content {
            encap.push(encoding::tlv(CONTEXT_0, &content.to_der()?)?);
        }

        let mut fields = vec![
            encoding::encode_version(self.version)?,
            encode_set_of(Tag::Set, &digest_algorithms)?,
            encoding::constructed(Tag::Sequence, &encap)?,
        ];
        if let Some(certificates) = &self.certificates {
            fields.push(encode_set_of(CONTEXT_0, certificates)?);
        }
        if let Some(crls) = &self.crls {
            fields.push(encode_set_of(CONTEXT_1, crls)?);
        }

        let signer_infos = self
            .signer_infos
            .iter()
            .map(SignerInfo::to_der)
            .collect::<Result<Vec<_>>>()?;
        fields.push(encode_set_of(Tag::Set, &signer_infos)?);

        EncodedParts::wrap(fields)
    }
}

/// DER chunks of one `ContentInfo`: the outer headers, then each SignedData
/// field in order.
pub(crate) struct EncodedParts {
    pub(crate) header: Vec<u8>,
    pub(crate) fields: Vec<Vec<u8>>,
}

impl EncodedParts {
    /// Prefix the SignedData `fields` with the `ContentInfo`, `[0]` and
    /// `SEQUENCE` headers that frame them.
    pub(crate) fn wrap(fields: Vec<Vec<u8>>) -> Result<Self> {
        let body_len: usize = fields.iter().map(Vec::len).sum();
        let sequence = encoding::header(Tag::Sequence, body_len)?;
        let explicit_len = sequence.len() + body_len;
        let explicit = encoding::header(CONTEXT_0, explicit_len)?;
        let content_type = encoding::oid_tlv(&ID_SIGNED_DATA)?;

        let mut header = encoding::header(
            Tag::Sequence,
            content_type.len() + explicit.len() + explicit_len,
        )?;
        header.extend_from_slice(&content_type);
        header.extend_from_slice(&explicit);
        header.extend_from_slice(&sequence);

        Ok(Self { header, fields })
    }

    pub(crate) fn concat(&self) -> Vec<u8> {
        let mut out = self.header.clone();
        for field in &self.fields {
            out.extend_from_slice(field);
        }
        out
    }
}

/// SignedData split into borrowed fields, nothing below them decoded.
pub(crate) struct SignedDataRef<'a> {
    pub(crate) version: Tlv<'a>,
    pub(crate) digest_algorithms: &'a [u8],
    pub(crate) content_type: ObjectIdentifier,
    pub(crate) content: Option<Tlv<'a>>,
    pub(crate) certificates: Option<&'a [u8]>,
    pub(crate) crls: Option<&'a [u8]>,
    pub(crate) signer_infos: &'a [u8],
}

impl<'a> SignedDataRef<'a> {
    /// Split a DER `ContentInfo` which spans all of `input`.
    pub(crate) fn parse(input: &'a [u8]) -> Result<Self> {
        let (content_info, rest) = expect_tlv(input, Tag::Sequence, "ContentInfo")?;
        finish(rest, "ContentInfo")?;
        let (oid, body) = expect_tlv(content_info.value, Tag::ObjectIdentifier, "ContentInfo")?;
        let content_type = decode_oid(&oid, "ContentInfo")?;
        if content_type != ID_SIGNED_DATA {
            return Err(Error::UnsupportedContentType(content_type));
        }
        let (explicit, body) = expect_tlv(body, CONTEXT_0, "ContentInfo")?;
        finish(body, "ContentInfo")?;

        let (signed_data, body) = expect_tlv(explicit.value, Tag::Sequence, "SignedData")?;
        finish(body, "SignedData")?;

        let (version, body) = expect_tlv(signed_data.value, Tag::Integer, "SignedData")?;
        let (digest_algorithms, body) = expect_tlv(body, Tag::Set, "digestAlgorithms")?;
        let (encap, body) = expect_tlv(body, Tag::Sequence, "encapContentInfo")?;
        let (certificates, body) = optional_tlv(body, CONTEXT_0, "certificates")?;
        let (crls, body) = optional_tlv(body, CONTEXT_1, "crls")?;
        let (signer_infos, body) = expect_tlv(body, Tag::Set, "signerInfos")?;
        finish(body, "SignedData")?;

        let (econtent_type, encap_body) =
            expect_tlv(encap.value, Tag::ObjectIdentifier, "encapContentInfo")?;
        let (explicit_content, encap_body) = optional_tlv(encap_body, CONTEXT_0, "encapContentInfo")?;
        finish(encap_body, "encapContentInfo")?;

        let content = match explicit_content {
            Some(explicit) => {
                let (content, trailing) = split_tlv(explicit.value, "eContent")?;
                finish(trailing, "eContent")?;
                Some(content)
            }
            None => None,
        };

        Ok(Self {
            version,
            digest_algorithms: digest_algorithms.value,
            content_type: decode_oid(&econtent_type, "encapContentInfo")?,
            content,
            certificates: certificates.map(|set| set.value),
            crls: crls.map(|set| set.value),
            signer_infos: signer_infos.value,
        })
    }
}
