//! `SignerInfo` and `SignerIdentifier`.

use alloc::vec::Vec;
use der::{asn1::OctetStringRef, Decode, Encode, Tag};
use spki::AlgorithmIdentifierOwned;
use x509_cert::{name::Name, serial_number::SerialNumber};

use super::Attributes;
use crate::algorithms::DigestAlgorithm;
use crate::cert::Certificate;
use crate::encoding::{
    self, decode_version, expect_tlv, finish, optional_tlv, split_tlv, Tlv, CONTEXT_0,
    CONTEXT_0_PRIMITIVE, CONTEXT_1,
};
use crate::errors::{Error, Result};

/// ```text
/// SignerIdentifier ::= CHOICE {
///     issuerAndSerialNumber IssuerAndSerialNumber,
///     subjectKeyIdentifier [0] SubjectKeyIdentifier }
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SignerIdentifier {
    /// Issuer name and serial number of the signer certificate (SignerInfo version 1).
    IssuerAndSerialNumber {
        /// Certificate issuer.
        issuer: Name,
        /// Certificate serial number.
        serial_number: SerialNumber,
    },

    /// Subject key identifier extension of the signer certificate (SignerInfo version 3).
    SubjectKeyIdentifier(Vec<u8>),
}

impl SignerIdentifier {
    /// Identify `cert`, by subject key identifier when `by_key_id` is set.
    ///
    /// Fails with [`Error::NoKeyIdentifier`] when a key identifier is
    /// requested but the certificate lacks the extension.
    pub fn from_certificate(cert: &Certificate, by_key_id: bool) -> Result<Self> {
        if by_key_id {
            cert.subject_key_identifier()
                .map(|skid| SignerIdentifier::SubjectKeyIdentifier(skid.to_vec()))
                .ok_or(Error::NoKeyIdentifier)
        } else {
            Ok(SignerIdentifier::IssuerAndSerialNumber {
                issuer: cert.issuer().clone(),
                serial_number: cert.serial_number().clone(),
            })
        }
    }

    /// SignerInfo version implied by this identifier.
    pub fn version(&self) -> u8 {
        match self {
            SignerIdentifier::IssuerAndSerialNumber { .. } => 1,
            SignerIdentifier::SubjectKeyIdentifier(_) => 3,
        }
    }

    /// Does this identifier name `cert`?
    pub fn matches(&self, cert: &Certificate) -> bool {
        match self {
            SignerIdentifier::IssuerAndSerialNumber {
                issuer,
                serial_number,
            } => cert.issuer() == issuer && cert.serial_number() == serial_number,
            SignerIdentifier::SubjectKeyIdentifier(skid) => {
                cert.subject_key_identifier() == Some(skid.as_slice())
            }
        }
    }

    pub(crate) fn to_der(&self) -> Result<Vec<u8>> {
        match self {
            SignerIdentifier::IssuerAndSerialNumber {
                issuer,
                serial_number,
            } => encoding::constructed(Tag::Sequence, &[issuer.to_der()?, serial_number.to_der()?]),
            SignerIdentifier::SubjectKeyIdentifier(skid) => encoding::tlv(CONTEXT_0_PRIMITIVE, skid),
        }
    }

    fn decode(tlv: &Tlv<'_>) -> Result<Self> {
        const CONTEXT: &str = "signer identifier";
        if tlv.tag == Tag::Sequence {
            let (issuer, body) = expect_tlv(tlv.value, Tag::Sequence, CONTEXT)?;
            let (serial, body) = expect_tlv(body, Tag::Integer, CONTEXT)?;
            finish(body, CONTEXT)?;
            Ok(SignerIdentifier::IssuerAndSerialNumber {
                issuer: Name::from_der(issuer.encoded).map_err(|e| Error::malformed(CONTEXT, e))?,
                serial_number: SerialNumber::from_der(serial.encoded)
                    .map_err(|e| Error::malformed(CONTEXT, e))?,
            })
        } else if tlv.tag == CONTEXT_0_PRIMITIVE {
            Ok(SignerIdentifier::SubjectKeyIdentifier(tlv.value.to_vec()))
        } else {
            Err(Error::structure(CONTEXT))
        }
    }
}

/// ```text
/// SignerInfo ::= SEQUENCE {
///     version CMSVersion,
///     sid SignerIdentifier,
///     digestAlgorithm DigestAlgorithmIdentifier,
///     signedAttrs [0] IMPLICIT SignedAttributes OPTIONAL,
///     signatureAlgorithm SignatureAlgorithmIdentifier,
///     signature SignatureValue,
///     unsignedAttrs [1] IMPLICIT UnsignedAttributes OPTIONAL }
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SignerInfo {
    version: u8,
    sid: SignerIdentifier,
    digest_algorithm: AlgorithmIdentifierOwned,
    signed_attrs: Option<Attributes>,
    signature_algorithm: AlgorithmIdentifierOwned,
    signature: Vec<u8>,
    unsigned_attrs: Option<Attributes>,
}

impl SignerInfo {
    pub(crate) fn new(
        sid: SignerIdentifier,
        digest_algorithm: AlgorithmIdentifierOwned,
        signed_attrs: Option<Attributes>,
        signature_algorithm: AlgorithmIdentifierOwned,
        signature: Vec<u8>,
    ) -> Self {
        Self {
            version: sid.version(),
            sid,
            digest_algorithm,
            signed_attrs,
            signature_algorithm,
            signature,
            unsigned_attrs: None,
        }
    }

    /// Syntax version: 1 for issuer and serial number, 3 for subject key identifier.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Signer identifier.
    pub fn sid(&self) -> &SignerIdentifier {
        &self.sid
    }

    /// Digest algorithm identifier as encoded.
    pub fn digest_algorithm(&self) -> &AlgorithmIdentifierOwned {
        &self.digest_algorithm
    }

    /// Digest algorithm, if supported.
    pub fn digest(&self) -> Result<DigestAlgorithm> {
        DigestAlgorithm::try_from(&self.digest_algorithm)
    }

    /// Signed attributes, absent when the signature covers the content digest directly.
    pub fn signed_attrs(&self) -> Option<&Attributes> {
        self.signed_attrs.as_ref()
    }

    /// Signature algorithm identifier.
    pub fn signature_algorithm(&self) -> &AlgorithmIdentifierOwned {
        &self.signature_algorithm
    }

    /// Signature value.
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Unsigned attributes.
    pub fn unsigned_attrs(&self) -> Option<&Attributes> {
        self.unsigned_attrs.as_ref()
    }

    /// DER encoding.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        let mut fields = vec![
            encoding::encode_version(self.version)?,
            self.sid.to_der()?,
            self.digest_algorithm.to_der()?,
        ];
        if let Some(attrs) = &self.signed_attrs {
            fields.push(attrs.to_tagged_der(CONTEXT_0)?);
        }
        fields.push(self.signature_algorithm.to_der()?);
        fields.push(OctetStringRef::new(&self.signature)?.to_der()?);
        if let Some(attrs) = &self.unsigned_attrs {
            fields.push(attrs.to_tagged_der(CONTEXT_1)?);
        }
        encoding::constructed(Tag::Sequence, &fields)
    }

    pub(crate) fn decode(tlv: &Tlv<'_>) -> Result<Self> {
        const CONTEXT: &str = "SignerInfo";
        if tlv.tag != Tag::Sequence {
            return Err(Error::structure(CONTEXT));
        }

        let (version, body) = expect_tlv(tlv.value, Tag::Integer, CONTEXT)?;
        let (sid, body) = split_tlv(body, CONTEXT)?;
        let (digest_algorithm, body) = expect_tlv(body, Tag::Sequence, CONTEXT)?;
        let (signed_attrs, body) = optional_tlv(body, CONTEXT_0, CONTEXT)?;
        let (signature_algorithm, body) = expect_tlv(body, Tag::Sequence, CONTEXT)?;
        let (signature, body) = expect_tlv(body, Tag::OctetString, CONTEXT)?;
        let (unsigned_attrs, body) = optional_tlv(body, CONTEXT_1, CONTEXT)?;
        finish(body, CONTEXT)?;

        Ok(Self {
            version: decode_version(&version, CONTEXT)?,
            sid: SignerIdentifier::decode(&sid)?,
            digest_algorithm: decode_algorithm(&digest_algorithm)?,
            signed_attrs: signed_attrs
                .map(|attrs| Attributes::decode(attrs.value))
                .transpose()?,
            signature_algorithm: decode_algorithm(&signature_algorithm)?,
            signature: signature.value.to_vec(),
            unsigned_attrs: unsigned_attrs
                .map(|attrs| Attributes::decode(attrs.value))
                .transpose()?,
        })
    }
}

pub(crate) fn decode_algorithm(tlv: &Tlv<'_>) -> Result<AlgorithmIdentifierOwned> {
    AlgorithmIdentifierOwned::from_der(tlv.encoded)
        .map_err(|e| Error::malformed("algorithm identifier", e))
}
