//! SignerInfo construction.

use alloc::vec::Vec;
use const_oid::ObjectIdentifier;
use der::{
    asn1::{GeneralizedTime, OctetString, UtcTime},
    Any, DateTime, Decode, Encode, Tag,
};
use spki::AlgorithmIdentifierOwned;

use crate::algorithms::DigestAlgorithm;
use crate::cert::Certificate;
use crate::encoding::{
    self, ID_AES128_CBC, ID_AES192_CBC, ID_AES256_CBC, ID_CONTENT_TYPE, ID_DES_CBC,
    ID_DES_EDE3_CBC, ID_MESSAGE_DIGEST, ID_RC2_CBC, ID_SIGNING_TIME, ID_SMIME_CAPABILITIES,
};
use crate::errors::{Error, Result};
use crate::flags::{Flag, Flags};
use crate::signed_data::{Attribute, Attributes, SignerIdentifier, SignerInfo};
use crate::traits::SigningKey;

/// Capabilities advertised in the `smimeCapabilities` attribute, strongest
/// first, with the RC2 effective key size where one applies.
const SMIME_CAPABILITIES: [(ObjectIdentifier, Option<u8>); 8] = [
    (ID_AES256_CBC, None),
    (ID_AES192_CBC, None),
    (ID_AES128_CBC, None),
    (ID_DES_EDE3_CBC, None),
    (ID_RC2_CBC, Some(128)),
    (ID_RC2_CBC, Some(64)),
    (ID_DES_CBC, None),
    (ID_RC2_CBC, Some(40)),
];

/// Inputs shared by every signer of one SignedData.
#[derive(Clone, Copy, Debug)]
pub struct SigningContext<'a> {
    /// Type of the content being signed.
    pub content_type: ObjectIdentifier,
    /// Content digest under the signer's digest algorithm.
    pub message_digest: &'a [u8],
    /// Value for the `signingTime` attribute, if one should be emitted.
    pub signing_time: Option<DateTime>,
}

/// Builds a single [`SignerInfo`].
///
/// Checks that can fail without the content run in [`SignerInfoBuilder::new`],
/// so a builder that exists is known to be usable; the signature itself is
/// computed by [`SignerInfoBuilder::build`] once the content digest is known.
///
/// The relevant options are:
///
/// - [`Flag::NoCerts`]: leave the signer certificate out of the certificate set
/// - [`Flag::NoAttributes`]: sign the content digest without signed attributes
/// - [`Flag::UseKeyId`]: identify the signer by subject key identifier
/// - [`Flag::NoSmimeCap`]: omit the `smimeCapabilities` attribute
pub struct SignerInfoBuilder<'k> {
    certificate: Certificate,
    key: &'k dyn SigningKey,
    digest: DigestAlgorithm,
    sid: SignerIdentifier,
    signature_algorithm: AlgorithmIdentifierOwned,
    flags: Flags,
}

impl<'k> SignerInfoBuilder<'k> {
    /// Prepare a signer.
    ///
    /// Fails with [`Error::NoKeyIdentifier`] when [`Flag::UseKeyId`] is set
    /// and `certificate` has no subject key identifier, and with
    /// [`Error::KeyMismatch`] when `key` does not belong to `certificate`.
    pub fn new(
        certificate: &Certificate,
        key: &'k dyn SigningKey,
        digest: DigestAlgorithm,
        flags: impl Into<Flags>,
    ) -> Result<Self> {
        let flags = flags.into();
        let sid = SignerIdentifier::from_certificate(certificate, flags.contains(Flag::UseKeyId))?;

        if key.public_key_der()? != certificate.public_key_der()? {
            return Err(Error::KeyMismatch);
        }
        let signature_algorithm = key.signature_algorithm(digest)?;

        Ok(Self {
            certificate: certificate.clone(),
            key,
            digest,
            sid,
            signature_algorithm,
            flags,
        })
    }

    /// Signer certificate.
    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    /// Digest algorithm.
    pub fn digest_algorithm(&self) -> DigestAlgorithm {
        self.digest
    }

    /// Signer identifier that will be emitted.
    pub fn signer_identifier(&self) -> &SignerIdentifier {
        &self.sid
    }

    /// SignerInfo version that will be emitted.
    pub fn version(&self) -> u8 {
        self.sid.version()
    }

    /// Signer options.
    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// Should the signer certificate join the certificate set?
    pub fn includes_certificate(&self) -> bool {
        !self.flags.contains(Flag::NoCerts)
    }

    /// Signed attributes for `ctx`, or `None` when they are omitted.
    pub fn signed_attributes(&self, ctx: &SigningContext<'_>) -> Result<Option<Attributes>> {
        if self.flags.contains(Flag::NoAttributes) {
            return Ok(None);
        }

        let mut attributes = vec![content_type_attribute(ctx.content_type)?];
        if let Some(time) = ctx.signing_time {
            attributes.push(signing_time_attribute(time)?);
        }
        attributes.push(message_digest_attribute(ctx.message_digest)?);
        if !self.flags.contains(Flag::NoSmimeCap) {
            attributes.push(smime_capabilities_attribute()?);
        }

        Attributes::new(attributes).map(Some)
    }

    /// Compute the signature and produce the SignerInfo.
    pub fn build(&self, ctx: &SigningContext<'_>) -> Result<SignerInfo> {
        if ctx.message_digest.len() != self.digest.output_size() {
            return Err(Error::structure("message digest"));
        }

        let signed_attrs = self.signed_attributes(ctx)?;
        let signature = match &signed_attrs {
            Some(attrs) => {
                let hashed = self.digest.digest(&attrs.to_set_der()?);
                self.key.sign_digest(self.digest, &hashed)?
            }
            None => self.key.sign_digest(self.digest, ctx.message_digest)?,
        };

        log::debug!(
            "signed with {:?}, SignerInfo version {}, {} signed attributes",
            self.digest,
            self.version(),
            signed_attrs.as_ref().map_or(0, Attributes::len)
        );

        Ok(SignerInfo::new(
            self.sid.clone(),
            self.digest.algorithm_identifier(),
            signed_attrs,
            self.signature_algorithm.clone(),
            signature,
        ))
    }
}

impl core::fmt::Debug for SignerInfoBuilder<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SignerInfoBuilder")
            .field("sid", &self.sid)
            .field("digest", &self.digest)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

fn content_type_attribute(content_type: ObjectIdentifier) -> Result<Attribute> {
    let value = Any::new(Tag::ObjectIdentifier, content_type.as_bytes())?;
    Ok(Attribute::new(ID_CONTENT_TYPE, vec![value]))
}

fn message_digest_attribute(message_digest: &[u8]) -> Result<Attribute> {
    let value = Any::from_der(&OctetString::new(message_digest)?.to_der()?)?;
    Ok(Attribute::new(ID_MESSAGE_DIGEST, vec![value]))
}

/// Dates between 1950 and 2049 inclusive are encoded as `UTCTime`, others as
/// `GeneralizedTime` (RFC 5652 § 11.3).
fn signing_time_attribute(time: DateTime) -> Result<Attribute> {
    let der = if (1950..2050).contains(&time.year()) {
        UtcTime::from_date_time(time)?.to_der()?
    } else {
        GeneralizedTime::from_date_time(time).to_der()?
    };
    Ok(Attribute::new(ID_SIGNING_TIME, vec![Any::from_der(&der)?]))
}

fn smime_capabilities_attribute() -> Result<Attribute> {
    let capabilities = SMIME_CAPABILITIES
        .iter()
        .map(|(oid, key_bits)| {
            let mut fields = vec![encoding::oid_tlv(oid)?];
            if let Some(bits) = key_bits {
                fields.push(bits.to_der()?);
            }
            encoding::constructed(Tag::Sequence, &fields)
        })
        .collect::<Result<Vec<_>>>()?;

    let value = Any::from_der(&encoding::constructed(Tag::Sequence, &capabilities)?)?;
    Ok(Attribute::new(ID_SMIME_CAPABILITIES, vec![value]))
}
