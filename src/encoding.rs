//! DER plumbing shared by the parser and the encoders.
//!
//! SignedData is handled at the TLV level: elements the signature covers
//! (signed attributes, certificates) must survive a parse/serialize cycle
//! byte for byte, so they are carried around as encoded slices rather than
//! re-encoded from a decoded model.

use alloc::vec::Vec;
use const_oid::ObjectIdentifier;
use der::{AnyRef, Decode, Encode, Header, Reader, SliceReader, Tag, TagNumber, Tagged};

use crate::errors::{Error, Result};

/// `id-signedData`
pub const ID_SIGNED_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.2");
/// `id-data`
pub const ID_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.1");
/// `rsaEncryption`
pub const RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
/// `id-contentType` attribute
pub const ID_CONTENT_TYPE: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.3");
/// `id-messageDigest` attribute
pub const ID_MESSAGE_DIGEST: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.4");
/// `id-signingTime` attribute
pub const ID_SIGNING_TIME: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.5");
/// `smimeCapabilities` attribute
pub const ID_SMIME_CAPABILITIES: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.15");

pub(crate) const ID_AES256_CBC: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.1.42");
pub(crate) const ID_AES192_CBC: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.1.22");
pub(crate) const ID_AES128_CBC: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.1.2");
pub(crate) const ID_DES_EDE3_CBC: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.3.7");
pub(crate) const ID_RC2_CBC: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.3.2");
pub(crate) const ID_DES_CBC: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.14.3.2.7");

/// `[0]` constructed, used for explicit content, certificates and signed attributes.
pub(crate) const CONTEXT_0: Tag = Tag::ContextSpecific {
    constructed: true,
    number: TagNumber::N0,
};

/// `[1]` constructed, used for CRLs and unsigned attributes.
pub(crate) const CONTEXT_1: Tag = Tag::ContextSpecific {
    constructed: true,
    number: TagNumber::N1,
};

/// `[0]` primitive, the subject key identifier choice of `SignerIdentifier`.
pub(crate) const CONTEXT_0_PRIMITIVE: Tag = Tag::ContextSpecific {
    constructed: false,
    number: TagNumber::N0,
};

/// One tag-length-value element borrowed from an input buffer.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Tlv<'a> {
    pub(crate) tag: Tag,
    /// Complete encoding, header included.
    pub(crate) encoded: &'a [u8],
    /// Contents octets only.
    pub(crate) value: &'a [u8],
}

/// Split the first element off `input`, returning it along with whatever follows.
pub(crate) fn split_tlv<'a>(input: &'a [u8], context: &'static str) -> Result<(Tlv<'a>, &'a [u8])> {
    let mut reader = SliceReader::new(input).map_err(|e| Error::malformed(context, e))?;
    let any = AnyRef::decode(&mut reader).map_err(|e| Error::malformed(context, e))?;
    let consumed = usize::try_from(reader.position()).map_err(|e| Error::malformed(context, e))?;
    let (encoded, rest) = input.split_at(consumed);

    Ok((
        Tlv {
            tag: any.tag(),
            encoded,
            value: any.value(),
        },
        rest,
    ))
}

/// Like [`split_tlv`], but the element must carry `tag`.
pub(crate) fn expect_tlv<'a>(
    input: &'a [u8],
    tag: Tag,
    context: &'static str,
) -> Result<(Tlv<'a>, &'a [u8])> {
    let (tlv, rest) = split_tlv(input, context)?;
    if tlv.tag != tag {
        return Err(Error::structure(context));
    }
    Ok((tlv, rest))
}

/// Split the first element off `input` only if it carries `tag`.
pub(crate) fn optional_tlv<'a>(
    input: &'a [u8],
    tag: Tag,
    context: &'static str,
) -> Result<(Option<Tlv<'a>>, &'a [u8])> {
    let reader = SliceReader::new(input).map_err(|e| Error::malformed(context, e))?;
    if reader.is_finished() || reader.peek_tag().map_err(|e| Error::malformed(context, e))? != tag {
        return Ok((None, input));
    }
    let (tlv, rest) = split_tlv(input, context)?;
    Ok((Some(tlv), rest))
}

/// Split the contents of a constructed element into its members.
pub(crate) fn split_elements<'a>(mut input: &'a [u8], context: &'static str) -> Result<Vec<Tlv<'a>>> {
    let mut elements = Vec::new();
    while !input.is_empty() {
        let (tlv, rest) = split_tlv(input, context)?;
        elements.push(tlv);
        input = rest;
    }
    Ok(elements)
}

/// Encode a header for `len` contents octets.
pub(crate) fn header(tag: Tag, len: usize) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    Header::new(tag, len)?.encode_to_vec(&mut out)?;
    Ok(out)
}

/// Encode `tag || len || value`.
pub(crate) fn tlv(tag: Tag, value: &[u8]) -> Result<Vec<u8>> {
    let mut out = header(tag, value.len())?;
    out.extend_from_slice(value);
    Ok(out)
}

/// Encode a constructed element whose contents are the concatenation of `parts`.
pub(crate) fn constructed<T: AsRef<[u8]>>(tag: Tag, parts: &[T]) -> Result<Vec<u8>> {
    let len = parts.iter().map(|p| p.as_ref().len()).sum();
    let mut out = header(tag, len)?;
    for part in parts {
        out.extend_from_slice(part.as_ref());
    }
    Ok(out)
}

pub(crate) fn oid_tlv(oid: &ObjectIdentifier) -> Result<Vec<u8>> {
    tlv(Tag::ObjectIdentifier, oid.as_bytes())
}

pub(crate) fn decode_oid(tlv: &Tlv<'_>, context: &'static str) -> Result<ObjectIdentifier> {
    ObjectIdentifier::from_der(tlv.encoded).map_err(|e| Error::malformed(context, e))
}

pub(crate) fn decode_version(tlv: &Tlv<'_>, context: &'static str) -> Result<u8> {
    u8::from_der(tlv.encoded).map_err(|e| Error::malformed(context, e))
}

pub(crate) fn encode_version(version: u8) -> Result<Vec<u8>> {
    Ok(version.to_der()?)
}

/// Fail unless the whole input was consumed.
pub(crate) fn finish(rest: &[u8], context: &'static str) -> Result<()> {
    if rest.is_empty() {
        Ok(())
    } else {
        Err(Error::structure(context))
    }
}
