//! Signed and unsigned attributes.

use alloc::vec::Vec;
use const_oid::ObjectIdentifier;
use der::{Any, Decode, Encode, Tag, Tagged};

use crate::encoding::{self, decode_oid, expect_tlv, finish, split_elements, Tlv};
use crate::encoding::{ID_CONTENT_TYPE, ID_MESSAGE_DIGEST, ID_SIGNING_TIME};
use crate::errors::{Error, Result};
use crate::sort::{encode_set_of, sort_der_elements};

/// ```text
/// Attribute ::= SEQUENCE {
///     attrType OBJECT IDENTIFIER,
///     attrValues SET OF AttributeValue }
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Attribute {
    oid: ObjectIdentifier,
    values: Vec<Any>,
}

impl Attribute {
    /// New attribute with the given values.
    pub fn new(oid: ObjectIdentifier, values: Vec<Any>) -> Self {
        Self { oid, values }
    }

    /// Attribute type.
    pub fn oid(&self) -> ObjectIdentifier {
        self.oid
    }

    /// Attribute values in wire order.
    pub fn values(&self) -> &[Any] {
        &self.values
    }

    /// The only value, when exactly one is present.
    pub fn single_value(&self) -> Option<&Any> {
        match self.values.as_slice() {
            [value] => Some(value),
            _ => None,
        }
    }

    /// DER encoding with the values in canonical order.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        let values = self
            .values
            .iter()
            .map(|value| value.to_der())
            .collect::<der::Result<Vec<_>>>()?;
        encoding::constructed(
            Tag::Sequence,
            &[encoding::oid_tlv(&self.oid)?, encode_set_of(Tag::Set, &values)?],
        )
    }

    fn decode(tlv: &Tlv<'_>) -> Result<Self> {
        const CONTEXT: &str = "attribute";
        if tlv.tag != Tag::Sequence {
            return Err(Error::structure(CONTEXT));
        }
        let (oid, body) = expect_tlv(tlv.value, Tag::ObjectIdentifier, CONTEXT)?;
        let (set, body) = expect_tlv(body, Tag::Set, CONTEXT)?;
        finish(body, CONTEXT)?;

        let values = split_elements(set.value, CONTEXT)?
            .iter()
            .map(|value| Any::from_der(value.encoded).map_err(|e| Error::malformed(CONTEXT, e)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            oid: decode_oid(&oid, CONTEXT)?,
            values,
        })
    }
}

/// Set of attributes along with the exact encoding of their contents.
///
/// The signature over signed attributes covers their DER encoding under a
/// universal `SET` tag, so parsed attributes are re-emitted verbatim instead
/// of being re-encoded.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Attributes {
    attributes: Vec<Attribute>,
    encoded: Vec<u8>,
}

impl Attributes {
    /// Encode `attributes` in canonical order.
    pub fn new(attributes: Vec<Attribute>) -> Result<Self> {
        let mut encoded_attrs = attributes
            .into_iter()
            .map(|attr| Ok((attr.to_der()?, attr)))
            .collect::<Result<Vec<_>>>()?;
        encoded_attrs.sort_by(|(a, _), (b, _)| crate::sort::der_cmp(a, b));

        let mut encoded = Vec::new();
        let mut attributes = Vec::with_capacity(encoded_attrs.len());
        for (der, attr) in encoded_attrs {
            encoded.extend_from_slice(&der);
            attributes.push(attr);
        }

        Ok(Self {
            attributes,
            encoded,
        })
    }

    /// Decode the contents octets of an implicitly tagged attribute set.
    pub(crate) fn decode(contents: &[u8]) -> Result<Self> {
        let attributes = split_elements(contents, "attributes")?
            .iter()
            .map(Attribute::decode)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            attributes,
            encoded: contents.to_vec(),
        })
    }

    /// Attributes in encoded order.
    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter()
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Is the set empty?
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// First attribute of the given type.
    pub fn get(&self, oid: ObjectIdentifier) -> Option<&Attribute> {
        self.attributes.iter().find(|attr| attr.oid == oid)
    }

    /// Value of the `messageDigest` attribute.
    pub fn message_digest(&self) -> Option<&[u8]> {
        let value = self.get(ID_MESSAGE_DIGEST)?.single_value()?;
        (value.tag() == Tag::OctetString).then(|| value.value())
    }

    /// Value of the `contentType` attribute.
    pub fn content_type(&self) -> Option<ObjectIdentifier> {
        let value = self.get(ID_CONTENT_TYPE)?.single_value()?;
        ObjectIdentifier::from_der(&value.to_der().ok()?).ok()
    }

    /// Encoded `signingTime` value (`UTCTime` or `GeneralizedTime`).
    pub fn signing_time(&self) -> Option<&Any> {
        self.get(ID_SIGNING_TIME)?.single_value()
    }

    /// Encoding under a universal `SET` tag: the bytes a signature over
    /// signed attributes covers.
    pub fn to_set_der(&self) -> Result<Vec<u8>> {
        encoding::tlv(Tag::Set, &self.encoded)
    }

    /// Encoding under an implicit context tag, as stored in a SignerInfo.
    pub(crate) fn to_tagged_der(&self, tag: Tag) -> Result<Vec<u8>> {
        encoding::tlv(tag, &self.encoded)
    }

    /// Are the attributes in canonical order?
    pub fn is_canonical(&self) -> Result<bool> {
        let mut encodings = self
            .attributes
            .iter()
            .map(Attribute::to_der)
            .collect::<Result<Vec<_>>>()?;
        let wire = encodings.concat();
        sort_der_elements(&mut encodings);
        Ok(wire == self.encoded && encodings.concat() == self.encoded)
    }
}
