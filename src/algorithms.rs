//! Digest algorithms usable for content and attribute digests.

use alloc::vec::Vec;
use const_oid::{AssociatedOid, ObjectIdentifier};
use digest::Digest;
use rsa::Pkcs1v15Sign;
use sha1::Sha1;
use sha2::{Sha224, Sha256, Sha384, Sha512};
use spki::AlgorithmIdentifierOwned;

use crate::errors::{Error, Result};

/// Digest algorithm of a signer.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum DigestAlgorithm {
    /// SHA-1
    Sha1,
    /// SHA-224
    Sha224,
    /// SHA-256
    #[default]
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
}

impl DigestAlgorithm {
    /// Object identifier of the digest.
    pub fn oid(self) -> ObjectIdentifier {
        match self {
            DigestAlgorithm::Sha1 => Sha1::OID,
            DigestAlgorithm::Sha224 => Sha224::OID,
            DigestAlgorithm::Sha256 => Sha256::OID,
            DigestAlgorithm::Sha384 => Sha384::OID,
            DigestAlgorithm::Sha512 => Sha512::OID,
        }
    }

    /// Look up a digest by object identifier.
    pub fn from_oid(oid: ObjectIdentifier) -> Result<Self> {
        [
            DigestAlgorithm::Sha1,
            DigestAlgorithm::Sha224,
            DigestAlgorithm::Sha256,
            DigestAlgorithm::Sha384,
            DigestAlgorithm::Sha512,
        ]
        .into_iter()
        .find(|alg| alg.oid() == oid)
        .ok_or(Error::UnsupportedAlgorithm(oid))
    }

    /// Size of the digest output in bytes.
    pub fn output_size(self) -> usize {
        match self {
            DigestAlgorithm::Sha1 => <Sha1 as Digest>::output_size(),
            DigestAlgorithm::Sha224 => <Sha224 as Digest>::output_size(),
            DigestAlgorithm::Sha256 => <Sha256 as Digest>::output_size(),
            DigestAlgorithm::Sha384 => <Sha384 as Digest>::output_size(),
            DigestAlgorithm::Sha512 => <Sha512 as Digest>::output_size(),
        }
    }

    /// Hash `data`.
    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            DigestAlgorithm::Sha1 => Sha1::digest(data).to_vec(),
            DigestAlgorithm::Sha224 => Sha224::digest(data).to_vec(),
            DigestAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            DigestAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
            DigestAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
        }
    }

    /// `AlgorithmIdentifier` for this digest.
    ///
    /// Parameters are absent, as RFC 5754 § 2 asks for the SHA-2 family and
    /// OpenSSL emits for all of them.
    pub fn algorithm_identifier(self) -> AlgorithmIdentifierOwned {
        AlgorithmIdentifierOwned {
            oid: self.oid(),
            parameters: None,
        }
    }

    /// `RSASSA-PKCS1-v1_5` padding with the `DigestInfo` prefix for this digest.
    pub(crate) fn pkcs1v15(self) -> Pkcs1v15Sign {
        match self {
            DigestAlgorithm::Sha1 => Pkcs1v15Sign::new::<Sha1>(),
            DigestAlgorithm::Sha224 => Pkcs1v15Sign::new::<Sha224>(),
            DigestAlgorithm::Sha256 => Pkcs1v15Sign::new::<Sha256>(),
            DigestAlgorithm::Sha384 => Pkcs1v15Sign::new::<Sha384>(),
            DigestAlgorithm::Sha512 => Pkcs1v15Sign::new::<Sha512>(),
        }
    }
}

impl TryFrom<&AlgorithmIdentifierOwned> for DigestAlgorithm {
    type Error = Error;

    fn try_from(alg: &AlgorithmIdentifierOwned) -> Result<Self> {
        DigestAlgorithm::from_oid(alg.oid)
    }
}
