//! Traits describing the private and public key operations a signer needs.

use alloc::vec::Vec;
use der::{Any, Tag};
use pkcs8::EncodePublicKey;
use rsa::{RsaPrivateKey, RsaPublicKey};
use spki::AlgorithmIdentifierOwned;

use crate::algorithms::DigestAlgorithm;
use crate::encoding::RSA_ENCRYPTION;
use crate::errors::{Error, Result};

/// Private key able to produce a SignerInfo signature over a precomputed digest.
///
/// Implement this for hardware-backed keys; the signer never needs the
/// private key material itself.
pub trait SigningKey {
    /// DER-encoded `SubjectPublicKeyInfo` of the matching public key.
    fn public_key_der(&self) -> Result<Vec<u8>>;

    /// `signatureAlgorithm` to record for signatures made with `digest`.
    fn signature_algorithm(&self, digest: DigestAlgorithm) -> Result<AlgorithmIdentifierOwned>;

    /// Sign `hashed`, the output of `digest`.
    ///
    /// Must not apply any further hashing.
    fn sign_digest(&self, digest: DigestAlgorithm, hashed: &[u8]) -> signature::Result<Vec<u8>>;
}

/// Public key able to check a SignerInfo signature.
pub trait VerifyingKey {
    /// Verify `signature` over `hashed`, the output of `digest`.
    fn verify_digest(&self, digest: DigestAlgorithm, hashed: &[u8], signature: &[u8])
        -> Result<()>;
}

/// `rsaEncryption` with NULL parameters, the signature algorithm OpenSSL
/// records for PKCS#1 v1.5 signatures regardless of the digest.
fn rsa_encryption() -> Result<AlgorithmIdentifierOwned> {
    Ok(AlgorithmIdentifierOwned {
        oid: RSA_ENCRYPTION,
        parameters: Some(Any::new(Tag::Null, Vec::<u8>::new())?),
    })
}

impl SigningKey for RsaPrivateKey {
    fn public_key_der(&self) -> Result<Vec<u8>> {
        Ok(self.to_public_key().to_public_key_der()?.into_vec())
    }

    fn signature_algorithm(&self, _digest: DigestAlgorithm) -> Result<AlgorithmIdentifierOwned> {
        rsa_encryption()
    }

    fn sign_digest(&self, digest: DigestAlgorithm, hashed: &[u8]) -> signature::Result<Vec<u8>> {
        Ok(self.sign(digest.pkcs1v15(), hashed)?)
    }
}

impl VerifyingKey for RsaPublicKey {
    fn verify_digest(
        &self,
        digest: DigestAlgorithm,
        hashed: &[u8],
        signature: &[u8],
    ) -> Result<()> {
        self.verify(digest.pkcs1v15(), hashed, signature)
            .map_err(|_| Error::Verification)
    }
}
