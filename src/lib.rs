#![cfg_attr(not(test), no_std)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![doc = include_str!("../README.md")]
#![doc(html_logo_url = "https://raw.githubusercontent.com/RustCrypto/meta/master/logo_small.png")]
#![warn(missing_docs)]

//! # Usage
//!
//! ## Certificate bundles
//!
//! A bundle is a SignedData with no content and no signers, the format
//! written by `openssl crl2pkcs7`. Certificates are stored in canonical
//! DER `SET OF` order, so the same certificates always bundle to the same
//! bytes:
//!
#![cfg_attr(all(feature = "pem", feature = "std"), doc = "```")]
#![cfg_attr(not(all(feature = "pem", feature = "std")), doc = "```ignore")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use pkcs7_sign::{bundle, Certificate};
//!
//! let root = Certificate::from_pem(&std::fs::read_to_string("tests/examples/pkcs7/root.pem")?)?;
//! let leaf = Certificate::from_pem(&std::fs::read_to_string("tests/examples/pkcs7/leaf.pem")?)?;
//!
//! let der = bundle::bundle_certificates(&[leaf.clone(), root.clone()])?;
//! assert_eq!(der, bundle::bundle_certificates(&[root, leaf])?);
//!
//! let (certs, rest) = bundle::get_certificates(&der)?;
//! assert_eq!(certs.len(), 2);
//! assert!(rest.is_empty());
//! # Ok(())
//! # }
//! ```
//!
//! ## Kernel module signatures
//!
//! Linux kernel modules carry a detached SignedData without signed
//! attributes or certificates. [`pkcs7_sign`] produces exactly that shape:
//!
#![cfg_attr(all(feature = "pem", feature = "std"), doc = "```")]
#![cfg_attr(not(all(feature = "pem", feature = "std")), doc = "```ignore")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use pkcs7_sign::{flags, pkcs7_sign, Certificate};
//! use pkcs7_sign::pkcs8::DecodePrivateKey;
//! use pkcs7_sign::rsa::RsaPrivateKey;
//!
//! let cert = Certificate::from_pem(&std::fs::read_to_string("tests/examples/pkcs7/sign_cert.pem")?)?;
//! let key = RsaPrivateKey::from_pkcs8_pem(&std::fs::read_to_string("tests/examples/pkcs7/sign_key.pem")?)?;
//!
//! let content = &b"signed data"[..];
//! let sd = pkcs7_sign(Some((&cert, &key)), &[], Some(content), flags::module_signing())?;
//! assert!(sd.is_detached());
//!
//! let signer = &sd.signer_infos()[0];
//! sd.verify_signer(signer, &cert.rsa_public_key()?, Some(content))?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Building incrementally
//!
//! [`SignedDataBuilder`] accepts any number of signers, certificates and
//! CRLs before [`SignedDataBuilder::finalize`] signs the content. After
//! that the structure is frozen and can only be serialized, either at once
//! with [`SignedData::to_der`] or through a writer with
//! [`SignedData::write_to`].

#[cfg(doctest)]
pub struct ReadmeDoctests;

#[macro_use]
extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

pub use der;
pub use pkcs8;
pub use rsa;
pub use signature;
pub use x509_cert;

pub mod bundle;
pub mod errors;
pub mod flags;
pub mod signed_data;
pub mod sort;
pub mod traits;

mod algorithms;
mod ber;
mod builder;
mod cert;
mod encoding;
mod sign;
mod signer;
#[cfg(feature = "std")]
mod stream;

#[cfg(feature = "pem")]
pub use pem_rfc7468::LineEnding;

pub use crate::{
    algorithms::DigestAlgorithm,
    builder::SignedDataBuilder,
    cert::{Certificate, Crl, RawCertificate},
    encoding::{
        ID_CONTENT_TYPE, ID_DATA, ID_MESSAGE_DIGEST, ID_SIGNED_DATA, ID_SIGNING_TIME,
        ID_SMIME_CAPABILITIES, RSA_ENCRYPTION,
    },
    errors::{Error, Result},
    flags::{Flag, Flags},
    sign::{pkcs7_sign, sign},
    signed_data::SignedData,
    signer::{SignerInfoBuilder, SigningContext},
};

#[cfg(feature = "std")]
pub use crate::stream::OutputMode;
