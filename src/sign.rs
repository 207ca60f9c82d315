//! One-shot signing entry points.

use crate::algorithms::DigestAlgorithm;
use crate::builder::SignedDataBuilder;
use crate::cert::Certificate;
use crate::errors::{Error, Result};
use crate::flags::{module_signing, Flag, Flags};
use crate::signed_data::SignedData;
use crate::traits::SigningKey;

/// Sign `data` in one call, in the manner of OpenSSL's `CMS_sign`.
///
/// `certs` join the certificate set; `signer`, if given, signs with SHA-256
/// and the options in `flags`. With [`Flag::Partial`] or [`Flag::Stream`]
/// the builder is returned open, so more signers can be added before
/// [`SignedDataBuilder::finalize`] or [`SignedDataBuilder::write_stream`].
/// Otherwise it is finalized with `data`, which must then be present.
pub fn sign<'k>(
    signer: Option<(&Certificate, &'k dyn SigningKey)>,
    certs: &[Certificate],
    data: Option<&[u8]>,
    flags: impl Into<Flags>,
) -> Result<SignedDataBuilder<'k>> {
    let flags = flags.into();
    let mut builder = SignedDataBuilder::new(flags);

    for cert in certs {
        builder.add_certificate(cert)?;
    }
    if let Some((cert, key)) = signer {
        builder.add_signer(cert, key, DigestAlgorithm::Sha256, flags)?;
    }

    if flags.contains(Flag::Partial) || flags.contains(Flag::Stream) {
        return Ok(builder);
    }

    let data = data.ok_or(Error::unsupported(flags, "content is required to finalize"))?;
    builder.finalize(data, flags)?;
    Ok(builder)
}

/// Sign in the manner of OpenSSL's legacy `PKCS7_sign`.
///
/// Only two shapes are supported:
///
/// - no signer and no data with exactly [`Flag::Detached`], producing a
///   certificates-only bundle of `certs`;
/// - a signer and data, no extra certificates, and exactly
///   [`module_signing`] flags, producing a detached SHA-256 signature
///   without signed attributes, as used for Linux kernel modules.
///
/// Anything else fails with [`Error::UnsupportedOptionCombination`].
pub fn pkcs7_sign(
    signer: Option<(&Certificate, &dyn SigningKey)>,
    certs: &[Certificate],
    data: Option<&[u8]>,
    flags: impl Into<Flags>,
) -> Result<SignedData> {
    let flags = flags.into();

    match (signer, data) {
        (None, None) => {
            if flags != Flags::from(Flag::Detached) {
                return Err(Error::unsupported(
                    flags,
                    "a certificates-only bundle takes only the detached flag",
                ));
            }
            // Same bytes as `bundle_certificates`: duplicates are kept and an
            // empty list still yields an (empty) certificate field.
            log::debug!("PKCS7_sign: certificates-only bundle of {}", certs.len());
            Ok(SignedData::degenerate(Some(certs.to_vec()), None))
        }
        (Some((cert, key)), Some(data)) => {
            if flags != module_signing() {
                return Err(Error::unsupported(
                    flags,
                    "signing supports only the module signing flags",
                ));
            }
            if !certs.is_empty() {
                return Err(Error::unsupported(
                    flags,
                    "extra certificates are not supported when signing",
                ));
            }
            let mut builder = SignedDataBuilder::new(flags);
            builder.add_signer(cert, key, DigestAlgorithm::Sha256, flags)?;
            builder.finalize(data, flags)?;
            builder.into_signed_data()
        }
        _ => Err(Error::unsupported(
            flags,
            "signer and data must be given together",
        )),
    }
}
