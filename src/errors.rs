//! Error types.

use const_oid::ObjectIdentifier;

use crate::flags::Flags;

/// Alias for [`core::result::Result`] with the `pkcs7-sign` crate's [`Error`] type.
pub type Result<T> = core::result::Result<T, Error>;

/// Error types
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// Structural DER violation while parsing.
    MalformedEncoding {
        /// What was being decoded.
        context: &'static str,
        /// Offset inside the element being decoded, when known.
        position: Option<usize>,
    },

    /// Subject key identifier requested for a certificate without one.
    NoKeyIdentifier,

    /// Operation not permitted in the builder's current state.
    InvalidState {
        /// Operation that was attempted.
        operation: &'static str,
        /// State the builder was in.
        state: &'static str,
    },

    /// The requested flags can't be used together.
    UnsupportedOptionCombination {
        /// Flags as passed by the caller.
        flags: Flags,
        /// Why the combination was rejected.
        reason: &'static str,
    },

    /// The signature primitive failed.
    SigningFailure(signature::Error),

    /// Signing key does not belong to the signer certificate.
    KeyMismatch,

    /// Digest or signature algorithm is not supported.
    UnsupportedAlgorithm(ObjectIdentifier),

    /// `ContentInfo` does not carry signed-data.
    UnsupportedContentType(ObjectIdentifier),

    /// Content was required but neither embedded nor supplied.
    MissingContent,

    /// ASN.1 DER encoding error.
    Asn1(der::Error),

    /// Public key errors.
    PublicKey(spki::Error),

    /// PEM encoding errors.
    #[cfg(feature = "pem")]
    Pem(pem_rfc7468::Error),

    /// Signature did not verify.
    Verification,

    /// `messageDigest` attribute does not match the content.
    DigestMismatch,

    /// `contentType` attribute is missing or differs from `eContentType`.
    ContentTypeMismatch,

    /// I/O error while writing output.
    #[cfg(feature = "std")]
    Io(std::io::Error),
}

impl Error {
    /// Wrap a decoding failure with the structure being parsed.
    pub(crate) fn malformed(context: &'static str, err: der::Error) -> Self {
        Error::MalformedEncoding {
            context,
            position: err.position().and_then(|pos| usize::try_from(pos).ok()),
        }
    }

    /// Structural violation which has no underlying `der` error.
    pub(crate) fn structure(context: &'static str) -> Self {
        Error::MalformedEncoding {
            context,
            position: None,
        }
    }

    pub(crate) fn unsupported(flags: Flags, reason: &'static str) -> Self {
        Error::UnsupportedOptionCombination { flags, reason }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::SigningFailure(err) => Some(err),
            Error::Asn1(err) => Some(err),
            Error::PublicKey(err) => Some(err),
            #[cfg(feature = "pem")]
            Error::Pem(err) => Some(err),
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::MalformedEncoding {
                context,
                position: Some(pos),
            } => write!(f, "malformed {} encoding at offset {}", context, pos),
            Error::MalformedEncoding { context, .. } => write!(f, "malformed {} encoding", context),
            Error::NoKeyIdentifier => write!(f, "certificate has no subject key identifier"),
            Error::InvalidState { operation, state } => {
                write!(f, "cannot {} while builder is {}", operation, state)
            }
            Error::UnsupportedOptionCombination { flags, reason } => {
                write!(f, "unsupported flags {:?}: {}", flags, reason)
            }
            Error::SigningFailure(err) => write!(f, "signing failed: {}", err),
            Error::KeyMismatch => write!(f, "private key does not match certificate"),
            Error::UnsupportedAlgorithm(oid) => write!(f, "unsupported algorithm: {}", oid),
            Error::UnsupportedContentType(oid) => write!(f, "unsupported content type: {}", oid),
            Error::MissingContent => write!(f, "content is neither embedded nor supplied"),
            Error::Asn1(err) => write!(f, "ASN.1 error: {}", err),
            Error::PublicKey(err) => write!(f, "public key error: {}", err),
            #[cfg(feature = "pem")]
            Error::Pem(err) => write!(f, "PEM error: {}", err),
            Error::Verification => write!(f, "verification error"),
            Error::DigestMismatch => write!(f, "message digest mismatch"),
            Error::ContentTypeMismatch => write!(f, "content type attribute mismatch"),
            #[cfg(feature = "std")]
            Error::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl From<der::Error> for Error {
    fn from(err: der::Error) -> Error {
        Error::Asn1(err)
    }
}

impl From<spki::Error> for Error {
    fn from(err: spki::Error) -> Error {
        Error::PublicKey(err)
    }
}

impl From<signature::Error> for Error {
    fn from(err: signature::Error) -> Error {
        Error::SigningFailure(err)
    }
}

#[cfg(feature = "pem")]
impl From<pem_rfc7468::Error> for Error {
    fn from(err: pem_rfc7468::Error) -> Error {
        Error::Pem(err)
    }
}

#[cfg(feature = "std")]
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}
