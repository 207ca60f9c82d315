//! Incremental SignedData assembly.
//!
//! A [`SignedDataBuilder`] starts out open: signers, certificates and CRLs
//! can be added. [`SignedDataBuilder::finalize`] digests and signs the content
//! and freezes the result; from then on only serialization is allowed, and
//! every other call fails with [`Error::InvalidState`].

use alloc::{borrow::Cow, vec::Vec};
use const_oid::ObjectIdentifier;
use der::{Any, DateTime, Tag};

use crate::algorithms::DigestAlgorithm;
use crate::cert::{Certificate, Crl};
use crate::encoding::ID_DATA;
use crate::errors::{Error, Result};
use crate::flags::{Flag, Flags};
use crate::signed_data::SignedData;
use crate::signer::{SignerInfoBuilder, SigningContext};
use crate::traits::SigningKey;

const TEXT_HEADER: &[u8] = b"Content-Type: text/plain\r\n\r\n";

/// Builder for [`SignedData`].
///
/// Signing keys are borrowed for `'k`; certificates and CRLs are shared
/// handles, so adding them never copies their encoding.
#[derive(Debug)]
pub struct SignedDataBuilder<'k> {
    flags: Flags,
    state: State<'k>,
}

#[derive(Debug)]
enum State<'k> {
    Open(Pending<'k>),
    Finalized(SignedData),
}

#[derive(Debug)]
struct Pending<'k> {
    content_type: ObjectIdentifier,
    signing_time: Option<DateTime>,
    signers: Vec<SignerInfoBuilder<'k>>,
    certificates: Vec<Certificate>,
    crls: Vec<Crl>,
}

impl<'k> SignedDataBuilder<'k> {
    /// Open a builder.
    ///
    /// [`Flag::Detached`] leaves the content out of the encoding; other
    /// flags are recorded and available through [`SignedDataBuilder::flags`].
    pub fn new(flags: impl Into<Flags>) -> Self {
        Self {
            flags: flags.into(),
            state: State::Open(Pending {
                content_type: ID_DATA,
                signing_time: None,
                signers: Vec::new(),
                certificates: Vec::new(),
                crls: Vec::new(),
            }),
        }
    }

    /// Flags the builder was opened with.
    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// Is the builder still accepting signers?
    pub fn is_open(&self) -> bool {
        matches!(self.state, State::Open(_))
    }

    /// Set the type of the encapsulated content. Defaults to `id-data`.
    pub fn set_content_type(&mut self, content_type: ObjectIdentifier) -> Result<&mut Self> {
        self.pending_mut("set content type")?.content_type = content_type;
        Ok(self)
    }

    /// Emit a `signingTime` attribute with this value for every signer with
    /// signed attributes.
    ///
    /// Without it no signing time is recorded, which keeps the output a
    /// function of the inputs alone.
    pub fn set_signing_time(&mut self, time: DateTime) -> Result<&mut Self> {
        self.pending_mut("set signing time")?.signing_time = Some(time);
        Ok(self)
    }

    /// Add a certificate to the certificate set.
    ///
    /// Certificates already present are not added twice.
    pub fn add_certificate(&mut self, certificate: &Certificate) -> Result<&mut Self> {
        let pending = self.pending_mut("add certificate")?;
        if !pending.certificates.contains(certificate) {
            pending.certificates.push(certificate.clone());
        }
        Ok(self)
    }

    /// Add a CRL to the CRL set.
    pub fn add_crl(&mut self, crl: &Crl) -> Result<&mut Self> {
        let pending = self.pending_mut("add CRL")?;
        if !pending.crls.contains(crl) {
            pending.crls.push(crl.clone());
        }
        Ok(self)
    }

    /// Add a signer.
    ///
    /// See [`SignerInfoBuilder::new`] for the options `flags` may carry and
    /// the ways this can fail. Unless [`Flag::NoCerts`] is set, `certificate`
    /// joins the certificate set.
    pub fn add_signer(
        &mut self,
        certificate: &Certificate,
        key: &'k dyn SigningKey,
        digest: DigestAlgorithm,
        flags: impl Into<Flags>,
    ) -> Result<&SignerInfoBuilder<'k>> {
        let pending = self.pending_mut("add signer")?;
        let signer = SignerInfoBuilder::new(certificate, key, digest, flags)?;
        log::debug!("adding signer {:?}", signer);

        if signer.includes_certificate() && !pending.certificates.contains(certificate) {
            pending.certificates.push(certificate.clone());
        }
        pending.signers.push(signer);
        Ok(&pending.signers[pending.signers.len() - 1])
    }

    /// Digest and sign `content`, fixing the structure.
    ///
    /// Unless `flags` contains [`Flag::Binary`], line endings are converted
    /// to CRLF before digesting; [`Flag::Text`] additionally prefixes a
    /// `text/plain` MIME header. The converted content is what gets embedded.
    pub fn finalize(&mut self, content: &[u8], flags: impl Into<Flags>) -> Result<&SignedData> {
        let flags = flags.into();
        let pending = self.pending("finalize")?;
        let content = canonicalize(content, flags);

        let mut digests: Vec<(DigestAlgorithm, Vec<u8>)> = Vec::new();
        for signer in &pending.signers {
            let alg = signer.digest_algorithm();
            if !digests.iter().any(|(known, _)| *known == alg) {
                digests.push((alg, alg.digest(&content)));
            }
        }

        let embedded = if self.flags.contains(Flag::Detached) {
            None
        } else {
            Some(Any::new(Tag::OctetString, content.as_ref())?)
        };

        self.seal(
            |alg| {
                digests
                    .iter()
                    .find(|(known, _)| *known == alg)
                    .map(|(_, md)| md.as_slice())
                    .ok_or(Error::structure("message digest"))
            },
            embedded,
        )
    }

    /// Finalize detached content from its precomputed digest.
    ///
    /// All signers must use the digest algorithm that produced
    /// `message_digest`, and the builder must be detached.
    pub fn finalize_digest(&mut self, message_digest: &[u8]) -> Result<&SignedData> {
        let pending = self.pending("finalize")?;
        if !self.flags.contains(Flag::Detached) {
            return Err(Error::unsupported(
                self.flags,
                "a precomputed digest requires detached content",
            ));
        }

        let mut algorithms = pending.signers.iter().map(SignerInfoBuilder::digest_algorithm);
        if let Some(first) = algorithms.next() {
            if algorithms.any(|alg| alg != first) {
                return Err(Error::unsupported(
                    self.flags,
                    "a precomputed digest requires a single digest algorithm",
                ));
            }
            if message_digest.len() != first.output_size() {
                return Err(Error::structure("message digest"));
            }
        }

        self.seal(|_| Ok(message_digest), None)
    }

    /// Sign with every pending signer and move to the finalized state.
    fn seal<'d>(
        &mut self,
        message_digest: impl Fn(DigestAlgorithm) -> Result<&'d [u8]>,
        content: Option<Any>,
    ) -> Result<&SignedData> {
        let pending = self.pending("finalize")?;

        let mut signer_infos = Vec::with_capacity(pending.signers.len());
        let mut digest_algorithms = Vec::new();
        for signer in &pending.signers {
            let alg = signer.digest_algorithm();
            let ctx = SigningContext {
                content_type: pending.content_type,
                message_digest: message_digest(alg)?,
                signing_time: pending.signing_time,
            };
            signer_infos.push(signer.build(&ctx)?);

            let identifier = alg.algorithm_identifier();
            if !digest_algorithms.contains(&identifier) {
                digest_algorithms.push(identifier);
            }
        }

        let signed_data = SignedData::assemble(
            digest_algorithms,
            pending.content_type,
            content,
            (!pending.certificates.is_empty()).then(|| pending.certificates.clone()),
            (!pending.crls.is_empty()).then(|| pending.crls.clone()),
            signer_infos,
        );

        log::debug!(
            "finalized SignedData version {} with {} signers, detached: {}",
            signed_data.version(),
            signed_data.signer_infos().len(),
            signed_data.is_detached()
        );

        self.state = State::Finalized(signed_data);
        self.signed_data()
    }

    /// The finalized structure.
    pub fn signed_data(&self) -> Result<&SignedData> {
        match &self.state {
            State::Finalized(signed_data) => Ok(signed_data),
            State::Open(_) => Err(Error::InvalidState {
                operation: "serialize",
                state: "open",
            }),
        }
    }

    /// Take the finalized structure.
    pub fn into_signed_data(self) -> Result<SignedData> {
        match self.state {
            State::Finalized(signed_data) => Ok(signed_data),
            State::Open(_) => Err(Error::InvalidState {
                operation: "serialize",
                state: "open",
            }),
        }
    }

    /// DER encoding of the finalized structure.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.signed_data()?.to_der()
    }

    fn pending(&self, operation: &'static str) -> Result<&Pending<'k>> {
        match &self.state {
            State::Open(pending) => Ok(pending),
            State::Finalized(_) => Err(Error::InvalidState {
                operation,
                state: "finalized",
            }),
        }
    }

    fn pending_mut(&mut self, operation: &'static str) -> Result<&mut Pending<'k>> {
        match &mut self.state {
            State::Open(pending) => Ok(pending),
            State::Finalized(_) => Err(Error::InvalidState {
                operation,
                state: "finalized",
            }),
        }
    }
}

impl Default for SignedDataBuilder<'_> {
    fn default() -> Self {
        Self::new(Flags::default())
    }
}

/// Convert content to the form that is signed.
///
/// Lines are rewritten to end in CRLF, matching how OpenSSL prepares S/MIME
/// content: trailing CRs are dropped from every line, and a final line
/// without a newline gets no line ending.
pub(crate) fn canonicalize(content: &[u8], flags: Flags) -> Cow<'_, [u8]> {
    if flags.contains(Flag::Binary) {
        return Cow::Borrowed(content);
    }

    let mut out = Vec::with_capacity(content.len() + TEXT_HEADER.len());
    if flags.contains(Flag::Text) {
        out.extend_from_slice(TEXT_HEADER);
    }

    let mut lines = content.split(|&b| b == b'\n').peekable();
    while let Some(line) = lines.next() {
        let end = line.iter().rposition(|&b| b != b'\r').map_or(0, |i| i + 1);
        out.extend_from_slice(&line[..end]);
        if lines.peek().is_some() {
            out.extend_from_slice(b"\r\n");
        }
    }

    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_binary() {
        let content = b"a\nb\r\n";
        assert!(matches!(
            canonicalize(content, Flag::Binary.into()),
            Cow::Borrowed(c) if c == content
        ));
    }

    #[test]
    fn test_canonicalize_line_endings() {
        let cases: [(&[u8], &[u8]); 6] = [
            (b"", b""),
            (b"signed data", b"signed data"),
            (b"a\nb", b"a\r\nb"),
            (b"a\r\nb\n", b"a\r\nb\r\n"),
            (b"a\r\r\n\n", b"a\r\n\r\n"),
            (b"tail\r", b"tail"),
        ];
        for (input, expected) in cases {
            assert_eq!(canonicalize(input, Flags::default()).as_ref(), expected);
        }
    }

    #[test]
    fn test_canonicalize_text() {
        assert_eq!(
            canonicalize(b"hi\n", Flag::Text.into()).as_ref(),
            b"Content-Type: text/plain\r\n\r\nhi\r\n"
        );
        assert_eq!(
            canonicalize(b"hi\n", Flag::Text | Flag::Binary).as_ref(),
            b"hi\n"
        );
    }

    #[test]
    fn test_state_machine_without_signers() {
        let mut builder = SignedDataBuilder::default();
        assert!(builder.is_open());
        assert!(matches!(
            builder.to_der(),
            Err(Error::InvalidState { state: "open", .. })
        ));

        builder.finalize(b"", Flag::Binary).unwrap();
        assert!(!builder.is_open());
        assert!(matches!(
            builder.finalize(b"", Flag::Binary),
            Err(Error::InvalidState { operation: "finalize", state: "finalized" })
        ));
        assert!(matches!(
            builder.set_content_type(ID_DATA),
            Err(Error::InvalidState { .. })
        ));

        let der = builder.to_der().unwrap();
        assert_eq!(der, builder.to_der().unwrap());
        assert_eq!(builder.signed_data().unwrap().content(), Some(&b""[..]));
    }

    #[test]
    fn test_finalize_digest_requires_detached() {
        let mut builder = SignedDataBuilder::new(Flags::default());
        assert!(matches!(
            builder.finalize_digest(&[0u8; 32]),
            Err(Error::UnsupportedOptionCombination { .. })
        ));
        assert!(builder.is_open());
    }
}
