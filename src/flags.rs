//! Signing options.
//!
//! The option names mirror the ones used by OpenSSL's `cms` and `pkcs7`
//! commands, so a flag combination known to work there can be carried over
//! unchanged.

use flagset::{flags, FlagSet};

flags! {
    /// A single signing option.
    pub enum Flag: u32 {
        /// Treat content as text: prepend a `text/plain` MIME header and
        /// canonicalize line endings.
        Text = 1 << 0,

        /// Don't include the signer certificate in the certificate set.
        NoCerts = 1 << 1,

        /// Don't embed the content.
        Detached = 1 << 2,

        /// Sign the content bytes exactly as given, without line-ending
        /// canonicalization.
        Binary = 1 << 3,

        /// Don't emit signed attributes; the signature covers the content
        /// digest directly.
        NoAttributes = 1 << 4,

        /// Leave out the S/MIME capabilities attribute.
        NoSmimeCap = 1 << 5,

        /// Content is delivered later through the streaming output adapter.
        Stream = 1 << 6,

        /// Return an open builder instead of finalizing.
        Partial = 1 << 7,

        /// Identify the signer by subject key identifier instead of issuer
        /// and serial number.
        UseKeyId = 1 << 8,
    }
}

/// Set of [`Flag`]s.
pub type Flags = FlagSet<Flag>;

/// Flag set used for Linux kernel module signatures.
///
/// This is the only signer combination the legacy [`pkcs7_sign`](crate::pkcs7_sign)
/// entry point accepts.
pub fn module_signing() -> Flags {
    Flag::NoAttributes | Flag::Binary | Flag::NoCerts | Flag::Detached
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_signing_flags() {
        let flags = module_signing();
        assert!(flags.contains(Flag::Detached));
        assert!(flags.contains(Flag::NoAttributes));
        assert!(!flags.contains(Flag::Text));
        assert_ne!(flags, Flags::from(Flag::Detached));
        assert_eq!(flags.bits(), 0b1_1110);
    }
}
