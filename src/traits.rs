//! Key abstractions used by the signer.

mod keys;

pub use keys::{SigningKey, VerifyingKey};
