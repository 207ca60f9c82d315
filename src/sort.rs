//! Canonical ordering for `SET OF` contents.
//!
//! X.690 § 11.6 requires the components of a DER `SET OF` to appear in
//! ascending order of their encodings, compared as octet strings where the
//! shorter one is padded with trailing zero octets. Because every component
//! is a complete TLV, two distinct encodings can never be equal up to that
//! padding, so plain lexicographic comparison of the encodings gives the same
//! order.

use alloc::vec::Vec;
use core::cmp::Ordering;
use der::Tag;

use crate::{encoding, errors::Result};

/// Compare two DER encodings in `SET OF` order.
pub fn der_cmp(a: &[u8], b: &[u8]) -> Ordering {
    a.cmp(b)
}

/// Sort pre-encoded DER elements into canonical `SET OF` order.
///
/// The sort is stable: elements with identical encodings keep their relative
/// order.
pub fn sort_der_elements<T: AsRef<[u8]>>(elements: &mut [T]) {
    log::trace!("sorting {} SET OF elements", elements.len());
    elements.sort_by(|a, b| der_cmp(a.as_ref(), b.as_ref()));
}

/// Sort `elements` and wrap them in a single constructed element tagged `tag`.
///
/// Used for both universal `SET` and the implicitly tagged sets of
/// SignedData (`[0] certificates`, `[1] crls`).
pub fn encode_set_of<T: AsRef<[u8]>>(tag: Tag, elements: &[T]) -> Result<Vec<u8>> {
    let mut sorted: Vec<&[u8]> = elements.iter().map(AsRef::as_ref).collect();
    sort_der_elements(&mut sorted);
    encoding::constructed(tag, &sorted)
}
