//! BER to DER normalization of incoming `ContentInfo` structures.
//!
//! NSS and Windows export certificate bundles with indefinite lengths and
//! constructed strings. Both are rewritten here so the DER walker in
//! [`crate::encoding`] only ever sees definite, primitive-string encodings.
//! Input without either is passed through untouched, which keeps DER
//! strictness (minimal lengths, no trailing garbage) on the common path.

use alloc::{borrow::Cow, vec::Vec};
use der::{Decode, Encode, Length, Reader, SliceReader};

use crate::errors::{Error, Result};

const CONTEXT: &str = "BER element";

/// Deepest nesting accepted while rewriting.
const MAX_DEPTH: usize = 64;

/// Constructed bit of an identifier octet.
const CONSTRUCTED: u8 = 0x20;

/// End-of-contents marker closing an indefinite-length element.
const END_OF_CONTENTS: [u8; 2] = [0x00, 0x00];

struct BerHeader {
    identifier: u8,
    /// `None` for the indefinite form.
    length: Option<usize>,
}

impl BerHeader {
    fn is_constructed(&self) -> bool {
        self.identifier & CONSTRUCTED != 0
    }

    /// Universal string type sent in constructed (segmented) form.
    fn is_constructed_string(&self) -> bool {
        // OCTET STRING and the character string types.
        self.is_constructed()
            && matches!(
                self.identifier & !CONSTRUCTED,
                0x04 | 0x0c | 0x12 | 0x13 | 0x14 | 0x15 | 0x16 | 0x19 | 0x1a | 0x1b | 0x1c | 0x1e
            )
    }
}

/// Split the first element off `input`, rewritten as DER when it uses
/// BER-only forms.
pub(crate) fn normalize(input: &[u8]) -> Result<(Cow<'_, [u8]>, &[u8])> {
    let mut out = Vec::new();
    let (rest, rewritten) = convert(input, 0, &mut out)?;

    if rewritten {
        log::debug!("rewrote {} BER bytes as {} DER bytes", input.len() - rest.len(), out.len());
        Ok((Cow::Owned(out), rest))
    } else {
        Ok((Cow::Borrowed(&input[..input.len() - rest.len()]), rest))
    }
}

fn read_header(input: &[u8]) -> Result<(BerHeader, &[u8])> {
    let (&identifier, body) = input.split_first().ok_or(Error::structure(CONTEXT))?;
    // High tag numbers never occur in the structures parsed here.
    if identifier & 0x1f == 0x1f {
        return Err(Error::structure(CONTEXT));
    }

    if body.first() == Some(&0x80) {
        if identifier & CONSTRUCTED == 0 {
            return Err(Error::structure(CONTEXT));
        }
        let header = BerHeader {
            identifier,
            length: None,
        };
        return Ok((header, &body[1..]));
    }

    let mut reader = SliceReader::new(body).map_err(|e| Error::malformed(CONTEXT, e))?;
    let length = Length::decode(&mut reader).map_err(|e| Error::malformed(CONTEXT, e))?;
    let consumed = usize::try_from(reader.position()).map_err(|e| Error::malformed(CONTEXT, e))?;
    let length = usize::try_from(length).map_err(|e| Error::malformed(CONTEXT, e))?;

    let header = BerHeader {
        identifier,
        length: Some(length),
    };
    Ok((header, &body[consumed..]))
}

fn take(input: &[u8], len: usize) -> Result<(&[u8], &[u8])> {
    if input.len() < len {
        return Err(Error::structure(CONTEXT));
    }
    Ok(input.split_at(len))
}

/// Run `child` over each member of a constructed element's contents,
/// returning the input that follows the element.
fn each_child<'a>(
    body: &'a [u8],
    length: Option<usize>,
    mut child: impl FnMut(&'a [u8]) -> Result<&'a [u8]>,
) -> Result<&'a [u8]> {
    match length {
        Some(len) => {
            let (mut contents, rest) = take(body, len)?;
            while !contents.is_empty() {
                contents = child(contents)?;
            }
            Ok(rest)
        }
        None => {
            let mut body = body;
            loop {
                if let Some(rest) = body.strip_prefix(&END_OF_CONTENTS[..]) {
                    return Ok(rest);
                }
                if body.is_empty() {
                    return Err(Error::structure(CONTEXT));
                }
                body = child(body)?;
            }
        }
    }
}

fn write_element(out: &mut Vec<u8>, identifier: u8, contents: &[u8]) -> Result<()> {
    out.push(identifier);
    Length::try_from(contents.len())?.encode_to_vec(out)?;
    out.extend_from_slice(contents);
    Ok(())
}

/// Append the DER form of the first element of `input` to `out`.
///
/// Returns the input following the element and whether any BER-only form
/// was found inside it.
fn convert<'a>(input: &'a [u8], depth: usize, out: &mut Vec<u8>) -> Result<(&'a [u8], bool)> {
    if depth > MAX_DEPTH {
        return Err(Error::structure(CONTEXT));
    }
    let (header, body) = read_header(input)?;

    if header.is_constructed_string() {
        let primitive = header.identifier & !CONSTRUCTED;
        let mut contents = Vec::new();
        let rest = string_segments(body, header.length, depth + 1, primitive, &mut contents)?;
        write_element(out, primitive, &contents)?;
        return Ok((rest, true));
    }

    match header.length {
        Some(len) if !header.is_constructed() => {
            let (contents, rest) = take(body, len)?;
            write_element(out, header.identifier, contents)?;
            Ok((rest, false))
        }
        length => {
            let mut contents = Vec::new();
            let mut rewritten = length.is_none();
            let rest = each_child(body, length, |child| {
                let (rest, nested) = convert(child, depth + 1, &mut contents)?;
                rewritten |= nested;
                Ok(rest)
            })?;
            write_element(out, header.identifier, &contents)?;
            Ok((rest, rewritten))
        }
    }
}

/// Concatenate the segments of a constructed string into `contents`.
fn string_segments<'a>(
    body: &'a [u8],
    length: Option<usize>,
    depth: usize,
    primitive: u8,
    contents: &mut Vec<u8>,
) -> Result<&'a [u8]> {
    if depth > MAX_DEPTH {
        return Err(Error::structure(CONTEXT));
    }
    each_child(body, length, |segment| {
        let (header, body) = read_header(segment)?;
        if header.identifier & !CONSTRUCTED != primitive {
            return Err(Error::structure(CONTEXT));
        }
        match header.length {
            Some(len) if !header.is_constructed() => {
                let (value, rest) = take(body, len)?;
                contents.extend_from_slice(value);
                Ok(rest)
            }
            length => string_segments(body, length, depth + 1, primitive, contents),
        }
    })
}
