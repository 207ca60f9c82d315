//! Writing SignedData to an [`std::io::Write`] sink.
//!
//! Both output modes serialize from the same list of encoded parts, so they
//! always produce the same bytes; they differ only in how the bytes reach the
//! sink.

use std::io::Write;

use crate::builder::SignedDataBuilder;
use crate::errors::Result;
use crate::flags::Flags;
use crate::signed_data::SignedData;

/// How [`SignedData::write_to`] hands bytes to the sink.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum OutputMode {
    /// Encode everything, then write it with a single call.
    #[default]
    Buffered,

    /// Write and flush the outer headers, then write each SignedData field
    /// as it is reached.
    Streaming,
}

impl SignedData {
    /// Serialize to `out`.
    pub fn write_to<W: Write + ?Sized>(&self, out: &mut W, mode: OutputMode) -> Result<()> {
        let parts = self.encode_parts()?;
        match mode {
            OutputMode::Buffered => {
                out.write_all(&parts.concat())?;
            }
            OutputMode::Streaming => {
                out.write_all(&parts.header)?;
                out.flush()?;
                for field in &parts.fields {
                    out.write_all(field)?;
                }
            }
        }
        out.flush()?;
        Ok(())
    }
}

impl SignedDataBuilder<'_> {
    /// Stream the structure to `out`.
    ///
    /// An open builder is first finalized with `content`, processed
    /// according to `flags` as in [`SignedDataBuilder::finalize`]. A builder
    /// that is already finalized writes what it holds and ignores `content`.
    pub fn write_stream<W: Write + ?Sized>(
        &mut self,
        out: &mut W,
        content: &[u8],
        flags: impl Into<Flags>,
    ) -> Result<()> {
        if self.is_open() {
            log::debug!("finalizing with {} streamed bytes", content.len());
            self.finalize(content, flags)?;
        }
        self.signed_data()?.write_to(out, OutputMode::Streaming)
    }
}
