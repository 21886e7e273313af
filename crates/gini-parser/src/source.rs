//! Seekable byte sources.

use std::io::{self, Read, Seek, SeekFrom};

use crate::{DecodeError, Result};

/// Anything the decoders can read from: files, cursors over memory, etc.
///
/// A source must not be shared between concurrent decodes; the decoders
/// take it by `&mut`.
pub trait ByteSource: Read + Seek {}

impl<T: Read + Seek> ByteSource for T {}

/// Fill `buf` as far as the source allows. Returns the number of bytes read.
pub(crate) fn read_up_to<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Read exactly `len` bytes starting at `offset`.
pub(crate) fn read_exact_at<R: ByteSource + ?Sized>(
    reader: &mut R,
    offset: u64,
    len: usize,
    stage: &'static str,
) -> Result<Vec<u8>> {
    reader.seek(SeekFrom::Start(offset))?;
    let mut buf = vec![0u8; len];
    let n = read_up_to(reader, &mut buf)?;
    if n < len {
        return Err(DecodeError::TruncatedInput {
            stage,
            needed: len as u64,
            available: n as u64,
        });
    }
    Ok(buf)
}

/// Read everything from `offset` to the end of the source.
pub(crate) fn read_to_end_from<R: ByteSource + ?Sized>(
    reader: &mut R,
    offset: u64,
    stage: &'static str,
) -> Result<Vec<u8>> {
    let len = reader.seek(SeekFrom::End(0))?;
    if offset >= len {
        return Err(DecodeError::TruncatedInput {
            stage,
            needed: offset + 1,
            available: len,
        });
    }
    reader.seek(SeekFrom::Start(offset))?;
    let mut buf = Vec::with_capacity((len - offset) as usize);
    reader.read_to_end(&mut buf)?;
    Ok(buf)
}
