//! Inflation of concatenated zlib streams.
//!
//! Compressed GINI payloads are a run of independent zlib streams, one per
//! transmission block, sometimes followed by raw bytes. Whenever the
//! inflater stops producing output, the next two unconsumed bytes decide
//! what follows: a zlib header resets the inflater there, anything else is
//! copied through verbatim as the trailer.

use flate2::{Decompress, FlushDecompress};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::payload::SampleWidth;
use crate::wmo::starts_with_zlib_header;
use crate::{DecodeError, Result};

/// Minimum free space handed to each inflate call.
const CHUNK: usize = 4000;

/// Inflate `input` into exactly `nx * ny * width` bytes.
pub fn inflate_with_resync(
    input: &[u8],
    nx: usize,
    ny: usize,
    width: SampleWidth,
    cancel: &CancellationToken,
) -> Result<Vec<u8>> {
    let w = width.bytes();
    let expected = nx * ny * w;
    let growth = CHUNK.max(nx * w);

    let mut out: Vec<u8> = Vec::with_capacity((nx * (ny + 1) + CHUNK) * w);
    let mut inflater = Decompress::new(true);
    let mut pos = 0usize;
    let mut streams = 1usize;
    let mut fresh_stream = true;

    while pos < input.len() && out.len() < expected {
        if cancel.is_cancelled() {
            return Err(DecodeError::Cancelled);
        }

        if out.capacity() - out.len() < CHUNK {
            out.reserve(growth);
        }

        let in_before = inflater.total_in();
        let out_before = inflater.total_out();
        inflater
            .decompress_vec(&input[pos..], &mut out, FlushDecompress::None)
            .map_err(|e| {
                DecodeError::Decompression(format!(
                    "zlib stream {} at payload offset {}: {}",
                    streams, pos, e
                ))
            })?;
        let consumed = (inflater.total_in() - in_before) as usize;
        let produced = (inflater.total_out() - out_before) as usize;
        pos += consumed;

        if produced > 0 {
            fresh_stream = false;
            continue;
        }

        let rest = &input[pos..];
        if starts_with_zlib_header(rest) && !(fresh_stream && consumed == 0) {
            inflater.reset(true);
            streams += 1;
            fresh_stream = true;
            continue;
        }

        if !rest.is_empty() {
            debug!(
                offset = pos,
                len = rest.len(),
                "Copying uncompressed payload trailer"
            );
            out.extend_from_slice(rest);
        }
        break;
    }

    if out.len() < expected {
        return Err(DecodeError::Decompression(format!(
            "inflated {} bytes from {} stream(s), expected {}",
            out.len(),
            streams,
            expected
        )));
    }
    if out.len() > expected {
        warn!(
            inflated = out.len(),
            expected, "Discarding payload bytes beyond the grid"
        );
        out.truncate(expected);
    }
    Ok(out)
}
