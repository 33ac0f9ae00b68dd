// Delta engine: ties the chunk index and match search to the revision
// format.
//
// Provides high-level encode/decode APIs that orchestrate:
//   - Chunk indexing and greedy matching (hash module) to find COPY/LITERAL
//   - Revision serialization (revision module) to produce the stream
//   - Revision decoding to reconstruct new content from old + stream

use std::io::Write;

use crate::hash::config::IndexConfig;
use crate::hash::matching::MatchEngine;
use crate::revision::decoder::{self, DecodeError};
use crate::revision::encoder::RevisionWriter;
use crate::revision::instruction::RevisionStats;

// ---------------------------------------------------------------------------
// Encode options
// ---------------------------------------------------------------------------

/// Configuration for revision encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Chunk index parameters.
    pub index: IndexConfig,
    /// Compare candidate bytes before extending a match, instead of trusting
    /// the chunk hash.
    pub verify_candidates: bool,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while writing a revision.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// High-level encode
// ---------------------------------------------------------------------------

/// Encode a revision from `old` to `new`, appending it to `output`.
///
/// An empty `new` produces an empty revision.
pub fn encode(old: &[u8], new: &[u8], output: &mut Vec<u8>) -> Result<RevisionStats, EncodeError> {
    encode_with_options(old, new, output, &EncodeOptions::default())
}

/// Encode with custom options.
pub fn encode_with_options(
    old: &[u8],
    new: &[u8],
    output: &mut Vec<u8>,
    opts: &EncodeOptions,
) -> Result<RevisionStats, EncodeError> {
    output.reserve(new.len() / 8);
    encode_to(output, old, new, opts)
}

/// Encode a revision from `old` to `new`, writing it to `writer`.
pub fn encode_to<W: Write>(
    writer: &mut W,
    old: &[u8],
    new: &[u8],
    opts: &EncodeOptions,
) -> Result<RevisionStats, EncodeError> {
    let engine = MatchEngine::new(old, opts.index, opts.verify_candidates);
    let mut out = RevisionWriter::new(writer);

    for inst in engine.instructions(new) {
        out.push(&inst)?;
    }

    let written = out.bytes_written();
    let (_, stats) = out.finish()?;
    log::debug!(
        "encoded {} -> {} bytes against {} old bytes: {} copies ({} bytes), \
         {} literals ({} bytes), revision {} bytes",
        new.len(),
        stats.output_len(),
        old.len(),
        stats.copies,
        stats.copied_bytes,
        stats.literals,
        stats.literal_bytes,
        written
    );
    Ok(stats)
}

// ---------------------------------------------------------------------------
// High-level decode
// ---------------------------------------------------------------------------

/// Decode a revision, reconstructing the new content.
pub fn decode(old: &[u8], revision: &[u8]) -> Result<Vec<u8>, DecodeError> {
    decoder::decode_memory(revision, old)
}

/// Decode a revision and write the reconstructed content to `writer`.
///
/// Nothing is written unless the whole revision decodes. Returns the number
/// of bytes written.
pub fn decode_to<W: Write>(
    writer: &mut W,
    old: &[u8],
    revision: &[u8],
) -> Result<u64, DecodeError> {
    let output = decoder::decode_memory(revision, old)?;
    writer.write_all(&output)?;
    Ok(output.len() as u64)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
