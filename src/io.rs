// File-level I/O helpers for revision encoding/decoding.
//
// Provides `encode_file()`, `decode_file()` and `verify_roundtrip()`
// convenience functions around the in-memory engine. Inputs are read fully
// into memory; outputs go through a `BufWriter`. Optionally computes
// SHA-256 digests of the content (feature-gated behind `file-io`).

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

#[cfg(feature = "file-io")]
use sha2::Digest;

use crate::engine::{self, EncodeError, EncodeOptions};
use crate::revision::decoder::{self, DecodeError};
use crate::revision::instruction::RevisionStats;

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Statistics returned by `encode_file()`.
#[derive(Debug, Clone)]
pub struct EncodeStats {
    /// Old file size in bytes.
    pub old_size: u64,
    /// New file size in bytes.
    pub new_size: u64,
    /// Revision output size in bytes.
    pub revision_size: u64,
    /// Instruction counts.
    pub instructions: RevisionStats,
    /// SHA-256 of the new file (if `file-io` feature is enabled).
    pub new_sha256: Option<[u8; 32]>,
}

/// Statistics returned by `decode_file()`.
#[derive(Debug, Clone)]
pub struct DecodeStats {
    /// Old file size in bytes.
    pub old_size: u64,
    /// Revision file size in bytes.
    pub revision_size: u64,
    /// Reconstructed output size in bytes.
    pub output_size: u64,
    /// Instruction counts.
    pub instructions: RevisionStats,
    /// SHA-256 of the reconstructed output (if `file-io` feature is enabled).
    pub output_sha256: Option<[u8; 32]>,
}

/// Result of `verify_roundtrip()`.
#[derive(Debug, Clone)]
pub struct VerifyStats {
    pub encode: EncodeStats,
    pub decode: DecodeStats,
    /// Whether the reconstructed file is byte-identical to the new file.
    pub identical: bool,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for file I/O operations.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// I/O error (file open, read, write).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Revision encoding error.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),
    /// Revision decoding error.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
    /// An output path names one of the other files taking part.
    #[error("output file {} must differ from the other files", .0.display())]
    PathConflict(PathBuf),
}

// ---------------------------------------------------------------------------
// Default buffer size
// ---------------------------------------------------------------------------

const BUF_SIZE: usize = 64 * 1024; // 64 KiB

#[cfg(feature = "file-io")]
fn sha256(data: &[u8]) -> Option<[u8; 32]> {
    Some(sha2::Sha256::digest(data).into())
}

#[cfg(not(feature = "file-io"))]
fn sha256(_data: &[u8]) -> Option<[u8; 32]> {
    None
}

// ---------------------------------------------------------------------------
// encode_file
// ---------------------------------------------------------------------------

/// Encode a revision between an old file and a new file, writing it to
/// `revision_path`.
pub fn encode_file(
    old_path: &Path,
    new_path: &Path,
    revision_path: &Path,
    opts: &EncodeOptions,
) -> Result<EncodeStats, IoError> {
    let old = std::fs::read(old_path)?;
    let new = std::fs::read(new_path)?;

    let revision_file = File::create(revision_path)?;
    let mut writer = CountingWriter::new(BufWriter::with_capacity(BUF_SIZE, revision_file));

    let instructions = engine::encode_to(&mut writer, &old, &new, opts)?;
    writer.flush()?;

    Ok(EncodeStats {
        old_size: old.len() as u64,
        new_size: new.len() as u64,
        revision_size: writer.count,
        instructions,
        new_sha256: sha256(&new),
    })
}

// ---------------------------------------------------------------------------
// decode_file
// ---------------------------------------------------------------------------

/// Decode a revision file against an old file, writing the result to
/// `output_path`.
///
/// The output file is only created once the whole revision has decoded.
pub fn decode_file(
    old_path: &Path,
    revision_path: &Path,
    output_path: &Path,
) -> Result<DecodeStats, IoError> {
    let old = std::fs::read(old_path)?;
    let revision = std::fs::read(revision_path)?;

    let mut output = Vec::new();
    let instructions = decoder::decode_into(&revision, &old, &mut output)?;

    let output_file = File::create(output_path)?;
    let mut writer = BufWriter::with_capacity(BUF_SIZE, output_file);
    writer.write_all(&output)?;
    writer.flush()?;

    Ok(DecodeStats {
        old_size: old.len() as u64,
        revision_size: revision.len() as u64,
        output_size: output.len() as u64,
        instructions,
        output_sha256: sha256(&output),
    })
}

// ---------------------------------------------------------------------------
// verify_roundtrip
// ---------------------------------------------------------------------------

/// Encode `new` against `old` into `revision`, decode it into `output`, and
/// compare `output` with `new`.
///
/// Both output paths must differ from every other path involved.
pub fn verify_roundtrip(
    old_path: &Path,
    new_path: &Path,
    revision_path: &Path,
    output_path: &Path,
    opts: &EncodeOptions,
) -> Result<VerifyStats, IoError> {
    if revision_path == old_path || revision_path == new_path {
        return Err(IoError::PathConflict(revision_path.to_path_buf()));
    }
    if output_path == old_path || output_path == new_path || output_path == revision_path {
        return Err(IoError::PathConflict(output_path.to_path_buf()));
    }

    let encode = encode_file(old_path, new_path, revision_path, opts)?;
    let decode = decode_file(old_path, revision_path, output_path)?;

    let identical = std::fs::read(new_path)? == std::fs::read(output_path)?;
    if !identical {
        log::warn!(
            "{} is not identical to {}",
            output_path.display(),
            new_path.display()
        );
    }

    Ok(VerifyStats {
        encode,
        decode,
        identical,
    })
}

// ---------------------------------------------------------------------------
// Counting writer
// ---------------------------------------------------------------------------

struct CountingWriter<W: Write> {
    inner: W,
    count: u64,
}

impl<W: Write> CountingWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner, count: 0 }
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
