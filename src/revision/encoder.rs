// Revision encoder: instruction serialization.
//
// Converts `Instruction` values into the textual wire format. Match
// finding lives in `hash::matching`; this module only frames bytes.
//
// Literal framing uses `/` unless the payload contains `/`, in which case
// `;` is used. A payload containing both bytes cannot be framed by either,
// so it is written as consecutive literals, each holding at most one of
// the two delimiter candidates.

use std::io::{self, Write};

use super::instruction::{
    ALTERNATE_DELIMITER, COPY_SEPARATOR, DEFAULT_DELIMITER, Instruction, RevisionStats, TAG_COPY,
    TAG_LITERAL,
};

// ---------------------------------------------------------------------------
// Framing helpers
// ---------------------------------------------------------------------------

/// Pick the delimiter for a literal payload.
///
/// Returns `None` when the payload contains both candidates.
pub fn choose_delimiter(payload: &[u8]) -> Option<u8> {
    let has_default = payload.contains(&DEFAULT_DELIMITER);
    let has_alternate = payload.contains(&ALTERNATE_DELIMITER);
    match (has_default, has_alternate) {
        (false, _) => Some(DEFAULT_DELIMITER),
        (true, false) => Some(ALTERNATE_DELIMITER),
        (true, true) => None,
    }
}

/// Length of the longest prefix of `payload` that contains at most one of
/// the two delimiter candidates. Always at least 1 for a non-empty payload.
fn frameable_prefix(payload: &[u8]) -> usize {
    let mut seen_default = false;
    let mut seen_alternate = false;
    for (i, &b) in payload.iter().enumerate() {
        if b == DEFAULT_DELIMITER {
            if seen_alternate {
                return i;
            }
            seen_default = true;
        } else if b == ALTERNATE_DELIMITER {
            if seen_default {
                return i;
            }
            seen_alternate = true;
        }
    }
    payload.len()
}

/// Number of ASCII digits in the decimal form of `n`.
#[inline]
fn decimal_len(n: usize) -> usize {
    n.checked_ilog10().map_or(1, |d| d as usize + 1)
}

/// Write a copy instruction. Returns the number of bytes written.
pub fn write_copy<W: Write>(w: &mut W, offset: usize, len: usize) -> io::Result<usize> {
    write!(
        w,
        "{}{offset}{}{len}",
        TAG_COPY as char, COPY_SEPARATOR as char
    )?;
    Ok(2 + decimal_len(offset) + decimal_len(len))
}

/// Write a literal payload, splitting it when no single delimiter can frame
/// it. Empty payloads write nothing. Returns the number of bytes written.
pub fn write_literal<W: Write>(w: &mut W, payload: &[u8]) -> io::Result<usize> {
    let mut rest = payload;
    let mut written = 0usize;
    while !rest.is_empty() {
        let (piece, tail) = match choose_delimiter(rest) {
            Some(_) => (rest, &[][..]),
            None => {
                let cut = frameable_prefix(rest);
                log::debug!("literal holds both delimiters, splitting at {cut}");
                rest.split_at(cut)
            }
        };
        written += write_framed(w, piece)?;
        rest = tail;
    }
    Ok(written)
}

fn write_framed<W: Write>(w: &mut W, piece: &[u8]) -> io::Result<usize> {
    let delim = match choose_delimiter(piece) {
        Some(d) => d,
        None => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "literal piece contains both delimiters",
            ));
        }
    };
    w.write_all(&[TAG_LITERAL, delim])?;
    w.write_all(piece)?;
    w.write_all(&[delim])?;
    Ok(piece.len() + 3)
}

/// Write one instruction. Returns the number of bytes written.
pub fn write_instruction<W: Write>(w: &mut W, inst: &Instruction<'_>) -> io::Result<usize> {
    match *inst {
        Instruction::Copy { offset, len } => write_copy(w, offset, len),
        Instruction::Literal(data) => write_literal(w, data),
    }
}

// ---------------------------------------------------------------------------
// RevisionWriter
// ---------------------------------------------------------------------------

/// Serializes instructions to a writer while tracking stats.
///
/// # Example
/// ```
/// use chunkdelta::revision::{Instruction, RevisionWriter};
/// let mut w = RevisionWriter::new(Vec::new());
/// w.push(&Instruction::Copy { offset: 0, len: 16 }).unwrap();
/// w.push(&Instruction::Literal(b"tail")).unwrap();
/// let (out, stats) = w.finish().unwrap();
/// assert_eq!(out, b"#0,16+/tail/");
/// assert_eq!(stats.output_len(), 20);
/// ```
pub struct RevisionWriter<W: Write> {
    writer: W,
    stats: RevisionStats,
    bytes_written: u64,
}

impl<W: Write> RevisionWriter<W> {
    /// Wrap a writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            stats: RevisionStats::default(),
            bytes_written: 0,
        }
    }

    /// Serialize one instruction.
    pub fn push(&mut self, inst: &Instruction<'_>) -> io::Result<()> {
        let n = write_instruction(&mut self.writer, inst)?;
        log::trace!("emit {inst} ({n} bytes)");
        match *inst {
            // Count literals as they appear on the wire, after any split.
            Instruction::Literal(data) => {
                self.stats.literals += ((n - data.len()) / 3) as u64;
                self.stats.literal_bytes += data.len() as u64;
            }
            Instruction::Copy { .. } => self.stats.record(inst),
        }
        self.bytes_written += n as u64;
        Ok(())
    }

    /// Stats accumulated so far.
    pub fn stats(&self) -> &RevisionStats {
        &self.stats
    }

    /// Revision bytes written so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Flush and return the inner writer with the final stats.
    pub fn finish(mut self) -> io::Result<(W, RevisionStats)> {
        self.writer.flush()?;
        Ok((self.writer, self.stats))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
