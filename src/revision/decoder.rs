// Revision decoder: instruction parsing and reconstruction.
//
// One left-to-right pass over the stream, no backtracking. Parsing stops
// at the first offending byte and the whole reconstruction is abandoned.
//
// `InstructionIterator` is the parser; `decode_memory` and `decode_into`
// drive it against old content.

use super::instruction::{COPY_SEPARATOR, Instruction, RevisionStats, TAG_COPY, TAG_LITERAL};

// ---------------------------------------------------------------------------
// Decoder error
// ---------------------------------------------------------------------------

/// Errors raised while parsing or applying a revision.
///
/// `pos` is the byte offset in the revision stream where the offending
/// instruction starts.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("unrecognized instruction tag {tag:#04x} at offset {pos}")]
    MalformedInstruction { pos: usize, tag: u8 },

    #[error("copy instruction at offset {pos} has {found:#04x} where ',' was expected")]
    MissingSeparator { pos: usize, found: u8 },

    #[error(
        "copy instruction at offset {pos} reads {len} bytes at {offset}, \
         old content is {old_len} bytes"
    )]
    OutOfBoundsCopy {
        pos: usize,
        offset: u64,
        len: u64,
        old_len: u64,
    },

    #[error("literal at offset {pos} has no closing delimiter {delimiter:#04x}")]
    UnterminatedLiteral { pos: usize, delimiter: u8 },

    #[error("stream ends inside the instruction at offset {pos}")]
    TruncatedInstruction { pos: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Instruction iterator
// ---------------------------------------------------------------------------

/// Lazy parser over a revision stream.
///
/// Copy instructions are bounds-checked against the old-content length
/// given to [`with_source_len`](Self::with_source_len); [`new`](Self::new)
/// only rejects values that do not fit in memory. The iterator is fused
/// after the first error.
pub struct InstructionIterator<'a> {
    stream: &'a [u8],
    pos: usize,
    limit: u64,
    failed: bool,
}

impl<'a> InstructionIterator<'a> {
    /// Parse `stream` without an old-content bound.
    pub fn new(stream: &'a [u8]) -> Self {
        Self::with_source_len(stream, usize::MAX)
    }

    /// Parse `stream`, rejecting copies that read past `old_len`.
    pub fn with_source_len(stream: &'a [u8], old_len: usize) -> Self {
        Self {
            stream,
            pos: 0,
            limit: old_len as u64,
            failed: false,
        }
    }

    /// Offset in the stream of the next instruction to be parsed.
    pub fn offset(&self) -> usize {
        self.pos
    }

    /// Consume a run of ASCII digits. An empty run parses as 0.
    /// Returns `None` if the value overflows `u64`.
    fn parse_decimal(&mut self) -> Option<u64> {
        let mut value: Option<u64> = Some(0);
        while let Some(&b) = self.stream.get(self.pos) {
            if !b.is_ascii_digit() {
                break;
            }
            value = value
                .and_then(|v| v.checked_mul(10))
                .and_then(|v| v.checked_add(u64::from(b - b'0')));
            self.pos += 1;
        }
        value
    }

    fn parse_copy(&mut self, start: usize) -> Result<Instruction<'a>, DecodeError> {
        let offset = self.parse_decimal();

        match self.stream.get(self.pos) {
            None => return Err(DecodeError::TruncatedInstruction { pos: start }),
            Some(&COPY_SEPARATOR) => self.pos += 1,
            Some(&found) => return Err(DecodeError::MissingSeparator { pos: start, found }),
        }

        let len = self.parse_decimal();

        let limit = self.limit;
        let out_of_bounds = |offset: Option<u64>, len: Option<u64>| DecodeError::OutOfBoundsCopy {
            pos: start,
            offset: offset.unwrap_or(u64::MAX),
            len: len.unwrap_or(u64::MAX),
            old_len: limit,
        };

        let (Some(off), Some(n)) = (offset, len) else {
            return Err(out_of_bounds(offset, len));
        };
        match off.checked_add(n) {
            Some(end) if end <= limit => {}
            _ => return Err(out_of_bounds(offset, len)),
        }
        // end <= limit <= usize::MAX, so both fit.
        let (Ok(offset), Ok(len)) = (usize::try_from(off), usize::try_from(n)) else {
            return Err(out_of_bounds(Some(off), Some(n)));
        };
        Ok(Instruction::Copy { offset, len })
    }

    fn parse_literal(&mut self, start: usize) -> Result<Instruction<'a>, DecodeError> {
        let Some(&delimiter) = self.stream.get(self.pos) else {
            return Err(DecodeError::TruncatedInstruction { pos: start });
        };
        self.pos += 1;

        let body = &self.stream[self.pos..];
        let Some(len) = body.iter().position(|&b| b == delimiter) else {
            return Err(DecodeError::UnterminatedLiteral {
                pos: start,
                delimiter,
            });
        };
        self.pos += len + 1;
        Ok(Instruction::Literal(&body[..len]))
    }
}

impl<'a> Iterator for InstructionIterator<'a> {
    type Item = Result<Instruction<'a>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let start = self.pos;
        let tag = *self.stream.get(start)?;
        self.pos += 1;

        let result = match tag {
            TAG_COPY => self.parse_copy(start),
            TAG_LITERAL => self.parse_literal(start),
            _ => Err(DecodeError::MalformedInstruction { pos: start, tag }),
        };
        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }
}

impl std::iter::FusedIterator for InstructionIterator<'_> {}

// ---------------------------------------------------------------------------
// Reconstruction
// ---------------------------------------------------------------------------

/// Reconstruct new content from `old` and a revision `stream`.
pub fn decode_memory(stream: &[u8], old: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut output = Vec::new();
    decode_into(stream, old, &mut output)?;
    Ok(output)
}

/// Reconstruct new content, appending it to `output`.
///
/// On error `output` is restored to its original length.
pub fn decode_into(
    stream: &[u8],
    old: &[u8],
    output: &mut Vec<u8>,
) -> Result<RevisionStats, DecodeError> {
    let base = output.len();
    let mut stats = RevisionStats::default();

    for inst in InstructionIterator::with_source_len(stream, old.len()) {
        let inst = match inst {
            Ok(inst) => inst,
            Err(e) => {
                output.truncate(base);
                log::debug!("revision rejected: {e}");
                return Err(e);
            }
        };
        log::trace!("apply {inst}");
        match inst {
            Instruction::Copy { offset, len } => {
                output.extend_from_slice(&old[offset..offset + len]);
            }
            Instruction::Literal(data) => output.extend_from_slice(data),
        }
        stats.record(&inst);
    }

    log::debug!(
        "decoded {} bytes from {} copies and {} literals",
        stats.output_len(),
        stats.copies,
        stats.literals
    );
    Ok(stats)
}

/// Validate the syntax of a revision and count its instructions without
/// reconstructing anything.
pub fn scan(stream: &[u8]) -> Result<RevisionStats, DecodeError> {
    let mut stats = RevisionStats::default();
    for inst in InstructionIterator::new(stream) {
        stats.record(&inst?);
    }
    Ok(stats)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
