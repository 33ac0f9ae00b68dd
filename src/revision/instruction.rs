// Revision instructions and wire-format constants.
//
// A revision is a flat sequence of two instruction kinds:
//
//   #<offset>,<length>          copy `length` bytes of old content at `offset`
//   +<d><payload><d>            literal payload framed by delimiter byte `d`
//
// There is no header, length prefix, or checksum.

use std::fmt;

/// Tag byte that opens a copy instruction.
pub const TAG_COPY: u8 = b'#';

/// Tag byte that opens a literal instruction.
pub const TAG_LITERAL: u8 = b'+';

/// Separator between the offset and length of a copy instruction.
pub const COPY_SEPARATOR: u8 = b',';

/// Literal delimiter used when the payload does not contain it.
pub const DEFAULT_DELIMITER: u8 = b'/';

/// Literal delimiter used when the payload contains [`DEFAULT_DELIMITER`].
pub const ALTERNATE_DELIMITER: u8 = b';';

/// One decoded or encoded instruction.
///
/// Literal payloads borrow from the buffer they were produced from: the new
/// content while encoding, the revision stream while decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction<'a> {
    /// Reproduce `len` bytes of old content starting at `offset`.
    Copy { offset: usize, len: usize },
    /// Raw bytes not sourced from old content. Never empty when encoded.
    Literal(&'a [u8]),
}

impl Instruction<'_> {
    /// Number of output bytes this instruction produces.
    #[inline]
    pub fn output_len(&self) -> usize {
        match self {
            Self::Copy { len, .. } => *len,
            Self::Literal(data) => data.len(),
        }
    }

    /// Whether this is a copy instruction.
    #[inline]
    pub fn is_copy(&self) -> bool {
        matches!(self, Self::Copy { .. })
    }
}

impl fmt::Display for Instruction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Copy { offset, len } => write!(f, "COPY    offset={offset} len={len}"),
            Self::Literal(data) => write!(
                f,
                "LITERAL len={} data={:?}",
                data.len(),
                String::from_utf8_lossy(&data[..data.len().min(32)])
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Instruction and byte counts for one revision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RevisionStats {
    /// Number of copy instructions.
    pub copies: u64,
    /// Number of literal instructions.
    pub literals: u64,
    /// Output bytes produced by copies.
    pub copied_bytes: u64,
    /// Output bytes produced by literals.
    pub literal_bytes: u64,
}

impl RevisionStats {
    /// Account for one instruction.
    pub fn record(&mut self, inst: &Instruction<'_>) {
        match inst {
            Instruction::Copy { len, .. } => {
                self.copies += 1;
                self.copied_bytes = self.copied_bytes.saturating_add(*len as u64);
            }
            Instruction::Literal(data) => {
                self.literals += 1;
                self.literal_bytes = self.literal_bytes.saturating_add(data.len() as u64);
            }
        }
    }

    /// Total reconstructed size. Saturates for unbounded scans.
    pub fn output_len(&self) -> u64 {
        self.copied_bytes.saturating_add(self.literal_bytes)
    }

    /// Total instruction count.
    pub fn instructions(&self) -> u64 {
        self.copies + self.literals
    }
}
