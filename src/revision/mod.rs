// Revision format: the instruction script that rebuilds new content from
// old content.
//
// # Modules
//
// - `instruction`: `Instruction`, `RevisionStats`, wire tag constants
// - `encoder`: instruction serialization and literal framing
// - `decoder`: streaming parser and reconstruction

pub mod decoder;
pub mod encoder;
pub mod instruction;

// Re-export key types for convenience.
pub use decoder::{DecodeError, InstructionIterator, decode_into, decode_memory, scan};
pub use encoder::{RevisionWriter, choose_delimiter, write_instruction};
pub use instruction::{
    ALTERNATE_DELIMITER, COPY_SEPARATOR, DEFAULT_DELIMITER, Instruction, RevisionStats, TAG_COPY,
    TAG_LITERAL,
};
