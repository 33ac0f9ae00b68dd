//! Chunkdelta: chunk-index byte deltas with a compact textual revision format.
//!
//! The crate provides:
//! - A djb2 chunk index and greedy longest-match search (`hash`)
//! - The revision format: instructions, writer, and parser (`revision`)
//! - High-level encode/decode APIs (`engine`)
//! - File-oriented helpers (`io`)
//! - An optional CLI (`cli` feature)
//!
//! A revision is a sequence of `#offset,length` copies from the old content
//! and `+<d>bytes<d>` literals, where the delimiter `<d>` is `/` unless the
//! payload contains one, in which case `;` is used.
//!
//! # Quick Start
//!
//! ```
//! use chunkdelta::engine;
//!
//! let old = b"hello old world, hello old world";
//! let new = b"hello new world, hello old world";
//!
//! let mut revision = Vec::new();
//! engine::encode(old, new, &mut revision).unwrap();
//! let rebuilt = engine::decode(old, &revision).unwrap();
//! assert_eq!(rebuilt, new);
//! ```

pub mod engine;
pub mod hash;
pub mod io;
pub mod revision;

#[cfg(feature = "cli")]
pub mod cli;
