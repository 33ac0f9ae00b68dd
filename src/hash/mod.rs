// Chunk hashing and match search for revision encoding.
//
// This module provides:
// - The djb2 chunk hash
// - The fixed-offset chunk index over old content
// - Greedy longest-match search producing COPY/LITERAL instructions
// - Index configuration (chunk width, bucket count)

pub mod config;
pub mod djb2;
pub mod matching;
pub mod table;
