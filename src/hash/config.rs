// Chunk index configuration.
//
// The chunk width and bucket count only influence which matches the
// encoder finds. Neither is recorded in the revision stream, so a stream
// produced with any configuration decodes the same way.

/// Width of the matching unit, in bytes.
pub const CHUNK_SIZE: usize = 8;

/// Number of buckets in the chunk index (prime, to spread djb2 values).
pub const TABLE_SIZE: usize = 10_007;

/// Index configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexConfig {
    /// Chunk width in bytes. Must be at least 1.
    pub chunk_size: usize,
    /// Bucket count. Must be at least 1.
    pub table_size: usize,
}

impl IndexConfig {
    /// Clamp both fields to their minimum legal value.
    pub fn normalized(self) -> Self {
        Self {
            chunk_size: self.chunk_size.max(1),
            table_size: self.table_size.max(1),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            table_size: TABLE_SIZE,
        }
    }
}
