// Chunk index over the old content.
//
// Every chunk-wide window of the old content is hashed with djb2 and
// appended to bucket `hash % table_size` together with its offset. Buckets
// are append-only, so offsets within a bucket stay in ascending order and
// the encoder's first-best tie-break prefers the earliest occurrence.
//
// Lookups compare the stored full 64-bit hash, not the bytes. Two distinct
// chunks sharing a full hash produce a false candidate.

use super::config::IndexConfig;
use super::djb2::djb2;

/// One indexed chunk: its full hash and where it starts in the old content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Entry {
    hash: u64,
    pos: usize,
}

/// Hash index of every chunk in a byte buffer.
#[derive(Debug)]
pub struct ChunkIndex {
    buckets: Vec<Vec<Entry>>,
    cfg: IndexConfig,
    entries: usize,
}

impl ChunkIndex {
    /// Index every chunk of `content` using the default configuration.
    pub fn build(content: &[u8]) -> Self {
        Self::with_config(content, IndexConfig::default())
    }

    /// Index every chunk of `content`.
    ///
    /// Content shorter than one chunk yields an empty index.
    pub fn with_config(content: &[u8], cfg: IndexConfig) -> Self {
        let cfg = cfg.normalized();
        let mut buckets = vec![Vec::new(); cfg.table_size];
        let mut entries = 0usize;

        for (pos, chunk) in content.windows(cfg.chunk_size).enumerate() {
            let hash = djb2(chunk);
            buckets[bucket_of(hash, cfg.table_size)].push(Entry { hash, pos });
            entries += 1;
        }

        log::debug!(
            "chunk index: {entries} chunks of {} bytes in {} buckets",
            cfg.chunk_size,
            cfg.table_size
        );

        Self {
            buckets,
            cfg,
            entries,
        }
    }

    /// Offsets whose chunk hash equals the hash of `chunk`, in insertion order.
    ///
    /// A chunk whose length differs from the configured chunk width never
    /// matches.
    pub fn lookup(&self, chunk: &[u8]) -> Candidates<'_> {
        if chunk.len() != self.cfg.chunk_size || self.entries == 0 {
            return Candidates {
                entries: (&[] as &[Entry]).iter(),
                hash: 0,
            };
        }
        let hash = djb2(chunk);
        Candidates {
            entries: self.buckets[bucket_of(hash, self.cfg.table_size)].iter(),
            hash,
        }
    }

    /// Whether any indexed chunk has the same hash as `chunk`.
    #[inline]
    pub fn contains(&self, chunk: &[u8]) -> bool {
        self.lookup(chunk).next().is_some()
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.entries
    }

    /// Whether the index holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Configured chunk width.
    pub fn chunk_size(&self) -> usize {
        self.cfg.chunk_size
    }

    /// Bucket count.
    pub fn table_size(&self) -> usize {
        self.cfg.table_size
    }
}

#[inline(always)]
fn bucket_of(hash: u64, table_size: usize) -> usize {
    (hash % table_size as u64) as usize
}

/// Iterator over candidate offsets for one lookup.
#[derive(Debug, Clone)]
pub struct Candidates<'a> {
    entries: std::slice::Iter<'a, Entry>,
    hash: u64,
}

impl Iterator for Candidates<'_> {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        let hash = self.hash;
        self.entries.find(|e| e.hash == hash).map(|e| e.pos)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
