// Greedy longest-match search over the chunk index.
//
// The scan walks the new content left to right:
//   1. Look up the chunk at the cursor in the old-content index.
//   2. Extend every candidate forward byte-by-byte; keep the longest, first
//      candidate winning ties (bucket order == ascending old offset).
//   3. A non-empty best match becomes a COPY and the cursor jumps past it.
//   4. Otherwise bytes accumulate into a LITERAL until the chunk at the
//      cursor has candidates again. The literal always takes at least one
//      byte, so a hash collision that extends to zero length cannot stall
//      the scan.
//
// Candidates are compared by hash only unless `verify` is set. Extension
// stops at the first differing byte either way, so a false candidate can
// shorten a match but never corrupt one.

use super::config::IndexConfig;
use super::table::ChunkIndex;
use crate::revision::Instruction;

// ---------------------------------------------------------------------------
// Match result
// ---------------------------------------------------------------------------

/// A run of new content found in the old content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    /// Offset in the old content where the run starts.
    pub old_pos: usize,
    /// Length of the run.
    pub length: usize,
}

/// Number of leading bytes `s1` and `s2` have in common.
///
/// Compares eight bytes at a time, then finishes byte by byte.
#[inline]
pub fn forward_match(s1: &[u8], s2: &[u8]) -> usize {
    let n = s1.len().min(s2.len());
    let (s1, s2) = (&s1[..n], &s2[..n]);

    let mut i = 0;
    for (a, b) in s1.chunks_exact(8).zip(s2.chunks_exact(8)) {
        if a != b {
            break;
        }
        i += 8;
    }
    i + s1[i..]
        .iter()
        .zip(&s2[i..])
        .take_while(|(a, b)| a == b)
        .count()
}

// ---------------------------------------------------------------------------
// MatchEngine
// ---------------------------------------------------------------------------

/// Chunk index over old content plus the greedy match search.
///
/// The index is built once in [`new`](Self::new) and can serve any number
/// of scans over different new contents.
pub struct MatchEngine<'o> {
    old: &'o [u8],
    index: ChunkIndex,
    verify: bool,
}

impl<'o> MatchEngine<'o> {
    /// Index `old` with `cfg`.
    ///
    /// With `verify` set, candidates whose bytes differ from the query chunk
    /// are discarded before extension.
    pub fn new(old: &'o [u8], cfg: IndexConfig, verify: bool) -> Self {
        Self {
            old,
            index: ChunkIndex::with_config(old, cfg),
            verify,
        }
    }

    /// The underlying chunk index.
    pub fn index(&self) -> &ChunkIndex {
        &self.index
    }

    /// The chunk of `new` starting at `pos`, shortened at the end of input.
    #[inline]
    fn chunk_at<'n>(&self, new: &'n [u8], pos: usize) -> &'n [u8] {
        let end = pos.saturating_add(self.index.chunk_size()).min(new.len());
        &new[pos..end]
    }

    /// Candidate old offsets for `chunk`.
    fn candidates<'c>(&'c self, chunk: &'c [u8]) -> impl Iterator<Item = usize> + 'c {
        let old = self.old;
        let verify = self.verify;
        self.index
            .lookup(chunk)
            .filter(move |&pos| !verify || old.get(pos..pos + chunk.len()) == Some(chunk))
    }

    /// Whether the chunk of `new` at `pos` has any candidate.
    #[inline]
    fn has_candidates(&self, new: &[u8], pos: usize) -> bool {
        let chunk = self.chunk_at(new, pos);
        self.candidates(chunk).next().is_some()
    }

    /// Longest run of `new[pos..]` found in the old content.
    ///
    /// Returns `None` if there are no candidates or every candidate extends
    /// to zero bytes.
    pub fn longest_match(&self, new: &[u8], pos: usize) -> Option<Match> {
        let chunk = self.chunk_at(new, pos);
        let target = &new[pos..];
        let mut best: Option<Match> = None;

        for old_pos in self.candidates(chunk) {
            let length = forward_match(&self.old[old_pos..], target);
            if length > best.map_or(0, |m| m.length) {
                best = Some(Match { old_pos, length });
            }
        }
        best
    }

    /// Lazily produce the instructions that rebuild `new`.
    pub fn instructions<'a>(&'a self, new: &'a [u8]) -> Instructions<'a> {
        Instructions {
            engine: self,
            new,
            pos: 0,
        }
    }

    /// Collect the instructions that rebuild `new`.
    pub fn find_matches<'a>(&'a self, new: &'a [u8]) -> Vec<Instruction<'a>> {
        self.instructions(new).collect()
    }
}

// ---------------------------------------------------------------------------
// Instruction iterator
// ---------------------------------------------------------------------------

/// Iterator over the instructions for one new content.
///
/// Copies never read past the old content and literals are never empty.
pub struct Instructions<'a> {
    engine: &'a MatchEngine<'a>,
    new: &'a [u8],
    pos: usize,
}

impl Instructions<'_> {
    /// Position in the new content covered so far.
    pub fn position(&self) -> usize {
        self.pos
    }
}

impl<'a> Iterator for Instructions<'a> {
    type Item = Instruction<'a>;

    fn next(&mut self) -> Option<Instruction<'a>> {
        let new = self.new;
        if self.pos >= new.len() {
            return None;
        }

        if let Some(m) = self.engine.longest_match(new, self.pos) {
            self.pos += m.length;
            return Some(Instruction::Copy {
                offset: m.old_pos,
                len: m.length,
            });
        }

        let start = self.pos;
        self.pos += 1;
        // Past this point only short chunks remain and none can match.
        let last_full = new.len().saturating_sub(self.engine.index.chunk_size());
        while self.pos < new.len() {
            if self.pos > last_full {
                self.pos = new.len();
                break;
            }
            if self.engine.has_candidates(new, self.pos) {
                break;
            }
            self.pos += 1;
        }
        Some(Instruction::Literal(&new[start..self.pos]))
    }
}

impl std::iter::FusedIterator for Instructions<'_> {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(old: &[u8], new: &[u8]) -> Vec<(bool, usize, usize)> {
        let engine = MatchEngine::new(old, IndexConfig::default(), false);
        engine
            .find_matches(new)
            .into_iter()
            .map(|inst| match inst {
                Instruction::Copy { offset, len } => (true, offset, len),
                Instruction::Literal(data) => {
                    let start = data.as_ptr() as usize - new.as_ptr() as usize;
                    (false, start, data.len())
                }
            })
            .collect()
    }

    #[test]
    fn forward_match_lengths() {
        assert_eq!(forward_match(b"", b"abc"), 0);
        assert_eq!(forward_match(b"abc", b"abd"), 2);
        assert_eq!(forward_match(b"abcdefghijk", b"abcdefghijk"), 11);
        assert_eq!(forward_match(b"abcdefghijX", b"abcdefghijY"), 10);
        assert_eq!(forward_match(b"abcXefghijk", b"abcdefghijk"), 3);
        assert_eq!(forward_match(b"abcdefgh", b"abcdefghijk"), 8);
    }

    #[test]
    fn empty_new_yields_nothing() {
        assert!(matches(b"0123456789", b"").is_empty());
        assert!(matches(b"", b"").is_empty());
    }

    #[test]
    fn identical_content_is_one_copy() {
        let data = b"The quick brown fox jumps over the lazy dog.";
        assert_eq!(matches(data, data), vec![(true, 0, data.len())]);
    }

    #[test]
    fn short_old_content_gives_literal_only() {
        assert_eq!(matches(b"AAAA", b"AAAABBBB"), vec![(false, 0, 8)]);
    }

    #[test]
    fn short_new_content_is_literal() {
        assert_eq!(matches(b"0123456789", b"0123"), vec![(false, 0, 4)]);
    }

    #[test]
    fn empty_old_content_is_one_literal() {
        assert_eq!(matches(b"", b"hello, world"), vec![(false, 0, 12)]);
    }

    #[test]
    fn edit_in_the_middle() {
        let old = b"Hello, world! This is a test of the delta engine.";
        let new = b"Hello, earth! This is a test of the delta engine.";
        let got = matches(old, new);
        // "Hello, " is 7 bytes, too short to index; the edit region becomes
        // one literal, the shared tail one copy.
        assert_eq!(got.first(), Some(&(false, 0, got[0].2)));
        let (is_copy, offset, len) = *got.last().unwrap();
        assert!(is_copy);
        assert_eq!(offset + len, old.len());
        let covered: usize = got.iter().map(|g| g.2).sum();
        assert_eq!(covered, new.len());
    }

    #[test]
    fn tie_break_prefers_first_inserted() {
        let old = b"abcdefgh--abcdefgh";
        assert_eq!(matches(old, b"abcdefgh"), vec![(true, 0, 8)]);
    }

    #[test]
    fn longest_candidate_wins() {
        // Second occurrence extends further.
        let old = b"abcdefghX-abcdefghYZ";
        assert_eq!(matches(old, b"abcdefghYZ"), vec![(true, 10, 10)]);
    }

    #[test]
    fn literal_stops_where_a_match_begins() {
        let old = b"0123456789abcdef";
        let new = b"xyz0123456789abcdef";
        assert_eq!(matches(old, new), vec![(false, 0, 3), (true, 0, 16)]);
    }

    #[test]
    fn hash_collision_shortens_copy() {
        // djb2("aaaaaab@") == djb2("aaaaaaaa"): the false candidate extends
        // six bytes before diverging.
        assert_eq!(
            matches(b"aaaaaaaa", b"aaaaaab@"),
            vec![(true, 0, 6), (false, 6, 2)]
        );
    }

    #[test]
    fn zero_length_collision_still_progresses() {
        // djb2("b@aaaaaa") == djb2("aaaaaaaa") but the first byte differs.
        assert_eq!(matches(b"aaaaaaaa", b"b@aaaaaa"), vec![(false, 0, 8)]);
        assert_eq!(
            matches(b"aaaaaaaa", b"b@aaaaaaaaaaaaaa"),
            vec![(false, 0, 2), (true, 0, 8), (false, 10, 6)]
        );
    }

    #[test]
    fn verified_candidates_skip_collisions() {
        let engine = MatchEngine::new(b"aaaaaaaa", IndexConfig::default(), true);
        let got = engine.find_matches(b"aaaaaab@");
        assert_eq!(got, vec![Instruction::Literal(b"aaaaaab@")]);
    }

    #[test]
    fn longest_match_none_without_candidates() {
        let engine = MatchEngine::new(b"0123456789", IndexConfig::default(), false);
        assert_eq!(engine.longest_match(b"zzzzzzzz", 0), None);
        assert_eq!(
            engine.longest_match(b"--01234567", 2),
            Some(Match {
                old_pos: 0,
                length: 8
            })
        );
    }

    #[test]
    fn copies_stay_in_bounds() {
        let old: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let mut new = old.clone();
        new.extend_from_slice(&old[..300]);
        new[500] ^= 0xFF;
        let engine = MatchEngine::new(&old, IndexConfig::default(), false);
        let mut rebuilt = Vec::new();
        for inst in engine.instructions(&new) {
            match inst {
                Instruction::Copy { offset, len } => {
                    assert!(len > 0);
                    assert!(offset + len <= old.len());
                    rebuilt.extend_from_slice(&old[offset..offset + len]);
                }
                Instruction::Literal(data) => {
                    assert!(!data.is_empty());
                    rebuilt.extend_from_slice(data);
                }
            }
        }
        assert_eq!(rebuilt, new);
    }

    #[test]
    fn smaller_chunk_size_finds_short_matches() {
        let cfg = IndexConfig {
            chunk_size: 4,
            table_size: 101,
        };
        let engine = MatchEngine::new(b"AAAA", cfg, false);
        assert_eq!(
            engine.find_matches(b"AAAABBBB"),
            vec![
                Instruction::Copy { offset: 0, len: 4 },
                Instruction::Literal(b"BBBB")
            ]
        );
    }
}
