// djb2 string hash over raw bytes.
//
// `h = h * 33 + byte`, seeded with 5381, wrapping at 64 bits. Values are
// only compared within a single encode call and are never written out.

/// djb2 seed value.
pub const DJB2_SEED: u64 = 5381;

/// Hash a chunk of bytes.
#[inline]
pub fn djb2(chunk: &[u8]) -> u64 {
    chunk.iter().fold(DJB2_SEED, |h, &b| {
        // (h << 5) + h == h * 33
        (h << 5).wrapping_add(h).wrapping_add(b as u64)
    })
}
