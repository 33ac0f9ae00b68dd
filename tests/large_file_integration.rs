use chunkdelta::engine::{self, EncodeOptions};
use chunkdelta::io::{decode_file, encode_file, verify_roundtrip};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::io::Write;
use tempfile::NamedTempFile;

fn random_bytes(rng: &mut StdRng, len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    rng.fill_bytes(&mut buf);
    buf
}

/// Splice random edits into a copy of `old`: replacements, insertions and
/// deletions at random offsets.
fn mutate(rng: &mut StdRng, old: &[u8], edits: usize) -> Vec<u8> {
    let mut new = old.to_vec();
    for _ in 0..edits {
        let at = rng.random_range(0..new.len().max(1));
        match rng.random_range(0..3) {
            0 => {
                let end = (at + rng.random_range(1..64)).min(new.len());
                for b in &mut new[at..end] {
                    *b = rng.random();
                }
            }
            1 => {
                let len = rng.random_range(1..256);
                let insert = random_bytes(rng, len);
                new.splice(at..at, insert);
            }
            _ => {
                let end = (at + rng.random_range(1..256)).min(new.len());
                new.drain(at..end);
            }
        }
    }
    new
}

#[test]
fn multi_mb_file_roundtrip() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let old_data = random_bytes(&mut rng, 4 * 1024 * 1024);
    let new_data = mutate(&mut rng, &old_data, 200);

    let mut old = NamedTempFile::new().unwrap();
    let mut new = NamedTempFile::new().unwrap();
    let revision = NamedTempFile::new().unwrap();
    let output = NamedTempFile::new().unwrap();
    old.write_all(&old_data).unwrap();
    new.write_all(&new_data).unwrap();

    let enc = encode_file(
        old.path(),
        new.path(),
        revision.path(),
        &EncodeOptions::default(),
    )
    .unwrap();
    assert_eq!(enc.new_size, new_data.len() as u64);
    assert!(
        enc.revision_size < enc.new_size / 4,
        "revision {} vs new {}",
        enc.revision_size,
        enc.new_size
    );
    assert_eq!(enc.instructions.output_len(), new_data.len() as u64);

    let dec = decode_file(old.path(), revision.path(), output.path()).unwrap();
    assert_eq!(dec.output_size, new_data.len() as u64);
    assert_eq!(dec.output_sha256, enc.new_sha256);
    assert_eq!(std::fs::read(output.path()).unwrap(), new_data);
}

#[test]
fn verify_roundtrip_on_random_files() {
    let mut rng = StdRng::seed_from_u64(42);
    let old_data = random_bytes(&mut rng, 256 * 1024);
    let new_data = mutate(&mut rng, &old_data, 50);

    let mut old = NamedTempFile::new().unwrap();
    let mut new = NamedTempFile::new().unwrap();
    let revision = NamedTempFile::new().unwrap();
    let output = NamedTempFile::new().unwrap();
    old.write_all(&old_data).unwrap();
    new.write_all(&new_data).unwrap();

    let stats = verify_roundtrip(
        old.path(),
        new.path(),
        revision.path(),
        output.path(),
        &EncodeOptions {
            verify_candidates: true,
            ..Default::default()
        },
    )
    .unwrap();
    assert!(stats.identical);
    assert_eq!(stats.encode.instructions, stats.decode.instructions);
}

#[test]
#[ignore = "large input test is opt-in due runtime"]
fn sixty_four_mb_low_entropy_roundtrip() {
    let old: Vec<u8> = (0..64 * 1024 * 1024).map(|i| (i % 251) as u8).collect();
    let mut new = old.clone();
    for i in (0..new.len()).step_by(1024 * 1024) {
        new[i] = new[i].wrapping_add(7);
    }
    let mut revision = Vec::new();
    engine::encode(&old, &new, &mut revision).unwrap();
    assert_eq!(engine::decode(&old, &revision).unwrap(), new);
}

#[test]
fn edge_case_matrix() {
    let cases: Vec<(&[u8], &[u8])> = vec![
        (b"", b""),
        (b"", b"x"),
        (b"x", b""),
        (b"\0\0\0\0\0", b"\0\0\0\0\0"),
        (b"\0\0\0\0\0\0\0\0", b"\0\0\0\0\0\0\0\0\x01"),
        (b"////////", b"////;;;;////"),
        (b"#0,8+/x/", b"#0,8+/x/#0,8+/x/"),
    ];

    for (old, new) in cases {
        let mut revision = Vec::new();
        engine::encode(old, new, &mut revision).unwrap();
        let decoded = engine::decode(old, &revision).unwrap();
        assert_eq!(decoded, new);
    }
}
