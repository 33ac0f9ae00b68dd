use chunkdelta::engine::{self, EncodeOptions};
use chunkdelta::hash::config::IndexConfig;
use chunkdelta::revision::decoder::scan;

#[derive(Debug)]
struct Vector {
    name: String,
    old: Vec<u8>,
    new: Vec<u8>,
    revision: Vec<u8>,
}

fn hex_to_bytes(s: &str) -> Vec<u8> {
    let s = s.trim();
    if s.is_empty() {
        return Vec::new();
    }
    assert!(
        s.len().is_multiple_of(2),
        "hex string must have even length"
    );
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
        .collect()
}

fn load_vectors() -> Vec<Vector> {
    let manifest = include_str!("vectors/manifest.tsv");
    manifest
        .lines()
        .filter(|line| !line.trim().is_empty() && !line.starts_with('#'))
        .map(|line| {
            let parts: Vec<_> = line.split('|').collect();
            assert_eq!(parts.len(), 5, "invalid vector row: {line}");
            Vector {
                name: parts[0].to_string(),
                old: hex_to_bytes(parts[2]),
                new: hex_to_bytes(parts[3]),
                revision: hex_to_bytes(parts[4]),
            }
        })
        .collect()
}

fn encode(old: &[u8], new: &[u8], opts: &EncodeOptions) -> Vec<u8> {
    let mut out = Vec::new();
    engine::encode_with_options(old, new, &mut out, opts).unwrap();
    out
}

#[test]
fn vector_database_is_non_empty() {
    let vectors = load_vectors();
    assert!(!vectors.is_empty());
}

#[test]
fn encoder_output_is_stable_for_all_vectors() {
    for v in load_vectors() {
        let revision = encode(&v.old, &v.new, &EncodeOptions::default());
        assert_eq!(
            revision,
            v.revision,
            "vector {}: got {:?}",
            v.name,
            String::from_utf8_lossy(&revision)
        );
    }
}

#[test]
fn recorded_revisions_decode_for_all_vectors() {
    for v in load_vectors() {
        let decoded = engine::decode(&v.old, &v.revision)
            .unwrap_or_else(|e| panic!("vector {}: {e}", v.name));
        assert_eq!(decoded, v.new, "vector {}", v.name);
    }
}

#[test]
fn scan_totals_match_new_length() {
    for v in load_vectors() {
        let stats = scan(&v.revision).unwrap();
        assert_eq!(stats.output_len(), v.new.len() as u64, "vector {}", v.name);
    }
}

#[test]
fn roundtrip_all_vectors_across_configs() {
    for v in load_vectors() {
        for chunk_size in [1, 3, 8, 32] {
            for verify_candidates in [false, true] {
                let opts = EncodeOptions {
                    index: IndexConfig {
                        chunk_size,
                        table_size: 257,
                    },
                    verify_candidates,
                };
                let revision = encode(&v.old, &v.new, &opts);
                let decoded = engine::decode(&v.old, &revision).unwrap();
                assert_eq!(
                    decoded, v.new,
                    "vector {} chunk {chunk_size} verify {verify_candidates}",
                    v.name
                );
            }
        }
    }
}
