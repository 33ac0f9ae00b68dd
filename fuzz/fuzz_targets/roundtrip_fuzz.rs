#![no_main]
use chunkdelta::engine::{self, EncodeOptions};
use chunkdelta::hash::config::IndexConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }

    let chunk_size = 1 + (data[0] % 16) as usize;
    let verify_candidates = data[0] & 0x80 != 0;
    let split = 2 + (data[1] as usize % (data.len() - 2));
    let old = &data[2..split];
    let new = &data[split..];

    let opts = EncodeOptions {
        index: IndexConfig {
            chunk_size,
            table_size: 1 + data[1] as usize * 13,
        },
        verify_candidates,
    };

    let mut revision = Vec::new();
    engine::encode_with_options(old, new, &mut revision, &opts).unwrap();
    let decoded = engine::decode(old, &revision).unwrap();
    assert_eq!(decoded, new);
});
