#![no_main]
use chunkdelta::revision::decoder;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary revisions must only ever produce errors, never panics.
    let _ = decoder::decode_memory(data, &[]);

    if data.len() >= 2 {
        let split = data.len() / 2;
        let (old, revision) = data.split_at(split);
        if let Ok(out) = decoder::decode_memory(revision, old) {
            let stats = decoder::scan(revision).unwrap();
            assert_eq!(stats.output_len(), out.len() as u64);
        }
    }
});
