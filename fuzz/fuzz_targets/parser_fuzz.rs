#![no_main]
use chunkdelta::revision::decoder::InstructionIterator;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // The instruction parser is fused: after the first error it yields
    // nothing, and every offset it reports stays inside the stream.
    let mut iter = InstructionIterator::new(data);
    while let Some(item) = iter.next() {
        assert!(iter.offset() <= data.len());
        if item.is_err() {
            assert!(iter.next().is_none());
            break;
        }
    }

    let text = String::from_utf8_lossy(data);
    let args: Vec<String> = text
        .split_whitespace()
        .take(32)
        .map(str::to_string)
        .collect();
    chunkdelta::cli::fuzz_try_parse_args(&args);
});
