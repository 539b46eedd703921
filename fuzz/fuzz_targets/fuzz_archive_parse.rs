#![no_main]

use libfuzzer_sys::fuzz_target;
use zipvault::{summarize, ArchiveReader};

fuzz_target!(|data: &[u8]| {
    // Smallest possible archive is a bare end record
    if data.len() < 22 {
        return;
    }

    // Parsing must fail cleanly on anything malformed
    let reader = match ArchiveReader::open(data) {
        Ok(r) => r,
        Err(_) => return,
    };

    let metadata = summarize(&reader);
    let _ = metadata.compression_ratio();

    // Decode every entry, with and without a password
    for entry in reader.entries() {
        let _ = reader.read_entry(entry, None);
        let _ = reader.read_entry(entry, Some("fuzz"));
    }

    let _ = reader.read_all(None);
});
