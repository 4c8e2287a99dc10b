#![no_main]

use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

use gcms_align::mzxml::{parse_duration_minutes, MzXmlReader};

fuzz_target!(|data: &[u8]| {
    // Malformed input must come back as an error, never a panic
    let mut reader = MzXmlReader::new(Cursor::new(data));
    for _ in 0..1000 {
        match reader.next_scan() {
            Ok(Some(scan)) => {
                assert_eq!(scan.mz.len(), scan.intensity.len());
            }
            Ok(None) | Err(_) => break,
        }
    }

    if let Ok(text) = std::str::from_utf8(data) {
        let _ = parse_duration_minutes(text);
    }
});
