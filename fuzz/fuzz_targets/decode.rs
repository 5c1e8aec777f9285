#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(decoded) = mac_bookmark::decode(data) {
        let _ = decoded.bookmark.encode();
    }
});
