#![no_main]

use libfuzzer_sys::fuzz_target;
use pagechat::extractor::{MAX_CONTENT_LENGTH, reader::reduce};

fuzz_target!(|data: &[u8]| {
    let html = String::from_utf8_lossy(data);
    let result = reduce(&html, "https://example.com/fuzz");

    assert!(result.content.chars().count() <= MAX_CONTENT_LENGTH);
    assert!(!result.content.contains("  "));
    assert!(!result.content.contains('\n'));
});
