//! Fuzz target for rate-file JSON parsing.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tr_report::json::read_json;

fuzz_target!(|data: &[u8]| {
    let _ = read_json(data);
});
