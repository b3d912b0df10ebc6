//! Fuzz target for reduced-sample artifact reading.
//!
//! Artifacts may come from other machines or older builds; parsing must
//! never panic, only return an error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tr_bundle::SampleReader;

fuzz_target!(|data: &[u8]| {
    let _ = SampleReader::from_reader(data);
});
