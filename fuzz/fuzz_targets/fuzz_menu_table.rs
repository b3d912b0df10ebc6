//! Fuzz target for legacy menu-table parsing.
//!
//! Menu tables are hand-edited text; parsing must never panic, only skip
//! lines or return an error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tr_core::menu::load_menu_table;
use tr_core::trigger::TriggerRegistry;

fuzz_target!(|data: &[u8]| {
    let registry = TriggerRegistry::standard();
    let _ = load_menu_table(data, &registry);
});
