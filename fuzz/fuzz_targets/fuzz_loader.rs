#![no_main]

use libfuzzer_sys::fuzz_target;
use memory::StackEntry;
use vm::{load_bytes, VmConfig, VM};

// Any byte string must either be rejected by the loader or run to a halt or
// a fault under a step budget, never panic.
fuzz_target!(|data: &[u8]| {
    let Ok(image) = load_bytes(data) else {
        return;
    };
    let Some(entry) = image.entry() else {
        return;
    };
    let args: Vec<StackEntry> = entry.params.iter().map(|k| StackEntry::zero(*k)).collect();

    let config = VmConfig::default()
        .with_max_steps(Some(10_000))
        .with_heap_size(64 * 1024);
    let _ = VM::new(config).run(image, &args);
});
