#![no_main]
use libfuzzer_sys::fuzz_target;
use solaxd::engine::QueryMachine;
use solaxd::protocol::{LifetimeCounters, decode, decode_live_data};

fuzz_target!(|data: &[u8]| {
    // Any input is either a frame or a classified error, never a panic
    if let Ok(frame) = decode(data) {
        assert!(frame.to_bytes().is_ok());
        let _ = decode_live_data(&frame.payload, &mut LifetimeCounters::default());
    }

    // Feed the same bytes through every machine state
    let mut machine = QueryMachine::new(0x0A, 30);
    for chunk in data.chunks(32) {
        let _ = machine.step(chunk);
    }
});
