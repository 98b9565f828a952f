#![no_main]
use canarystack_membrane::{GuardedStack, LogSink, StackConfig};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary damage must be detected or tolerated, never crash the checks.
    if data.len() < 4 {
        return;
    }
    let Ok(mut stack) =
        GuardedStack::<u64>::constructed_in(StackConfig::full_debug(), Default::default(), LogSink::Null)
    else {
        return;
    };
    for i in 0..u64::from(data[0] % 32) {
        let _ = stack.push(i);
    }

    for chunk in data[1..].chunks(3) {
        let value = chunk.get(2).copied().unwrap_or(0);
        match chunk[0] % 7 {
            0 => stack.inject_left_data_canary(value),
            1 => stack.inject_right_data_canary(value),
            2 => stack.inject_left_struct_canary(u64::from(value)),
            3 => stack.inject_right_struct_canary(u64::from(value)),
            4 => stack.inject_capacity(usize::from(chunk.get(1).copied().unwrap_or(0))),
            5 => stack.inject_len(usize::from(chunk.get(1).copied().unwrap_or(0))),
            _ => stack.inject_slot(usize::from(chunk.get(1).copied().unwrap_or(0)), value),
        }
        let status = stack.health_check();
        // Sticky: a second check never clears anything.
        assert!(stack.health_check().contains(status));
        let _ = stack.render_dump();
        let _ = stack.push(1);
        let _ = stack.pop();
    }
});
