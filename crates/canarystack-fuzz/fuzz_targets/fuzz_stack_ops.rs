#![no_main]
use canarystack_membrane::{GuardedStack, LimitedAllocator, LogSink, StackConfig, StackError};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // First byte picks detectors and the allocator budget; the rest are ops.
    let Some((&mode, ops)) = data.split_first() else {
        return;
    };
    let mut config = if mode & 1 == 0 {
        StackConfig::full_debug()
    } else {
        StackConfig::release()
    };
    config.auto_shrink = mode & 2 != 0;
    config.verbosity = 0;
    let limit = if mode & 4 != 0 { 512 } else { usize::MAX };

    let Ok(mut stack) = GuardedStack::<u32, _>::constructed_in(
        config,
        LimitedAllocator::new(limit),
        LogSink::Null,
    ) else {
        return;
    };
    let mut model: Vec<u32> = Vec::new();

    for chunk in ops.chunks(2) {
        let arg = u32::from(chunk.get(1).copied().unwrap_or(0));
        match chunk[0] % 5 {
            0 | 1 => match stack.push(arg) {
                Ok(()) => model.push(arg),
                Err(StackError::AllocationFailed { .. }) => {}
                Err(err) => panic!("push failed: {err}"),
            },
            2 => assert_eq!(stack.pop().ok(), model.pop()),
            3 => {
                let capacity = model.len() + arg as usize % 8;
                match stack.reallocate(capacity) {
                    Ok(()) | Err(StackError::AllocationFailed { .. }) => {}
                    Err(err) => panic!("reallocate failed: {err}"),
                }
            }
            _ => {
                if !model.is_empty() {
                    let index = arg as usize % model.len();
                    assert_eq!(stack.get(index).ok(), Some(model[index]));
                }
            }
        }
        // Valid use alone must never raise a fault.
        assert!(stack.health_check().is_ok());
        assert_eq!(stack.len(), model.len());
    }
    assert_eq!(stack.destroy(), canarystack_membrane::Status::OK);
});
