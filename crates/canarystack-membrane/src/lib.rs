//! Self-verifying dynamic-array stack.
//!
//! A LIFO container that keeps checking itself for memory corruption. The
//! detectors are redundant and independently switchable:
//! - **Canaries** (`canary`): sentinel words around the heap buffer and the
//!   control structure
//! - **Poisoning** (`poison`): recognizable byte patterns in unused and freed slots
//! - **Checksums** (`checksum`): CRC32 or BLAKE3 over the control fields and
//!   the whole data region
//! - **Pointer validation** (`ptr_validator`, `residency`): lifecycle tags plus
//!   an optional kernel residency probe
//! - **Capacity cross-check** (`alloc`): recorded capacity against the
//!   allocator's usable size
//!
//! Findings accumulate in a sticky [`Status`] bitset. Once a fault is seen,
//! every further operation is refused until the stack is reconstructed.
//!
//! ```
//! use canarystack_membrane::{GuardedStack, LogSink, StackConfig, Status};
//!
//! let mut stack: GuardedStack<i32> = GuardedStack::constructed_in(
//!     StackConfig::full_debug(),
//!     Default::default(),
//!     LogSink::Null,
//! )
//! .unwrap();
//! stack.push(10).unwrap();
//! assert_eq!(stack.pop(), Ok(10));
//! assert_eq!(stack.health_check(), Status::OK);
//! ```

#![deny(unsafe_code)]

pub mod alloc;
pub mod canary;
pub mod capacity;
pub mod checksum;
pub mod config;
pub mod dump;
pub mod element;
pub mod error;
pub mod metrics;
pub mod poison;
pub mod ptr_validator;
pub mod residency;
pub mod sink;
pub mod stack;
pub mod status;

pub use alloc::{BufferState, LimitedAllocator, RawAllocator, SystemAllocator};
pub use checksum::ChecksumKind;
pub use config::{DetectorProfile, StackConfig, detector_profile};
pub use element::Element;
pub use error::StackError;
pub use metrics::{MetricsSnapshot, StackMetrics, global_metrics};
pub use sink::LogSink;
pub use stack::GuardedStack;
pub use status::Status;
