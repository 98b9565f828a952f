//! Human-readable stack dumps.
//!
//! Layout:
//! ```text
//! ===========================
//! | Stack [0x...] :
//! |----------------
//! | Current status = 0
//! |----------------            (verbosity >= 1 from here)
//! | Capacity         = 16
//! | ...
//! |   {
//! | l   feedfacecafebee9       left envelope words
//! | *   10                     live elements
//! |     fafafafa               unused slots
//! | r   feedfacecafebee8       right envelope words
//! |  }
//! ===========================
//! ```
//! Rendering never touches stack state; the stack builds a [`DumpView`]
//! snapshot and this module formats it.

use std::fmt::{self, Write};

use crate::alloc::BufferState;
use crate::canary::CanaryWord;
use crate::poison::DUMP_ELIDE_THRESHOLD;
use crate::status::Status;

/// Delimiter line framing every dump and report.
pub const LOG_DELIM: &str = "===========================";

/// Unused slots printed before and after the ellipsis of an elided tail.
const ELIDED_HEAD: usize = 3;
const ELIDED_TAIL: usize = 2;

/// Read-only snapshot of everything a dump shows.
#[derive(Debug, Clone, PartialEq)]
pub struct DumpView {
    pub stack_addr: usize,
    pub state: BufferState,
    pub status: Status,
    pub verbosity: u8,
    pub capacity: usize,
    /// Allocator-reported capacity, when OS checks can query it.
    pub real_capacity: Option<usize>,
    pub len: usize,
    pub buffer_addr: usize,
    pub data_addr: usize,
    pub elem_size: usize,
    pub struct_checksum: Option<u64>,
    pub data_checksum: Option<u64>,
    /// `None` when the data region is not safe to read.
    pub contents: Option<DumpContents>,
}

/// Buffer contents, decoded by the stack.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DumpContents {
    pub left_canary: Vec<CanaryWord>,
    /// Live elements, formatted.
    pub live: Vec<String>,
    /// Unused slots as hex bytes.
    pub unused: Vec<String>,
    /// Every unused slot still carries the unused poison.
    pub tail_poisoned: bool,
    pub right_canary: Vec<CanaryWord>,
}

/// Render a dump.
#[must_use]
pub fn render(view: &DumpView) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = render_into(&mut out, view);
    out
}

/// Render a dump preceded by a one-line message, as emitted on faults.
#[must_use]
pub fn render_report(message: &str, view: &DumpView) -> String {
    let mut out = format!("{LOG_DELIM}\n| {message}\n");
    let _ = render_into(&mut out, view);
    out
}

/// Hex rendering of one slot's bytes, in memory order.
#[must_use]
pub fn hex_slot(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
}

fn render_into(out: &mut String, view: &DumpView) -> fmt::Result {
    writeln!(out, "{LOG_DELIM}")?;
    writeln!(out, "| Stack [{:#x}] :", view.stack_addr)?;
    writeln!(out, "|----------------")?;
    writeln!(out, "| Current status = {}", view.status.bits())?;
    for label in view.status.labels() {
        writeln!(out, "| {label}")?;
    }

    if view.verbosity >= 1 {
        writeln!(out, "|----------------")?;
        writeln!(out, "| Buffer state     = {}", view.state.label())?;
        writeln!(out, "| Capacity         = {}", view.capacity)?;
        if let Some(real) = view.real_capacity {
            writeln!(out, "| Real capacity    = {real}")?;
        }
        writeln!(out, "| Len              = {}", view.len)?;
        writeln!(out, "| Data wrapper ptr = {:#x}", view.buffer_addr)?;
        writeln!(out, "| Data ptr         = {:#x}", view.data_addr)?;
        writeln!(out, "| Elem size        = {}", view.elem_size)?;
        if let Some(hash) = view.struct_checksum {
            writeln!(out, "| Struct hash      = {hash:#x}")?;
        }
        if let Some(hash) = view.data_checksum {
            writeln!(out, "| Data hash        = {hash:#x}")?;
        }
        writeln!(out, "|   {{")?;
        match &view.contents {
            Some(contents) => render_contents(out, contents)?,
            None => writeln!(out, "|     <data region unreadable>")?,
        }
        writeln!(out, "|  }}")?;
    }
    writeln!(out, "{LOG_DELIM}")
}

fn render_contents(out: &mut String, contents: &DumpContents) -> fmt::Result {
    for word in &contents.left_canary {
        writeln!(out, "| l   {word:x}")?;
    }
    for elem in &contents.live {
        writeln!(out, "| *   {elem}")?;
    }
    let unused = &contents.unused;
    if contents.tail_poisoned && unused.len() > DUMP_ELIDE_THRESHOLD {
        for slot in &unused[..ELIDED_HEAD] {
            writeln!(out, "|     {slot}")?;
        }
        writeln!(out, "|     ...")?;
        for slot in &unused[unused.len() - ELIDED_TAIL..] {
            writeln!(out, "|     {slot}")?;
        }
    } else {
        for slot in unused {
            writeln!(out, "|     {slot}")?;
        }
    }
    for word in &contents.right_canary {
        writeln!(out, "| r   {word:x}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canary::{LEFT_CANARY, RIGHT_CANARY};

    fn view(unused: usize, tail_poisoned: bool) -> DumpView {
        DumpView {
            stack_addr: 0x1000,
            state: BufferState::Live,
            status: Status::OK,
            verbosity: 2,
            capacity: 2 + unused,
            real_capacity: Some(2 + unused),
            len: 2,
            buffer_addr: 0x2000,
            data_addr: 0x2018,
            elem_size: 4,
            struct_checksum: Some(0xAB),
            data_checksum: None,
            contents: Some(DumpContents {
                left_canary: vec![LEFT_CANARY; 3],
                live: vec!["10".into(), "11".into()],
                unused: vec!["fafafafa".into(); unused],
                tail_poisoned,
                right_canary: vec![RIGHT_CANARY; 3],
            }),
        }
    }

    #[test]
    fn full_layout() {
        let text = render(&view(2, true));
        assert!(text.starts_with(LOG_DELIM));
        assert!(text.ends_with(&format!("{LOG_DELIM}\n")));
        assert!(text.contains("| Current status = 0\n"));
        assert!(text.contains("| l   feedfacecafebee9\n"));
        assert!(text.contains("| *   11\n"));
        assert!(text.contains("| r   feedfacecafebee8\n"));
        assert!(text.contains("| Struct hash      = 0xab\n"));
        assert!(!text.contains("Data hash"));
        assert_eq!(text.matches("|     fafafafa").count(), 2);
    }

    #[test]
    fn long_poisoned_tail_is_elided() {
        let text = render(&view(20, true));
        assert_eq!(text.matches("|     fafafafa").count(), 5);
        assert!(text.contains("|     ...\n"));
    }

    #[test]
    fn dirty_tail_is_printed_in_full() {
        let text = render(&view(20, false));
        assert_eq!(text.matches("|     fafafafa").count(), 20);
        assert!(!text.contains("..."));
    }

    #[test]
    fn verbosity_zero_prints_status_only() {
        let mut v = view(2, true);
        v.verbosity = 0;
        v.status = Status::BAD_DATA_HASH | Status::LEFT_DATA_CANARY;
        let text = render(&v);
        assert!(text.contains("| Left data canary corrupted\n"));
        assert!(text.contains("| Bad data hash, stack data may be corrupted\n"));
        assert!(!text.contains("Capacity"));
        assert!(!text.contains("| *"));
    }

    #[test]
    fn unreadable_region_is_marked() {
        let mut v = view(2, true);
        v.contents = None;
        assert!(render(&v).contains("<data region unreadable>"));
    }

    #[test]
    fn report_carries_message() {
        let text = render_report("Problems found during healthcheck!", &view(0, true));
        assert!(text.starts_with(&format!("{LOG_DELIM}\n| Problems found during healthcheck!\n")));
    }

    #[test]
    fn hex_slot_is_memory_order() {
        assert_eq!(hex_slot(&[0xFA, 0x01, 0x00]), "fa0100");
    }
}
