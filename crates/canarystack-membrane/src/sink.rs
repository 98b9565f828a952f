//! Destination for the diagnostic text stream.

use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;

/// Where dumps and fault reports are written.
///
/// `Capture` keeps everything in memory; clones share the same buffer, so a
/// caller can keep one clone and hand another to a stack.
#[derive(Debug, Clone, Default)]
pub enum LogSink {
    #[default]
    Stdout,
    Stderr,
    Capture(Arc<Mutex<String>>),
    Null,
}

impl LogSink {
    /// A fresh in-memory sink.
    #[must_use]
    pub fn capture() -> Self {
        Self::Capture(Arc::new(Mutex::new(String::new())))
    }

    /// Write one block of text. Output errors are swallowed: diagnostics
    /// must never turn into a fault of their own.
    pub fn write_block(&self, text: &str) {
        match self {
            Self::Stdout => {
                let _ = std::io::stdout().lock().write_all(text.as_bytes());
            }
            Self::Stderr => {
                let _ = std::io::stderr().lock().write_all(text.as_bytes());
            }
            Self::Capture(buf) => buf.lock().push_str(text),
            Self::Null => {}
        }
    }

    /// Everything written so far to a capture sink.
    #[must_use]
    pub fn captured(&self) -> Option<String> {
        match self {
            Self::Capture(buf) => Some(buf.lock().clone()),
            _ => None,
        }
    }

    /// Drain a capture sink.
    pub fn take_captured(&self) -> Option<String> {
        match self {
            Self::Capture(buf) => Some(std::mem::take(&mut *buf.lock())),
            _ => None,
        }
    }

    /// Stable identity folded into the structural checksum: swapping the
    /// sink behind a stack's back changes the digest.
    #[must_use]
    pub fn identity(&self) -> u64 {
        match self {
            Self::Stdout => 1,
            Self::Stderr => 2,
            Self::Capture(buf) => Arc::as_ptr(buf) as usize as u64,
            Self::Null => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_clones_share_buffer() {
        let sink = LogSink::capture();
        let handle = sink.clone();
        sink.write_block("hello ");
        handle.write_block("world");
        assert_eq!(sink.captured().as_deref(), Some("hello world"));
        assert_eq!(sink.identity(), handle.identity());
    }

    #[test]
    fn distinct_captures_have_distinct_identity() {
        assert_ne!(LogSink::capture().identity(), LogSink::capture().identity());
        assert_ne!(LogSink::Stdout.identity(), LogSink::Stderr.identity());
    }

    #[test]
    fn take_drains() {
        let sink = LogSink::capture();
        sink.write_block("x");
        assert_eq!(sink.take_captured().as_deref(), Some("x"));
        assert_eq!(sink.captured().as_deref(), Some(""));
        assert_eq!(LogSink::Null.captured(), None);
    }
}
