//! Debugger output channel.
//!
//! Debug builds forward every complete line to `tracing` on the
//! `nativebridge::debug` target. Release builds compile to a null sink.

use std::fmt;

pub const DEBUG_TARGET: &str = "nativebridge::debug";

/// `fmt::Write` sink for diagnostic dumps.
///
/// Text is buffered until a newline; a trailing partial line is emitted on
/// [`DebugStream::flush`] or drop.
#[derive(Debug, Default)]
pub struct DebugStream {
    #[cfg(debug_assertions)]
    line: String,
}

impl DebugStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether writes reach a subscriber in this build.
    pub const fn is_enabled() -> bool {
        cfg!(debug_assertions)
    }

    #[cfg(debug_assertions)]
    pub fn flush(&mut self) {
        if !self.line.is_empty() {
            tracing::debug!(target: DEBUG_TARGET, "{}", self.line);
            self.line.clear();
        }
    }

    #[cfg(not(debug_assertions))]
    pub fn flush(&mut self) {}

    /// Buffered partial line.
    #[cfg(debug_assertions)]
    pub fn pending(&self) -> &str {
        &self.line
    }

    #[cfg(not(debug_assertions))]
    pub fn pending(&self) -> &str {
        ""
    }
}

impl fmt::Write for DebugStream {
    #[cfg(debug_assertions)]
    fn write_str(&mut self, text: &str) -> fmt::Result {
        let mut rest = text;
        while let Some(end) = rest.find('\n') {
            self.line.push_str(&rest[..end]);
            tracing::debug!(target: DEBUG_TARGET, "{}", self.line);
            self.line.clear();
            rest = &rest[end + 1..];
        }
        self.line.push_str(rest);
        Ok(())
    }

    #[cfg(not(debug_assertions))]
    fn write_str(&mut self, _text: &str) -> fmt::Result {
        Ok(())
    }
}

impl Drop for DebugStream {
    fn drop(&mut self) {
        self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write;

    #[test]
    fn complete_lines_are_emitted() {
        let mut stream = DebugStream::new();
        write!(stream, "first\nsecond\npart").unwrap();
        if DebugStream::is_enabled() {
            assert_eq!(stream.pending(), "part");
        } else {
            assert_eq!(stream.pending(), "");
        }
        stream.flush();
        assert_eq!(stream.pending(), "");
    }

    #[test]
    fn writes_never_fail() {
        let mut stream = DebugStream::new();
        for i in 0..16 {
            writeln!(stream, "entry {i}").unwrap();
        }
        assert_eq!(stream.pending(), "");
    }
}
