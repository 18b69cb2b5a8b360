//! Display sinks that receive rendered status lines.
//!
//! - [`TerminalSink`] redraws a single line on stderr, hiding the cursor while
//!   the line is shown so the spinner does not flicker.
//! - [`TracingSink`] forwards lines to `tracing`, for logs and CI output.
//! - [`MemorySink`] keeps every line, useful in tests and for embedding.
//! - [`NoopSink`] discards everything.
//!
//! Sinks must tolerate being called from the ticker thread and the caller's
//! thread; callers serialize renders, but a sink must not assume a thread.

use is_terminal::IsTerminal;
use parking_lot::Mutex;
use std::io::Write;

const CURSOR_HIDE: &str = "\x1b[?25l";
const CURSOR_SHOW: &str = "\x1b[?25h";
const ERASE_DOWN: &str = "\x1b[J";
const CURSOR_LEFT: &str = "\r";

/// Consumer of rendered progress text.
pub trait DisplaySink: Send + Sync {
    /// Show `text` as the current progress line.
    fn progress(&self, text: &str);

    /// Remove whatever the sink is showing. Called once the owning context ends.
    fn clear(&self) {}
}

/// Single status line on stderr.
pub struct TerminalSink {
    ansi: bool,
    visible: Mutex<bool>,
}

impl TerminalSink {
    /// ANSI redraws when stderr is a terminal, one line per render otherwise.
    pub fn new() -> Self {
        Self::with_ansi(std::io::stderr().is_terminal())
    }

    pub fn with_ansi(ansi: bool) -> Self {
        Self {
            ansi,
            visible: Mutex::new(false),
        }
    }
}

impl Default for TerminalSink {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplaySink for TerminalSink {
    fn progress(&self, text: &str) {
        let mut visible = self.visible.lock();
        let stderr = std::io::stderr();
        let mut stderr = stderr.lock();
        // A broken stderr must not fail the work being reported on.
        let _ = if self.ansi {
            write!(&mut stderr, "{CURSOR_HIDE}{ERASE_DOWN}{text}{CURSOR_LEFT}")
        } else {
            writeln!(&mut stderr, "{text}")
        };
        let _ = stderr.flush();
        *visible = true;
    }

    fn clear(&self) {
        let mut visible = self.visible.lock();
        if self.ansi && *visible {
            let stderr = std::io::stderr();
            let mut stderr = stderr.lock();
            let _ = write!(&mut stderr, "{ERASE_DOWN}{CURSOR_SHOW}");
            let _ = stderr.flush();
        }
        *visible = false;
    }
}

/// Emits each distinct line as an `info` event on `tickline::progress`.
#[derive(Default)]
pub struct TracingSink {
    last: Mutex<Option<String>>,
}

impl TracingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DisplaySink for TracingSink {
    fn progress(&self, text: &str) {
        let mut last = self.last.lock();
        if last.as_deref() == Some(text) {
            return;
        }
        tracing::info!(target: "tickline::progress", "{text}");
        *last = Some(text.to_string());
    }

    fn clear(&self) {
        *self.last.lock() = None;
    }
}

/// Records every line it receives.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
    clears: Mutex<usize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn last(&self) -> Option<String> {
        self.lines.lock().last().cloned()
    }

    /// How many times [`DisplaySink::clear`] was called.
    pub fn clears(&self) -> usize {
        *self.clears.lock()
    }
}

impl DisplaySink for MemorySink {
    fn progress(&self, text: &str) {
        self.lines.lock().push(text.to_string());
    }

    fn clear(&self) {
        *self.clears.lock() += 1;
    }
}

/// Drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl DisplaySink for NoopSink {
    fn progress(&self, _text: &str) {}
}
