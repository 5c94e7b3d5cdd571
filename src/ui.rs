//! User-facing progress output.

use std::sync::Mutex;

/// Receives progress text for the user.
pub trait Ui: Send + Sync {
    /// A section header.
    fn header(&self, msg: &str);

    /// A plain message.
    fn message(&self, msg: &str);
}

/// Writes to stdout.
#[derive(Debug, Default)]
pub struct ConsoleUi;

impl Ui for ConsoleUi {
    fn header(&self, msg: &str) {
        println!("==> {}", msg);
    }

    fn message(&self, msg: &str) {
        println!("    {}", msg);
    }
}

/// A single recorded line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Header(String),
    Message(String),
}

/// Records output in memory, for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryUi {
    lines: Mutex<Vec<Line>>,
}

impl MemoryUi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far.
    pub fn lines(&self) -> Vec<Line> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// Whether any header or message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|line| match line {
            Line::Header(s) | Line::Message(s) => s.contains(needle),
        })
    }

    fn push(&self, line: Line) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line);
        }
    }
}

impl Ui for MemoryUi {
    fn header(&self, msg: &str) {
        self.push(Line::Header(msg.to_string()));
    }

    fn message(&self, msg: &str) {
        self.push(Line::Message(msg.to_string()));
    }
}
