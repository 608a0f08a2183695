//! Text console: timestamped application messages shown in the UI.

use ratatui::style::Color;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Severity of a console line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConsoleLevel {
    Error,
    Warning,
    Info,
    Debug,
}

impl ConsoleLevel {
    pub fn label(self) -> &'static str {
        match self {
            ConsoleLevel::Error => "ERROR",
            ConsoleLevel::Warning => "WARNING",
            ConsoleLevel::Info => "INFO",
            ConsoleLevel::Debug => "DEBUG",
        }
    }

    pub fn color(self) -> Color {
        match self {
            ConsoleLevel::Error => Color::Red,
            ConsoleLevel::Warning => Color::Rgb(255, 165, 0), // Orange
            ConsoleLevel::Info => Color::Green,
            ConsoleLevel::Debug => Color::Blue,
        }
    }
}

impl From<tracing::Level> for ConsoleLevel {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::ERROR => ConsoleLevel::Error,
            tracing::Level::WARN => ConsoleLevel::Warning,
            tracing::Level::INFO => ConsoleLevel::Info,
            _ => ConsoleLevel::Debug,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleEntry {
    /// Time since the viewer started
    pub elapsed: Duration,
    pub level: ConsoleLevel,
    pub message: String,
}

impl ConsoleEntry {
    /// `[  12.34] INFO message`
    pub fn format(&self) -> String {
        format!(
            "[{:>8.2}] {:<7} {}",
            self.elapsed.as_secs_f64(),
            self.level.label(),
            self.message
        )
    }
}

/// Bounded list of console lines, oldest dropped first.
#[derive(Debug, Clone)]
pub struct ConsoleLog {
    entries: VecDeque<ConsoleEntry>,
    capacity: usize,
}

impl ConsoleLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    pub fn push(&mut self, entry: ConsoleEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn entries(&self) -> impl DoubleEndedIterator<Item = &ConsoleEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Console shared between the tracing layer and the UI.
#[derive(Debug, Clone)]
pub struct SharedConsole(Arc<Mutex<ConsoleLog>>);

impl SharedConsole {
    pub fn new(capacity: usize) -> Self {
        Self(Arc::new(Mutex::new(ConsoleLog::new(capacity))))
    }

    pub fn lock(&self) -> MutexGuard<'_, ConsoleLog> {
        // a panic while holding the lock leaves the log usable
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn push(&self, elapsed: Duration, level: ConsoleLevel, message: impl Into<String>) {
        self.lock().push(ConsoleEntry {
            elapsed,
            level,
            message: message.into(),
        });
    }

    /// The newest `count` entries, oldest first.
    pub fn tail(&self, count: usize) -> Vec<ConsoleEntry> {
        let log = self.lock();
        let mut tail: Vec<ConsoleEntry> = log.entries().rev().take(count).cloned().collect();
        tail.reverse();
        tail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_drops_oldest() {
        let console = SharedConsole::new(2);
        console.push(Duration::from_secs(1), ConsoleLevel::Info, "one");
        console.push(Duration::from_secs(2), ConsoleLevel::Warning, "two");
        console.push(Duration::from_secs(3), ConsoleLevel::Error, "three");

        let tail = console.tail(10);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].message, "two");
        assert_eq!(tail[1].message, "three");
        assert_eq!(console.tail(1)[0].message, "three");
    }

    #[test]
    fn test_level_mapping() {
        assert_eq!(ConsoleLevel::from(tracing::Level::WARN), ConsoleLevel::Warning);
        assert_eq!(ConsoleLevel::from(tracing::Level::TRACE), ConsoleLevel::Debug);
        assert_eq!(ConsoleLevel::Error.color(), Color::Red);
    }

    #[test]
    fn test_format() {
        let entry = ConsoleEntry {
            elapsed: Duration::from_millis(12_340),
            level: ConsoleLevel::Info,
            message: "Loaded".into(),
        };
        assert_eq!(entry.format(), "[   12.34] INFO    Loaded");
    }
}
