use indicatif::{ProgressBar, ProgressStyle};
use std::cell::RefCell;

/// Sink for progress and diagnostic messages emitted by the pipeline.
pub trait Reporter {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn debug(&self, message: &str);
    fn error(&self, message: &str);
}

/// Forwards every message to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn info(&self, message: &str) {
        log::info!("{}", message);
    }

    fn warn(&self, message: &str) {
        log::warn!("{}", message);
    }

    fn debug(&self, message: &str) {
        log::debug!("{}", message);
    }

    fn error(&self, message: &str) {
        log::error!("{}", message);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Debug,
    Error,
}

/// Keeps messages in memory so callers can inspect what was reported.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    messages: RefCell<Vec<(Level, String)>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(Level, String)> {
        self.messages.borrow().clone()
    }

    pub fn at(&self, level: Level) -> Vec<String> {
        self.messages
            .borrow()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    fn push(&self, level: Level, message: &str) {
        self.messages.borrow_mut().push((level, message.to_string()));
    }
}

impl Reporter for MemoryReporter {
    fn info(&self, message: &str) {
        self.push(Level::Info, message);
    }

    fn warn(&self, message: &str) {
        self.push(Level::Warn, message);
    }

    fn debug(&self, message: &str) {
        self.push(Level::Debug, message);
    }

    fn error(&self, message: &str) {
        self.push(Level::Error, message);
    }
}

/// Progress bar in the house style, used for the slow per-file phases.
pub fn progress_bar(len: usize, message: &'static str) -> ProgressBar {
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    let bar = ProgressBar::new(len as u64).with_style(style);
    bar.set_message(message);
    bar
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_reporter_levels() {
        let reporter = MemoryReporter::new();
        reporter.info("one");
        reporter.warn("two");
        reporter.warn("three");
        reporter.debug("four");

        assert_eq!(reporter.at(Level::Warn), vec!["two", "three"]);
        assert_eq!(reporter.at(Level::Error), Vec::<String>::new());
        assert_eq!(reporter.messages().len(), 4);
    }
}
