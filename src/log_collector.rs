//! Decoupled logging pipeline.
//!
//! `LogCollector` is installed as the global `log` backend. Records are pushed
//! over an unbounded crossbeam channel to a dedicated OS thread, so a caller on
//! the UI-owning context or inside a blocking worker never waits on disk IO.
//!
//! # Architecture
//!
//! ```text
//! log::info!() / log_parsed!()
//!     |
//! [LogCollector] (non-blocking send)
//!     | (crossbeam unbounded)
//! [writer thread]
//!     |                       |
//! <log_dir>/full/<ts>.log   <log_dir>/parsed/<ts>.log
//! (every record)            (target = "parsed" only)
//! ```

use chrono::Local;
use crossbeam_channel::{bounded, unbounded, Sender};
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Internal log line or special marker
enum LogMessage {
    Line(LogLine),
    /// Flush marker; the writer acknowledges once everything before it is on disk
    Flush(Sender<()>),
}

/// A log line with metadata
#[derive(Clone, Debug)]
pub struct LogLine {
    pub message: String,
    /// "full" or "parsed"
    pub log_type: &'static str,
    pub level: Level,
    pub timestamp: String,
}

impl LogLine {
    pub fn new(level: Level, message: String) -> Self {
        LogLine {
            message,
            log_type: "full",
            level,
            timestamp: Local::now().format("%H:%M:%S%.3f").to_string(),
        }
    }

    pub fn parsed(level: Level, message: String) -> Self {
        LogLine {
            log_type: "parsed",
            ..LogLine::new(level, message)
        }
    }

    fn render(&self) -> String {
        format!("[{}] [{}] {}", self.timestamp, self.level, self.message)
    }
}

/// Ensure the logs directory exists
pub fn ensure_logs_dir_exists(log_dir: &Path) -> Result<(), String> {
    std::fs::create_dir_all(log_dir).map_err(|e| format!("Failed to create logs directory: {}", e))
}

#[derive(Clone)]
pub struct LogCollector {
    tx: Sender<LogMessage>,
    log_dir: PathBuf,
    level: LevelFilter,
}

impl LogCollector {
    /// Create the collector and its writer thread
    pub fn new(log_dir: PathBuf, level: LevelFilter) -> Result<Self, String> {
        let session = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let full_path = log_dir.join("full").join(format!("{}.log", session));
        let parsed_path = log_dir.join("parsed").join(format!("{}.log", session));

        let mut full = open_append(&full_path)?;
        let mut parsed = open_append(&parsed_path)?;

        let (tx, rx) = unbounded::<LogMessage>();

        // OS thread rather than a tokio task: blocking workers log too
        std::thread::spawn(move || {
            while let Ok(msg) = rx.recv() {
                match msg {
                    LogMessage::Line(line) => {
                        let rendered = line.render();
                        if let Err(e) = writeln!(full, "{}", rendered) {
                            eprintln!("[Log] Failed to write full log: {}", e);
                        }
                        if line.log_type == "parsed" {
                            if let Err(e) = writeln!(parsed, "{}", rendered) {
                                eprintln!("[Log] Failed to write parsed log: {}", e);
                            }
                        }
                    }
                    LogMessage::Flush(ack) => {
                        let _ = full.flush();
                        let _ = parsed.flush();
                        let _ = ack.send(());
                    }
                }
            }
        });

        Ok(LogCollector { tx, log_dir, level })
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Queue a line; never blocks
    pub fn send(&self, line: LogLine) {
        if self.tx.send(LogMessage::Line(line)).is_err() {
            eprintln!("[Log] Writer thread gone, dropping log line");
        }
    }

    /// Block until every previously queued line is on disk
    pub fn wait_for_empty(&self) -> Result<(), String> {
        let (ack_tx, ack_rx) = bounded(1);
        self.tx
            .send(LogMessage::Flush(ack_tx))
            .map_err(|_| "log writer thread is gone".to_string())?;
        ack_rx
            .recv()
            .map_err(|_| "log writer thread exited before flushing".to_string())
    }

    /// Register as the global `log` backend
    pub fn install(self) -> Result<(), log::SetLoggerError> {
        let level = self.level;
        log::set_boxed_logger(Box::new(self)).map(|()| log::set_max_level(level))
    }
}

fn open_append(path: &Path) -> Result<File, String> {
    if let Some(parent) = path.parent() {
        ensure_logs_dir_exists(parent)?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| format!("Failed to open log file {}: {}", path.display(), e))
}

impl Log for LogCollector {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let message = record.args().to_string();
        let line = if record.target() == "parsed" {
            LogLine::parsed(record.level(), message)
        } else {
            LogLine::new(record.level(), message)
        };
        self.send(line);
    }

    fn flush(&self) {
        if let Err(e) = self.wait_for_empty() {
            eprintln!("[Log] Flush failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_only_file(dir: &Path) -> String {
        let entry = std::fs::read_dir(dir).unwrap().next().unwrap().unwrap();
        std::fs::read_to_string(entry.path()).unwrap()
    }

    #[test]
    fn test_parsed_lines_go_to_both_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let collector = LogCollector::new(dir.path().to_path_buf(), LevelFilter::Info).unwrap();

        collector.send(LogLine::new(Level::Info, "detail".to_string()));
        collector.send(LogLine::parsed(Level::Info, "milestone".to_string()));
        collector.wait_for_empty().unwrap();

        let full = read_only_file(&dir.path().join("full"));
        let parsed = read_only_file(&dir.path().join("parsed"));
        assert!(full.contains("detail") && full.contains("milestone"));
        assert!(parsed.contains("milestone"));
        assert!(!parsed.contains("detail"));
    }

    #[test]
    fn test_level_filter() {
        let dir = tempfile::TempDir::new().unwrap();
        let collector = LogCollector::new(dir.path().to_path_buf(), LevelFilter::Warn).unwrap();
        let debug = Metadata::builder().level(Level::Debug).target("x").build();
        let error = Metadata::builder().level(Level::Error).target("x").build();
        assert!(!collector.enabled(&debug));
        assert!(collector.enabled(&error));
    }
}
