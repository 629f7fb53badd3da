//! Status loggers.
//!
//! Components never reach for a global log target. They receive an
//! `Arc<dyn Logger>` and report through it.

use std::fmt;
use std::io::Write;
use std::sync::{Arc, Mutex};

use chrono::{Local, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::console::{sty_b, sty_bold, sty_g, sty_r, sty_y};
use crate::Console;

#[derive(
    Serialize,
    Deserialize,
    IntoStaticStr,
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Severity {
    Info,
    Success,
    Warn,
    Error,
}

impl Severity {
    pub fn html_color(self) -> &'static str {
        match self {
            Self::Info => "blue",
            Self::Success => "green",
            Self::Warn => "orange",
            Self::Error => "red",
        }
    }

    fn styled(self, body: &str) -> String {
        match self {
            Self::Info => sty_b(body).to_string(),
            Self::Success => sty_g(body).to_string(),
            Self::Warn => sty_y(body).to_string(),
            Self::Error => sty_r(body).to_string(),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.into())
    }
}

pub trait Logger: Send + Sync {
    fn log(&self, head: &str, body: &str, severity: Severity);

    fn info(&self, head: &str, body: &str) {
        self.log(head, body, Severity::Info)
    }

    fn success(&self, head: &str, body: &str) {
        self.log(head, body, Severity::Success)
    }

    fn warn(&self, head: &str, body: &str) {
        self.log(head, body, Severity::Warn)
    }

    fn error(&self, head: &str, body: &str) {
        self.log(head, body, Severity::Error)
    }
}

fn escape_html(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Renders one log entry as an html line.
pub fn render_html(time: NaiveTime, head: &str, body: &str, severity: Severity) -> String {
    format!(
        "<b>[{}] [{}] </b><font color={}>[{}]</font>",
        time.format("%H:%M:%S"),
        escape_html(head),
        severity.html_color(),
        escape_html(body)
    )
}

/// Appends timestamped html lines to a writer, e.g. a log file shown by an editor pane.
#[derive(Debug)]
pub struct HtmlLogger<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> HtmlLogger<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> Option<W> {
        self.writer.into_inner().ok()
    }
}

impl HtmlLogger<Vec<u8>> {
    pub fn buf() -> Self {
        Self::new(Vec::new())
    }

    pub fn clear(&self) {
        if let Ok(mut buf) = self.writer.lock() {
            buf.clear();
        }
    }

    pub fn contents(&self) -> String {
        match self.writer.lock() {
            Ok(buf) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => String::new(),
        }
    }
}

impl<W: Write + Send> Logger for HtmlLogger<W> {
    fn log(&self, head: &str, body: &str, severity: Severity) {
        let line = render_html(Local::now().time(), head, body, severity);
        if let Ok(mut writer) = self.writer.lock() {
            // a broken log sink must not abort a submission
            let _ = writeln!(writer, "{}", line).and_then(|_| writer.flush());
        }
    }
}

/// Prints coloured log lines to the console.
#[derive(Debug)]
pub struct ConsoleLogger {
    cnsl: Mutex<Console>,
}

impl ConsoleLogger {
    pub fn new(cnsl: Console) -> Self {
        Self {
            cnsl: Mutex::new(cnsl),
        }
    }

    pub fn into_console(self) -> Option<Console> {
        self.cnsl.into_inner().ok()
    }
}

impl Logger for ConsoleLogger {
    fn log(&self, head: &str, body: &str, severity: Severity) {
        let time = Local::now().time().format("%H:%M:%S");
        if let Ok(mut cnsl) = self.cnsl.lock() {
            let _ = writeln!(
                cnsl,
                "[{}] {} {}",
                time,
                sty_bold(format!("[{}]", head)),
                severity.styled(body)
            );
        }
    }
}

/// Sends every entry to all inner loggers.
#[derive(Default)]
pub struct TeeLogger {
    loggers: Vec<Arc<dyn Logger>>,
}

impl TeeLogger {
    pub fn new(loggers: Vec<Arc<dyn Logger>>) -> Self {
        Self { loggers }
    }

    pub fn push(&mut self, logger: Arc<dyn Logger>) {
        self.loggers.push(logger);
    }
}

impl Logger for TeeLogger {
    fn log(&self, head: &str, body: &str, severity: Severity) {
        for logger in &self.loggers {
            logger.log(head, body, severity);
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogEntry {
    pub head: String,
    pub body: String,
    pub severity: Severity,
}

/// Keeps entries in memory.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(_) => Vec::new(),
        }
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.entries()
            .iter()
            .filter(|entry| entry.severity == severity)
            .count()
    }
}

impl Logger for MemoryLogger {
    fn log(&self, head: &str, body: &str, severity: Severity) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(LogEntry {
                head: head.to_owned(),
                body: body.to_owned(),
                severity,
            });
        }
    }
}
