use std::io::Write as _;
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;

use regex::Captures;
use serde::Serialize;

use crate::console::{sty_g_rev, sty_y_rev};
use crate::log::Logger;
use crate::macros::regex;
use crate::Console;

/// Shows a short-lived message outside the log, like a tray popup.
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, body: &str, warning: bool);
}

/// Prints a highlighted banner line to the console.
#[derive(Debug)]
pub struct ConsoleNotifier {
    cnsl: Mutex<Console>,
}

impl ConsoleNotifier {
    pub fn new(cnsl: Console) -> Self {
        Self {
            cnsl: Mutex::new(cnsl),
        }
    }

    pub fn into_console(self) -> Option<Console> {
        self.cnsl.into_inner().ok()
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, title: &str, body: &str, warning: bool) {
        let banner = format!(" {} ", title);
        let banner = if warning {
            sty_y_rev(banner)
        } else {
            sty_g_rev(banner)
        };
        if let Ok(mut cnsl) = self.cnsl.lock() {
            let _ = writeln!(cnsl, "{} {}", banner, body.trim_end());
        }
    }
}

/// Runs a desktop notification command such as `notify-send`.
///
/// `{title}` and `{body}` in the arguments are replaced. `{urgency}` becomes
/// `critical` for warnings and `normal` otherwise.
pub struct CommandNotifier {
    command: Vec<String>,
    logger: Arc<dyn Logger>,
}

impl CommandNotifier {
    pub fn new(command: Vec<String>, logger: Arc<dyn Logger>) -> Self {
        Self { command, logger }
    }

    pub fn expand_args(&self, title: &str, body: &str, warning: bool) -> Vec<String> {
        let urgency = if warning { "critical" } else { "normal" };
        self.command
            .iter()
            .map(|arg| {
                regex!(r"\{(title|body|urgency)\}")
                    .replace_all(arg, |caps: &Captures| match &caps[1] {
                        "title" => title,
                        "body" => body,
                        _ => urgency,
                    })
                    .into_owned()
            })
            .collect()
    }
}

impl Notifier for CommandNotifier {
    fn notify(&self, title: &str, body: &str, warning: bool) {
        let args = self.expand_args(title, body, warning);
        let (program, args) = match args.split_first() {
            Some(split) => split,
            None => return,
        };
        let spawned = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        match spawned {
            Ok(mut child) => {
                // reap in the background so no zombie is left behind
                thread::spawn(move || child.wait());
            }
            Err(err) => self.logger.warn(
                "Notify",
                &format!("Could not run notification command {} : {}", program, err),
            ),
        }
    }
}

/// Drops every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _title: &str, _body: &str, _warning: bool) {}
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub warning: bool,
}

/// Keeps notifications in memory.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    notifications: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        match self.notifications.lock() {
            Ok(notifications) => notifications.clone(),
            Err(_) => Vec::new(),
        }
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, title: &str, body: &str, warning: bool) {
        if let Ok(mut notifications) = self.notifications.lock() {
            notifications.push(Notification {
                title: title.to_owned(),
                body: body.to_owned(),
                warning,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::{MemoryLogger, Severity};

    #[test]
    fn test_console_notifier() -> anyhow::Result<()> {
        let notifier = ConsoleNotifier::new(Console::buf());
        notifier.notify("CF Tool", "Accepted\n", false);
        notifier.notify("CF Tool", "Compilation error", true);
        let output = notifier.into_console().unwrap().take_output()?;
        let output = ::console::strip_ansi_codes(&output);
        assert_eq!(output, " CF Tool  Accepted\n CF Tool  Compilation error\n");
        Ok(())
    }

    #[test]
    fn test_expand_args() {
        let notifier = CommandNotifier::new(
            vec![
                "notify-send".into(),
                "-u".into(),
                "{urgency}".into(),
                "{title}".into(),
                "{body}".into(),
            ],
            Arc::new(MemoryLogger::new()),
        );
        assert_eq!(
            notifier.expand_args("CF Tool", "Accepted", false),
            vec!["notify-send", "-u", "normal", "CF Tool", "Accepted"]
        );
        assert_eq!(notifier.expand_args("CF Tool", "WA", true)[2], "critical");
    }

    #[test]
    fn test_expand_args_leaves_inserted_text_alone() {
        let notifier = CommandNotifier::new(
            vec!["{title}: {body}".into(), "{urgency}".into()],
            Arc::new(MemoryLogger::new()),
        );
        assert_eq!(
            notifier.expand_args("{body}", "error: unknown name {urgency} {title}", true),
            vec!["{body}: error: unknown name {urgency} {title}", "critical"]
        );
    }

    #[test]
    fn test_command_notifier_missing_program_warns() {
        let logger = Arc::new(MemoryLogger::new());
        let notifier = CommandNotifier::new(
            vec!["cfsubmit-test-no-such-notifier".into(), "{body}".into()],
            logger.clone(),
        );
        notifier.notify("CF Tool", "Accepted", false);
        assert_eq!(logger.count(Severity::Warn), 1);
    }

    #[test]
    fn test_memory_notifier() {
        let notifier = MemoryNotifier::new();
        notifier.notify("t", "b", true);
        assert_eq!(
            notifier.notifications(),
            vec![Notification {
                title: "t".into(),
                body: "b".into(),
                warning: true,
            }]
        );
    }
}
