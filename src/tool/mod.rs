//! Driver of the external `cf` submission tool.
//!
//! A submission runs the tool as a child process and returns at once. Its
//! stdout is read on a tokio task. After every chunk the whole output read so
//! far is classified into a [`Verdict`]. The verdict is reported to the
//! injected logger and notifier, then published to the [`Submission`]
//! handle.

use std::io;
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use getset::{CopyGetters, Getters};
use serde::Serialize;
use tokio::io::AsyncReadExt as _;
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::error::SubmitError;
use crate::log::Logger;
use crate::model::{ProblemIdentity, SubmitRequest};
use crate::notify::Notifier;
use crate::Result;

mod verdict;

pub use verdict::{Verdict, VerdictKind};

/// Upper bound for `cf --version` to finish.
pub const CHECK_TIMEOUT: Duration = Duration::from_millis(2000);

/// Head of every log entry and title of every notification.
pub static LOG_HEAD: &str = "CF Tool";

const CHUNK_SIZE: usize = 4096;

/// Owns the cf tool path and the submission currently in flight.
///
/// Dropping it kills the child process of a running submission.
pub struct CfTool {
    path: String,
    logger: Arc<dyn Logger>,
    notifier: Arc<dyn Notifier>,
    in_flight: Arc<AtomicBool>,
    cancel: Option<oneshot::Sender<()>>,
}

impl CfTool {
    pub fn new(path: impl Into<String>, logger: Arc<dyn Logger>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            path: path.into(),
            logger,
            notifier,
            in_flight: Arc::new(AtomicBool::new(false)),
            cancel: None,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Replaces the tool path. Takes effect on the next submission.
    pub fn update_path(&mut self, path: impl Into<String>) {
        self.path = path.into();
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Starts submitting `request` and returns without waiting for the tool.
    ///
    /// Must be called within a tokio runtime.
    pub fn submit(&mut self, request: &SubmitRequest) -> std::result::Result<Submission, SubmitError> {
        let identity = ProblemIdentity::from_url(request.url()).map_err(|err| {
            self.logger.error(LOG_HEAD, &err.to_string());
            err
        })?;

        if self.is_busy() {
            let err = SubmitError::Busy;
            self.logger.error(LOG_HEAD, &err.to_string());
            return Err(err);
        }

        let args = identity.to_submit_args(request.file_path());
        let (child, stdout) = self.spawn(&args).map_err(|source| {
            self.logger.error(
                LOG_HEAD,
                &format!("Could not start cf tool at {} : {}", self.path, source),
            );
            SubmitError::Spawn {
                path: self.path.clone(),
                source,
            }
        })?;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (cancel_tx, cancel_rx) = oneshot::channel();
        // replaces the sender of a finished submission, if any
        self.cancel = Some(cancel_tx);
        self.in_flight.store(true, Ordering::SeqCst);

        let reporter = Reporter {
            logger: self.logger.clone(),
            notifier: self.notifier.clone(),
        };
        let guard = InFlightGuard(self.in_flight.clone());
        let task = tokio::spawn(drive(child, stdout, reporter, events_tx, cancel_rx, guard));

        Ok(Submission {
            identity,
            args,
            events: events_rx,
            task,
        })
    }

    fn spawn(&self, args: &[String]) -> io::Result<(Child, ChildStdout)> {
        let mut child = Command::new(&self.path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "stdout was not captured"))?;
        Ok((child, stdout))
    }

    /// Returns true if `path --version` exits successfully within [`CHECK_TIMEOUT`].
    ///
    /// Blocks the current thread. Must not be called within a tokio runtime.
    pub fn check(path: &str) -> bool {
        Self::check_with_timeout(path, CHECK_TIMEOUT)
    }

    #[tokio::main(flavor = "current_thread")]
    pub async fn check_with_timeout(path: &str, limit: Duration) -> bool {
        check_async(path, limit).await
    }
}

impl Drop for CfTool {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
    }
}

/// Awaitable form of [`CfTool::check`] for callers already inside a runtime.
pub async fn check_async(path: &str, limit: Duration) -> bool {
    let child = Command::new(path)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn();
    let mut child = match child {
        Ok(child) => child,
        Err(_) => return false,
    };
    match timeout(limit, child.wait()).await {
        Ok(Ok(status)) => status.success(),
        // still running at the deadline: the child is killed on drop
        _ => false,
    }
}

struct Reporter {
    logger: Arc<dyn Logger>,
    notifier: Arc<dyn Notifier>,
}

impl Reporter {
    fn report(&self, verdict: &Verdict) {
        match verdict {
            Verdict::Accepted(status) => {
                self.logger.success(LOG_HEAD, status);
                self.notifier.notify(LOG_HEAD, status, false);
            }
            Verdict::Running(status) => self.logger.info(LOG_HEAD, status),
            Verdict::Failed(output) => {
                self.logger.error(LOG_HEAD, output);
                self.notifier.notify(LOG_HEAD, output, true);
            }
        }
    }
}

/// Clears the busy flag when the submission task ends, however it ends.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

async fn drive(
    mut child: Child,
    mut stdout: ChildStdout,
    reporter: Reporter,
    events: mpsc::UnboundedSender<SubmissionEvent>,
    mut cancel: oneshot::Receiver<()>,
    _guard: InFlightGuard,
) -> SubmissionReport {
    let mut raw = Vec::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut verdict = None;
    let mut event_count = 0;

    let cancelled = loop {
        tokio::select! {
            read = stdout.read(&mut buf) => match read {
                Ok(0) => break false,
                Ok(n) => {
                    raw.extend_from_slice(&buf[..n]);
                    let current = Verdict::classify(&String::from_utf8_lossy(&raw));
                    reporter.report(&current);
                    event_count += 1;
                    // the subscriber may have gone away; the log still has it
                    let _ = events.send(SubmissionEvent {
                        seq: event_count,
                        verdict: current.clone(),
                    });
                    verdict = Some(current);
                }
                Err(err) => {
                    reporter
                        .logger
                        .error(LOG_HEAD, &format!("Could not read cf tool output : {}", err));
                    break false;
                }
            },
            _ = &mut cancel => break true,
        }
    };

    if cancelled {
        let _ = child.kill().await;
    }
    let exit_status = child.wait().await.ok();

    SubmissionReport {
        output: String::from_utf8_lossy(&raw).into_owned(),
        verdict,
        event_count,
        exit_code: exit_status.and_then(|status: ExitStatus| status.code()),
        cancelled,
    }
}

/// One classification of the output, published after each stdout chunk.
#[derive(Serialize, Getters, CopyGetters, Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubmissionEvent {
    #[get_copy = "pub"]
    seq: usize,
    #[get = "pub"]
    verdict: Verdict,
}

/// Final state of a submission after the tool exited.
#[derive(Serialize, Getters, CopyGetters, Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubmissionReport {
    #[get = "pub"]
    output: String,
    #[get = "pub"]
    verdict: Option<Verdict>,
    #[get_copy = "pub"]
    event_count: usize,
    #[get_copy = "pub"]
    exit_code: Option<i32>,
    #[get_copy = "pub"]
    cancelled: bool,
}

impl SubmissionReport {
    pub fn is_accepted(&self) -> bool {
        self.verdict.as_ref().map_or(false, Verdict::is_accepted)
    }
}

/// Handle of a running submission: its event stream and final report.
#[derive(Debug)]
pub struct Submission {
    identity: ProblemIdentity,
    args: Vec<String>,
    events: mpsc::UnboundedReceiver<SubmissionEvent>,
    task: JoinHandle<SubmissionReport>,
}

impl Submission {
    pub fn identity(&self) -> &ProblemIdentity {
        &self.identity
    }

    /// Arguments the tool was started with.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Waits for the next event. Returns `None` once the tool output is exhausted.
    pub async fn next_event(&mut self) -> Option<SubmissionEvent> {
        self.events.recv().await
    }

    /// Waits for the tool to exit.
    pub async fn wait(self) -> Result<SubmissionReport> {
        self.wait_with(|_| {}).await
    }

    /// Waits for the tool to exit, calling `on_event` for each remaining event.
    pub async fn wait_with(
        mut self,
        mut on_event: impl FnMut(&SubmissionEvent),
    ) -> Result<SubmissionReport> {
        while let Some(event) = self.events.recv().await {
            on_event(&event);
        }
        self.task.await.context("Submission task failed")
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::log::{MemoryLogger, Severity};
    use crate::notify::MemoryNotifier;

    fn build_tool(path: &str) -> (CfTool, Arc<MemoryLogger>, Arc<MemoryNotifier>) {
        let logger = Arc::new(MemoryLogger::new());
        let notifier = Arc::new(MemoryNotifier::new());
        let tool = CfTool::new(path, logger.clone(), notifier.clone());
        (tool, logger, notifier)
    }

    #[cfg(unix)]
    fn write_script(dir: &Path, name: &str, body: &str) -> anyhow::Result<String> {
        use std::os::unix::fs::PermissionsExt as _;

        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body))?;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
        Ok(path.to_string_lossy().into_owned())
    }

    #[tokio::test]
    async fn submit_malformed_url_logs_once_and_launches_nothing() {
        let (mut tool, logger, notifier) = build_tool("cfsubmit-test-no-such-tool");
        let request = SubmitRequest::new("a.cpp", "https://example.com/foo", "cpp");

        let result = tool.submit(&request);

        assert!(matches!(result, Err(SubmitError::MalformedUrl(_))));
        let entries = logger.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].severity, Severity::Error);
        assert_eq!(
            entries[0].body,
            "Failed to parse the problem URL https://example.com/foo"
        );
        assert!(notifier.notifications().is_empty());
        assert!(!tool.is_busy());
    }

    #[tokio::test]
    async fn submit_missing_tool_is_spawn_error() {
        let (mut tool, logger, _) = build_tool("cfsubmit-test-no-such-tool");
        let request = SubmitRequest::new(
            "a.cpp",
            "https://codeforces.com/contest/1500/problem/0",
            "cpp",
        );

        let result = tool.submit(&request);

        assert!(matches!(result, Err(SubmitError::Spawn { .. })));
        assert_eq!(logger.count(Severity::Error), 1);
        assert!(!tool.is_busy());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn submit_passes_args_and_reports_accepted() -> anyhow::Result<()> {
        let test_dir = tempfile::tempdir()?;
        let args_path = test_dir.path().join("args.txt");
        let script = write_script(
            test_dir.path(),
            "cf",
            &format!(
                r#"printf '%s\n' "$@" > '{}'
printf 'Submit problem 1500A\nstatus: Accepted\n'"#,
                args_path.display()
            ),
        )?;
        let (mut tool, logger, notifier) = build_tool(&script);
        let request = SubmitRequest::new(
            "a.cpp",
            "https://codeforces.com/contest/1500/problem/0",
            "cpp",
        );

        let submission = tool.submit(&request)?;
        assert_eq!(submission.args(), &["submit", "1500", "A", "a.cpp"]);
        let mut accepted_events = 0;
        let report = submission
            .wait_with(|event| {
                if event.verdict().is_accepted() {
                    accepted_events += 1;
                }
            })
            .await?;

        assert_eq!(std::fs::read_to_string(&args_path)?, "submit\n1500\nA\na.cpp\n");
        assert!(report.is_accepted());
        assert_eq!(report.exit_code(), Some(0));
        assert!(!report.cancelled());
        assert!(accepted_events >= 1);
        // one success log and one notification per accepted event
        assert_eq!(logger.count(Severity::Success), accepted_events);
        let notifications: Vec<_> = notifier
            .notifications()
            .into_iter()
            .filter(|n| !n.warning)
            .collect();
        assert_eq!(notifications.len(), accepted_events);
        assert!(notifications.iter().all(|n| n.body == "Accepted"));
        assert!(!tool.is_busy());
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn submit_running_only_logs_info() -> anyhow::Result<()> {
        let test_dir = tempfile::tempdir()?;
        let script = write_script(test_dir.path(), "cf", "echo 'status: Running on judge 3'")?;
        let (mut tool, logger, notifier) = build_tool(&script);
        let request = SubmitRequest::new(
            "a.cpp",
            "https://codeforces.com/problemset/problem/1500/C2",
            "cpp",
        );

        let report = tool.submit(&request)?.wait().await?;

        assert_eq!(
            report.verdict(),
            &Some(Verdict::Running("Running on judge 3".into()))
        );
        assert!(report.event_count() >= 1);
        assert_eq!(logger.count(Severity::Info), report.event_count());
        assert_eq!(logger.count(Severity::Error), 0);
        assert!(notifier.notifications().is_empty());
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn submit_unrecognized_output_is_failure() -> anyhow::Result<()> {
        let test_dir = tempfile::tempdir()?;
        let script = write_script(test_dir.path(), "cf", "echo 'Compilation error'")?;
        let (mut tool, logger, notifier) = build_tool(&script);
        let request = SubmitRequest::new(
            "a.cpp",
            "https://codeforces.com/contest/1500/problem/B",
            "cpp",
        );

        let report = tool.submit(&request)?.wait().await?;

        assert_eq!(report.verdict().as_ref().map(Verdict::kind), Some(VerdictKind::Failed));
        let errors: Vec<_> = logger
            .entries()
            .into_iter()
            .filter(|entry| entry.severity == Severity::Error)
            .collect();
        assert!(!errors.is_empty());
        assert!(errors.iter().all(|entry| entry.body == "Compilation error\n"));
        let notifications = notifier.notifications();
        assert_eq!(notifications.len(), errors.len());
        assert!(notifications.iter().all(|n| n.warning));
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn submit_while_running_is_busy() -> anyhow::Result<()> {
        let test_dir = tempfile::tempdir()?;
        let script = write_script(test_dir.path(), "cf", "sleep 1\necho 'status: Accepted'")?;
        let (mut tool, logger, _) = build_tool(&script);
        let request = SubmitRequest::new(
            "a.cpp",
            "https://codeforces.com/contest/1500/problem/A",
            "cpp",
        );

        let first = tool.submit(&request)?;
        assert!(tool.is_busy());
        assert!(matches!(tool.submit(&request), Err(SubmitError::Busy)));
        assert_eq!(logger.count(Severity::Error), 1);

        let report = first.wait().await?;
        assert!(report.is_accepted());
        assert!(!tool.is_busy());

        // the tool is reusable once the previous submission finished
        let report = tool.submit(&request)?.wait().await?;
        assert!(report.is_accepted());
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn dropping_tool_kills_submission() -> anyhow::Result<()> {
        let test_dir = tempfile::tempdir()?;
        let script = write_script(test_dir.path(), "cf", "sleep 30")?;
        let (mut tool, _, _) = build_tool(&script);
        let request = SubmitRequest::new(
            "a.cpp",
            "https://codeforces.com/contest/1500/problem/A",
            "cpp",
        );

        let submission = tool.submit(&request)?;
        drop(tool);
        let report = timeout(Duration::from_secs(10), submission.wait()).await??;

        assert!(report.cancelled());
        assert_eq!(report.verdict(), &None);
        Ok(())
    }

    #[test]
    fn update_path() {
        let (mut tool, _, _) = build_tool("cf");
        tool.update_path("/opt/cf/cf");
        assert_eq!(tool.path(), "/opt/cf/cf");
    }

    #[test]
    fn check_missing_tool() {
        assert!(!CfTool::check("cfsubmit-test-no-such-tool"));
    }

    #[cfg(unix)]
    #[test]
    fn check_exit_status_and_timeout() -> anyhow::Result<()> {
        let test_dir = tempfile::tempdir()?;
        let ok = write_script(test_dir.path(), "ok", r#"[ "$1" = "--version" ] && echo 'Codeforces Tool (cf) v1.0.0'"#)?;
        let fail = write_script(test_dir.path(), "fail", "exit 1")?;
        let slow = write_script(test_dir.path(), "slow", "sleep 5")?;

        assert!(CfTool::check(&ok));
        assert!(!CfTool::check(&fail));

        let started_at = std::time::Instant::now();
        assert!(!CfTool::check(&slow));
        assert!(started_at.elapsed() < Duration::from_secs(4));
        Ok(())
    }
}
