use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::anyhow;
use indicatif::ProgressBar;
use serde::Serialize;
use structopt::StructOpt;

use crate::abs_path::AbsPathBuf;
use crate::cmd::{Outcome, Run};
use crate::model::{Lang, ProblemIdentity, SubmitRequest};
use crate::tool::{CfTool, SubmissionReport, LOG_HEAD};
use crate::{Config, Console, Result, SubmitError};

#[derive(StructOpt, Debug, Clone, PartialEq, Eq, Hash)]
#[structopt(rename_all = "kebab")]
pub struct SubmitOpt {
    /// Source file to submit
    #[structopt(name = "file")]
    file_path: PathBuf,
    /// Problem url, e.g. https://codeforces.com/contest/1500/problem/A
    url: String,
    /// Language of the source file (defaults to default_lang in config)
    #[structopt(long, short)]
    lang: Option<Lang>,
    /// Skips running `cf --version` before submitting
    #[structopt(long)]
    no_check: bool,
    /// Path to the cf tool (overrides cf_path in config)
    #[structopt(long)]
    cf_path: Option<String>,
}

impl Run for SubmitOpt {
    fn run(&self, conf: &Config, cnsl: &mut Console) -> Result<Box<dyn Outcome>> {
        let cf_path = match &self.cf_path {
            Some(cf_path) => cf_path.clone(),
            None => conf.cf_path()?,
        };
        let lang = match &self.lang {
            Some(lang) => lang.clone(),
            None => conf.body().default_lang().clone(),
        };

        let file_path = AbsPathBuf::cwd()?.join_expand(&self.file_path)?;
        if !file_path.as_ref().is_file() {
            return Err(anyhow!("Could not find source file : {}", file_path));
        }
        let source: &Path = file_path.as_ref();
        let request = SubmitRequest::new(source, self.url.as_str(), lang);

        // log lines are printed above the spinner instead of being redrawn over
        let pb = cnsl.build_spinner(LOG_HEAD)?;
        let logger = conf.build_logger(cnsl.fork_above(&pb))?;
        let notifier = conf.build_notifier(cnsl.fork_above(&pb), logger.clone());

        // a malformed url is reported by the submission itself, without a check
        let is_url_valid = ProblemIdentity::from_url(&self.url).is_ok();
        if is_url_valid && conf.body().check_before_submit() && !self.no_check {
            pb.set_message(format!("Checking cf tool at {} ...", cf_path));
            if !CfTool::check_with_timeout(&cf_path, conf.body().check_timeout()) {
                let err = SubmitError::ToolUnavailable(cf_path);
                logger.error(LOG_HEAD, &err.to_string());
                pb.finish_and_clear();
                return Err(err.into());
            }
        }

        let mut tool = CfTool::new(cf_path, logger, notifier);
        let result = submit_and_wait(&mut tool, &request, &pb);
        pb.finish_and_clear();
        let (identity, report) = result?;

        Ok(Box::new(SubmitOutcome {
            identity,
            request,
            report,
        }))
    }
}

#[tokio::main]
async fn submit_and_wait(
    tool: &mut CfTool,
    request: &SubmitRequest,
    pb: &ProgressBar,
) -> Result<(ProblemIdentity, SubmissionReport)> {
    let submission = tool.submit(request)?;
    let identity = submission.identity().clone();

    pb.set_message(format!("Submitting {} ...", identity));
    let report = submission
        .wait_with(|event| pb.set_message(format!("#{} {}", event.seq(), event.verdict().kind())))
        .await?;

    Ok((identity, report))
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubmitOutcome {
    identity: ProblemIdentity,
    request: SubmitRequest,
    report: SubmissionReport,
}

impl SubmitOutcome {
    pub fn report(&self) -> &SubmissionReport {
        &self.report
    }
}

impl fmt::Display for SubmitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({}) : ", self.identity, self.request.lang())?;
        match self.report.verdict() {
            Some(verdict) => write!(f, "{}", verdict),
            None => write!(f, "no output from cf tool"),
        }
    }
}

impl Outcome for SubmitOutcome {
    fn is_error(&self) -> bool {
        !self.report.is_accepted()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn run_missing_source() {
        let opt = SubmitOpt {
            file_path: "cfsubmit-test-no-such-source.cpp".into(),
            url: "https://codeforces.com/contest/1500/problem/A".into(),
            lang: None,
            no_check: true,
            cf_path: Some("cfsubmit-test-no-such-tool".into()),
        };
        assert!(opt.run_default().is_err());
    }

    #[test]
    fn run_malformed_url() -> anyhow::Result<()> {
        let test_dir = tempdir()?;
        let source = test_dir.path().join("a.cpp");
        fs::write(&source, "int main() {}\n")?;
        let opt = SubmitOpt {
            file_path: source,
            url: "https://example.com/foo".into(),
            lang: None,
            no_check: false,
            cf_path: Some("cfsubmit-test-no-such-tool".into()),
        };

        let err = opt.run_default().unwrap_err();

        assert!(matches!(
            err.downcast_ref::<SubmitError>(),
            Some(SubmitError::MalformedUrl(_))
        ));
        Ok(())
    }

    #[test]
    fn run_unavailable_tool() -> anyhow::Result<()> {
        let test_dir = tempdir()?;
        let source = test_dir.path().join("a.cpp");
        fs::write(&source, "int main() {}\n")?;
        let opt = SubmitOpt {
            file_path: source,
            url: "https://codeforces.com/contest/1500/problem/A".into(),
            lang: None,
            no_check: false,
            cf_path: Some("cfsubmit-test-no-such-tool".into()),
        };

        let err = opt.run_default().unwrap_err();

        assert!(matches!(
            err.downcast_ref::<SubmitError>(),
            Some(SubmitError::ToolUnavailable(_))
        ));
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn run_with_fake_tool() -> anyhow::Result<()> {
        use std::os::unix::fs::PermissionsExt as _;

        let test_dir = tempdir()?;
        let source = test_dir.path().join("a.cpp");
        fs::write(&source, "int main() {}\n")?;
        let script = test_dir.path().join("cf");
        fs::write(
            &script,
            "#!/bin/sh\nif [ \"$1\" = \"--version\" ]; then exit 0; fi\necho 'status: Accepted'\n",
        )?;
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755))?;

        let opt = SubmitOpt {
            file_path: source,
            url: "https://codeforces.com/problemset/problem/1500/C2".into(),
            lang: Some("cpp".into()),
            no_check: false,
            cf_path: Some(script.to_string_lossy().into_owned()),
        };

        let outcome = opt.run_default()?;

        assert!(!outcome.is_error());
        assert_eq!(outcome.to_string(), "1500C2 (cpp) : accepted: Accepted");
        Ok(())
    }
}
