use std::{fmt, io};

use anyhow::Context as _;
use serde::Serialize;
use structopt::StructOpt;

use crate::{Config, Console, OutputFormat, Result};

mod check;
mod init;
mod parse;
mod show;
mod submit;

pub use check::{CheckOpt, CheckOutcome};
pub use init::{InitOpt, InitOutcome};
pub use parse::{ParseOpt, ParseOutcome};
pub use show::ShowOpt;
pub use submit::{SubmitOpt, SubmitOutcome};

pub trait Outcome: OutcomeSerialize {
    fn is_error(&self) -> bool;
}

pub trait OutcomeSerialize: fmt::Display + fmt::Debug {
    fn write_json(&self, writer: &mut dyn io::Write) -> Result<()>;

    fn write_yaml(&self, writer: &mut dyn io::Write) -> Result<()>;

    fn print(&self, stdout: &mut dyn io::Write, format: OutputFormat) -> Result<()> {
        match format {
            OutputFormat::Default => writeln!(stdout, "{}", self)?,
            OutputFormat::Debug => writeln!(stdout, "{:?}", self)?,
            OutputFormat::Json => {
                self.write_json(stdout)?;
                writeln!(stdout)?;
            }
            OutputFormat::Yaml => self.write_yaml(stdout)?,
        }
        Ok(())
    }
}

impl<T: Serialize + fmt::Display + fmt::Debug> OutcomeSerialize for T {
    fn write_json(&self, writer: &mut dyn io::Write) -> Result<()> {
        serde_json::to_writer_pretty(writer, self).context("Could not print outcome as json")
    }

    fn write_yaml(&self, writer: &mut dyn io::Write) -> Result<()> {
        serde_yaml::to_writer(writer, self).context("Could not print outcome as yaml")
    }
}

pub trait Run {
    fn run(&self, conf: &Config, cnsl: &mut Console) -> Result<Box<dyn Outcome>>;

    #[cfg(test)]
    fn run_default(&self) -> Result<Box<dyn Outcome>> {
        let conf = Config::default();
        let mut cnsl = Console::buf();
        self.run(&conf, &mut cnsl)
    }
}

#[derive(StructOpt, Debug, Clone, PartialEq, Eq, Hash)]
#[structopt(rename_all = "kebab")]
pub enum Cmd {
    /// Creates a config file
    Init(InitOpt),
    /// Shows current config
    Show(ShowOpt),
    /// Checks that the cf tool can be run
    Check(CheckOpt),
    /// Parses a problem url without submitting
    Parse(ParseOpt),
    /// Submits source code through the cf tool
    Submit(SubmitOpt),
}

impl Run for Cmd {
    fn run(&self, conf: &Config, cnsl: &mut Console) -> Result<Box<dyn Outcome>> {
        match self {
            Self::Init(opt) => opt.run(cnsl),
            Self::Show(opt) => opt.run(conf, cnsl),
            Self::Check(opt) => opt.run(conf, cnsl),
            Self::Parse(opt) => opt.run(conf, cnsl),
            Self::Submit(opt) => opt.run(conf, cnsl),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProblemIdentity;

    #[test]
    fn print_outcome_formats() -> anyhow::Result<()> {
        let outcome = ParseOutcome::new(
            ProblemIdentity::from_url("https://codeforces.com/contest/1500/problem/0")?,
            "a.cpp".into(),
        );

        let mut buf = Vec::new();
        outcome.print(&mut buf, OutputFormat::Default)?;
        assert_eq!(String::from_utf8(buf)?, "1500A : cf submit 1500 A a.cpp\n");

        let mut buf = Vec::new();
        outcome.print(&mut buf, OutputFormat::Json)?;
        let json: serde_json::Value = serde_json::from_slice(&buf)?;
        assert_eq!(json["identity"]["problem_code"], "A");
        assert_eq!(json["args"][1], "1500");

        let mut buf = Vec::new();
        outcome.print(&mut buf, OutputFormat::Yaml)?;
        let yaml = String::from_utf8(buf)?;
        assert!(yaml.contains("contest_id:"));
        assert!(yaml.contains("problem_code: A"));
        Ok(())
    }
}
