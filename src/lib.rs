#![warn(clippy::all)]

#[macro_use]
extern crate strum;

use std::io::{self, Write as _};
use std::path::PathBuf;

use structopt::StructOpt;
use strum::VariantNames;

pub mod cmd;
pub mod config;
pub mod error;
pub mod log;
mod macros;
pub mod model;
pub mod notify;
pub mod tool;

pub use cfsubmit_util::{abs_path, console};

use crate::abs_path::AbsPathBuf;
use crate::cmd::{Cmd, Run as _};
pub use crate::config::Config;
pub use crate::console::{Console, ConsoleConfig};
pub use crate::error::SubmitError;

pub type Error = anyhow::Error;
pub type Result<T> = anyhow::Result<T>;

#[derive(
    EnumString,
    EnumVariantNames,
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
#[strum(serialize_all = "kebab-case")]
pub enum OutputFormat {
    Default,
    Debug,
    Json,
    Yaml,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Default
    }
}

#[derive(StructOpt, Debug, Clone, PartialEq, Eq, Hash)]
#[structopt(rename_all = "kebab")]
pub struct GlobalOpt {
    /// Directory containing cfsubmit.yaml (searched from the current directory if omitted)
    #[structopt(long, global = true, env = "CFSUBMIT_CONFIG_DIR")]
    config_dir: Option<PathBuf>,
    /// Format of the outcome printed to stdout
    #[structopt(
        long,
        global = true,
        default_value = OutputFormat::Default.into(),
        possible_values = &OutputFormat::VARIANTS,
    )]
    output: OutputFormat,
    /// Hides log messages
    #[structopt(short, long, global = true)]
    quiet: bool,
}

impl GlobalOpt {
    fn console_config(&self) -> ConsoleConfig {
        ConsoleConfig { quiet: self.quiet }
    }

    fn config_abs_dir(&self) -> Result<Option<AbsPathBuf>> {
        match &self.config_dir {
            Some(dir) => Ok(Some(AbsPathBuf::cwd()?.join_expand(dir)?)),
            None => Ok(None),
        }
    }
}

#[derive(StructOpt, Debug, Clone, PartialEq, Eq, Hash)]
#[structopt(about, rename_all = "kebab")]
pub struct Opt {
    #[structopt(flatten)]
    global_opt: GlobalOpt,
    #[structopt(subcommand)]
    cmd: Cmd,
}

impl Opt {
    /// Runs the command and prints its outcome. Returns true if the outcome is an error.
    pub fn run(&self, stdout: &mut dyn io::Write) -> Result<bool> {
        let mut cnsl = Console::term(self.global_opt.console_config());

        let outcome = match &self.cmd {
            Cmd::Init(opt) => opt.run(&mut cnsl)?,
            cmd => {
                let conf = Config::load(self.global_opt.config_abs_dir()?, &mut cnsl)?;
                cmd.run(&conf, &mut cnsl)?
            }
        };
        outcome.print(stdout, self.global_opt.output)?;
        stdout.flush()?;
        Ok(outcome.is_error())
    }
}
