use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use structopt::StructOpt;

use crate::cmd::{Outcome, Run};
use crate::model::ProblemIdentity;
use crate::{Config, Console, Result};

#[derive(StructOpt, Debug, Clone, PartialEq, Eq, Hash)]
#[structopt(rename_all = "kebab")]
pub struct ParseOpt {
    /// Problem url, e.g. https://codeforces.com/contest/1500/problem/A
    url: String,
    /// Source file shown in the resulting cf command
    #[structopt(long, default_value = "<FILE>")]
    file: PathBuf,
}

impl Run for ParseOpt {
    fn run(&self, _conf: &Config, _cnsl: &mut Console) -> Result<Box<dyn Outcome>> {
        let identity = ProblemIdentity::from_url(&self.url)?;
        Ok(Box::new(ParseOutcome::new(identity, self.file.clone())))
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParseOutcome {
    identity: ProblemIdentity,
    args: Vec<String>,
}

impl ParseOutcome {
    pub fn new(identity: ProblemIdentity, file: PathBuf) -> Self {
        let args = identity.to_submit_args(&file);
        Self { identity, args }
    }
}

impl fmt::Display for ParseOutcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} : cf {}", self.identity, self.args.join(" "))
    }
}

impl Outcome for ParseOutcome {
    fn is_error(&self) -> bool {
        false
    }
}
