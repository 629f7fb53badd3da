use std::fmt;
use std::io::Write as _;

use serde::Serialize;
use structopt::StructOpt;

use crate::cmd::{Outcome, Run};
use crate::console::{sty_g, sty_r};
use crate::tool::CfTool;
use crate::{Config, Console, Result};

#[derive(StructOpt, Debug, Clone, PartialEq, Eq, Hash)]
#[structopt(rename_all = "kebab")]
pub struct CheckOpt {
    /// Path to the cf tool (overrides cf_path in config)
    #[structopt(long)]
    cf_path: Option<String>,
}

impl Run for CheckOpt {
    fn run(&self, conf: &Config, cnsl: &mut Console) -> Result<Box<dyn Outcome>> {
        let cf_path = match &self.cf_path {
            Some(cf_path) => cf_path.clone(),
            None => conf.cf_path()?,
        };
        write!(cnsl, "Checking cf tool at {} ... ", cf_path)?;
        let available = CfTool::check_with_timeout(&cf_path, conf.body().check_timeout());
        writeln!(
            cnsl,
            "{}",
            if available { sty_g("ok") } else { sty_r("failed") }
        )?;
        Ok(Box::new(CheckOutcome { cf_path, available }))
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct CheckOutcome {
    cf_path: String,
    available: bool,
}

impl fmt::Display for CheckOutcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.available {
            write!(f, "cf tool is available : {}", self.cf_path)
        } else {
            write!(
                f,
                "cf tool is not available : {}. It did not exit successfully for --version.",
                self.cf_path
            )
        }
    }
}

impl Outcome for CheckOutcome {
    fn is_error(&self) -> bool {
        !self.available
    }
}
