#![warn(clippy::all)]

use std::io::{self, Write as _};
use std::process;

use structopt::StructOpt;

use cfsubmit::Opt;

fn main() {
    let opt = Opt::from_args();
    match opt.run(&mut io::stdout()) {
        Ok(is_error) => {
            if is_error {
                process::exit(1);
            }
        }
        Err(err) => {
            let _ = io::stdout().flush();
            eprintln!();
            eprintln!("Error: {:?}", err);
            process::exit(1);
        }
    }
}
