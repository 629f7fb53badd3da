use std::fmt;
use std::io::{self, Write};
use std::time::Duration;

use anyhow::Context as _;
use console::Term;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

static PB_TICK_INTERVAL_MS: u64 = 80;
static PB_REFRESH_RATE: u8 = 20;
static PB_TEMPL_SPINNER: &str = "{spinner:.green} {prefix} [{elapsed_precise}] {wide_msg}";
static PB_TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ";

#[derive(Debug)]
enum Inner {
    Term(Term),
    Buf(Vec<u8>),
    Sink(io::Sink),
    AbovePb(PbWriter),
}

/// Prints complete lines above a progress bar so that redraws do not overwrite them.
struct PbWriter {
    pb: ProgressBar,
    pending: Vec<u8>,
}

impl PbWriter {
    fn new(pb: ProgressBar) -> Self {
        Self {
            pb,
            pending: Vec::new(),
        }
    }
}

impl fmt::Debug for PbWriter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PbWriter")
            .field("pending", &self.pending)
            .finish()
    }
}

impl Write for PbWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        for line in take_lines(&mut self.pending) {
            self.pb.println(line);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.pending.is_empty() {
            let rest = String::from_utf8_lossy(&self.pending).into_owned();
            self.pending.clear();
            self.pb.println(rest);
        }
        Ok(())
    }
}

/// Removes every complete line from the front of `pending`.
fn take_lines(pending: &mut Vec<u8>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
        let rest = pending.split_off(pos + 1);
        let line = std::mem::replace(pending, rest);
        lines.push(String::from_utf8_lossy(&line[..pos]).into_owned());
    }
    lines
}

/// Config for console.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct ConsoleConfig {
    /// If true, everything written to the console is discarded.
    pub quiet: bool,
}

/// Destination of human readable messages (stderr, an in-memory buffer or nowhere).
#[derive(Debug)]
pub struct Console {
    inner: Inner,
}

impl Console {
    pub fn term(conf: ConsoleConfig) -> Self {
        if conf.quiet {
            return Self::sink();
        }
        Self {
            inner: Inner::Term(Term::stderr()),
        }
    }

    pub fn buf() -> Self {
        Self {
            inner: Inner::Buf(Vec::new()),
        }
    }

    pub fn sink() -> Self {
        Self {
            inner: Inner::Sink(io::sink()),
        }
    }

    /// Returns another console writing to the same kind of destination.
    ///
    /// A buffered console forks into a new empty buffer.
    pub fn fork(&self) -> Self {
        match self.inner {
            Inner::Term(_) => Self {
                inner: Inner::Term(Term::stderr()),
            },
            Inner::Buf(_) => Self::buf(),
            Inner::Sink(_) => Self::sink(),
            Inner::AbovePb(ref w) => Self {
                inner: Inner::AbovePb(PbWriter::new(w.pb.clone())),
            },
        }
    }

    /// Like [`Console::fork`], but a console drawing `pb` prints its lines above it.
    pub fn fork_above(&self, pb: &ProgressBar) -> Self {
        if pb.is_hidden() {
            return self.fork();
        }
        match self.inner {
            Inner::Term(_) | Inner::AbovePb(_) => Self {
                inner: Inner::AbovePb(PbWriter::new(pb.clone())),
            },
            _ => self.fork(),
        }
    }

    pub fn is_term(&self) -> bool {
        matches!(self.inner, Inner::Term(_))
    }

    pub fn take_buf(self) -> Option<Vec<u8>> {
        match self.inner {
            Inner::Buf(buf) => Some(buf),
            _ => None,
        }
    }

    pub fn take_output(self) -> crate::Result<String> {
        self.take_buf()
            .context("Could not take buf from console")
            .and_then(|buf| Ok(String::from_utf8(buf)?))
    }

    #[inline]
    fn as_mut_write(&mut self) -> &mut dyn Write {
        match self.inner {
            Inner::Term(ref mut w) => w,
            Inner::Buf(ref mut w) => w,
            Inner::Sink(ref mut w) => w,
            Inner::AbovePb(ref mut w) => w,
        }
    }

    /// Builds a spinner that ticks until it is finished.
    ///
    /// The spinner is hidden unless the console writes to a terminal.
    pub fn build_spinner(&self, prefix: &str) -> crate::Result<ProgressBar> {
        let style = ProgressStyle::with_template(PB_TEMPL_SPINNER)
            .context("Could not build spinner style")?
            .tick_chars(PB_TICK_CHARS);
        let pb = ProgressBar::with_draw_target(None, self.to_pb_target());
        pb.set_style(style);
        pb.set_prefix(prefix.to_owned());
        pb.enable_steady_tick(Duration::from_millis(PB_TICK_INTERVAL_MS));
        Ok(pb)
    }

    fn to_pb_target(&self) -> ProgressDrawTarget {
        match &self.inner {
            Inner::Term(term) => ProgressDrawTarget::term(term.clone(), PB_REFRESH_RATE),
            _ => ProgressDrawTarget::hidden(),
        }
    }
}

impl Write for Console {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.as_mut_write().write(buf)
    }

    #[inline]
    fn flush(&mut self) -> io::Result<()> {
        self.as_mut_write().flush()
    }
}

macro_rules! def_color {
    ($name:ident, $name_upper:ident, $style:expr) => {
        ::lazy_static::lazy_static! {
            static ref $name_upper: ::console::Style = {
                use ::console::Style;
                $style
            };
        }

        pub fn $name<D>(val: D) -> ::console::StyledObject<D> {
            $name_upper.apply_to(val)
        }
    };
}

pub use color_defs::*;

mod color_defs {
    def_color!(sty_r, STY_R, Style::new().red());
    def_color!(sty_g, STY_G, Style::new().green());
    def_color!(sty_y, STY_Y, Style::new().yellow());
    def_color!(sty_b, STY_B, Style::new().blue());
    def_color!(sty_bold, STY_BOLD, Style::new().bold());
    def_color!(sty_g_rev, STY_G_REV, Style::new().bold().reverse().green());
    def_color!(sty_y_rev, STY_Y_REV, Style::new().bold().reverse().yellow());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_term_is_sink() {
        let cnsl = Console::term(ConsoleConfig { quiet: true });
        assert!(!cnsl.is_term());
        assert!(cnsl.take_buf().is_none());
    }

    #[test]
    fn test_fork() {
        assert!(Console::buf().fork().take_buf().is_some());
        assert!(Console::sink().fork().take_buf().is_none());
    }

    #[test]
    fn test_spinner_hidden_for_buf() -> anyhow::Result<()> {
        let cnsl = Console::buf();
        let pb = cnsl.build_spinner("cf")?;
        assert!(pb.is_hidden());
        pb.finish_and_clear();
        assert_eq!(cnsl.take_output()?, "");
        Ok(())
    }

    #[test]
    fn test_fork_above_hidden_spinner_keeps_buffer() -> anyhow::Result<()> {
        let cnsl = Console::buf();
        let pb = cnsl.build_spinner("cf")?;
        let mut above = cnsl.fork_above(&pb);
        writeln!(above, "line")?;
        pb.finish_and_clear();
        assert_eq!(above.take_output()?, "line\n");
        Ok(())
    }

    #[test]
    fn test_take_lines() {
        let mut pending = b"first\nsecond\nthi".to_vec();
        assert_eq!(take_lines(&mut pending), vec!["first", "second"]);
        assert_eq!(pending, b"thi".to_vec());

        pending.extend_from_slice(b"rd\n");
        assert_eq!(take_lines(&mut pending), vec!["third"]);
        assert!(pending.is_empty());
    }
}
