use std::fmt;

use serde::{Deserialize, Serialize};

static STATUS_MARKER: &str = "status:";
static ACCEPTED_MARKERS: &[&str] = &["status: Accepted", "status: Happy New Year"];
static RUNNING_MARKER: &str = "status: Running on";

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
pub enum VerdictKind {
    Accepted,
    Running,
    Failed,
}

impl fmt::Display for VerdictKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.into())
    }
}

/// Coarse reading of the cf tool output seen so far.
///
/// Compile errors, wrong answers and the like are all `Failed`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case", tag = "kind", content = "text")]
pub enum Verdict {
    /// Short status, e.g. `Accepted`.
    Accepted(String),
    /// Short status, e.g. `Running on test 3`.
    Running(String),
    /// The whole output, as read from the tool.
    Failed(String),
}

impl Verdict {
    /// Classifies the accumulated output of a submission.
    ///
    /// Markers are searched with ANSI codes stripped. `Failed` keeps the raw output.
    pub fn classify(output: &str) -> Self {
        let plain = console::strip_ansi_codes(output);
        if ACCEPTED_MARKERS.iter().any(|m| plain.contains(m)) {
            Self::Accepted(short_status(&plain).to_owned())
        } else if plain.contains(RUNNING_MARKER) {
            Self::Running(short_status(&plain).to_owned())
        } else {
            Self::Failed(output.to_owned())
        }
    }

    pub fn kind(&self) -> VerdictKind {
        match self {
            Self::Accepted(_) => VerdictKind::Accepted,
            Self::Running(_) => VerdictKind::Running,
            Self::Failed(_) => VerdictKind::Failed,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Accepted(text) | Self::Running(text) | Self::Failed(text) => text,
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.kind() == VerdictKind::Accepted
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.kind(), self.text().trim_end())
    }
}

/// Text after the last `status:` marker, or the whole text if there is none.
fn short_status(output: &str) -> &str {
    match output.rfind(STATUS_MARKER) {
        Some(pos) => output[pos + STATUS_MARKER.len()..].trim(),
        None => output.trim(),
    }
}
