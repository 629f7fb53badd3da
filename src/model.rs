use std::convert::TryFrom;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::anyhow;
use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};

use crate::error::SubmitError;
use crate::macros::regex;
use crate::{Error, Result};

/// Numeric id of a Codeforces contest (no leading zero).
///
/// Kept as the digit string, so ids of any length are accepted.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct ContestId(String);

impl ContestId {
    /// Numeric value of the id, if it fits in `u64`.
    pub fn to_u64(&self) -> Option<u64> {
        self.0.parse().ok()
    }
}

impl FromStr for ContestId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if !regex!(r"^[1-9][0-9]*$").is_match(s) {
            return Err(anyhow!("Invalid contest id : {}", s));
        }
        Ok(Self(s.to_owned()))
    }
}

impl TryFrom<String> for ContestId {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<ContestId> for String {
    fn from(id: ContestId) -> Self {
        id.0
    }
}

impl AsRef<str> for ContestId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContestId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Problem index inside a contest: an uppercase letter optionally followed by a non-zero digit.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct ProblemCode(String);

impl FromStr for ProblemCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if !regex!(r"^[A-Z][1-9]?$").is_match(s) {
            return Err(anyhow!("Invalid problem code : {}", s));
        }
        Ok(Self(s.to_owned()))
    }
}

impl TryFrom<String> for ProblemCode {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<ProblemCode> for String {
    fn from(code: ProblemCode) -> Self {
        code.0
    }
}

impl AsRef<str> for ProblemCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProblemCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which accepted url pattern a problem url matched.
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
pub enum UrlForm {
    /// `.../contest/<contest>/problem/<code>`
    Contest,
    /// `.../problemset/problem/<contest>/<code>`
    Problemset,
}

impl fmt::Display for UrlForm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.into())
    }
}

/// Contest id and problem code parsed from a problem url.
#[derive(Serialize, Deserialize, Getters, CopyGetters, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProblemIdentity {
    #[get = "pub"]
    contest_id: ContestId,
    #[get = "pub"]
    problem_code: ProblemCode,
    #[get_copy = "pub"]
    form: UrlForm,
}

impl ProblemIdentity {
    pub fn new(contest_id: ContestId, problem_code: ProblemCode, form: UrlForm) -> Self {
        Self {
            contest_id,
            problem_code,
            form,
        }
    }

    /// Parses a contest-style or problemset-style Codeforces problem url.
    ///
    /// In contest-style urls the code `0` means the first problem and becomes `A`.
    pub fn from_url(url: &str) -> std::result::Result<Self, SubmitError> {
        let malformed = || SubmitError::MalformedUrl(url.to_owned());

        let contest_re = regex!(r".*://codeforces.com/contest/([1-9][0-9]*)/problem/(0|[A-Z][1-9]?)");
        let problemset_re =
            regex!(r".*://codeforces.com/problemset/problem/([1-9][0-9]*)/([A-Z][1-9]?)");

        let (caps, form) = if let Some(caps) = contest_re.captures(url) {
            (caps, UrlForm::Contest)
        } else if let Some(caps) = problemset_re.captures(url) {
            (caps, UrlForm::Problemset)
        } else {
            return Err(malformed());
        };

        let contest_id = caps[1].parse().map_err(|_| malformed())?;
        let problem_code = match &caps[2] {
            "0" => "A",
            code => code,
        }
        .parse()
        .map_err(|_| malformed())?;

        Ok(Self::new(contest_id, problem_code, form))
    }

    /// Arguments passed to the cf tool to submit `file_path` for this problem.
    pub fn to_submit_args(&self, file_path: &Path) -> Vec<String> {
        vec![
            "submit".to_owned(),
            self.contest_id.to_string(),
            self.problem_code.to_string(),
            file_path.to_string_lossy().into_owned(),
        ]
    }
}

impl fmt::Display for ProblemIdentity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.contest_id, self.problem_code)
    }
}

/// Source language label. The cf tool picks the compiler by itself,
/// so this is only used for display.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Lang(String);

impl Default for Lang {
    fn default() -> Self {
        Self::from(DEFAULT_LANG)
    }
}

pub static DEFAULT_LANG: &str = "cpp";

impl<T: Into<String>> From<T> for Lang {
    fn from(lang: T) -> Self {
        Self(lang.into())
    }
}

impl FromStr for Lang {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl AsRef<str> for Lang {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single submission: what to submit, where, and in which language.
#[derive(Serialize, Deserialize, Getters, Debug, Clone, PartialEq, Eq, Hash)]
#[get = "pub"]
pub struct SubmitRequest {
    file_path: PathBuf,
    url: String,
    lang: Lang,
}

impl SubmitRequest {
    pub fn new(
        file_path: impl Into<PathBuf>,
        url: impl Into<String>,
        lang: impl Into<Lang>,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            url: url.into(),
            lang: lang.into(),
        }
    }
}
