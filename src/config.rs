//! Config for cfsubmit.
//!
//! The config file `cfsubmit.yaml` is searched in the current directory and
//! its ancestors, then in the user config directory (e.g. `~/.config/cfsubmit`).
//! If no file is found, defaults are used.
//!
//! Fields:
//! - `cf_path` : path to the cf tool, shell-expanded (`~`, `$VAR`)
//! - `default_lang` : language label used when `--lang` is omitted
//! - `check_before_submit` : run `cf --version` before submitting
//! - `check_timeout` : time limit of `cf --version` checks (e.g. `2s`)
//! - `notify` : `console`, `command` or `none`
//! - `notify_command` : command run when `notify` is `command`
//! - `html_log` : file to which log entries are appended as html

use std::fmt;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context as _};
use getset::{CopyGetters, Getters};
use lazy_static::lazy_static;
use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};

use crate::abs_path::AbsPathBuf;
use crate::log::{ConsoleLogger, HtmlLogger, Logger, TeeLogger};
use crate::model::Lang;
use crate::notify::{CommandNotifier, ConsoleNotifier, Notifier, NullNotifier};
use crate::tool::CHECK_TIMEOUT;
use crate::{Console, Result};

lazy_static! {
    static ref VERSION: Version = Version::parse(env!("CARGO_PKG_VERSION")).unwrap();
}

#[derive(Serialize, Getters, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory containing the loaded config file, if any.
    #[get = "pub"]
    base_dir: Option<AbsPathBuf>,
    #[serde(flatten)]
    body: ConfigBody,
}

impl Config {
    /// Loads config from `base_dir`, or searches for it if `base_dir` is `None`.
    pub fn load(base_dir: Option<AbsPathBuf>, cnsl: &mut Console) -> Result<Self> {
        let base_dir = match base_dir {
            Some(base_dir) => Some(base_dir),
            None => ConfigBody::search()?,
        };
        let body = match &base_dir {
            Some(base_dir) => {
                writeln!(cnsl, "Found config file in base_dir: {}", base_dir)?;
                ConfigBody::load(base_dir)?
            }
            None => ConfigBody::default(),
        };
        Ok(Self { base_dir, body })
    }

    pub fn body(&self) -> &ConfigBody {
        &self.body
    }

    /// Path to the cf tool with `~` and environment variables expanded.
    pub fn cf_path(&self) -> Result<String> {
        let expanded = shellexpand::full(&self.body.cf_path)
            .with_context(|| format!("Could not expand cf_path : {}", self.body.cf_path))?;
        Ok(expanded.into_owned())
    }

    pub fn html_log_path(&self) -> Result<Option<AbsPathBuf>> {
        let html_log = match &self.body.html_log {
            Some(html_log) => html_log,
            None => return Ok(None),
        };
        let base_dir = match &self.base_dir {
            Some(base_dir) => base_dir.clone(),
            None => AbsPathBuf::cwd()?,
        };
        base_dir.join_expand(html_log).map(Some)
    }

    /// Builds the logger: console output plus the html log file if configured.
    pub fn build_logger(&self, cnsl: Console) -> Result<Arc<dyn Logger>> {
        let console_logger: Arc<dyn Logger> = Arc::new(ConsoleLogger::new(cnsl));
        let mut tee = TeeLogger::new(vec![console_logger]);
        if let Some(path) = self.html_log_path()? {
            let file = path.open_append().context("Could not open html log file")?;
            tee.push(Arc::new(HtmlLogger::new(file)));
        }
        Ok(Arc::new(tee))
    }

    pub fn build_notifier(&self, cnsl: Console, logger: Arc<dyn Logger>) -> Arc<dyn Notifier> {
        match self.body.notify {
            NotifyKind::Console => Arc::new(ConsoleNotifier::new(cnsl)),
            NotifyKind::Command => Arc::new(CommandNotifier::new(
                self.body.notify_command.clone(),
                logger,
            )),
            NotifyKind::None => Arc::new(NullNotifier),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_dir: None,
            body: ConfigBody::default(),
        }
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let yaml_str = serde_yaml::to_string(self).map_err(|_| fmt::Error)?;
        write!(f, "{}", yaml_str)
    }
}

#[derive(
    Serialize,
    Deserialize,
    IntoStaticStr,
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum NotifyKind {
    Console,
    Command,
    None,
}

#[derive(Serialize, Deserialize, Getters, CopyGetters, Debug, Clone, PartialEq, Eq)]
pub struct ConfigBody {
    #[serde(with = "string_serde")]
    #[get = "pub"]
    version: Version,
    #[serde(default = "ConfigBody::default_cf_path")]
    #[get = "pub"]
    cf_path: String,
    #[serde(default)]
    #[get = "pub"]
    default_lang: Lang,
    #[serde(default = "ConfigBody::default_check_before_submit")]
    #[get_copy = "pub"]
    check_before_submit: bool,
    #[serde(default = "ConfigBody::default_check_timeout", with = "humantime_serde")]
    #[get_copy = "pub"]
    check_timeout: Duration,
    #[serde(default = "ConfigBody::default_notify")]
    #[get_copy = "pub"]
    notify: NotifyKind,
    #[serde(default = "ConfigBody::default_notify_command")]
    #[get = "pub"]
    notify_command: Vec<String>,
    #[serde(default)]
    #[get = "pub"]
    html_log: Option<String>,
}

impl ConfigBody {
    pub const FILE_NAME: &'static str = "cfsubmit.yaml";

    pub fn generate_to(writer: &mut dyn Write) -> Result<()> {
        writeln!(
            writer,
            include_str!("../resources/cfsubmit.yaml.txt"),
            version = &*VERSION,
        )
        .context("Could not write config")
    }

    fn default_cf_path() -> String {
        String::from("cf")
    }

    fn default_check_before_submit() -> bool {
        true
    }

    fn default_check_timeout() -> Duration {
        CHECK_TIMEOUT
    }

    fn default_notify() -> NotifyKind {
        NotifyKind::Console
    }

    fn default_notify_command() -> Vec<String> {
        ["notify-send", "-u", "{urgency}", "{title}", "{body}"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn search() -> Result<Option<AbsPathBuf>> {
        let cwd = AbsPathBuf::cwd()?;
        if let Some(base_dir) = cwd.search_dir_contains(Self::FILE_NAME) {
            return Ok(Some(base_dir));
        }
        let user_dir = dirs::config_dir()
            .map(|dir| dir.join(env!("CARGO_PKG_NAME")))
            .filter(|dir| dir.join(Self::FILE_NAME).is_file());
        match user_dir {
            Some(dir) => Ok(Some(AbsPathBuf::try_new(dir)?)),
            None => Ok(None),
        }
    }

    fn load(base_dir: &AbsPathBuf) -> Result<Self> {
        let body: Self = base_dir.join(Self::FILE_NAME).load(|file| {
            serde_yaml::from_reader(file).context("Could not read config file as yaml")
        })?;
        body.validate()?;
        Ok(body)
    }

    fn validate(&self) -> Result<()> {
        let version_req = VersionReq::parse(&self.version.to_string())
            .context("Could not parse version requirement")?;
        if !version_req.matches(&VERSION) {
            return Err(anyhow!(
                r#"Found mismatched version in config file.
    config version   : {}
    cfsubmit version : {}
Fix the config file so that it is compatible with the current version of cfsubmit."#,
                self.version,
                &*VERSION
            ));
        }
        if self.notify == NotifyKind::Command && self.notify_command.is_empty() {
            return Err(anyhow!(
                "Found empty notify_command while notify is set to command"
            ));
        }
        Ok(())
    }
}

impl Default for ConfigBody {
    fn default() -> Self {
        Self {
            version: VERSION.clone(),
            cf_path: Self::default_cf_path(),
            default_lang: Lang::default(),
            check_before_submit: Self::default_check_before_submit(),
            check_timeout: Self::default_check_timeout(),
            notify: Self::default_notify(),
            notify_command: Self::default_notify_command(),
            html_log: None,
        }
    }
}

mod string_serde {
    use std::fmt::Display;
    use std::str::FromStr;

    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Display,
        S: Serializer,
    {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: FromStr,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer)?
            .parse()
            .map_err(de::Error::custom)
    }
}
