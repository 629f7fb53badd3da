use std::env::current_dir;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context as _};
use serde::Serialize;

use crate::Result;

/// Wraps `shellexpand::full` method.
fn expand<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
    Ok(shellexpand::full(&path.as_ref().to_string_lossy())?.parse()?)
}

/// An absolute (not necessarily canonicalized) path that may or may not exist.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct AbsPathBuf(PathBuf);

impl AbsPathBuf {
    /// Constructs an absolute path.
    ///
    /// Returns error if `path` is not absolute.
    pub fn try_new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_absolute() {
            return Err(anyhow!("Path is not absolute : {}", path.display()));
        }
        Ok(Self(path.components().collect()))
    }

    /// Returns current directory as an absolute path.
    pub fn cwd() -> Result<Self> {
        Ok(Self(current_dir()?))
    }

    /// Joins path.
    pub fn join<P: AsRef<Path>>(&self, path: P) -> Self {
        Self(self.0.join(path))
    }

    /// Joins path while expanding leading tilde and environment variables.
    ///
    /// If the expanded path is absolute, it replaces `self`.
    pub fn join_expand<P: AsRef<Path>>(&self, path: P) -> Result<Self> {
        Ok(self.join(expand(path)?))
    }

    /// Returns the nearest ancestor directory (including `self`) that contains `file_name`.
    pub fn search_dir_contains(&self, file_name: &str) -> Option<Self> {
        self.0
            .ancestors()
            .find(|dir| dir.join(file_name).is_file())
            .map(|dir| Self(dir.to_owned()))
    }

    /// Saves file with `save` and reports the result to `cnsl`.
    ///
    /// Returns `Ok(false)` without touching the file if it exists and `overwrite` is false.
    pub fn save_pretty(
        &self,
        save: impl FnOnce(fs::File) -> Result<()>,
        overwrite: bool,
        base_dir: Option<&AbsPathBuf>,
        cnsl: &mut dyn Write,
    ) -> Result<bool> {
        write!(
            cnsl,
            "Saving {} ... ",
            self.strip_prefix_if(base_dir).display()
        )?;
        let result = self.save(save, overwrite);
        let msg = match result {
            Ok(true) => "saved",
            Ok(false) => "already exists",
            Err(_) => "failed",
        };
        writeln!(cnsl, "{}", msg)?;
        result
    }

    fn save(&self, save: impl FnOnce(fs::File) -> Result<()>, overwrite: bool) -> Result<bool> {
        if !overwrite && self.0.is_file() {
            return Ok(false);
        }
        self.create_parent_dir()?;
        fs::File::create(&self.0)
            .with_context(|| format!("Could not open file : {}", self))
            .and_then(save)?;
        Ok(true)
    }

    pub fn load<T>(&self, load: impl FnOnce(fs::File) -> Result<T>) -> Result<T> {
        fs::OpenOptions::new()
            .read(true)
            .open(&self.0)
            .with_context(|| format!("Could not open file : {}", self))
            .and_then(load)
    }

    /// Opens file for appending, creating it and its parent directories if needed.
    pub fn open_append(&self) -> Result<fs::File> {
        self.create_parent_dir()?;
        fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.0)
            .with_context(|| format!("Could not open file : {}", self))
    }

    fn create_parent_dir(&self) -> io::Result<()> {
        match self.0.parent() {
            Some(dir) => fs::create_dir_all(dir),
            None => Ok(()),
        }
    }

    pub fn strip_prefix(&self, base: &AbsPathBuf) -> &Path {
        self.0
            .strip_prefix(&base.0)
            .unwrap_or_else(|_| self.0.as_path())
    }

    fn strip_prefix_if(&self, base: Option<&AbsPathBuf>) -> &Path {
        match base {
            Some(base) => self.strip_prefix(base),
            None => self.0.as_path(),
        }
    }
}

impl AsRef<Path> for AbsPathBuf {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for AbsPathBuf {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.display().fmt(f)
    }
}
