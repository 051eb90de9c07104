// src/process/search_path.rs

//! Executable lookup over an explicit, ordered list of directories.
//!
//! The per-directory check (regular file, executable bit, `PATHEXT` on
//! windows) is done by `which`; this module owns the order and the extra
//! configured extensions.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// Ordered directories plus the extensions tried for every candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPath {
    dirs: Vec<PathBuf>,
    extensions: Vec<String>,
}

impl SearchPath {
    pub fn new(dirs: Vec<PathBuf>, extensions: Vec<String>) -> Self {
        Self { dirs, extensions }
    }

    /// Explicit directories with no extra extensions.
    pub fn from_dirs(dirs: Vec<PathBuf>) -> Self {
        Self {
            dirs,
            extensions: Vec::new(),
        }
    }

    /// Split a `PATH`-style value.
    pub fn from_path_var(value: &OsStr) -> Self {
        Self::from_dirs(std::env::split_paths(value).collect())
    }

    /// Search path seen by a child launched with `overlay` on top of the
    /// current environment.
    pub fn from_environment(overlay: &BTreeMap<String, String>) -> Self {
        let value = overlay
            .get("PATH")
            .map(OsString::from)
            .or_else(|| std::env::var_os("PATH"))
            .unwrap_or_default();
        Self::from_path_var(&value)
    }

    /// Replace the extension list; an empty list keeps the current one.
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        if !extensions.is_empty() {
            self.extensions = extensions;
        }
        self
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Find `program` the way a shell would. Names containing a path
    /// separator are checked directly, relative to `working_dir`; bare names
    /// are looked up in every directory in order (relative directories are
    /// taken relative to `working_dir`). Within one directory the bare name
    /// is tried before each extension. The first executable regular file
    /// wins.
    ///
    /// The returned path is absolute whenever `working_dir` can be made
    /// absolute.
    pub fn resolve(&self, program: &str, working_dir: &Path) -> Option<PathBuf> {
        if program.is_empty() {
            return None;
        }
        let cwd = std::path::absolute(working_dir).unwrap_or_else(|_| working_dir.to_path_buf());

        if has_separator(program) {
            return self
                .candidates(program)
                .find_map(|name| find_in(&name, None, &cwd));
        }

        self.dirs.iter().find_map(|dir| {
            let dir = cwd.join(dir);
            self.candidates(program)
                .find_map(|name| find_in(&name, Some(dir.as_os_str()), &cwd))
        })
    }

    /// The directories, joined with the platform's path-list separator.
    pub fn display(&self) -> String {
        std::env::join_paths(&self.dirs)
            .map(|joined| joined.to_string_lossy().into_owned())
            .unwrap_or_else(|_| format!("{:?}", self.dirs))
    }

    fn candidates<'a>(&'a self, program: &'a str) -> impl Iterator<Item = String> + 'a {
        std::iter::once(program.to_string())
            .chain(self.extensions.iter().map(move |ext| format!("{program}{ext}")))
    }
}

fn find_in(name: &str, dirs: Option<&OsStr>, cwd: &Path) -> Option<PathBuf> {
    which::which_in(name, dirs, cwd)
        .ok()
        .filter(|found| found.is_file())
}

fn has_separator(program: &str) -> bool {
    program.contains('/') || (cfg!(windows) && program.contains('\\'))
}
