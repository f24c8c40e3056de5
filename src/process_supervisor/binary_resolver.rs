//! Binary resolution: `PATH` first, then configured fallback directories

use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Default install locations checked after `PATH` (Homebrew arm64, Homebrew x86, system)
pub const DEFAULT_FALLBACK_DIRS: &str = "/opt/homebrew/bin:/usr/local/bin:/usr/bin";

#[derive(Debug, Clone)]
pub struct BinaryResolver {
    fallback_dirs: Vec<PathBuf>,
}

impl BinaryResolver {
    pub fn new(fallback_dirs: Vec<PathBuf>) -> Self {
        Self { fallback_dirs }
    }

    /// Parse a `PATH`-style list (`:` separated on unix)
    pub fn from_path_list(list: impl AsRef<OsStr>) -> Self {
        Self::new(
            env::split_paths(list.as_ref())
                .filter(|p| !p.as_os_str().is_empty())
                .collect(),
        )
    }

    pub fn fallback_dirs(&self) -> &[PathBuf] {
        &self.fallback_dirs
    }

    /// Ordered, de-duplicated executable paths for `program`.
    ///
    /// When nothing is found the bare name is returned alone, so a spawn
    /// attempt still happens and its error is reported.
    pub fn candidates(&self, program: &str) -> Vec<PathBuf> {
        let mut found: Vec<PathBuf> = Vec::new();
        let mut push = |path: PathBuf| {
            if !found.contains(&path) {
                found.push(path);
            }
        };

        if Path::new(program).components().count() > 1 {
            // Already a path
            push(PathBuf::from(program));
            return found;
        }

        if let Some(path) = find_in_path(program) {
            push(path);
        }
        for dir in &self.fallback_dirs {
            let path = dir.join(program);
            if is_executable(&path) {
                push(path);
            }
        }

        if found.is_empty() {
            found.push(PathBuf::from(program));
        }
        found
    }

    /// Preferred path for `program`
    pub fn resolve(&self, program: &str) -> PathBuf {
        self.candidates(program)
            .into_iter()
            .next()
            .unwrap_or_else(|| PathBuf::from(program))
    }
}

impl Default for BinaryResolver {
    fn default() -> Self {
        Self::from_path_list(DEFAULT_FALLBACK_DIRS)
    }
}

fn find_in_path(program: &str) -> Option<PathBuf> {
    let path_var = env::var_os("PATH")?;
    env::split_paths(&path_var)
        .map(|dir| dir.join(program))
        .find(|p| is_executable(p))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
