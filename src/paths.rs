//! Path Resolver Module
//! Finds the project root and builds absolute paths to data and model files.

use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

use glob::Pattern;
use tracing::debug;

/// Files or directories whose presence marks a project root.
const ROOT_MARKERS: [&str; 4] = ["requirements.txt", "data/raw", "models", "src"];

/// Number of ancestors examined above the starting directory.
const MAX_ANCESTORS: usize = 4;

/// Subdirectory of `data/` holding a dataset family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataKind {
    Raw,
    #[default]
    Processed,
}

impl DataKind {
    pub fn as_dir(&self) -> &'static str {
        match self {
            DataKind::Raw => "raw",
            DataKind::Processed => "processed",
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_dir())
    }
}

/// A discovered project root and the directory layout hanging off it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    /// Discover the project root starting from the current working directory.
    pub fn discover() -> Self {
        Self {
            root: get_project_root(None),
        }
    }

    /// Discover the project root starting from `start`.
    pub fn discover_from(start: &Path) -> Self {
        Self {
            root: get_project_root(Some(start)),
        }
    }

    /// Use `root` as-is, without searching for markers.
    pub fn from_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: resolve_lenient(&root.into()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_dir(&self, kind: DataKind) -> PathBuf {
        self.root.join("data").join(kind.as_dir())
    }

    pub fn models_dir(&self) -> PathBuf {
        self.root.join("models")
    }

    /// `root/data/<kind>/<relative>`, resolved. Existence is not checked.
    pub fn resolve_data_path(&self, relative: &str, kind: DataKind) -> PathBuf {
        resolve_lenient(&self.data_dir(kind).join(relative))
    }

    /// `root/models/<filename>`, resolved. Existence is not checked.
    pub fn resolve_model_path(&self, filename: &str) -> PathBuf {
        resolve_lenient(&self.models_dir().join(filename))
    }

    /// First file in `root/data/<kind>/` whose name matches `pattern`.
    ///
    /// Matches are ordered by file name so the result does not depend on
    /// directory enumeration order.
    pub fn find_data_file(&self, pattern: &str, kind: DataKind) -> Option<PathBuf> {
        let data_dir = self.data_dir(kind);
        let pattern = match Pattern::new(pattern) {
            Ok(p) => p,
            Err(e) => {
                debug!("Invalid data file pattern {:?}: {}", pattern, e);
                return None;
            }
        };

        let entries = fs::read_dir(&data_dir).ok()?;
        let mut matches: Vec<PathBuf> = entries
            .flatten()
            .filter(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .map(|name| pattern.matches(name))
                    .unwrap_or(false)
            })
            .map(|entry| entry.path())
            .collect();
        matches.sort();

        debug!(
            "{} match(es) for {} in {}",
            matches.len(),
            pattern,
            data_dir.display()
        );
        matches.into_iter().next()
    }

    /// Config files probed by [`crate::config::load_config`], highest priority first.
    pub fn config_candidates(&self) -> [PathBuf; 3] {
        [
            self.root.join("config.yaml"),
            self.root.join("config").join("config.yaml"),
            self.root.join("config").join("config.example.yaml"),
        ]
    }
}

/// Find the project root by looking for marker files and directories.
///
/// Checks `start` (default: the current working directory) and up to four
/// of its ancestors, nearest first. The first directory containing
/// `requirements.txt`, `data/raw`, `models` or `src` wins. When nothing is
/// found the starting directory itself is returned, so this never fails.
pub fn get_project_root(start: Option<&Path>) -> PathBuf {
    let start = match start {
        Some(p) => absolutize(p),
        None => current_dir(),
    };

    for candidate in start.ancestors().take(MAX_ANCESTORS + 1) {
        if ROOT_MARKERS
            .iter()
            .any(|marker| candidate.join(marker).exists())
        {
            debug!("Project root found at {}", candidate.display());
            return resolve_lenient(candidate);
        }
    }

    debug!(
        "No project markers above {}, using it as root",
        start.display()
    );
    resolve_lenient(&start)
}

/// Resolve a data file path relative to the project root.
pub fn resolve_data_path(relative: &str, kind: DataKind) -> PathBuf {
    ProjectLayout::discover().resolve_data_path(relative, kind)
}

/// Resolve a model file path relative to the project root.
pub fn resolve_model_path(filename: &str) -> PathBuf {
    ProjectLayout::discover().resolve_model_path(filename)
}

/// Find a data file matching a glob pattern in the data directory.
pub fn find_data_file(pattern: &str, kind: DataKind) -> Option<PathBuf> {
    ProjectLayout::discover().find_data_file(pattern, kind)
}

fn current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Join onto the cwd when relative, then drop `.` and `..` lexically.
fn absolutize(path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        current_dir().join(path)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Absolute path with symlinks resolved for the part that exists on disk.
///
/// Unlike `fs::canonicalize`, a missing tail is kept instead of failing.
pub(crate) fn resolve_lenient(path: &Path) -> PathBuf {
    let absolute = absolutize(path);
    let mut existing = absolute.as_path();
    let mut tail = Vec::new();

    loop {
        if let Ok(canonical) = existing.canonicalize() {
            return tail
                .iter()
                .rev()
                .fold(canonical, |acc: PathBuf, part| acc.join(part));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                tail.push(name.to_os_string());
                existing = parent;
            }
            _ => return absolute,
        }
    }
}
