//! Artifact store: the working tree of a generated project.
//!
//! Paths are always relative to the project root and use `/` separators.
//! Writes replace the whole file atomically, so a failed write never
//! leaves a half-written file behind.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{CoreError, CoreResult};

/// Relative path to file content.
pub type ArtifactSnapshot = BTreeMap<String, String>;

/// Directories never included in a snapshot.
pub const SKIPPED_DIRS: &[&str] = &["node_modules", ".next", ".vscode", ".git", ".wf"];

/// Files never included in a snapshot.
pub const SKIPPED_FILES: &[&str] = &["package-lock.json"];

/// Extensions included in a snapshot.
pub const SOURCE_EXTENSIONS: &[&str] = &["tsx", "ts", "css", "js", "mjs", "json"];

/// Read/write access to a project tree.
pub trait ArtifactStore: Send + Sync {
    fn root(&self) -> &Path;

    /// Every relevant source file.
    fn snapshot(&self) -> CoreResult<ArtifactSnapshot>;

    /// Content of one file, `None` when it does not exist.
    fn read(&self, path: &str) -> CoreResult<Option<String>>;

    /// Replace a file, creating parent directories as needed.
    fn write(&self, path: &str, content: &str) -> CoreResult<()>;
}

/// Artifact store backed by a directory.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Absolute path for a relative artifact path. Rejects absolute paths and
    /// anything that would leave the root.
    pub fn resolve(&self, path: &str) -> CoreResult<PathBuf> {
        let normalized = path.trim().replace('\\', "/");
        if normalized.is_empty() || normalized.starts_with('/') {
            return Err(CoreError::UnsafePath(path.to_string()));
        }

        let mut resolved = self.root.clone();
        let mut has_name = false;
        for component in Path::new(&normalized).components() {
            match component {
                Component::Normal(part) => {
                    resolved.push(part);
                    has_name = true;
                }
                Component::CurDir => {}
                _ => return Err(CoreError::UnsafePath(path.to_string())),
            }
        }
        if !has_name {
            return Err(CoreError::UnsafePath(path.to_string()));
        }
        Ok(resolved)
    }

    fn is_source_file(path: &Path) -> bool {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if SKIPPED_FILES.contains(&name) {
            return false;
        }
        path.extension()
            .and_then(|e| e.to_str())
            .map_or(false, |ext| SOURCE_EXTENSIONS.contains(&ext))
    }
}

impl ArtifactStore for FsArtifactStore {
    fn root(&self) -> &Path {
        &self.root
    }

    fn snapshot(&self) -> CoreResult<ArtifactSnapshot> {
        let mut snapshot = ArtifactSnapshot::new();
        if !self.root.exists() {
            return Ok(snapshot);
        }

        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .into_iter()
            .filter_entry(|entry| {
                !(entry.file_type().is_dir()
                    && entry
                        .file_name()
                        .to_str()
                        .map_or(false, |name| SKIPPED_DIRS.contains(&name)))
            });

        for entry in walker.filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() || !Self::is_source_file(entry.path()) {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let key = relative
                .components()
                .filter_map(|c| c.as_os_str().to_str())
                .collect::<Vec<_>>()
                .join("/");

            match fs::read_to_string(entry.path()) {
                Ok(content) => {
                    snapshot.insert(key, content);
                }
                Err(e) => debug!("Skipping unreadable file {}: {}", key, e),
            }
        }

        debug!(files = snapshot.len(), "Snapshot taken of {:?}", self.root);
        Ok(snapshot)
    }

    fn read(&self, path: &str) -> CoreResult<Option<String>> {
        let full = self.resolve(path)?;
        if !full.is_file() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(full)?))
    }

    fn write(&self, path: &str, content: &str) -> CoreResult<()> {
        let full = self.resolve(path)?;
        let parent = full
            .parent()
            .ok_or_else(|| CoreError::UnsafePath(path.to_string()))?;
        fs::create_dir_all(parent)?;

        let mut tmp = NamedTempFile::new_in(parent)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.persist(&full).map_err(|e| CoreError::Io(e.error))?;

        debug!("Wrote {} ({} bytes)", path, content.len());
        Ok(())
    }
}
